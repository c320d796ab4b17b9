//! Integration tests for the read-only Git interface.
//!
//! Repositories are built with git2 in temporary directories.

mod common;

use common::{numbered, with_lines, TestRepo};

use git_sim::core::models::{ChangeKind, LineRange};
use git_sim::git::{Git, GitError, ObjectReader};

mod resolve {
    use super::*;

    #[test]
    fn branch_names_and_head() {
        let repo = TestRepo::new();
        let tip = repo.commit_file("a.txt", "a\n", "add a");
        let git = repo.git();

        assert_eq!(git.resolve("main").unwrap().oid, tip);
        assert_eq!(git.resolve("refs/heads/main").unwrap().oid, tip);
        assert_eq!(git.resolve("HEAD").unwrap().oid, tip);
        assert_eq!(git.resolve("@").unwrap().oid, tip);
    }

    #[test]
    fn resolving_twice_is_identical() {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "a\n", "add a");
        let git = repo.git();

        let first = git.resolve("main~1").unwrap();
        let second = git.resolve("main~1").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn abbreviated_hashes() {
        let repo = TestRepo::new();
        let tip = repo.commit_file("a.txt", "a\n", "add a");
        let git = repo.git();

        assert_eq!(git.resolve(tip.short(7)).unwrap().oid, tip);
        assert_eq!(git.resolve(&tip.as_str()[..12]).unwrap().oid, tip);
        assert_eq!(git.resolve(&tip.as_str().to_uppercase()).unwrap().oid, tip);
    }

    #[test]
    fn short_prefixes_are_not_hashes() {
        let repo = TestRepo::new();
        let tip = repo.commit_file("a.txt", "a\n", "add a");
        let err = repo.git().resolve(tip.short(6)).unwrap_err();
        assert!(matches!(err, GitError::RefNotFound { .. }));
    }

    #[test]
    fn relative_suffixes_match_libgit2() {
        let repo = TestRepo::new();
        repo.branch("side");
        repo.commit_file("a.txt", "a\n", "main 1");
        repo.checkout("side");
        repo.commit_file("b.txt", "b\n", "side 1");
        repo.checkout("main");
        repo.merge("side", "merge side");
        repo.commit_file("c.txt", "c\n", "after merge");
        let git = repo.git();

        for spec in [
            "main~1",
            "main~1^2",
            "main~2",
            "main^^",
            "main~1^1~1",
            "HEAD^0",
            "main~1^2~1",
        ] {
            assert_eq!(git.resolve(spec).unwrap().oid, repo.rev(spec), "{spec}");
        }
    }

    #[test]
    fn walking_past_the_root_fails() {
        let repo = TestRepo::new();
        let err = repo.git().resolve("main~1").unwrap_err();
        assert!(matches!(err, GitError::InvalidRevision { .. }));
    }

    #[test]
    fn missing_parent_number_fails() {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "a\n", "add a");
        let err = repo.git().resolve("main^2").unwrap_err();
        assert!(matches!(err, GitError::InvalidRevision { .. }));
    }

    #[test]
    fn unknown_names() {
        let repo = TestRepo::new();
        let err = repo.git().resolve("does-not-exist").unwrap_err();
        assert!(matches!(err, GitError::RefNotFound { refname } if refname == "does-not-exist"));
    }

    #[test]
    fn tags_and_remotes() {
        let repo = TestRepo::new();
        let tip = repo.commit_file("a.txt", "a\n", "add a");
        repo.remote_ref("origin/main", &tip);
        let git = repo.git();

        assert_eq!(git.resolve("origin/main").unwrap().oid, tip);
        assert_eq!(git.remote_tips().unwrap(), vec![("origin/main".to_string(), tip)]);
    }
}

mod walk {
    use super::*;

    #[test]
    fn children_before_parents() {
        let repo = TestRepo::new();
        let base = repo.rev("main");
        let one = repo.commit_file("a.txt", "1\n", "one");
        let two = repo.commit_file("a.txt", "2\n", "two");
        let git = repo.git();

        let order: Vec<_> = git
            .walk(&[two.clone()], &[])
            .unwrap()
            .into_iter()
            .map(|c| c.oid)
            .collect();
        assert_eq!(order, vec![two.clone(), one.clone(), base.clone()]);

        let unique: Vec<_> = git
            .walk(&[two.clone()], &[base])
            .unwrap()
            .into_iter()
            .map(|c| c.oid)
            .collect();
        assert_eq!(unique, vec![two, one]);
    }

    #[test]
    fn limited_walk_keeps_the_newest() {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "1\n", "one");
        let two = repo.commit_file("a.txt", "2\n", "two");
        let three = repo.commit_file("a.txt", "3\n", "three");
        let git = repo.git();

        let newest: Vec<_> = git
            .walk_limited(&[three.clone()], &[], 2)
            .unwrap()
            .into_iter()
            .map(|c| c.oid)
            .collect();
        assert_eq!(newest, vec![three.clone(), two]);
        assert!(git.walk_limited(&[three], &[], 0).unwrap().is_empty());
    }

    #[test]
    fn merge_base_of_diverged_branches() {
        let repo = TestRepo::new();
        let base = repo.rev("main");
        repo.branch("feature");
        let main_tip = repo.commit_file("a.txt", "main\n", "main work");
        repo.checkout("feature");
        let feature_tip = repo.commit_file("b.txt", "feature\n", "feature work");
        let git = repo.git();

        assert_eq!(git.merge_base(&main_tip, &feature_tip).unwrap(), Some(base.clone()));
        assert!(git.is_ancestor(&base, &feature_tip).unwrap());
        assert!(!git.is_ancestor(&main_tip, &feature_tip).unwrap());
    }
}

mod changes {
    use super::*;

    #[test]
    fn root_commit_diffs_against_empty_tree() {
        let repo = TestRepo::new();
        let root = repo.rev("main");
        let changes = repo.git().changes_for(&root).unwrap();

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "README.md");
        assert_eq!(changes[0].kind, ChangeKind::Added);
        assert_eq!(changes[0].hunks[0].new, Some(LineRange::new(1, 1)));
    }

    #[test]
    fn modification_hunks_use_line_numbers() {
        let repo = TestRepo::new();
        repo.commit_file("config.py", &numbered(20), "add config");
        let tip = repo.commit_file("config.py", &with_lines(20, 10, 15, "edit"), "edit config");

        let changes = repo.git().changes_for(&tip).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::Modified);
        assert_eq!(changes[0].hunks.len(), 1);
        assert_eq!(changes[0].hunks[0].old, Some(LineRange::new(10, 15)));
    }

    #[test]
    fn deletions_and_renames() {
        let repo = TestRepo::new();
        let body = numbered(30);
        repo.commit(&[("old.txt", Some(body.as_str())), ("gone.txt", Some("bye\n"))], "add");
        let tip = repo.commit(
            &[("old.txt", None), ("new.txt", Some(body.as_str())), ("gone.txt", None)],
            "rename and delete",
        );

        let changes = repo.git().changes_for(&tip).unwrap();
        let gone = changes.iter().find(|c| c.path == "gone.txt").unwrap();
        assert_eq!(gone.kind, ChangeKind::Deleted);
        let renamed = changes.iter().find(|c| c.path == "new.txt").unwrap();
        assert_eq!(renamed.kind, ChangeKind::Renamed);
        assert_eq!(renamed.old_path.as_deref(), Some("old.txt"));
    }

    #[test]
    fn binary_files_have_no_hunks() {
        let repo = TestRepo::new();
        let tip = repo.commit_file("blob.bin", "\0\u{1}\u{2}binary\0", "add binary");
        let changes = repo.git().changes_for(&tip).unwrap();
        assert!(changes[0].is_binary);
        assert!(changes[0].hunks.is_empty());
    }
}

mod state {
    use super::*;

    #[test]
    fn head_and_branches() {
        let repo = TestRepo::new();
        repo.branch("feature");
        let git = repo.git();

        let head = git.head().unwrap();
        assert_eq!(head.branch.unwrap().as_str(), "main");
        let names: Vec<String> = git
            .branches()
            .unwrap()
            .into_iter()
            .map(|(b, _)| b.to_string())
            .collect();
        assert_eq!(names, vec!["feature".to_string(), "main".to_string()]);
    }

    #[test]
    fn detached_head_has_no_branch() {
        let repo = TestRepo::new();
        let tip = repo.rev("main");
        repo.detach(&tip);
        let head = repo.git().head().unwrap();
        assert_eq!(head.oid, tip);
        assert!(head.branch.is_none());
    }

    #[test]
    fn dirty_paths_ignore_untracked_files() {
        let repo = TestRepo::new();
        repo.write("README.md", "# changed\n");
        repo.write("scratch.txt", "untracked\n");
        assert_eq!(repo.git().dirty_paths().unwrap(), vec!["README.md".to_string()]);
    }

    #[test]
    fn opening_a_plain_directory_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(matches!(Git::open(dir.path()), Err(GitError::NotARepo { .. })));
    }
}
