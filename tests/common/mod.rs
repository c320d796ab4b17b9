//! Shared fixture: throwaway repositories built with git2.
//!
//! Commit times advance one minute per commit so time-ordered walks are
//! deterministic.

#![allow(dead_code)]

use std::cell::Cell;
use std::path::Path;

use git2::{build::CheckoutBuilder, Repository, RepositoryInitOptions, Signature, Time};
use tempfile::TempDir;

use git_sim::core::types::Oid;
use git_sim::git::Git;

pub struct TestRepo {
    dir: TempDir,
    repo: Repository,
    clock: Cell<i64>,
}

impl TestRepo {
    /// Empty repository whose unborn branch is `main`.
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts).expect("failed to init repo");
        Self {
            dir,
            repo,
            clock: Cell::new(1_700_000_000),
        }
    }

    /// Repository on `main` with one commit adding `README.md`.
    pub fn new() -> Self {
        let repo = Self::empty();
        repo.commit(&[("README.md", Some("# Test Repo\n"))], "Initial commit");
        repo
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn git(&self) -> Git {
        Git::open(self.path()).expect("failed to open test repo")
    }

    fn signature(&self) -> Signature<'static> {
        let now = self.clock.get() + 60;
        self.clock.set(now);
        Signature::new("Test User", "test@example.com", &Time::new(now, 0)).unwrap()
    }

    /// Write (`Some`) or delete (`None`) files, stage them and commit on HEAD.
    pub fn commit(&self, files: &[(&str, Option<&str>)], message: &str) -> Oid {
        let mut index = self.repo.index().unwrap();
        for (path, content) in files {
            let full = self.path().join(path);
            match content {
                Some(content) => {
                    if let Some(parent) = full.parent() {
                        std::fs::create_dir_all(parent).unwrap();
                    }
                    std::fs::write(&full, content).unwrap();
                    index.add_path(Path::new(path)).unwrap();
                }
                None => {
                    std::fs::remove_file(&full).unwrap();
                    index.remove_path(Path::new(path)).unwrap();
                }
            }
        }
        index.write().unwrap();
        let tree = self.repo.find_tree(index.write_tree().unwrap()).unwrap();

        let parents: Vec<git2::Commit<'_>> = match self.repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => Vec::new(),
        };
        let parent_refs: Vec<&git2::Commit<'_>> = parents.iter().collect();
        let sig = self.signature();
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap();
        to_oid(oid)
    }

    /// Commit a single file.
    pub fn commit_file(&self, path: &str, content: &str, message: &str) -> Oid {
        self.commit(&[(path, Some(content))], message)
    }

    /// Write a file without staging or committing it.
    pub fn write(&self, path: &str, content: &str) {
        std::fs::write(self.path().join(path), content).unwrap();
    }

    /// Create a branch at HEAD.
    pub fn branch(&self, name: &str) {
        let head = self.repo.head().unwrap().peel_to_commit().unwrap();
        self.repo.branch(name, &head, false).unwrap();
    }

    pub fn checkout(&self, name: &str) {
        self.repo.set_head(&format!("refs/heads/{name}")).unwrap();
        self.repo
            .checkout_head(Some(CheckoutBuilder::new().force()))
            .unwrap();
    }

    /// Detach HEAD at a commit.
    pub fn detach(&self, oid: &Oid) {
        self.repo.set_head_detached(from_oid(oid)).unwrap();
        self.repo
            .checkout_head(Some(CheckoutBuilder::new().force()))
            .unwrap();
    }

    /// Merge `branch` into HEAD with a two-parent commit. The trees must
    /// merge without conflicts.
    pub fn merge(&self, branch: &str, message: &str) -> Oid {
        let ours = self.repo.head().unwrap().peel_to_commit().unwrap();
        let theirs = self
            .repo
            .find_branch(branch, git2::BranchType::Local)
            .unwrap()
            .get()
            .peel_to_commit()
            .unwrap();
        let mut merged = self.repo.merge_commits(&ours, &theirs, None).unwrap();
        assert!(!merged.has_conflicts(), "fixture merge must be clean");
        let tree = self
            .repo
            .find_tree(merged.write_tree_to(&self.repo).unwrap())
            .unwrap();
        let sig = self.signature();
        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &[&ours, &theirs])
            .unwrap();
        self.repo
            .checkout_head(Some(CheckoutBuilder::new().force()))
            .unwrap();
        to_oid(oid)
    }

    /// Point `refs/remotes/<name>` at a commit.
    pub fn remote_ref(&self, name: &str, oid: &Oid) {
        self.repo
            .reference(&format!("refs/remotes/{name}"), from_oid(oid), true, "test")
            .unwrap();
    }

    /// Resolve a revision with libgit2 itself.
    pub fn rev(&self, spec: &str) -> Oid {
        let object = self.repo.revparse_single(spec).unwrap();
        to_oid(object.peel_to_commit().unwrap().id())
    }
}

fn to_oid(oid: git2::Oid) -> Oid {
    Oid::new(oid.to_string()).unwrap()
}

fn from_oid(oid: &Oid) -> git2::Oid {
    git2::Oid::from_str(oid.as_str()).unwrap()
}

/// `count` numbered lines: `"line 1\n"` through `"line {count}\n"`.
pub fn numbered(count: usize) -> String {
    (1..=count).map(|n| format!("line {n}\n")).collect()
}

/// `numbered(count)` with lines `from..=to` replaced by `"{tag} {n}\n"`.
pub fn with_lines(count: usize, from: usize, to: usize, tag: &str) -> String {
    (1..=count)
        .map(|n| {
            if (from..=to).contains(&n) {
                format!("{tag} {n}\n")
            } else {
                format!("line {n}\n")
            }
        })
        .collect()
}
