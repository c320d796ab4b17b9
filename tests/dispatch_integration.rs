//! Request parsing, dispatch and hooks against real repositories.

mod common;

use std::cell::Cell;

use common::{numbered, with_lines, TestRepo};
use serde_json::{Map, Value};

use git_sim::core::config::Config;
use git_sim::core::models::{DangerLevel, OperationType, ResetMode, SimulationResult};
use git_sim::engine::dispatch::dispatch;
use git_sim::engine::hooks::SimulationHook;
use git_sim::engine::{EngineOptions, OperationRequest, SimError};

fn run(repo: &TestRepo, command: &str) -> Result<SimulationResult, SimError> {
    let request = OperationRequest::parse(command)?;
    dispatch(&repo.git(), &EngineOptions::default(), &request, &[], &[])
}

mod commands {
    use super::*;

    #[test]
    fn git_rebase_command() {
        let repo = TestRepo::new();
        repo.commit_file("config.py", &numbered(20), "add config");
        repo.branch("feature");
        repo.commit_file("config.py", &with_lines(20, 10, 15, "main"), "main edits");
        repo.checkout("feature");
        repo.commit_file("config.py", &with_lines(20, 12, 13, "feature"), "feature edits");

        let result = run(&repo, "git rebase main").unwrap();

        assert_eq!(result.operation, OperationType::Rebase);
        assert_eq!(result.source_ref.as_deref(), Some("HEAD"));
        assert_eq!(result.conflicts.len(), 1);
        assert!(!result.success);
    }

    #[test]
    fn reset_command() {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "a\n", "one");
        repo.commit_file("b.txt", "b\n", "two");

        let result = run(&repo, "reset --hard HEAD~1").unwrap();

        assert_eq!(result.operation, OperationType::Reset(ResetMode::Hard));
        assert_eq!(result.orphaned_commits.len(), 1);
        assert_eq!(result.safety.danger, DangerLevel::High);
    }

    #[test]
    fn merge_no_ff_command() {
        let repo = TestRepo::new();
        repo.branch("feature");
        repo.checkout("feature");
        repo.commit_file("a.txt", "a\n", "feature work");
        repo.checkout("main");

        let result = run(&repo, "merge --no-ff feature").unwrap();
        assert!(!result.fast_forward);
        assert_eq!(result.steps.len(), 1);

        let result = run(&repo, "merge feature").unwrap();
        assert!(result.fast_forward);
    }

    #[test]
    fn cherry_pick_merge_without_mainline() {
        let repo = TestRepo::new();
        repo.branch("side");
        repo.commit_file("a.txt", "a\n", "main work");
        repo.checkout("side");
        repo.commit_file("b.txt", "b\n", "side work");
        repo.checkout("main");
        let merge = repo.merge("side", "merge side");
        repo.checkout("side");

        let err = run(&repo, &format!("cherry-pick {}", merge.short(10))).unwrap_err();
        assert!(matches!(err, SimError::ValidationFailed { .. }), "{err}");

        let result = run(&repo, &format!("cherry-pick -m 1 {}", merge.short(10))).unwrap();
        assert_eq!(result.operation, OperationType::CherryPick);
    }

    #[test]
    fn unknown_ref() {
        let repo = TestRepo::new();
        let err = run(&repo, "rebase nowhere").unwrap_err();
        assert!(matches!(err, SimError::NotFound { spec } if spec == "nowhere"));
    }

    #[test]
    fn unknown_operation() {
        let repo = TestRepo::new();
        let err = run(&repo, "bisect start").unwrap_err();
        assert!(matches!(err, SimError::UnsupportedOperation(op) if op == "bisect"));
    }
}

mod hooks {
    use super::*;

    /// Answers every request without touching the repository.
    struct Canned;

    impl SimulationHook for Canned {
        fn override_simulation(
            &self,
            request: &OperationRequest,
        ) -> anyhow::Result<Option<SimulationResult>> {
            let mut result = SimulationResult::new(
                OperationType::Rebase,
                git_sim::core::graph::CommitGraph::new(),
            );
            result.warnings.push(format!("canned {}", request.operation));
            Ok(Some(result))
        }
    }

    #[derive(Default)]
    struct Counter {
        calls: Cell<usize>,
    }

    impl SimulationHook for Counter {
        fn post_simulate(
            &self,
            _: &OperationRequest,
            mut result: SimulationResult,
        ) -> anyhow::Result<SimulationResult> {
            self.calls.set(self.calls.get() + 1);
            result.warnings.push("reviewed".to_string());
            Ok(result)
        }
    }

    /// Redirects every rebase onto `main`.
    struct OntoMain;

    impl SimulationHook for OntoMain {
        fn pre_simulate(&self, _: &OperationRequest) -> anyhow::Result<Option<Map<String, Value>>> {
            let mut params = Map::new();
            params.insert("onto".into(), Value::from("main"));
            Ok(Some(params))
        }
    }

    #[test]
    fn override_skips_the_simulator() {
        let repo = TestRepo::new();
        let counter = Counter::default();
        let request = OperationRequest::parse("rebase does-not-exist").unwrap();

        let result = dispatch(
            &repo.git(),
            &EngineOptions::default(),
            &request,
            &[&Canned, &counter],
            &[],
        )
        .unwrap();

        assert_eq!(counter.calls.get(), 1);
        assert_eq!(
            result.warnings,
            vec!["canned rebase".to_string(), "reviewed".to_string()]
        );
    }

    #[test]
    fn pre_hook_rewrites_params() {
        let repo = TestRepo::new();
        repo.branch("feature");
        repo.checkout("feature");
        repo.commit_file("a.txt", "a\n", "feature work");
        let request = OperationRequest::parse("rebase does-not-exist").unwrap();

        let result = dispatch(
            &repo.git(),
            &EngineOptions::default(),
            &request,
            &[&OntoMain],
            &[],
        )
        .unwrap();

        assert_eq!(result.target_ref.as_deref(), Some("main"));
        assert!(result.steps.is_empty());
    }
}

mod config {
    use super::*;

    #[test]
    fn repo_config_marks_branch_shared() {
        let repo = TestRepo::new();
        repo.commit_file("a.txt", "a\n", "one");
        repo.commit_file("b.txt", "b\n", "two");
        let config_path = Config::repo_config_path(repo.path());
        std::fs::create_dir_all(config_path.parent().unwrap()).unwrap();
        std::fs::write(&config_path, "shared_branches = [\"main\"]\n").unwrap();

        let loaded = Config::load_from(&[], Some(repo.path())).unwrap();
        let options = loaded.config.engine_options();
        assert!(options.shared_branches.contains("main"));

        let request = OperationRequest::parse("reset --hard HEAD~1").unwrap();
        let result = dispatch(&repo.git(), &options, &request, &[], &[]).unwrap();
        assert_eq!(result.safety.danger, DangerLevel::Critical);
    }
}
