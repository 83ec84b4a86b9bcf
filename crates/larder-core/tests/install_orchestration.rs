//! End-to-end installer runs against in-memory collaborators.

mod support;

use std::cell::RefCell;

use larder_core::install::{
    InstallError, InstallOptions, InstallStatus, LICENSE_KEY_VARIABLE, RecipeInstaller,
    RecipeOutcome,
};
use larder_core::recipe::{INFRA_AGENT_RECIPE_NAME, InstallTarget, Recipe, parse_recipe};
use larder_core::resolve::{ResolutionDepth, SkippedDependency};
use serial_test::serial;
use tokio_util::sync::CancellationToken;

use support::{
    MockFetcher, MockLoader, RecordingExecutor, ScriptedPrompter, linux, recipe,
    recipe_with_deps,
};

const LICENSE_KEY: &str = "0123456789abcdef";

fn recipe_with_input(name: &str, variable: &str, prompt: &str, default: &str) -> Recipe {
    let yaml = format!(
        r#"
name: {name}
inputVars:
  - name: {variable}
    prompt: "{prompt}"
    default: "{default}"
install:
  version: "3"
  tasks:
    default:
      cmds:
        - echo ${variable}
"#
    );
    parse_recipe(&yaml).unwrap()
}

fn by_name(names: &[&str]) -> InstallOptions {
    InstallOptions::new().with_recipe_names(names.iter().copied())
}

// =========================================================================
// Ordering and deduplication
// =========================================================================

#[test]
fn dependency_installed_once_before_dependent() {
    let fetcher = MockFetcher::new(vec![recipe_with_deps("a", &["b"]), recipe("b")]);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new();
    let prompter = ScriptedPrompter::answering("");

    let report = RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(&linux(), &by_name(&["a", "b"]), &CancellationToken::new())
        .unwrap();

    assert_eq!(executor.executed(), vec!["b", "a"]);
    assert_eq!(report.selected, vec!["b", "a"]);
    assert!(report.is_success());
}

#[test]
fn requested_dependency_runs_after_its_own_dependency() {
    let fetcher = MockFetcher::new(vec![
        recipe_with_deps("a", &["b"]),
        recipe_with_deps("b", &["c"]),
        recipe("c"),
    ]);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new();
    let prompter = ScriptedPrompter::answering("");

    let report = RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(&linux(), &by_name(&["a", "b"]), &CancellationToken::new())
        .unwrap();

    assert_eq!(report.selected, vec!["c", "b", "a"]);
    assert_eq!(executor.executed(), vec!["c", "b", "a"]);
}

#[test]
fn transitive_resolution_orders_whole_chain() {
    let fetcher = MockFetcher::new(vec![
        recipe_with_deps("app", &["runtime"]),
        recipe_with_deps("runtime", &["base"]),
        recipe("base"),
    ]);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new();
    let prompter = ScriptedPrompter::answering("");

    let options = by_name(&["app"]).with_resolution(ResolutionDepth::Transitive);
    RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(&linux(), &options, &CancellationToken::new())
        .unwrap();

    assert_eq!(executor.executed(), vec!["base", "runtime", "app"]);
}

#[test]
fn recommendations_used_when_nothing_requested() {
    let mut windows_only = recipe("iis");
    windows_only.install_targets = vec![InstallTarget::for_os("windows")];
    let fetcher = MockFetcher::new(vec![recipe("nginx"), windows_only, recipe("redis")]);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new();
    let prompter = ScriptedPrompter::answering("");

    RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(&linux(), &InstallOptions::new(), &CancellationToken::new())
        .unwrap();

    assert_eq!(fetcher.recommendation_calls(), 1);
    assert_eq!(executor.executed(), vec!["nginx", "redis"]);
}

#[test]
fn recipe_paths_take_priority_over_names() {
    let fetcher = MockFetcher::new(vec![recipe("redis")]);
    let loader = MockLoader::default().with("./custom.yml", recipe("custom"));
    let executor = RecordingExecutor::new();
    let prompter = ScriptedPrompter::answering("");

    let options = InstallOptions::new()
        .with_recipe_paths(["./custom.yml"])
        .with_recipe_names(["redis"]);
    RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(&linux(), &options, &CancellationToken::new())
        .unwrap();

    assert_eq!(executor.executed(), vec!["custom"]);
    assert_eq!(fetcher.calls_for("redis"), 0);
}

#[test]
fn unreadable_recipe_path_is_fatal() {
    let fetcher = MockFetcher::default();
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new();
    let prompter = ScriptedPrompter::answering("");

    let err = RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(
            &linux(),
            &InstallOptions::new().with_recipe_paths(["missing.yml"]),
            &CancellationToken::new(),
        )
        .unwrap_err();

    assert!(matches!(err, InstallError::LoadRecipe { location, .. } if location == "missing.yml"));
    assert!(executor.executed().is_empty());
}

#[test]
fn unfetchable_name_is_a_warning() {
    let fetcher = MockFetcher::new(vec![recipe("redis")]).failing("broken", 500);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new();
    let prompter = ScriptedPrompter::answering("");

    let report = RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(&linux(), &by_name(&["broken", "redis"]), &CancellationToken::new())
        .unwrap();

    assert_eq!(executor.executed(), vec!["redis"]);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("broken"));
}

#[test]
fn self_dependency_stops_the_run() {
    let fetcher = MockFetcher::new(vec![recipe_with_deps("loop", &["loop"])]);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new();
    let prompter = ScriptedPrompter::answering("");

    let err = RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(&linux(), &by_name(&["loop"]), &CancellationToken::new())
        .unwrap_err();

    assert!(matches!(err, InstallError::Resolve { recipe, .. } if recipe == "loop"));
}

// =========================================================================
// Infrastructure agent exclusion
// =========================================================================

#[test]
fn skip_infra_drops_requested_infra_recipe() {
    let fetcher = MockFetcher::new(vec![recipe(INFRA_AGENT_RECIPE_NAME), recipe("redis")]);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new();
    let prompter = ScriptedPrompter::answering("");

    let options = by_name(&[INFRA_AGENT_RECIPE_NAME, "redis"]).with_skip_infra(true);
    RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(&linux(), &options, &CancellationToken::new())
        .unwrap();

    assert_eq!(executor.executed(), vec!["redis"]);
    assert_eq!(fetcher.calls_for(INFRA_AGENT_RECIPE_NAME), 0);
}

#[test]
fn skip_infra_drops_infra_dependency() {
    let fetcher = MockFetcher::new(vec![
        recipe(INFRA_AGENT_RECIPE_NAME),
        recipe_with_deps("redis", &[INFRA_AGENT_RECIPE_NAME]),
    ]);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new();
    let prompter = ScriptedPrompter::answering("");

    let options = by_name(&["redis"]).with_skip_infra(true);
    let report = RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(&linux(), &options, &CancellationToken::new())
        .unwrap();

    assert_eq!(executor.executed(), vec!["redis"]);
    assert_eq!(report.selected, vec!["redis"]);
}

#[test]
fn infra_dependency_installed_without_skip_flag() {
    let fetcher = MockFetcher::new(vec![
        recipe(INFRA_AGENT_RECIPE_NAME),
        recipe_with_deps("redis", &[INFRA_AGENT_RECIPE_NAME]),
    ]);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new();
    let prompter = ScriptedPrompter::answering("");

    RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(&linux(), &by_name(&["redis"]), &CancellationToken::new())
        .unwrap();

    assert_eq!(executor.executed(), vec![INFRA_AGENT_RECIPE_NAME, "redis"]);
}

#[test]
fn skip_infra_applies_to_recommendations() {
    let fetcher = MockFetcher::new(vec![recipe(INFRA_AGENT_RECIPE_NAME), recipe("nginx")]);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new();
    let prompter = ScriptedPrompter::answering("");

    RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(
            &linux(),
            &InstallOptions::new().with_skip_infra(true),
            &CancellationToken::new(),
        )
        .unwrap();

    assert_eq!(executor.executed(), vec!["nginx"]);
}

// =========================================================================
// Variables and license key
// =========================================================================

#[test]
fn missing_license_key_aborts_before_execution() {
    let fetcher = MockFetcher::new(vec![recipe("redis"), recipe("nginx")]);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new();
    let prompter = ScriptedPrompter::answering("");

    let err = RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(String::new()))
        .install(&linux(), &by_name(&["redis", "nginx"]), &CancellationToken::new())
        .unwrap_err();

    assert!(err.is_missing_license_key());
    assert!(matches!(err, InstallError::MissingLicenseKey { recipe } if recipe == "redis"));
    assert!(executor.executed().is_empty());
}

#[test]
fn license_key_passed_as_reserved_variable() {
    let fetcher = MockFetcher::new(vec![recipe("redis")]);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new();
    let prompter = ScriptedPrompter::answering("");

    RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(&linux(), &by_name(&["redis"]), &CancellationToken::new())
        .unwrap();

    let request = executor.request("redis").unwrap();
    assert_eq!(request.variables.get(LICENSE_KEY_VARIABLE), Some(LICENSE_KEY));
    assert_eq!(request.install_steps, recipe("redis").install);
}

#[test]
#[serial]
fn input_from_environment_skips_prompt() {
    temp_env::with_var("LARDER_TEST_MYSQL_PORT", Some("3307"), || {
        let fetcher = MockFetcher::new(vec![recipe_with_input(
            "mysql",
            "LARDER_TEST_MYSQL_PORT",
            "MySQL port?",
            "3306",
        )]);
        let loader = MockLoader::default();
        let executor = RecordingExecutor::new();
        let prompter = ScriptedPrompter::answering("9999");

        RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
            .with_license_key(Some(LICENSE_KEY.to_string()))
            .install(&linux(), &by_name(&["mysql"]), &CancellationToken::new())
            .unwrap();

        assert!(prompter.asked().is_empty());
        let request = executor.request("mysql").unwrap();
        assert_eq!(request.variables.get("LARDER_TEST_MYSQL_PORT"), Some("3307"));
    });
}

#[test]
#[serial]
fn unset_input_prompts_exactly_once_with_declared_text() {
    temp_env::with_var_unset("LARDER_TEST_MYSQL_PORT", || {
        let fetcher = MockFetcher::new(vec![recipe_with_input(
            "mysql",
            "LARDER_TEST_MYSQL_PORT",
            "MySQL port?",
            "3306",
        )]);
        let loader = MockLoader::default();
        let executor = RecordingExecutor::new();
        let prompter = ScriptedPrompter::answering("3310");

        RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
            .with_license_key(Some(LICENSE_KEY.to_string()))
            .install(&linux(), &by_name(&["mysql"]), &CancellationToken::new())
            .unwrap();

        let asked = prompter.asked();
        assert_eq!(asked.len(), 1);
        assert_eq!(asked[0].message, "MySQL port?");
        assert_eq!(asked[0].default.as_deref(), Some("3306"));
        assert!(!asked[0].secret);

        let request = executor.request("mysql").unwrap();
        assert_eq!(request.variables.get("LARDER_TEST_MYSQL_PORT"), Some("3310"));
    });
}

#[test]
#[serial]
fn empty_answer_falls_back_to_default() {
    temp_env::with_var_unset("LARDER_TEST_MYSQL_PORT", || {
        let fetcher = MockFetcher::new(vec![recipe_with_input(
            "mysql",
            "LARDER_TEST_MYSQL_PORT",
            "MySQL port?",
            "3306",
        )]);
        let loader = MockLoader::default();
        let executor = RecordingExecutor::new();
        let prompter = ScriptedPrompter::answering("");

        RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
            .with_license_key(Some(LICENSE_KEY.to_string()))
            .install(&linux(), &by_name(&["mysql"]), &CancellationToken::new())
            .unwrap();

        let request = executor.request("mysql").unwrap();
        assert_eq!(request.variables.get("LARDER_TEST_MYSQL_PORT"), Some("3306"));
    });
}

#[test]
#[serial]
fn prompt_without_declared_text_names_the_variable() {
    temp_env::with_var_unset("LARDER_TEST_API_TOKEN", || {
        let fetcher = MockFetcher::new(vec![recipe_with_input(
            "api",
            "LARDER_TEST_API_TOKEN",
            "",
            "",
        )]);
        let loader = MockLoader::default();
        let executor = RecordingExecutor::new();
        let prompter = ScriptedPrompter::answering("token");

        RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
            .with_license_key(Some(LICENSE_KEY.to_string()))
            .install(&linux(), &by_name(&["api"]), &CancellationToken::new())
            .unwrap();

        let asked = prompter.asked();
        assert_eq!(asked[0].message, "value for LARDER_TEST_API_TOKEN required");
        assert_eq!(asked[0].default, None);
    });
}

#[test]
#[serial]
fn missing_input_fails_only_that_recipe() {
    temp_env::with_var_unset("LARDER_TEST_API_TOKEN", || {
        let fetcher = MockFetcher::new(vec![
            recipe_with_input("api", "LARDER_TEST_API_TOKEN", "Token?", ""),
            recipe("redis"),
        ]);
        let loader = MockLoader::default();
        let executor = RecordingExecutor::new();
        let prompter = ScriptedPrompter::unavailable();

        let report = RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
            .with_license_key(Some(LICENSE_KEY.to_string()))
            .install(&linux(), &by_name(&["api", "redis"]), &CancellationToken::new())
            .unwrap();

        assert_eq!(executor.executed(), vec!["redis"]);
        let failed: Vec<_> = report.failed().collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "api");
        assert!(failed[0].1.contains("LARDER_TEST_API_TOKEN"));
    });
}

#[test]
#[serial]
fn missing_input_with_fail_fast_returns_error() {
    temp_env::with_var_unset("LARDER_TEST_API_TOKEN", || {
        let fetcher = MockFetcher::new(vec![
            recipe_with_input("api", "LARDER_TEST_API_TOKEN", "Token?", ""),
            recipe("redis"),
        ]);
        let loader = MockLoader::default();
        let executor = RecordingExecutor::new();
        let prompter = ScriptedPrompter::unavailable();

        let err = RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
            .with_license_key(Some(LICENSE_KEY.to_string()))
            .install(
                &linux(),
                &by_name(&["api", "redis"]).with_fail_fast(true),
                &CancellationToken::new(),
            )
            .unwrap_err();

        assert!(err.is_missing_required_input());
        assert!(executor.executed().is_empty());
    });
}

// =========================================================================
// Executor failures and cancellation
// =========================================================================

#[test]
fn executor_failure_continues_with_next_recipe() {
    let fetcher = MockFetcher::new(vec![recipe("a"), recipe("b")]);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new().failing_on("a");
    let prompter = ScriptedPrompter::answering("");

    let report = RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(&linux(), &by_name(&["a", "b"]), &CancellationToken::new())
        .unwrap();

    assert_eq!(executor.executed(), vec!["a", "b"]);
    assert!(matches!(report.results[0].outcome, RecipeOutcome::Failed { .. }));
    assert_eq!(report.results[1].outcome, RecipeOutcome::Installed);
}

#[test]
fn executor_failure_with_fail_fast_stops() {
    let fetcher = MockFetcher::new(vec![recipe("a"), recipe("b")]);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new().failing_on("a");
    let prompter = ScriptedPrompter::answering("");

    let err = RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(
            &linux(),
            &by_name(&["a", "b"]).with_fail_fast(true),
            &CancellationToken::new(),
        )
        .unwrap_err();

    assert!(matches!(err, InstallError::Execution { recipe, .. } if recipe == "a"));
    assert_eq!(executor.executed(), vec!["a"]);
}

#[test]
fn cancellation_mid_run_keeps_completed_installs() {
    let cancel = CancellationToken::new();
    let fetcher = MockFetcher::new(vec![recipe("a"), recipe("b"), recipe("c")]);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new().cancelling_on("b", cancel.clone());
    let prompter = ScriptedPrompter::answering("");

    let err = RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(&linux(), &by_name(&["a", "b", "c"]), &cancel)
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(executor.executed(), vec!["a", "b"]);
}

#[test]
fn cancelled_before_start_fetches_nothing() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let fetcher = MockFetcher::new(vec![recipe("a")]);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new();
    let prompter = ScriptedPrompter::answering("");

    let err = RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(&linux(), &by_name(&["a"]), &cancel)
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(fetcher.calls().is_empty());
}

// =========================================================================
// Status observer
// =========================================================================

#[derive(Default)]
struct EventLog {
    events: RefCell<Vec<String>>,
}

impl InstallStatus for EventLog {
    fn recipes_selected(&self, recipes: &[Recipe]) {
        let names: Vec<_> = recipes.iter().map(|r| r.name.as_str()).collect();
        self.events
            .borrow_mut()
            .push(format!("selected {}", names.join(",")));
    }

    fn dependency_skipped(&self, skipped: &SkippedDependency) {
        self.events
            .borrow_mut()
            .push(format!("skipped {}", skipped.dependency));
    }

    fn recipe_installing(&self, recipe: &Recipe) {
        self.events
            .borrow_mut()
            .push(format!("installing {}", recipe.name));
    }

    fn recipe_installed(&self, recipe: &Recipe) {
        self.events
            .borrow_mut()
            .push(format!("installed {}", recipe.name));
    }

    fn recipe_failed(&self, recipe: &Recipe, _error: &InstallError) {
        self.events.borrow_mut().push(format!("failed {}", recipe.name));
    }
}

#[test]
fn status_observer_sees_each_stage() {
    let fetcher = MockFetcher::new(vec![recipe_with_deps("a", &["gone"]), recipe("b")]);
    let loader = MockLoader::default();
    let executor = RecordingExecutor::new().failing_on("b");
    let prompter = ScriptedPrompter::answering("");
    let status = EventLog::default();

    RecipeInstaller::new(&fetcher, &loader, &executor, &prompter)
        .with_status(&status)
        .with_license_key(Some(LICENSE_KEY.to_string()))
        .install(&linux(), &by_name(&["a", "b"]), &CancellationToken::new())
        .unwrap();

    assert_eq!(
        status.events.into_inner(),
        vec![
            "skipped gone",
            "selected a,b",
            "installing a",
            "installed a",
            "installing b",
            "failed b",
        ]
    );
}
