//! `stratus test`: Run each service's test script against its dependencies.

use std::fmt;
use std::path::Path;

use clap::Args;
use stratus_common::config::StratusConfig;
use stratus_common::context::AppContext;
use stratus_compose::builder::ComposeBuilder;
use stratus_compose::graph::startup_order;
use stratus_compose::partial::ConfigurationPartial;
use stratus_compose::writer::{compose_project_name, write_compose_file};
use stratus_deploy::adapters::DockerCli;
use stratus_deploy::cancel::CancelToken;
use stratus_deploy::runtime::ContainerRuntime;

use super::compose::{application_partial, output_dir};
use super::stack::LocalStack;
use super::{ModeArg, load_app};
use crate::output::row;

/// Arguments for the `test` command.
#[derive(Args, Debug)]
pub struct TestArgs {
    /// Run tests without mounting service sources.
    #[arg(long)]
    pub no_mount: bool,
}

/// Result of one service's test run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    /// The test container exited with status 0.
    Passed,
    /// The test container exited with a non-zero status.
    Failed {
        /// Status the container exited with.
        exit_code: i64,
    },
    /// The service declares no test script.
    Skipped,
}

impl TestOutcome {
    /// Outcome of a test container that exited with `exit_code`.
    pub const fn from_exit_code(exit_code: i64) -> Self {
        if exit_code == 0 {
            Self::Passed
        } else {
            Self::Failed { exit_code }
        }
    }
}

impl fmt::Display for TestOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("passed"),
            Self::Failed { exit_code } => write!(f, "failed (exit code {exit_code})"),
            Self::Skipped => f.write_str("no test script"),
        }
    }
}

/// Outcomes of every service, in test order.
#[derive(Debug, Default)]
pub struct TestReport {
    outcomes: Vec<(String, TestOutcome)>,
}

impl TestReport {
    /// Records the outcome of `role`.
    pub fn record(&mut self, role: &str, outcome: TestOutcome) {
        self.outcomes.push((role.to_string(), outcome));
    }

    /// Roles whose tests failed.
    pub fn failures(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, TestOutcome::Failed { .. }))
            .map(|(role, _)| role.as_str())
            .collect()
    }

    fn print(&self) {
        let width = self.outcomes.iter().map(|(role, _)| role.len()).max().unwrap_or_default();
        eprintln!();
        for (role, outcome) in &self.outcomes {
            eprintln!("    {}", row(&[role, &outcome.to_string()], &[width, 0]));
        }
    }

    /// `Ok` when no service failed; the process exits non-zero otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error naming every failed service.
    pub fn into_result(self) -> anyhow::Result<()> {
        let failures = self.failures();
        if failures.is_empty() {
            return Ok(());
        }
        anyhow::bail!("tests failed for {}", failures.join(", "))
    }
}

/// Executes the `test` command.
///
/// # Errors
///
/// Returns an error if the application cannot be compiled or started, or
/// any service's tests fail.
pub fn execute(app_dir: &Path, config: &StratusConfig, args: &TestArgs) -> anyhow::Result<()> {
    let ctx = load_app(app_dir)?;
    let mode = ModeArg::Test.build_mode(args.no_mount);
    let partial = application_partial(&ctx, mode)?;
    let _ = write_compose_file(&output_dir(&ctx, config, mode), &partial)?;

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    ctrlc::set_handler(move || on_interrupt.cancel())
        .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {e}"))?;

    let runtime = DockerCli::locate(&config.docker_bin)?;
    let report = test_services(&runtime, &ctx, &ComposeBuilder::new(&ctx, mode), &cancel)?;
    report.print();
    report.into_result()
}

/// Runs every service's test script, one service at a time, each on a
/// fresh set of dependency containers.
///
/// # Errors
///
/// Returns an error if a graph cannot be compiled or started, or the run
/// is interrupted. Failing tests are recorded, not returned.
pub fn test_services(
    runtime: &dyn ContainerRuntime,
    ctx: &AppContext,
    builder: &ComposeBuilder<'_>,
    cancel: &CancelToken,
) -> anyhow::Result<TestReport> {
    let project = compose_project_name(&ctx.dir);
    let dependencies = builder.dependencies_partial()?;
    let mut report = TestReport::default();
    for role in ctx.definition.sorted_roles() {
        if cancel.is_cancelled() {
            anyhow::bail!("interrupted before testing {role}");
        }
        let partial = dependencies.clone().merge(builder.service_partial(role)?);
        if partial.services.get(role).is_none_or(|spec| spec.command.is_none()) {
            report.record(role, TestOutcome::Skipped);
            continue;
        }
        eprintln!("  Testing {role}...");
        let outcome = TestOutcome::from_exit_code(run_suite(runtime, ctx, &project, &partial, role, cancel)?);
        tracing::info!(service = role, outcome = %outcome, "tests finished");
        report.record(role, outcome);
    }
    Ok(report)
}

/// Starts the dependencies, runs `role` to completion and tears everything
/// down, returning the test container's exit code.
fn run_suite(
    runtime: &dyn ContainerRuntime,
    ctx: &AppContext,
    project: &str,
    partial: &ConfigurationPartial,
    role: &str,
    cancel: &CancelToken,
) -> anyhow::Result<i64> {
    let support: Vec<String> = startup_order(partial)?
        .into_iter()
        .filter(|name| name != role)
        .collect();
    let mut stack = LocalStack::up(runtime, ctx, project, partial, &support, cancel)?;
    let exit_code = stack
        .start(ctx, partial, role, cancel)
        .and_then(|container| runtime.wait_for_exit(&container, cancel).map_err(anyhow::Error::from));
    let teardown = stack.teardown();
    let exit_code = exit_code?;
    teardown?;
    Ok(exit_code)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use stratus_common::app::{ApplicationDefinition, ServiceSource};
    use stratus_common::dependency::DependencyDescriptor;
    use stratus_common::mode::BuildMode;
    use stratus_common::service::ServiceConfig;

    use super::*;
    use crate::commands::stack::tests::RecordingRuntime;

    fn ctx() -> AppContext {
        let mut definition = ApplicationDefinition {
            name: "todo-app".into(),
            ..ApplicationDefinition::default()
        };
        let _ = definition.services.insert(
            "api".into(),
            ServiceSource {
                location: Some("./api".into()),
                ..ServiceSource::default()
            },
        );
        let _ = definition.services.insert(
            "proxy".into(),
            ServiceSource {
                docker_image: Some("nginx:1.13".into()),
                ..ServiceSource::default()
            },
        );
        definition.local.dependencies.push(DependencyDescriptor::new("exocom", "0.26.1"));

        let mut api = ServiceConfig::default();
        api.development.scripts.test = Some("npm test".into());
        api.local.dependencies.push(DependencyDescriptor::new("mongo", "3.4.0"));
        let services = BTreeMap::from([
            ("api".to_string(), api),
            ("proxy".to_string(), ServiceConfig::default()),
        ]);
        AppContext::from_parts("/apps/todo", definition, services)
    }

    fn outcome(report: &TestReport, role: &str) -> Option<TestOutcome> {
        report
            .outcomes
            .iter()
            .find(|(recorded, _)| recorded == role)
            .map(|(_, outcome)| *outcome)
    }

    fn run(runtime: &RecordingRuntime) -> TestReport {
        let ctx = ctx();
        let builder = ComposeBuilder::with_secret_lookup(&ctx, BuildMode::local_test(), |_| None);
        test_services(runtime, &ctx, &builder, &CancelToken::new()).expect("report")
    }

    #[test]
    fn exit_code_decides_the_outcome() {
        assert_eq!(TestOutcome::from_exit_code(0), TestOutcome::Passed);
        assert_eq!(TestOutcome::from_exit_code(1), TestOutcome::Failed { exit_code: 1 });
        assert_eq!(TestOutcome::from_exit_code(137), TestOutcome::Failed { exit_code: 137 });
    }

    #[test]
    fn any_failure_makes_the_run_fail() {
        let mut report = TestReport::default();
        report.record("api", TestOutcome::Failed { exit_code: 2 });
        report.record("proxy", TestOutcome::Skipped);
        report.record("web", TestOutcome::Passed);
        assert_eq!(report.failures(), vec!["api"]);
        let err = report.into_result().expect_err("failed run");
        assert_eq!(err.to_string(), "tests failed for api");
    }

    #[test]
    fn passes_and_skips_make_the_run_succeed() {
        let mut report = TestReport::default();
        report.record("api", TestOutcome::Passed);
        report.record("proxy", TestOutcome::Skipped);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn service_tests_run_against_their_dependencies() {
        let runtime = RecordingRuntime::default();
        let report = run(&runtime);
        assert_eq!(outcome(&report, "api"), Some(TestOutcome::Passed));
        assert_eq!(outcome(&report, "proxy"), Some(TestOutcome::Skipped));

        let calls = runtime.calls();
        let position = |call: &str| calls.iter().position(|c| c == call).expect(call);
        assert!(position("run mongo3.4.0 on todo") < position("run api on todo"));
        assert!(position("run exocom0.26.1 on todo") < position("run api on todo"));
        assert!(position("run api on todo") < position("wait api"));
        assert!(position("wait api") < position("stop api"));
        assert!(position("stop api") < position("stop mongo3.4.0"));
        assert_eq!(calls.last().map(String::as_str), Some("network rm todo"));
    }

    #[test]
    fn failing_tests_are_recorded_and_cleaned_up() {
        let runtime = RecordingRuntime {
            exit_code: 1,
            ..RecordingRuntime::default()
        };
        let report = run(&runtime);
        assert_eq!(outcome(&report, "api"), Some(TestOutcome::Failed { exit_code: 1 }));
        assert!(runtime.calls().iter().any(|call| call == "rm api"));
        assert!(report.into_result().is_err());
    }
}
