//! The suite runner: extract, load once, then invoke and compare each case.

use tracing::{debug, info, warn};
use tsdojo_eval::ConsoleLine;

use crate::compare::compare;
use crate::config::RunnerConfig;
use crate::exports::extract_exports;
use crate::host::{Evaluator, ScriptEvaluator};
use crate::invoker::{invoke, Outcome};
use crate::suite::{TestReport, TestResult, TestSuite};

/// Failures of the host itself. Learner-code failures are reported in
/// [`TestResult`]s and never surface here.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("failed to start evaluation worker: {0}")]
    Spawn(String),
    #[error("evaluation worker panicked: {0}")]
    WorkerPanicked(String),
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },
    #[error("invalid suite: {0}")]
    Suite(String),
    #[error("invalid runner configuration: {0}")]
    Config(String),
}

/// Results of one evaluation plus everything the submission logged.
struct Evaluation {
    results: Vec<TestResult>,
    console: Vec<String>,
}

/// Runs suites against submissions, each on its own worker thread.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    config: RunnerConfig,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// One result per case, in suite order; a submission that fails to load
    /// yields a single `compile` result instead.
    pub fn run_tests(&self, code: &str, suite: &TestSuite) -> Result<Vec<TestResult>, RunnerError> {
        Ok(self.run_on_worker(code, suite)?.results)
    }

    /// [`Runner::run_tests`] with totals and captured console output.
    pub fn run_report(&self, code: &str, suite: &TestSuite) -> Result<TestReport, RunnerError> {
        let evaluation = self.run_on_worker(code, suite)?;
        let mut report = TestReport::new(suite.name.clone(), evaluation.results);
        report.console = evaluation.console;
        Ok(report)
    }

    fn run_on_worker(&self, code: &str, suite: &TestSuite) -> Result<Evaluation, RunnerError> {
        let config = self.config.clone();
        let code = code.to_string();
        let suite = suite.clone();
        let handle = std::thread::Builder::new()
            .name("tsdojo-eval".to_string())
            .stack_size(config.worker_stack_size)
            .spawn(move || {
                let evaluator = ScriptEvaluator::new(&config);
                evaluate(&evaluator, &code, &suite, config.case_step_limit)
            })
            .map_err(|e| RunnerError::Spawn(e.to_string()))?;
        handle.join().map_err(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            RunnerError::WorkerPanicked(message)
        })
    }
}

/// Run `suite` against `code` with the default configuration.
pub fn run_tests(code: &str, suite: &TestSuite) -> Result<Vec<TestResult>, RunnerError> {
    Runner::default().run_tests(code, suite)
}

/// Run `suite` against `code` with the default configuration and summarise.
pub fn run_report(code: &str, suite: &TestSuite) -> Result<TestReport, RunnerError> {
    Runner::default().run_report(code, suite)
}

/// Evaluate on the current thread with any [`Evaluator`].
pub fn run_with(
    evaluator: &dyn Evaluator,
    code: &str,
    suite: &TestSuite,
    case_step_limit: u64,
) -> Vec<TestResult> {
    evaluate(evaluator, code, suite, case_step_limit).results
}

fn evaluate(
    evaluator: &dyn Evaluator,
    code: &str,
    suite: &TestSuite,
    case_step_limit: u64,
) -> Evaluation {
    info!(suite = %suite.name, cases = suite.cases.len(), "running suite");
    let names = extract_exports(code);
    debug!(exports = ?names, "extracted exports");

    let mut mapping = match evaluator.load(code, &names) {
        Ok(mapping) => mapping,
        Err(err) => {
            warn!(suite = %suite.name, error = %err, "submission failed to load");
            return Evaluation {
                results: vec![TestResult::compile_failure(&err)],
                console: Vec::new(),
            };
        }
    };

    let mut console = render_console(mapping.take_console());
    let mut results = Vec::with_capacity(suite.cases.len());
    for (index, case) in suite.cases.iter().enumerate() {
        let result = match invoke(&mut mapping, &case.input, case_step_limit) {
            Outcome::Returned(actual) => {
                let passed = compare(&actual, &case.expected);
                TestResult::compared(case.expected.clone(), actual, passed)
            }
            Outcome::Failed { kind, message } => {
                TestResult::failed(case.expected.clone(), kind, message)
            }
        };
        debug!(case = index + 1, passed = result.passed, kind = ?result.error_kind, "case finished");
        console.extend(render_console(mapping.take_console()));
        results.push(result);
    }

    let passed = results.iter().filter(|r| r.passed).count();
    info!(
        suite = %suite.name,
        passed,
        failed = results.len() - passed,
        "suite finished"
    );
    Evaluation { results, console }
}

fn render_console(lines: Vec<ConsoleLine>) -> Vec<String> {
    lines
        .into_iter()
        .map(|line| {
            debug!(level = line.level.as_str(), "console: {}", line.text);
            line.text
        })
        .collect()
}
