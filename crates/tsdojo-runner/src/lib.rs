//! tsdojo runner: judges a learner's TypeScript submission against a suite
//! of input/expected pairs.
//!
//! The pipeline is export extraction (a token scan), a single load of the
//! submission into a fresh interpreter, then per case an invocation of the
//! first export followed by a structural comparison.
//!
//! ```no_run
//! use tsdojo_runner::{run_tests, TestCase, TestSuite};
//!
//! let code = "export function inc(a: number) { return a + 1; }";
//! let suite = TestSuite::new("Increment", vec![TestCase::new(1.0, 2.0)]);
//! let results = run_tests(code, &suite).unwrap();
//! assert!(results[0].passed);
//! ```

pub mod compare;
pub mod config;
pub mod exports;
pub mod host;
pub mod invoker;
pub mod runner;
pub mod suite;

pub use compare::compare;
pub use config::RunnerConfig;
pub use exports::extract_exports;
pub use host::{CompileError, Evaluator, ExportMapping, ScriptEvaluator};
pub use invoker::{invoke, Outcome};
pub use runner::{run_report, run_tests, run_with, Runner, RunnerError};
pub use suite::{ErrorKind, TestCase, TestReport, TestResult, TestSuite};
pub use tsdojo_types::Value;
