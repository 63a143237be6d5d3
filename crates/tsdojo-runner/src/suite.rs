//! Suites, per-case results and the aggregate report.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tsdojo_types::Value;

use crate::runner::RunnerError;

/// One input/expected pair. The entry point is called with `input` as its
/// only argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    #[serde(default = "null_value")]
    pub input: Value,
    pub expected: Value,
}

fn null_value() -> Value {
    Value::Null
}

impl TestCase {
    pub fn new(input: impl Into<Value>, expected: impl Into<Value>) -> Self {
        Self {
            input: input.into(),
            expected: expected.into(),
        }
    }
}

/// An ordered list of cases under a display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    pub name: String,
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>, cases: Vec<TestCase>) -> Self {
        Self {
            name: name.into(),
            cases,
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self, RunnerError> {
        serde_json::from_str(text).map_err(|e| RunnerError::Suite(e.to_string()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self, RunnerError> {
        toml::from_str(text).map_err(|e| RunnerError::Suite(e.to_string()))
    }

    /// Read a suite file; `.toml` files are TOML, everything else JSON.
    pub fn load(path: &Path) -> Result<Self, RunnerError> {
        let text = std::fs::read_to_string(path).map_err(|e| RunnerError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&text)
        } else {
            Self::from_json_str(&text)
        }
    }
}

/// Why a case did not pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The submission did not parse or its top-level code failed.
    Compile,
    /// The submission exports nothing to call.
    ExportNotFound,
    /// The entry point threw or its promise rejected.
    Runtime,
    /// The case ran out of steps or its promise never settled.
    Timeout,
    /// The entry point returned a value different from the expected one.
    Mismatch,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Compile => "compile",
            ErrorKind::ExportNotFound => "export_not_found",
            ErrorKind::Runtime => "runtime",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Mismatch => "mismatch",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one case.
///
/// Either `actual` is set and `passed` reflects the comparison, or `error`
/// is set, `passed` is false and `actual` is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl TestResult {
    /// A case that produced a value; `passed` is the comparison verdict.
    pub fn compared(expected: Value, actual: Value, passed: bool) -> Self {
        Self {
            passed,
            expected: Some(expected),
            actual: Some(actual),
            error: None,
            error_kind: (!passed).then_some(ErrorKind::Mismatch),
        }
    }

    /// A case that failed before producing a value.
    pub fn failed(expected: Value, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            passed: false,
            expected: Some(expected),
            actual: None,
            error: Some(message.into()),
            error_kind: Some(kind),
        }
    }

    /// The single result reported when the submission cannot be loaded.
    pub fn compile_failure(message: impl fmt::Display) -> Self {
        Self {
            passed: false,
            expected: None,
            actual: None,
            error: Some(format!("Code evaluation failed: {message}")),
            error_kind: Some(ErrorKind::Compile),
        }
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed {
            if let Some(actual) = &self.actual {
                return write!(f, "✓ {actual}");
            }
            return f.write_str("✓");
        }
        match (&self.error, &self.actual, &self.expected) {
            (Some(error), _, _) => write!(
                f,
                "✗ [{}] {error}",
                self.error_kind.unwrap_or(ErrorKind::Runtime)
            ),
            (None, Some(actual), Some(expected)) => {
                write!(f, "✗ expected {expected}, got {actual}")
            }
            _ => f.write_str("✗"),
        }
    }
}

/// Results of one suite run with pass/fail totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestReport {
    pub name: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub results: Vec<TestResult>,
    /// `console` output of the submission, in order, across load and cases.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub console: Vec<String>,
}

impl TestReport {
    pub fn new(name: impl Into<String>, results: Vec<TestResult>) -> Self {
        let passed = results.iter().filter(|r| r.passed).count();
        Self {
            name: name.into(),
            total: results.len(),
            passed,
            failed: results.len() - passed,
            results,
            console: Vec::new(),
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        for (i, result) in self.results.iter().enumerate() {
            writeln!(f, "  {}. {result}", i + 1)?;
        }
        write!(
            f,
            "\n{} passed, {} failed, {} total",
            self.passed, self.failed, self.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_suite_with_nested_values() {
        let suite = TestSuite::from_json_str(
            r#"{
                "name": "Pairs",
                "cases": [
                    { "input": [1, 2], "expected": { "sum": 3 } },
                    { "expected": null }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(suite.name, "Pairs");
        assert_eq!(suite.cases[0].input, Value::Array(vec![1.0.into(), 2.0.into()]));
        assert_eq!(suite.cases[0].expected, Value::object([("sum", Value::Number(3.0))]));
        assert_eq!(suite.cases[1].input, Value::Null);
    }

    #[test]
    fn toml_suite() {
        let suite = TestSuite::from_toml_str(
            r#"
name = "Addition"

[[cases]]
input = 1
expected = 2

[[cases]]
input = "a"
expected = "a1"
"#,
        )
        .unwrap();
        assert_eq!(suite.cases.len(), 2);
        assert_eq!(suite.cases[0], TestCase::new(1.0, 2.0));
        assert_eq!(suite.cases[1], TestCase::new("a", "a1"));
    }

    #[test]
    fn malformed_suite_is_an_error() {
        assert!(matches!(
            TestSuite::from_json_str("{ \"cases\": [] }"),
            Err(RunnerError::Suite(_))
        ));
    }

    #[test]
    fn result_serialises_with_snake_case_kind() {
        let result = TestResult::failed(Value::Null, ErrorKind::ExportNotFound, "nothing");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["error_kind"], "export_not_found");
        assert_eq!(json["expected"], serde_json::Value::Null);
        assert!(json.get("actual").is_none());
    }

    #[test]
    fn report_totals() {
        let report = TestReport::new(
            "Mixed",
            vec![
                TestResult::compared(1.0.into(), 1.0.into(), true),
                TestResult::compared(1.0.into(), 2.0.into(), false),
                TestResult::failed(Value::Null, ErrorKind::Runtime, "boom"),
            ],
        );
        assert_eq!((report.total, report.passed, report.failed), (3, 1, 2));
        assert!(!report.all_passed());
        assert_eq!(report.results[1].error_kind, Some(ErrorKind::Mismatch));
        assert_eq!(report.results[1].error, None);
    }

    #[test]
    fn report_display() {
        let report = TestReport::new(
            "Addition",
            vec![
                TestResult::compared(2.0.into(), 2.0.into(), true),
                TestResult::compared(3.0.into(), 4.0.into(), false),
            ],
        );
        let text = report.to_string();
        assert!(text.contains("1. ✓ 2"), "{text}");
        assert!(text.contains("2. ✗ expected 3, got 4"), "{text}");
        assert!(text.ends_with("1 passed, 1 failed, 2 total"), "{text}");
    }
}
