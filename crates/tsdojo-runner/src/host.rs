//! Evaluation host: loads a submission into a fresh interpreter and hands
//! back its exported values.

use std::fmt;

use tsdojo_eval::{ConsoleLine, EvalError, Interpreter, JsValue, Limits};
use tsdojo_types::{Diagnostics, SourceFile};

use crate::config::RunnerConfig;

/// File name diagnostics are reported against.
pub const SUBMISSION_FILE: &str = "solution.ts";

/// Why a submission could not be loaded.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    /// Lexical or syntax errors; displays the first one as `line:col: message`.
    #[error("{}", first_diagnostic(.0))]
    Syntax(Diagnostics),
    /// The top-level code threw.
    #[error("{0}")]
    Initialization(String),
    /// The top-level code ran out of steps.
    #[error("top-level code exceeded the step limit")]
    StepLimit,
    /// An extracted export has no binding.
    #[error("'{0}' is not defined")]
    MissingExport(String),
}

fn first_diagnostic(diagnostics: &Diagnostics) -> String {
    diagnostics
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "syntax error".to_string())
}

/// A loaded submission: the interpreter that ran it and its exports in
/// extraction order.
pub struct ExportMapping {
    interp: Interpreter,
    exports: Vec<(String, JsValue)>,
}

impl ExportMapping {
    pub fn len(&self) -> usize {
        self.exports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exports.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.exports.iter().map(|(name, _)| name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&JsValue> {
        self.exports
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    /// The symbol every case calls: the first export.
    pub fn entry_point(&self) -> Option<(&str, &JsValue)> {
        self.exports
            .first()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interp
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interp
    }

    /// Console output captured since the last call.
    pub fn take_console(&mut self) -> Vec<ConsoleLine> {
        self.interp.take_console()
    }
}

impl fmt::Debug for ExportMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportMapping")
            .field("exports", &self.names().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Something that can turn submission text into callable exports.
pub trait Evaluator {
    fn load(&self, code: &str, exports: &[String]) -> Result<ExportMapping, CompileError>;
}

/// The embedded tree-walking interpreter.
#[derive(Debug, Clone)]
pub struct ScriptEvaluator {
    limits: Limits,
}

impl ScriptEvaluator {
    pub fn new(config: &RunnerConfig) -> Self {
        Self {
            limits: Limits {
                step_limit: config.load_step_limit,
                max_call_depth: config.max_call_depth,
            },
        }
    }
}

impl Default for ScriptEvaluator {
    fn default() -> Self {
        Self::new(&RunnerConfig::default())
    }
}

impl Evaluator for ScriptEvaluator {
    fn load(&self, code: &str, exports: &[String]) -> Result<ExportMapping, CompileError> {
        let source = SourceFile::new(SUBMISSION_FILE, code);
        let parsed = tsdojo_parser::parse_source(&source);
        let program = match parsed.program {
            Some(program) if !parsed.errors.has_errors() => program,
            _ => return Err(CompileError::Syntax(parsed.errors)),
        };

        let mut interp = Interpreter::new(self.limits);
        match interp.run_program(&program) {
            Ok(()) => {}
            Err(EvalError::Throw(value)) => {
                return Err(CompileError::Initialization(interp.error_message(&value)))
            }
            Err(EvalError::GasExhausted) => return Err(CompileError::StepLimit),
            Err(EvalError::Suspended) => {
                return Err(CompileError::Initialization(
                    "top-level await never settled".to_string(),
                ))
            }
            Err(other) => return Err(CompileError::Initialization(other.to_string())),
        }

        let mut resolved = Vec::with_capacity(exports.len());
        for name in exports {
            let local = program.local_for_export(name).unwrap_or(name.as_str());
            let value = interp
                .binding(local)
                .ok_or_else(|| CompileError::MissingExport(name.clone()))?;
            resolved.push((name.clone(), value));
        }
        Ok(ExportMapping {
            interp,
            exports: resolved,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(code: &str, exports: &[&str]) -> Result<ExportMapping, CompileError> {
        let names: Vec<String> = exports.iter().map(|s| s.to_string()).collect();
        ScriptEvaluator::default().load(code, &names)
    }

    #[test]
    fn exports_keep_extraction_order() {
        let mapping = load("export const b = 2; export function a() {}", &["b", "a"]).unwrap();
        assert_eq!(mapping.names().collect::<Vec<_>>(), ["b", "a"]);
        assert_eq!(mapping.entry_point().map(|(name, _)| name), Some("b"));
        assert!(mapping.get("a").is_some_and(JsValue::is_callable));
    }

    #[test]
    fn aliases_resolve_to_local_bindings() {
        let mapping = load("function impl_() { return 1; } export { impl_ as run };", &["run"])
            .unwrap();
        assert!(mapping.get("run").is_some_and(JsValue::is_callable));
    }

    #[test]
    fn syntax_error_reports_position() {
        let err = load("export function broken(", &["broken"]).unwrap_err();
        assert!(matches!(err, CompileError::Syntax(_)));
        let text = err.to_string();
        assert!(text.starts_with("1:"), "{text}");
    }

    #[test]
    fn top_level_throw_fails_load() {
        let err = load("const x = missing + 1;", &[]).unwrap_err();
        assert_eq!(err.to_string(), "missing is not defined");
    }

    #[test]
    fn top_level_infinite_loop_hits_step_limit() {
        let config = RunnerConfig {
            load_step_limit: 10_000,
            ..RunnerConfig::default()
        };
        let err = ScriptEvaluator::new(&config)
            .load("while (true) {}", &[])
            .unwrap_err();
        assert!(matches!(err, CompileError::StepLimit));
    }

    #[test]
    fn unknown_export_is_missing() {
        let err = load("export function a() {}", &["ghost"]).unwrap_err();
        assert_eq!(err.to_string(), "'ghost' is not defined");
    }

    #[test]
    fn load_time_console_is_captured() {
        let mut mapping = load("console.log('loaded'); export const a = 1;", &["a"]).unwrap();
        let lines = mapping.take_console();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "loaded");
        assert!(mapping.take_console().is_empty());
    }
}
