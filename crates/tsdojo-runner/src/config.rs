//! Runner configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::runner::RunnerError;

/// Budgets for one `run_tests` call. Every field has a default, so a TOML
/// file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Steps the top-level code may take while loading.
    pub load_step_limit: u64,
    /// Steps each case may take, including its promise jobs and timers.
    pub case_step_limit: u64,
    /// Nested calls before learner code gets a `RangeError`.
    pub max_call_depth: usize,
    /// Stack size of the evaluation worker thread, in bytes.
    pub worker_stack_size: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            load_step_limit: 5_000_000,
            case_step_limit: 2_000_000,
            max_call_depth: 1000,
            worker_stack_size: 256 * 1024 * 1024,
        }
    }
}

impl RunnerConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, RunnerError> {
        toml::from_str(text).map_err(|e| RunnerError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, RunnerError> {
        let text = std::fs::read_to_string(path).map_err(|e| RunnerError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = RunnerConfig::from_toml_str("case_step_limit = 1000\n").unwrap();
        assert_eq!(config.case_step_limit, 1000);
        assert_eq!(config.load_step_limit, 5_000_000);
        assert_eq!(config.max_call_depth, 1000);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(RunnerConfig::from_toml_str("").unwrap(), RunnerConfig::default());
    }

    #[test]
    fn unknown_value_type_is_rejected() {
        let err = RunnerConfig::from_toml_str("max_call_depth = \"deep\"").unwrap_err();
        assert!(matches!(err, RunnerError::Config(_)));
    }
}
