//! The `tsdojo run` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tsdojo_runner::{Runner, RunnerConfig, TestSuite};

use crate::Format;

/// Returns whether every case passed.
pub fn execute(
    code_path: PathBuf,
    suite_path: PathBuf,
    format: Format,
    config_path: Option<PathBuf>,
    case_step_limit: Option<u64>,
) -> Result<bool> {
    let mut config = match &config_path {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    };
    if let Some(limit) = case_step_limit {
        config.case_step_limit = limit;
    }

    let code = std::fs::read_to_string(&code_path)
        .with_context(|| format!("cannot read {}", code_path.display()))?;
    let suite = TestSuite::load(&suite_path)?;
    tracing::debug!(?config, suite = %suite_path.display(), "loaded inputs");

    let report = Runner::new(config).run_report(&code, &suite)?;
    match format {
        Format::Text => println!("{report}"),
        Format::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(report.all_passed())
}
