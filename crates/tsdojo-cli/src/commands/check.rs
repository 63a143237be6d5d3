//! The `tsdojo check` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tsdojo_runner::extract_exports;
use tsdojo_types::SourceFile;

/// Returns false when the submission has diagnostics.
pub fn execute(code_path: PathBuf) -> Result<bool> {
    let code = std::fs::read_to_string(&code_path)
        .with_context(|| format!("cannot read {}", code_path.display()))?;
    let name = code_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "solution.ts".to_string());
    let source = SourceFile::new(name, code.as_str());

    let parsed = tsdojo_parser::parse_source(&source);
    if parsed.errors.has_errors() {
        for diag in &parsed.errors.errors {
            println!(
                "{}:{}: error[{}]: {}",
                diag.file, diag.span, diag.code, diag.message
            );
            if !diag.source_line.is_empty() {
                println!("    {}", diag.source_line.trim_end());
            }
        }
        let unstored = parsed.errors.total_errors - parsed.errors.errors.len();
        if unstored > 0 {
            println!("... and {unstored} more");
        }
        return Ok(false);
    }

    let exports = extract_exports(&code);
    if exports.is_empty() {
        println!("No exports found.");
    } else {
        println!("Exports: {}", exports.join(", "));
        println!("Entry point: {}", exports[0]);
    }
    Ok(true)
}
