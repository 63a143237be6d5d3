//! Shared types for the tsdojo evaluation pipeline.
//!
//! This crate defines source spans, front-end diagnostics, the AST of the
//! executed TypeScript subset, and the data-model [`Value`] that suites and
//! reports are written in.

mod error;
mod span;
pub mod ast;
pub mod value;

pub use error::{Checkpoint, Diagnostic, Diagnostics, ErrorCategory, ErrorCode, MAX_ERRORS};
pub use span::{SourceFile, Span};
pub use value::{format_number, Value};
