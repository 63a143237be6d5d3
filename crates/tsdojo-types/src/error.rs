use crate::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of diagnostics stored before the front end stops.
pub const MAX_ERRORS: usize = 20;

/// Diagnostic category, derived from the code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Lexical,
    Syntax,
    Unsupported,
    Limit,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lexical => "lexical",
            Self::Syntax => "syntax",
            Self::Unsupported => "unsupported",
            Self::Limit => "limit",
        })
    }
}

/// Numeric diagnostic code (E100–E499).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Lexical (E100–E199) ──
    pub const UNEXPECTED_CHARACTER: Self = Self(100);
    pub const UNTERMINATED_STRING: Self = Self(101);
    pub const UNTERMINATED_COMMENT: Self = Self(102);
    pub const INVALID_ESCAPE: Self = Self(103);
    pub const INVALID_NUMBER: Self = Self(104);

    // ── Syntax (E200–E299) ──
    pub const UNEXPECTED_TOKEN: Self = Self(200);
    pub const UNCLOSED_DELIMITER: Self = Self(201);
    pub const INVALID_ASSIGNMENT_TARGET: Self = Self(202);
    pub const MISSING_INITIALIZER: Self = Self(203);
    pub const ILLEGAL_STATEMENT: Self = Self(204);
    pub const DUPLICATE_EXPORT: Self = Self(205);

    // ── Unsupported features (E300–E399) ──
    pub const UNSUPPORTED_SYNTAX: Self = Self(300);
    pub const MODULE_SYNTAX: Self = Self(301);

    // ── Structural limits (E400–E499) ──
    pub const NESTING_TOO_DEEP: Self = Self(400);

    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Lexical,
            300..=399 => ErrorCategory::Unsupported,
            400..=499 => ErrorCategory::Limit,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// A structured front-end diagnostic (lexer or parser).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{span}: {message}")]
pub struct Diagnostic {
    pub file: String,
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub message: String,
    #[serde(flatten)]
    pub span: Span,
    /// The source line the diagnostic points into.
    pub source_line: String,
}

impl Diagnostic {
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
        }
    }
}

/// Diagnostics collected by one front-end pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub errors: Vec<Diagnostic>,
    pub total_errors: usize,
}

/// Saved diagnostic state for speculative parsing.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    stored: usize,
    total: usize,
}

impl Diagnostics {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        self.total_errors > 0
    }

    /// Record an error; only the first [`MAX_ERRORS`] are stored.
    pub fn push_error(&mut self, error: Diagnostic) {
        if self.errors.len() < MAX_ERRORS {
            self.errors.push(error);
        }
        self.total_errors += 1;
    }

    /// Append everything from another pass (lexer errors ahead of parser errors).
    pub fn extend(&mut self, other: Diagnostics) {
        let unstored = other.total_errors.saturating_sub(other.errors.len());
        for error in other.errors {
            self.push_error(error);
        }
        self.total_errors += unstored;
    }

    pub fn first(&self) -> Option<&Diagnostic> {
        self.errors.first()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            stored: self.errors.len(),
            total: self.total_errors,
        }
    }

    /// Forget every error recorded after `checkpoint`.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        self.errors.truncate(checkpoint.stored);
        self.total_errors = checkpoint.total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(message: &str) -> Diagnostic {
        Diagnostic::new(
            "solution.ts",
            ErrorCode::UNEXPECTED_TOKEN,
            message,
            Span::new(1, 24, 1, 25),
            "export function broken(",
        )
    }

    #[test]
    fn code_categories_follow_ranges() {
        assert_eq!(ErrorCode::UNTERMINATED_STRING.category(), ErrorCategory::Lexical);
        assert_eq!(ErrorCode::UNEXPECTED_TOKEN.category(), ErrorCategory::Syntax);
        assert_eq!(ErrorCode::MODULE_SYNTAX.category(), ErrorCategory::Unsupported);
        assert_eq!(ErrorCode::NESTING_TOO_DEEP.category(), ErrorCategory::Limit);
        assert_eq!(ErrorCode::UNEXPECTED_TOKEN.to_string(), "E200");
    }

    #[test]
    fn diagnostic_display_leads_with_position() {
        assert_eq!(diag("expected ')'").to_string(), "1:24: expected ')'");
    }

    #[test]
    fn stored_errors_are_capped_but_counted() {
        let mut errs = Diagnostics::empty();
        for i in 0..25 {
            errs.push_error(diag(&format!("error {i}")));
        }
        assert_eq!(errs.errors.len(), MAX_ERRORS);
        assert_eq!(errs.total_errors, 25);
    }

    #[test]
    fn rollback_discards_speculative_errors() {
        let mut errs = Diagnostics::empty();
        errs.push_error(diag("kept"));
        let cp = errs.checkpoint();
        errs.push_error(diag("speculative"));
        errs.rollback(cp);
        assert_eq!(errs.total_errors, 1);
        assert_eq!(errs.first().map(|d| d.message.as_str()), Some("kept"));
    }

    #[test]
    fn json_uses_flattened_span() {
        let json = serde_json::to_string(&diag("expected ')'")).unwrap();
        assert!(json.contains("\"line\":1"));
        assert!(json.contains("\"column\":24"));
        assert!(json.contains("\"category\":\"syntax\""));
    }
}
