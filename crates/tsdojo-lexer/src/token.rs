//! Token types for the tsdojo lexer.
//!
//! Defines [`TokenKind`] covering every lexeme of the executed TypeScript
//! subset and [`Token`], which pairs a kind with a source [`Span`] and the
//! line-break flag used for automatic semicolon insertion.

use std::fmt;
use tsdojo_types::Span;

/// Reserved words that always lex as keyword tokens.
///
/// Contextual words (`async`, `of`, `get`, `set`, `static`, `type`, `as`,
/// `interface`, `readonly`, ...) are plain identifiers; the parser checks
/// their text where they matter.
pub const ALL_KEYWORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "import", "in", "instanceof", "let", "new", "null", "return", "super", "switch", "this",
    "throw", "true", "try", "typeof", "var", "void", "while", "with",
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A line terminator appears between the previous token and this one.
    pub newline_before: bool,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            newline_before: false,
        }
    }

    pub fn is_keyword(&self) -> bool {
        self.kind.is_keyword()
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // ── Literals ──────────────────────────────────────────────
    Number(f64),
    /// `'text'` or `"text"`, escapes already resolved.
    String(String),
    /// A template literal without substitutions: `` `plain` ``.
    Template(String),
    /// `/pattern/flags`, body kept verbatim.
    Regex { pattern: String, flags: String },

    // ── Template Literals ────────────────────────────────────
    /// Text from the opening backtick to the first `${`.
    TemplateStart(String),
    /// Text between a closing `}` and the next `${`.
    TemplatePart(String),
    /// Text after the last `}` up to the closing backtick.
    TemplateEnd(String),
    /// The `${` that opens a substitution.
    InterpolationStart,
    /// The `}` that closes a substitution.
    InterpolationEnd,

    Identifier(String),

    // ── Keywords ─────────────────────────────────────────────
    Await,
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Enum,
    Export,
    Extends,
    False,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    InstanceOf,
    Let,
    New,
    Null,
    Return,
    Super,
    Switch,
    This,
    Throw,
    True,
    Try,
    TypeOf,
    Var,
    Void,
    While,
    With,

    // ── Arithmetic & bitwise ─────────────────────────────────
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    LessLess,
    GreaterGreater,
    GreaterGreaterGreater,
    Amp,
    Pipe,
    Caret,
    Tilde,

    // ── Comparison & logic ───────────────────────────────────
    EqEq,
    EqEqEq,
    BangEq,
    BangEqEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Bang,
    AmpAmp,
    PipePipe,
    QuestionQuestion,

    // ── Assignment ───────────────────────────────────────────
    Eq,
    PlusEq,
    MinusEq,
    StarEq,
    StarStarEq,
    SlashEq,
    PercentEq,
    LessLessEq,
    GreaterGreaterEq,
    GreaterGreaterGreaterEq,
    AmpEq,
    PipeEq,
    CaretEq,
    AmpAmpEq,
    PipePipeEq,
    QuestionQuestionEq,

    // ── Punctuation ──────────────────────────────────────────
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Colon,
    Dot,
    DotDotDot,
    Question,
    /// `?.`
    QuestionDot,
    /// `=>`
    Arrow,
    /// `@` (decorators, rejected by the parser)
    At,
    /// `#` (private names, rejected by the parser)
    Hash,

    Eof,
}

impl TokenKind {
    pub fn from_keyword(s: &str) -> Option<TokenKind> {
        Some(match s {
            "await" => TokenKind::Await,
            "break" => TokenKind::Break,
            "case" => TokenKind::Case,
            "catch" => TokenKind::Catch,
            "class" => TokenKind::Class,
            "const" => TokenKind::Const,
            "continue" => TokenKind::Continue,
            "debugger" => TokenKind::Debugger,
            "default" => TokenKind::Default,
            "delete" => TokenKind::Delete,
            "do" => TokenKind::Do,
            "else" => TokenKind::Else,
            "enum" => TokenKind::Enum,
            "export" => TokenKind::Export,
            "extends" => TokenKind::Extends,
            "false" => TokenKind::False,
            "finally" => TokenKind::Finally,
            "for" => TokenKind::For,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "import" => TokenKind::Import,
            "in" => TokenKind::In,
            "instanceof" => TokenKind::InstanceOf,
            "let" => TokenKind::Let,
            "new" => TokenKind::New,
            "null" => TokenKind::Null,
            "return" => TokenKind::Return,
            "super" => TokenKind::Super,
            "switch" => TokenKind::Switch,
            "this" => TokenKind::This,
            "throw" => TokenKind::Throw,
            "true" => TokenKind::True,
            "try" => TokenKind::Try,
            "typeof" => TokenKind::TypeOf,
            "var" => TokenKind::Var,
            "void" => TokenKind::Void,
            "while" => TokenKind::While,
            "with" => TokenKind::With,
            _ => return None,
        })
    }

    pub fn is_keyword(&self) -> bool {
        self.keyword_text().is_some()
    }

    /// Source text of a keyword token; reserved words may still serve as
    /// property names (`obj.default`, `{ new: 1 }`).
    pub fn keyword_text(&self) -> Option<&'static str> {
        Some(match self {
            TokenKind::Await => "await",
            TokenKind::Break => "break",
            TokenKind::Case => "case",
            TokenKind::Catch => "catch",
            TokenKind::Class => "class",
            TokenKind::Const => "const",
            TokenKind::Continue => "continue",
            TokenKind::Debugger => "debugger",
            TokenKind::Default => "default",
            TokenKind::Delete => "delete",
            TokenKind::Do => "do",
            TokenKind::Else => "else",
            TokenKind::Enum => "enum",
            TokenKind::Export => "export",
            TokenKind::Extends => "extends",
            TokenKind::False => "false",
            TokenKind::Finally => "finally",
            TokenKind::For => "for",
            TokenKind::Function => "function",
            TokenKind::If => "if",
            TokenKind::Import => "import",
            TokenKind::In => "in",
            TokenKind::InstanceOf => "instanceof",
            TokenKind::Let => "let",
            TokenKind::New => "new",
            TokenKind::Null => "null",
            TokenKind::Return => "return",
            TokenKind::Super => "super",
            TokenKind::Switch => "switch",
            TokenKind::This => "this",
            TokenKind::Throw => "throw",
            TokenKind::True => "true",
            TokenKind::Try => "try",
            TokenKind::TypeOf => "typeof",
            TokenKind::Var => "var",
            TokenKind::Void => "void",
            TokenKind::While => "while",
            TokenKind::With => "with",
            _ => return None,
        })
    }

    /// Identifier text, or keyword text when the keyword is used as a name.
    pub fn name_text(&self) -> Option<&str> {
        match self {
            TokenKind::Identifier(name) => Some(name),
            other => other.keyword_text(),
        }
    }

    /// Whether this token can end an operand. A `/` after such a token is
    /// division; anywhere else it opens a regular expression literal.
    pub fn ends_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::Number(_)
                | TokenKind::String(_)
                | TokenKind::Template(_)
                | TokenKind::TemplateEnd(_)
                | TokenKind::Regex { .. }
                | TokenKind::Identifier(_)
                | TokenKind::This
                | TokenKind::Super
                | TokenKind::Null
                | TokenKind::True
                | TokenKind::False
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::RBrace
                | TokenKind::PlusPlus
                | TokenKind::MinusMinus
        )
    }

    /// Identifier with exactly this text (contextual keyword check).
    pub fn is_word(&self, word: &str) -> bool {
        matches!(self, TokenKind::Identifier(name) if name == word)
    }

    fn punctuator_text(&self) -> Option<&'static str> {
        Some(match self {
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::StarStar => "**",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::LessLess => "<<",
            TokenKind::GreaterGreater => ">>",
            TokenKind::GreaterGreaterGreater => ">>>",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Tilde => "~",
            TokenKind::EqEq => "==",
            TokenKind::EqEqEq => "===",
            TokenKind::BangEq => "!=",
            TokenKind::BangEqEq => "!==",
            TokenKind::Less => "<",
            TokenKind::Greater => ">",
            TokenKind::LessEq => "<=",
            TokenKind::GreaterEq => ">=",
            TokenKind::Bang => "!",
            TokenKind::AmpAmp => "&&",
            TokenKind::PipePipe => "||",
            TokenKind::QuestionQuestion => "??",
            TokenKind::Eq => "=",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::StarEq => "*=",
            TokenKind::StarStarEq => "**=",
            TokenKind::SlashEq => "/=",
            TokenKind::PercentEq => "%=",
            TokenKind::LessLessEq => "<<=",
            TokenKind::GreaterGreaterEq => ">>=",
            TokenKind::GreaterGreaterGreaterEq => ">>>=",
            TokenKind::AmpEq => "&=",
            TokenKind::PipeEq => "|=",
            TokenKind::CaretEq => "^=",
            TokenKind::AmpAmpEq => "&&=",
            TokenKind::PipePipeEq => "||=",
            TokenKind::QuestionQuestionEq => "??=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::DotDotDot => "...",
            TokenKind::Question => "?",
            TokenKind::QuestionDot => "?.",
            TokenKind::Arrow => "=>",
            TokenKind::At => "@",
            TokenKind::Hash => "#",
            _ => return None,
        })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(text) = self.keyword_text().or_else(|| self.punctuator_text()) {
            return f.write_str(text);
        }
        match self {
            TokenKind::Number(n) => f.write_str(&tsdojo_types::format_number(*n)),
            TokenKind::String(s) => write!(f, "'{s}'"),
            TokenKind::Template(_) => f.write_str("template literal"),
            TokenKind::Regex { .. } => f.write_str("regular expression"),
            TokenKind::TemplateStart(_) => f.write_str("template start"),
            TokenKind::TemplatePart(_) => f.write_str("template part"),
            TokenKind::TemplateEnd(_) => f.write_str("template end"),
            TokenKind::InterpolationStart => f.write_str("${"),
            TokenKind::InterpolationEnd => f.write_str("}"),
            TokenKind::Identifier(name) => f.write_str(name),
            TokenKind::Eof => f.write_str("end of file"),
            _ => f.write_str("token"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_reserved_word_maps_to_a_keyword() {
        for word in ALL_KEYWORDS {
            let kind = TokenKind::from_keyword(word).unwrap();
            assert_eq!(kind.keyword_text(), Some(*word));
            assert_eq!(kind.to_string(), *word);
        }
    }

    #[test]
    fn contextual_words_stay_identifiers() {
        for word in ["async", "of", "get", "set", "static", "type", "as", "interface"] {
            assert_eq!(TokenKind::from_keyword(word), None, "{word}");
        }
    }

    #[test]
    fn operands_decide_slash_meaning() {
        assert!(TokenKind::Identifier("x".into()).ends_operand());
        assert!(TokenKind::RParen.ends_operand());
        assert!(!TokenKind::Return.ends_operand());
        assert!(!TokenKind::LParen.ends_operand());
        assert!(!TokenKind::Eq.ends_operand());
    }

    #[test]
    fn keywords_can_serve_as_names() {
        assert_eq!(TokenKind::Default.name_text(), Some("default"));
        assert_eq!(TokenKind::Identifier("x".into()).name_text(), Some("x"));
        assert_eq!(TokenKind::Comma.name_text(), None);
    }
}
