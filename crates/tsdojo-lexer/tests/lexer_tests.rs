//! Lexer tests: keywords, punctuators, literals, template literals,
//! comments, line-break tracking, error recovery, and determinism.

use tsdojo_lexer::{Lexer, Token, TokenKind};
use tsdojo_types::{ErrorCode, SourceFile};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn lex(source: &str) -> (Vec<Token>, tsdojo_types::Diagnostics) {
    let sf = SourceFile::new("solution.ts", source);
    let result = Lexer::new(&sf).lex();
    (result.tokens, result.errors)
}

/// Lex source text and return just the token kinds (excluding final Eof).
fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source)
        .0
        .into_iter()
        .filter(|t| t.kind != TokenKind::Eof)
        .map(|t| t.kind)
        .collect()
}

fn first_error(source: &str) -> Option<(ErrorCode, String)> {
    lex(source)
        .1
        .errors
        .first()
        .map(|e| (e.code, e.message.clone()))
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Identifier(name.to_string())
}

// ─────────────────────────────────────────────────────────────────────
// Keywords & identifiers
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_declaration_keywords() {
    assert_eq!(
        kinds("const let var function class enum export"),
        vec![
            TokenKind::Const,
            TokenKind::Let,
            TokenKind::Var,
            TokenKind::Function,
            TokenKind::Class,
            TokenKind::Enum,
            TokenKind::Export,
        ]
    );
}

#[test]
fn test_contextual_words_are_identifiers() {
    assert_eq!(
        kinds("async of type interface as"),
        vec![
            ident("async"),
            ident("of"),
            ident("type"),
            ident("interface"),
            ident("as"),
        ]
    );
}

#[test]
fn test_identifier_characters() {
    assert_eq!(
        kinds("$el _private camelCase2 café"),
        vec![
            ident("$el"),
            ident("_private"),
            ident("camelCase2"),
            ident("café"),
        ]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Punctuators
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_maximal_munch_operators() {
    assert_eq!(
        kinds("=== !== ** **= >>> >>>= ??= ?. ... =>"),
        vec![
            TokenKind::EqEqEq,
            TokenKind::BangEqEq,
            TokenKind::StarStar,
            TokenKind::StarStarEq,
            TokenKind::GreaterGreaterGreater,
            TokenKind::GreaterGreaterGreaterEq,
            TokenKind::QuestionQuestionEq,
            TokenKind::QuestionDot,
            TokenKind::DotDotDot,
            TokenKind::Arrow,
        ]
    );
}

#[test]
fn test_question_dot_before_digit_is_conditional() {
    assert_eq!(
        kinds("a?.5:1"),
        vec![
            ident("a"),
            TokenKind::Question,
            TokenKind::Number(0.5),
            TokenKind::Colon,
            TokenKind::Number(1.0),
        ]
    );
}

#[test]
fn test_logical_assignment_operators() {
    assert_eq!(
        kinds("a &&= b ||= c"),
        vec![
            ident("a"),
            TokenKind::AmpAmpEq,
            ident("b"),
            TokenKind::PipePipeEq,
            ident("c"),
        ]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Numbers
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_number_forms() {
    assert_eq!(
        kinds("42 3.14 .5 1e3 2.5E-2 0xff 0o17 0b101 1_000_000"),
        vec![
            TokenKind::Number(42.0),
            TokenKind::Number(3.14),
            TokenKind::Number(0.5),
            TokenKind::Number(1000.0),
            TokenKind::Number(0.025),
            TokenKind::Number(255.0),
            TokenKind::Number(15.0),
            TokenKind::Number(5.0),
            TokenKind::Number(1_000_000.0),
        ]
    );
}

#[test]
fn test_bigint_is_rejected() {
    let (code, message) = first_error("10n").unwrap();
    assert_eq!(code, ErrorCode::INVALID_NUMBER);
    assert!(message.contains("BigInt"));
}

#[test]
fn test_member_access_on_number_result() {
    assert_eq!(
        kinds("x.length"),
        vec![ident("x"), TokenKind::Dot, ident("length")]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Strings
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_both_quote_styles() {
    assert_eq!(
        kinds(r#"'single' "double" 'it\'s'"#),
        vec![
            TokenKind::String("single".into()),
            TokenKind::String("double".into()),
            TokenKind::String("it's".into()),
        ]
    );
}

#[test]
fn test_escape_sequences() {
    assert_eq!(
        kinds(r#""a\nb\t\x41B\u{1F600}\\""#),
        vec![TokenKind::String("a\nb\tAB\u{1F600}\\".into())]
    );
}

#[test]
fn test_surrogate_pair_escape_joins() {
    assert_eq!(
        kinds(r#""\uD83D\uDE00""#),
        vec![TokenKind::String("\u{1F600}".into())]
    );
}

#[test]
fn test_line_continuation() {
    assert_eq!(
        kinds("'ab\\\ncd'"),
        vec![TokenKind::String("abcd".into())]
    );
}

#[test]
fn test_unterminated_string() {
    let (code, _) = first_error("'oops\nlet x = 1").unwrap();
    assert_eq!(code, ErrorCode::UNTERMINATED_STRING);
}

#[test]
fn test_invalid_hex_escape() {
    let (code, _) = first_error(r#""\xZZ""#).unwrap();
    assert_eq!(code, ErrorCode::INVALID_ESCAPE);
}

// ─────────────────────────────────────────────────────────────────────
// Template literals
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_plain_template() {
    assert_eq!(
        kinds("`hello\nworld`"),
        vec![TokenKind::Template("hello\nworld".into())]
    );
}

#[test]
fn test_template_with_substitutions() {
    assert_eq!(
        kinds("`a${x}b${y}c`"),
        vec![
            TokenKind::TemplateStart("a".into()),
            TokenKind::InterpolationStart,
            ident("x"),
            TokenKind::InterpolationEnd,
            TokenKind::TemplatePart("b".into()),
            TokenKind::InterpolationStart,
            ident("y"),
            TokenKind::InterpolationEnd,
            TokenKind::TemplateEnd("c".into()),
        ]
    );
}

#[test]
fn test_object_literal_inside_substitution() {
    assert_eq!(
        kinds("`${ {a: 1}.a }`"),
        vec![
            TokenKind::TemplateStart(String::new()),
            TokenKind::InterpolationStart,
            TokenKind::LBrace,
            ident("a"),
            TokenKind::Colon,
            TokenKind::Number(1.0),
            TokenKind::RBrace,
            TokenKind::Dot,
            ident("a"),
            TokenKind::InterpolationEnd,
            TokenKind::TemplateEnd(String::new()),
        ]
    );
}

#[test]
fn test_nested_templates() {
    assert_eq!(
        kinds("`x${`y${z}`}`"),
        vec![
            TokenKind::TemplateStart("x".into()),
            TokenKind::InterpolationStart,
            TokenKind::TemplateStart("y".into()),
            TokenKind::InterpolationStart,
            ident("z"),
            TokenKind::InterpolationEnd,
            TokenKind::TemplateEnd(String::new()),
            TokenKind::InterpolationEnd,
            TokenKind::TemplateEnd(String::new()),
        ]
    );
}

#[test]
fn test_unterminated_template() {
    let (code, message) = first_error("`abc${x}").unwrap();
    assert_eq!(code, ErrorCode::UNTERMINATED_STRING);
    assert_eq!(message, "Unterminated template literal");
}

// ─────────────────────────────────────────────────────────────────────
// Regular expressions
// ─────────────────────────────────────────────────────────────────────

fn regex(pattern: &str, flags: &str) -> TokenKind {
    TokenKind::Regex {
        pattern: pattern.to_string(),
        flags: flags.to_string(),
    }
}

#[test]
fn test_regex_literal_with_flags() {
    assert_eq!(
        kinds(r"s.replace(/a\/b/gi, x)"),
        vec![
            ident("s"),
            TokenKind::Dot,
            ident("replace"),
            TokenKind::LParen,
            regex(r"a\/b", "gi"),
            TokenKind::Comma,
            ident("x"),
            TokenKind::RParen,
        ]
    );
}

#[test]
fn test_slash_in_class_does_not_close_regex() {
    assert_eq!(kinds("x = /[/]+/"), vec![ident("x"), TokenKind::Eq, regex("[/]+", "")]);
}

#[test]
fn test_slash_after_operand_is_division() {
    assert_eq!(
        kinds("a / b / (c) / 2"),
        vec![
            ident("a"),
            TokenKind::Slash,
            ident("b"),
            TokenKind::Slash,
            TokenKind::LParen,
            ident("c"),
            TokenKind::RParen,
            TokenKind::Slash,
            TokenKind::Number(2.0),
        ]
    );
    assert_eq!(kinds("n /= 2"), vec![ident("n"), TokenKind::SlashEq, TokenKind::Number(2.0)]);
}

#[test]
fn test_regex_after_return() {
    assert_eq!(kinds("return /x/;")[1], regex("x", ""));
}

#[test]
fn test_unterminated_regex() {
    let (code, message) = first_error("const r = /abc\n1").expect("error");
    assert_eq!(code, ErrorCode::UNTERMINATED_STRING);
    assert!(message.contains("regular expression"));
}

// ─────────────────────────────────────────────────────────────────────
// Comments & line breaks
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_comments_are_stripped() {
    assert_eq!(
        kinds("a // line\n/* block */ b /** doc\n */ c"),
        vec![ident("a"), ident("b"), ident("c")]
    );
}

#[test]
fn test_unterminated_block_comment() {
    let (code, _) = first_error("a /* never closed").unwrap();
    assert_eq!(code, ErrorCode::UNTERMINATED_COMMENT);
}

#[test]
fn test_newline_before_flags() {
    let (tokens, _) = lex("return\nx /*\n*/ y z");
    let flags: Vec<bool> = tokens.iter().map(|t| t.newline_before).collect();
    // return, x, y, z, Eof
    assert_eq!(flags, vec![false, true, true, false, false]);
}

// ─────────────────────────────────────────────────────────────────────
// Spans & recovery
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_spans_count_characters() {
    let (tokens, _) = lex("let é = 'ü'\n  x");
    assert_eq!(tokens[1].span.start_col, 5);
    assert_eq!(tokens[3].span.start_col, 9);
    assert_eq!(tokens[4].span.start_line, 2);
    assert_eq!(tokens[4].span.start_col, 3);
}

#[test]
fn test_invalid_character_recovers() {
    let (tokens, errors) = lex("a ¬ b");
    assert_eq!(errors.total_errors, 1);
    assert_eq!(errors.errors[0].code, ErrorCode::UNEXPECTED_CHARACTER);
    let names: Vec<_> = tokens.iter().filter_map(|t| t.kind.name_text()).collect();
    assert_eq!(names, vec!["a", "b"]);
}

#[test]
fn test_error_cap() {
    let source = "¬ ".repeat(50);
    let (tokens, errors) = lex(&source);
    assert_eq!(errors.errors.len(), tsdojo_types::MAX_ERRORS);
    assert_eq!(tokens.last().map(|t| &t.kind), Some(&TokenKind::Eof));
}

#[test]
fn test_always_ends_with_eof() {
    assert_eq!(lex("").0.len(), 1);
    assert_eq!(lex("   \n  ").0[0].kind, TokenKind::Eof);
}

#[test]
fn test_lexing_is_deterministic() {
    let source = "export async function f(a: number[]) { return `${a.length}` ?? 0 }";
    let first = lex(source).0;
    for _ in 0..50 {
        assert_eq!(lex(source).0, first);
    }
}
