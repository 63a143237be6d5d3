//! Export discovery by token scan.
//!
//! The submission is tokenised but never parsed or run, so extraction works
//! on code that does not compile. Only declarations at bracket depth 0 count.

use tsdojo_lexer::{Lexer, Token, TokenKind};
use tsdojo_types::SourceFile;

/// Names the submission exports at the top level, in source order, without
/// duplicates. `export default`, type-only exports, enums and destructuring
/// exports are not entry points and are skipped.
pub fn extract_exports(code: &str) -> Vec<String> {
    let source = SourceFile::new("solution.ts", code);
    // Lexical errors leave a partial stream; scan whatever came back.
    let tokens = Lexer::new(&source).lex().tokens;

    let mut names: Vec<String> = Vec::new();
    let mut depth: usize = 0;
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i].kind {
            TokenKind::LParen
            | TokenKind::LBrace
            | TokenKind::LBracket
            | TokenKind::InterpolationStart => depth += 1,
            TokenKind::RParen
            | TokenKind::RBrace
            | TokenKind::RBracket
            | TokenKind::InterpolationEnd => depth = depth.saturating_sub(1),
            TokenKind::Export if depth == 0 => {
                let (found, next) = export_clause(&tokens, i + 1);
                for name in found {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
                i = next;
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    names
}

/// Read what follows an `export` keyword at `start`. Returns the exported
/// names and where scanning resumes.
fn export_clause(tokens: &[Token], start: usize) -> (Vec<String>, usize) {
    let kind = |i: usize| tokens.get(i).map(|t| &t.kind);
    let ident = |i: usize| match kind(i) {
        Some(TokenKind::Identifier(name)) => Some(name.clone()),
        _ => None,
    };

    match kind(start) {
        Some(TokenKind::Const | TokenKind::Let | TokenKind::Var) => {
            (ident(start + 1).into_iter().collect(), start + 1)
        }
        Some(TokenKind::Function) => {
            let name_at = if kind(start + 1) == Some(&TokenKind::Star) {
                start + 2
            } else {
                start + 1
            };
            (ident(name_at).into_iter().collect(), start + 1)
        }
        Some(TokenKind::Class) => (ident(start + 1).into_iter().collect(), start + 1),
        Some(k) if k.is_word("async") && kind(start + 1) == Some(&TokenKind::Function) => {
            (ident(start + 2).into_iter().collect(), start + 1)
        }
        Some(k) if k.is_word("abstract") && kind(start + 1) == Some(&TokenKind::Class) => {
            (ident(start + 2).into_iter().collect(), start + 1)
        }
        Some(TokenKind::LBrace) => export_list(tokens, start + 1),
        _ => (Vec::new(), start),
    }
}

/// `{ a, b as c, type T }` up to the closing brace.
fn export_list(tokens: &[Token], start: usize) -> (Vec<String>, usize) {
    let mut names = Vec::new();
    let mut i = start;
    loop {
        let Some(token) = tokens.get(i) else {
            return (names, i);
        };
        match &token.kind {
            TokenKind::RBrace => return (names, i + 1),
            TokenKind::Eof => return (names, i),
            TokenKind::Comma => i += 1,
            kind => {
                let Some(local) = kind.name_text() else {
                    // Malformed list; let the outer scan see this token.
                    return (names, i);
                };
                let mut exported = local.to_string();
                let mut type_only = false;
                i += 1;
                if local == "type" {
                    if let Some(next) = tokens.get(i).and_then(|t| t.kind.name_text()) {
                        if next != "as" {
                            type_only = true;
                            exported = next.to_string();
                            i += 1;
                        }
                    }
                }
                if tokens.get(i).is_some_and(|t| t.kind.is_word("as")) {
                    if let Some(alias) = tokens.get(i + 1).and_then(|t| t.kind.name_text()) {
                        exported = alias.to_string();
                        i += 2;
                    }
                }
                if !type_only && exported != "default" {
                    names.push(exported);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_in_order() {
        let code = r#"
            export function add(a: number) { return a + 1; }
            export const PI = 3.14;
            export let counter = 0;
            export var legacy = 1;
            export class Shape {}
            export async function load() {}
            export abstract class Base {}
        "#;
        assert_eq!(
            extract_exports(code),
            ["add", "PI", "counter", "legacy", "Shape", "load", "Base"]
        );
    }

    #[test]
    fn export_lists_and_aliases() {
        let code = "function a() {} const b = 1; export { a, b as renamed, type T };";
        assert_eq!(extract_exports(code), ["a", "renamed"]);
    }

    #[test]
    fn non_entry_points_are_skipped() {
        let code = r#"
            export default function main() {}
            export type Id = string;
            export interface Point { x: number }
            export enum Color { Red }
            export const { x, y } = { x: 1, y: 2 };
            export { helper as default };
            export function real() {}
        "#;
        assert_eq!(extract_exports(code), ["real"]);
    }

    #[test]
    fn nested_exports_are_ignored() {
        let code = r#"
            namespace Inner { export function hidden() {} }
            const text = `${ { export: 1 } }`;
            export function visible() {}
        "#;
        assert_eq!(extract_exports(code), ["visible"]);
    }

    #[test]
    fn duplicates_keep_first_occurrence() {
        let code = "export function a() {} export function b() {} export { a };";
        assert_eq!(extract_exports(code), ["a", "b"]);
    }

    #[test]
    fn broken_code_still_scans() {
        assert_eq!(extract_exports("export function broken("), ["broken"]);
        assert_eq!(
            extract_exports("export const ok = 1; const s = 'unterminated"),
            ["ok"]
        );
    }

    #[test]
    fn no_exports_is_empty() {
        assert!(extract_exports("function local() {}").is_empty());
        assert!(extract_exports("").is_empty());
    }

    #[test]
    fn text_in_strings_and_comments_is_not_code() {
        let code = r#"
            // export function commented() {}
            const s = "export function quoted() {}";
            export function actual() {}
        "#;
        assert_eq!(extract_exports(code), ["actual"]);
    }
}
