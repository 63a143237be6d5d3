//! Parser tests: declarations, expressions (precedence, arrows, chains),
//! destructuring, classes, exports, TypeScript erasure, statements,
//! error reporting and recovery, nesting limits, and determinism.

use tsdojo_parser::{parse_source, ParseResult};
use tsdojo_types::ast::*;
use tsdojo_types::{ErrorCode, SourceFile};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn parse(source: &str) -> ParseResult {
    let sf = SourceFile::new("solution.ts", source);
    parse_source(&sf)
}

/// Parse source and return the program, panicking if there are errors.
fn parse_ok(source: &str) -> Program {
    let result = parse(source);
    if result.errors.has_errors() {
        for e in &result.errors.errors {
            eprintln!("  ERROR: {} ({})", e.message, e.code);
        }
        panic!("unexpected parse errors (see above)");
    }
    result.program.expect("no program returned")
}

fn first_error_code(source: &str) -> ErrorCode {
    let result = parse(source);
    assert!(result.program.is_none(), "expected errors for {source:?}");
    result.errors.errors[0].code
}

/// The initializer of the first declarator of a variable statement.
fn init_of(stmt: &Stmt) -> &Expr {
    match &stmt.kind {
        StmtKind::Var(decl) => decl.declarators[0].init.as_ref().expect("initializer"),
        other => panic!("expected variable declaration, got {other:?}"),
    }
}

/// Parse `const x = <expr>;` and return the expression.
fn parse_init(expr: &str) -> Expr {
    let program = parse_ok(&format!("const x = {expr};"));
    init_of(&program.body[0]).clone()
}

fn ident_name(expr: &Expr) -> &str {
    match &expr.kind {
        ExprKind::Identifier(name) => name,
        other => panic!("expected identifier, got {other:?}"),
    }
}

fn function_def(stmt: &Stmt) -> &FunctionDef {
    match &stmt.kind {
        StmtKind::Function(def) => def,
        other => panic!("expected function declaration, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Declarations & exports
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_exported_function_with_types() {
    let program = parse_ok("export function inc(a: number): number { return a + 1 }");
    assert_eq!(program.body.len(), 1);
    let def = function_def(&program.body[0]);
    assert_eq!(def.name_str(), "inc");
    assert_eq!(def.params.len(), 1);
    assert!(!def.is_async);
    assert_eq!(program.exports.len(), 1);
    assert_eq!(program.exports[0].exported, "inc");
    assert_eq!(program.local_for_export("inc"), Some("inc"));
}

#[test]
fn test_export_list_aliases() {
    let program = parse_ok("function add(a, b) { return a + b }\nexport { add as sum, add };");
    assert_eq!(program.local_for_export("sum"), Some("add"));
    assert_eq!(program.local_for_export("add"), Some("add"));
    assert_eq!(program.local_for_export("missing"), None);
}

#[test]
fn test_export_const_destructuring_records_every_name() {
    let program = parse_ok("export const { a, b: [c] } = source, d = 1;");
    let names: Vec<_> = program.exports.iter().map(|e| e.exported.as_str()).collect();
    assert_eq!(names, vec!["a", "c", "d"]);
}

#[test]
fn test_export_default_expression_binds_default() {
    let program = parse_ok("export default 42;");
    assert_eq!(program.local_for_export("default"), Some("default"));
    assert!(matches!(init_of(&program.body[0]).kind, ExprKind::Number(n) if n == 42.0));
}

#[test]
fn test_export_default_named_function() {
    let program = parse_ok("export default function solve() { return 1 }");
    assert_eq!(program.local_for_export("default"), Some("solve"));
    assert_eq!(function_def(&program.body[0]).name_str(), "solve");
}

#[test]
fn test_duplicate_export() {
    assert_eq!(
        first_error_code("export const a = 1;\nconst b = 2;\nexport { b as a };"),
        ErrorCode::DUPLICATE_EXPORT
    );
}

#[test]
fn test_async_function_declaration() {
    let program = parse_ok("export async function load(x) { return await x }");
    assert!(function_def(&program.body[0]).is_async);
}

#[test]
fn test_overload_signatures_are_dropped() {
    let program = parse_ok(
        "function f(a: string): string;\nfunction f(a: number): number;\nfunction f(a: any) { return a }",
    );
    assert_eq!(program.body.len(), 3);
    assert!(matches!(program.body[0].kind, StmtKind::Empty));
    assert!(matches!(program.body[1].kind, StmtKind::Empty));
    assert_eq!(function_def(&program.body[2]).params.len(), 1);
}

#[test]
fn test_enum_members() {
    let program = parse_ok("enum Color { Red, Green = 4, Blue, }");
    match &program.body[0].kind {
        StmtKind::Enum(decl) => {
            assert_eq!(decl.name.name, "Color");
            let names: Vec<_> = decl.members.iter().map(|m| m.name.as_str()).collect();
            assert_eq!(names, vec!["Red", "Green", "Blue"]);
            assert!(decl.members[1].init.is_some());
        }
        other => panic!("expected enum, got {other:?}"),
    }
}

#[test]
fn test_const_enum() {
    let program = parse_ok("const enum Dir { Up = 1, Down }");
    assert!(matches!(program.body[0].kind, StmtKind::Enum(_)));
}

// ─────────────────────────────────────────────────────────────────────
// TypeScript erasure
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_type_only_declarations_become_empty() {
    let program = parse_ok(
        "type Point = { x: number; y: number };\ninterface Shape extends Base<T> { area(): number }\ndeclare const VERSION: string;\nconst x = 1",
    );
    assert_eq!(program.body.len(), 4);
    for stmt in &program.body[..3] {
        assert!(matches!(stmt.kind, StmtKind::Empty), "got {:?}", stmt.kind);
    }
    assert!(matches!(program.body[3].kind, StmtKind::Var(_)));
}

#[test]
fn test_nested_generic_annotation_splits_shift() {
    let program = parse_ok("let grid: Array<Array<number>> = [];\nconst m = new Map<string, number[]>();");
    assert_eq!(program.body.len(), 2);
    match &init_of(&program.body[1]).kind {
        ExprKind::New { callee, args } => {
            assert_eq!(ident_name(callee), "Map");
            assert!(args.is_empty());
        }
        other => panic!("expected new expression, got {other:?}"),
    }
}

#[test]
fn test_complex_types_are_skipped() {
    parse_ok(
        r#"type Fn = <T>(x: T) => T;
type Pick2<T, K extends keyof T> = { [P in K]: T[P] };
type Cond<T> = T extends string ? "s" : T extends number ? "n" : never;
type Tpl = `id-${number}`;
function isStr(x: unknown): x is string { return typeof x === "string" }
let u: string | null | undefined = null;
let t: [number, string][] = [];
let r: readonly number[] = [];"#,
    );
}

#[test]
fn test_generic_call_versus_comparison() {
    let call = parse_init("identity<number>(5)");
    assert!(matches!(call.kind, ExprKind::Call { .. }));

    let compare = parse_init("a < b");
    assert!(matches!(
        compare.kind,
        ExprKind::Binary {
            op: BinOp::Less,
            ..
        }
    ));
}

#[test]
fn test_assertions_leave_the_value() {
    let expr = parse_init("(value as any).field!");
    match &expr.kind {
        ExprKind::Member {
            object, property, ..
        } => {
            assert_eq!(ident_name(object), "value");
            assert_eq!(property, &MemberProp::Static("field".into()));
        }
        other => panic!("expected member, got {other:?}"),
    }
    assert_eq!(ident_name(&parse_init("<number>raw")), "raw");
    assert_eq!(ident_name(&parse_init("config satisfies Config")), "config");
}

// ─────────────────────────────────────────────────────────────────────
// Expressions
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_multiplication_binds_tighter() {
    match parse_init("1 + 2 * 3").kind {
        ExprKind::Binary {
            op: BinOp::Add,
            right,
            ..
        } => assert!(matches!(
            right.kind,
            ExprKind::Binary {
                op: BinOp::Mul,
                ..
            }
        )),
        other => panic!("expected addition, got {other:?}"),
    }
}

#[test]
fn test_exponent_is_right_associative() {
    match parse_init("2 ** 3 ** 2").kind {
        ExprKind::Binary {
            op: BinOp::Exp,
            left,
            right,
        } => {
            assert!(matches!(left.kind, ExprKind::Number(n) if n == 2.0));
            assert!(matches!(
                right.kind,
                ExprKind::Binary {
                    op: BinOp::Exp,
                    ..
                }
            ));
        }
        other => panic!("expected exponent, got {other:?}"),
    }
}

#[test]
fn test_logical_and_binds_tighter_than_or() {
    match parse_init("a || b && c").kind {
        ExprKind::Logical {
            op: LogicalOp::Or,
            right,
            ..
        } => assert!(matches!(
            right.kind,
            ExprKind::Logical {
                op: LogicalOp::And,
                ..
            }
        )),
        other => panic!("expected ||, got {other:?}"),
    }
}

#[test]
fn test_arrow_functions() {
    let arrow = parse_init("(a: number, b = 2): number => a + b");
    match &arrow.kind {
        ExprKind::Function(def) => {
            assert!(def.is_arrow);
            assert_eq!(def.params.len(), 2);
            assert!(matches!(def.params[1].pattern, Pattern::Assign { .. }));
            assert!(matches!(def.body, FunctionBody::Expr(_)));
        }
        other => panic!("expected arrow, got {other:?}"),
    }

    let single = parse_init("async x => await x");
    match &single.kind {
        ExprKind::Function(def) => {
            assert!(def.is_arrow && def.is_async);
            assert_eq!(def.params[0].pattern.bound_names(), vec!["x"]);
        }
        other => panic!("expected arrow, got {other:?}"),
    }

    let block = parse_init("<T,>(items: T[]) => { return items }");
    assert!(matches!(block.kind, ExprKind::Function(_)));
}

#[test]
fn test_parenthesized_conditional_is_not_an_arrow() {
    assert!(matches!(
        parse_init("ok ? (a) : b").kind,
        ExprKind::Conditional { .. }
    ));
}

#[test]
fn test_async_call_is_not_an_arrow() {
    match parse_init("async(1, 2)").kind {
        ExprKind::Call { callee, args, .. } => {
            assert_eq!(ident_name(&callee), "async");
            assert_eq!(args.len(), 2);
        }
        other => panic!("expected call, got {other:?}"),
    }
}

#[test]
fn test_optional_chain_wraps_whole_chain() {
    match parse_init("a?.b.c").kind {
        ExprKind::OptionalChain(inner) => match inner.kind {
            ExprKind::Member {
                object,
                optional: false,
                ..
            } => assert!(matches!(
                object.kind,
                ExprKind::Member { optional: true, .. }
            )),
            other => panic!("expected member, got {other:?}"),
        },
        other => panic!("expected optional chain, got {other:?}"),
    }
}

#[test]
fn test_optional_call() {
    match parse_init("handler?.(event)").kind {
        ExprKind::OptionalChain(inner) => {
            assert!(matches!(inner.kind, ExprKind::Call { optional: true, .. }))
        }
        other => panic!("expected optional chain, got {other:?}"),
    }
}

#[test]
fn test_template_literal() {
    match parse_init("`a${x}b${y + 1}c`").kind {
        ExprKind::Template { quasis, exprs } => {
            assert_eq!(quasis, vec!["a", "b", "c"]);
            assert_eq!(exprs.len(), 2);
        }
        other => panic!("expected template, got {other:?}"),
    }
}

#[test]
fn test_regex_literal() {
    match parse_init("/^(\\d+)-[a/z]$/g").kind {
        ExprKind::Regex { pattern, flags } => {
            assert_eq!(pattern, "^(\\d+)-[a/z]$");
            assert_eq!(flags, "g");
        }
        other => panic!("expected regex, got {other:?}"),
    }
    match parse_init("a / b / c").kind {
        ExprKind::Binary { .. } => {}
        other => panic!("expected division, got {other:?}"),
    }
}

#[test]
fn test_object_literal_forms() {
    match parse_init("{ a, b: 2, [k]: 3, 4: 'four', m() { return 1 }, get g() { return 2 }, ...rest }").kind {
        ExprKind::Object(props) => {
            assert_eq!(props.len(), 7);
            assert!(matches!(props[0], ObjectProp::Shorthand(_)));
            assert!(matches!(&props[1], ObjectProp::KeyValue(PropKey::Static(k), _) if k == "b"));
            assert!(matches!(props[2], ObjectProp::KeyValue(PropKey::Computed(_), _)));
            assert!(matches!(&props[3], ObjectProp::KeyValue(PropKey::Static(k), _) if k == "4"));
            assert!(matches!(props[4], ObjectProp::Method(..)));
            assert!(matches!(props[5], ObjectProp::Getter(..)));
            assert!(matches!(props[6], ObjectProp::Spread(_)));
        }
        other => panic!("expected object, got {other:?}"),
    }
}

#[test]
fn test_array_literal_holes_and_spread() {
    match parse_init("[1, , ...xs]").kind {
        ExprKind::Array(elements) => {
            assert_eq!(elements.len(), 3);
            assert!(matches!(elements[1], ArrayElement::Hole));
            assert!(matches!(elements[2], ArrayElement::Spread(_)));
        }
        other => panic!("expected array, got {other:?}"),
    }
}

#[test]
fn test_keywords_as_property_names() {
    let expr = parse_init("promise.catch(handler).finally(done).default");
    assert!(matches!(expr.kind, ExprKind::Member { .. }));
}

#[test]
fn test_compound_and_logical_assignment() {
    let program = parse_ok("total += 2;\ncache ??= {};");
    match &program.body[0].kind {
        StmtKind::Expr(Expr {
            kind: ExprKind::Assign { op, .. },
            ..
        }) => assert_eq!(*op, AssignOp::Compound(BinOp::Add)),
        other => panic!("expected assignment, got {other:?}"),
    }
    match &program.body[1].kind {
        StmtKind::Expr(Expr {
            kind: ExprKind::Assign { op, .. },
            ..
        }) => assert_eq!(*op, AssignOp::Logical(LogicalOp::Nullish)),
        other => panic!("expected assignment, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_declaration_destructuring() {
    let program = parse_ok("const { a, b: [c, d = 1], ...rest } = obj;");
    match &program.body[0].kind {
        StmtKind::Var(decl) => {
            assert_eq!(
                decl.declarators[0].target.bound_names(),
                vec!["a", "c", "d", "rest"]
            );
        }
        other => panic!("expected declaration, got {other:?}"),
    }
}

#[test]
fn test_destructuring_assignment_swap() {
    let program = parse_ok("let a = 1, b = 2;\n[a, b] = [b, a];");
    match &program.body[1].kind {
        StmtKind::Expr(Expr {
            kind: ExprKind::Assign { target, .. },
            ..
        }) => assert!(matches!(**target, Pattern::Array { .. })),
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn test_object_assignment_pattern_with_default() {
    let program = parse_ok("let a, b;\n({ a, b = 5 } = source);");
    match &program.body[1].kind {
        StmtKind::Expr(Expr {
            kind: ExprKind::Assign { target, .. },
            ..
        }) => assert_eq!(target.bound_names(), vec!["a", "b"]),
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn test_invalid_assignment_target() {
    assert_eq!(first_error_code("1 = 2;"), ErrorCode::INVALID_ASSIGNMENT_TARGET);
    assert_eq!(first_error_code("f()++;"), ErrorCode::INVALID_ASSIGNMENT_TARGET);
}

// ─────────────────────────────────────────────────────────────────────
// Classes
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_class_members() {
    let program = parse_ok(
        r#"class Point implements Shape {
  static count: number = 0;
  label?: string;
  constructor(private x: number, public y = 0) {}
  get sum(): number { return this.x + this.y }
  set sum(v: number) {}
  static origin() { return new Point(0) }
  async load() {}
  abstract area(): number;
}"#,
    );
    let class = match &program.body[0].kind {
        StmtKind::Class(class) => class.clone(),
        other => panic!("expected class, got {other:?}"),
    };
    let ctor = class.constructor.as_ref().expect("constructor");
    assert!(ctor.params.iter().all(|p| p.property));
    assert_eq!(class.members.len(), 6);
    assert!(class.members[0].is_static);
    assert!(matches!(class.members[1].kind, ClassMemberKind::Field(None)));
    assert!(matches!(class.members[2].kind, ClassMemberKind::Getter(_)));
    assert!(matches!(class.members[3].kind, ClassMemberKind::Setter(_)));
    assert!(class.members[4].is_static);
    match &class.members[5].kind {
        ClassMemberKind::Method(def) => assert!(def.is_async),
        other => panic!("expected method, got {other:?}"),
    }
}

#[test]
fn test_class_extends_with_super() {
    let program = parse_ok(
        "class ValidationError extends Error {\n  constructor(msg: string) { super(msg); this.name = 'ValidationError' }\n  describe() { return super.toString() }\n}",
    );
    match &program.body[0].kind {
        StmtKind::Class(class) => {
            assert_eq!(ident_name(class.super_class.as_ref().expect("base")), "Error");
            assert!(class.constructor.is_some());
        }
        other => panic!("expected class, got {other:?}"),
    }
}

#[test]
fn test_modifier_words_as_member_names() {
    let program = parse_ok("class Odd { static() { return 1 } get = 2; readonly: number = 3 }");
    match &program.body[0].kind {
        StmtKind::Class(class) => {
            let keys: Vec<_> = class
                .members
                .iter()
                .map(|m| match &m.key {
                    PropKey::Static(k) => k.as_str(),
                    PropKey::Computed(_) => "<computed>",
                })
                .collect();
            assert_eq!(keys, vec!["static", "get", "readonly"]);
            assert!(class.members.iter().all(|m| !m.is_static));
        }
        other => panic!("expected class, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Statements
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_for_loop_forms() {
    let program = parse_ok(
        "for (let i = 0, j = 10; i < j; i++, j--) {}\nfor (const [k, v] of entries) {}\nfor (const key in obj) {}\nfor (item of items) {}\nfor (;;) { break }",
    );
    assert!(matches!(program.body[0].kind, StmtKind::For { init: Some(ForInit::Var(_)), .. }));
    assert!(matches!(
        program.body[1].kind,
        StmtKind::ForOf {
            binding: ForBinding::Decl(VarKind::Const, Pattern::Array { .. }),
            ..
        }
    ));
    assert!(matches!(program.body[2].kind, StmtKind::ForIn { .. }));
    assert!(matches!(
        program.body[3].kind,
        StmtKind::ForOf {
            binding: ForBinding::Target(Pattern::Ident(_)),
            ..
        }
    ));
    assert!(matches!(
        program.body[4].kind,
        StmtKind::For {
            init: None,
            test: None,
            update: None,
            ..
        }
    ));
}

#[test]
fn test_in_operator_inside_for_init_parens() {
    let program = parse_ok("for (let found = ('a' in obj); !found; ) { found = true }");
    assert!(matches!(program.body[0].kind, StmtKind::For { .. }));
}

#[test]
fn test_switch_statement() {
    let program = parse_ok("switch (x) { case 1: case 2: y(); break; default: z() }");
    match &program.body[0].kind {
        StmtKind::Switch { cases, .. } => {
            assert_eq!(cases.len(), 3);
            assert!(cases[0].body.is_empty());
            assert_eq!(cases[1].body.len(), 2);
            assert!(cases[2].test.is_none());
        }
        other => panic!("expected switch, got {other:?}"),
    }
}

#[test]
fn test_try_with_optional_catch_binding() {
    let program = parse_ok("try { f() } catch { g() } finally { h() }");
    match &program.body[0].kind {
        StmtKind::Try {
            handler: Some(handler),
            finalizer: Some(_),
            ..
        } => assert!(handler.param.is_none()),
        other => panic!("expected try, got {other:?}"),
    }
}

#[test]
fn test_labeled_continue() {
    let program = parse_ok("outer: for (;;) { for (;;) { continue outer } }");
    assert!(matches!(program.body[0].kind, StmtKind::Labeled { ref label, .. } if label == "outer"));
}

#[test]
fn test_do_while_without_semicolon() {
    let program = parse_ok("let i = 0\ndo i++\nwhile (i < 3) i");
    assert_eq!(program.body.len(), 3);
    assert!(matches!(program.body[1].kind, StmtKind::DoWhile { .. }));
}

#[test]
fn test_asi_by_line_break() {
    let program = parse_ok("let a = 1\nlet b = a\n++b");
    assert_eq!(program.body.len(), 3);
}

#[test]
fn test_return_restricted_production() {
    let program = parse_ok("function f() {\n  return\n  1\n}");
    match &function_def(&program.body[0]).body {
        FunctionBody::Block(stmts) => {
            assert_eq!(stmts.len(), 2);
            assert!(matches!(stmts[0].kind, StmtKind::Return(None)));
        }
        other => panic!("expected block body, got {other:?}"),
    }
}

#[test]
fn test_missing_semicolon_on_same_line() {
    assert_eq!(first_error_code("let a = 1 let b = 2"), ErrorCode::UNEXPECTED_TOKEN);
}

// ─────────────────────────────────────────────────────────────────────
// Errors & recovery
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_unterminated_parameter_list() {
    let result = parse("export function broken(");
    assert!(result.program.is_none());
    assert!(result.errors.has_errors());
    assert!(!result.errors.errors[0].message.is_empty());
}

#[test]
fn test_error_display_has_position() {
    let result = parse("const a = ;");
    let first = result.errors.first().expect("error");
    assert_eq!(first.to_string(), "1:11: Expression expected, got ';'");
}

#[test]
fn test_context_errors() {
    assert_eq!(first_error_code("return 1"), ErrorCode::ILLEGAL_STATEMENT);
    assert_eq!(first_error_code("break;"), ErrorCode::ILLEGAL_STATEMENT);
    assert_eq!(
        first_error_code("for (;;) { function f() { continue } }"),
        ErrorCode::ILLEGAL_STATEMENT
    );
    assert_eq!(
        first_error_code("const f = (x) => await x;"),
        ErrorCode::ILLEGAL_STATEMENT
    );
    assert_eq!(first_error_code("const c;"), ErrorCode::MISSING_INITIALIZER);
}

#[test]
fn test_unsupported_syntax() {
    assert_eq!(first_error_code("import { x } from './x';"), ErrorCode::MODULE_SYNTAX);
    assert_eq!(first_error_code("export * from './x';"), ErrorCode::MODULE_SYNTAX);
    assert_eq!(first_error_code("export { a } from './x';"), ErrorCode::MODULE_SYNTAX);
    assert_eq!(first_error_code("function* gen() {}"), ErrorCode::UNSUPPORTED_SYNTAX);
    assert_eq!(first_error_code("class A { #secret = 1 }"), ErrorCode::UNSUPPORTED_SYNTAX);
    assert_eq!(first_error_code("const t = tag`x`;"), ErrorCode::UNSUPPORTED_SYNTAX);
}

#[test]
fn test_lexer_errors_come_first() {
    let result = parse("const s = 'open\nconst = 1;");
    assert!(result.program.is_none());
    assert_eq!(result.errors.errors[0].code, ErrorCode::UNTERMINATED_STRING);
    assert!(result.errors.total_errors >= 2);
}

#[test]
fn test_recovery_reports_several_errors() {
    let result = parse("const a = ;\nconst b = 2;\nlet = 3;\nconst c = 4;");
    assert_eq!(result.errors.total_errors, 2);
    assert_eq!(result.errors.errors[1].span.start_line, 3);
}

#[test]
fn test_stray_closing_brace() {
    let result = parse("const a = 1;\n}\nconst b = 2;");
    assert_eq!(result.errors.total_errors, 1);
    assert_eq!(result.errors.errors[0].code, ErrorCode::UNEXPECTED_TOKEN);
}

#[test]
fn test_nesting_limit() {
    // Deep recursion needs more than the default test-thread stack.
    let handle = std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(|| {
            let depth = 500;
            let source = format!("const x = {}1{};", "(".repeat(depth), ")".repeat(depth));
            // `ParseResult` holds `Rc` AST nodes and is not `Send`, so the
            // checks run on the parser thread.
            let result = parse(&source);
            assert!(result.program.is_none());
            assert!(result
                .errors
                .errors
                .iter()
                .any(|e| e.code == ErrorCode::NESTING_TOO_DEEP));
        })
        .expect("spawn");
    handle.join().expect("parser thread panicked");
}

#[test]
fn test_parsing_is_deterministic() {
    let source = r#"export class Stack<T> {
  private items: T[] = [];
  push(item: T): void { this.items.push(item) }
  pop(): T | undefined { return this.items.pop() }
}
export const solve = async ({ a, b }: Input) => (await compute(a, b)) ?? 0;"#;
    let first = parse_ok(source);
    for _ in 0..20 {
        assert_eq!(parse_ok(source), first);
    }
}
