//! AST node types for the executed TypeScript subset.
//!
//! Every statement and expression carries a [`Span`]. Type annotations never
//! reach the tree: the parser consumes and drops them. Function and class
//! bodies sit behind [`Rc`] so runtime closures can share them cheaply.

use crate::Span;
use std::rc::Rc;

// ══════════════════════════════════════════════════════════════════════════════
// Top Level
// ══════════════════════════════════════════════════════════════════════════════

/// A parsed submission: top-level statements plus its export table.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub exports: Vec<ExportEntry>,
    pub span: Span,
}

impl Program {
    /// The local binding behind an exported name, following `export { a as b }`.
    pub fn local_for_export(&self, exported: &str) -> Option<&str> {
        self.exports
            .iter()
            .find(|e| e.exported == exported)
            .map(|e| e.local.as_str())
    }
}

/// One row of the export table: `export const x` gives `x -> x`,
/// `export { a as b }` gives `b -> a`.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportEntry {
    pub exported: String,
    pub local: String,
    pub span: Span,
}

/// A spanned identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Statements
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `let a = 1, b;`
    Var(VarDecl),
    /// `function name(params) { ... }` (hoisted)
    Function(Rc<FunctionDef>),
    /// `class Name extends Base { ... }`
    Class(Rc<ClassDef>),
    /// `enum Color { Red, Green = 4 }`
    Enum(EnumDecl),
    Expr(Expr),
    Block(Vec<Stmt>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    /// `for (init; test; update) body`
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    /// `for (const x of xs) body`
    ForOf {
        binding: ForBinding,
        iterable: Expr,
        body: Box<Stmt>,
    },
    /// `for (const k in obj) body`
    ForIn {
        binding: ForBinding,
        object: Expr,
        body: Box<Stmt>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        condition: Expr,
    },
    Return(Option<Expr>),
    Break(Option<String>),
    Continue(Option<String>),
    Throw(Expr),
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    Labeled {
        label: String,
        body: Box<Stmt>,
    },
    /// `;`, and every type-only declaration (`type`, `interface`, `declare`).
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

impl VarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VarKind::Var => "var",
            VarKind::Let => "let",
            VarKind::Const => "const",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarators: Vec<VarDeclarator>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDeclarator {
    pub target: Pattern,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForInit {
    Var(VarDecl),
    Expr(Expr),
}

/// The left-hand side of `for…of` / `for…in`.
#[derive(Debug, Clone, PartialEq)]
pub enum ForBinding {
    /// `for (const [k, v] of ...)`
    Decl(VarKind, Pattern),
    /// `for (x of ...)` assigning an existing target.
    Target(Pattern),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    /// `None` for `catch { ... }`.
    pub param: Option<Pattern>,
    pub body: Vec<Stmt>,
}

/// One `case test:` (or `default:` when `test` is `None`) with its statements.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: Ident,
    pub members: Vec<EnumMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember {
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

// ══════════════════════════════════════════════════════════════════════════════
// Functions & Classes
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Option<Ident>,
    pub params: Vec<Param>,
    pub body: FunctionBody,
    pub is_arrow: bool,
    pub is_async: bool,
    pub span: Span,
}

impl FunctionDef {
    pub fn name_str(&self) -> &str {
        self.name.as_ref().map(|n| n.name.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Block(Vec<Stmt>),
    /// Concise arrow body: `x => x + 1`.
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Defaults are expressed as [`Pattern::Assign`].
    pub pattern: Pattern,
    pub rest: bool,
    /// Constructor parameter property (`constructor(private x: number)`).
    pub property: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDef {
    pub name: Option<Ident>,
    pub super_class: Option<Expr>,
    pub constructor: Option<Rc<FunctionDef>>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMember {
    pub key: PropKey,
    pub is_static: bool,
    pub kind: ClassMemberKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClassMemberKind {
    Method(Rc<FunctionDef>),
    Getter(Rc<FunctionDef>),
    Setter(Rc<FunctionDef>),
    /// `count = 0;` or a bare declaration `name: string;`
    Field(Option<Expr>),
}

// ══════════════════════════════════════════════════════════════════════════════
// Patterns
// ══════════════════════════════════════════════════════════════════════════════

/// A binding or assignment target.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(Ident),
    /// `{ a, b: c = 1, ...rest }`
    Object {
        props: Vec<ObjectPatternProp>,
        rest: Option<Box<Pattern>>,
        span: Span,
    },
    /// `[a, , b = 2, ...rest]`
    Array {
        elements: Vec<Option<Pattern>>,
        rest: Option<Box<Pattern>>,
        span: Span,
    },
    /// `target = default`
    Assign {
        target: Box<Pattern>,
        default: Box<Expr>,
    },
    /// A member expression target, only valid in assignments.
    Expr(Box<Expr>),
}

impl Pattern {
    pub fn span(&self) -> Span {
        match self {
            Pattern::Ident(id) => id.span,
            Pattern::Object { span, .. } | Pattern::Array { span, .. } => *span,
            Pattern::Assign { target, default } => target.span().merge(default.span),
            Pattern::Expr(expr) => expr.span,
        }
    }

    /// Every identifier this pattern binds, in source order.
    pub fn bound_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Pattern::Ident(id) => out.push(&id.name),
            Pattern::Object { props, rest, .. } => {
                for prop in props {
                    prop.value.collect_names(out);
                }
                if let Some(rest) = rest {
                    rest.collect_names(out);
                }
            }
            Pattern::Array { elements, rest, .. } => {
                for element in elements.iter().flatten() {
                    element.collect_names(out);
                }
                if let Some(rest) = rest {
                    rest.collect_names(out);
                }
            }
            Pattern::Assign { target, .. } => target.collect_names(out),
            Pattern::Expr(_) => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectPatternProp {
    pub key: PropKey,
    pub value: Pattern,
}

/// A property name in literals, patterns and class bodies.
#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    /// Identifier, string or numeric key, already in canonical string form.
    Static(String),
    /// `[expr]`
    Computed(Box<Expr>),
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    // ── Literals ──
    Number(f64),
    String(String),
    /// `` `a${x}b` `` has quasis `["a", "b"]` and one expression.
    Template {
        quasis: Vec<String>,
        exprs: Vec<Expr>,
    },
    Bool(bool),
    Null,
    /// `/pattern/flags`; compiled when evaluated.
    Regex {
        pattern: String,
        flags: String,
    },
    Array(Vec<ArrayElement>),
    Object(Vec<ObjectProp>),
    Function(Rc<FunctionDef>),
    Class(Rc<ClassDef>),

    // ── Names ──
    Identifier(String),
    This,

    // ── Operators ──
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Pattern>,
        value: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Sequence(Vec<Expr>),
    Await(Box<Expr>),

    // ── Access & Calls ──
    Member {
        object: Box<Expr>,
        property: MemberProp,
        /// `a?.b`
        optional: bool,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Argument>,
        /// `f?.()`
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Argument>,
    },
    /// Boundary of an optional chain: a short-circuit anywhere inside
    /// yields `undefined` for the whole chain.
    OptionalChain(Box<Expr>),
    SuperCall(Vec<Argument>),
    SuperMember(MemberProp),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProp {
    /// `obj.name`
    Static(String),
    /// `obj[expr]`
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayElement {
    Expr(Expr),
    Spread(Expr),
    /// `[1, , 3]`
    Hole,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub expr: Expr,
    pub spread: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectProp {
    KeyValue(PropKey, Expr),
    /// `{ name }`
    Shorthand(Ident),
    Spread(Expr),
    Method(PropKey, Rc<FunctionDef>),
    Getter(PropKey, Rc<FunctionDef>),
    Setter(PropKey, Rc<FunctionDef>),
}

// ── Operators ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
    BitNot,
    TypeOf,
    Void,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    Shl,
    Shr,
    UShr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    In,
    InstanceOf,
}

impl BinOp {
    /// Returns the operator symbol for error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Exp => "**",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::UShr => ">>>",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::StrictEq => "===",
            BinOp::StrictNotEq => "!==",
            BinOp::Less => "<",
            BinOp::Greater => ">",
            BinOp::LessEq => "<=",
            BinOp::GreaterEq => ">=",
            BinOp::In => "in",
            BinOp::InstanceOf => "instanceof",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    /// `??`
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Assign,
    /// `+=`, `**=`, `>>>=`, ...
    Compound(BinOp),
    /// `&&=`, `||=`, `??=`
    Logical(LogicalOp),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Pattern {
        Pattern::Ident(Ident::new(name, Span::default()))
    }

    #[test]
    fn bound_names_walk_nested_patterns() {
        let pattern = Pattern::Object {
            props: vec![
                ObjectPatternProp {
                    key: PropKey::Static("a".into()),
                    value: ident("a"),
                },
                ObjectPatternProp {
                    key: PropKey::Static("b".into()),
                    value: Pattern::Array {
                        elements: vec![Some(ident("x")), None, Some(ident("y"))],
                        rest: None,
                        span: Span::default(),
                    },
                },
            ],
            rest: Some(Box::new(ident("others"))),
            span: Span::default(),
        };
        assert_eq!(pattern.bound_names(), vec!["a", "x", "y", "others"]);
    }

    #[test]
    fn export_aliases_resolve_to_locals() {
        let program = Program {
            body: vec![],
            exports: vec![ExportEntry {
                exported: "plusOne".into(),
                local: "inc".into(),
                span: Span::default(),
            }],
            span: Span::default(),
        };
        assert_eq!(program.local_for_export("plusOne"), Some("inc"));
        assert_eq!(program.local_for_export("inc"), None);
    }
}
