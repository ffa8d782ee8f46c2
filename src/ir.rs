//! Owned intermediate representation of a transpiled view program.
//!
//! The IR is independent of any parser: the built-in transpiler lowers an
//! oxc AST into it, and injected transpilers may build it directly. JSX is
//! already gone at this level; elements are plain calls to the pragma.

use std::rc::Rc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Decl {
        kind: DeclKind,
        declarations: Vec<(Pattern, Option<Expr>)>,
    },
    /// Named function declaration; hoisted to the top of its block.
    Function(Rc<FunctionDef>),
    Return(Option<Expr>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    Block(Vec<Stmt>),
    With {
        object: Expr,
        body: Box<Stmt>,
    },
    ForOf {
        kind: Option<DeclKind>,
        target: Pattern,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Try {
        block: Vec<Stmt>,
        param: Option<Pattern>,
        handler: Option<Vec<Stmt>>,
        finalizer: Option<Vec<Stmt>>,
    },
    Throw(Expr),
    Break,
    Continue,
    Empty,
    /// Syntax outside the view language; throws a `SyntaxError` when reached.
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Template {
        quasis: Vec<String>,
        expressions: Vec<Expr>,
    },
    Ident(String),
    This,
    Array(Vec<ArrayItem>),
    Object(Vec<PropItem>),
    Function(Rc<FunctionDef>),
    Call {
        callee: Box<Expr>,
        arguments: Vec<ArrayItem>,
        optional: bool,
    },
    New {
        callee: Box<Expr>,
        arguments: Vec<ArrayItem>,
    },
    Member {
        object: Box<Expr>,
        property: MemberKey,
        optional: bool,
    },
    /// Boundary of an optional chain (`a?.b.c`); short-circuits to `undefined`.
    Chain(Box<Expr>),
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        argument: Box<Expr>,
    },
    Update {
        increment: bool,
        prefix: bool,
        target: Box<AssignTarget>,
    },
    Assign {
        op: Option<BinaryOp>,
        target: Box<AssignTarget>,
        value: Box<Expr>,
    },
    Sequence(Vec<Expr>),
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssignTarget {
    Ident(String),
    Member { object: Expr, property: MemberKey },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberKey {
    Static(String),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrayItem {
    Expr(Expr),
    Spread(Expr),
    Hole,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    Static(String),
    Computed(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropItem {
    Property { key: PropKey, value: Expr },
    Spread(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Ident(String),
    Object {
        properties: Vec<(PropKey, Pattern)>,
        rest: Option<Box<Pattern>>,
    },
    Array {
        elements: Vec<Option<Pattern>>,
        rest: Option<Box<Pattern>>,
    },
    Default {
        target: Box<Pattern>,
        default: Expr,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FunctionBody {
    Expr(Expr),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: Option<String>,
    pub params: Vec<Pattern>,
    pub rest: Option<Pattern>,
    pub body: FunctionBody,
    /// Arrow functions do not bind `this`.
    pub arrow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    Shl,
    Shr,
    UShr,
    BitOr,
    BitXor,
    BitAnd,
    In,
    InstanceOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    BitNot,
    TypeOf,
    Void,
    Delete,
}

// ═══════════════════════════════════════════════════════════════════════════════
// BUILDERS
// ═══════════════════════════════════════════════════════════════════════════════

impl Expr {
    pub fn ident(name: &str) -> Self {
        Expr::Ident(name.to_string())
    }

    pub fn string(value: &str) -> Self {
        Expr::Literal(Literal::String(value.to_string()))
    }

    pub fn null() -> Self {
        Expr::Literal(Literal::Null)
    }

    pub fn call(callee: Expr, arguments: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            arguments: arguments.into_iter().map(ArrayItem::Expr).collect(),
            optional: false,
        }
    }

    pub fn member(object: Expr, property: &str) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: MemberKey::Static(property.to_string()),
            optional: false,
        }
    }

    pub fn arrow(params: Vec<Pattern>, body: FunctionBody) -> Self {
        Expr::Function(Rc::new(FunctionDef {
            name: None,
            params,
            rest: None,
            body,
            arrow: true,
        }))
    }
}
