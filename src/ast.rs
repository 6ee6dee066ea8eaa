//! Abstract Syntax Tree definitions for Cinder
//!
//! Built once by the parser and only read afterwards.

use crate::token::Span;

/// Literal values carried by `Expr::Literal`
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
}

/// Expression nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Number, string or boolean literal
    Literal { value: Literal, span: Span },

    /// `Nothing`
    Nothing { span: Span },

    /// Variable reference: foo
    Variable { name: String, span: Span },

    /// Binary operation, including `and` / `or`
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
        span: Span,
    },

    /// Prefix `+x` / `-x`
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },

    /// `i++` / `i--`; yields the value before the update
    Postfix {
        name: String,
        op: PostfixOp,
        span: Span,
    },

    /// Call of a named function: foo(a, b)
    Call {
        name: String,
        args: Vec<Expr>,
        span: Span,
    },

    /// Array literal: [a, b, c]
    Array { elements: Vec<Expr>, span: Span },

    /// Indexing: xs[i]
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal { span, .. } => *span,
            Expr::Nothing { span } => *span,
            Expr::Variable { span, .. } => *span,
            Expr::Binary { span, .. } => *span,
            Expr::Unary { span, .. } => *span,
            Expr::Postfix { span, .. } => *span,
            Expr::Call { span, .. } => *span,
            Expr::Array { span, .. } => *span,
            Expr::Index { span, .. } => *span,
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
    Eq,  // ==
    Ne,  // !=
    Lt,  // <
    Le,  // <=
    Gt,  // >
    Ge,  // >=
    And, // and
    Or,  // or
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        };
        write!(f, "{}", s)
    }
}

/// Prefix operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus, // +
    Neg,  // -
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Plus => write!(f, "+"),
            UnaryOp::Neg => write!(f, "-"),
        }
    }
}

/// Postfix update operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Increment, // ++
    Decrement, // --
}

impl std::fmt::Display for PostfixOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PostfixOp::Increment => write!(f, "++"),
            PostfixOp::Decrement => write!(f, "--"),
        }
    }
}

/// Statement nodes
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// var x = expr
    VarDecl {
        name: String,
        initializer: Expr,
        span: Span,
    },

    /// x = expr
    Assign {
        name: String,
        value: Expr,
        span: Span,
    },

    /// xs[i] = expr
    IndexAssign {
        array: Expr,
        index: Expr,
        value: Expr,
        span: Span,
    },

    /// if (cond) : ... else ... end
    ///
    /// An `else if` chain is an else-branch holding a single nested `If`.
    If {
        condition: Expr,
        body: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
        span: Span,
    },

    /// while (cond) : ... end
    While {
        condition: Expr,
        body: Vec<Stmt>,
        span: Span,
    },

    /// for (init; cond; increment) : ... end
    For {
        init: Box<Stmt>,
        condition: Expr,
        increment: Box<Stmt>,
        body: Vec<Stmt>,
        span: Span,
    },

    /// func name(params) : ... end
    Function {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
        span: Span,
    },

    /// return expr
    Return { value: Expr, span: Span },

    /// Expression evaluated for its effect: calls and for-loop increments
    Expr { expr: Expr },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::VarDecl { span, .. } => *span,
            Stmt::Assign { span, .. } => *span,
            Stmt::IndexAssign { span, .. } => *span,
            Stmt::If { span, .. } => *span,
            Stmt::While { span, .. } => *span,
            Stmt::For { span, .. } => *span,
            Stmt::Function { span, .. } => *span,
            Stmt::Return { span, .. } => *span,
            Stmt::Expr { expr } => expr.span(),
        }
    }
}

/// A complete program
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }
}
