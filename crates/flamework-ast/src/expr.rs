//! Expression AST nodes

use serde::{Deserialize, Serialize};
use crate::{Block, Ident, Param, Span, SymbolId, TypeRef};

/// An expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    /// Literal value: `42`, `"hello"`, `true`, `undefined`
    Literal(Literal),

    /// Identifier reference: `x`, `$SERVER`
    Ident(Ident),

    /// `this`
    This,

    /// `super`
    Super,

    /// Binary operation: `a + b`, `a === b`
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Short-circuit operation: `a && b`, `a || b`, `a ?? b`
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Unary operation: `!x`, `-y`
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },

    /// Function call: `foo<T>(a, b)`
    Call(CallExpr),

    /// Constructor call: `new Foo(a)`
    New(NewExpr),

    /// Property access: `user.name`, `user?.name`
    Property {
        object: Box<Expr>,
        name: String,
        /// Declaration of the accessed member, if resolved
        symbol: Option<SymbolId>,
        optional: bool,
    },

    /// Element access: `arr[0]`
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },

    /// Assignment: `x = 5`
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },

    /// Array literal: `[1, 2, 3]`
    Array(Vec<Expr>),

    /// Object literal: `{ name: "Alice" }`
    Object(Vec<ObjectProp>),

    /// Conditional: `cond ? a : b`
    Conditional {
        condition: Box<Expr>,
        when_true: Box<Expr>,
        when_false: Box<Expr>,
    },

    /// Arrow or function expression
    Function { params: Vec<Param>, body: Block },
}

/// A call expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    /// Type arguments written in source
    pub type_args: Vec<TypeRef>,
    /// Type arguments the checker inferred when none were written
    pub inferred_type_args: Vec<TypeRef>,
    pub args: Vec<Expr>,
}

/// A `new` expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpr {
    pub class: Box<Expr>,
    pub type_args: Vec<TypeRef>,
    pub args: Vec<Expr>,
}

/// A literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Undefined,
}

impl Literal {
    pub fn display(&self) -> String {
        match self {
            Literal::Number(n) => format_number(*n),
            Literal::String(s) => format!("\"{}\"", s),
            Literal::Bool(b) => b.to_string(),
            Literal::Undefined => "undefined".into(),
        }
    }
}

/// Format a number the way source code would write it (`5`, not `5.0`)
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Short-circuit operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Property in an object literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectProp {
    pub key: String,
    pub value: Expr,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn synthetic(kind: ExprKind) -> Self {
        Self {
            kind,
            span: Span::dummy(),
        }
    }

    /// Symbol the expression refers to: the identifier's declaration or the
    /// accessed member's declaration
    pub fn symbol(&self) -> Option<SymbolId> {
        match &self.kind {
            ExprKind::Ident(ident) => ident.symbol,
            ExprKind::Property { symbol, .. } => *symbol,
            _ => None,
        }
    }

    /// Source-level name of the referenced entity, for diagnostics
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Ident(ident) => Some(&ident.name),
            ExprKind::Property { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal(_))
    }
}
