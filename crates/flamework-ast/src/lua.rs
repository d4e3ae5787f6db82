//! Lua target AST
//!
//! The transformer lowers the typed source AST into these nodes; the
//! printer in [`crate::printer`] turns them into text.

use serde::{Deserialize, Serialize};

/// An expression in the target language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LuaExpr {
    Nil,
    Bool(bool),
    Number(f64),
    String(String),
    Ident(String),
    /// `...`
    Vararg,

    /// `object[key]`
    Index {
        object: Box<LuaExpr>,
        key: Box<LuaExpr>,
    },

    /// `object.name`
    Property { object: Box<LuaExpr>, name: String },

    /// `callee(args)`
    Call {
        callee: Box<LuaExpr>,
        args: Vec<LuaExpr>,
    },

    /// `object:name(args)`
    MethodCall {
        object: Box<LuaExpr>,
        name: String,
        args: Vec<LuaExpr>,
    },

    Binary {
        op: LuaBinaryOp,
        left: Box<LuaExpr>,
        right: Box<LuaExpr>,
    },

    Unary {
        op: LuaUnaryOp,
        operand: Box<LuaExpr>,
    },

    /// Table constructor: `{ 1, 2, key = value }`
    Table(Vec<TableField>),

    /// Anonymous function: `function(a, b) ... end`
    Function {
        params: Vec<String>,
        body: Vec<LuaStmt>,
    },

    /// Explicit parentheses, used to truncate multiple returns
    Paren(Box<LuaExpr>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TableField {
    Positional(LuaExpr),
    Named(String, LuaExpr),
    Keyed(LuaExpr, LuaExpr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LuaBinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LuaUnaryOp {
    Not,
    Neg,
    Len,
}

/// A statement in the target language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LuaStmt {
    /// `local a, b = x, y`
    Local {
        names: Vec<String>,
        values: Vec<LuaExpr>,
    },

    /// `a, b = x, y`
    Assign {
        targets: Vec<LuaExpr>,
        values: Vec<LuaExpr>,
    },

    /// Call used as a statement
    Call(LuaExpr),

    Return(Vec<LuaExpr>),

    If {
        condition: LuaExpr,
        then_body: Vec<LuaStmt>,
        else_body: Option<Vec<LuaStmt>>,
    },

    While {
        condition: LuaExpr,
        body: Vec<LuaStmt>,
    },

    /// `do ... end`
    Do(Vec<LuaStmt>),

    Break,
    Continue,

    /// `local function name(params) ... end`
    LocalFunction {
        name: String,
        params: Vec<String>,
        body: Vec<LuaStmt>,
    },

    /// `function Path.name(params) ... end` / `function Path:name(...)`
    Function {
        path: String,
        params: Vec<String>,
        body: Vec<LuaStmt>,
    },

    Comment(String),
}

impl LuaExpr {
    pub fn ident(name: impl Into<String>) -> Self {
        LuaExpr::Ident(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        LuaExpr::String(value.into())
    }

    pub fn property(object: LuaExpr, name: impl Into<String>) -> Self {
        LuaExpr::Property {
            object: Box::new(object),
            name: name.into(),
        }
    }

    pub fn call(callee: LuaExpr, args: Vec<LuaExpr>) -> Self {
        LuaExpr::Call {
            callee: Box::new(callee),
            args,
        }
    }

    pub fn method_call(object: LuaExpr, name: impl Into<String>, args: Vec<LuaExpr>) -> Self {
        LuaExpr::MethodCall {
            object: Box::new(object),
            name: name.into(),
            args,
        }
    }

    pub fn binary(op: LuaBinaryOp, left: LuaExpr, right: LuaExpr) -> Self {
        LuaExpr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: LuaUnaryOp, operand: LuaExpr) -> Self {
        LuaExpr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Whether evaluating the expression can be repeated or reordered
    /// without observable effects
    pub fn is_simple(&self) -> bool {
        match self {
            LuaExpr::Nil
            | LuaExpr::Bool(_)
            | LuaExpr::Number(_)
            | LuaExpr::String(_)
            | LuaExpr::Vararg => true,
            LuaExpr::Paren(inner) => inner.is_simple(),
            _ => false,
        }
    }

    /// Whether the expression is a temporary or literal, i.e. safe to
    /// duplicate after a prerequisite has been emitted
    pub fn is_simple_or_ident(&self) -> bool {
        self.is_simple() || matches!(self, LuaExpr::Ident(_))
    }

    /// Whether the expression is valid as a standalone statement
    pub fn is_call(&self) -> bool {
        matches!(self, LuaExpr::Call { .. } | LuaExpr::MethodCall { .. })
    }
}

const RESERVED: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// Whether `name` can be written as a bare Lua identifier
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED.contains(&name)
}
