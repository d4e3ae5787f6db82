//! Statement AST nodes

use serde::{Deserialize, Serialize};
use crate::{ClassDecl, EnumDecl, Expr, FunctionDecl, Ident, ImportDecl, Span};

/// A block of statements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

impl Block {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self {
            statements,
            span: Span::dummy(),
        }
    }
}

/// A statement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    /// Expression statement: `foo()`
    Expr(Expr),

    /// Variable declaration: `const x = 5`, `let { a, b } = obj`
    Variable(VariableDecl),

    /// Return statement: `return x`
    Return(Option<Expr>),

    /// Throw statement: `throw "boom"`
    Throw(Expr),

    /// If statement; `else if` chains nest through `else_branch`
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },

    /// Nested block: `{ ... }`
    Block(Block),

    /// While loop: `while (cond) { ... }`
    While { condition: Expr, body: Box<Stmt> },

    Break,
    Continue,

    Function(FunctionDecl),
    Class(ClassDecl),
    Enum(EnumDecl),
    Import(ImportDecl),
}

/// `const` / `let` declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDecl {
    pub binding: BindingPattern,
    pub init: Option<Expr>,
    pub exported: bool,
}

/// Left-hand side of a variable declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BindingPattern {
    /// `x`
    Ident(Ident),
    /// `{ a, b: renamed = 1 }`
    Object(Vec<ObjectBinding>),
    /// `[first, , third]`
    Array(Vec<Option<Ident>>),
}

/// One element of an object destructuring pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectBinding {
    pub property: String,
    pub local: Ident,
    pub default: Option<Expr>,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn synthetic(kind: StmtKind) -> Self {
        Self {
            kind,
            span: Span::dummy(),
        }
    }

    /// Whether control never continues past this statement
    pub fn always_exits(&self) -> bool {
        match &self.kind {
            StmtKind::Return(_) | StmtKind::Throw(_) => true,
            StmtKind::Block(block) => block.statements.last().is_some_and(Stmt::always_exits),
            StmtKind::If {
                then_branch,
                else_branch: Some(else_branch),
                ..
            } => then_branch.always_exits() && else_branch.always_exits(),
            _ => false,
        }
    }
}
