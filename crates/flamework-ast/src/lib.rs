//! Flamework AST - Core types shared by every compiler stage
//!
//! This crate defines the typed source AST handed over by the semantic
//! frontend, the Lua target AST produced by the transformer, the canonical
//! Lua printer, and the diagnostics collected during a compile cycle.

mod span;
mod symbol;
mod types;
mod expr;
mod stmt;
mod decl;
mod diagnostic;
pub mod lua;
pub mod printer;

pub use span::*;
pub use symbol::*;
pub use types::*;
pub use expr::*;
pub use stmt::*;
pub use decl::*;
pub use diagnostic::*;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A typed source file as produced by the semantic frontend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// Absolute or project-relative path of the source file
    pub path: PathBuf,
    pub statements: Vec<Stmt>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, statements: Vec<Stmt>) -> Self {
        Self {
            path: path.into(),
            statements,
        }
    }

    /// Iterate over every class declared at the top level of the file
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.statements.iter().filter_map(|stmt| match &stmt.kind {
            StmtKind::Class(class) => Some(class),
            _ => None,
        })
    }
}
