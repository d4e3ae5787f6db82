//! Flamework Symbols - the compiler's view of the semantic frontend
//!
//! Parsing and type checking live outside the compiler. This crate defines
//! what the compiler consumes from them:
//! - [`SemanticFrontend`]: typed files, symbol lookups, class ancestry,
//!   dependents and change tracking
//! - [`PathTranslator`]: deterministic source/output/import path mapping
//!
//! It also ships [`StaticFrontend`], an in-memory implementation backed by
//! a symbol table, and [`ProjectPaths`], the standard `rootDir`/`outDir`
//! translator.

mod error;
mod frontend;
mod paths;
mod table;

pub use error::{FrontendError, Result};
pub use frontend::{DeclarationInfo, DeclarationKind, SemanticFrontend};
pub use paths::{PathTranslator, ProjectPaths};
pub use table::StaticFrontend;
