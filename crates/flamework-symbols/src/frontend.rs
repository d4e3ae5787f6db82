//! The semantic frontend interface

use flamework_ast::{ClassDecl, EnumMember, SourceFile, SymbolId, TypeRef};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::Result;

/// What kind of entity a symbol declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclarationKind {
    Class,
    Interface,
    Enum,
    TypeAlias,
    Function,
    Variable,
    Namespace,
    /// Method or property of a class, interface or namespace
    Member,
}

/// Facts about a declaration the compiler needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclarationInfo {
    /// Fully qualified name, e.g. `Flamework.id`
    pub name: String,
    pub kind: DeclarationKind,
    /// Declaring source file; `None` for ambient declarations
    pub file: Option<PathBuf>,
    /// Declared defaults of the generic parameters, by position
    #[serde(default)]
    pub type_defaults: Vec<Option<TypeRef>>,
}

/// Typed, navigable program supplied by the parser/type checker.
///
/// Expressions in the returned files already carry their resolved
/// [`SymbolId`]s and generic arguments carry resolved [`TypeRef`]s, so
/// symbol-of-node and type-of-node queries are answered by the tree itself.
///
/// Symbol ids must be stable for the duration of one compile cycle.
pub trait SemanticFrontend {
    /// Rebuild (or incrementally update) the program from its root paths
    fn update_program(&mut self, roots: &[PathBuf]) -> Result<()>;

    /// Every source file currently in the program
    fn source_files(&self) -> Vec<PathBuf>;

    /// Typed AST of one file
    fn source_file(&self, path: &Path) -> Option<&SourceFile>;

    /// Resolve a global, possibly dotted, name (`Flamework.id`)
    fn resolve_global_name(&self, name: &str) -> Option<SymbolId>;

    fn declaration(&self, symbol: SymbolId) -> Option<&DeclarationInfo>;

    /// Class declaration behind a class symbol
    fn class_decl(&self, symbol: SymbolId) -> Option<&ClassDecl>;

    /// Ancestors of a class, nearest first, not including the class itself
    fn ancestors_of_class(&self, symbol: SymbolId) -> Vec<SymbolId>;

    /// Members of an enum declaration
    fn enum_members(&self, symbol: SymbolId) -> Option<&[EnumMember]>;

    /// Whether the type is a container (array, map, set)
    fn is_container_type(&self, ty: &TypeRef) -> bool {
        matches!(ty.non_nullable(), TypeRef::Array(_))
    }

    /// Whether the function symbol is a generator
    fn is_generator(&self, _symbol: SymbolId) -> bool {
        false
    }

    /// Files added, changed or removed since the last completed build
    fn changed_files_since_last_build(&self) -> Vec<PathBuf>;

    /// Files that import any of `paths`, transitively
    fn dependents_of(&self, paths: &[PathBuf]) -> Vec<PathBuf>;

    /// Called after a cycle committed, resetting change tracking
    fn mark_built(&mut self) {}
}
