//! Declaration AST nodes (classes, functions, enums, imports)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::{Block, Expr, Ident, Span, SymbolId, TypeRef};

/// A class declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDecl {
    /// `None` for anonymous class expressions
    pub name: Option<Ident>,
    pub symbol: Option<SymbolId>,
    /// Heritage clause: `extends Base`
    pub extends: Option<Expr>,
    pub decorators: Vec<Decorator>,
    pub members: Vec<ClassMember>,
    pub is_abstract: bool,
    pub exported: bool,
    /// Identifier supplied from outside the source (e.g. a pinned id)
    pub id_override: Option<String>,
    pub span: Span,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>, symbol: SymbolId) -> Self {
        let name = name.into();
        Self {
            name: Some(Ident::resolved(name, symbol)),
            symbol: Some(symbol),
            extends: None,
            decorators: Vec::new(),
            members: Vec::new(),
            is_abstract: false,
            exported: true,
            id_override: None,
            span: Span::dummy(),
        }
    }

    pub fn name_str(&self) -> Option<&str> {
        self.name.as_ref().map(|n| n.name.as_str())
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyDecl> {
        self.members.iter().filter_map(|m| match m {
            ClassMember::Property(p) => Some(p),
            _ => None,
        })
    }
}

/// Member of a class body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClassMember {
    Property(PropertyDecl),
    Method(MethodDecl),
    Constructor(ConstructorDecl),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

/// Property declaration: `speed: number = 5`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDecl {
    pub name: String,
    /// Declared or inferred type
    pub ty: Option<TypeRef>,
    pub initializer: Option<Expr>,
    pub is_static: bool,
    pub optional: bool,
    pub visibility: Visibility,
    pub decorators: Vec<Decorator>,
    pub span: Span,
}

impl PropertyDecl {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
            initializer: None,
            is_static: false,
            optional: false,
            visibility: Visibility::Public,
            decorators: Vec::new(),
            span: Span::dummy(),
        }
    }
}

/// Method declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
    pub is_static: bool,
    pub decorators: Vec<Decorator>,
    pub span: Span,
}

/// Constructor declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorDecl {
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

/// Function or method parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Ident,
    pub default: Option<Expr>,
}

/// Decorator: `@Component({ tag: "x" })` or `@Service`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decorator {
    pub expr: Expr,
    pub span: Span,
}

impl Decorator {
    /// The decorator's callee: the call target for `@X()` and the
    /// expression itself for `@X`
    pub fn callee(&self) -> &Expr {
        match &self.expr.kind {
            crate::ExprKind::Call(call) => &call.callee,
            _ => &self.expr,
        }
    }

    pub fn args(&self) -> &[Expr] {
        match &self.expr.kind {
            crate::ExprKind::Call(call) => &call.args,
            _ => &[],
        }
    }
}

/// Top-level function declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: Ident,
    pub params: Vec<Param>,
    pub body: Block,
    pub exported: bool,
    pub span: Span,
}

/// Enum declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: Ident,
    pub members: Vec<EnumMember>,
    pub exported: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: String,
    pub value: EnumValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EnumValue {
    Number(f64),
    String(String),
}

/// Import declaration: `import { a, b as c } from "./mod"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    /// Module specifier as written
    pub module: String,
    /// Source file the specifier resolved to, if it is part of the program
    pub resolved_path: Option<PathBuf>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSpecifier {
    /// Exported name in the target module
    pub imported: String,
    /// Local binding, resolved to the imported declaration
    pub local: Ident,
}
