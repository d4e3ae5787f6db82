//! Resolved types attached to declarations and generic arguments

use serde::{Deserialize, Serialize};
use crate::{Literal, SymbolId};

/// A type as resolved by the frontend's checker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeRef {
    Number,
    String,
    Boolean,
    /// `undefined` / `void`
    Nil,
    Unknown,

    /// A single literal type: `"red"`, `3`, `true`
    Literal(Literal),

    /// `T[]`
    Array(Box<TypeRef>),

    /// `T | undefined` or an optional member
    Optional(Box<TypeRef>),

    /// A union of several types
    Union(Vec<TypeRef>),

    /// A class declared in the program
    Class { symbol: SymbolId, name: String },

    /// An interface declared in the program
    Interface { symbol: SymbolId, name: String },

    /// An enum declared in the program
    Enum { symbol: SymbolId, name: String },

    /// A named type alias: `type Color = "red" | "blue"`
    Alias {
        symbol: SymbolId,
        name: String,
        target: Box<TypeRef>,
    },

    /// An engine object reference such as `Part` or `Model`
    Instance(String),

    /// An unresolved generic parameter
    TypeParameter(String),
}

impl TypeRef {
    pub fn array(inner: TypeRef) -> Self {
        TypeRef::Array(Box::new(inner))
    }

    pub fn optional(inner: TypeRef) -> Self {
        TypeRef::Optional(Box::new(inner))
    }

    /// Whether `undefined` is assignable to this type
    pub fn is_nullable(&self) -> bool {
        match self {
            TypeRef::Nil | TypeRef::Optional(_) => true,
            TypeRef::Union(members) => members.iter().any(|m| matches!(m, TypeRef::Nil)),
            _ => false,
        }
    }

    /// Strip `undefined` from the type
    pub fn non_nullable(&self) -> TypeRef {
        match self {
            TypeRef::Optional(inner) => inner.non_nullable(),
            TypeRef::Union(members) => {
                let rest: Vec<TypeRef> = members
                    .iter()
                    .filter(|m| !matches!(m, TypeRef::Nil))
                    .cloned()
                    .collect();
                if rest.len() == 1 {
                    rest.into_iter().next().unwrap_or(TypeRef::Unknown)
                } else {
                    TypeRef::Union(rest)
                }
            }
            other => other.clone(),
        }
    }

    /// Literal members when this type is a union made only of literals
    pub fn literal_union(&self) -> Option<Vec<&Literal>> {
        match self {
            TypeRef::Alias { target, .. } => target.literal_union(),
            TypeRef::Union(members) => {
                let mut literals = Vec::with_capacity(members.len());
                for member in members {
                    match member {
                        TypeRef::Literal(lit) => literals.push(lit),
                        _ => return None,
                    }
                }
                Some(literals)
            }
            _ => None,
        }
    }

    /// The declaration backing this type, when it has one
    pub fn symbol(&self) -> Option<SymbolId> {
        match self {
            TypeRef::Class { symbol, .. }
            | TypeRef::Interface { symbol, .. }
            | TypeRef::Enum { symbol, .. }
            | TypeRef::Alias { symbol, .. } => Some(*symbol),
            _ => None,
        }
    }

    /// Human readable name, used in diagnostics and descriptors
    pub fn display(&self) -> String {
        match self {
            TypeRef::Number => "number".into(),
            TypeRef::String => "string".into(),
            TypeRef::Boolean => "boolean".into(),
            TypeRef::Nil => "undefined".into(),
            TypeRef::Unknown => "unknown".into(),
            TypeRef::Literal(lit) => lit.display(),
            TypeRef::Array(inner) => format!("{}[]", inner.display()),
            TypeRef::Optional(inner) => format!("{} | undefined", inner.display()),
            TypeRef::Union(members) => members
                .iter()
                .map(TypeRef::display)
                .collect::<Vec<_>>()
                .join(" | "),
            TypeRef::Class { name, .. }
            | TypeRef::Interface { name, .. }
            | TypeRef::Enum { name, .. }
            | TypeRef::Alias { name, .. } => name.clone(),
            TypeRef::Instance(name) | TypeRef::TypeParameter(name) => name.clone(),
        }
    }
}
