//! Opaque declaration handles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable handle to a declaration, issued by the semantic frontend.
///
/// The frontend guarantees a declaration keeps the same id for the whole of
/// one compile cycle. Ids may be reassigned between cycles; anything persisted
/// across cycles is keyed by stable identifiers instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An identifier reference together with the declaration it resolves to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    /// `None` when the frontend could not resolve the name
    pub symbol: Option<SymbolId>,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: None,
        }
    }

    pub fn resolved(name: impl Into<String>, symbol: SymbolId) -> Self {
        Self {
            name: name.into(),
            symbol: Some(symbol),
        }
    }
}
