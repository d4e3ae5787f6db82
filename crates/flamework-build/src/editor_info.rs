//! Inspector metadata consumed by the editor

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::LiteralValue;

/// Enum or literal-union value table: member name -> value
pub type EnumTable = BTreeMap<String, LiteralValue>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorInfo {
    /// Project identifier
    #[serde(default)]
    pub id: String,
    #[serde(default, rename = "enum")]
    pub enums: BTreeMap<String, EnumTable>,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentEntry {
    pub asset_path: String,
    pub name: String,
}

impl EditorInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Register an enum table; the first registration of an id wins.
    ///
    /// Returns whether the table was inserted.
    pub fn register_enum(&mut self, id: &str, table: EnumTable) -> bool {
        if self.enums.contains_key(id) {
            return false;
        }
        self.enums.insert(id.to_string(), table);
        true
    }
}
