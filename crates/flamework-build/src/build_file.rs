//! The persisted build file

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const BUILD_FILE_VERSION: u32 = 1;

/// Cross-session reflection index.
///
/// Maps are ordered so that saving an unchanged index reproduces the same
/// document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildFile {
    #[serde(default)]
    pub behaviours: BTreeMap<String, Behaviour>,
    /// Base id -> ids of every class deriving from it
    #[serde(default)]
    pub extends: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub flamework: FlameworkSection,
}

/// One reflective class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Behaviour {
    pub component: bool,
    pub file_path: String,
    /// Ancestor ids, nearest first
    #[serde(default)]
    pub extends: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlameworkSection {
    pub version: u32,
    /// Internal id -> generated short id
    #[serde(default)]
    pub identifiers: BTreeMap<String, String>,
}

impl Default for FlameworkSection {
    fn default() -> Self {
        Self {
            version: BUILD_FILE_VERSION,
            identifiers: BTreeMap::new(),
        }
    }
}

impl Default for BuildFile {
    fn default() -> Self {
        Self {
            behaviours: BTreeMap::new(),
            extends: BTreeMap::new(),
            flamework: FlameworkSection::default(),
        }
    }
}

impl BuildFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reflective class and its ancestry.
    ///
    /// Re-registering an id replaces its behaviour; `extends` lists never
    /// gain duplicates.
    pub fn register_behaviour(&mut self, id: &str, file_path: &str, component: bool, ancestors: &[String]) {
        let mut deduped: Vec<String> = Vec::with_capacity(ancestors.len());
        for ancestor in ancestors {
            if ancestor != id && !deduped.contains(ancestor) {
                deduped.push(ancestor.clone());
            }
        }

        // Drop edges from bases this id no longer derives from
        for (base, derived) in self.extends.iter_mut() {
            if !deduped.contains(base) {
                derived.retain(|d| d != id);
            }
        }
        self.extends.retain(|_, derived| !derived.is_empty());

        for ancestor in &deduped {
            let derived = self.extends.entry(ancestor.clone()).or_default();
            if !derived.iter().any(|d| d == id) {
                derived.push(id.to_string());
            }
        }

        self.behaviours.insert(
            id.to_string(),
            Behaviour {
                component,
                file_path: file_path.to_string(),
                extends: deduped,
            },
        );
    }

    /// Remove `id` everywhere: its behaviour, its own `extends` entry, and
    /// every reference to it in other entries
    pub fn remove_id(&mut self, id: &str) {
        self.behaviours.remove(id);
        self.extends.remove(id);
        for derived in self.extends.values_mut() {
            derived.retain(|d| d != id);
        }
        self.extends.retain(|_, derived| !derived.is_empty());
        for behaviour in self.behaviours.values_mut() {
            behaviour.extends.retain(|a| a != id);
        }
    }

    /// Whether `id` appears anywhere in the index
    pub fn references(&self, id: &str) -> bool {
        self.behaviours.contains_key(id)
            || self.extends.contains_key(id)
            || self.extends.values().any(|d| d.iter().any(|x| x == id))
            || self.behaviours.values().any(|b| b.extends.iter().any(|x| x == id))
    }
}
