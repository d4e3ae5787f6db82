//! Reflection descriptors produced by the metadata extractor

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Reflection metadata for one class, written to the `.meta` sidecar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDescriptor {
    /// Stable identifier (`specifier@Name` or an override)
    pub id: String,
    pub name: String,
    /// Content hash over everything below
    pub hash: String,
    pub is_component: bool,
    /// Ancestor ids, nearest first
    pub extends: Vec<String>,
    pub properties: Vec<PropertyDescriptor>,
    pub annotations: Vec<Annotation>,
}

impl ComponentDescriptor {
    /// Recompute `hash` from the descriptor content
    pub fn seal(&mut self) {
        self.hash = String::new();
        self.hash = content_hash(self);
    }
}

/// One exported property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyDescriptor {
    pub name: String,
    /// Display name of the declared type (`number`, `Part`, `Color`)
    #[serde(rename = "type")]
    pub type_name: String,
    pub kind: ExportKind,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<Annotation>,
}

/// The closed set of shapes the editor can edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExportKind {
    Primitive,
    Array { element: Box<ExportKind> },
    /// Reference to an engine object
    Object { class_name: String },
    Enum { id: String },
    LiteralUnion { id: String },
    /// Nested reflective class
    Serializable { id: String },
}

/// A literal default value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LiteralValue {
    Bool(bool),
    Number(f64),
    String(String),
}

/// Captured property initializer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DefaultValue {
    Literal(LiteralValue),
    Expression(DefaultExpression),
}

/// Description of a non-literal initializer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DefaultExpression {
    /// `new Vector3(1, 2, 3)`
    Constructor { class: String, args: Vec<DefaultValue> },
    /// `Enum.Material.Plastic`
    StaticMember { object: String, member: String },
    /// `Color3.fromRGB(1, 2, 3)`
    MethodCall {
        object: String,
        method: String,
        args: Vec<DefaultValue>,
    },
    Array { elements: Vec<DefaultValue> },
}

/// A declarative annotation attached to a class or property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    pub parameters: Vec<AnnotationValue>,
}

/// Annotation parameters are literals, arrays of them, or unrepresentable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationValue {
    Boolean(bool),
    Number(f64),
    String(String),
    Array(Vec<AnnotationValue>),
    Invalid,
}

/// Contents of an `{outputPath}.meta` sidecar
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub descriptors: Vec<ComponentDescriptor>,
}

/// Fast, stable content hash: first 16 hex digits of SHA-256 over the
/// compact JSON encoding
pub fn content_hash<T: Serialize>(value: &T) -> String {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    format!("{:x}", hasher.finalize())[..16].to_string()
}
