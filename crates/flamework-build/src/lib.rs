//! Flamework Build - the persisted cross-session reflection index
//!
//! Three documents make up the build state:
//! - [`BuildFile`]: behaviours, the inheritance graph and generated ids
//! - [`EditorInfo`]: enum tables and component entries for the editor
//! - [`FileComponentMap`]: which ids each source file contributed
//!
//! [`BuildState`] owns all three. The extractor appends to it while a cycle
//! runs; the orchestrator prunes it and commits it.

mod error;
mod descriptor;
mod build_file;
mod editor_info;
mod state;

pub use error::{BuildError, Result};
pub use descriptor::{
    content_hash, Annotation, AnnotationValue, ComponentDescriptor, DefaultExpression,
    DefaultValue, ExportKind, LiteralValue, MetaFile, PropertyDescriptor,
};
pub use build_file::{Behaviour, BuildFile, FlameworkSection, BUILD_FILE_VERSION};
pub use editor_info::{ComponentEntry, EditorInfo, EnumTable};
pub use state::{BuildState, FileComponentMap};
