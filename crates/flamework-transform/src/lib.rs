//! Flamework Transform - the per-file compilation engine
//!
//! Lowers one typed source file to the Lua target AST for a given
//! [`CompileContext`]:
//! - [`TransformState`]: prerequisite hoisting and per-file bookkeeping
//! - [`MacroRegistry`]: symbol-keyed overrides of the default lowering
//! - [`directives`]: static elimination of `$SERVER`/`$CLIENT` branches
//! - [`metadata`]: reflection descriptors for decorated classes
//!
//! The entry point is [`transform_file`].

mod error;
mod state;
pub mod directives;
pub mod macros;
pub mod metadata;
pub mod transformer;

#[cfg(test)]
mod test_support;

use std::path::{Path, PathBuf};

use flamework_ast::lua::LuaStmt;
use flamework_ast::printer::print_chunk;
use flamework_ast::{Diagnostic, SourceFile};
use flamework_build::{BuildState, ComponentDescriptor};
use tracing::{debug, debug_span};

pub use directives::{Decision, Directive, DirectiveCondition, DirectiveSet};
pub use error::ConfigError;
pub use macros::{MacroHandler, MacroKind, MacroRegistry, ReflectiveKind};
pub use state::{CompileContext, TransformOptions, TransformServices, TransformState};

/// Everything one file produced in a cycle
#[derive(Debug, Clone)]
pub struct FileOutput {
    pub source: PathBuf,
    pub context: CompileContext,
    pub statements: Vec<LuaStmt>,
    /// Descriptors for the file's `.meta` sidecar
    pub descriptors: Vec<ComponentDescriptor>,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Emitted Luau text
    pub fn text(&self) -> String {
        print_chunk(&self.statements)
    }

    /// Ids this file contributed to the build state
    pub fn contributed_ids(&self) -> Vec<String> {
        self.descriptors.iter().map(|d| d.id.clone()).collect()
    }
}

/// Key a source file is recorded under in the build state
pub fn file_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Transform one file. Descriptors and enum tables are appended to
/// `build`, which should be the cycle's staged copy.
pub fn transform_file(
    services: TransformServices<'_>,
    build: &mut BuildState,
    file: &SourceFile,
    context: CompileContext,
) -> FileOutput {
    let span = debug_span!("transform_file", path = %file.path.display(), context = context.as_str());
    let _enter = span.enter();

    let mut state = TransformState::new(services, build, file, context);
    let statements = transformer::transform_source_file(&mut state);
    assert_eq!(state.capture_depth(), 0, "capture scope left open after transform");

    let diagnostics = state.take_diagnostics();
    let descriptors = std::mem::take(&mut state.descriptors);
    debug!(
        statements = statements.len(),
        descriptors = descriptors.len(),
        diagnostics = diagnostics.len(),
        "transformed file"
    );

    FileOutput {
        source: file.path.clone(),
        context,
        statements,
        descriptors,
        diagnostics,
    }
}
