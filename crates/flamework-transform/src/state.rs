//! Per-file transform state and prerequisite hoisting
//!
//! The target language is statement oriented while the source nests
//! side effects inside expressions. Lowering an expression therefore yields
//! a result expression plus the statements that must run before it.
//! [`TransformState::capture`] opens a statement buffer, runs a closure and
//! hands back `(result, buffer)`; anything that needs a statement while the
//! closure runs appends to the innermost open buffer.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use flamework_ast::lua::{LuaExpr, LuaStmt};
use flamework_ast::{ClassDecl, Diagnostic, SourceFile, Span, SymbolId};
use flamework_build::{BuildState, ComponentDescriptor};
use flamework_symbols::{PathTranslator, SemanticFrontend};
use serde::{Deserialize, Serialize};

use crate::MacroRegistry;

/// Runtime environment an emitted file targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompileContext {
    Server,
    Client,
    Shared,
}

impl CompileContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompileContext::Server => "server",
            CompileContext::Client => "client",
            CompileContext::Shared => "shared",
        }
    }
}

/// Switches that change what the transformer emits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOptions {
    /// Emit generated short ids instead of internal ids
    pub obfuscate_ids: bool,
}

/// Collaborators shared by every file of a session
#[derive(Clone, Copy)]
pub struct TransformServices<'a> {
    pub frontend: &'a dyn SemanticFrontend,
    pub paths: &'a dyn PathTranslator,
    pub macros: &'a MacroRegistry,
    pub options: &'a TransformOptions,
}

/// One file's in-flight compilation
pub struct TransformState<'a> {
    pub context: CompileContext,
    pub file: &'a SourceFile,
    pub frontend: &'a dyn SemanticFrontend,
    pub paths: &'a dyn PathTranslator,
    pub macros: &'a MacroRegistry,
    pub options: &'a TransformOptions,
    /// Staged build state of the running cycle
    pub build: &'a mut BuildState,

    prerequisites: Vec<Vec<LuaStmt>>,
    diagnostics: Vec<Diagnostic>,
    temp_counts: HashMap<String, usize>,
    runtime_libraries: BTreeSet<&'static str>,
    pub(crate) descriptors: Vec<ComponentDescriptor>,
    pub(crate) class_stack: Vec<ClassFrame>,
}

/// Class currently being lowered
#[derive(Debug, Clone)]
pub(crate) struct ClassFrame {
    pub name: String,
    /// Internal stable id
    pub id: String,
    pub symbol: Option<SymbolId>,
    pub super_name: Option<String>,
}

/// Closes a capture scope on every exit path, including unwinding
struct CaptureScope<'s, 'a> {
    state: &'s mut TransformState<'a>,
    depth: usize,
    finished: bool,
}

impl CaptureScope<'_, '_> {
    fn finish(mut self) -> Vec<LuaStmt> {
        self.finished = true;
        assert_eq!(
            self.state.prerequisites.len(),
            self.depth,
            "unbalanced capture scope: expected depth {}, found {}",
            self.depth,
            self.state.prerequisites.len()
        );
        self.state.prerequisites.pop().unwrap_or_default()
    }
}

impl Drop for CaptureScope<'_, '_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state.prerequisites.truncate(self.depth - 1);
        }
    }
}

impl<'a> TransformState<'a> {
    pub fn new(
        services: TransformServices<'a>,
        build: &'a mut BuildState,
        file: &'a SourceFile,
        context: CompileContext,
    ) -> Self {
        Self {
            context,
            file,
            frontend: services.frontend,
            paths: services.paths,
            macros: services.macros,
            options: services.options,
            build,
            prerequisites: Vec::new(),
            diagnostics: Vec::new(),
            temp_counts: HashMap::new(),
            runtime_libraries: BTreeSet::new(),
            descriptors: Vec::new(),
            class_stack: Vec::new(),
        }
    }

    // ===== Prerequisite hoisting =====

    /// Run `f` inside a fresh statement buffer and return its result
    /// together with every statement hoisted while it ran
    pub fn capture<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> (T, Vec<LuaStmt>) {
        self.prerequisites.push(Vec::new());
        let depth = self.prerequisites.len();
        let mut scope = CaptureScope {
            state: self,
            depth,
            finished: false,
        };
        let result = f(&mut *scope.state);
        let statements = scope.finish();
        (result, statements)
    }

    /// Append a statement to the innermost capture scope
    pub fn prereq(&mut self, statement: LuaStmt) {
        match self.prerequisites.last_mut() {
            Some(buffer) => buffer.push(statement),
            None => panic!("prerequisite statement emitted outside of a capture scope"),
        }
    }

    pub fn prereq_list(&mut self, statements: Vec<LuaStmt>) {
        for statement in statements {
            self.prereq(statement);
        }
    }

    /// Current nesting depth of capture scopes
    pub fn capture_depth(&self) -> usize {
        self.prerequisites.len()
    }

    /// Deterministic, file-unique temporary name: `_name`, `_name_1`, ...
    pub fn new_temp(&mut self, name: &str) -> String {
        let count = self.temp_counts.entry(name.to_string()).or_insert(0);
        let id = if *count == 0 {
            format!("_{}", name)
        } else {
            format!("_{}_{}", name, count)
        };
        *count += 1;
        id
    }

    /// Hoist `value` into a fresh local and return a reference to it
    pub fn push_to_temp(&mut self, name: &str, value: LuaExpr) -> LuaExpr {
        let id = self.new_temp(name);
        self.prereq(LuaStmt::Local {
            names: vec![id.clone()],
            values: vec![value],
        });
        LuaExpr::Ident(id)
    }

    /// Hoist `value` unless it is already safe to reuse
    pub fn push_to_temp_if_complex(&mut self, name: &str, value: LuaExpr) -> LuaExpr {
        if value.is_simple_or_ident() {
            value
        } else {
            self.push_to_temp(name, value)
        }
    }

    // ===== Diagnostics =====

    pub fn error(&mut self, code: &'static str, message: impl Into<String>, span: Span) {
        self.diagnostics
            .push(Diagnostic::error(code, message, span).with_file(self.file.path.clone()));
    }

    pub fn warn(&mut self, code: &'static str, message: impl Into<String>, span: Span) {
        self.diagnostics
            .push(Diagnostic::warning(code, message, span).with_file(self.file.path.clone()));
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub(crate) fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    // ===== Runtime support =====

    /// Reference a runtime library table, importing it in the file header
    pub fn runtime(&mut self, name: &'static str) -> LuaExpr {
        self.runtime_libraries.insert(name);
        LuaExpr::ident(name)
    }

    pub(crate) fn runtime_libraries(&self) -> impl Iterator<Item = &&'static str> {
        self.runtime_libraries.iter()
    }

    // ===== Identifiers =====

    /// Stable identifier for a declaration named `name` in `file`
    pub fn stable_id(&self, file: Option<&Path>, name: &str) -> String {
        match file {
            Some(file) => format!("{}@{}", self.paths.source_to_import_specifier(file), name),
            None => format!("global@{}", name),
        }
    }

    /// Stable identifier of the declaration behind `symbol`
    pub fn id_of_symbol(&self, symbol: SymbolId) -> Option<String> {
        if let Some(id) = self
            .frontend
            .class_decl(symbol)
            .and_then(|class| class.id_override.clone())
        {
            return Some(id);
        }
        let declaration = self.frontend.declaration(symbol)?;
        let name = declaration
            .name
            .rsplit('.')
            .next()
            .unwrap_or(&declaration.name);
        Some(self.stable_id(declaration.file.as_deref(), name))
    }

    /// Stable identifier of a class declared in the current file
    pub fn id_of_class(&self, class: &ClassDecl, name: &str) -> String {
        class
            .id_override
            .clone()
            .unwrap_or_else(|| self.stable_id(Some(&self.file.path), name))
    }

    /// Identifier as it should appear in emitted code
    pub fn output_id(&mut self, id: &str) -> String {
        if self.options.obfuscate_ids {
            self.build.short_id(id)
        } else {
            id.to_string()
        }
    }

    /// Path of the current file as recorded in the build state
    pub fn file_key(&self) -> String {
        crate::file_key(&self.file.path)
    }

    pub(crate) fn current_class(&self) -> Option<&ClassFrame> {
        self.class_stack.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;

    #[test]
    fn test_capture_returns_hoisted_statements() {
        let fixture = Fixture::new();
        fixture.with_state(CompileContext::Shared, |state| {
            let (value, prereqs) = state.capture(|s| {
                s.prereq(LuaStmt::Break);
                42
            });
            assert_eq!(value, 42);
            assert_eq!(prereqs, vec![LuaStmt::Break]);
            assert_eq!(state.capture_depth(), 0);
        });
    }

    #[test]
    fn test_nested_capture_targets_innermost_buffer() {
        let fixture = Fixture::new();
        fixture.with_state(CompileContext::Shared, |state| {
            let ((_, inner), outer) = state.capture(|s| {
                s.prereq(LuaStmt::Comment("outer".into()));
                let inner = s.capture(|s| s.prereq(LuaStmt::Comment("inner".into())));
                s.prereq(LuaStmt::Comment("outer again".into()));
                inner
            });
            assert_eq!(inner, vec![LuaStmt::Comment("inner".into())]);
            assert_eq!(
                outer,
                vec![
                    LuaStmt::Comment("outer".into()),
                    LuaStmt::Comment("outer again".into())
                ]
            );
        });
    }

    #[test]
    fn test_capture_pops_on_early_return() {
        let fixture = Fixture::new();
        fixture.with_state(CompileContext::Shared, |state| {
            let (result, prereqs): (Result<(), &str>, _) = state.capture(|s| {
                s.prereq(LuaStmt::Break);
                Err::<(), _>("bail")?;
                s.prereq(LuaStmt::Continue);
                Ok(())
            });
            assert!(result.is_err());
            assert_eq!(prereqs, vec![LuaStmt::Break]);
            assert_eq!(state.capture_depth(), 0);
        });
    }

    #[test]
    fn test_capture_pops_on_panic() {
        let fixture = Fixture::new();
        fixture.with_state(CompileContext::Shared, |state| {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                state.capture(|s| {
                    s.prereq(LuaStmt::Break);
                    panic!("handler failed");
                })
            }));
            assert!(outcome.is_err());
            assert_eq!(state.capture_depth(), 0);
        });
    }

    #[test]
    #[should_panic(expected = "outside of a capture scope")]
    fn test_prereq_without_scope_is_fatal() {
        let fixture = Fixture::new();
        fixture.with_state(CompileContext::Shared, |state| {
            state.prereq(LuaStmt::Break);
        });
    }

    #[test]
    fn test_temp_names_are_deterministic() {
        let fixture = Fixture::new();
        fixture.with_state(CompileContext::Shared, |state| {
            assert_eq!(state.new_temp("result"), "_result");
            assert_eq!(state.new_temp("result"), "_result_1");
            assert_eq!(state.new_temp("binding"), "_binding");
        });
    }

    #[test]
    fn test_stable_id_uses_import_specifier() {
        let fixture = Fixture::new();
        fixture.with_state(CompileContext::Shared, |state| {
            assert_eq!(
                state.stable_id(Some(Path::new("src/shared/door.ts")), "Door"),
                "shared/door@Door"
            );
            assert_eq!(state.stable_id(None, "Part"), "global@Part");
        });
    }
}
