//! Macro registry
//!
//! A macro replaces the default lowering of one resolved declaration. The
//! registry is built once per session from the frontend's well-known names
//! and shared by reference with every [`TransformState`].

mod builtins;
mod generics;

use std::collections::{HashMap, HashSet};

use flamework_ast::lua::{LuaExpr, LuaStmt};
use flamework_ast::{CallExpr, ClassDecl, Decorator, Ident, NewExpr, Span, SymbolId};
use flamework_symbols::SemanticFrontend;
use tracing::debug;

use crate::{ConfigError, Directive, TransformState};

pub use builtins::{WellKnown, WELL_KNOWN};
pub(crate) use builtins::{register_enum, register_union};
pub use generics::{type_argument, type_id};

/// Node category a handler overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroKind {
    Identifier,
    Call,
    Constructor,
    PropertyGet,
    PropertySet,
    Decorator,
}

/// Operands handed to a call macro
pub struct MacroCall<'c> {
    pub call: &'c CallExpr,
    pub span: Span,
    /// Lowered object of a `receiver.method()` callee
    pub receiver: Option<LuaExpr>,
    pub args: Vec<LuaExpr>,
}

/// The class a decorator macro is applied to
pub struct DecoratorSite<'c> {
    pub class: &'c ClassDecl,
    pub decorator: &'c Decorator,
    /// Local the class is bound to in emitted code
    pub class_ref: LuaExpr,
    /// Internal stable id of the class
    pub class_id: String,
    pub args: Vec<LuaExpr>,
}

pub type IdentifierMacro = Box<dyn Fn(&mut TransformState<'_>, &Ident, Span) -> LuaExpr>;
pub type CallMacro = Box<dyn Fn(&mut TransformState<'_>, MacroCall<'_>) -> LuaExpr>;
pub type ConstructorMacro =
    Box<dyn Fn(&mut TransformState<'_>, &NewExpr, Span, Vec<LuaExpr>) -> LuaExpr>;
pub type PropertyGetMacro = Box<dyn Fn(&mut TransformState<'_>, LuaExpr, Span) -> LuaExpr>;
/// Receives the lowered object and value, returns the replacement statement
pub type PropertySetMacro =
    Box<dyn Fn(&mut TransformState<'_>, LuaExpr, LuaExpr, Span) -> LuaStmt>;
pub type DecoratorMacro = Box<dyn Fn(&mut TransformState<'_>, &DecoratorSite<'_>) -> Vec<LuaStmt>>;

pub enum MacroHandler {
    Identifier(IdentifierMacro),
    Call(CallMacro),
    Constructor(ConstructorMacro),
    PropertyGet(PropertyGetMacro),
    PropertySet(PropertySetMacro),
    Decorator(DecoratorMacro),
}

impl MacroHandler {
    pub fn kind(&self) -> MacroKind {
        match self {
            MacroHandler::Identifier(_) => MacroKind::Identifier,
            MacroHandler::Call(_) => MacroKind::Call,
            MacroHandler::Constructor(_) => MacroKind::Constructor,
            MacroHandler::PropertyGet(_) => MacroKind::PropertyGet,
            MacroHandler::PropertySet(_) => MacroKind::PropertySet,
            MacroHandler::Decorator(_) => MacroKind::Decorator,
        }
    }
}

impl std::fmt::Debug for MacroHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MacroHandler::{:?}", self.kind())
    }
}

/// How a reflective decorator marks the classes it decorates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectiveKind {
    Component,
    Singleton,
}

#[derive(Debug, Default)]
pub struct MacroRegistry {
    handlers: HashMap<(SymbolId, MacroKind), MacroHandler>,
    directives: HashMap<SymbolId, Directive>,
    macro_only: HashSet<SymbolId>,
    reflective: HashMap<SymbolId, ReflectiveKind>,
    /// Well-known name to resolved symbol
    symbols: HashMap<&'static str, SymbolId>,
}

impl MacroRegistry {
    /// Registry with nothing registered
    pub fn empty() -> Self {
        Self::default()
    }

    /// Resolve every well-known declaration and install the built-in
    /// macros. A missing required declaration is a configuration error.
    pub fn new(frontend: &dyn SemanticFrontend) -> Result<Self, ConfigError> {
        let mut registry = Self::empty();
        for known in WELL_KNOWN {
            match frontend.resolve_global_name(known.name) {
                Some(symbol) => {
                    registry.symbols.insert(known.name, symbol);
                    if known.macro_only {
                        registry.macro_only.insert(symbol);
                    }
                }
                None if known.required => {
                    return Err(ConfigError::MissingSymbol {
                        name: known.name.to_string(),
                    });
                }
                None => debug!(name = known.name, "optional declaration not found"),
            }
        }
        builtins::install(&mut registry);
        debug!(handlers = registry.handlers.len(), "macro registry ready");
        Ok(registry)
    }

    /// Register `handler` for `symbol`, replacing any handler of the same
    /// category. Returns the replaced handler.
    pub fn register(&mut self, symbol: SymbolId, handler: MacroHandler) -> Option<MacroHandler> {
        self.handlers.insert((symbol, handler.kind()), handler)
    }

    pub fn register_directive(&mut self, symbol: SymbolId, directive: Directive) {
        self.directives.insert(symbol, directive);
    }

    /// Never emit a runtime import for `symbol`
    pub fn mark_macro_only(&mut self, symbol: SymbolId) {
        self.macro_only.insert(symbol);
    }

    pub fn mark_reflective(&mut self, symbol: SymbolId, kind: ReflectiveKind) {
        self.reflective.insert(symbol, kind);
    }

    /// Symbol a well-known name resolved to
    pub fn symbol(&self, name: &str) -> Option<SymbolId> {
        self.symbols.get(name).copied()
    }

    pub fn has(&self, symbol: SymbolId, kind: MacroKind) -> bool {
        self.handlers.contains_key(&(symbol, kind))
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn directive(&self, symbol: SymbolId) -> Option<Directive> {
        self.directives.get(&symbol).copied()
    }

    pub fn is_macro_only(&self, symbol: SymbolId) -> bool {
        self.macro_only.contains(&symbol)
    }

    pub fn reflective_kind(&self, symbol: SymbolId) -> Option<ReflectiveKind> {
        self.reflective.get(&symbol).copied()
    }

    pub fn identifier(&self, symbol: SymbolId) -> Option<&IdentifierMacro> {
        match self.handlers.get(&(symbol, MacroKind::Identifier)) {
            Some(MacroHandler::Identifier(handler)) => Some(handler),
            _ => None,
        }
    }

    pub fn call(&self, symbol: SymbolId) -> Option<&CallMacro> {
        match self.handlers.get(&(symbol, MacroKind::Call)) {
            Some(MacroHandler::Call(handler)) => Some(handler),
            _ => None,
        }
    }

    pub fn constructor(&self, symbol: SymbolId) -> Option<&ConstructorMacro> {
        match self.handlers.get(&(symbol, MacroKind::Constructor)) {
            Some(MacroHandler::Constructor(handler)) => Some(handler),
            _ => None,
        }
    }

    pub fn property_get(&self, symbol: SymbolId) -> Option<&PropertyGetMacro> {
        match self.handlers.get(&(symbol, MacroKind::PropertyGet)) {
            Some(MacroHandler::PropertyGet(handler)) => Some(handler),
            _ => None,
        }
    }

    pub fn property_set(&self, symbol: SymbolId) -> Option<&PropertySetMacro> {
        match self.handlers.get(&(symbol, MacroKind::PropertySet)) {
            Some(MacroHandler::PropertySet(handler)) => Some(handler),
            _ => None,
        }
    }

    pub fn decorator(&self, symbol: SymbolId) -> Option<&DecoratorMacro> {
        match self.handlers.get(&(symbol, MacroKind::Decorator)) {
            Some(MacroHandler::Decorator(handler)) => Some(handler),
            _ => None,
        }
    }
}
