//! Built-in macros installed for every session

use flamework_ast::lua::{LuaExpr, LuaStmt, LuaUnaryOp, TableField};
use flamework_ast::{format_number, EnumValue, Ident, NewExpr, Span, SymbolId, TypeRef};
use flamework_build::{content_hash, EnumTable, LiteralValue};

use super::{
    type_argument, type_id, DecoratorMacro, DecoratorSite, MacroCall, MacroHandler,
    MacroRegistry, ReflectiveKind,
};
use crate::metadata::literal_value;
use crate::{CompileContext, Directive, TransformState};

/// A declaration the compiler looks up by name at session start
#[derive(Debug, Clone, Copy)]
pub struct WellKnown {
    pub name: &'static str,
    /// Missing required names abort the session
    pub required: bool,
    /// Only ever lowered by a macro; imports of it are elided
    pub macro_only: bool,
}

const fn known(name: &'static str, required: bool, macro_only: bool) -> WellKnown {
    WellKnown {
        name,
        required,
        macro_only,
    }
}

pub const WELL_KNOWN: &[WellKnown] = &[
    known("$SERVER", true, true),
    known("$CLIENT", true, true),
    known("$CONTEXT", false, true),
    known("RunService.IsServer", false, false),
    known("RunService.IsClient", false, false),
    known("Flamework.id", true, true),
    known("Flamework.implements", true, true),
    known("Flamework.logLevel", false, false),
    known("Dependency", true, true),
    known("Reflect.enumValues", false, true),
    known("Reflect.unionValues", false, true),
    known("Map", false, false),
    known("Set", false, false),
    known("ReadonlyArray.length", false, false),
    known("Component", true, false),
    known("Service", true, false),
    known("Controller", true, false),
];

pub(super) fn install(registry: &mut MacroRegistry) {
    for (name, directive) in [
        ("$SERVER", Directive::Server),
        ("$CLIENT", Directive::Client),
        ("RunService.IsServer", Directive::Server),
        ("RunService.IsClient", Directive::Client),
    ] {
        if let Some(symbol) = registry.symbol(name) {
            install_directive(registry, symbol, name, directive);
        }
    }

    if let Some(symbol) = registry.symbol("$CONTEXT") {
        registry.register(
            symbol,
            MacroHandler::Identifier(Box::new(|state: &mut TransformState<'_>, _: &Ident, _: Span| {
                LuaExpr::string(state.context.as_str())
            })),
        );
    }

    let calls: [(&str, fn(&mut TransformState<'_>, MacroCall<'_>) -> LuaExpr); 5] = [
        ("Flamework.id", flamework_id),
        ("Flamework.implements", flamework_implements),
        ("Dependency", dependency),
        ("Reflect.enumValues", enum_values),
        ("Reflect.unionValues", union_values),
    ];
    for (name, handler) in calls {
        if let Some(symbol) = registry.symbol(name) {
            registry.register(symbol, MacroHandler::Call(Box::new(handler)));
        }
    }

    for name in ["Map", "Set"] {
        if let Some(symbol) = registry.symbol(name) {
            registry.register(
                symbol,
                MacroHandler::Constructor(Box::new(
                    move |state: &mut TransformState<'_>, _: &NewExpr, span: Span, args: Vec<LuaExpr>| {
                        check_arity(state, &format!("new {}", name), args.len(), 0, span);
                        LuaExpr::Table(Vec::new())
                    },
                )),
            );
        }
    }

    if let Some(symbol) = registry.symbol("ReadonlyArray.length") {
        registry.register(
            symbol,
            MacroHandler::PropertyGet(Box::new(|_: &mut TransformState<'_>, object: LuaExpr, _: Span| {
                LuaExpr::unary(LuaUnaryOp::Len, object)
            })),
        );
    }

    if let Some(symbol) = registry.symbol("Flamework.logLevel") {
        registry.register(
            symbol,
            MacroHandler::PropertySet(Box::new(
                |state: &mut TransformState<'_>, _: LuaExpr, value: LuaExpr, _: Span| {
                    let flamework = state.runtime("Flamework");
                    LuaStmt::Call(LuaExpr::call(
                        LuaExpr::property(flamework, "setLogLevel"),
                        vec![value],
                    ))
                },
            )),
        );
    }

    for (name, kind, forbidden) in [
        ("Component", ReflectiveKind::Component, None),
        ("Service", ReflectiveKind::Singleton, Some(CompileContext::Client)),
        ("Controller", ReflectiveKind::Singleton, Some(CompileContext::Server)),
    ] {
        if let Some(symbol) = registry.symbol(name) {
            registry.mark_reflective(symbol, kind);
            registry.register(
                symbol,
                MacroHandler::Decorator(reflective_decorator(name, forbidden)),
            );
        }
    }
}

fn install_directive(
    registry: &mut MacroRegistry,
    symbol: SymbolId,
    name: &'static str,
    directive: Directive,
) {
    registry.register_directive(symbol, directive);
    registry.register(
        symbol,
        MacroHandler::Identifier(Box::new(move |state: &mut TransformState<'_>, _: &Ident, _: Span| {
            directive_value(state, directive)
        })),
    );
    registry.register(
        symbol,
        MacroHandler::Call(Box::new(move |state: &mut TransformState<'_>, call: MacroCall<'_>| {
            check_arity(state, name, call.args.len(), 0, call.span);
            directive_value(state, directive)
        })),
    );
}

/// A directive used as a value: folded to a constant, or a runtime
/// check when the file runs in both contexts
fn directive_value(state: &mut TransformState<'_>, directive: Directive) -> LuaExpr {
    if let Some(value) = directive.evaluate(state.context) {
        return LuaExpr::Bool(value);
    }
    let run_service = LuaExpr::method_call(
        LuaExpr::ident("game"),
        "GetService",
        vec![LuaExpr::string("RunService")],
    );
    match directive {
        Directive::Server => LuaExpr::method_call(run_service, "IsServer", Vec::new()),
        Directive::Client => LuaExpr::method_call(run_service, "IsClient", Vec::new()),
        Directive::NotServer => LuaExpr::unary(
            LuaUnaryOp::Not,
            LuaExpr::method_call(run_service, "IsServer", Vec::new()),
        ),
        Directive::NotClient => LuaExpr::unary(
            LuaUnaryOp::Not,
            LuaExpr::method_call(run_service, "IsClient", Vec::new()),
        ),
    }
}

fn check_arity(
    state: &mut TransformState<'_>,
    name: &str,
    found: usize,
    expected: usize,
    span: Span,
) -> bool {
    if found == expected {
        return true;
    }
    state.error(
        "E-MACRO-001",
        format!(
            "`{}` expects {} argument{}, found {}",
            name,
            expected,
            if expected == 1 { "" } else { "s" },
            found
        ),
        span,
    );
    false
}

/// `Flamework.id<T>()`; inside a class `T` defaults to the class itself
fn flamework_id(state: &mut TransformState<'_>, call: MacroCall<'_>) -> LuaExpr {
    if !check_arity(state, "Flamework.id", call.args.len(), 0, call.span) {
        return LuaExpr::Nil;
    }
    let explicit = call
        .call
        .type_args
        .first()
        .or_else(|| call.call.inferred_type_args.first())
        .cloned();
    let id = match explicit {
        Some(ty) => type_id(state, &ty, call.span),
        None => match state.current_class() {
            Some(frame) => Some(frame.id.clone()),
            None => type_argument(state, call.call, 0, "Flamework.id", call.span)
                .and_then(|ty| type_id(state, &ty, call.span)),
        },
    };
    match id {
        Some(id) => LuaExpr::String(state.output_id(&id)),
        None => LuaExpr::Nil,
    }
}

/// `Flamework.implements<T>(value)`
fn flamework_implements(state: &mut TransformState<'_>, call: MacroCall<'_>) -> LuaExpr {
    if !check_arity(state, "Flamework.implements", call.args.len(), 1, call.span) {
        return LuaExpr::Bool(false);
    }
    let Some(ty) = type_argument(state, call.call, 0, "Flamework.implements", call.span)
    else {
        return LuaExpr::Bool(false);
    };
    let Some(id) = type_id(state, &ty, call.span) else {
        return LuaExpr::Bool(false);
    };
    let id = state.output_id(&id);
    let flamework = state.runtime("Flamework");
    let mut args = call.args;
    args.push(LuaExpr::String(id));
    LuaExpr::call(LuaExpr::property(flamework, "_implements"), args)
}

/// `Dependency<T>()`
fn dependency(state: &mut TransformState<'_>, call: MacroCall<'_>) -> LuaExpr {
    if !check_arity(state, "Dependency", call.args.len(), 0, call.span) {
        return LuaExpr::Nil;
    }
    let Some(ty) = type_argument(state, call.call, 0, "Dependency", call.span) else {
        return LuaExpr::Nil;
    };
    let Some(id) = type_id(state, &ty, call.span) else {
        return LuaExpr::Nil;
    };
    let id = state.output_id(&id);
    let flamework = state.runtime("Flamework");
    LuaExpr::call(
        LuaExpr::property(flamework, "resolveDependency"),
        vec![LuaExpr::String(id)],
    )
}

/// `Reflect.enumValues<E>()`: a table of the enum's members
fn enum_values(state: &mut TransformState<'_>, call: MacroCall<'_>) -> LuaExpr {
    let empty = LuaExpr::Table(Vec::new());
    if !check_arity(state, "Reflect.enumValues", call.args.len(), 0, call.span) {
        return empty;
    }
    let Some(ty) = type_argument(state, call.call, 0, "Reflect.enumValues", call.span)
    else {
        return empty;
    };

    match &ty {
        TypeRef::Enum { symbol, .. } => match register_enum(state, *symbol) {
            Some(table) => LuaExpr::Table(
                table
                    .into_iter()
                    .map(|(name, value)| TableField::Named(name, lua_value(value)))
                    .collect(),
            ),
            None => empty,
        },
        other if other.literal_union().is_some() => {
            state.error(
                "E-MACRO-004",
                format!(
                    "`{}` is a literal union; use `Reflect.unionValues` instead of `Reflect.enumValues`",
                    other.display()
                ),
                call.span,
            );
            empty
        }
        other => {
            state.error(
                "E-MACRO-005",
                format!("`Reflect.enumValues` expects an enum, found `{}`", other.display()),
                call.span,
            );
            empty
        }
    }
}

/// `Reflect.unionValues<U>()`: a list of the union's literal members
fn union_values(state: &mut TransformState<'_>, call: MacroCall<'_>) -> LuaExpr {
    let empty = LuaExpr::Table(Vec::new());
    if !check_arity(state, "Reflect.unionValues", call.args.len(), 0, call.span) {
        return empty;
    }
    let Some(ty) = type_argument(state, call.call, 0, "Reflect.unionValues", call.span)
    else {
        return empty;
    };

    if matches!(ty, TypeRef::Enum { .. }) {
        state.error(
            "E-MACRO-004",
            format!(
                "`{}` is an enum; use `Reflect.enumValues` instead of `Reflect.unionValues`",
                ty.display()
            ),
            call.span,
        );
        return empty;
    }
    match register_union(state, &ty) {
        Some((_, values)) => LuaExpr::Table(
            values
                .into_iter()
                .map(|value| TableField::Positional(lua_value(value)))
                .collect(),
        ),
        None => {
            state.error(
                "E-MACRO-005",
                format!(
                    "`Reflect.unionValues` expects a union of literals, found `{}`",
                    ty.display()
                ),
                call.span,
            );
            empty
        }
    }
}

/// Register the enum behind `symbol`, returning its members in order
pub(crate) fn register_enum(
    state: &mut TransformState<'_>,
    symbol: SymbolId,
) -> Option<Vec<(String, LiteralValue)>> {
    let frontend = state.frontend;
    let members: Vec<(String, LiteralValue)> = frontend
        .enum_members(symbol)?
        .iter()
        .map(|member| {
            let value = match &member.value {
                EnumValue::Number(n) => LiteralValue::Number(*n),
                EnumValue::String(s) => LiteralValue::String(s.clone()),
            };
            (member.name.clone(), value)
        })
        .collect();
    let id = state.id_of_symbol(symbol)?;
    let table: EnumTable = members.iter().cloned().collect();
    state.build.register_enum(&id, table);
    Some(members)
}

/// Register a literal union, returning its id and members in order
pub(crate) fn register_union(
    state: &mut TransformState<'_>,
    ty: &TypeRef,
) -> Option<(String, Vec<LiteralValue>)> {
    let values: Vec<LiteralValue> = ty
        .literal_union()?
        .into_iter()
        .filter_map(literal_value)
        .collect();
    let id = union_id(state, ty, &values);
    let table: EnumTable = values
        .iter()
        .map(|value| (literal_key(value), value.clone()))
        .collect();
    state.build.register_enum(&id, table);
    Some((id, values))
}

/// Id of a literal union: the alias when named, else derived from content
fn union_id(
    state: &TransformState<'_>,
    ty: &TypeRef,
    values: &[LiteralValue],
) -> String {
    match ty {
        TypeRef::Alias { symbol, .. } => state
            .id_of_symbol(*symbol)
            .unwrap_or_else(|| format!("union@{}", content_hash(&values))),
        _ => format!("union@{}", content_hash(&values)),
    }
}

fn literal_key(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Bool(b) => b.to_string(),
        LiteralValue::Number(n) => format_number(*n),
        LiteralValue::String(s) => s.clone(),
    }
}

fn lua_value(value: LiteralValue) -> LuaExpr {
    match value {
        LiteralValue::Bool(b) => LuaExpr::Bool(b),
        LiteralValue::Number(n) => LuaExpr::Number(n),
        LiteralValue::String(s) => LuaExpr::String(s),
    }
}

fn reflective_decorator(
    name: &'static str,
    forbidden: Option<CompileContext>,
) -> DecoratorMacro {
    Box::new(move |state: &mut TransformState<'_>, site: &DecoratorSite<'_>| {
        if forbidden == Some(state.context) {
            state.error(
                "E-DECORATOR-001",
                format!(
                    "@{} cannot be used in {} code",
                    name,
                    state.context.as_str()
                ),
                site.decorator.span,
            );
        }

        let class_id = state.output_id(&site.class_id);
        let decorator_id = site
            .decorator
            .callee()
            .symbol()
            .and_then(|symbol| state.id_of_symbol(symbol))
            .unwrap_or_else(|| format!("global@{}", name));
        let decorator_id = state.output_id(&decorator_id);
        let decorator_ref = LuaExpr::ident(site.decorator.callee().name().unwrap_or(name));
        let reflect = state.runtime("Reflect");

        vec![
            LuaStmt::Call(LuaExpr::call(
                LuaExpr::property(reflect.clone(), "defineMetadata"),
                vec![
                    site.class_ref.clone(),
                    LuaExpr::string("identifier"),
                    LuaExpr::String(class_id),
                ],
            )),
            LuaStmt::Call(LuaExpr::call(
                LuaExpr::property(reflect, "decorate"),
                vec![
                    site.class_ref.clone(),
                    LuaExpr::String(decorator_id),
                    decorator_ref,
                    LuaExpr::Table(
                        site.args
                            .iter()
                            .cloned()
                            .map(TableField::Positional)
                            .collect(),
                    ),
                ],
            )),
        ]
    })
}
