//! Generic type arguments lowered to runtime tokens

use flamework_ast::{CallExpr, Span, TypeRef};

use crate::TransformState;

/// Resolve the `index`-th type argument of a macro call: explicit first,
/// then whatever the checker inferred, then the default the macro's
/// declaration gives its type parameter. Reports a diagnostic when
/// nothing applies.
pub fn type_argument(
    state: &mut TransformState<'_>,
    call: &CallExpr,
    index: usize,
    macro_name: &str,
    span: Span,
) -> Option<TypeRef> {
    let resolved = call
        .type_args
        .get(index)
        .or_else(|| call.inferred_type_args.get(index))
        .cloned()
        .or_else(|| declared_default(state, call, index));
    if resolved.is_none() {
        state.error(
            "E-MACRO-002",
            format!(
                "`{}` requires a type argument that was not specified and could not be inferred",
                macro_name
            ),
            span,
        );
    }
    resolved
}

fn declared_default(state: &TransformState<'_>, call: &CallExpr, index: usize) -> Option<TypeRef> {
    let symbol = call.callee.symbol()?;
    state
        .frontend
        .declaration(symbol)?
        .type_defaults
        .get(index)
        .cloned()
        .flatten()
}

/// Runtime identity of a type: the stable id of its declaration, the
/// engine class name, or a primitive name
pub fn type_id(state: &mut TransformState<'_>, ty: &TypeRef, span: Span) -> Option<String> {
    let id = match ty {
        TypeRef::Number | TypeRef::String | TypeRef::Boolean => Some(ty.display()),
        TypeRef::Instance(name) => Some(name.clone()),
        TypeRef::Optional(inner) => return type_id(state, inner, span),
        other => other.symbol().and_then(|symbol| state.id_of_symbol(symbol)),
    };
    if id.is_none() {
        state.error(
            "E-MACRO-003",
            format!("type `{}` has no runtime identity", ty.display()),
            span,
        );
    }
    id
}
