//! Reflection metadata extraction for decorated classes

use flamework_ast::{
    ClassDecl, Decorator, Expr, ExprKind, Literal, PropertyDecl, SymbolId, TypeRef, UnaryOp,
    Visibility,
};
use flamework_build::{
    Annotation, AnnotationValue, ComponentDescriptor, DefaultExpression, DefaultValue,
    ExportKind, LiteralValue, PropertyDescriptor,
};
use tracing::debug;

use crate::macros::{register_enum, register_union, ReflectiveKind};
use crate::TransformState;

/// Annotations where only the last occurrence counts
const SINGLETON_ANNOTATIONS: &[&str] = &["DisplayName", "Tooltip", "Range", "Category", "Hidden"];

/// Build the descriptor for `class`, record it in the staged build state
/// and queue it for the file's `.meta` sidecar.
///
/// Never fails: malformed classes are diagnosed and described with
/// best-effort defaults.
pub fn extract_class(state: &mut TransformState<'_>, class: &ClassDecl) -> ComponentDescriptor {
    let name = match class.name_str() {
        Some(name) => name.to_string(),
        None => {
            state.error("E-META-001", "reflective classes must be named", class.span);
            "Anonymous".to_string()
        }
    };
    if !class.exported {
        state.error(
            "E-META-002",
            format!("reflective class `{}` must be exported", name),
            class.span,
        );
    }

    let id = state.id_of_class(class, &name);
    let frontend = state.frontend;
    let ancestors: Vec<SymbolId> = class
        .symbol
        .map(|symbol| frontend.ancestors_of_class(symbol))
        .unwrap_or_default();
    let extends: Vec<String> = ancestors
        .iter()
        .filter_map(|symbol| state.id_of_symbol(*symbol))
        .collect();

    // Root first so subclasses shadow what they inherit
    let mut chain: Vec<&ClassDecl> = ancestors
        .iter()
        .rev()
        .filter_map(|symbol| frontend.class_decl(*symbol))
        .collect();
    chain.push(class);

    let registry = state.macros;
    let mut is_component = false;
    let mut annotations = Vec::new();
    let mut properties: Vec<PropertyDescriptor> = Vec::new();
    for decl in chain {
        let mut own = Vec::new();
        for decorator in &decl.decorators {
            let symbol = decorator.callee().symbol();
            match symbol.and_then(|s| registry.reflective_kind(s)) {
                Some(ReflectiveKind::Component) => is_component = true,
                Some(ReflectiveKind::Singleton) => {}
                None if symbol.is_some_and(|s| registry.decorator(s).is_some()) => {}
                None => merge_annotation(&mut own, annotation_of(decorator)),
            }
        }
        inherit_annotations(&mut annotations, own);

        let exported = decl
            .properties()
            .filter(|p| !p.is_static && p.visibility == Visibility::Public);
        for property in exported {
            let Some(descriptor) = describe_property(state, property) else {
                continue;
            };
            match properties.iter_mut().find(|p| p.name == descriptor.name) {
                Some(existing) => {
                    let mut merged = std::mem::take(&mut existing.annotations);
                    inherit_annotations(&mut merged, descriptor.annotations.clone());
                    *existing = PropertyDescriptor {
                        annotations: merged,
                        ..descriptor
                    };
                }
                None => properties.push(descriptor),
            }
        }
    }

    let mut descriptor = ComponentDescriptor {
        id,
        name,
        hash: String::new(),
        is_component,
        extends,
        properties,
        annotations,
    };
    descriptor.seal();

    let file_key = state.file_key();
    let asset_path = state
        .paths
        .source_to_output(&state.file.path)
        .to_string_lossy()
        .replace('\\', "/");
    state
        .build
        .record_descriptor(&file_key, &descriptor, &asset_path);
    debug!(id = %descriptor.id, hash = %descriptor.hash, "extracted descriptor");
    state.descriptors.push(descriptor.clone());
    descriptor
}

fn describe_property(
    state: &mut TransformState<'_>,
    property: &PropertyDecl,
) -> Option<PropertyDescriptor> {
    let declared = property
        .ty
        .clone()
        .or_else(|| property.initializer.as_ref().and_then(infer_type));
    let Some(ty) = declared else {
        state.warn(
            "W-META-001",
            format!("property `{}` has no type and is not exported", property.name),
            property.span,
        );
        return None;
    };

    let nullable = property.optional || ty.is_nullable();
    let ty = ty.non_nullable();
    let Some(kind) = export_kind(state, &ty) else {
        state.warn(
            "W-META-002",
            format!(
                "property `{}` has type `{}` which cannot be exported",
                property.name,
                ty.display()
            ),
            property.span,
        );
        return None;
    };

    let mut annotations = Vec::new();
    for decorator in &property.decorators {
        merge_annotation(&mut annotations, annotation_of(decorator));
    }

    Some(PropertyDescriptor {
        name: property.name.clone(),
        type_name: ty.display(),
        kind,
        nullable,
        default: property.initializer.as_ref().and_then(capture_default),
        annotations,
    })
}

fn export_kind(state: &mut TransformState<'_>, ty: &TypeRef) -> Option<ExportKind> {
    if ty.literal_union().is_some() {
        let (id, _) = register_union(state, ty)?;
        return Some(ExportKind::LiteralUnion { id });
    }
    match ty {
        TypeRef::Number | TypeRef::String | TypeRef::Boolean | TypeRef::Literal(_) => {
            Some(ExportKind::Primitive)
        }
        TypeRef::Array(element) => Some(ExportKind::Array {
            element: Box::new(export_kind(state, element)?),
        }),
        TypeRef::Instance(class_name) => Some(ExportKind::Object {
            class_name: class_name.clone(),
        }),
        TypeRef::Enum { symbol, .. } => {
            register_enum(state, *symbol)?;
            Some(ExportKind::Enum {
                id: state.id_of_symbol(*symbol)?,
            })
        }
        TypeRef::Class { symbol, .. } => Some(ExportKind::Serializable {
            id: state.id_of_symbol(*symbol)?,
        }),
        TypeRef::Alias { target, .. } => export_kind(state, target),
        _ => None,
    }
}

fn infer_type(initializer: &Expr) -> Option<TypeRef> {
    match &initializer.kind {
        ExprKind::Literal(Literal::Number(_)) => Some(TypeRef::Number),
        ExprKind::Literal(Literal::String(_)) => Some(TypeRef::String),
        ExprKind::Literal(Literal::Bool(_)) => Some(TypeRef::Boolean),
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => infer_type(operand).filter(|ty| *ty == TypeRef::Number),
        _ => None,
    }
}

pub(crate) fn literal_value(literal: &Literal) -> Option<LiteralValue> {
    match literal {
        Literal::Number(n) => Some(LiteralValue::Number(*n)),
        Literal::String(s) => Some(LiteralValue::String(s.clone())),
        Literal::Bool(b) => Some(LiteralValue::Bool(*b)),
        Literal::Undefined => None,
    }
}

/// `Workspace.Baseplate`
fn dotted_path(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Ident(ident) => Some(ident.name.clone()),
        ExprKind::Property { object, name, .. } => {
            Some(format!("{}.{}", dotted_path(object)?, name))
        }
        _ => None,
    }
}

fn capture_args(args: &[Expr]) -> Option<Vec<DefaultValue>> {
    args.iter().map(capture_default).collect()
}

/// Describe a property initializer, if it has a shape the editor knows
fn capture_default(expr: &Expr) -> Option<DefaultValue> {
    match &expr.kind {
        ExprKind::Literal(literal) => literal_value(literal).map(DefaultValue::Literal),
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => match &operand.kind {
            ExprKind::Literal(Literal::Number(n)) => {
                Some(DefaultValue::Literal(LiteralValue::Number(-n)))
            }
            _ => None,
        },
        ExprKind::New(new) => Some(DefaultValue::Expression(DefaultExpression::Constructor {
            class: dotted_path(&new.class)?,
            args: capture_args(&new.args)?,
        })),
        ExprKind::Property { object, name, .. } => {
            Some(DefaultValue::Expression(DefaultExpression::StaticMember {
                object: dotted_path(object)?,
                member: name.clone(),
            }))
        }
        ExprKind::Call(call) => match &call.callee.kind {
            ExprKind::Property { object, name, .. } => {
                Some(DefaultValue::Expression(DefaultExpression::MethodCall {
                    object: dotted_path(object)?,
                    method: name.clone(),
                    args: capture_args(&call.args)?,
                }))
            }
            _ => None,
        },
        ExprKind::Array(elements) => Some(DefaultValue::Expression(DefaultExpression::Array {
            elements: capture_args(elements)?,
        })),
        _ => None,
    }
}

fn annotation_value(expr: &Expr) -> AnnotationValue {
    match &expr.kind {
        ExprKind::Literal(Literal::Bool(b)) => AnnotationValue::Boolean(*b),
        ExprKind::Literal(Literal::Number(n)) => AnnotationValue::Number(*n),
        ExprKind::Literal(Literal::String(s)) => AnnotationValue::String(s.clone()),
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => match &operand.kind {
            ExprKind::Literal(Literal::Number(n)) => AnnotationValue::Number(-n),
            _ => AnnotationValue::Invalid,
        },
        ExprKind::Array(elements) => {
            AnnotationValue::Array(elements.iter().map(annotation_value).collect())
        }
        _ => AnnotationValue::Invalid,
    }
}

fn annotation_of(decorator: &Decorator) -> Annotation {
    Annotation {
        name: decorator.callee().name().unwrap_or("unknown").to_string(),
        parameters: decorator.args().iter().map(annotation_value).collect(),
    }
}

/// Structural dedup, except singletons where the last write wins
fn merge_annotation(annotations: &mut Vec<Annotation>, annotation: Annotation) {
    if SINGLETON_ANNOTATIONS.contains(&annotation.name.as_str()) {
        match annotations.iter_mut().find(|a| a.name == annotation.name) {
            Some(existing) => *existing = annotation,
            None => annotations.push(annotation),
        }
    } else if !annotations.contains(&annotation) {
        annotations.push(annotation);
    }
}

/// Lay a subclass's annotations over inherited ones. An inherited
/// annotation is replaced when the subclass declares one of that name.
fn inherit_annotations(inherited: &mut Vec<Annotation>, own: Vec<Annotation>) {
    inherited.retain(|annotation| !own.iter().any(|a| a.name == annotation.name));
    inherited.extend(own);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{call, ident, member, new_expr, num, string, Fixture};
    use crate::CompileContext;
    use flamework_ast::{ClassMember, Expr, ExprKind, Ident};

    fn property(name: &str, ty: Option<TypeRef>, initializer: Option<Expr>) -> ClassMember {
        let mut property = PropertyDecl::new(name, TypeRef::Unknown);
        property.ty = ty;
        property.initializer = initializer;
        ClassMember::Property(property)
    }

    #[test]
    fn test_numeric_property_descriptor() {
        let mut fixture = Fixture::new();
        let mut class = fixture.class("src/shared/door.ts", "Door");
        class.decorators.push(fixture.decorator("Component", vec![]));
        class.members.push(property("speed", None, Some(num(5.0))));

        let output = fixture.compile_class("src/shared/door.ts", class, CompileContext::Shared);
        assert!(!output.has_errors());
        let descriptor = &output.descriptors[0];
        assert_eq!(descriptor.id, "shared/door@Door");
        assert!(!descriptor.hash.is_empty());
        assert!(descriptor.is_component);
        assert_eq!(descriptor.properties.len(), 1);
        let speed = &descriptor.properties[0];
        assert_eq!(speed.name, "speed");
        assert_eq!(speed.type_name, "number");
        assert_eq!(speed.kind, ExportKind::Primitive);
        assert_eq!(
            speed.default,
            Some(DefaultValue::Literal(LiteralValue::Number(5.0)))
        );

        let build = fixture.build();
        let behaviour = &build.build.behaviours["shared/door@Door"];
        assert!(behaviour.component);
        assert_eq!(behaviour.file_path, "src/shared/door.ts");
        assert_eq!(build.editor.components["shared/door@Door"].asset_path, "out/shared/door.lua");
    }

    #[test]
    fn test_subclass_shadows_inherited_property() {
        let mut fixture = Fixture::new();
        let mut base = fixture.class("src/shared/base.ts", "Base");
        base.decorators.push(fixture.decorator("Component", vec![]));
        base.decorators.push(fixture.decorator("Tooltip", vec![string("base")]));
        base.members.push(property("health", Some(TypeRef::Number), Some(num(100.0))));
        base.members.push(property("label", Some(TypeRef::String), None));
        let base_symbol = base.symbol;
        fixture.frontend.add_class(base);

        let mut door = fixture.class("src/shared/door.ts", "Door");
        door.extends = Some(Expr::synthetic(ExprKind::Ident(Ident {
            name: "Base".into(),
            symbol: base_symbol,
        })));
        door.decorators.push(fixture.decorator("Component", vec![]));
        door.decorators.push(fixture.decorator("Tooltip", vec![string("door")]));
        door.members.push(property("health", Some(TypeRef::Number), Some(num(250.0))));
        fixture.frontend.add_class(door.clone());

        let output = fixture.compile_class("src/shared/door.ts", door, CompileContext::Shared);
        let descriptor = &output.descriptors[0];
        assert_eq!(descriptor.extends, vec!["shared/base@Base".to_string()]);
        let names: Vec<&str> = descriptor.properties.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["health", "label"]);
        assert_eq!(
            descriptor.properties[0].default,
            Some(DefaultValue::Literal(LiteralValue::Number(250.0)))
        );
        assert_eq!(
            descriptor.annotations,
            vec![Annotation {
                name: "Tooltip".into(),
                parameters: vec![AnnotationValue::String("door".into())],
            }]
        );
        assert_eq!(
            fixture.build().build.extends["shared/base@Base"],
            vec!["shared/door@Door".to_string()]
        );
    }

    #[test]
    fn test_subclass_annotation_replaces_inherited_by_name() {
        let mut fixture = Fixture::new();
        let mut base = fixture.class("src/shared/base.ts", "Base");
        base.decorators.push(fixture.decorator("Component", vec![]));
        base.decorators.push(fixture.decorator("Tag", vec![string("shared")]));
        base.decorators.push(fixture.decorator("Tag", vec![string("base")]));
        base.decorators.push(fixture.decorator("Category", vec![string("Lights")]));
        let base_symbol = base.symbol;
        fixture.frontend.add_class(base);

        let mut lamp = fixture.class("src/shared/lamp.ts", "Lamp");
        lamp.extends = Some(Expr::synthetic(ExprKind::Ident(Ident {
            name: "Base".into(),
            symbol: base_symbol,
        })));
        lamp.decorators.push(fixture.decorator("Component", vec![]));
        lamp.decorators.push(fixture.decorator("Tag", vec![string("lamp")]));
        fixture.frontend.add_class(lamp.clone());

        let output = fixture.compile_class("src/shared/lamp.ts", lamp, CompileContext::Shared);
        let tag = |name: &str, value: &str| Annotation {
            name: name.into(),
            parameters: vec![AnnotationValue::String(value.into())],
        };
        assert_eq!(
            output.descriptors[0].annotations,
            vec![tag("Category", "Lights"), tag("Tag", "lamp")]
        );
    }

    #[test]
    fn test_export_kinds() {
        let mut fixture = Fixture::new();
        let (_, state_ty) = fixture.declare_enum("src/shared/state.ts", "State", &[("Idle", 0.0)]);
        let color = fixture.declare_union("src/shared/color.ts", "Color", &["red", "blue"]);

        let mut class = fixture.class("src/shared/lamp.ts", "Lamp");
        class.decorators.push(fixture.decorator("Component", vec![]));
        class.members.push(property("state", Some(state_ty), None));
        class.members.push(property("color", Some(color), None));
        class.members.push(property("part", Some(TypeRef::optional(TypeRef::Instance("Part".into()))), None));
        class.members.push(property("weights", Some(TypeRef::array(TypeRef::Number)), None));
        class.members.push(property("callback", Some(TypeRef::TypeParameter("T".into())), None));

        let output = fixture.compile_class("src/shared/lamp.ts", class, CompileContext::Shared);
        let kinds: Vec<(&str, &ExportKind, bool)> = output.descriptors[0]
            .properties
            .iter()
            .map(|p| (p.name.as_str(), &p.kind, p.nullable))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("state", &ExportKind::Enum { id: "shared/state@State".into() }, false),
                ("color", &ExportKind::LiteralUnion { id: "shared/color@Color".into() }, false),
                ("part", &ExportKind::Object { class_name: "Part".into() }, true),
                (
                    "weights",
                    &ExportKind::Array { element: Box::new(ExportKind::Primitive) },
                    false
                ),
            ]
        );
        assert!(output.diagnostics.iter().any(|d| d.code == "W-META-002"));

        let build = fixture.build();
        assert!(build.editor.enums.contains_key("shared/state@State"));
        assert_eq!(
            build.editor.enums["shared/color@Color"]["red"],
            LiteralValue::String("red".into())
        );
    }

    #[test]
    fn test_expression_defaults() {
        let ctor = new_expr(ident("Vector3"), vec![num(1.0), num(2.0), num(3.0)]);
        assert_eq!(
            capture_default(&ctor),
            Some(DefaultValue::Expression(DefaultExpression::Constructor {
                class: "Vector3".into(),
                args: vec![
                    DefaultValue::Literal(LiteralValue::Number(1.0)),
                    DefaultValue::Literal(LiteralValue::Number(2.0)),
                    DefaultValue::Literal(LiteralValue::Number(3.0)),
                ],
            }))
        );

        let material = member(member(ident("Enum"), "Material"), "Plastic");
        assert_eq!(
            capture_default(&material),
            Some(DefaultValue::Expression(DefaultExpression::StaticMember {
                object: "Enum.Material".into(),
                member: "Plastic".into(),
            }))
        );

        let rgb = call(member(ident("Color3"), "fromRGB"), vec![num(255.0), num(0.0), num(0.0)]);
        assert!(matches!(
            capture_default(&rgb),
            Some(DefaultValue::Expression(DefaultExpression::MethodCall { ref method, .. })) if method == "fromRGB"
        ));

        // Unknown shapes are not captured
        assert_eq!(capture_default(&call(ident("compute"), vec![])), None);
    }

    #[test]
    fn test_annotation_merging() {
        let mut annotations = Vec::new();
        let tag = |name: &str, value: &str| Annotation {
            name: name.into(),
            parameters: vec![AnnotationValue::String(value.into())],
        };
        merge_annotation(&mut annotations, tag("Tag", "a"));
        merge_annotation(&mut annotations, tag("Tag", "a"));
        merge_annotation(&mut annotations, tag("Tag", "b"));
        merge_annotation(&mut annotations, tag("Tooltip", "first"));
        merge_annotation(&mut annotations, tag("Tooltip", "second"));
        assert_eq!(
            annotations,
            vec![tag("Tag", "a"), tag("Tag", "b"), tag("Tooltip", "second")]
        );
    }

    #[test]
    fn test_unnamed_class_is_diagnosed_but_described() {
        let mut fixture = Fixture::new();
        let mut class = fixture.class("src/shared/anon.ts", "Anon");
        class.name = None;
        class.exported = false;
        class.decorators.push(fixture.decorator("Component", vec![]));

        let output = fixture.compile_class("src/shared/anon.ts", class, CompileContext::Shared);
        let codes: Vec<&str> = output.diagnostics.iter().map(|d| d.code).collect();
        assert!(codes.contains(&"E-META-001"));
        assert!(codes.contains(&"E-META-002"));
        assert_eq!(output.descriptors[0].name, "Anonymous");
    }
}
