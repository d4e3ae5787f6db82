//! Class lowering
//!
//! ```lua
//! local Door
//! do
//! 	local super = Base
//! 	Door = setmetatable({}, { __tostring = function() return "Door" end, __index = super })
//! 	Door.__index = Door
//! 	function Door.new(...)
//! 		local self = setmetatable({}, Door)
//! 		return self:constructor(...) or self
//! 	end
//! 	function Door:constructor(...) ... end
//! 	function Door:open() ... end
//! end
//! ```

use flamework_ast::lua::{LuaBinaryOp, LuaExpr, LuaStmt, TableField};
use flamework_ast::{ClassDecl, ClassMember, ConstructorDecl, Expr, ExprKind, Stmt, StmtKind};

use super::expr::{ensure_transform_order, lua_name, transform_expression, transform_params};
use super::stmt::{transform_block, transform_statement};
use crate::macros::DecoratorSite;
use crate::metadata::extract_class;
use crate::state::ClassFrame;
use crate::TransformState;

const SUPER: &str = "super";

pub fn transform_class(state: &mut TransformState<'_>, class: &ClassDecl) -> Vec<LuaStmt> {
    let name = match class.name_str() {
        Some(name) => name.to_string(),
        None => state.new_temp("class"),
    };
    let local = lua_name(&name);
    let id = state.id_of_class(class, &name);
    let class_ref = LuaExpr::ident(&local);

    let mut body = Vec::new();
    if let Some(extends) = &class.extends {
        let (base, prereqs) = state.capture(|s| transform_expression(s, extends));
        body.extend(prereqs);
        body.push(LuaStmt::Local {
            names: vec![SUPER.to_string()],
            values: vec![base],
        });
    }

    state.class_stack.push(ClassFrame {
        name: name.clone(),
        id: id.clone(),
        symbol: class.symbol,
        super_name: class.extends.as_ref().map(|_| SUPER.to_string()),
    });

    let mut metatable = vec![TableField::Named(
        "__tostring".into(),
        LuaExpr::Function {
            params: Vec::new(),
            body: vec![LuaStmt::Return(vec![LuaExpr::String(name.clone())])],
        },
    )];
    if class.extends.is_some() {
        metatable.push(TableField::Named("__index".into(), LuaExpr::ident(SUPER)));
    }
    body.push(LuaStmt::Assign {
        targets: vec![class_ref.clone()],
        values: vec![LuaExpr::call(
            LuaExpr::ident("setmetatable"),
            vec![LuaExpr::Table(Vec::new()), LuaExpr::Table(metatable)],
        )],
    });
    body.push(LuaStmt::Assign {
        targets: vec![LuaExpr::property(class_ref.clone(), "__index")],
        values: vec![class_ref.clone()],
    });
    body.push(LuaStmt::Function {
        path: format!("{}.new", local),
        params: vec!["...".into()],
        body: vec![
            LuaStmt::Local {
                names: vec!["self".into()],
                values: vec![LuaExpr::call(
                    LuaExpr::ident("setmetatable"),
                    vec![LuaExpr::Table(Vec::new()), class_ref.clone()],
                )],
            },
            LuaStmt::Return(vec![LuaExpr::binary(
                LuaBinaryOp::Or,
                LuaExpr::method_call(LuaExpr::ident("self"), "constructor", vec![LuaExpr::Vararg]),
                LuaExpr::ident("self"),
            )]),
        ],
    });

    let constructor = class.members.iter().find_map(|member| match member {
        ClassMember::Constructor(ctor) => Some(ctor),
        _ => None,
    });
    body.push(lower_constructor(state, class, &local, constructor));

    for member in &class.members {
        match member {
            ClassMember::Method(method) => {
                let (params, mut method_body) = transform_params(state, &method.params);
                method_body.extend(transform_block(state, &method.body.statements));
                body.push(LuaStmt::Function {
                    path: format!("{}:{}", local, lua_name(&method.name)),
                    params,
                    body: method_body,
                });
            }
            ClassMember::Property(property) if property.is_static => {
                if let Some(initializer) = &property.initializer {
                    let (value, prereqs) =
                        state.capture(|s| transform_expression(s, initializer));
                    body.extend(prereqs);
                    body.push(LuaStmt::Assign {
                        targets: vec![LuaExpr::property(class_ref.clone(), &property.name)],
                        values: vec![value],
                    });
                }
            }
            _ => {}
        }
    }

    let mut out = vec![
        LuaStmt::Local {
            names: vec![local.clone()],
            values: Vec::new(),
        },
        LuaStmt::Do(body),
    ];
    out.extend(apply_decorators(state, class, &class_ref, &id));

    let registry = state.macros;
    let reflective = class.decorators.iter().any(|decorator| {
        decorator
            .callee()
            .symbol()
            .is_some_and(|symbol| registry.reflective_kind(symbol).is_some())
    });
    if reflective {
        extract_class(state, class);
    }

    state.class_stack.pop();
    out
}

/// Whether `statement` is a bare `super(...)` call
fn is_super_call(statement: &Stmt) -> bool {
    matches!(
        &statement.kind,
        StmtKind::Expr(Expr { kind: ExprKind::Call(call), .. })
            if matches!(call.callee.kind, ExprKind::Super)
    )
}

/// `function Class:constructor(...)`: the `super(...)` call, then
/// instance property initializers, then the rest of the body
fn lower_constructor(
    state: &mut TransformState<'_>,
    class: &ClassDecl,
    local: &str,
    constructor: Option<&ConstructorDecl>,
) -> LuaStmt {
    let (params, mut body) = match constructor {
        Some(ctor) => transform_params(state, &ctor.params),
        None => (vec!["...".to_string()], Vec::new()),
    };
    let statements: &[Stmt] = constructor
        .map(|ctor| ctor.body.statements.as_slice())
        .unwrap_or(&[]);

    let (leading, rest) = match statements.split_first() {
        Some((first, rest)) if is_super_call(first) => (Some(first), rest),
        _ => (None, statements),
    };
    if let Some(super_call) = leading {
        body.extend(transform_statement(state, super_call));
    } else if constructor.is_none() && class.extends.is_some() {
        body.push(LuaStmt::Call(LuaExpr::call(
            LuaExpr::property(LuaExpr::ident(SUPER), "constructor"),
            vec![LuaExpr::ident("self"), LuaExpr::Vararg],
        )));
    }

    for property in class.properties().filter(|p| !p.is_static) {
        if let Some(initializer) = &property.initializer {
            let (value, prereqs) = state.capture(|s| transform_expression(s, initializer));
            body.extend(prereqs);
            body.push(LuaStmt::Assign {
                targets: vec![LuaExpr::property(LuaExpr::ident("self"), &property.name)],
                values: vec![value],
            });
        }
    }
    body.extend(transform_block(state, rest));

    LuaStmt::Function {
        path: format!("{}:constructor", local),
        params,
        body,
    }
}

/// Run decorator macros. Other decorators are declarative annotations
/// and only feed the metadata extractor.
fn apply_decorators(
    state: &mut TransformState<'_>,
    class: &ClassDecl,
    class_ref: &LuaExpr,
    class_id: &str,
) -> Vec<LuaStmt> {
    let registry = state.macros;
    let mut out = Vec::new();
    for decorator in &class.decorators {
        let Some(handler) = decorator
            .callee()
            .symbol()
            .and_then(|symbol| registry.decorator(symbol))
        else {
            continue;
        };
        let (statements, prereqs) = state.capture(|s| {
            let args: Vec<&Expr> = decorator.args().iter().collect();
            let args = ensure_transform_order(s, &args);
            let site = DecoratorSite {
                class,
                decorator,
                class_ref: class_ref.clone(),
                class_id: class_id.to_string(),
                args,
            };
            handler(s, &site)
        });
        out.extend(prereqs);
        out.extend(statements);
    }
    out
}
