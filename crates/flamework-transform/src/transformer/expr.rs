//! Expression lowering

use flamework_ast::lua::{is_valid_identifier, LuaBinaryOp, LuaExpr, LuaStmt, LuaUnaryOp, TableField};
use flamework_ast::{
    BinaryOp, CallExpr, Expr, ExprKind, Literal, LogicalOp, NewExpr, Param, Span, UnaryOp,
};

use super::stmt::transform_block;
use crate::macros::MacroCall;
use crate::TransformState;

/// Name as it may appear in emitted code
pub fn lua_name(name: &str) -> String {
    if is_valid_identifier(name) {
        return name.to_string();
    }
    let sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if is_valid_identifier(&sanitized) {
        sanitized
    } else {
        format!("_{}", sanitized)
    }
}

pub fn transform_expression(state: &mut TransformState<'_>, expr: &Expr) -> LuaExpr {
    match &expr.kind {
        ExprKind::Literal(literal) => match literal {
            Literal::Number(n) => LuaExpr::Number(*n),
            Literal::String(s) => LuaExpr::String(s.clone()),
            Literal::Bool(b) => LuaExpr::Bool(*b),
            Literal::Undefined => LuaExpr::Nil,
        },

        ExprKind::Ident(ident) => {
            let registry = state.macros;
            if let Some(handler) = ident.symbol.and_then(|s| registry.identifier(s)) {
                return handler(state, ident, expr.span);
            }
            if ident.name == "undefined" {
                return LuaExpr::Nil;
            }
            LuaExpr::Ident(lua_name(&ident.name))
        }

        ExprKind::This => LuaExpr::ident("self"),
        ExprKind::Super => super_ref(state),

        ExprKind::Binary { op, left, right } => {
            let mut values = ensure_transform_order(state, &[&**left, &**right]);
            let right_value = values.pop().unwrap_or(LuaExpr::Nil);
            let left_value = values.pop().unwrap_or(LuaExpr::Nil);
            let is_string = |e: &Expr| matches!(e.kind, ExprKind::Literal(Literal::String(_)));
            let op = match op {
                BinaryOp::Add if is_string(left) || is_string(right) => LuaBinaryOp::Concat,
                BinaryOp::Add => LuaBinaryOp::Add,
                BinaryOp::Sub => LuaBinaryOp::Sub,
                BinaryOp::Mul => LuaBinaryOp::Mul,
                BinaryOp::Div => LuaBinaryOp::Div,
                BinaryOp::Mod => LuaBinaryOp::Mod,
                BinaryOp::Eq => LuaBinaryOp::Eq,
                BinaryOp::Ne => LuaBinaryOp::Ne,
                BinaryOp::Lt => LuaBinaryOp::Lt,
                BinaryOp::Le => LuaBinaryOp::Le,
                BinaryOp::Gt => LuaBinaryOp::Gt,
                BinaryOp::Ge => LuaBinaryOp::Ge,
            };
            LuaExpr::binary(op, left_value, right_value)
        }

        ExprKind::Logical { op, left, right } => transform_logical(state, *op, left, right),

        ExprKind::Unary { op, operand } => {
            let operand = transform_expression(state, operand);
            match op {
                UnaryOp::Neg => LuaExpr::unary(LuaUnaryOp::Neg, operand),
                UnaryOp::Not => LuaExpr::unary(LuaUnaryOp::Not, operand),
            }
        }

        ExprKind::Call(call) => transform_call(state, call, expr.span),
        ExprKind::New(new) => transform_new(state, new, expr.span),

        ExprKind::Property {
            object,
            name,
            symbol,
            optional,
        } => {
            let object = transform_expression(state, object);
            let registry = state.macros;
            let getter = symbol.and_then(|s| registry.property_get(s));
            if *optional {
                let temp = state.new_temp("result");
                state.prereq(LuaStmt::Local {
                    names: vec![temp.clone()],
                    values: vec![object],
                });
                let access = match getter {
                    Some(handler) => handler(state, LuaExpr::ident(&temp), expr.span),
                    None => LuaExpr::property(LuaExpr::ident(&temp), name),
                };
                state.prereq(LuaStmt::If {
                    condition: LuaExpr::binary(LuaBinaryOp::Ne, LuaExpr::ident(&temp), LuaExpr::Nil),
                    then_body: vec![LuaStmt::Assign {
                        targets: vec![LuaExpr::ident(&temp)],
                        values: vec![access],
                    }],
                    else_body: None,
                });
                return LuaExpr::Ident(temp);
            }
            match getter {
                Some(handler) => handler(state, object, expr.span),
                None => LuaExpr::property(object, name),
            }
        }

        ExprKind::Index { object, index } => {
            let mut values = ensure_transform_order(state, &[&**object, &**index]);
            let key = values.pop().unwrap_or(LuaExpr::Nil);
            let object = values.pop().unwrap_or(LuaExpr::Nil);
            LuaExpr::Index {
                object: Box::new(object),
                key: Box::new(key),
            }
        }

        ExprKind::Assign { target, value } => {
            transform_assignment(state, target, value, expr.span, true)
        }

        ExprKind::Array(elements) => {
            let elements: Vec<&Expr> = elements.iter().collect();
            let values = ensure_transform_order(state, &elements);
            LuaExpr::Table(values.into_iter().map(TableField::Positional).collect())
        }

        ExprKind::Object(props) => {
            let values: Vec<&Expr> = props.iter().map(|p| &p.value).collect();
            let values = ensure_transform_order(state, &values);
            LuaExpr::Table(
                props
                    .iter()
                    .zip(values)
                    .map(|(prop, value)| TableField::Named(prop.key.clone(), value))
                    .collect(),
            )
        }

        ExprKind::Conditional {
            condition,
            when_true,
            when_false,
        } => transform_conditional(state, condition, when_true, when_false),

        ExprKind::Function { params, body } => {
            let (params, prologue) = transform_params(state, params);
            let mut lowered = prologue;
            lowered.extend(transform_block(state, &body.statements));
            LuaExpr::Function {
                params,
                body: lowered,
            }
        }
    }
}

/// Lower `exprs` in source order. Once a later expression hoists
/// statements, every earlier result that is not a literal or a plain
/// name is cached in a temporary so it is evaluated before them.
pub fn ensure_transform_order(state: &mut TransformState<'_>, exprs: &[&Expr]) -> Vec<LuaExpr> {
    let lowered: Vec<(LuaExpr, Vec<LuaStmt>)> = exprs
        .iter()
        .map(|expr| state.capture(|s| transform_expression(s, expr)))
        .collect();
    let last_with_prereqs = lowered.iter().rposition(|(_, prereqs)| !prereqs.is_empty());

    let mut results = Vec::with_capacity(lowered.len());
    for (index, (value, prereqs)) in lowered.into_iter().enumerate() {
        state.prereq_list(prereqs);
        match last_with_prereqs {
            Some(last) if index < last && !value.is_simple_or_ident() => {
                results.push(state.push_to_temp("arg", value))
            }
            _ => results.push(value),
        }
    }
    results
}

fn super_ref(state: &TransformState<'_>) -> LuaExpr {
    let name = state
        .current_class()
        .and_then(|frame| frame.super_name.clone())
        .unwrap_or_else(|| "super".to_string());
    LuaExpr::Ident(name)
}

fn transform_logical(
    state: &mut TransformState<'_>,
    op: LogicalOp,
    left: &Expr,
    right: &Expr,
) -> LuaExpr {
    let left = transform_expression(state, left);
    let (right, right_prereqs) = state.capture(|s| transform_expression(s, right));

    match op {
        LogicalOp::And if right_prereqs.is_empty() => LuaExpr::binary(LuaBinaryOp::And, left, right),
        LogicalOp::Or if right_prereqs.is_empty() => LuaExpr::binary(LuaBinaryOp::Or, left, right),
        _ => {
            // The right operand and its prerequisites only run when needed
            let temp = state.new_temp("result");
            state.prereq(LuaStmt::Local {
                names: vec![temp.clone()],
                values: vec![left],
            });
            let condition = match op {
                LogicalOp::And => LuaExpr::ident(&temp),
                LogicalOp::Or => LuaExpr::unary(LuaUnaryOp::Not, LuaExpr::ident(&temp)),
                LogicalOp::Nullish => {
                    LuaExpr::binary(LuaBinaryOp::Eq, LuaExpr::ident(&temp), LuaExpr::Nil)
                }
            };
            let mut body = right_prereqs;
            body.push(LuaStmt::Assign {
                targets: vec![LuaExpr::ident(&temp)],
                values: vec![right],
            });
            state.prereq(LuaStmt::If {
                condition,
                then_body: body,
                else_body: None,
            });
            LuaExpr::Ident(temp)
        }
    }
}

fn is_truthy_constant(expr: &LuaExpr) -> bool {
    matches!(
        expr,
        LuaExpr::Number(_) | LuaExpr::String(_) | LuaExpr::Bool(true) | LuaExpr::Table(_)
    )
}

fn transform_conditional(
    state: &mut TransformState<'_>,
    condition: &Expr,
    when_true: &Expr,
    when_false: &Expr,
) -> LuaExpr {
    let condition = transform_expression(state, condition);
    let (when_true, true_prereqs) = state.capture(|s| transform_expression(s, when_true));
    let (when_false, false_prereqs) = state.capture(|s| transform_expression(s, when_false));

    if true_prereqs.is_empty() && false_prereqs.is_empty() && is_truthy_constant(&when_true) {
        return LuaExpr::binary(
            LuaBinaryOp::Or,
            LuaExpr::binary(LuaBinaryOp::And, condition, when_true),
            when_false,
        );
    }

    let temp = state.new_temp("result");
    state.prereq(LuaStmt::Local {
        names: vec![temp.clone()],
        values: Vec::new(),
    });
    let assign = |value| LuaStmt::Assign {
        targets: vec![LuaExpr::ident(&temp)],
        values: vec![value],
    };
    let mut then_body = true_prereqs;
    then_body.push(assign(when_true));
    let mut else_body = false_prereqs;
    else_body.push(assign(when_false));
    state.prereq(LuaStmt::If {
        condition,
        then_body,
        else_body: Some(else_body),
    });
    LuaExpr::Ident(temp)
}

fn transform_call(state: &mut TransformState<'_>, call: &CallExpr, span: Span) -> LuaExpr {
    let registry = state.macros;
    if let Some(handler) = call.callee.symbol().and_then(|s| registry.call(s)) {
        let receiver = match &call.callee.kind {
            ExprKind::Property { object, .. } => Some(object.as_ref()),
            _ => None,
        };
        let mut operands: Vec<&Expr> = receiver.into_iter().collect();
        operands.extend(call.args.iter());
        let mut values = ensure_transform_order(state, &operands);
        let receiver = if receiver.is_some() && !values.is_empty() {
            Some(values.remove(0))
        } else {
            None
        };
        return handler(
            state,
            MacroCall {
                call,
                span,
                receiver,
                args: values,
            },
        );
    }

    match &call.callee.kind {
        // super(...) inside a constructor
        ExprKind::Super => {
            let args: Vec<&Expr> = call.args.iter().collect();
            let mut args = ensure_transform_order(state, &args);
            args.insert(0, LuaExpr::ident("self"));
            LuaExpr::call(LuaExpr::property(super_ref(state), "constructor"), args)
        }

        ExprKind::Property { object, name, .. } if matches!(object.kind, ExprKind::Super) => {
            let args: Vec<&Expr> = call.args.iter().collect();
            let mut args = ensure_transform_order(state, &args);
            args.insert(0, LuaExpr::ident("self"));
            LuaExpr::call(LuaExpr::property(super_ref(state), name), args)
        }

        ExprKind::Property {
            object,
            name,
            optional: true,
            ..
        } => {
            let object = transform_expression(state, object);
            let target = state.push_to_temp("result", object);
            let (args, arg_prereqs) = state.capture(|s| {
                let args: Vec<&Expr> = call.args.iter().collect();
                ensure_transform_order(s, &args)
            });
            let mut then_body = arg_prereqs;
            then_body.push(LuaStmt::Assign {
                targets: vec![target.clone()],
                values: vec![LuaExpr::method_call(target.clone(), name, args)],
            });
            state.prereq(LuaStmt::If {
                condition: LuaExpr::binary(LuaBinaryOp::Ne, target.clone(), LuaExpr::Nil),
                then_body,
                else_body: None,
            });
            target
        }

        ExprKind::Property { object, name, .. } => {
            let mut operands: Vec<&Expr> = vec![&**object];
            operands.extend(call.args.iter());
            let mut values = ensure_transform_order(state, &operands);
            let object = values.remove(0);
            LuaExpr::method_call(object, name, values)
        }

        _ => {
            let mut operands: Vec<&Expr> = vec![&*call.callee];
            operands.extend(call.args.iter());
            let mut values = ensure_transform_order(state, &operands);
            let callee = values.remove(0);
            LuaExpr::call(callee, values)
        }
    }
}

fn transform_new(state: &mut TransformState<'_>, new: &NewExpr, span: Span) -> LuaExpr {
    let registry = state.macros;
    if let Some(handler) = new.class.symbol().and_then(|s| registry.constructor(s)) {
        let args: Vec<&Expr> = new.args.iter().collect();
        let args = ensure_transform_order(state, &args);
        return handler(state, new, span, args);
    }

    let mut operands: Vec<&Expr> = vec![&*new.class];
    operands.extend(new.args.iter());
    let mut values = ensure_transform_order(state, &operands);
    let class = values.remove(0);
    LuaExpr::call(LuaExpr::property(class, "new"), values)
}

/// Lower an assignment. As a value it evaluates to the assigned value.
pub fn transform_assignment(
    state: &mut TransformState<'_>,
    target: &Expr,
    value: &Expr,
    span: Span,
    as_value: bool,
) -> LuaExpr {
    match &target.kind {
        ExprKind::Ident(ident) => {
            let mut value = transform_expression(state, value);
            if as_value {
                value = state.push_to_temp_if_complex("value", value);
            }
            state.prereq(LuaStmt::Assign {
                targets: vec![LuaExpr::Ident(lua_name(&ident.name))],
                values: vec![value.clone()],
            });
            value
        }

        ExprKind::Property {
            object,
            name,
            symbol,
            ..
        } => {
            let mut values = ensure_transform_order(state, &[&**object, value]);
            let mut value = values.pop().unwrap_or(LuaExpr::Nil);
            let object = values.pop().unwrap_or(LuaExpr::Nil);
            if as_value {
                value = state.push_to_temp_if_complex("value", value);
            }
            let registry = state.macros;
            let statement = match symbol.and_then(|s| registry.property_set(s)) {
                Some(handler) => handler(state, object, value.clone(), span),
                None => LuaStmt::Assign {
                    targets: vec![LuaExpr::property(object, name)],
                    values: vec![value.clone()],
                },
            };
            state.prereq(statement);
            value
        }

        ExprKind::Index { object, index } => {
            let mut values = ensure_transform_order(state, &[&**object, &**index, value]);
            let mut value = values.pop().unwrap_or(LuaExpr::Nil);
            let key = values.pop().unwrap_or(LuaExpr::Nil);
            let object = values.pop().unwrap_or(LuaExpr::Nil);
            if as_value {
                value = state.push_to_temp_if_complex("value", value);
            }
            state.prereq(LuaStmt::Assign {
                targets: vec![LuaExpr::Index {
                    object: Box::new(object),
                    key: Box::new(key),
                }],
                values: vec![value.clone()],
            });
            value
        }

        _ => {
            state.error("E-TRANSFORM-002", "invalid assignment target", span);
            LuaExpr::Nil
        }
    }
}

/// Parameter names plus the statements applying their defaults
pub fn transform_params(
    state: &mut TransformState<'_>,
    params: &[Param],
) -> (Vec<String>, Vec<LuaStmt>) {
    let mut names = Vec::with_capacity(params.len());
    let mut prologue = Vec::new();
    for param in params {
        let name = lua_name(&param.name.name);
        if let Some(default) = &param.default {
            let (value, mut body) = state.capture(|s| transform_expression(s, default));
            body.push(LuaStmt::Assign {
                targets: vec![LuaExpr::ident(&name)],
                values: vec![value],
            });
            prologue.push(LuaStmt::If {
                condition: LuaExpr::binary(LuaBinaryOp::Eq, LuaExpr::ident(&name), LuaExpr::Nil),
                then_body: body,
                else_body: None,
            });
        }
        names.push(name);
    }
    (names, prologue)
}
