//! Statement lowering and directive-gated branches

use flamework_ast::lua::{LuaBinaryOp, LuaExpr, LuaStmt, LuaUnaryOp, TableField};
use flamework_ast::{
    BindingPattern, EnumValue, Expr, ExprKind, ImportDecl, Stmt, StmtKind, VariableDecl,
};

use super::class::transform_class;
use super::expr::{lua_name, transform_assignment, transform_expression, transform_params};
use crate::directives::{self, Decision, DirectiveCondition};
use crate::TransformState;

/// Whether the remainder of a block is still reachable after lowering
enum Flow {
    Continue(Vec<LuaStmt>),
    /// The block ends here; later statements are unreachable
    Exit(Vec<LuaStmt>),
}

/// Lower a statement list, resolving directive-gated `if`s on the way
pub fn transform_block(state: &mut TransformState<'_>, statements: &[Stmt]) -> Vec<LuaStmt> {
    let mut out = Vec::new();
    for (index, statement) in statements.iter().enumerate() {
        if let StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } = &statement.kind
        {
            let registry = state.macros;
            if let Some(classified) = directives::classify(registry, condition) {
                let flow = lower_directive_if(
                    state,
                    statement,
                    classified,
                    then_branch,
                    else_branch.as_deref(),
                    index == 0,
                );
                match flow {
                    Some(Flow::Continue(lowered)) => {
                        out.extend(lowered);
                        continue;
                    }
                    Some(Flow::Exit(lowered)) => {
                        out.extend(lowered);
                        break;
                    }
                    None => {}
                }
            }
        }

        out.extend(transform_statement(state, statement));
        // Lua rejects statements after a block terminator
        if matches!(
            statement.kind,
            StmtKind::Return(_) | StmtKind::Throw(_) | StmtKind::Break | StmtKind::Continue
        ) {
            break;
        }
    }
    out
}

/// Lower one statement, emitting its hoisted prerequisites first
pub fn transform_statement(state: &mut TransformState<'_>, statement: &Stmt) -> Vec<LuaStmt> {
    let (lowered, mut out) = state.capture(|s| lower_statement(s, statement));
    out.extend(lowered);
    out
}

fn lower_directive_if(
    state: &mut TransformState<'_>,
    statement: &Stmt,
    condition: DirectiveCondition,
    then_branch: &Stmt,
    else_branch: Option<&Stmt>,
    first_in_block: bool,
) -> Option<Flow> {
    if condition.directives.is_contradictory() {
        state.warn(
            "W-DIRECTIVE-001",
            "this directive condition is always false",
            statement.span,
        );
    }

    match directives::decide(condition.directives, state.context) {
        Decision::Runtime => None,
        Decision::Then => match condition.residual {
            Some(residual) => Some(Flow::Continue(lower_if(
                state,
                &residual,
                then_branch,
                else_branch,
            ))),
            None => {
                let body = branch_statements(state, then_branch);
                if first_in_block && then_branch.always_exits() {
                    Some(Flow::Exit(body))
                } else {
                    Some(Flow::Continue(inline_branch(body)))
                }
            }
        },
        Decision::Else => {
            let body = match else_branch {
                Some(branch) => inline_branch(branch_statements(state, branch)),
                None => Vec::new(),
            };
            Some(Flow::Continue(body))
        }
    }
}

/// Scope an inlined branch so its locals and terminators stay contained
fn inline_branch(body: Vec<LuaStmt>) -> Vec<LuaStmt> {
    let needs_scope = body.iter().any(|stmt| {
        matches!(
            stmt,
            LuaStmt::Local { .. }
                | LuaStmt::LocalFunction { .. }
                | LuaStmt::Return(_)
                | LuaStmt::Break
                | LuaStmt::Continue
        )
    });
    if needs_scope {
        vec![LuaStmt::Do(body)]
    } else {
        body
    }
}

fn branch_statements(state: &mut TransformState<'_>, branch: &Stmt) -> Vec<LuaStmt> {
    match &branch.kind {
        StmtKind::Block(block) => transform_block(state, &block.statements),
        _ => transform_block(state, std::slice::from_ref(branch)),
    }
}

fn lower_if(
    state: &mut TransformState<'_>,
    condition: &Expr,
    then_branch: &Stmt,
    else_branch: Option<&Stmt>,
) -> Vec<LuaStmt> {
    let (condition, mut out) = state.capture(|s| transform_expression(s, condition));
    let then_body = branch_statements(state, then_branch);
    let else_body = else_branch.map(|branch| branch_statements(state, branch));
    out.push(LuaStmt::If {
        condition,
        then_body,
        else_body,
    });
    out
}

fn lower_statement(state: &mut TransformState<'_>, statement: &Stmt) -> Vec<LuaStmt> {
    match &statement.kind {
        StmtKind::Expr(expr) => lower_expression_statement(state, expr),

        StmtKind::Variable(decl) => lower_variable(state, decl),

        StmtKind::Return(value) => {
            let values = value
                .as_ref()
                .map(|v| transform_expression(state, v))
                .into_iter()
                .collect();
            vec![LuaStmt::Return(values)]
        }

        StmtKind::Throw(value) => {
            let value = transform_expression(state, value);
            vec![LuaStmt::Call(LuaExpr::call(LuaExpr::ident("error"), vec![value]))]
        }

        StmtKind::If {
            condition,
            then_branch,
            else_branch,
        } => lower_if(state, condition, then_branch, else_branch.as_deref()),

        StmtKind::Block(block) => vec![LuaStmt::Do(transform_block(state, &block.statements))],

        StmtKind::While { condition, body } => {
            let (condition, prereqs) = state.capture(|s| transform_expression(s, condition));
            let body = branch_statements(state, body);
            if prereqs.is_empty() {
                return vec![LuaStmt::While { condition, body }];
            }
            // Re-evaluate the hoisted condition on every iteration
            let mut looped = prereqs;
            looped.push(LuaStmt::If {
                condition: LuaExpr::unary(LuaUnaryOp::Not, condition),
                then_body: vec![LuaStmt::Break],
                else_body: None,
            });
            looped.extend(body);
            vec![LuaStmt::While {
                condition: LuaExpr::Bool(true),
                body: looped,
            }]
        }

        StmtKind::Break => vec![LuaStmt::Break],
        StmtKind::Continue => vec![LuaStmt::Continue],

        StmtKind::Function(function) => {
            if function
                .name
                .symbol
                .is_some_and(|symbol| state.frontend.is_generator(symbol))
            {
                state.error(
                    "E-TRANSFORM-001",
                    format!("generator function `{}` is not supported", function.name.name),
                    function.span,
                );
            }
            let (params, mut body) = transform_params(state, &function.params);
            body.extend(transform_block(state, &function.body.statements));
            vec![LuaStmt::LocalFunction {
                name: lua_name(&function.name.name),
                params,
                body,
            }]
        }

        StmtKind::Class(class) => transform_class(state, class),

        StmtKind::Enum(decl) => {
            let fields = decl
                .members
                .iter()
                .map(|member| {
                    let value = match &member.value {
                        EnumValue::Number(n) => LuaExpr::Number(*n),
                        EnumValue::String(s) => LuaExpr::String(s.clone()),
                    };
                    TableField::Named(member.name.clone(), value)
                })
                .collect();
            vec![LuaStmt::Local {
                names: vec![lua_name(&decl.name.name)],
                values: vec![LuaExpr::Table(fields)],
            }]
        }

        StmtKind::Import(import) => lower_import(state, import),
    }
}

fn lower_expression_statement(state: &mut TransformState<'_>, expr: &Expr) -> Vec<LuaStmt> {
    if let ExprKind::Assign { target, value } = &expr.kind {
        transform_assignment(state, target, value, expr.span, false);
        return Vec::new();
    }
    match transform_expression(state, expr) {
        value if value.is_call() => vec![LuaStmt::Call(value)],
        // Reading a name has no effect
        LuaExpr::Ident(_) => Vec::new(),
        value => vec![LuaStmt::Local {
            names: vec!["_".to_string()],
            values: vec![value],
        }],
    }
}

fn lower_variable(state: &mut TransformState<'_>, decl: &VariableDecl) -> Vec<LuaStmt> {
    let init = decl.init.as_ref().map(|init| transform_expression(state, init));

    match &decl.binding {
        BindingPattern::Ident(ident) => vec![LuaStmt::Local {
            names: vec![lua_name(&ident.name)],
            values: init.into_iter().collect(),
        }],

        BindingPattern::Object(bindings) => {
            let Some(source) = init else {
                return vec![LuaStmt::Local {
                    names: bindings.iter().map(|b| lua_name(&b.local.name)).collect(),
                    values: Vec::new(),
                }];
            };
            let source = state.push_to_temp_if_complex("binding", source);
            for binding in bindings {
                let name = lua_name(&binding.local.name);
                state.prereq(LuaStmt::Local {
                    names: vec![name.clone()],
                    values: vec![LuaExpr::property(source.clone(), &binding.property)],
                });
                if let Some(default) = &binding.default {
                    apply_default(state, &name, default);
                }
            }
            Vec::new()
        }

        BindingPattern::Array(elements) => {
            let Some(source) = init else {
                return vec![LuaStmt::Local {
                    names: elements
                        .iter()
                        .flatten()
                        .map(|ident| lua_name(&ident.name))
                        .collect(),
                    values: Vec::new(),
                }];
            };
            let source = state.push_to_temp_if_complex("binding", source);
            for (index, element) in elements.iter().enumerate() {
                let Some(ident) = element else { continue };
                state.prereq(LuaStmt::Local {
                    names: vec![lua_name(&ident.name)],
                    values: vec![LuaExpr::Index {
                        object: Box::new(source.clone()),
                        key: Box::new(LuaExpr::Number(index as f64 + 1.0)),
                    }],
                });
            }
            Vec::new()
        }
    }
}

/// `if name == nil then name = default end`, with the default's
/// prerequisites only running when it is used
fn apply_default(state: &mut TransformState<'_>, name: &str, default: &Expr) {
    let (value, mut body) = state.capture(|s| transform_expression(s, default));
    body.push(LuaStmt::Assign {
        targets: vec![LuaExpr::ident(name)],
        values: vec![value],
    });
    state.prereq(LuaStmt::If {
        condition: LuaExpr::binary(LuaBinaryOp::Eq, LuaExpr::ident(name), LuaExpr::Nil),
        then_body: body,
        else_body: None,
    });
}

fn lower_import(state: &mut TransformState<'_>, import: &ImportDecl) -> Vec<LuaStmt> {
    let registry = state.macros;
    let kept: Vec<_> = import
        .specifiers
        .iter()
        .filter(|spec| !spec.local.symbol.is_some_and(|s| registry.is_macro_only(s)))
        .collect();
    if kept.is_empty() && !import.specifiers.is_empty() {
        return Vec::new();
    }

    let specifier = match &import.resolved_path {
        Some(path) => state.paths.source_to_import_specifier(path),
        None => import.module.clone(),
    };
    let ts = state.runtime("TS");
    let module = LuaExpr::call(
        LuaExpr::property(ts, "import"),
        vec![LuaExpr::ident("script"), LuaExpr::String(specifier)],
    );

    match kept.as_slice() {
        [] => vec![LuaStmt::Call(module)],
        [only] => vec![LuaStmt::Local {
            names: vec![lua_name(&only.local.name)],
            values: vec![LuaExpr::property(module, &only.imported)],
        }],
        many => {
            let module = state.push_to_temp("module", module);
            many.iter()
                .map(|spec| LuaStmt::Local {
                    names: vec![lua_name(&spec.local.name)],
                    values: vec![LuaExpr::property(module.clone(), &spec.imported)],
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::{and, block, call, ident, if_stmt, not, ret, Fixture};
    use crate::CompileContext;

    /// `if ($SERVER) return; rest()` as the first statement of a method
    fn guarded_body(fixture: &Fixture) -> Vec<flamework_ast::Stmt> {
        vec![
            if_stmt(fixture.global("$SERVER"), ret(), None),
            fixture.expr_stmt(call(ident("rest"), vec![])),
        ]
    }

    #[test]
    fn test_guard_clause_elides_rest_for_matching_context() {
        let fixture = Fixture::new();
        let text = fixture.compile_function(guarded_body(&fixture), CompileContext::Server);
        assert!(text.contains("local function body()\n\treturn\nend\n"), "{}", text);
        assert!(!text.contains("rest()"));
    }

    #[test]
    fn test_guard_clause_removed_for_other_context() {
        let fixture = Fixture::new();
        let text = fixture.compile_function(guarded_body(&fixture), CompileContext::Client);
        assert!(text.contains("local function body()\n\trest()\nend\n"), "{}", text);
    }

    #[test]
    fn test_guard_clause_kept_at_runtime_for_shared() {
        let fixture = Fixture::new();
        let text = fixture.compile_function(guarded_body(&fixture), CompileContext::Shared);
        assert!(text.contains(
            "\tif game:GetService(\"RunService\"):IsServer() then\n\t\treturn\n\tend\n\trest()\n"
        ), "{}", text);
    }

    #[test]
    fn test_compound_condition_selects_exact_branch() {
        let fixture = Fixture::new();
        let statement = if_stmt(
            and(fixture.global("$SERVER"), not(fixture.global("$CLIENT"))),
            block(vec![fixture.expr_stmt(call(ident("a"), vec![]))]),
            Some(block(vec![fixture.expr_stmt(call(ident("b"), vec![]))])),
        );
        let server = fixture.compile_stmts(vec![statement.clone()], CompileContext::Server).text();
        assert!(server.ends_with("Flamework\na()\n"), "{}", server);
        let client = fixture.compile_stmts(vec![statement.clone()], CompileContext::Client).text();
        assert!(client.ends_with("Flamework\nb()\n"), "{}", client);
        let shared = fixture.compile_stmts(vec![statement], CompileContext::Shared).text();
        assert!(shared.contains("if game:GetService(\"RunService\"):IsServer() and not game:GetService(\"RunService\"):IsClient() then\n\ta()\nelse\n\tb()\nend\n"), "{}", shared);
    }

    #[test]
    fn test_residual_check_is_kept() {
        let fixture = Fixture::new();
        let statement = if_stmt(
            and(fixture.global("$CLIENT"), ident("ready")),
            ret(),
            None,
        );
        let body = vec![statement, fixture.expr_stmt(call(ident("rest"), vec![]))];
        let text = fixture.compile_function(body, CompileContext::Client);
        assert!(text.contains("\tif ready then\n\t\treturn\n\tend\n\trest()\n"), "{}", text);
    }

    #[test]
    fn test_contradiction_warns_and_takes_else() {
        let fixture = Fixture::new();
        let statement = if_stmt(
            and(fixture.global("$SERVER"), fixture.global("$CLIENT")),
            block(vec![fixture.expr_stmt(call(ident("a"), vec![]))]),
            None,
        );
        for context in [CompileContext::Server, CompileContext::Client] {
            let output = fixture.compile_stmts(vec![statement.clone()], context);
            assert!(output.diagnostics.iter().any(|d| d.code == "W-DIRECTIVE-001"));
            assert!(!output.has_errors());
            assert!(!output.text().contains("a()"));
        }
        let shared = fixture.compile_stmts(vec![statement], CompileContext::Shared);
        assert!(shared.diagnostics.iter().any(|d| d.code == "W-DIRECTIVE-001"));
        assert!(shared.text().contains("a()"));
    }

    #[test]
    fn test_non_leading_exit_is_scoped() {
        let fixture = Fixture::new();
        let body = vec![
            fixture.expr_stmt(call(ident("first"), vec![])),
            if_stmt(fixture.global("$SERVER"), ret(), None),
            fixture.expr_stmt(call(ident("rest"), vec![])),
        ];
        let text = fixture.compile_function(body, CompileContext::Server);
        assert!(text.contains("\tfirst()\n\tdo\n\t\treturn\n\tend\n\trest()\n"), "{}", text);
    }
}
