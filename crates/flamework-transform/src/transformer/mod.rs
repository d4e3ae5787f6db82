//! Lowering of typed source files to the Lua target AST
//!
//! - [`expr`]: expressions, hoisting and evaluation order
//! - [`stmt`]: statements and directive-gated branches
//! - [`class`]: classes, constructors and decorator macros

mod class;
mod expr;
mod stmt;

use std::collections::BTreeSet;

use flamework_ast::lua::{LuaExpr, LuaStmt, TableField};
use flamework_ast::{BindingPattern, SourceFile, StmtKind};

use crate::TransformState;

pub use expr::{ensure_transform_order, lua_name, transform_expression};
pub use stmt::{transform_block, transform_statement};

/// Package the runtime libraries are imported from
const RUNTIME_PACKAGE: &str = "@flamework/core";

/// Lower a whole file: runtime header, body, then the export table
pub fn transform_source_file(state: &mut TransformState<'_>) -> Vec<LuaStmt> {
    let file = state.file;
    let mut body = transform_block(state, &file.statements);

    let exports = exported_names(file);
    if !exports.is_empty() && !matches!(body.last(), Some(LuaStmt::Return(_))) {
        body.push(LuaStmt::Return(vec![LuaExpr::Table(
            exports
                .into_iter()
                .map(|name| {
                    let local = lua_name(&name);
                    TableField::Named(name, LuaExpr::Ident(local))
                })
                .collect(),
        )]));
    }

    let mut out = runtime_header(state, file);
    out.extend(body);
    out
}

/// `local TS = _G[script]` plus one local per runtime library the body
/// referenced and the file does not import itself
fn runtime_header(state: &TransformState<'_>, file: &SourceFile) -> Vec<LuaStmt> {
    let libraries: Vec<&str> = state.runtime_libraries().copied().collect();
    if libraries.is_empty() {
        return Vec::new();
    }

    let imported = imported_locals(state, file);
    let mut header = vec![LuaStmt::Local {
        names: vec!["TS".into()],
        values: vec![LuaExpr::Index {
            object: Box::new(LuaExpr::ident("_G")),
            key: Box::new(LuaExpr::ident("script")),
        }],
    }];
    for library in libraries {
        if library == "TS" || imported.contains(library) {
            continue;
        }
        let module = LuaExpr::call(
            LuaExpr::property(LuaExpr::ident("TS"), "import"),
            vec![LuaExpr::ident("script"), LuaExpr::string(RUNTIME_PACKAGE)],
        );
        header.push(LuaStmt::Local {
            names: vec![library.to_string()],
            values: vec![LuaExpr::property(module, library)],
        });
    }
    header
}

fn imported_locals(state: &TransformState<'_>, file: &SourceFile) -> BTreeSet<String> {
    let registry = state.macros;
    file.statements
        .iter()
        .filter_map(|stmt| match &stmt.kind {
            StmtKind::Import(import) => Some(import),
            _ => None,
        })
        .flat_map(|import| import.specifiers.iter())
        .filter(|spec| !spec.local.symbol.is_some_and(|s| registry.is_macro_only(s)))
        .map(|spec| lua_name(&spec.local.name))
        .collect()
}

fn exported_names(file: &SourceFile) -> Vec<String> {
    let mut names = Vec::new();
    for stmt in &file.statements {
        match &stmt.kind {
            StmtKind::Variable(decl) if decl.exported => match &decl.binding {
                BindingPattern::Ident(ident) => names.push(ident.name.clone()),
                BindingPattern::Object(bindings) => {
                    names.extend(bindings.iter().map(|b| b.local.name.clone()))
                }
                BindingPattern::Array(elements) => {
                    names.extend(elements.iter().flatten().map(|i| i.name.clone()))
                }
            },
            StmtKind::Function(function) if function.exported => {
                names.push(function.name.name.clone())
            }
            StmtKind::Class(class) if class.exported => {
                if let Some(name) = class.name_str() {
                    names.push(name.to_string());
                }
            }
            StmtKind::Enum(decl) if decl.exported => names.push(decl.name.name.clone()),
            _ => {}
        }
    }
    names
}
