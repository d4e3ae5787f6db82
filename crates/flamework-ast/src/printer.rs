//! Canonical text printer for the Lua target AST
//!
//! Serializes target nodes to Luau source. Uses tab indentation, one
//! statement per line, and parenthesizes binary operands by precedence.
//! Output is a pure function of the tree, so identical trees print to
//! byte-identical text.

use crate::format_number;
use crate::lua::{is_valid_identifier, LuaBinaryOp, LuaExpr, LuaStmt, LuaUnaryOp, TableField};

/// Trait for converting target nodes to Luau text.
pub trait ToLua {
    /// Convert to Luau text with the given indentation level.
    fn to_lua(&self, indent: usize) -> String;
}

/// Helper to generate indentation string (one tab per level).
fn indent_str(level: usize) -> String {
    "\t".repeat(level)
}

/// Escape a string for output (double quotes, newlines, etc.)
fn escape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 2);
    result.push('"');
    for c in s.chars() {
        match c {
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            _ => result.push(c),
        }
    }
    result.push('"');
    result
}

fn binary_precedence(op: LuaBinaryOp) -> u8 {
    match op {
        LuaBinaryOp::Or => 1,
        LuaBinaryOp::And => 2,
        LuaBinaryOp::Eq
        | LuaBinaryOp::Ne
        | LuaBinaryOp::Lt
        | LuaBinaryOp::Le
        | LuaBinaryOp::Gt
        | LuaBinaryOp::Ge => 3,
        LuaBinaryOp::Concat => 4,
        LuaBinaryOp::Add | LuaBinaryOp::Sub => 5,
        LuaBinaryOp::Mul | LuaBinaryOp::Div | LuaBinaryOp::Mod => 6,
    }
}

const UNARY_PRECEDENCE: u8 = 7;

fn binary_symbol(op: LuaBinaryOp) -> &'static str {
    match op {
        LuaBinaryOp::Add => "+",
        LuaBinaryOp::Sub => "-",
        LuaBinaryOp::Mul => "*",
        LuaBinaryOp::Div => "/",
        LuaBinaryOp::Mod => "%",
        LuaBinaryOp::Concat => "..",
        LuaBinaryOp::Eq => "==",
        LuaBinaryOp::Ne => "~=",
        LuaBinaryOp::Lt => "<",
        LuaBinaryOp::Le => "<=",
        LuaBinaryOp::Gt => ">",
        LuaBinaryOp::Ge => ">=",
        LuaBinaryOp::And => "and",
        LuaBinaryOp::Or => "or",
    }
}

fn expr_precedence(expr: &LuaExpr) -> u8 {
    match expr {
        LuaExpr::Binary { op, .. } => binary_precedence(*op),
        LuaExpr::Unary { .. } => UNARY_PRECEDENCE,
        _ => u8::MAX,
    }
}

/// Print `expr` wrapped in parentheses when its precedence is below `min`
fn operand(expr: &LuaExpr, min: u8) -> String {
    let text = expr.to_lua(0);
    if expr_precedence(expr) < min {
        format!("({})", text)
    } else {
        text
    }
}

/// Print an expression in prefix position (call target, indexed object)
fn prefix(expr: &LuaExpr) -> String {
    match expr {
        LuaExpr::Ident(_)
        | LuaExpr::Property { .. }
        | LuaExpr::Index { .. }
        | LuaExpr::Call { .. }
        | LuaExpr::MethodCall { .. }
        | LuaExpr::Paren(_) => expr.to_lua(0),
        _ => format!("({})", expr.to_lua(0)),
    }
}

fn args_list(args: &[LuaExpr]) -> String {
    args.iter()
        .map(|a| a.to_lua(0))
        .collect::<Vec<_>>()
        .join(", ")
}

fn body_lines(body: &[LuaStmt], indent: usize) -> String {
    body.iter()
        .map(|s| s.to_lua(indent))
        .collect::<Vec<_>>()
        .join("")
}

fn function_text(params: &[String], body: &[LuaStmt], indent: usize) -> String {
    format!(
        "function({})\n{}{}end",
        params.join(", "),
        body_lines(body, indent + 1),
        indent_str(indent)
    )
}

// ===== Expressions =====

impl ToLua for LuaExpr {
    fn to_lua(&self, indent: usize) -> String {
        match self {
            LuaExpr::Nil => "nil".to_string(),
            LuaExpr::Bool(b) => b.to_string(),
            LuaExpr::Number(n) => format_number(*n),
            LuaExpr::String(s) => escape_string(s),
            LuaExpr::Ident(name) => name.clone(),
            LuaExpr::Vararg => "...".to_string(),
            LuaExpr::Index { object, key } => format!("{}[{}]", prefix(object), key.to_lua(indent)),
            LuaExpr::Property { object, name } => {
                if is_valid_identifier(name) {
                    format!("{}.{}", prefix(object), name)
                } else {
                    format!("{}[{}]", prefix(object), escape_string(name))
                }
            }
            LuaExpr::Call { callee, args } => format!("{}({})", prefix(callee), args_list(args)),
            LuaExpr::MethodCall { object, name, args } => {
                format!("{}:{}({})", prefix(object), name, args_list(args))
            }
            LuaExpr::Binary { op, left, right } => {
                let prec = binary_precedence(*op);
                // Concatenation is right associative; everything else is left
                let (left_min, right_min) = if *op == LuaBinaryOp::Concat {
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                format!(
                    "{} {} {}",
                    operand(left, left_min),
                    binary_symbol(*op),
                    operand(right, right_min)
                )
            }
            LuaExpr::Unary { op, operand: inner } => {
                let text = operand(inner, UNARY_PRECEDENCE);
                match op {
                    LuaUnaryOp::Not => format!("not {}", text),
                    LuaUnaryOp::Neg if text.starts_with('-') => format!("- {}", text),
                    LuaUnaryOp::Neg => format!("-{}", text),
                    LuaUnaryOp::Len => format!("#{}", text),
                }
            }
            LuaExpr::Table(fields) => {
                if fields.is_empty() {
                    return "{}".to_string();
                }
                let inner = fields
                    .iter()
                    .map(|f| f.to_lua(indent))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{{ {} }}", inner)
            }
            LuaExpr::Function { params, body } => function_text(params, body, indent),
            LuaExpr::Paren(inner) => format!("({})", inner.to_lua(indent)),
        }
    }
}

impl ToLua for TableField {
    fn to_lua(&self, indent: usize) -> String {
        match self {
            TableField::Positional(value) => value.to_lua(indent),
            TableField::Named(name, value) => {
                if is_valid_identifier(name) {
                    format!("{} = {}", name, value.to_lua(indent))
                } else {
                    format!("[{}] = {}", escape_string(name), value.to_lua(indent))
                }
            }
            TableField::Keyed(key, value) => {
                format!("[{}] = {}", key.to_lua(indent), value.to_lua(indent))
            }
        }
    }
}

// ===== Statements =====

impl ToLua for LuaStmt {
    fn to_lua(&self, indent: usize) -> String {
        let ind = indent_str(indent);
        match self {
            LuaStmt::Local { names, values } => {
                if values.is_empty() {
                    format!("{}local {}\n", ind, names.join(", "))
                } else {
                    format!(
                        "{}local {} = {}\n",
                        ind,
                        names.join(", "),
                        values
                            .iter()
                            .map(|v| v.to_lua(indent))
                            .collect::<Vec<_>>()
                            .join(", ")
                    )
                }
            }
            LuaStmt::Assign { targets, values } => format!(
                "{}{} = {}\n",
                ind,
                targets
                    .iter()
                    .map(|t| t.to_lua(indent))
                    .collect::<Vec<_>>()
                    .join(", "),
                values
                    .iter()
                    .map(|v| v.to_lua(indent))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            LuaStmt::Call(expr) => format!("{}{}\n", ind, expr.to_lua(indent)),
            LuaStmt::Return(values) => {
                if values.is_empty() {
                    format!("{}return\n", ind)
                } else {
                    format!("{}return {}\n", ind, args_list(values))
                }
            }
            LuaStmt::If {
                condition,
                then_body,
                else_body,
            } => {
                let mut out = format!(
                    "{}if {} then\n{}",
                    ind,
                    condition.to_lua(indent),
                    body_lines(then_body, indent + 1)
                );
                let mut else_body = else_body.as_deref();
                // Fold `else if` chains into `elseif`
                while let Some(body) = else_body {
                    match body {
                        [LuaStmt::If {
                            condition,
                            then_body,
                            else_body: nested,
                        }] => {
                            out.push_str(&format!(
                                "{}elseif {} then\n{}",
                                ind,
                                condition.to_lua(indent),
                                body_lines(then_body, indent + 1)
                            ));
                            else_body = nested.as_deref();
                        }
                        _ => {
                            out.push_str(&format!("{}else\n{}", ind, body_lines(body, indent + 1)));
                            else_body = None;
                        }
                    }
                }
                out.push_str(&format!("{}end\n", ind));
                out
            }
            LuaStmt::While { condition, body } => format!(
                "{}while {} do\n{}{}end\n",
                ind,
                condition.to_lua(indent),
                body_lines(body, indent + 1),
                ind
            ),
            LuaStmt::Do(body) => format!("{}do\n{}{}end\n", ind, body_lines(body, indent + 1), ind),
            LuaStmt::Break => format!("{}break\n", ind),
            LuaStmt::Continue => format!("{}continue\n", ind),
            LuaStmt::LocalFunction { name, params, body } => format!(
                "{}local function {}({})\n{}{}end\n",
                ind,
                name,
                params.join(", "),
                body_lines(body, indent + 1),
                ind
            ),
            LuaStmt::Function { path, params, body } => format!(
                "{}function {}({})\n{}{}end\n",
                ind,
                path,
                params.join(", "),
                body_lines(body, indent + 1),
                ind
            ),
            LuaStmt::Comment(text) => format!("{}-- {}\n", ind, text),
        }
    }
}

/// Print a whole chunk with the standard compiler header
pub fn print_chunk(statements: &[LuaStmt]) -> String {
    let mut out = String::from("-- Compiled with Flamework\n");
    out.push_str(&body_lines(statements, 0));
    out
}
