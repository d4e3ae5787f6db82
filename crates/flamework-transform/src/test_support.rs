//! Builders shared by the unit tests

use std::cell::{Ref, RefCell};
use std::path::PathBuf;

use flamework_ast::{
    Block, CallExpr, ClassDecl, Decorator, EnumMember, EnumValue, Expr, ExprKind, FunctionDecl,
    Ident, Literal, LogicalOp, NewExpr, SourceFile, Span, Stmt, StmtKind, SymbolId, TypeRef,
    UnaryOp,
};
use flamework_build::BuildState;
use flamework_symbols::{DeclarationKind, ProjectPaths, SemanticFrontend, StaticFrontend};

use crate::macros::WELL_KNOWN;
use crate::{
    transform_file, CompileContext, FileOutput, MacroRegistry, TransformOptions,
    TransformServices, TransformState,
};

pub fn ident(name: &str) -> Expr {
    Expr::synthetic(ExprKind::Ident(Ident::new(name)))
}

pub fn num(value: f64) -> Expr {
    Expr::synthetic(ExprKind::Literal(Literal::Number(value)))
}

pub fn string(value: &str) -> Expr {
    Expr::synthetic(ExprKind::Literal(Literal::String(value.into())))
}

pub fn not(operand: Expr) -> Expr {
    Expr::synthetic(ExprKind::Unary {
        op: UnaryOp::Not,
        operand: Box::new(operand),
    })
}

fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::synthetic(ExprKind::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn and(left: Expr, right: Expr) -> Expr {
    logical(LogicalOp::And, left, right)
}

pub fn nullish(left: Expr, right: Expr) -> Expr {
    logical(LogicalOp::Nullish, left, right)
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    call_with_types(callee, Vec::new(), args)
}

pub fn call0(callee: Expr) -> Expr {
    call(callee, Vec::new())
}

pub fn call_with_types(callee: Expr, type_args: Vec<TypeRef>, args: Vec<Expr>) -> Expr {
    Expr::synthetic(ExprKind::Call(CallExpr {
        callee: Box::new(callee),
        type_args,
        inferred_type_args: Vec::new(),
        args,
    }))
}

pub fn new_expr(class: Expr, args: Vec<Expr>) -> Expr {
    Expr::synthetic(ExprKind::New(NewExpr {
        class: Box::new(class),
        type_args: Vec::new(),
        args,
    }))
}

fn property(object: Expr, name: &str, optional: bool) -> Expr {
    Expr::synthetic(ExprKind::Property {
        object: Box::new(object),
        name: name.into(),
        symbol: None,
        optional,
    })
}

pub fn member(object: Expr, name: &str) -> Expr {
    property(object, name, false)
}

pub fn optional_member(object: Expr, name: &str) -> Expr {
    property(object, name, true)
}

pub fn assign(target: Expr, value: Expr) -> Expr {
    Expr::synthetic(ExprKind::Assign {
        target: Box::new(target),
        value: Box::new(value),
    })
}

pub fn ret() -> Stmt {
    Stmt::synthetic(StmtKind::Return(None))
}

pub fn block(statements: Vec<Stmt>) -> Stmt {
    Stmt::synthetic(StmtKind::Block(Block::new(statements)))
}

pub fn if_stmt(condition: Expr, then_branch: Stmt, else_branch: Option<Stmt>) -> Stmt {
    Stmt::synthetic(StmtKind::If {
        condition,
        then_branch: Box::new(then_branch),
        else_branch: else_branch.map(Box::new),
    })
}

/// A frontend with every well-known declaration, `src` → `out` paths and
/// an in-memory build state
pub struct Fixture {
    pub frontend: StaticFrontend,
    paths: ProjectPaths,
    options: TransformOptions,
    build: RefCell<BuildState>,
}

impl Fixture {
    pub fn new() -> Self {
        let mut frontend = StaticFrontend::new();
        for known in WELL_KNOWN {
            frontend.declare(known.name, DeclarationKind::Function);
        }
        Self {
            frontend,
            paths: ProjectPaths::new("src", "out"),
            options: TransformOptions::default(),
            build: RefCell::new(BuildState::new("game")),
        }
    }

    pub fn registry(&self) -> MacroRegistry {
        MacroRegistry::new(&self.frontend).expect("well-known declarations")
    }

    pub fn build(&self) -> Ref<'_, BuildState> {
        self.build.borrow()
    }

    /// Reference to a declared global; dotted names become property access
    pub fn global(&self, name: &str) -> Expr {
        let symbol = self.frontend.resolve_global_name(name);
        match name.rsplit_once('.') {
            Some((object, member)) => Expr::synthetic(ExprKind::Property {
                object: Box::new(self.global(object)),
                name: member.into(),
                symbol,
                optional: false,
            }),
            None => Expr::synthetic(ExprKind::Ident(Ident {
                name: name.into(),
                symbol,
            })),
        }
    }

    pub fn decorator(&self, name: &str, args: Vec<Expr>) -> Decorator {
        Decorator {
            expr: call(self.global(name), args),
            span: Span::dummy(),
        }
    }

    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        Stmt::synthetic(StmtKind::Expr(expr))
    }

    pub fn declare_class(&mut self, path: &str, name: &str) -> SymbolId {
        self.frontend
            .declare_in(name, DeclarationKind::Class, Some(PathBuf::from(path)))
    }

    pub fn class(&mut self, path: &str, name: &str) -> ClassDecl {
        let symbol = self.declare_class(path, name);
        ClassDecl::new(name, symbol)
    }

    pub fn declare_union(&mut self, path: &str, name: &str, values: &[&str]) -> TypeRef {
        let symbol =
            self.frontend
                .declare_in(name, DeclarationKind::TypeAlias, Some(PathBuf::from(path)));
        TypeRef::Alias {
            symbol,
            name: name.into(),
            target: Box::new(TypeRef::Union(
                values
                    .iter()
                    .map(|v| TypeRef::Literal(Literal::String(v.to_string())))
                    .collect(),
            )),
        }
    }

    pub fn declare_enum(
        &mut self,
        path: &str,
        name: &str,
        members: &[(&str, f64)],
    ) -> (SymbolId, TypeRef) {
        let symbol = self
            .frontend
            .declare_in(name, DeclarationKind::Enum, Some(PathBuf::from(path)));
        self.frontend.add_enum(
            symbol,
            members
                .iter()
                .map(|(name, value)| EnumMember {
                    name: name.to_string(),
                    value: EnumValue::Number(*value),
                })
                .collect(),
        );
        let ty = TypeRef::Enum {
            symbol,
            name: name.into(),
        };
        (symbol, ty)
    }

    pub fn with_state<T>(
        &self,
        context: CompileContext,
        f: impl FnOnce(&mut TransformState<'_>) -> T,
    ) -> T {
        let registry = self.registry();
        let services = TransformServices {
            frontend: &self.frontend,
            paths: &self.paths,
            macros: &registry,
            options: &self.options,
        };
        let file = SourceFile::new("src/test.ts", Vec::new());
        let mut build = self.build.borrow_mut();
        let mut state = TransformState::new(services, &mut build, &file, context);
        f(&mut state)
    }

    pub fn compile_file(&self, file: &SourceFile, context: CompileContext) -> FileOutput {
        let registry = self.registry();
        let services = TransformServices {
            frontend: &self.frontend,
            paths: &self.paths,
            macros: &registry,
            options: &self.options,
        };
        let mut build = self.build.borrow_mut();
        transform_file(services, &mut build, file, context)
    }

    pub fn compile_stmts(&self, statements: Vec<Stmt>, context: CompileContext) -> FileOutput {
        self.compile_file(&SourceFile::new("src/test.ts", statements), context)
    }

    /// Last emitted line for a single expression statement
    pub fn compile_expr(&self, expr: Expr, context: CompileContext) -> String {
        let text = self.compile_stmts(vec![self.expr_stmt(expr)], context).text();
        text.lines().last().unwrap_or_default().to_string()
    }

    /// Emitted text for a file holding `function body() { ... }`
    pub fn compile_function(&self, statements: Vec<Stmt>, context: CompileContext) -> String {
        let function = FunctionDecl {
            name: Ident::new("body"),
            params: Vec::new(),
            body: Block::new(statements),
            exported: false,
            span: Span::dummy(),
        };
        self.compile_stmts(vec![Stmt::synthetic(StmtKind::Function(function))], context)
            .text()
    }

    pub fn compile_class(&self, path: &str, class: ClassDecl, context: CompileContext) -> FileOutput {
        let file = SourceFile::new(path, vec![Stmt::synthetic(StmtKind::Class(class))]);
        self.compile_file(&file, context)
    }
}
