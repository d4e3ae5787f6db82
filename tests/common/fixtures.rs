use std::path::{Path, PathBuf};

use flamework::ast::{
    Block, CallExpr, ClassDecl, ClassMember, Decorator, Expr, ExprKind, FunctionDecl, Ident,
    Literal, PropertyDecl, SourceFile, Span, Stmt, StmtKind, TypeRef,
};
use flamework::compiler::{CompilerOptions, Session};
use flamework::symbols::{DeclarationKind, SemanticFrontend, StaticFrontend};
use flamework::transform::macros::WELL_KNOWN;
use flamework::transform::CompileContext;
use tempfile::TempDir;

/// A project laid out in a temporary directory: `src/`, `out/` and the
/// persisted build documents at the root
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn source(&self, relative: &str) -> PathBuf {
        self.root().join("src").join(relative)
    }

    pub fn output(&self, relative: &str) -> PathBuf {
        self.root().join("out").join(relative)
    }

    pub fn options(&self) -> CompilerOptions {
        let mut options = CompilerOptions::new(self.root().join("src"), self.root().join("out"))
            .with_context_rule("server", CompileContext::Server)
            .with_context_rule("client", CompileContext::Client);
        options.build_info_path = self.root().join("flamework.build");
        options.editor_info_path = self.root().join("flamework-editor.json");
        options
    }

    pub fn session(&self, frontend: StaticFrontend) -> Session<StaticFrontend> {
        Session::new(self.options(), frontend).expect("start session")
    }
}

/// A frontend that knows every runtime declaration
pub fn make_frontend() -> StaticFrontend {
    let mut frontend = StaticFrontend::new();
    for known in WELL_KNOWN {
        frontend.declare(known.name, DeclarationKind::Function);
    }
    frontend
}

pub fn make_ident(name: &str) -> Expr {
    Expr::synthetic(ExprKind::Ident(Ident::new(name)))
}

/// Identifier resolved against the frontend's globals
pub fn make_global(frontend: &StaticFrontend, name: &str) -> Expr {
    Expr::synthetic(ExprKind::Ident(Ident {
        name: name.into(),
        symbol: frontend.resolve_global_name(name),
    }))
}

pub fn make_call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::synthetic(ExprKind::Call(CallExpr {
        callee: Box::new(callee),
        type_args: Vec::new(),
        inferred_type_args: Vec::new(),
        args,
    }))
}

pub fn make_number(value: f64) -> Expr {
    Expr::synthetic(ExprKind::Literal(Literal::Number(value)))
}

pub fn make_expr_stmt(expr: Expr) -> Stmt {
    Stmt::synthetic(StmtKind::Expr(expr))
}

/// `export class Name` decorated with `@Component()`, declared in `path`
pub fn make_component(
    frontend: &mut StaticFrontend,
    path: &Path,
    name: &str,
    properties: Vec<PropertyDecl>,
) -> ClassDecl {
    let symbol = frontend.declare_in(name, DeclarationKind::Class, Some(path.to_path_buf()));
    let mut class = ClassDecl::new(name, symbol);
    class.decorators.push(Decorator {
        expr: make_call(make_global(frontend, "Component"), Vec::new()),
        span: Span::dummy(),
    });
    class.members = properties.into_iter().map(ClassMember::Property).collect();
    class
}

/// `speed = 5` with the type left to inference
pub fn make_speed() -> PropertyDecl {
    let mut speed = PropertyDecl::new("speed", TypeRef::Number);
    speed.ty = None;
    speed.initializer = Some(make_number(5.0));
    speed
}

pub fn make_class_file(path: &Path, classes: Vec<ClassDecl>) -> SourceFile {
    let statements = classes
        .into_iter()
        .map(|class| Stmt::synthetic(StmtKind::Class(class)))
        .collect();
    SourceFile::new(path, statements)
}

/// `function body() { if ($SERVER) return; rest(); }`
pub fn make_guarded_file(frontend: &StaticFrontend, path: &Path) -> SourceFile {
    let guard = Stmt::synthetic(StmtKind::If {
        condition: make_global(frontend, "$SERVER"),
        then_branch: Box::new(Stmt::synthetic(StmtKind::Return(None))),
        else_branch: None,
    });
    let rest = make_expr_stmt(make_call(make_ident("rest"), Vec::new()));
    let function = FunctionDecl {
        name: Ident::new("body"),
        params: Vec::new(),
        body: Block::new(vec![guard, rest]),
        exported: false,
        span: Span::dummy(),
    };
    SourceFile::new(path, vec![Stmt::synthetic(StmtKind::Function(function))])
}

/// A file with one plain call statement
pub fn make_plain_file(path: &Path, callee: &str) -> SourceFile {
    SourceFile::new(
        path,
        vec![make_expr_stmt(make_call(make_ident(callee), Vec::new()))],
    )
}
