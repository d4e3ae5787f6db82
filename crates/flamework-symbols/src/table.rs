//! In-memory frontend backed by a symbol table

use flamework_ast::{ClassDecl, EnumMember, SourceFile, StmtKind, SymbolId, TypeRef};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{DeclarationInfo, DeclarationKind, FrontendError, Result, SemanticFrontend};

/// A frontend whose program is supplied programmatically.
///
/// Embedders that already hold typed trees (and the test suites) feed
/// files and declarations in directly; the table answers every query the
/// compiler makes from that data.
#[derive(Debug, Default)]
pub struct StaticFrontend {
    /// All declarations indexed by numeric ID
    declarations: Vec<DeclarationInfo>,

    /// Qualified name to ID mapping for lookup
    by_name: HashMap<String, SymbolId>,

    classes: HashMap<SymbolId, ClassDecl>,
    parents: HashMap<SymbolId, SymbolId>,
    enums: HashMap<SymbolId, Vec<EnumMember>>,
    generators: HashSet<SymbolId>,

    files: BTreeMap<PathBuf, SourceFile>,
    /// file -> files it imports
    imports: HashMap<PathBuf, BTreeSet<PathBuf>>,
    changed: BTreeSet<PathBuf>,
}

impl StaticFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a symbol, returning the existing id if the name is known
    pub fn declare(&mut self, name: impl Into<String>, kind: DeclarationKind) -> SymbolId {
        self.declare_in(name, kind, None)
    }

    /// Declare a symbol owned by a source file
    pub fn declare_in(
        &mut self,
        name: impl Into<String>,
        kind: DeclarationKind,
        file: Option<PathBuf>,
    ) -> SymbolId {
        let name = name.into();
        if let Some(id) = self.by_name.get(&name) {
            return *id;
        }
        let id = SymbolId(self.declarations.len() as u32);
        self.by_name.insert(name.clone(), id);
        self.declarations.push(DeclarationInfo {
            name,
            kind,
            file,
            type_defaults: Vec::new(),
        });
        id
    }

    /// Record the defaults of a generic declaration's type parameters
    pub fn set_type_defaults(&mut self, symbol: SymbolId, defaults: Vec<Option<TypeRef>>) {
        if let Some(info) = self.declarations.get_mut(symbol.0 as usize) {
            info.type_defaults = defaults;
        }
    }

    pub fn set_parent(&mut self, class: SymbolId, parent: SymbolId) {
        self.parents.insert(class, parent);
    }

    /// Register a class that is not part of any compiled file
    pub fn add_class(&mut self, class: ClassDecl) {
        if let Some(symbol) = class.symbol {
            if let Some(parent) = class.extends.as_ref().and_then(|e| e.symbol()) {
                self.parents.insert(symbol, parent);
            }
            self.classes.insert(symbol, class);
        }
    }

    pub fn add_enum(&mut self, symbol: SymbolId, members: Vec<EnumMember>) {
        self.enums.insert(symbol, members);
    }

    pub fn mark_generator(&mut self, symbol: SymbolId) {
        self.generators.insert(symbol);
    }

    /// Add or replace a source file, indexing its classes, enums and imports
    pub fn add_file(&mut self, file: SourceFile) {
        let mut imports = BTreeSet::new();
        for stmt in &file.statements {
            match &stmt.kind {
                StmtKind::Class(class) => self.add_class(class.clone()),
                StmtKind::Enum(decl) => {
                    if let Some(symbol) = decl.name.symbol {
                        self.enums.insert(symbol, decl.members.clone());
                    }
                }
                StmtKind::Import(import) => {
                    if let Some(resolved) = &import.resolved_path {
                        imports.insert(resolved.clone());
                    }
                }
                _ => {}
            }
        }
        self.imports.insert(file.path.clone(), imports);
        self.changed.insert(file.path.clone());
        self.files.insert(file.path.clone(), file);
    }

    pub fn remove_file(&mut self, path: &Path) -> Result<SourceFile> {
        self.imports.remove(path);
        self.changed.insert(path.to_path_buf());
        self.files
            .remove(path)
            .ok_or_else(|| FrontendError::UnknownFile(path.to_path_buf()))
    }
}

impl SemanticFrontend for StaticFrontend {
    fn update_program(&mut self, roots: &[PathBuf]) -> Result<()> {
        debug!(roots = roots.len(), files = self.files.len(), "program updated");
        Ok(())
    }

    fn source_files(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }

    fn source_file(&self, path: &Path) -> Option<&SourceFile> {
        self.files.get(path)
    }

    fn resolve_global_name(&self, name: &str) -> Option<SymbolId> {
        self.by_name.get(name).copied()
    }

    fn declaration(&self, symbol: SymbolId) -> Option<&DeclarationInfo> {
        self.declarations.get(symbol.0 as usize)
    }

    fn class_decl(&self, symbol: SymbolId) -> Option<&ClassDecl> {
        self.classes.get(&symbol)
    }

    fn ancestors_of_class(&self, symbol: SymbolId) -> Vec<SymbolId> {
        let mut ancestors = Vec::new();
        let mut current = symbol;
        while let Some(parent) = self.parents.get(&current) {
            // Malformed heritage cycles end the walk
            if *parent == symbol || ancestors.contains(parent) {
                break;
            }
            ancestors.push(*parent);
            current = *parent;
        }
        ancestors
    }

    fn enum_members(&self, symbol: SymbolId) -> Option<&[EnumMember]> {
        self.enums.get(&symbol).map(Vec::as_slice)
    }

    fn is_generator(&self, symbol: SymbolId) -> bool {
        self.generators.contains(&symbol)
    }

    fn changed_files_since_last_build(&self) -> Vec<PathBuf> {
        self.changed.iter().cloned().collect()
    }

    fn dependents_of(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let targets: HashSet<&Path> = paths.iter().map(PathBuf::as_path).collect();
        let mut found: BTreeSet<PathBuf> = BTreeSet::new();
        let mut queue: VecDeque<PathBuf> = paths.iter().cloned().collect();

        while let Some(target) = queue.pop_front() {
            for (file, imports) in &self.imports {
                if imports.contains(&target) && !targets.contains(file.as_path()) && found.insert(file.clone()) {
                    queue.push_back(file.clone());
                }
            }
        }

        found.into_iter().collect()
    }

    fn mark_built(&mut self) {
        self.changed.clear();
    }
}
