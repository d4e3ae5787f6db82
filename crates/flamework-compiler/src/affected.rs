//! Which files a cycle has to compile

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use flamework_symbols::SemanticFrontend;

use crate::options::{normalize, CompilerOptions};

/// Directories holding a pre-compiled marker, found once per session
#[derive(Debug, Clone, Default)]
pub struct PrecompiledDirs {
    dirs: Vec<PathBuf>,
}

impl PrecompiledDirs {
    pub fn scan(options: &CompilerOptions) -> Self {
        let dirs: Vec<PathBuf> = WalkDir::new(&options.root_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() == options.precompiled_marker.as_str())
            .filter_map(|e| e.path().parent().map(normalize))
            .collect();
        debug!(dirs = dirs.len(), "scanned for pre-compiled directories");
        Self { dirs }
    }

    pub fn contains(&self, path: &Path) -> bool {
        let path = normalize(path);
        self.dirs.iter().any(|dir| path.starts_with(dir))
    }
}

/// Every eligible file of the program
pub fn initial_files(
    options: &CompilerOptions,
    precompiled: &PrecompiledDirs,
    frontend: &dyn SemanticFrontend,
) -> Vec<PathBuf> {
    let files: BTreeSet<PathBuf> = frontend
        .source_files()
        .into_iter()
        .filter(|p| options.is_compilable(p) && !precompiled.contains(p))
        .collect();
    files.into_iter().collect()
}

/// Changed files, expanded directories and their dependents
pub fn incremental_files(
    options: &CompilerOptions,
    precompiled: &PrecompiledDirs,
    frontend: &dyn SemanticFrontend,
    changed: &[PathBuf],
) -> Vec<PathBuf> {
    let mut files = BTreeSet::new();
    for path in changed {
        if path.is_dir() {
            files.extend(compilable_descendants(options, path));
        } else if options.is_compilable(path) {
            files.insert(path.clone());
        }
    }
    files.retain(|p| !precompiled.contains(p));

    let roots: Vec<PathBuf> = files.iter().cloned().collect();
    for dependent in frontend.dependents_of(&roots) {
        if options.is_compilable(&dependent) && !precompiled.contains(&dependent) {
            files.insert(dependent);
        }
    }
    files.into_iter().collect()
}

fn compilable_descendants(options: &CompilerOptions, dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && options.is_compilable(e.path()))
        .map(|e| e.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DEFAULT_PRECOMPILED_MARKER;
    use flamework_ast::{ImportDecl, ImportSpecifier, Ident, SourceFile, Span, Stmt, StmtKind};
    use flamework_symbols::StaticFrontend;
    use std::fs;
    use tempfile::tempdir;

    fn make_import(from: &Path) -> Stmt {
        Stmt::synthetic(StmtKind::Import(ImportDecl {
            specifiers: vec![ImportSpecifier {
                imported: "Door".into(),
                local: Ident::new("Door"),
            }],
            module: "./door".into(),
            resolved_path: Some(from.to_path_buf()),
            span: Span::dummy(),
        }))
    }

    #[test]
    fn test_initial_skips_precompiled_directories() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("src");
        fs::create_dir_all(root.join("vendor")).unwrap();
        fs::write(root.join("vendor").join(DEFAULT_PRECOMPILED_MARKER), "").unwrap();

        let options = CompilerOptions::new(&root, dir.path().join("out"));
        let mut frontend = StaticFrontend::new();
        frontend.add_file(SourceFile::new(root.join("door.ts"), vec![]));
        frontend.add_file(SourceFile::new(root.join("vendor/lib.ts"), vec![]));
        frontend.add_file(SourceFile::new(root.join("types.d.ts"), vec![]));

        let precompiled = PrecompiledDirs::scan(&options);
        assert!(precompiled.contains(&root.join("vendor/lib.ts")));
        assert_eq!(initial_files(&options, &precompiled, &frontend), vec![root.join("door.ts")]);
    }

    #[test]
    fn test_incremental_expands_directories_and_dependents() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("src");
        fs::create_dir_all(root.join("ui")).unwrap();
        fs::write(root.join("ui/hud.ts"), "").unwrap();
        fs::write(root.join("ui/notes.md"), "").unwrap();

        let options = CompilerOptions::new(&root, dir.path().join("out"));
        let door = root.join("door.ts");
        let mut frontend = StaticFrontend::new();
        frontend.add_file(SourceFile::new(door.clone(), vec![]));
        frontend.add_file(SourceFile::new(root.join("house.ts"), vec![make_import(&door)]));

        let precompiled = PrecompiledDirs::default();
        let files = incremental_files(&options, &precompiled, &frontend, &[root.join("ui"), door.clone()]);
        assert_eq!(files, vec![door, root.join("house.ts"), root.join("ui/hud.ts")]);
    }
}
