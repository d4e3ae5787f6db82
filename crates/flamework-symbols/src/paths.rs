//! Source, output and import path translation

use std::path::{Component, Path, PathBuf};

/// Deterministic mapping between source files and emitted files.
///
/// Implementations must be pure and sufficiently invertible:
/// `output_to_possible_sources(source_to_output(p))` contains `p`.
pub trait PathTranslator {
    fn source_to_output(&self, path: &Path) -> PathBuf;

    fn output_to_possible_sources(&self, path: &Path) -> Vec<PathBuf>;

    /// Module specifier other files use to import `path`
    fn source_to_import_specifier(&self, path: &Path) -> String;
}

const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx"];
const OUTPUT_EXTENSION: &str = "lua";
const INDEX_STEM: &str = "index";
const INIT_STEM: &str = "init";

/// The standard `rootDir` → `outDir` translator.
///
/// `src/foo/bar.ts` becomes `out/foo/bar.lua`; `index.ts` becomes
/// `init.lua` so directories act as modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub root_dir: PathBuf,
    pub out_dir: PathBuf,
}

impl ProjectPaths {
    pub fn new(root_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            out_dir: out_dir.into(),
        }
    }

    fn relative_to<'a>(path: &'a Path, base: &Path) -> &'a Path {
        path.strip_prefix(base).unwrap_or(path)
    }

    /// `foo/bar.server.ts` → (`foo`, `bar.server`)
    fn split_stem(relative: &Path) -> (PathBuf, String) {
        let parent = relative.parent().map(Path::to_path_buf).unwrap_or_default();
        let stem = relative
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        (parent, stem)
    }
}

impl PathTranslator for ProjectPaths {
    fn source_to_output(&self, path: &Path) -> PathBuf {
        let relative = Self::relative_to(path, &self.root_dir);
        let (parent, stem) = Self::split_stem(relative);
        let stem = if stem == INDEX_STEM { INIT_STEM.to_string() } else { stem };
        self.out_dir
            .join(parent)
            .join(format!("{}.{}", stem, OUTPUT_EXTENSION))
    }

    fn output_to_possible_sources(&self, path: &Path) -> Vec<PathBuf> {
        let relative = Self::relative_to(path, &self.out_dir);
        let (parent, stem) = Self::split_stem(relative);
        let mut stems = vec![stem.clone()];
        if stem == INIT_STEM {
            stems.insert(0, INDEX_STEM.to_string());
        }
        let mut sources = Vec::new();
        for stem in &stems {
            for ext in SOURCE_EXTENSIONS {
                sources.push(self.root_dir.join(&parent).join(format!("{}.{}", stem, ext)));
            }
        }
        sources
    }

    fn source_to_import_specifier(&self, path: &Path) -> String {
        let relative = Self::relative_to(path, &self.root_dir);
        let (parent, stem) = Self::split_stem(relative);
        let mut parts: Vec<String> = parent
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => part.to_str().map(str::to_string),
                _ => None,
            })
            .collect();
        if stem != INDEX_STEM || parts.is_empty() {
            parts.push(stem);
        }
        parts.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths() -> ProjectPaths {
        ProjectPaths::new("src", "out")
    }

    #[test]
    fn test_source_to_output() {
        let p = paths();
        assert_eq!(
            p.source_to_output(Path::new("src/server/game.ts")),
            PathBuf::from("out/server/game.lua")
        );
        assert_eq!(
            p.source_to_output(Path::new("src/shared/index.ts")),
            PathBuf::from("out/shared/init.lua")
        );
    }

    #[test]
    fn test_output_round_trips_to_source() {
        let p = paths();
        for source in ["src/server/game.ts", "src/shared/index.tsx", "src/a.server.ts"] {
            let output = p.source_to_output(Path::new(source));
            let candidates = p.output_to_possible_sources(&output);
            assert!(
                candidates.contains(&PathBuf::from(source)),
                "{} not in {:?}",
                source,
                candidates
            );
        }
    }

    #[test]
    fn test_import_specifier() {
        let p = paths();
        assert_eq!(
            p.source_to_import_specifier(Path::new("src/shared/components/door.ts")),
            "shared/components/door"
        );
        assert_eq!(p.source_to_import_specifier(Path::new("src/shared/index.ts")), "shared");
    }
}
