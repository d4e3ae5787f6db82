//! Compiler options, loaded from JSON or built in code

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use flamework_symbols::ProjectPaths;
use flamework_transform::{CompileContext, ConfigError, TransformOptions};

use crate::Result;

/// Files named like this mark a directory as already compiled
pub const DEFAULT_PRECOMPILED_MARKER: &str = "flamework.precompiled";

/// Maps a directory (relative to `root_dir`) to the context its files
/// compile for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRule {
    pub prefix: PathBuf,
    pub context: CompileContext,
}

impl ContextRule {
    pub fn new(prefix: impl Into<PathBuf>, context: CompileContext) -> Self {
        Self {
            prefix: prefix.into(),
            context,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompilerOptions {
    pub root_dir: PathBuf,
    pub out_dir: PathBuf,
    pub build_info_path: PathBuf,
    pub editor_info_path: PathBuf,
    pub project_id: String,
    /// Longest matching prefix wins; unmatched files are Shared
    pub context_rules: Vec<ContextRule>,
    pub debounce_ms: u64,
    pub use_polling: bool,
    pub poll_interval_ms: u64,
    /// Leave output files alone when their content is unchanged
    pub skip_unchanged_writes: bool,
    pub obfuscate_ids: bool,
    pub precompiled_marker: String,
    /// Compilable source extensions, without the dot
    pub extensions: Vec<String>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("src"),
            out_dir: PathBuf::from("out"),
            build_info_path: PathBuf::from("flamework.build"),
            editor_info_path: PathBuf::from("flamework-editor.json"),
            project_id: "game".into(),
            context_rules: Vec::new(),
            debounce_ms: 100,
            use_polling: false,
            poll_interval_ms: 500,
            skip_unchanged_writes: true,
            obfuscate_ids: false,
            precompiled_marker: DEFAULT_PRECOMPILED_MARKER.into(),
            extensions: vec!["ts".into(), "tsx".into()],
        }
    }
}

impl CompilerOptions {
    pub fn new(root_dir: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            out_dir: out_dir.into(),
            ..Self::default()
        }
    }

    /// Read and validate options from a JSON document
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let options: CompilerOptions = serde_json::from_str(&text)?;
        options.validate()?;
        debug!(path = %path.display(), root = %options.root_dir.display(), "loaded compiler options");
        Ok(options)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.debounce_ms == 0 {
            return Err(invalid("debounceMs must be greater than zero"));
        }
        if normalize(&self.out_dir) == normalize(&self.root_dir) {
            return Err(invalid("outDir must differ from rootDir"));
        }
        if self.extensions.is_empty() {
            return Err(invalid("at least one source extension is required"));
        }
        Ok(())
    }

    pub fn with_context_rule(mut self, prefix: impl Into<PathBuf>, context: CompileContext) -> Self {
        self.context_rules.push(ContextRule::new(prefix, context));
        self
    }

    pub fn project_paths(&self) -> ProjectPaths {
        ProjectPaths::new(self.root_dir.clone(), self.out_dir.clone())
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            obfuscate_ids: self.obfuscate_ids,
        }
    }

    /// Context a source file compiles for
    pub fn context_for(&self, path: &Path) -> CompileContext {
        let path = normalize(path);
        let root = normalize(&self.root_dir);
        let relative = path.strip_prefix(&root).unwrap_or(&path);
        self.context_rules
            .iter()
            .filter(|rule| relative.starts_with(normalize(&rule.prefix)))
            .max_by_key(|rule| rule.prefix.components().count())
            .map(|rule| rule.context)
            .unwrap_or(CompileContext::Shared)
    }

    /// Whether the file is a compilable source; declaration files never are
    pub fn is_compilable(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        if name.ends_with(".d.ts") {
            return false;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext))
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::InvalidOptions {
        reason: reason.into(),
    }
}

/// Lexically normalize a path: drop `.` components and fold `..`
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
