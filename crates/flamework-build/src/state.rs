//! Build state: the three persisted documents and their mutation rules

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::{
    BuildError, BuildFile, ComponentDescriptor, ComponentEntry, EditorInfo, EnumTable, Result,
    BUILD_FILE_VERSION,
};

/// Which ids each source file contributed in its last successful compile
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileComponentMap {
    files: BTreeMap<String, Vec<String>>,
}

impl FileComponentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the map from the `filePath` of every persisted behaviour
    pub fn from_build_file(build: &BuildFile) -> Self {
        let mut files: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (id, behaviour) in &build.behaviours {
            files
                .entry(behaviour.file_path.clone())
                .or_default()
                .push(id.clone());
        }
        Self { files }
    }

    pub fn get(&self, file: &str) -> &[String] {
        self.files.get(file).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace the ids for `file`, returning the previous list
    pub fn set(&mut self, file: &str, ids: Vec<String>) -> Vec<String> {
        if ids.is_empty() {
            return self.remove(file);
        }
        self.files.insert(file.to_string(), ids).unwrap_or_default()
    }

    pub fn remove(&mut self, file: &str) -> Vec<String> {
        self.files.remove(file).unwrap_or_default()
    }

    pub fn files(&self) -> impl Iterator<Item = &String> {
        self.files.keys()
    }
}

/// Everything persisted across sessions.
///
/// A compile cycle works on a clone of the committed state and the
/// orchestrator swaps it in only when the cycle succeeds, so a failed
/// cycle leaves the committed state untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildState {
    pub build: BuildFile,
    pub editor: EditorInfo,
    pub files: FileComponentMap,
}

impl BuildState {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            build: BuildFile::new(),
            editor: EditorInfo::new(project_id),
            files: FileComponentMap::new(),
        }
    }

    /// Load persisted state, cold-starting from empty state when either
    /// document is missing, corrupt or from another version
    pub fn load(build_path: &Path, editor_path: &Path, project_id: &str) -> Self {
        match Self::try_load(build_path, editor_path, project_id) {
            Ok(state) => state,
            Err(err) => {
                warn!(error = %err, "discarding persisted build state");
                Self::new(project_id)
            }
        }
    }

    /// Load persisted state, reporting corrupt documents as errors
    pub fn try_load(build_path: &Path, editor_path: &Path, project_id: &str) -> Result<Self> {
        let build: BuildFile = read_json(build_path)?.unwrap_or_default();
        if build.flamework.version != BUILD_FILE_VERSION {
            return Err(BuildError::Version {
                path: build_path.to_path_buf(),
                found: build.flamework.version,
            });
        }
        let mut editor: EditorInfo = read_json(editor_path)?.unwrap_or_default();
        if editor.id.is_empty() {
            editor.id = project_id.to_string();
        }
        let files = FileComponentMap::from_build_file(&build);
        debug!(
            behaviours = build.behaviours.len(),
            enums = editor.enums.len(),
            "loaded build state"
        );
        Ok(Self { build, editor, files })
    }

    pub fn save(&self, build_path: &Path, editor_path: &Path) -> Result<()> {
        write_json(build_path, &self.build)?;
        write_json(editor_path, &self.editor)?;
        Ok(())
    }

    /// Record one extracted descriptor
    pub fn record_descriptor(&mut self, file: &str, descriptor: &ComponentDescriptor, asset_path: &str) {
        self.build
            .register_behaviour(&descriptor.id, file, descriptor.is_component, &descriptor.extends);
        if descriptor.is_component {
            self.editor.components.insert(
                descriptor.id.clone(),
                ComponentEntry {
                    asset_path: asset_path.to_string(),
                    name: descriptor.name.clone(),
                },
            );
        } else {
            self.editor.components.remove(&descriptor.id);
        }
    }

    /// Register an enum table; the first registration of an id wins
    pub fn register_enum(&mut self, id: &str, table: EnumTable) -> bool {
        self.editor.register_enum(id, table)
    }

    /// Record the ids `file` produced this cycle and prune the ones it
    /// produced last time but no longer does. Returns the pruned ids.
    pub fn commit_file(&mut self, file: &str, ids: Vec<String>) -> Vec<String> {
        let previous = self.files.set(file, ids.clone());
        let stale: Vec<String> = previous.into_iter().filter(|id| !ids.contains(id)).collect();
        self.prune_ids(&stale);
        stale
    }

    /// Prune everything a removed file contributed. Returns the pruned ids.
    pub fn prune_file(&mut self, file: &str) -> Vec<String> {
        let ids = self.files.remove(file);
        self.prune_ids(&ids);
        ids
    }

    pub fn prune_ids(&mut self, ids: &[String]) {
        for id in ids {
            self.build.remove_id(id);
            self.editor.components.remove(id);
        }
    }

    /// Short identifier for `internal`, generated on first request and
    /// persisted afterwards
    pub fn short_id(&mut self, internal: &str) -> String {
        if let Some(short) = self.build.flamework.identifiers.get(internal) {
            return short.clone();
        }

        let mut hasher = Sha256::new();
        hasher.update(internal.as_bytes());
        let digest = format!("{:x}", hasher.finalize());

        // Lengthen the prefix until it is unused
        let taken: Vec<&String> = self.build.flamework.identifiers.values().collect();
        let mut len = 6;
        let mut short = digest[..len].to_string();
        while taken.contains(&&short) && len < digest.len() {
            len += 1;
            short = digest[..len].to_string();
        }

        self.build
            .flamework
            .identifiers
            .insert(internal.to_string(), short.clone());
        short
    }

    /// Whether any persisted document still mentions `id`
    pub fn references(&self, id: &str) -> bool {
        self.build.references(id) || self.editor.components.contains_key(id)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&text)?))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    fs::write(path, text)?;
    Ok(())
}
