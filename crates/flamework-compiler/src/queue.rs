//! Coalescing of filesystem events inside one debounce window

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::options::normalize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Added(PathBuf),
    Changed(PathBuf),
    Removed(PathBuf),
}

impl FileEvent {
    pub fn path(&self) -> &Path {
        match self {
            FileEvent::Added(p) | FileEvent::Changed(p) | FileEvent::Removed(p) => p,
        }
    }
}

/// The net work a window produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    /// Added or changed paths; may include directories
    pub changed: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }

    /// Fold in `later` as if its events arrived after this batch's
    pub fn merge(&mut self, later: Batch) {
        let mut changed: BTreeSet<PathBuf> = self.changed.drain(..).collect();
        let mut removed: BTreeSet<PathBuf> = self.removed.drain(..).collect();
        for path in later.removed {
            changed.remove(&path);
            removed.insert(path);
        }
        for path in later.changed {
            removed.remove(&path);
            changed.insert(path);
        }
        self.changed = changed.into_iter().collect();
        self.removed = removed.into_iter().collect();
    }
}

/// Pending add/change/remove sets, deduplicated per normalized path.
///
/// Invariant: a path is in at most one of the three sets.
#[derive(Debug, Default)]
pub struct WatchQueue {
    added: BTreeSet<PathBuf>,
    changed: BTreeSet<PathBuf>,
    removed: BTreeSet<PathBuf>,
    window_open: bool,
}

impl WatchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: FileEvent) {
        let path = normalize(event.path());
        match event {
            FileEvent::Added(_) => {
                if self.removed.remove(&path) {
                    // Deleted then recreated: the old output is stale either way
                    self.changed.insert(path);
                } else if !self.changed.contains(&path) {
                    self.added.insert(path);
                }
            }
            FileEvent::Changed(_) => {
                self.removed.remove(&path);
                if !self.added.contains(&path) {
                    self.changed.insert(path);
                }
            }
            FileEvent::Removed(_) => {
                self.changed.remove(&path);
                // An add cancelled by a later remove nets to nothing
                if !self.added.remove(&path) {
                    self.removed.insert(path);
                }
            }
        }
    }

    /// Open the debounce window. Returns false when one is already pending.
    pub fn open_window(&mut self) -> bool {
        !std::mem::replace(&mut self.window_open, true)
    }

    pub fn is_window_open(&self) -> bool {
        self.window_open
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    /// Close the window and hand out the net batch
    pub fn drain(&mut self) -> Batch {
        self.window_open = false;
        let mut changed: Vec<PathBuf> = std::mem::take(&mut self.added).into_iter().collect();
        changed.extend(std::mem::take(&mut self.changed));
        changed.sort();
        Batch {
            changed,
            removed: std::mem::take(&mut self.removed).into_iter().collect(),
        }
    }
}
