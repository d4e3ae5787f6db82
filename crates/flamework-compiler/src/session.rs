//! Compile cycles with a staged, all-or-nothing commit

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, info_span, trace, warn};

use flamework_ast::{Diagnostic, DiagnosticSink};
use flamework_build::{BuildState, MetaFile};
use flamework_symbols::{PathTranslator, ProjectPaths, SemanticFrontend};
use flamework_transform::{
    file_key, transform_file, FileOutput, MacroRegistry, TransformOptions, TransformServices,
};

use crate::affected::{incremental_files, initial_files, PrecompiledDirs};
use crate::options::{normalize, CompilerOptions};
use crate::queue::Batch;
use crate::{CompileError, Result};

/// What a committed cycle changed on disk and in the build state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitSummary {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    /// Output files deleted for removed sources
    pub removed: Vec<PathBuf>,
    /// Ids each compiled file contributed, keyed by source file
    pub contributed: BTreeMap<String, Vec<String>>,
    pub pruned: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    /// Sources that were transformed
    pub files: Vec<PathBuf>,
    pub diagnostics: Vec<Diagnostic>,
    /// `None` when error diagnostics voided the cycle
    pub summary: Option<CommitSummary>,
}

impl CycleReport {
    pub fn committed(&self) -> bool {
        self.summary.is_some()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Result of a one-shot build
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub report: CycleReport,
}

impl BuildOutcome {
    pub fn exit_code(&self) -> i32 {
        if self.report.has_errors() {
            1
        } else {
            0
        }
    }
}

pub type CommitHook = Box<dyn FnMut(&CommitSummary)>;

/// One compiler instance: frontend, macro registry and committed build
/// state. Cycles run strictly one after another.
pub struct Session<F: SemanticFrontend> {
    options: CompilerOptions,
    paths: ProjectPaths,
    transform_options: TransformOptions,
    frontend: F,
    registry: MacroRegistry,
    state: BuildState,
    precompiled: PrecompiledDirs,
    sink: DiagnosticSink,
    hooks: Vec<CommitHook>,
    /// Work of voided cycles, carried into the next one
    retry: Batch,
    cycles: u64,
}

impl<F: SemanticFrontend> Session<F> {
    /// Resolve the macro registry and load persisted state. Missing
    /// runtime declarations abort here, before anything compiles.
    pub fn new(options: CompilerOptions, frontend: F) -> Result<Self> {
        options.validate()?;
        let registry = MacroRegistry::new(&frontend)?;
        let state = BuildState::load(
            &options.build_info_path,
            &options.editor_info_path,
            &options.project_id,
        );
        let precompiled = PrecompiledDirs::scan(&options);
        debug!(
            root = %options.root_dir.display(),
            macros = registry.handler_count(),
            "session started"
        );

        Ok(Self {
            paths: options.project_paths(),
            transform_options: options.transform_options(),
            options,
            frontend,
            registry,
            state,
            precompiled,
            sink: DiagnosticSink::new(),
            hooks: Vec::new(),
            retry: Batch::default(),
            cycles: 0,
        })
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// The committed build state
    pub fn state(&self) -> &BuildState {
        &self.state
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn frontend_mut(&mut self) -> &mut F {
        &mut self.frontend
    }

    /// Embedders register extra macros here before the first cycle
    pub fn registry_mut(&mut self) -> &mut MacroRegistry {
        &mut self.registry
    }

    /// Run `hook` after every committed cycle
    pub fn on_commit(&mut self, hook: impl FnMut(&CommitSummary) + 'static) {
        self.hooks.push(Box::new(hook));
    }

    /// Compile the whole program once
    pub fn build_all(&mut self) -> Result<BuildOutcome> {
        let report = self.compile_initial()?;
        Ok(BuildOutcome { report })
    }

    pub fn compile_initial(&mut self) -> Result<CycleReport> {
        self.frontend.update_program(&[self.options.root_dir.clone()])?;
        let files = initial_files(&self.options, &self.precompiled, &self.frontend);

        // Files recorded by an earlier session that left the program since
        let present: HashSet<String> = files.iter().map(|path| file_key(path)).collect();
        let removed: Vec<PathBuf> = self
            .state
            .files
            .files()
            .filter(|key| !present.contains(key.as_str()))
            .map(PathBuf::from)
            .collect();

        let report = self.run_cycle(files.clone(), &removed)?;
        self.retry = if report.committed() {
            Batch::default()
        } else {
            Batch {
                changed: files,
                removed,
            }
        };
        Ok(report)
    }

    /// Compile what one coalesced batch of events affects, together with
    /// the work of any voided cycle before it
    pub fn compile_batch(&mut self, batch: &Batch) -> Result<CycleReport> {
        self.frontend.update_program(&[self.options.root_dir.clone()])?;
        let mut work = std::mem::take(&mut self.retry);
        work.merge(Batch {
            changed: Vec::new(),
            removed: self.dropped_since_last_build(),
        });
        work.merge(batch.clone());

        let changed: Vec<PathBuf> = work
            .changed
            .iter()
            .filter(|path| path.exists() || self.frontend.source_file(path).is_some())
            .cloned()
            .collect();
        let files = incremental_files(&self.options, &self.precompiled, &self.frontend, &changed);
        let report = self.run_cycle(files, &work.removed)?;
        if !report.committed() {
            debug!(
                changed = work.changed.len(),
                removed = work.removed.len(),
                "keeping voided batch for the next cycle"
            );
            self.retry = work;
        }
        Ok(report)
    }

    /// Work a voided cycle left for the next one
    pub fn pending_retry(&self) -> &Batch {
        &self.retry
    }

    /// Files the frontend dropped since the last commit that still hold
    /// build entries
    fn dropped_since_last_build(&self) -> Vec<PathBuf> {
        self.frontend
            .changed_files_since_last_build()
            .into_iter()
            .filter(|path| self.frontend.source_file(path).is_none())
            .filter(|path| !self.state.files.get(&file_key(path)).is_empty())
            .collect()
    }

    fn run_cycle(&mut self, files: Vec<PathBuf>, removed: &[PathBuf]) -> Result<CycleReport> {
        self.cycles += 1;
        let span = info_span!("cycle", number = self.cycles);
        let _enter = span.enter();
        info!(files = files.len(), removed = removed.len(), "compile cycle started");

        let mut staged = self.state.clone();
        let mut pruned = Vec::new();
        let mut removed_sources = Vec::new();

        for path in removed {
            let target = normalize(path);
            let keys: Vec<String> = staged
                .files
                .files()
                .filter(|key| normalize(Path::new(key.as_str())).starts_with(&target))
                .cloned()
                .collect();
            for key in keys {
                pruned.extend(staged.prune_file(&key));
            }
            removed_sources.push(path.clone());
        }

        let services = TransformServices {
            frontend: &self.frontend,
            paths: &self.paths,
            macros: &self.registry,
            options: &self.transform_options,
        };
        let mut outputs: Vec<FileOutput> = Vec::with_capacity(files.len());
        for path in &files {
            let Some(file) = self.frontend.source_file(path) else {
                warn!(path = %path.display(), "dropping unreadable path from batch");
                continue;
            };
            let context = self.options.context_for(path);
            let output = transform_file(services, &mut staged, file, context);
            trace!(path = %path.display(), context = context.as_str(), "file transformed");
            pruned.extend(staged.commit_file(&file_key(path), output.contributed_ids()));
            self.sink.extend_for_file(path, output.diagnostics.clone());
            outputs.push(output);
        }

        let diagnostics = self.sink.flush();
        let compiled: Vec<PathBuf> = outputs.iter().map(|o| o.source.clone()).collect();
        if diagnostics.iter().any(Diagnostic::is_error) {
            info!(
                errors = diagnostics.iter().filter(|d| d.is_error()).count(),
                "compile cycle failed, nothing committed"
            );
            return Ok(CycleReport {
                files: compiled,
                diagnostics,
                summary: None,
            });
        }

        let summary = self.commit(staged, &outputs, &removed_sources, pruned)?;
        info!(
            written = summary.written.len(),
            unchanged = summary.unchanged.len(),
            removed = summary.removed.len(),
            "compile cycle committed"
        );
        Ok(CycleReport {
            files: compiled,
            diagnostics,
            summary: Some(summary),
        })
    }

    fn commit(
        &mut self,
        staged: BuildState,
        outputs: &[FileOutput],
        removed: &[PathBuf],
        pruned: Vec<String>,
    ) -> Result<CommitSummary> {
        let skip = self.options.skip_unchanged_writes;
        let mut summary = CommitSummary {
            pruned,
            ..CommitSummary::default()
        };

        for output in outputs {
            let out_path = self.paths.source_to_output(&output.source);
            if write_output(&out_path, &output.text(), skip)? {
                summary.written.push(out_path.clone());
            } else {
                summary.unchanged.push(out_path.clone());
            }

            let meta = meta_path(&out_path);
            if output.descriptors.is_empty() {
                remove_if_exists(&meta)?;
            } else {
                let sidecar = MetaFile {
                    descriptors: output.descriptors.clone(),
                };
                let mut text = serde_json::to_string_pretty(&sidecar)?;
                text.push('\n');
                write_output(&meta, &text, skip)?;
            }
            summary
                .contributed
                .insert(file_key(&output.source), output.contributed_ids());
        }

        for source in removed {
            for out_path in self.outputs_of_removed(source) {
                if remove_if_exists(&meta_path(&out_path))? | remove_if_exists(&out_path)? {
                    summary.removed.push(out_path);
                }
            }
        }

        self.state = staged;
        self.state
            .save(&self.options.build_info_path, &self.options.editor_info_path)?;
        self.frontend.mark_built();
        for hook in &mut self.hooks {
            hook(&summary);
        }
        Ok(summary)
    }

    /// Output paths a removed file or directory may have produced
    fn outputs_of_removed(&self, source: &Path) -> Vec<PathBuf> {
        if self.options.is_compilable(source) {
            return vec![self.paths.source_to_output(source)];
        }
        let root = normalize(&self.options.root_dir);
        let source = normalize(source);
        match source.strip_prefix(&root) {
            Ok(relative) if !relative.as_os_str().is_empty() => {
                vec![self.options.out_dir.join(relative)]
            }
            _ => Vec::new(),
        }
    }
}

/// `{outputPath}.meta`
pub fn meta_path(output: &Path) -> PathBuf {
    let mut path = output.as_os_str().to_os_string();
    path.push(".meta");
    PathBuf::from(path)
}

/// Write `text` unless the file already holds it. Returns whether the
/// file was written.
fn write_output(path: &Path, text: &str, skip_unchanged: bool) -> Result<bool> {
    if skip_unchanged {
        if let Ok(existing) = fs::read_to_string(path) {
            if existing == text {
                return Ok(false);
            }
        }
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| CompileError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }
    fs::write(path, text).map_err(|source| CompileError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

fn remove_if_exists(path: &Path) -> Result<bool> {
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err.into()),
    }
}
