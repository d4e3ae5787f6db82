//! Incremental watch sessions
//!
//! Phases: `Idle → Collecting → Compiling → Idle`. The first event opens
//! a debounce window; everything arriving before the deadline coalesces
//! into one batch. The filesystem watcher and the control reader run on
//! their own threads and only send messages; this loop is the single
//! mutator of the queue and the build state.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use flamework_symbols::SemanticFrontend;

use crate::control::{ControlEvent, ControlMessage, ControlWriter};
use crate::options::{normalize, CompilerOptions};
use crate::queue::{Batch, FileEvent, WatchQueue};
use crate::session::{CycleReport, Session};
use crate::Result;

/// Everything the watch loop reacts to
pub enum WatchMessage {
    Fs(notify::Result<Event>),
    Control(ControlMessage),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
    Idle,
    Collecting { deadline: Instant },
    Compiling,
}

/// Debounce state machine over a [`WatchQueue`]
#[derive(Debug)]
pub struct Debouncer {
    queue: WatchQueue,
    phase: WatchPhase,
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            queue: WatchQueue::new(),
            phase: WatchPhase::Idle,
            window,
        }
    }

    pub fn phase(&self) -> WatchPhase {
        self.phase
    }

    /// Queue an event. While compiling, it waits for the next window.
    pub fn push(&mut self, event: FileEvent, now: Instant) {
        self.queue.push(event);
        if self.phase == WatchPhase::Idle && self.queue.open_window() {
            self.phase = WatchPhase::Collecting {
                deadline: now + self.window,
            };
        }
    }

    /// How long the loop may block before the window closes
    pub fn timeout(&self, now: Instant) -> Option<Duration> {
        match self.phase {
            WatchPhase::Collecting { deadline } => Some(deadline.saturating_duration_since(now)),
            _ => None,
        }
    }

    /// Close an expired window and hand out its batch
    pub fn poll(&mut self, now: Instant) -> Option<Batch> {
        match self.phase {
            WatchPhase::Collecting { deadline } if now >= deadline => {
                self.phase = WatchPhase::Compiling;
                Some(self.queue.drain())
            }
            _ => None,
        }
    }

    /// Return to idle, reopening a window for events deferred meanwhile
    pub fn finish(&mut self, now: Instant) {
        self.phase = WatchPhase::Idle;
        if !self.queue.is_empty() && self.queue.open_window() {
            self.phase = WatchPhase::Collecting {
                deadline: now + self.window,
            };
        }
    }
}

/// Translate one notify event into queue events for compilable paths
pub fn file_events(event: &Event, options: &CompilerOptions) -> Vec<FileEvent> {
    let out_dir = normalize(&options.out_dir);
    let relevant = |path: &Path, removed: bool| {
        if normalize(path).starts_with(&out_dir) {
            return false;
        }
        options.is_compilable(path) || path.is_dir() || (removed && path.extension().is_none())
    };

    let mut events = Vec::new();
    match &event.kind {
        EventKind::Create(_) => {
            for path in &event.paths {
                if relevant(path, false) {
                    events.push(FileEvent::Added(path.clone()));
                }
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) if event.paths.len() == 2 => {
            let (from, to) = (&event.paths[0], &event.paths[1]);
            if relevant(from, true) {
                events.push(FileEvent::Removed(from.clone()));
            }
            if relevant(to, false) {
                events.push(FileEvent::Added(to.clone()));
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) | EventKind::Remove(_) => {
            for path in &event.paths {
                if relevant(path, true) {
                    events.push(FileEvent::Removed(path.clone()));
                }
            }
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            for path in &event.paths {
                if relevant(path, false) {
                    events.push(FileEvent::Added(path.clone()));
                }
            }
        }
        EventKind::Modify(_) => {
            for path in &event.paths {
                if relevant(path, false) {
                    events.push(FileEvent::Changed(path.clone()));
                }
            }
        }
        _ => {}
    }
    events
}

/// A long-lived session recompiling on every settled batch of events
pub struct WatchSession<F: SemanticFrontend> {
    session: Session<F>,
    debouncer: Debouncer,
    sender: Sender<WatchMessage>,
    receiver: Receiver<WatchMessage>,
    watcher: Option<Box<dyn Watcher + Send>>,
    control: Option<ControlWriter<Box<dyn Write>>>,
}

impl<F: SemanticFrontend> WatchSession<F> {
    pub fn new(session: Session<F>) -> Self {
        let (sender, receiver) = channel();
        let window = Duration::from_millis(session.options().debounce_ms);
        Self {
            session,
            debouncer: Debouncer::new(window),
            sender,
            receiver,
            watcher: None,
            control: None,
        }
    }

    /// Report cycle events as control-channel lines on `writer`
    pub fn with_control_output(mut self, writer: impl Write + 'static) -> Self {
        self.control = Some(ControlWriter::new(Box::new(writer)));
        self
    }

    /// Sender for injecting messages, e.g. from a control reader
    pub fn sender(&self) -> Sender<WatchMessage> {
        self.sender.clone()
    }

    pub fn session(&self) -> &Session<F> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<F> {
        &mut self.session
    }

    pub fn phase(&self) -> WatchPhase {
        self.debouncer.phase()
    }

    /// Start the native or polling watcher on the root directory
    pub fn start_watching(&mut self) -> Result<()> {
        let options = self.session.options();
        let sender = self.sender.clone();
        let handler = move |res: notify::Result<Event>| {
            let _ = sender.send(WatchMessage::Fs(res));
        };

        let mut watcher: Box<dyn Watcher + Send> = if options.use_polling {
            let config = notify::Config::default()
                .with_poll_interval(Duration::from_millis(options.poll_interval_ms));
            Box::new(PollWatcher::new(handler, config)?)
        } else {
            Box::new(notify::recommended_watcher(handler)?)
        };
        watcher.watch(&options.root_dir, RecursiveMode::Recursive)?;
        info!(
            root = %options.root_dir.display(),
            polling = options.use_polling,
            "watching for changes"
        );
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Compile everything once, then recompile until a shutdown message
    /// arrives. Non-diagnostic errors end the session.
    pub fn run(&mut self) -> Result<()> {
        self.report_cycle(|session| session.compile_initial())?;
        loop {
            let message = match self.debouncer.timeout(Instant::now()) {
                Some(timeout) => match self.receiver.recv_timeout(timeout) {
                    Ok(message) => Some(message),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => return Ok(()),
                },
                None => match self.receiver.recv() {
                    Ok(message) => Some(message),
                    Err(_) => return Ok(()),
                },
            };
            if let Some(message) = message {
                if !self.handle(message, Instant::now()) {
                    debug!("watch session shutting down");
                    return Ok(());
                }
            }
            self.flush_due(Instant::now())?;
        }
    }

    /// Apply one message. Returns false on shutdown.
    pub fn handle(&mut self, message: WatchMessage, now: Instant) -> bool {
        match message {
            WatchMessage::Fs(Ok(event)) => {
                for file_event in file_events(&event, self.session.options()) {
                    self.debouncer.push(file_event, now);
                }
            }
            WatchMessage::Fs(Err(err)) => warn!(error = %err, "file watcher reported an error"),
            WatchMessage::Control(ControlMessage::MarkChanged { path }) => {
                let path = self.resolve(path);
                self.debouncer.push(FileEvent::Changed(path), now);
            }
            WatchMessage::Shutdown => return false,
        }
        true
    }

    /// Compile the pending batch if its window has closed
    pub fn flush_due(&mut self, now: Instant) -> Result<Option<CycleReport>> {
        let Some(batch) = self.debouncer.poll(now) else {
            return Ok(None);
        };
        let result = if batch.is_empty() {
            debug!("batch netted to nothing");
            Ok(None)
        } else {
            self.report_cycle(|session| session.compile_batch(&batch)).map(Some)
        };
        self.debouncer.finish(Instant::now());
        result
    }

    fn report_cycle(
        &mut self,
        cycle: impl FnOnce(&mut Session<F>) -> Result<CycleReport>,
    ) -> Result<CycleReport> {
        self.emit(&ControlEvent::CompileStart);
        let report = cycle(&mut self.session)?;
        for diagnostic in &report.diagnostics {
            self.emit(&ControlEvent::from(diagnostic));
        }
        self.emit(&ControlEvent::CompileFinish {
            success: report.committed(),
            files: report.files.len(),
        });
        Ok(report)
    }

    fn emit(&mut self, event: &ControlEvent) {
        if let Some(control) = &mut self.control {
            if let Err(err) = control.emit(event) {
                warn!(error = %err, "failed to write control event");
            }
        }
    }

    /// Control paths are relative to the project root
    fn resolve(&self, path: PathBuf) -> PathBuf {
        if path.is_absolute() {
            path
        } else {
            let root = &self.session.options().root_dir;
            if normalize(&path).starts_with(normalize(root)) {
                path
            } else {
                root.join(path)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};

    fn make_event(kind: EventKind, paths: &[&str]) -> Event {
        let mut event = Event::new(kind);
        for path in paths {
            event = event.add_path(PathBuf::from(path));
        }
        event
    }

    #[test]
    fn test_window_opens_once() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.push(FileEvent::Changed("src/a.ts".into()), start);
        debouncer.push(FileEvent::Changed("src/b.ts".into()), start + Duration::from_millis(60));

        assert_eq!(
            debouncer.phase(),
            WatchPhase::Collecting {
                deadline: start + Duration::from_millis(100)
            }
        );
        assert!(debouncer.poll(start + Duration::from_millis(99)).is_none());
        let batch = debouncer.poll(start + Duration::from_millis(100)).unwrap();
        assert_eq!(batch.changed.len(), 2);
        assert_eq!(debouncer.phase(), WatchPhase::Compiling);
    }

    #[test]
    fn test_events_during_compile_are_deferred() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.push(FileEvent::Changed("src/a.ts".into()), start);
        debouncer.poll(start + Duration::from_millis(100)).unwrap();

        debouncer.push(FileEvent::Changed("src/b.ts".into()), start + Duration::from_millis(120));
        assert_eq!(debouncer.phase(), WatchPhase::Compiling);
        assert!(debouncer.poll(start + Duration::from_millis(500)).is_none());

        let done = start + Duration::from_millis(150);
        debouncer.finish(done);
        assert_eq!(
            debouncer.phase(),
            WatchPhase::Collecting {
                deadline: done + Duration::from_millis(100)
            }
        );
        let batch = debouncer.poll(done + Duration::from_millis(100)).unwrap();
        assert_eq!(batch.changed, vec![PathBuf::from("src/b.ts")]);
    }

    #[test]
    fn test_finish_without_pending_returns_idle() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.push(FileEvent::Added("src/a.ts".into()), start);
        debouncer.poll(start + Duration::from_millis(10)).unwrap();
        debouncer.finish(start + Duration::from_millis(20));
        assert_eq!(debouncer.phase(), WatchPhase::Idle);
        assert_eq!(debouncer.timeout(start), None);
    }

    #[test]
    fn test_notify_events_translate() {
        let options = CompilerOptions::new("src", "out");

        let created = make_event(EventKind::Create(CreateKind::File), &["src/a.ts", "src/notes.md"]);
        assert_eq!(file_events(&created, &options), vec![FileEvent::Added("src/a.ts".into())]);

        let modified = make_event(
            EventKind::Modify(ModifyKind::Data(DataChange::Content)),
            &["src/a.ts"],
        );
        assert_eq!(file_events(&modified, &options), vec![FileEvent::Changed("src/a.ts".into())]);

        let renamed = make_event(
            EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
            &["src/a.ts", "src/b.ts"],
        );
        assert_eq!(
            file_events(&renamed, &options),
            vec![
                FileEvent::Removed("src/a.ts".into()),
                FileEvent::Added("src/b.ts".into())
            ]
        );

        // A removed directory has no extension to check
        let removed = make_event(EventKind::Remove(RemoveKind::Any), &["src/ui"]);
        assert_eq!(file_events(&removed, &options), vec![FileEvent::Removed("src/ui".into())]);

        let output = make_event(EventKind::Create(CreateKind::File), &["out/a.ts"]);
        assert!(file_events(&output, &options).is_empty());
    }
}
