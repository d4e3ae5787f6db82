//! Flamework Compiler - sessions, incremental cycles and watch mode
//!
//! A [`Session`] owns the frontend, the macro registry and the committed
//! [`flamework_build::BuildState`]. Each cycle transforms the affected
//! files against a staged copy of the state and commits outputs, `.meta`
//! sidecars and persisted state only when no error diagnostic was raised.
//!
//! [`WatchSession`] drives a session from filesystem and control-channel
//! events through a debounce window.

mod error;
pub mod affected;
pub mod control;
pub mod options;
pub mod queue;
pub mod report;
pub mod session;
pub mod watch;

pub use error::{CompileError, Result};
pub use control::{ControlEvent, ControlMessage, ControlWriter};
pub use options::{CompilerOptions, ContextRule};
pub use queue::{Batch, FileEvent, WatchQueue};
pub use session::{meta_path, BuildOutcome, CommitSummary, CycleReport, Session};
pub use watch::{Debouncer, WatchMessage, WatchPhase, WatchSession};
