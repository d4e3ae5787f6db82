//! Line-delimited JSON control channel
//!
//! Inbound lines inject "treat as changed" events into the watch queue;
//! outbound lines report cycle progress and diagnostics to the embedder.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tracing::warn;

use flamework_ast::{Diagnostic, Severity};

use crate::watch::WatchMessage;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlMessage {
    MarkChanged { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlEvent {
    CompileStart,
    CompileFinish {
        success: bool,
        files: usize,
    },
    Diagnostic {
        severity: Severity,
        code: String,
        message: String,
        file: Option<PathBuf>,
    },
}

impl From<&Diagnostic> for ControlEvent {
    fn from(diagnostic: &Diagnostic) -> Self {
        ControlEvent::Diagnostic {
            severity: diagnostic.severity,
            code: diagnostic.code.to_string(),
            message: diagnostic.message.clone(),
            file: diagnostic.file.clone(),
        }
    }
}

/// Parse one inbound line; blank lines carry no message
pub fn parse_message(line: &str) -> Result<Option<ControlMessage>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

/// Forward inbound messages from `reader` until it closes or the watch
/// loop goes away. Malformed lines are logged and skipped.
pub fn spawn_reader<R>(reader: R, sender: Sender<WatchMessage>) -> JoinHandle<()>
where
    R: BufRead + Send + 'static,
{
    thread::spawn(move || {
        for line in reader.lines() {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    warn!(error = %err, "control channel closed");
                    break;
                }
            };
            match parse_message(&line) {
                Ok(Some(message)) => {
                    if sender.send(WatchMessage::Control(message)).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(err) => warn!(error = %err, line = %line, "ignoring malformed control message"),
            }
        }
    })
}

/// Outbound half of the channel
pub struct ControlWriter<W: Write> {
    writer: W,
}

impl<W: Write> ControlWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn emit(&mut self, event: &ControlEvent) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flamework_ast::Span;
    use std::io::Cursor;
    use std::sync::mpsc::channel;

    #[test]
    fn test_parse_mark_changed() {
        let message = parse_message(r#"{"type":"markChanged","path":"src/door.ts"}"#).unwrap();
        assert_eq!(
            message,
            Some(ControlMessage::MarkChanged {
                path: PathBuf::from("src/door.ts")
            })
        );
        assert_eq!(parse_message("   ").unwrap(), None);
        assert!(parse_message(r#"{"type":"restart"}"#).is_err());
    }

    #[test]
    fn test_events_are_line_delimited() {
        let mut writer = ControlWriter::new(Vec::new());
        writer.emit(&ControlEvent::CompileStart).unwrap();
        let diagnostic = Diagnostic::warning("W-META-001", "no type", Span::dummy()).with_file("src/door.ts");
        writer.emit(&ControlEvent::from(&diagnostic)).unwrap();
        writer
            .emit(&ControlEvent::CompileFinish { success: true, files: 2 })
            .unwrap();

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], r#"{"type":"compileStart"}"#);
        assert_eq!(
            lines[1],
            r#"{"type":"diagnostic","severity":"warning","code":"W-META-001","message":"no type","file":"src/door.ts"}"#
        );
        assert_eq!(lines[2], r#"{"type":"compileFinish","success":true,"files":2}"#);
    }

    #[test]
    fn test_reader_skips_malformed_lines() {
        let (sender, receiver) = channel();
        let input = Cursor::new("not json\n{\"type\":\"markChanged\",\"path\":\"src/a.ts\"}\n");
        spawn_reader(input, sender).join().unwrap();

        let messages: Vec<WatchMessage> = receiver.try_iter().collect();
        assert_eq!(messages.len(), 1);
        assert!(matches!(
            &messages[0],
            WatchMessage::Control(ControlMessage::MarkChanged { path }) if path == &PathBuf::from("src/a.ts")
        ));
    }
}
