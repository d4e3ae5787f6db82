//! Event coalescing through a watch session

mod common;

use std::sync::{Arc, Mutex};
use std::io::{self, Write};
use std::time::{Duration, Instant};

use common::fixtures::*;
use flamework::compiler::{ControlMessage, WatchMessage, WatchPhase, WatchSession};
use notify::event::{CreateKind, DataChange, ModifyKind, RemoveKind};
use notify::{Event, EventKind};

fn make_event(kind: EventKind, path: &std::path::Path) -> WatchMessage {
    WatchMessage::Fs(Ok(Event::new(kind).add_path(path.to_path_buf())))
}

fn modified() -> EventKind {
    EventKind::Modify(ModifyKind::Data(DataChange::Content))
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_add_change_delete_in_one_window_nets_out() {
    let project = Project::new();
    let mut frontend = make_frontend();
    let bar = project.source("shared/bar.ts");
    frontend.add_file(make_plain_file(&bar, "bar"));

    let mut watch = WatchSession::new(project.session(frontend));
    let foo = project.source("shared/foo.ts");
    let start = Instant::now();
    watch.handle(make_event(EventKind::Create(CreateKind::File), &foo), start);
    watch.handle(make_event(modified(), &foo), start);
    watch.handle(make_event(modified(), &bar), start);
    watch.handle(make_event(EventKind::Remove(RemoveKind::File), &foo), start);
    assert!(matches!(watch.phase(), WatchPhase::Collecting { .. }));

    assert!(watch.flush_due(start + Duration::from_millis(50)).unwrap().is_none());
    let report = watch
        .flush_due(start + Duration::from_millis(100))
        .unwrap()
        .expect("window closed");
    assert_eq!(report.files, vec![bar]);
    assert!(report.committed());
    assert!(!project.output("shared/foo.lua").exists());
    assert!(project.output("shared/bar.lua").exists());
    assert_eq!(watch.phase(), WatchPhase::Idle);
}

#[test]
fn test_control_channel_marks_changed_and_reports() {
    let project = Project::new();
    let mut frontend = make_frontend();
    let util = project.source("shared/util.ts");
    frontend.add_file(make_plain_file(&util, "helper"));

    let output = SharedBuffer::default();
    let mut watch =
        WatchSession::new(project.session(frontend)).with_control_output(output.clone());
    let start = Instant::now();
    watch.handle(
        WatchMessage::Control(ControlMessage::MarkChanged {
            path: "shared/util.ts".into(),
        }),
        start,
    );
    let report = watch
        .flush_due(start + Duration::from_millis(100))
        .unwrap()
        .expect("window closed");
    assert_eq!(report.files, vec![util]);

    let text = String::from_utf8(output.0.lock().unwrap().clone()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.first(), Some(&r#"{"type":"compileStart"}"#));
    assert_eq!(
        lines.last(),
        Some(&r#"{"type":"compileFinish","success":true,"files":1}"#)
    );
}

#[test]
fn test_shutdown_stops_handling() {
    let project = Project::new();
    let mut watch = WatchSession::new(project.session(make_frontend()));
    assert!(!watch.handle(WatchMessage::Shutdown, Instant::now()));
}
