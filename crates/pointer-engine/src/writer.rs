//! JSONL intent log for replay diagnostics.
//!
//! The first line is a `#` header, then one intent per line. Moves are
//! buffered; clicks and button transitions reach the file as soon as they
//! are dispatched so a killed session still shows every action it took.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use myopoint_common::error::{MyopointError, MyopointResult};
use myopoint_sensor_model::action::PointerIntent;

use crate::PointerSink;

/// Metadata written as the `#` header line of an intent log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentStreamHeader {
    pub schema_version: String,

    /// Controller variant that produced the intents.
    pub variant: String,

    /// Wall-clock time the log was opened (RFC 3339).
    pub started_at: String,
}

impl IntentStreamHeader {
    pub fn new(variant: impl Into<String>) -> Self {
        Self {
            schema_version: "1.0".to_string(),
            variant: variant.into(),
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Pointer sink that records intents to a JSONL file instead of injecting them.
pub struct JsonlSink {
    out: BufWriter<File>,
    path: PathBuf,
    moves: u64,
    actions: u64,
}

impl JsonlSink {
    /// Create (or truncate) the log and write its header.
    pub fn create(path: impl AsRef<Path>, header: &IntentStreamHeader) -> MyopointResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;

        let mut sink = Self {
            out: BufWriter::new(file),
            path,
            moves: 0,
            actions: 0,
        };
        let header = serde_json::to_string(header)?;
        sink.write_line(&format!("# {header}"))?;
        Ok(sink)
    }

    /// Intents written so far, moves and actions together.
    pub fn intents_written(&self) -> u64 {
        self.moves + self.actions
    }

    /// Clicks and button transitions written so far.
    pub fn actions_written(&self) -> u64 {
        self.actions
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &str) -> MyopointResult<()> {
        writeln!(self.out, "{line}").map_err(|e| {
            MyopointError::sink(format!("write to {} failed: {e}", self.path.display()))
        })
    }
}

impl PointerSink for JsonlSink {
    fn dispatch(&mut self, intent: &PointerIntent) -> MyopointResult<()> {
        self.write_line(&serde_json::to_string(intent)?)?;
        if intent.is_action() {
            self.actions += 1;
            self.flush()
        } else {
            self.moves += 1;
            Ok(())
        }
    }

    fn name(&self) -> &str {
        "jsonl"
    }

    fn flush(&mut self) -> MyopointResult<()> {
        self.out.flush().map_err(|e| {
            MyopointError::sink(format!("flush of {} failed: {e}", self.path.display()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use myopoint_sensor_model::action::{parse_intents, Displacement, GestureEvent};

    fn temp_log(name: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(name);
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("intents.jsonl");
        (dir, path)
    }

    #[test]
    fn test_log_reads_back_as_intents() {
        let (dir, path) = temp_log("myopoint_test_jsonl_sink");
        let header = IntentStreamHeader::new("gyro_responsive");

        {
            let mut sink = JsonlSink::create(&path, &header).unwrap();
            sink.dispatch(&PointerIntent::movement(0, Displacement::new(-3.0, 1.5)))
                .unwrap();
            sink.dispatch(&PointerIntent::from_gesture(100_000_000, GestureEvent::DragStart))
                .unwrap();
            sink.dispatch(&PointerIntent::from_gesture(700_000_000, GestureEvent::DragEnd))
                .unwrap();
            assert_eq!(sink.intents_written(), 3);
            assert_eq!(sink.actions_written(), 2);
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        let parsed: IntentStreamHeader =
            serde_json::from_str(lines[0].trim_start_matches("# ")).unwrap();
        assert_eq!(parsed.variant, "gyro_responsive");

        let intents = parse_intents(&content).unwrap();
        assert_eq!(intents.len(), 3);
        assert_eq!(intents[0].displacement(), Some(Displacement::new(-3.0, 1.5)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_actions_are_on_disk_before_flush() {
        let (dir, path) = temp_log("myopoint_test_jsonl_sink_actions");
        let mut sink = JsonlSink::create(&path, &IntentStreamHeader::new("accel")).unwrap();
        sink.dispatch(&PointerIntent::movement(0, Displacement::new(1.0, 0.0)))
            .unwrap();
        sink.dispatch(&PointerIntent::from_gesture(5_000_000, GestureEvent::RightClick))
            .unwrap();

        // Sink still open: the click flushed everything before it.
        let intents = parse_intents(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(intents.len(), 2);
        assert!(intents[1].is_action());

        drop(sink);
        std::fs::remove_dir_all(&dir).ok();
    }
}
