//! Session journal for the bench.
//!
//! Appends one JSON object per line for every operator-visible event of a
//! monitoring session: start and end, motor start/stop, profile selection and the
//! drive nameplate found at connect.

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalEventType {
    SessionStart,
    ProfileLoaded,
    NameplateRead,
    MotorStarted,
    MotorStopped,
    SessionEnd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Monotonic timestamp in microseconds
    pub timestamp_us: u64,
    /// Wall-clock Unix timestamp in microseconds
    pub unix_us: u64,
    pub event_type: JournalEventType,
    pub details: serde_json::Value,
}

/// Thread-safe JSONL writer.
pub struct SessionJournal {
    writer: Mutex<BufWriter<File>>,
}

impl SessionJournal {
    /// Opens `path` for appending, creating parent directories.
    pub fn new(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: Mutex::new(BufWriter::with_capacity(8192, file)),
        })
    }

    pub fn log(&self, entry: JournalEntry) -> std::io::Result<()> {
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        serde_json::to_writer(&mut *writer, &entry)?;
        writer.write_all(b"\n")?;
        writer.flush()
    }

    pub fn log_event(
        &self,
        timestamp_us: u64,
        unix_us: u64,
        event_type: JournalEventType,
        details: serde_json::Value,
    ) -> std::io::Result<()> {
        self.log(JournalEntry {
            timestamp_us,
            unix_us,
            event_type,
            details,
        })
    }
}
