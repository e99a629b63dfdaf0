//! Pluggable persistence and notification collaborators.
//!
//! The dashboard core only talks to the [`PersistenceStore`] and
//! [`NotificationSink`] traits; the binary wires in the file-backed
//! store and the status-line sink, and tests substitute in-memory
//! doubles.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// String key/value persistence for user preferences (panel collapse
/// state and the like). Implementations must be non-fatal: a store that
/// cannot persist still serves reads from memory.
pub trait PersistenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
}

/// In-memory store, used in tests and as the fallback when no state
/// file is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    entries: BTreeMap<String, String>,
}

/// JSON-file-backed store with write-through semantics. Load and save
/// failures are logged and otherwise ignored; reads keep working from
/// the in-memory copy.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<StoreFile>(&raw) {
                Ok(file) => file.entries,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "state file unreadable, starting fresh");
                    BTreeMap::new()
                }
            },
            // Missing file is the normal first run.
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    fn flush(&self) {
        let file = StoreFile { entries: self.entries.clone() };
        let result = serde_json::to_string_pretty(&file)
            .map_err(anyhow::Error::from)
            .and_then(|raw| fs::write(&self.path, raw).map_err(anyhow::Error::from));
        if let Err(err) = result {
            warn!(path = %self.path.display(), error = %err, "failed to persist state");
        }
    }
}

impl PersistenceStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush();
    }
}

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// Receives user-facing notices (connection lost, test complete, ...).
pub trait NotificationSink {
    fn notify(&mut self, level: NoticeLevel, message: &str);
}

/// One queued notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Sink that queues notices for the status line to display.
#[derive(Debug, Default)]
pub struct StatusLineSink {
    queue: VecDeque<Notice>,
}

impl StatusLineSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest pending notice.
    pub fn pop(&mut self) -> Option<Notice> {
        self.queue.pop_front()
    }

    pub fn drain(&mut self) -> Vec<Notice> {
        self.queue.drain(..).collect()
    }
}

impl NotificationSink for StatusLineSink {
    fn notify(&mut self, level: NoticeLevel, message: &str) {
        self.queue.push_back(Notice { level, message: message.to_string() });
    }
}
