use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::SessionResult;

/// One line of the result log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub mode: String,
    pub broken: bool,
    pub word_count: usize,
    /// Empty for broken sessions.
    pub wpm: Option<f64>,
}

impl LogEntry {
    pub fn new(result: &SessionResult, at: DateTime<Utc>) -> Self {
        Self {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Secs, true),
            mode: result.mode.to_string(),
            broken: result.broken,
            word_count: result.word_count,
            wpm: (!result.broken).then_some(result.wpm),
        }
    }
}

/// Append-only record of finished sessions.
pub trait ResultLog: Send {
    fn append(&mut self, entry: &LogEntry) -> Result<()>;
}

/// CSV file with a header row, created on first append.
#[derive(Debug, Clone)]
pub struct CsvResultLog {
    path: PathBuf,
}

impl CsvResultLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> Result<Vec<LogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path).map_err(csv_error)?;
        reader
            .deserialize()
            .map(|row| row.map_err(csv_error))
            .collect()
    }
}

impl ResultLog for CsvResultLog {
    fn append(&mut self, entry: &LogEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let needs_header = fs::metadata(&self.path).map_or(true, |m| m.len() == 0);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(entry).map_err(csv_error)?;
        writer.flush()?;
        Ok(())
    }
}

/// Shared in-memory log; clones see the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryResultLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemoryResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl ResultLog for MemoryResultLog {
    fn append(&mut self, entry: &LogEntry) -> Result<()> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
        Ok(())
    }
}

fn csv_error(e: csv::Error) -> crate::error::Error {
    match e.into_kind() {
        csv::ErrorKind::Io(io) => io.into(),
        other => crate::error::Error::Parse {
            what: "result log".to_string(),
            fragment: format!("{other:?}"),
        },
    }
}
