//! JSONL (JSON Lines) storage for log events.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::event::{Level, LogEvent, ThrowableInfo};
use crate::markers::{FileScreenshot, Marker};
use crate::{LayoutError, LayoutResult};

/// One log event as stored on disk.
///
/// This is the serialized shape of a [`LogEvent`]: timestamps are RFC 3339
/// strings and markers are a closed data enum, since the runtime marker
/// tree can carry a live screenshot source that has no disk form. Nested
/// marker references flatten to their primary kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub timestamp: String,
    pub level: Level,
    pub logger: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub mdc: std::collections::BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<MarkerRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throwable: Option<ThrowableInfo>,
}

/// Disk form of a marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerRecord {
    Step,
    Progress,
    Tooltip,
    Data { text: String },
    Html { html: String },
    HtmlMessage { format: String },
    Screenshot { path: String },
}

impl MarkerRecord {
    /// Build the runtime marker for this record. Screenshot records become
    /// file-backed sources pointing at the stored path.
    pub fn to_marker(&self) -> Marker {
        match self {
            MarkerRecord::Step => Marker::step(),
            MarkerRecord::Progress => Marker::progress(),
            MarkerRecord::Tooltip => Marker::tooltip(),
            MarkerRecord::Data { text } => Marker::data(text.clone()),
            MarkerRecord::Html { html } => Marker::html(html.clone()),
            MarkerRecord::HtmlMessage { format } => Marker::html_message(format.clone()),
            MarkerRecord::Screenshot { path } => {
                Marker::screenshot(Arc::new(FileScreenshot::new(path.clone())))
            }
        }
    }
}

impl EventRecord {
    /// Convert to a runtime event.
    ///
    /// # Errors
    /// Returns an error if the timestamp is not valid RFC 3339.
    pub fn to_event(&self) -> LayoutResult<LogEvent> {
        let timestamp = OffsetDateTime::parse(&self.timestamp, &Rfc3339).map_err(|e| {
            LayoutError::Message(format!("invalid timestamp {:?}: {e}", self.timestamp))
        })?;

        let mut event = LogEvent::new(self.level, self.logger.clone(), self.message.clone())
            .at(timestamp)
            .with_args(self.args.clone());
        for (key, value) in &self.mdc {
            event = event.with_mdc(key.clone(), value.clone());
        }
        if let Some(marker) = &self.marker {
            event = event.with_marker(marker.to_marker());
        }
        if let Some(throwable) = &self.throwable {
            event = event.with_throwable(throwable.clone());
        }
        Ok(event)
    }
}

/// JSONL writer/reader for event records.
#[derive(Debug, Clone)]
pub struct JsonlEventLog {
    path: PathBuf,
}

impl JsonlEventLog {
    /// Create a new JsonlEventLog for the given path.
    ///
    /// The file will be created if it doesn't exist when writing.
    pub fn new(path: impl AsRef<Path>) -> Self {
        JsonlEventLog {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Append a single record to the JSONL file.
    ///
    /// # Errors
    /// Returns an error if file operations or serialization fail.
    pub fn append(&self, record: &EventRecord) -> LayoutResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| LayoutError::Message(format!("failed to create directory: {e}")))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LayoutError::Message(format!("failed to open file: {e}")))?;

        let json = serde_json::to_string(record)
            .map_err(|e| LayoutError::Message(format!("failed to serialize record: {e}")))?;

        writeln!(file, "{}", json)
            .map_err(|e| LayoutError::Message(format!("failed to write record: {e}")))?;

        Ok(())
    }

    /// Read all records from the JSONL file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist, a line can't be read,
    /// or a line fails to parse. Errors name the offending line number.
    pub fn read_all(&self) -> LayoutResult<Vec<EventRecord>> {
        if !self.path.exists() {
            return Err(LayoutError::Message(format!(
                "file not found: {}",
                self.path.display()
            )));
        }

        let file = File::open(&self.path)
            .map_err(|e| LayoutError::Message(format!("failed to open file: {e}")))?;

        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result.map_err(|e| {
                LayoutError::Message(format!("failed to read line {}: {e}", line_num + 1))
            })?;

            // Skip empty lines
            if line.trim().is_empty() {
                continue;
            }

            let record: EventRecord = serde_json::from_str(&line).map_err(|e| {
                LayoutError::Message(format!("failed to parse line {}: {e}", line_num + 1))
            })?;

            records.push(record);
        }

        Ok(records)
    }

    /// Read all records and convert them to runtime events.
    pub fn read_events(&self) -> LayoutResult<Vec<LogEvent>> {
        let records = self.read_all()?;
        let mut events = Vec::with_capacity(records.len());
        for (idx, record) in records.iter().enumerate() {
            let event = record.to_event().map_err(|e| {
                LayoutError::Message(format!("record {}: {e}", idx + 1))
            })?;
            events.push(event);
        }
        Ok(events)
    }

    /// Get the number of records in the file.
    ///
    /// This reads through the entire file to count lines.
    pub fn count(&self) -> LayoutResult<usize> {
        if !self.path.exists() {
            return Ok(0);
        }

        let file = File::open(&self.path)
            .map_err(|e| LayoutError::Message(format!("failed to open file: {e}")))?;

        let reader = BufReader::new(file);
        let count = reader
            .lines()
            .filter_map(|l| l.ok())
            .filter(|l| !l.trim().is_empty())
            .count();

        Ok(count)
    }
}
