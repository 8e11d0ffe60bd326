//! Marker model: typed metadata attached to a log event.
//!
//! A marker signals special rendering treatment for one record. The set of
//! marker kinds is closed: rendering dispatches over [`MarkerKind`] with a
//! total match, so a new kind cannot silently fall through the renderer.
//!
//! Markers form a composite: a marker owns any number of nested reference
//! markers, and [`Marker::contains`] searches the structure pre-order by
//! name. Ownership is by value (no shared pointers between nodes), so the
//! composite is acyclic by construction and the search needs no cycle
//! guard.
//!
//! Exactly one primary semantic applies per event: PROGRESS suppresses the
//! record entirely, STEP renders a full-width milestone row, and the
//! data/html-message/screenshot kinds layer companion content on top of a
//! normal message row.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::escape::escape_html;

/// Stable marker names used by `contains` lookups.
pub mod names {
    pub const STEP: &str = "STEP";
    pub const PROGRESS: &str = "PROGRESS";
    pub const TOOLTIP: &str = "TOOLTIP";
    pub const DATA: &str = "DATA";
    pub const HTML: &str = "HTML";
    pub const HTML_MESSAGE: &str = "HTML_MESSAGE";
    pub const SCREENSHOT: &str = "SCREENSHOT";
}

/// Errors produced while formatting a marker payload.
///
/// The row renderer recovers from these by emitting the error text inline
/// in place of the payload; a failing payload never aborts the row.
#[derive(Debug, Error)]
pub enum MarkerError {
    #[error("payload is not valid UTF-8: {0}")]
    InvalidPayload(#[from] std::string::FromUtf8Error),
    #[error("screenshot could not be written: {0}")]
    Screenshot(String),
}

/// Writes a captured screenshot to storage and reports the `src` path to
/// reference from the report.
///
/// The layout passes its per-instance screenshot sequence number so
/// successive screenshots get distinct file names.
pub trait ScreenshotTaker: Send + Sync {
    fn write_screenshot(&self, index: u32) -> Result<String, MarkerError>;
}

/// A screenshot source backed by an already-captured image file.
#[derive(Debug, Clone)]
pub struct FileScreenshot {
    path: PathBuf,
}

impl FileScreenshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileScreenshot { path: path.into() }
    }
}

impl ScreenshotTaker for FileScreenshot {
    fn write_screenshot(&self, _index: u32) -> Result<String, MarkerError> {
        if self.path.as_os_str().is_empty() {
            return Err(MarkerError::Screenshot("empty screenshot path".to_string()));
        }
        Ok(self.path.to_string_lossy().into_owned())
    }
}

/// A payload-bearing marker: raw text or trusted HTML attached to a record
/// and rendered as a companion row under it.
pub trait PayloadMarker {
    fn has_payload(&self) -> bool;
    /// Produce the payload HTML, escaped or raw per this marker's policy.
    fn formatted_payload(&self) -> Result<String, MarkerError>;
}

/// Plain-data payload. Always HTML-escaped and wrapped in `<pre>`.
#[derive(Debug, Clone)]
pub struct DataMarker {
    payload: DataPayload,
}

#[derive(Debug, Clone)]
enum DataPayload {
    Text(String),
    Bytes(Vec<u8>),
}

impl DataMarker {
    pub fn new(data: impl Into<String>) -> Self {
        DataMarker {
            payload: DataPayload::Text(data.into()),
        }
    }

    /// Attach raw bytes; UTF-8 validation is deferred to render time and a
    /// failure degrades to inline error text.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        DataMarker {
            payload: DataPayload::Bytes(data),
        }
    }
}

impl PayloadMarker for DataMarker {
    fn has_payload(&self) -> bool {
        match &self.payload {
            DataPayload::Text(t) => !t.is_empty(),
            DataPayload::Bytes(b) => !b.is_empty(),
        }
    }

    fn formatted_payload(&self) -> Result<String, MarkerError> {
        let text = match &self.payload {
            DataPayload::Text(t) => t.clone(),
            DataPayload::Bytes(b) => String::from_utf8(b.clone())?,
        };
        Ok(format!("<pre>{}</pre>", escape_html(&text)))
    }
}

/// Trusted-HTML payload. Never escaped: the caller asserts the content is
/// well-formed HTML.
#[derive(Debug, Clone)]
pub struct HtmlMarker {
    html: String,
}

impl HtmlMarker {
    pub fn new(html: impl Into<String>) -> Self {
        HtmlMarker { html: html.into() }
    }
}

impl PayloadMarker for HtmlMarker {
    fn has_payload(&self) -> bool {
        !self.html.is_empty()
    }

    fn formatted_payload(&self) -> Result<String, MarkerError> {
        Ok(self.html.clone())
    }
}

/// Replaces the visible message with a custom HTML format applied to the
/// event's original argument list.
#[derive(Debug, Clone)]
pub struct HtmlMessageMarker {
    format: String,
}

impl HtmlMessageMarker {
    pub fn new(format: impl Into<String>) -> Self {
        HtmlMessageMarker {
            format: format.into(),
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }
}

/// Screenshot reference rendered as an `<img>` companion row.
#[derive(Clone)]
pub struct ScreenshotMarker {
    taker: Arc<dyn ScreenshotTaker>,
}

impl ScreenshotMarker {
    pub fn new(taker: Arc<dyn ScreenshotTaker>) -> Self {
        ScreenshotMarker { taker }
    }

    pub fn write_screenshot(&self, index: u32) -> Result<String, MarkerError> {
        self.taker.write_screenshot(index)
    }
}

impl fmt::Debug for ScreenshotMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenshotMarker").finish_non_exhaustive()
    }
}

/// Closed set of marker kinds.
#[derive(Debug, Clone)]
pub enum MarkerKind {
    Step,
    Progress,
    Tooltip,
    Data(DataMarker),
    Html(HtmlMarker),
    HtmlMessage(HtmlMessageMarker),
    Screenshot(ScreenshotMarker),
}

impl MarkerKind {
    pub fn name(&self) -> &'static str {
        match self {
            MarkerKind::Step => names::STEP,
            MarkerKind::Progress => names::PROGRESS,
            MarkerKind::Tooltip => names::TOOLTIP,
            MarkerKind::Data(_) => names::DATA,
            MarkerKind::Html(_) => names::HTML,
            MarkerKind::HtmlMessage(_) => names::HTML_MESSAGE,
            MarkerKind::Screenshot(_) => names::SCREENSHOT,
        }
    }
}

/// A marker node: one kind plus owned nested references.
#[derive(Debug, Clone)]
pub struct Marker {
    kind: MarkerKind,
    references: Vec<Marker>,
}

impl Marker {
    pub fn new(kind: MarkerKind) -> Self {
        Marker {
            kind,
            references: Vec::new(),
        }
    }

    pub fn step() -> Self {
        Marker::new(MarkerKind::Step)
    }

    pub fn progress() -> Self {
        Marker::new(MarkerKind::Progress)
    }

    pub fn tooltip() -> Self {
        Marker::new(MarkerKind::Tooltip)
    }

    pub fn data(data: impl Into<String>) -> Self {
        Marker::new(MarkerKind::Data(DataMarker::new(data)))
    }

    pub fn data_bytes(data: Vec<u8>) -> Self {
        Marker::new(MarkerKind::Data(DataMarker::from_bytes(data)))
    }

    pub fn html(html: impl Into<String>) -> Self {
        Marker::new(MarkerKind::Html(HtmlMarker::new(html)))
    }

    pub fn html_message(format: impl Into<String>) -> Self {
        Marker::new(MarkerKind::HtmlMessage(HtmlMessageMarker::new(format)))
    }

    pub fn screenshot(taker: Arc<dyn ScreenshotTaker>) -> Self {
        Marker::new(MarkerKind::Screenshot(ScreenshotMarker::new(taker)))
    }

    pub fn kind(&self) -> &MarkerKind {
        &self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn references(&self) -> &[Marker] {
        &self.references
    }

    /// Nest another marker under this one (builder form).
    pub fn with_reference(mut self, reference: Marker) -> Self {
        self.references.push(reference);
        self
    }

    pub fn push_reference(&mut self, reference: Marker) {
        self.references.push(reference);
    }

    /// Pre-order search for a marker name in this node and its references.
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Pre-order search returning the first marker with the given name.
    pub fn find(&self, name: &str) -> Option<&Marker> {
        if self.name() == name {
            return Some(self);
        }
        self.references.iter().find_map(|r| r.find(name))
    }

    /// First payload-bearing marker (data or html) in the chain.
    pub fn find_payload(&self) -> Option<&dyn PayloadMarker> {
        match &self.kind {
            MarkerKind::Data(d) => return Some(d),
            MarkerKind::Html(h) => return Some(h),
            _ => {}
        }
        self.references.iter().find_map(|r| r.find_payload())
    }

    /// First html-message marker in the chain.
    pub fn find_html_message(&self) -> Option<&HtmlMessageMarker> {
        if let MarkerKind::HtmlMessage(m) = &self.kind {
            return Some(m);
        }
        self.references.iter().find_map(|r| r.find_html_message())
    }

    /// First screenshot marker in the chain.
    pub fn find_screenshot(&self) -> Option<&ScreenshotMarker> {
        if let MarkerKind::Screenshot(s) = &self.kind {
            return Some(s);
        }
        self.references.iter().find_map(|r| r.find_screenshot())
    }
}
