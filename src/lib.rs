#![forbid(unsafe_code)]

//! HTML table layout for structured test-execution logs.
//!
//! This crate renders a stream of log events (steps, messages, exceptions,
//! screenshots, data payloads) into an HTML report table. Call sites attach
//! semantic metadata to individual records through markers; the layout
//! inspects the marker chain and decides how each row is rendered.
//!
//! The main pieces:
//! - [`event::LogEvent`]: one structured log record
//! - [`markers::Marker`]: metadata attached to a record (step, data, html,
//!   screenshot, tooltip, progress)
//! - [`layout::HtmlLayout`]: the rendering engine (row renderer + framer)
//! - [`sink::HtmlLogSink`]: append-only per-report file destination
//! - [`logger::ReportLogger`]: convenience front door for test code

pub mod escape;
pub mod event;
pub mod layout;
pub mod logger;
pub mod markers;
pub mod render_cmd;
pub mod sink;
pub mod storage;

use thiserror::Error;

/// Errors raised by layout configuration and the report sink.
///
/// Rendering a single event never fails: payload and resource problems
/// degrade to inline error text in the report instead.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// Invalid layout configuration; rendering never begins.
    #[error("layout configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

pub type LayoutResult<T> = Result<T, LayoutError>;

pub use event::{Level, LogEvent, ThrowableInfo};
pub use layout::config::{Format, LayoutConfig, DEFAULT_CONVERSION_PATTERN};
pub use layout::throwable::{HtmlThrowableRenderer, ThrowableRenderer};
pub use layout::HtmlLayout;
pub use logger::{BufferedEntry, ReportLogger};
pub use markers::{FileScreenshot, Marker, MarkerError, ScreenshotTaker};
pub use sink::HtmlLogSink;
pub use storage::{EventRecord, JsonlEventLog, MarkerRecord};
