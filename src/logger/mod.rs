//! High-level logging facade over an [`HtmlLogSink`].
//!
//! A [`ReportLogger`] is the per-test entry point: shorthand methods for
//! plain-level rows, step and progress helpers, and a fluent
//! [`EntryBuilder`] for events that carry payloads. Builders either write
//! immediately or detach into a [`BufferedEntry`] that the caller writes
//! (or discards) later.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::event::{Level, LogEvent, ThrowableInfo};
use crate::layout::HtmlLayout;
use crate::markers::{Marker, ScreenshotTaker};
use crate::sink::HtmlLogSink;
use crate::LayoutResult;

pub struct ReportLogger {
    name: String,
    sink: HtmlLogSink,
}

impl ReportLogger {
    /// Open a report file at `path` and log under `name`.
    pub fn create(
        name: impl Into<String>,
        path: impl AsRef<Path>,
        layout: HtmlLayout,
    ) -> LayoutResult<Self> {
        Ok(ReportLogger {
            name: name.into(),
            sink: HtmlLogSink::create(path, layout)?,
        })
    }

    /// Wrap an already-opened sink.
    pub fn new(name: impl Into<String>, sink: HtmlLogSink) -> Self {
        ReportLogger {
            name: name.into(),
            sink,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sink_mut(&mut self) -> &mut HtmlLogSink {
        &mut self.sink
    }

    /// Start building an event at the given level.
    pub fn entry(&mut self, level: Level, message: impl Into<String>) -> EntryBuilder<'_> {
        EntryBuilder {
            logger: self,
            level,
            message: message.into(),
            args: Vec::new(),
            mdc: BTreeMap::new(),
            marker: None,
            throwable: None,
        }
    }

    pub fn trace(&mut self, message: impl Into<String>) -> LayoutResult<()> {
        self.entry(Level::Trace, message).write()
    }

    pub fn debug(&mut self, message: impl Into<String>) -> LayoutResult<()> {
        self.entry(Level::Debug, message).write()
    }

    pub fn info(&mut self, message: impl Into<String>) -> LayoutResult<()> {
        self.entry(Level::Info, message).write()
    }

    pub fn warn(&mut self, message: impl Into<String>) -> LayoutResult<()> {
        self.entry(Level::Warn, message).write()
    }

    pub fn error(&mut self, message: impl Into<String>) -> LayoutResult<()> {
        self.entry(Level::Error, message).write()
    }

    /// Write a step row that opens a new visual section.
    pub fn step(&mut self, title: impl Into<String>) -> LayoutResult<()> {
        self.entry(Level::Info, title).step().write()
    }

    /// Progress messages never reach the report; they go to the console
    /// stream so a watcher can follow a long run.
    pub fn progress(&mut self, message: impl Into<String>) -> LayoutResult<()> {
        let message = message.into();
        tracing::info!(logger = %self.name, "{message}");
        self.entry(Level::Info, message).progress().write()
    }

    /// Tooltip entries render as ordinary debug rows; a downstream report
    /// processor can pick them out by marker.
    pub fn tooltip(&mut self, message: impl Into<String>) -> LayoutResult<()> {
        self.entry(Level::Debug, message).tooltip().write()
    }

    /// Render a fully built event.
    pub fn write_entry(&mut self, event: &LogEvent) -> LayoutResult<()> {
        self.sink.append(event)
    }

    /// Close the underlying report file.
    pub fn close(self) -> LayoutResult<()> {
        self.sink.close()
    }
}

/// Fluent builder for one report entry.
///
/// Terminal calls are [`write`](EntryBuilder::write), which renders the
/// event now, and [`buffer`](EntryBuilder::buffer), which detaches the
/// event for a later decision.
pub struct EntryBuilder<'a> {
    logger: &'a mut ReportLogger,
    level: Level,
    message: String,
    args: Vec<String>,
    mdc: BTreeMap<String, String>,
    marker: Option<Marker>,
    throwable: Option<ThrowableInfo>,
}

impl<'a> EntryBuilder<'a> {
    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn args(mut self, values: impl IntoIterator<Item = String>) -> Self {
        self.args.extend(values);
        self
    }

    pub fn mdc(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.mdc.insert(key.into(), value.into());
        self
    }

    pub fn step(self) -> Self {
        self.attach(Marker::step())
    }

    pub fn progress(self) -> Self {
        self.attach(Marker::progress())
    }

    pub fn tooltip(self) -> Self {
        self.attach(Marker::tooltip())
    }

    /// Attach a monospaced data block shown under the message row.
    pub fn data(self, text: impl Into<String>) -> Self {
        self.attach(Marker::data(text))
    }

    pub fn data_bytes(self, bytes: Vec<u8>) -> Self {
        self.attach(Marker::data_bytes(bytes))
    }

    /// Attach a raw HTML block shown under the message row.
    pub fn html(self, html: impl Into<String>) -> Self {
        self.attach(Marker::html(html))
    }

    /// Replace the message cell with an HTML rendering of `format`,
    /// substituting this entry's arguments.
    pub fn html_message(self, format: impl Into<String>) -> Self {
        self.attach(Marker::html_message(format))
    }

    pub fn screenshot(self, taker: Arc<dyn ScreenshotTaker>) -> Self {
        self.attach(Marker::screenshot(taker))
    }

    pub fn throwable(mut self, throwable: ThrowableInfo) -> Self {
        self.throwable = Some(throwable);
        self
    }

    fn attach(mut self, marker: Marker) -> Self {
        match self.marker.take() {
            Some(existing) => self.marker = Some(existing.with_reference(marker)),
            None => self.marker = Some(marker),
        }
        self
    }

    fn build(self) -> (&'a mut ReportLogger, LogEvent) {
        let EntryBuilder {
            logger,
            level,
            message,
            args,
            mdc,
            marker,
            throwable,
        } = self;
        let mut event = LogEvent::new(level, logger.name.clone(), message).with_args(args);
        for (key, value) in mdc {
            event = event.with_mdc(key, value);
        }
        if let Some(marker) = marker {
            event = event.with_marker(marker);
        }
        if let Some(throwable) = throwable {
            event = event.with_throwable(throwable);
        }
        (logger, event)
    }

    /// Render the entry into the report now.
    pub fn write(self) -> LayoutResult<()> {
        let (logger, event) = self.build();
        logger.write_entry(&event)
    }

    /// Detach the entry without writing it. The caller decides later
    /// whether it reaches the report.
    pub fn buffer(self) -> BufferedEntry {
        let (_, event) = self.build();
        BufferedEntry { event }
    }
}

/// A fully built entry whose fate is not yet decided.
///
/// Typical use: capture a screenshot entry during an assertion, then
/// write it only if the assertion fails and discard it otherwise.
#[derive(Debug, Clone)]
pub struct BufferedEntry {
    event: LogEvent,
}

impl BufferedEntry {
    pub fn from_event(event: LogEvent) -> Self {
        BufferedEntry { event }
    }

    pub fn event(&self) -> &LogEvent {
        &self.event
    }

    /// Write the buffered entry to the given logger's report.
    pub fn write(self, logger: &mut ReportLogger) -> LayoutResult<()> {
        logger.write_entry(&self.event)
    }

    /// Drop the entry without writing it.
    pub fn discard(self) {}
}
