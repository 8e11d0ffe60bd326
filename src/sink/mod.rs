//! Append-only HTML report sink.
//!
//! An [`HtmlLogSink`] owns one destination file (typically one per test
//! case) and a layout instance. Opening the sink writes the document and
//! table headers; each appended event becomes one rendered fragment, in
//! call order; closing writes the footers. Dropping an unclosed sink
//! closes it best-effort.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::event::LogEvent;
use crate::layout::HtmlLayout;
use crate::LayoutResult;

pub struct HtmlLogSink {
    path: PathBuf,
    writer: BufWriter<File>,
    layout: HtmlLayout,
    closed: bool,
}

impl HtmlLogSink {
    /// Create the report file (and its parent directories) and write the
    /// document and table headers.
    pub fn create(path: impl AsRef<Path>, layout: HtmlLayout) -> LayoutResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(&path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(layout.file_header().as_bytes())?;
        writer.write_all(layout.table_header().as_bytes())?;

        Ok(HtmlLogSink {
            path,
            writer,
            layout,
            closed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn layout(&self) -> &HtmlLayout {
        &self.layout
    }

    pub fn layout_mut(&mut self) -> &mut HtmlLayout {
        &mut self.layout
    }

    /// Render one event and append the fragment to the file.
    pub fn append(&mut self, event: &LogEvent) -> LayoutResult<()> {
        let fragment = self.layout.render(event);
        if !fragment.is_empty() {
            self.writer.write_all(fragment.as_bytes())?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> LayoutResult<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Write the table and document footers and flush.
    pub fn close(mut self) -> LayoutResult<()> {
        self.finish()
    }

    fn finish(&mut self) -> LayoutResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.writer.write_all(self.layout.table_footer().as_bytes())?;
        self.writer.write_all(self.layout.file_footer().as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}

impl Drop for HtmlLogSink {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.finish() {
                tracing::warn!("failed to close report sink {}: {e}", self.path.display());
            }
        }
    }
}
