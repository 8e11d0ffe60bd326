//! `render` command: replay a recorded JSONL event stream into an HTML
//! report file.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;

use crate::event::Level;
use crate::layout::config::{LayoutConfig, load_config};
use crate::layout::HtmlLayout;
use crate::sink::HtmlLogSink;
use crate::storage::JsonlEventLog;

pub fn run(
    input: PathBuf,
    output: PathBuf,
    config: Option<PathBuf>,
    pattern: Option<String>,
    title: Option<String>,
    stylesheet: Option<String>,
    row_limit: Option<usize>,
    step_level: Option<String>,
) -> anyhow::Result<()> {
    let mut cfg = match config {
        Some(path) => load_config(&path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => LayoutConfig::default(),
    };

    if let Some(pattern) = pattern {
        cfg.pattern = pattern;
    }
    if let Some(title) = title {
        cfg.title = title;
    }
    if let Some(stylesheet) = stylesheet {
        cfg.stylesheet = Some(stylesheet);
    }
    if let Some(limit) = row_limit {
        cfg.max_rows_per_table = Some(limit);
    }
    if let Some(level) = step_level {
        let level = Level::from_str(&level)
            .map_err(|e| anyhow::anyhow!("invalid --step-level: {e}"))?;
        cfg.step_level = Some(level);
    }

    let events = JsonlEventLog::new(&input)
        .read_events()
        .with_context(|| format!("failed to read events from {}", input.display()))?;
    tracing::info!("read {} events from {}", events.len(), input.display());

    let mut layout = HtmlLayout::new(cfg)?;
    if let Some(first) = events.first() {
        layout.set_session_start(first.timestamp);
    }

    let mut sink = HtmlLogSink::create(&output, layout)
        .with_context(|| format!("failed to create report {}", output.display()))?;
    for event in &events {
        sink.append(event)?;
    }
    sink.close()?;
    tracing::info!("wrote report to {}", output.display());

    Ok(())
}
