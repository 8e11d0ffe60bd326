//! The HTML log-table rendering engine.
//!
//! [`HtmlLayout`] turns one [`LogEvent`] at a time into an HTML fragment:
//! a step row, a message row plus optional data/screenshot companion rows,
//! and an exception block. The framer side emits the file header, the table
//! header (column names derived from the converter chain) and periodic
//! new-table breaks when the row limit is reached.
//!
//! Rendering a single event never fails. Marker payload problems degrade to
//! inline error text, and resource-load problems degrade to the bundled
//! defaults; both emit one `tracing` diagnostic.

pub mod config;
pub mod converter;
pub mod throwable;

use std::path::Path;

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::escape::escape_html;
use crate::event::{format_message, LogEvent};
use crate::layout::config::{Format, LayoutConfig, STYLESHEET_ENV};
use crate::layout::converter::{display_label, parse_pattern, Converter, PatternItem};
use crate::layout::throwable::{HtmlThrowableRenderer, ThrowableRenderer};
use crate::markers::{names, PayloadMarker, ScreenshotMarker};
use crate::LayoutResult;

const BUNDLED_CSS: &str = include_str!("../../assets/htmllog.css");
const BUNDLED_JS: &str = include_str!("../../assets/htmllog.js");

/// Environment property pointing at a directory with `htmllog.css` /
/// `htmllog.js` overrides for the bundled resources.
pub const RESOURCE_DIR_ENV: &str = "REPORT_LAYOUT_RESOURCE_DIR";

/// HTML table layout for log events.
///
/// One instance renders one report. `render` takes `&mut self` because the
/// table-row and screenshot counters are instance state; serialized access
/// is enforced by the borrow rather than left to the caller.
pub struct HtmlLayout {
    config: LayoutConfig,
    items: Vec<PatternItem>,
    throwable_renderer: Box<dyn ThrowableRenderer>,
    /// Rows since the last table header. Drives pagination and row striping
    /// (striping itself is done in CSS so identical events render to
    /// identical fragments); reset by step rows and table breaks.
    row_counter: usize,
    /// Sequence number handed to screenshot markers.
    screenshots_taken: u32,
    session_start: OffsetDateTime,
}

impl HtmlLayout {
    /// Build a layout from its configuration.
    ///
    /// # Errors
    /// Returns a configuration error when the conversion pattern is invalid
    /// or yields no columns; rendering never begins on a bad configuration.
    pub fn new(config: LayoutConfig) -> LayoutResult<Self> {
        let items = parse_pattern(&config.pattern)?;
        Ok(HtmlLayout {
            config,
            items,
            throwable_renderer: Box::new(HtmlThrowableRenderer),
            row_counter: 0,
            screenshots_taken: 0,
            session_start: OffsetDateTime::now_utc(),
        })
    }

    /// Layout with the default configuration.
    pub fn with_defaults() -> Self {
        // The default pattern is a compile-time constant and always parses.
        HtmlLayout::new(LayoutConfig::default()).expect("default pattern must parse")
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Replace the conversion pattern and recompute the column layout.
    pub fn set_pattern(&mut self, pattern: &str) -> LayoutResult<()> {
        self.items = parse_pattern(pattern)?;
        self.config.pattern = pattern.to_string();
        Ok(())
    }

    /// Swap in a different throwable renderer.
    pub fn set_throwable_renderer(&mut self, renderer: Box<dyn ThrowableRenderer>) {
        self.throwable_renderer = renderer;
    }

    /// Pin the session start time shown in table headers.
    pub fn set_session_start(&mut self, ts: OffsetDateTime) {
        self.session_start = ts;
    }

    /// Data-column count: converter-chain length in column mode, 1 in
    /// single-string mode. Always at least 1.
    pub fn column_count(&self) -> usize {
        match self.config.format {
            Format::Column => self.converters().count(),
            Format::SingleString => 1,
        }
    }

    fn converters(&self) -> impl Iterator<Item = &Converter> {
        self.items.iter().filter_map(|item| match item {
            PatternItem::Converter(c) => Some(c),
            PatternItem::Literal(_) => None,
        })
    }

    /// Render one event into an HTML fragment.
    ///
    /// Steps short-circuit everything else; data, screenshot and exception
    /// output are appended to the message row in that fixed order. Events
    /// marked PROGRESS produce an empty fragment.
    pub fn render(&mut self, event: &LogEvent) -> String {
        if event.contains_marker(names::PROGRESS) {
            return String::new();
        }

        let mut buf = String::new();
        self.start_new_table_if_limit_reached(&mut buf);

        if self.is_step(event) {
            self.append_step(&mut buf, event);
            self.row_counter = 0;
            return buf;
        }

        self.append_message_row(&mut buf, event);
        self.row_counter += 1;

        if let Some(payload) = event.marker.as_ref().and_then(|m| m.find_payload()) {
            if payload.has_payload() {
                self.append_data_row(&mut buf, payload);
            }
        }

        if let Some(shot) = event.marker.as_ref().and_then(|m| m.find_screenshot()) {
            self.append_screenshot_row(&mut buf, shot);
        }

        if event.throwable.is_some() {
            self.throwable_renderer
                .render(&mut buf, event, self.column_count());
        }

        buf
    }

    fn is_step(&self, event: &LogEvent) -> bool {
        event.contains_marker(names::STEP) || Some(event.level) == self.config.step_level
    }

    fn append_step(&mut self, buf: &mut String, event: &LogEvent) {
        buf.push('\n');
        buf.push_str("<tr class=\"record step\">\n");
        buf.push_str(&format!("<th colspan=\"{}\">", self.column_count() + 1));

        let message = event.formatted_message();
        if event.contains_marker(names::HTML) || event.contains_marker(names::HTML_MESSAGE) {
            buf.push_str(&message);
        } else {
            buf.push_str(&escape_html(&message));
        }

        buf.push_str("</th>\n</tr>");
    }

    fn append_message_row(&mut self, buf: &mut String, event: &LogEvent) {
        buf.push('\n');
        buf.push_str("<tr class=\"record\">\n");
        buf.push_str("<td></td>\n");

        // An HTML_MESSAGE marker swaps in its own format applied to the
        // event's original argument list; the event itself stays untouched.
        let override_message = event
            .marker
            .as_ref()
            .and_then(|m| m.find_html_message())
            .map(|m| format_message(m.format(), &event.args));
        let escape_cells = override_message.is_none();
        let message = override_message.unwrap_or_else(|| event.formatted_message());

        match self.config.format {
            Format::Column => {
                for c in self.converters() {
                    let name = c.name();
                    let text = c.convert(event, &message);
                    buf.push_str("<td class=\"");
                    buf.push_str(&name);
                    if matches!(c, Converter::Level) {
                        buf.push(' ');
                        buf.push_str(event.level.css_class());
                    }
                    buf.push_str("\">");
                    if escape_cells {
                        buf.push_str(&escape_html(&text));
                    } else {
                        buf.push_str(&text);
                    }
                    buf.push_str("</td>\n");
                }
            }
            Format::SingleString => {
                let mut text = String::new();
                for item in &self.items {
                    match item {
                        PatternItem::Literal(l) => text.push_str(l),
                        PatternItem::Converter(c) => text.push_str(&c.convert(event, &message)),
                    }
                }
                buf.push_str("<td class=\"Message\">");
                if escape_cells {
                    buf.push_str(&escape_html(&text));
                } else {
                    buf.push_str(&text);
                }
                buf.push_str("</td>\n");
            }
        }

        buf.push_str("</tr>");
    }

    fn append_data_row(&mut self, buf: &mut String, payload: &dyn PayloadMarker) {
        buf.push('\n');
        buf.push_str("<tr class=\"companion\">\n");
        buf.push_str(&format!(
            "<td class=\"indent\"></td><td colspan=\"{}\" class=\"output\">\n",
            self.column_count()
        ));

        match payload.formatted_payload() {
            Ok(html) => buf.push_str(&html),
            Err(e) => {
                tracing::debug!("marker payload formatting failed: {e}");
                buf.push_str(&escape_html(&e.to_string()));
            }
        }

        buf.push_str("\n</td>\n</tr>");
    }

    fn append_screenshot_row(&mut self, buf: &mut String, shot: &ScreenshotMarker) {
        buf.push('\n');
        buf.push_str("<tr class=\"companion\">\n");
        buf.push_str(&format!(
            "<td class=\"indent\"></td><td colspan=\"{}\">",
            self.column_count()
        ));

        match shot.write_screenshot(self.screenshots_taken) {
            Ok(src) => {
                buf.push_str(&format!(
                    "<img src=\"{}\" class=\"screenshot\"/>",
                    escape_html(&src)
                ));
                self.screenshots_taken += 1;
            }
            Err(e) => {
                tracing::debug!("screenshot could not be captured: {e}");
                buf.push_str(&escape_html(&e.to_string()));
            }
        }

        buf.push_str("</td>\n</tr>");
    }

    fn start_new_table_if_limit_reached(&mut self, buf: &mut String) {
        let Some(limit) = self.config.max_rows_per_table else {
            return;
        };
        if self.row_counter >= limit {
            buf.push_str(&self.table_footer());
            buf.push_str(&self.table_header());
            self.row_counter = 0;
        }
    }

    /// Document head: doctype, title, optional external stylesheet link and
    /// the bundled default stylesheet/script.
    pub fn file_header(&self) -> String {
        let mut buf = String::with_capacity(4 * 1024);
        buf.push_str(
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict//EN\" \
             \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd\">\n",
        );
        buf.push_str("<html>\n  <head>\n");
        buf.push_str(&format!(
            "    <title>{}</title>\n",
            escape_html(&self.config.title)
        ));

        if let Some(href) = self.resolve_stylesheet() {
            buf.push_str(&format!(
                "    <link rel=\"stylesheet\" type=\"text/css\" href=\"{}\"/>\n",
                escape_html(&href)
            ));
        }

        buf.push_str("<style type=\"text/css\">\n");
        buf.push_str(&load_resource("htmllog.css", BUNDLED_CSS));
        buf.push_str("</style>\n");
        buf.push_str("<script type=\"text/javascript\">\n");
        buf.push_str(&load_resource("htmllog.js", BUNDLED_JS));
        buf.push_str("</script>\n");
        buf.push_str("  </head>\n<body>\n");

        // Hook element for the screenshot popup script.
        buf.push_str("<img id=\"ScreenshotPopup\" class=\"screenshot\" />\n");
        buf
    }

    /// Table opener: session line, `<table>`, `<thead>` with the fixed
    /// leading "Row" cell plus one header cell per column, then `<tbody>`.
    pub fn table_header(&self) -> String {
        let mut buf = String::new();
        let started = self
            .session_start
            .format(&Rfc3339)
            .unwrap_or_default();
        buf.push_str(&format!(
            "<h1>Log session start time {}</h1><p></p>\n\n",
            escape_html(&started)
        ));
        buf.push_str("<table>\n<thead>\n");
        buf.push_str("<tr><th class=\"Row\">Row</th>\n");

        match self.config.format {
            Format::Column => {
                for c in self.converters() {
                    let name = c.name();
                    buf.push_str(&format!(
                        "<th class=\"{}\">{}</th>\n",
                        name,
                        display_label(&name)
                    ));
                }
            }
            Format::SingleString => {
                buf.push_str("<th>Message</th>\n");
            }
        }

        buf.push_str("</tr>\n</thead>\n<tbody>\n");
        buf
    }

    pub fn table_footer(&self) -> String {
        "\n</tbody>\n</table>\n".to_string()
    }

    pub fn file_footer(&self) -> String {
        "</body>\n</html>\n".to_string()
    }

    fn resolve_stylesheet(&self) -> Option<String> {
        if let Some(href) = &self.config.stylesheet {
            if !href.is_empty() {
                return Some(href.clone());
            }
        }
        std::env::var(STYLESHEET_ENV).ok().filter(|s| !s.is_empty())
    }
}

/// Read a resource override from the configured directory, degrading to the
/// bundled copy on any failure.
fn load_resource(file_name: &str, bundled: &'static str) -> String {
    let Ok(dir) = std::env::var(RESOURCE_DIR_ENV) else {
        return bundled.to_string();
    };
    let path = Path::new(&dir).join(file_name);
    match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("failed to read resource override {}: {e}", path.display());
            bundled.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Level, ThrowableInfo};
    use crate::markers::{Marker, MarkerError, ScreenshotTaker};
    use std::sync::Arc;
    use time::macros::datetime;

    fn layout_with(pattern: &str) -> HtmlLayout {
        HtmlLayout::new(LayoutConfig {
            pattern: pattern.to_string(),
            ..LayoutConfig::default()
        })
        .unwrap()
    }

    fn info_event(message: &str) -> LogEvent {
        LogEvent::new(Level::Info, "suite.Test", message).at(datetime!(2026-01-15 12:00:00 UTC))
    }

    #[test]
    fn test_progress_renders_nothing() {
        let mut layout = HtmlLayout::with_defaults();
        let event = info_event("suite 3 of 7").with_marker(Marker::progress());
        assert_eq!(layout.render(&event), "");
    }

    #[test]
    fn test_progress_wins_over_other_markers() {
        let mut layout = HtmlLayout::with_defaults();
        let event = info_event("ignored")
            .with_marker(Marker::progress().with_reference(Marker::data("payload")));
        assert_eq!(layout.render(&event), "");
    }

    #[test]
    fn test_step_row_spans_all_columns() {
        let mut layout = layout_with("%date%level%message");
        let event = info_event("Given a logged-in user").with_marker(Marker::step());
        let html = layout.render(&event);

        assert!(html.contains("<tr class=\"record step\">"));
        assert!(html.contains("<th colspan=\"4\">Given a logged-in user</th>"));
        assert!(!html.contains("<td"));
    }

    #[test]
    fn test_step_by_level_threshold() {
        let mut layout = HtmlLayout::new(LayoutConfig {
            step_level: Some(Level::Info),
            ..LayoutConfig::default()
        })
        .unwrap();
        let html = layout.render(&info_event("phase boundary"));
        assert!(html.contains("record step"));
    }

    #[test]
    fn test_step_resets_row_counter() {
        let mut layout = HtmlLayout::new(LayoutConfig {
            max_rows_per_table: Some(2),
            ..LayoutConfig::default()
        })
        .unwrap();

        layout.render(&info_event("one"));
        layout.render(&info_event("step").with_marker(Marker::step()));
        let third = layout.render(&info_event("two"));
        let fourth = layout.render(&info_event("three"));

        // The step reset the row counter, so no break happens yet.
        assert!(!third.contains("</table>"));
        assert!(!fourth.contains("</table>"));
    }

    #[test]
    fn test_step_skips_companions_and_exception() {
        let mut layout = HtmlLayout::with_defaults();
        let event = info_event("milestone")
            .with_marker(Marker::step().with_reference(Marker::data("payload")))
            .with_throwable(ThrowableInfo::new("ignored"));
        let html = layout.render(&event);

        assert!(html.contains("record step"));
        assert!(!html.contains("companion"));
        assert!(!html.contains("Exception"));
    }

    #[test]
    fn test_normal_message_is_escaped() {
        let mut layout = HtmlLayout::with_defaults();
        let html = layout.render(&info_event("<b>x</b>"));
        assert!(html.contains("&lt;b&gt;x&lt;/b&gt;"));
        assert!(!html.contains("<b>x</b>"));
    }

    #[test]
    fn test_message_row_scenario_hello_world() {
        let mut layout = HtmlLayout::with_defaults();
        let event = info_event("Hello {}").with_args(vec!["World".to_string()]);
        let html = layout.render(&event);

        assert!(html.contains("<tr class=\"record\">"));
        assert!(html.contains(">Hello World</td>"));
        assert!(html.contains("<td class=\"Level info\">INFO</td>"));
    }

    #[test]
    fn test_level_cell_classes_match_bundled_highlight_rules() {
        let mut layout = HtmlLayout::with_defaults();
        let event = LogEvent::new(Level::Warn, "suite.Test", "slow response")
            .at(datetime!(2026-01-15 12:00:00 UTC));
        let html = layout.render(&event);

        // The warn/error highlight lives on the level cell, and the bundled
        // stylesheet must target exactly that class pair.
        assert!(html.contains("<td class=\"Level warn\">WARN</td>"));
        assert!(BUNDLED_CSS.contains("td.Level.warn, td.Level.error"));
    }

    #[test]
    fn test_html_message_marker_substitutes_unescaped() {
        let mut layout = HtmlLayout::with_defaults();
        let event = info_event("plain {}")
            .with_args(vec!["value".to_string()])
            .with_marker(Marker::html_message("formatted <b>{}</b>"));
        let before = event.message.clone();
        let html = layout.render(&event);

        assert!(html.contains("formatted <b>value</b>"));
        assert!(!html.contains("plain value"));
        // The event itself is untouched by the substitution.
        assert_eq!(event.message, before);
        assert_eq!(event.args, vec!["value".to_string()]);
    }

    #[test]
    fn test_data_companion_row_follows_message_row() {
        let mut layout = layout_with("%date%level%message");
        let event = info_event("request sent").with_marker(Marker::data("GET /login"));
        let html = layout.render(&event);

        let record_pos = html.find("<tr class=\"record\">").unwrap();
        let companion_pos = html.find("<tr class=\"companion\">").unwrap();
        assert!(record_pos < companion_pos);
        assert!(html.contains("<td class=\"indent\"></td><td colspan=\"3\" class=\"output\">"));
        assert!(html.contains("<pre>GET /login</pre>"));
    }

    #[test]
    fn test_data_companion_escapes_per_marker_policy() {
        let mut layout = HtmlLayout::with_defaults();
        let escaped = layout.render(&info_event("d").with_marker(Marker::data("<x>")));
        assert!(escaped.contains("<pre>&lt;x&gt;</pre>"));

        let raw = layout.render(&info_event("h").with_marker(Marker::html("<em>ok</em>")));
        assert!(raw.contains("<em>ok</em>"));
    }

    #[test]
    fn test_data_payload_failure_degrades_to_error_text() {
        let mut layout = HtmlLayout::with_defaults();
        let event = info_event("binary dump")
            .with_marker(Marker::data_bytes(vec![0xff, 0xfe]));
        let html = layout.render(&event);

        assert!(html.contains("<tr class=\"companion\">"));
        assert!(html.contains("not valid UTF-8"));
    }

    #[test]
    fn test_empty_data_payload_emits_no_companion() {
        let mut layout = HtmlLayout::with_defaults();
        let html = layout.render(&info_event("m").with_marker(Marker::data("")));
        assert!(!html.contains("companion"));
    }

    struct FailingShot;
    impl ScreenshotTaker for FailingShot {
        fn write_screenshot(&self, _index: u32) -> Result<String, MarkerError> {
            Err(MarkerError::Screenshot("device gone".to_string()))
        }
    }

    struct CountingShot;
    impl ScreenshotTaker for CountingShot {
        fn write_screenshot(&self, index: u32) -> Result<String, MarkerError> {
            Ok(format!("screenshot-{index}.png"))
        }
    }

    #[test]
    fn test_screenshot_counter_names_sequential_files() {
        let mut layout = HtmlLayout::with_defaults();
        let first = layout.render(
            &info_event("one").with_marker(Marker::screenshot(Arc::new(CountingShot))),
        );
        let second = layout.render(
            &info_event("two").with_marker(Marker::screenshot(Arc::new(CountingShot))),
        );

        assert!(first.contains("<img src=\"screenshot-0.png\" class=\"screenshot\"/>"));
        assert!(second.contains("<img src=\"screenshot-1.png\" class=\"screenshot\"/>"));
    }

    #[test]
    fn test_screenshot_failure_shows_error_and_keeps_counter() {
        let mut layout = HtmlLayout::with_defaults();
        let failed = layout.render(
            &info_event("bad").with_marker(Marker::screenshot(Arc::new(FailingShot))),
        );
        assert!(failed.contains("device gone"));
        assert!(!failed.contains("<img"));

        // A failed capture must not consume a sequence number.
        let ok = layout.render(
            &info_event("good").with_marker(Marker::screenshot(Arc::new(CountingShot))),
        );
        assert!(ok.contains("screenshot-0.png"));
    }

    #[test]
    fn test_exception_rendered_after_companions() {
        let mut layout = layout_with("%date%level%message");
        let event = info_event("failed")
            .with_marker(Marker::data("context"))
            .with_throwable(ThrowableInfo::new("assertion failed"));
        let html = layout.render(&event);

        let data_pos = html.find("class=\"output\"").unwrap();
        let exc_pos = html.find("class=\"Exception\"").unwrap();
        assert!(data_pos < exc_pos);
        assert!(html.contains("colspan=\"4\">assertion failed"));
    }

    #[test]
    fn test_column_count_and_header_for_three_column_pattern() {
        let layout = layout_with("%date%level%message");
        assert_eq!(layout.column_count(), 3);

        let header = layout.table_header();
        assert!(header.contains("<th class=\"Row\">Row</th>"));
        assert_eq!(header.matches("<th class=\"").count(), 4);
        assert!(header.contains("<th class=\"Date\">Date</th>"));
        assert!(header.contains("<th class=\"Level\">Level</th>"));
        assert!(header.contains("<th class=\"Message\">Message</th>"));
    }

    #[test]
    fn test_header_mdc_column_named_by_key() {
        let layout = layout_with("%mdc{TestName}%message");
        let header = layout.table_header();
        assert!(header.contains("<th class=\"TestName\">Test&nbsp;Name</th>"));
    }

    #[test]
    fn test_single_string_mode_single_cell() {
        let mut layout = HtmlLayout::new(LayoutConfig {
            pattern: "%level %message".to_string(),
            format: Format::SingleString,
            ..LayoutConfig::default()
        })
        .unwrap();
        assert_eq!(layout.column_count(), 1);

        let header = layout.table_header();
        assert!(header.contains("<th>Message</th>"));

        let html = layout.render(&info_event("hi"));
        assert!(html.contains("<td class=\"Message\">INFO hi</td>"));
    }

    #[test]
    fn test_row_limit_breaks_table_between_events() {
        let mut layout = HtmlLayout::new(LayoutConfig {
            max_rows_per_table: Some(2),
            ..LayoutConfig::default()
        })
        .unwrap();

        let first = layout.render(&info_event("one"));
        let second = layout.render(&info_event("two"));
        let third = layout.render(&info_event("three"));

        assert!(!first.contains("</table>"));
        assert!(!second.contains("</table>"));
        // The break sits before the third row's content.
        assert_eq!(third.matches("</table>").count(), 1);
        assert!(third.contains("<thead>"));
        assert!(third.find("</table>").unwrap() < third.find("<tr class=\"record\">").unwrap());
    }

    #[test]
    fn test_render_is_idempotent_for_same_event() {
        let event = info_event("same input");
        let mut layout = HtmlLayout::with_defaults();
        let first = layout.render(&event);
        let second = layout.render(&event);
        assert_eq!(first, second);
    }

    #[test]
    fn test_set_pattern_recomputes_columns() {
        let mut layout = layout_with("%date%level%message");
        assert_eq!(layout.column_count(), 3);
        layout.set_pattern("%level%message").unwrap();
        assert_eq!(layout.column_count(), 2);
        assert!(layout.set_pattern("%nope").is_err());
    }

    #[test]
    fn test_invalid_pattern_is_fatal_at_startup() {
        let result = HtmlLayout::new(LayoutConfig {
            pattern: "no converters here".to_string(),
            ..LayoutConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_file_header_structure() {
        let layout = HtmlLayout::new(LayoutConfig {
            title: "Suite & Run".to_string(),
            stylesheet: Some("custom.css".to_string()),
            ..LayoutConfig::default()
        })
        .unwrap();
        let header = layout.file_header();

        assert!(header.starts_with("<!DOCTYPE html"));
        assert!(header.contains("<title>Suite &amp; Run</title>"));
        assert!(header.contains("href=\"custom.css\""));
        assert!(header.contains("<style type=\"text/css\">"));
        assert!(header.contains("<script type=\"text/javascript\">"));
        assert!(header.contains("id=\"ScreenshotPopup\""));
    }

    #[test]
    fn test_footers_close_document() {
        let layout = HtmlLayout::with_defaults();
        assert!(layout.table_footer().contains("</table>"));
        assert!(layout.file_footer().contains("</html>"));
    }
}
