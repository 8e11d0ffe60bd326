//! HTML report snapshot tests for determinism and structure.
//!
//! These tests verify that report generation is:
//! - Deterministic (same input produces identical output)
//! - Contains the expected table structure
//! - Properly escapes user-controlled content

use std::sync::Arc;

use report_layout::markers::Marker;
use report_layout::{FileScreenshot, HtmlLayout, LayoutConfig, Level, LogEvent, ThrowableInfo};
use time::macros::datetime;

/// Create a fixed stream of events for snapshot testing.
fn make_fixed_events() -> Vec<LogEvent> {
    let t0 = datetime!(2026-01-15 12:00:00 UTC);
    vec![
        LogEvent::new(Level::Info, "suite.LoginTest", "Login")
            .at(t0)
            .with_marker(Marker::step()),
        LogEvent::new(Level::Info, "suite.LoginTest", "opening {}")
            .at(t0 + time::Duration::seconds(1))
            .with_args(vec!["https://example.test/login".to_string()]),
        LogEvent::new(Level::Warn, "suite.LoginTest", "slow response")
            .at(t0 + time::Duration::seconds(2))
            .with_marker(Marker::data("GET /login HTTP/1.1\nHost: example.test")),
        LogEvent::new(Level::Error, "suite.LoginTest", "assertion failed")
            .at(t0 + time::Duration::seconds(3))
            .with_marker(Marker::screenshot(Arc::new(FileScreenshot::new(
                "screenshots/shot-0.png",
            ))))
            .with_throwable(
                ThrowableInfo::new("expected title 'Home'").with_frames(vec![
                    "at suite.LoginTest.checkTitle".to_string(),
                    "at suite.LoginTest.run".to_string(),
                ]),
            ),
    ]
}

fn render_all(layout: &mut HtmlLayout, events: &[LogEvent]) -> String {
    let mut out = String::new();
    out.push_str(&layout.table_header());
    for event in events {
        out.push_str(&layout.render(event));
    }
    out.push_str(&layout.table_footer());
    out
}

fn fixed_layout() -> HtmlLayout {
    let mut layout = HtmlLayout::with_defaults();
    layout.set_session_start(datetime!(2026-01-15 12:00:00 UTC));
    layout
}

#[test]
fn test_report_output_determinism() {
    let events = make_fixed_events();

    let html1 = render_all(&mut fixed_layout(), &events);
    let html2 = render_all(&mut fixed_layout(), &events);

    assert_eq!(html1, html2, "report output should be deterministic");
}

#[test]
fn test_report_contains_expected_structure() {
    let events = make_fixed_events();
    let html = render_all(&mut fixed_layout(), &events);

    assert!(html.contains("<table>"), "should open the table");
    assert!(html.contains("<thead>"), "should contain the header block");
    assert!(
        html.contains(r#"<th class="Row">Row</th>"#),
        "should contain the fixed Row header cell"
    );
    assert!(
        html.contains(r#"<tr class="record step">"#),
        "should render the step row"
    );
    assert!(
        html.contains(r#"<th colspan="5">Login</th>"#),
        "step row should span all five columns of the default pattern"
    );
    assert!(
        html.contains("opening https://example.test/login"),
        "should substitute message arguments"
    );
    assert!(
        html.contains(r#"<tr class="companion">"#),
        "should render companion rows"
    );
    assert!(
        html.contains("GET /login HTTP/1.1"),
        "should contain the data payload"
    );
    assert!(
        html.contains(r#"<img src="screenshots/shot-0.png" class="screenshot"/>"#),
        "should embed the screenshot thumbnail"
    );
    assert!(
        html.contains(r#"<td class="Exception""#),
        "should render the exception block"
    );
    assert!(
        html.contains("expected title &#39;Home&#39;"),
        "exception message should be escaped"
    );
}

#[test]
fn test_file_header_embeds_styles_and_script() {
    let layout = fixed_layout();
    let header = layout.file_header();

    assert!(
        header.starts_with("<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Strict//EN\""),
        "should start with the XHTML strict doctype"
    );
    assert!(header.contains("<style type=\"text/css\">"));
    assert!(header.contains("tr.record"), "should embed the bundled CSS");
    assert!(header.contains("<script type=\"text/javascript\">"));
    assert!(
        header.contains("ScreenshotPopup"),
        "should embed the popup script and its hook element"
    );
}

#[test]
fn test_report_escapes_dangerous_content() {
    let event = LogEvent::new(
        Level::Info,
        "suite.Test",
        "<script>alert('xss')</script>",
    )
    .at(datetime!(2026-01-15 12:00:00 UTC));

    let html = render_all(&mut fixed_layout(), &[event]);

    assert!(
        !html.contains("<script>alert"),
        "should escape script tags in message content"
    );
    assert!(html.contains("&lt;script&gt;alert"));
}

#[test]
fn test_html_message_marker_is_not_escaped() {
    let event = LogEvent::new(Level::Info, "suite.Test", "clicked button")
        .at(datetime!(2026-01-15 12:00:00 UTC))
        .with_args(vec!["Submit".to_string()])
        .with_marker(Marker::html_message("clicked <b>{}</b>"));

    let html = render_all(&mut fixed_layout(), &[event]);

    assert!(
        html.contains("clicked <b>Submit</b>"),
        "html_message format should render raw with substituted args"
    );
}

#[test]
fn test_custom_pattern_drives_columns() {
    let mut layout = HtmlLayout::new(LayoutConfig {
        pattern: "%level%message".to_string(),
        ..LayoutConfig::default()
    })
    .unwrap();
    layout.set_session_start(datetime!(2026-01-15 12:00:00 UTC));

    assert_eq!(layout.column_count(), 2);

    let header = layout.table_header();
    assert!(header.contains(r#"<th class="Level">Level</th>"#));
    assert!(header.contains(r#"<th class="Message">Message</th>"#));
    assert!(!header.contains(r#"<th class="Logger">"#));

    let html = layout.render(
        &LogEvent::new(Level::Info, "suite.Test", "short row")
            .at(datetime!(2026-01-15 12:00:00 UTC)),
    );
    assert!(html.contains(r#"<td class="Level info">INFO</td>"#));
    assert!(html.contains(r#"<td class="Message">short row</td>"#));
}

#[test]
fn test_row_limit_inserts_table_break() {
    let mut layout = HtmlLayout::new(LayoutConfig {
        max_rows_per_table: Some(2),
        ..LayoutConfig::default()
    })
    .unwrap();
    layout.set_session_start(datetime!(2026-01-15 12:00:00 UTC));

    let t0 = datetime!(2026-01-15 12:00:00 UTC);
    let events: Vec<LogEvent> = (0..3)
        .map(|i| LogEvent::new(Level::Info, "suite.Test", format!("row {i}")).at(t0))
        .collect();

    let html = render_all(&mut layout, &events);

    // One break between row 1 and row 2 plus the outer open/close pair.
    assert_eq!(html.matches("<table>").count(), 2);
    assert_eq!(html.matches("</table>").count(), 2);
}
