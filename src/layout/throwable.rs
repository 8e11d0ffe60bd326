//! Throwable rendering.
//!
//! The framer delegates exception output to whatever renderer instance is
//! configured, so the renderer is a trait. The default implementation is
//! HTML-specific and escapes every line.

use crate::escape::escape_html;
use crate::event::{LogEvent, ThrowableInfo};

/// Renders an event's throwable info into the accumulating row buffer.
///
/// `column_count` is the current data-column count; implementations span
/// the full table width (`column_count + 1`, including the leading row
/// cell).
pub trait ThrowableRenderer: Send {
    fn render(&self, buf: &mut String, event: &LogEvent, column_count: usize);
}

/// Default renderer: one full-width row with the message and each stack
/// frame on its own line, cause chain included, all text escaped.
#[derive(Debug, Default, Clone)]
pub struct HtmlThrowableRenderer;

impl HtmlThrowableRenderer {
    fn append_throwable(buf: &mut String, throwable: &ThrowableInfo, caused_by: bool) {
        if caused_by {
            buf.push_str("Caused by: ");
        }
        buf.push_str(&escape_html(&throwable.message));
        buf.push_str("<br/>");
        for frame in &throwable.frames {
            buf.push_str("&nbsp;&nbsp;&nbsp;&nbsp;");
            buf.push_str(&escape_html(frame));
            buf.push_str("<br/>");
        }
        if let Some(cause) = &throwable.cause {
            Self::append_throwable(buf, cause, true);
        }
    }
}

impl ThrowableRenderer for HtmlThrowableRenderer {
    fn render(&self, buf: &mut String, event: &LogEvent, column_count: usize) {
        let Some(throwable) = &event.throwable else {
            return;
        };

        buf.push('\n');
        buf.push_str("<tr class=\"companion\">\n");
        buf.push_str(&format!(
            "<td class=\"Exception\" colspan=\"{}\">",
            column_count + 1
        ));
        Self::append_throwable(buf, throwable, false);
        buf.push_str("</td>\n</tr>");
    }
}
