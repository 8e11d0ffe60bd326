//! Conversion-pattern parser and per-column converters.
//!
//! A pattern like `%date{HH:mm:ss.SSS}%logger{30}%level%message` yields one
//! converter per `%token`; each converter produces one cell's text for an
//! event and reports a configuration-derived display name used as the
//! column's CSS class and header label.
//!
//! Name special cases: an MDC converter is named after its configured key
//! (or "MDC" when unkeyed), and a date converter whose format option
//! contains no date-only directives collapses to "Time".

use time::OffsetDateTime;

use crate::event::LogEvent;
use crate::{LayoutError, LayoutResult};

/// One element of a parsed conversion pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternItem {
    /// Literal text between converters; ignored for column layout, kept for
    /// single-string rendering.
    Literal(String),
    Converter(Converter),
}

/// A per-column formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Converter {
    Date { option: Option<String> },
    Logger { target_len: Option<usize> },
    Level,
    Message,
    Mdc { key: Option<String> },
}

impl Converter {
    /// Produce this column's text for one event. The message text comes
    /// from the caller so the layout can substitute an HTML-formatted
    /// version without touching the event.
    pub fn convert(&self, event: &LogEvent, message: &str) -> String {
        match self {
            Converter::Date { option } => {
                format_timestamp(event.timestamp, option.as_deref().unwrap_or("HH:mm:ss.SSS"))
            }
            Converter::Logger { target_len } => match target_len {
                Some(len) => abbreviate_logger(&event.logger, *len),
                None => event.logger.clone(),
            },
            Converter::Level => event.level.as_str().to_string(),
            Converter::Message => message.to_string(),
            Converter::Mdc { key } => match key {
                Some(k) => event.mdc.get(k).cloned().unwrap_or_default(),
                None => event
                    .mdc
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect::<Vec<_>>()
                    .join(", "),
            },
        }
    }

    /// Configuration-derived column name, used as CSS class and header
    /// label.
    pub fn name(&self) -> String {
        match self {
            Converter::Date { option } => match option {
                Some(opt) if is_time_only(opt) => "Time".to_string(),
                _ => "Date".to_string(),
            },
            Converter::Logger { .. } => "Logger".to_string(),
            Converter::Level => "Level".to_string(),
            Converter::Message => "Message".to_string(),
            Converter::Mdc { key } => match key {
                Some(k) => k.clone(),
                None => "MDC".to_string(),
            },
        }
    }
}

/// True if a date format option contains only time-related directives.
fn is_time_only(option: &str) -> bool {
    // Strip time directives and separators; anything left is a date part.
    let leftover: String = option
        .chars()
        .filter(|c| !matches!(c, ' ' | 'H' | 'm' | 's' | 'S' | ':' | '.' | ',' | 'k' | 'K' | 'z' | 'Z' | 'X' | 'a'))
        .collect();
    leftover.is_empty() && !option.is_empty()
}

/// Shorten a dotted logger name toward a target length by collapsing
/// leading segments to their first character.
fn abbreviate_logger(name: &str, target_len: usize) -> String {
    if name.len() <= target_len {
        return name.to_string();
    }
    let segments: Vec<&str> = name.split('.').collect();
    let mut parts: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
    for i in 0..parts.len().saturating_sub(1) {
        if parts.join(".").len() <= target_len {
            break;
        }
        parts[i] = parts[i].chars().take(1).collect();
    }
    parts.join(".")
}

/// Format a timestamp with a simple directive set: `yyyy`, `MM`, `dd`,
/// `HH`, `mm`, `ss`, `SSS`. Unknown directives pass through verbatim.
pub fn format_timestamp(ts: OffsetDateTime, option: &str) -> String {
    let mut out = String::with_capacity(option.len() + 8);
    let chars: Vec<char> = option.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_alphabetic() {
            let mut run = 1;
            while i + run < chars.len() && chars[i + run] == c {
                run += 1;
            }
            match (c, run) {
                ('y', _) => out.push_str(&format!("{:04}", ts.year())),
                ('M', _) => out.push_str(&format!("{:02}", ts.month() as u8)),
                ('d', _) => out.push_str(&format!("{:02}", ts.day())),
                ('H', _) => out.push_str(&format!("{:02}", ts.hour())),
                ('m', _) => out.push_str(&format!("{:02}", ts.minute())),
                ('s', _) if run >= 2 => out.push_str(&format!("{:02}", ts.second())),
                ('s', _) => out.push_str(&format!("{}", ts.second())),
                ('S', _) => out.push_str(&format!("{:03}", ts.millisecond())),
                _ => {
                    for _ in 0..run {
                        out.push(c);
                    }
                }
            }
            i += run;
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

/// Parse a conversion pattern into literals and converters.
///
/// # Errors
/// Returns a configuration error for an unknown converter word or a
/// pattern with no converters at all (the column count must be at least 1).
pub fn parse_pattern(pattern: &str) -> LayoutResult<Vec<PatternItem>> {
    let mut items = Vec::new();
    let mut literal = String::new();
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] != '%' {
            literal.push(chars[i]);
            i += 1;
            continue;
        }

        if !literal.is_empty() {
            items.push(PatternItem::Literal(std::mem::take(&mut literal)));
        }
        i += 1;

        let word_start = i;
        while i < chars.len() && chars[i].is_ascii_alphanumeric() {
            i += 1;
        }
        let word: String = chars[word_start..i].iter().collect();

        // Optional {option} immediately after the word.
        let mut option = None;
        if i < chars.len() && chars[i] == '{' {
            let opt_start = i + 1;
            let mut j = opt_start;
            while j < chars.len() && chars[j] != '}' {
                j += 1;
            }
            if j >= chars.len() {
                return Err(LayoutError::Config(format!(
                    "unterminated converter option in pattern: {pattern}"
                )));
            }
            option = Some(chars[opt_start..j].iter().collect::<String>());
            i = j + 1;
        }

        let converter = match word.as_str() {
            "date" | "d" => Converter::Date { option },
            "logger" | "lo" | "c" => Converter::Logger {
                target_len: option.and_then(|o| o.parse().ok()),
            },
            "level" | "le" | "p" => Converter::Level,
            "message" | "msg" | "m" => Converter::Message,
            "mdc" | "X" => Converter::Mdc { key: option },
            other => {
                return Err(LayoutError::Config(format!(
                    "unknown converter %{other} in pattern: {pattern}"
                )));
            }
        };
        items.push(PatternItem::Converter(converter));
    }

    if !literal.is_empty() {
        items.push(PatternItem::Literal(literal));
    }

    if !items
        .iter()
        .any(|item| matches!(item, PatternItem::Converter(_)))
    {
        return Err(LayoutError::Config(format!(
            "pattern contains no converters: {pattern}"
        )));
    }

    Ok(items)
}

/// Header label: camel-case boundaries split with `&nbsp;` for display.
pub fn display_label(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 8);
    for (i, c) in name.chars().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            out.push_str("&nbsp;");
        }
        out.push(c);
    }
    out
}
