//! Log event model.
//!
//! A [`LogEvent`] is one structured record as produced by the logging front
//! door: timestamp, severity, logger name, a lazily formatted message
//! (format string plus positional arguments), a per-call MDC map, an
//! optional marker and optional throwable info.
//!
//! Events are immutable once built. The layout never mutates an event while
//! rendering it; message substitutions (e.g. for HTML-formatted messages)
//! are computed locally by the renderer from the original format and
//! argument list.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::markers::Marker;

/// Log severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    /// Uppercase form used in the level column ("INFO").
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }

    /// Lowercase form used as a CSS class ("info").
    pub fn css_class(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "info" => Ok(Level::Info),
            "warn" | "warning" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            other => Err(format!("unknown level: {other}")),
        }
    }
}

/// Exception info carried by an event: message, stack frames and an
/// optional cause chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrowableInfo {
    pub message: String,
    #[serde(default)]
    pub frames: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ThrowableInfo>>,
}

impl ThrowableInfo {
    pub fn new(message: impl Into<String>) -> Self {
        ThrowableInfo {
            message: message.into(),
            frames: Vec::new(),
            cause: None,
        }
    }

    pub fn with_frames(mut self, frames: Vec<String>) -> Self {
        self.frames = frames;
        self
    }

    pub fn with_cause(mut self, cause: ThrowableInfo) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

/// One structured log record.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: OffsetDateTime,
    pub level: Level,
    pub logger: String,
    /// Message format string with `{}` placeholders.
    pub message: String,
    /// Positional arguments substituted into the format string.
    pub args: Vec<String>,
    /// Per-call context map surfaced as dedicated report columns.
    pub mdc: BTreeMap<String, String>,
    pub marker: Option<Marker>,
    pub throwable: Option<ThrowableInfo>,
}

impl LogEvent {
    pub fn new(level: Level, logger: impl Into<String>, message: impl Into<String>) -> Self {
        LogEvent {
            timestamp: OffsetDateTime::now_utc(),
            level,
            logger: logger.into(),
            message: message.into(),
            args: Vec::new(),
            mdc: BTreeMap::new(),
            marker: None,
            throwable: None,
        }
    }

    pub fn at(mut self, timestamp: OffsetDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_marker(mut self, marker: Marker) -> Self {
        self.marker = Some(marker);
        self
    }

    pub fn with_throwable(mut self, throwable: ThrowableInfo) -> Self {
        self.throwable = Some(throwable);
        self
    }

    pub fn with_mdc(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.mdc.insert(key.into(), value.into());
        self
    }

    /// The rendered message: format string with each `{}` placeholder
    /// replaced by the corresponding positional argument.
    pub fn formatted_message(&self) -> String {
        format_message(&self.message, &self.args)
    }

    /// True if the marker chain contains a marker with the given name.
    pub fn contains_marker(&self, name: &str) -> bool {
        self.marker.as_ref().is_some_and(|m| m.contains(name))
    }
}

/// Substitute `{}` placeholders in order. A placeholder with no remaining
/// argument stays literal; `\{}` renders as a literal `{}` without
/// consuming an argument.
pub fn format_message(format: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(format.len() + 16);
    let mut rest = format;
    let mut next_arg = args.iter();

    while let Some(pos) = rest.find("{}") {
        if pos > 0 && rest.as_bytes()[pos - 1] == b'\\' {
            out.push_str(&rest[..pos - 1]);
            out.push_str("{}");
        } else {
            out.push_str(&rest[..pos]);
            match next_arg.next() {
                Some(arg) => out.push_str(arg),
                None => out.push_str("{}"),
            }
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}
