//! Layout configuration.
//!
//! All values are read at render time; the conversion pattern is the only
//! one that can change after construction (via [`HtmlLayout::set_pattern`],
//! which recomputes the column count).
//!
//! [`HtmlLayout::set_pattern`]: crate::layout::HtmlLayout::set_pattern

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::event::Level;
use crate::{LayoutError, LayoutResult};

/// Default conversion pattern: time, logger, level, message.
pub const DEFAULT_CONVERSION_PATTERN: &str = "%date{HH:mm:ss.SSS}%logger{30}%level%message";

/// Environment property consulted for an external stylesheet when none is
/// configured explicitly.
pub const STYLESHEET_ENV: &str = "REPORT_LAYOUT_STYLESHEET";

/// Row rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// One `<td>` per converter in the pattern.
    #[default]
    Column,
    /// The whole event rendered through the full pattern into a single
    /// `<td>`.
    SingleString,
}

/// Configuration surface of the HTML layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Conversion pattern; one column per converter.
    pub pattern: String,
    pub format: Format,
    /// Events at exactly this level render as step rows even without a
    /// STEP marker.
    pub step_level: Option<Level>,
    /// External stylesheet href. Falls back to the `REPORT_LAYOUT_STYLESHEET`
    /// environment property when unset.
    pub stylesheet: Option<String>,
    pub title: String,
    /// Close the current table and open a fresh one after this many rows.
    pub max_rows_per_table: Option<usize>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            pattern: DEFAULT_CONVERSION_PATTERN.to_string(),
            format: Format::Column,
            step_level: None,
            stylesheet: None,
            title: "Test Execution Log".to_string(),
            max_rows_per_table: None,
        }
    }
}

/// Load a layout configuration from a TOML file.
pub fn load_config(path: &Path) -> LayoutResult<LayoutConfig> {
    let text = std::fs::read_to_string(path)?;
    toml::from_str(&text).map_err(|e| LayoutError::Config(e.to_string()))
}
