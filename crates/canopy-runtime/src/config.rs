#![forbid(unsafe_code)]

//! Style and view configuration.
//!
//! [`StyleConfig`] is read from the host's style map on every data push and
//! never fails: each entry falls back to its default when it is absent,
//! `null`, an empty string, or cannot be coerced. [`ViewConfig`] is set once
//! per session and can be loaded from JSON.
//!
//! ```rust,ignore
//! let view = ViewConfig::from_json_str(r#"{ "initial_expand_depth": 2 }"#)?;
//! let style = StyleConfig::from_style_map(&payload["style"]);
//! ```

use std::time::Duration;

use canopy_layout::{Chrome, NodeSize};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// StyleConfig
// ---------------------------------------------------------------------------

/// Visual parameters supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleConfig {
    /// Append `(value)` to node labels.
    pub show_value: bool,
    pub font_size: f64,
    pub font_family: String,
    pub node_radius: f64,
    /// Horizontal distance between depth levels (layout `dy`).
    pub indent: f64,
    /// Vertical distance between adjacent rows (layout `dx`).
    pub row_height: f64,
    pub link_width: f64,
    pub background_color: String,
    pub label_color: String,
    pub link_color: String,
    pub node_color: String,
    /// Fill for nodes whose children are hidden.
    pub node_collapsed_color: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            show_value: false,
            font_size: 12.0,
            font_family: "Inter, Arial, sans-serif".to_owned(),
            node_radius: 4.0,
            indent: 180.0,
            row_height: 24.0,
            link_width: 1.5,
            background_color: "#ffffff".to_owned(),
            label_color: "#111111".to_owned(),
            link_color: "#9aa4b5".to_owned(),
            node_color: "#6c8cf5".to_owned(),
            node_collapsed_color: "#324679".to_owned(),
        }
    }
}

impl StyleConfig {
    /// Read a host style map leniently.
    ///
    /// Entries may be bare (`"fontSize": 14`) or wrapped
    /// (`"fontSize": { "value": 14 }`, `{ "defaultValue": 14 }`). Anything
    /// that is not an object yields the defaults.
    #[must_use]
    pub fn from_style_map(style: &Value) -> Self {
        let reader = StyleReader {
            map: style.as_object(),
        };
        let d = Self::default();
        Self {
            show_value: reader.boolean("showValue", d.show_value),
            font_size: reader.positive("fontSize", d.font_size),
            font_family: reader.text("fontFamily", d.font_family),
            node_radius: reader.non_negative("nodeRadius", d.node_radius),
            indent: reader.positive("indent", d.indent),
            row_height: reader.positive("rowHeight", d.row_height),
            link_width: reader.non_negative("linkWidth", d.link_width),
            background_color: reader.text("backgroundColor", d.background_color),
            label_color: reader.text("labelColor", d.label_color),
            link_color: reader.text("linkColor", d.link_color),
            node_color: reader.text("nodeColor", d.node_color),
            node_collapsed_color: reader.text("nodeCollapsedColor", d.node_collapsed_color),
        }
    }

    /// Layout spacing: `row_height` between rows, `indent` per level.
    #[must_use]
    pub fn node_size(&self) -> NodeSize {
        NodeSize::new(self.row_height, self.indent)
    }
}

struct StyleReader<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> StyleReader<'a> {
    /// The usable value stored under `key`, unwrapped.
    fn raw(&self, key: &str) -> Option<&'a Value> {
        let mut value = self.map?.get(key)?;
        if let Value::Object(inner) = value {
            value = inner.get("value").or_else(|| inner.get("defaultValue"))?;
        }
        match value {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            other => Some(other),
        }
    }

    fn number(&self, key: &str) -> Option<f64> {
        let n = match self.raw(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        n.filter(|n| n.is_finite())
    }

    fn positive(&self, key: &str, default: f64) -> f64 {
        self.number(key).filter(|n| *n > 0.0).unwrap_or(default)
    }

    fn non_negative(&self, key: &str, default: f64) -> f64 {
        self.number(key).filter(|n| *n >= 0.0).unwrap_or(default)
    }

    fn boolean(&self, key: &str, default: bool) -> bool {
        match self.raw(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => default,
            },
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            _ => default,
        }
    }

    fn text(&self, key: &str, default: String) -> String {
        match self.raw(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => default,
        }
    }
}

// ---------------------------------------------------------------------------
// ViewConfig
// ---------------------------------------------------------------------------

/// What happens to node identity when data is pushed again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityPolicy {
    /// Every rebuild mints fresh ids and re-applies the initial expand state.
    #[default]
    Regenerate,
    /// Nodes whose name path survives keep their id, expand flag and
    /// last position.
    PreserveByPath,
}

/// Per-session behavior knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Nodes at this depth or shallower start expanded.
    pub initial_expand_depth: usize,
    pub identity_policy: IdentityPolicy,
    /// Duration of a toggle transition, in milliseconds.
    pub transition_ms: u64,
    /// Margin around the content on every side.
    pub margin: f64,
    /// Height of host chrome above the canvas.
    pub reserved_height: f64,
    /// Window in which a second click on the same node counts as a
    /// double click, in milliseconds.
    pub multi_click_timeout_ms: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            initial_expand_depth: 1,
            identity_policy: IdentityPolicy::Regenerate,
            transition_ms: 250,
            margin: 20.0,
            reserved_height: 0.0,
            multi_click_timeout_ms: 300,
        }
    }
}

impl ViewConfig {
    /// Load from a JSON string and validate.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    /// Range checks. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.margin.is_finite() || self.margin < 0.0 {
            errors.push(format!("margin must be finite and >= 0, got {}", self.margin));
        }
        if !self.reserved_height.is_finite() || self.reserved_height < 0.0 {
            errors.push(format!(
                "reserved_height must be finite and >= 0, got {}",
                self.reserved_height
            ));
        }
        if self.multi_click_timeout_ms == 0 {
            errors.push("multi_click_timeout_ms must be > 0".to_owned());
        }
        errors
    }

    #[must_use]
    pub fn transition(&self) -> Duration {
        Duration::from_millis(self.transition_ms)
    }

    #[must_use]
    pub fn multi_click_timeout(&self) -> Duration {
        Duration::from_millis(self.multi_click_timeout_ms)
    }

    /// Canvas chrome derived from this config.
    #[must_use]
    pub fn chrome(&self) -> Chrome {
        Chrome {
            margin: self.margin,
            reserved_height: self.reserved_height,
        }
    }
}
