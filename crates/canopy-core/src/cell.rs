#![forbid(unsafe_code)]

//! Cell resolution: heterogeneously encoded table cells to canonical values.
//!
//! Hosts report the same logical cell in several shapes. [`Cell`] captures
//! every shape as one tagged union and the free functions in this module
//! resolve it exhaustively:
//!
//! | shape                                   | [`resolve`]                     | [`resolve_measure`]             |
//! |-----------------------------------------|---------------------------------|---------------------------------|
//! | `null` / malformed                      | `None`                          | `None`                          |
//! | bare scalar                             | the scalar                      | the scalar                      |
//! | `{value, formattedValue, rawValue}`     | `value`, then `formattedValue`  | `rawValue`, `value`, `formattedValue` |
//! | positional array                        | `None` (needs a position)       | `None`                          |
//!
//! # Invariants
//!
//! 1. Resolution never panics and never allocates.
//! 2. Empty or whitespace-only strings inside a wrapped cell count as absent.
//! 3. [`parse_measure`] always returns a finite number.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Thousand-separator characters stripped on the second parse attempt.
/// Whitespace (including non-breaking spaces) is stripped as well.
const THOUSANDS_SEPARATORS: [char; 3] = [',', '\'', '_'];

// ---------------------------------------------------------------------------
// Scalar
// ---------------------------------------------------------------------------

/// A resolved, native-typed cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Convert a JSON value; `null`, arrays and objects are not scalars.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Self::Number),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    /// Whether this scalar carries no usable content.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(n) => n.is_nan(),
            Self::Bool(_) => false,
        }
    }

    /// Numeric interpretation of this scalar, if any.
    ///
    /// Strings are parsed directly first; if that fails, whitespace and
    /// thousand separators are stripped and parsing is retried.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            Self::Number(n) => Some(*n),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Self::Text(s) => parse_numeric_text(s),
        };
        n.filter(|n| n.is_finite())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Canonical text for a number: integral values print without a fractional
/// part and negative zero prints as `0`.
#[must_use]
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_owned();
    }
    format!("{n}")
}

fn parse_numeric_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(n) = trimmed.parse::<f64>() {
        return Some(n);
    }
    let cleaned: String = trimmed
        .chars()
        .filter(|c| !c.is_whitespace() && !THOUSANDS_SEPARATORS.contains(c))
        .collect();
    cleaned.parse::<f64>().ok()
}

// ---------------------------------------------------------------------------
// Cell
// ---------------------------------------------------------------------------

/// One table cell, in any of the encodings a host may use.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    /// Absent, `null`, or an object we could not interpret.
    #[default]
    Null,
    /// A bare scalar.
    Scalar(Scalar),
    /// A wrapper object. Each slot is `None` when missing or `null`.
    Wrapped {
        value: Option<Scalar>,
        formatted_value: Option<Scalar>,
        raw_value: Option<Scalar>,
    },
    /// Several fields' cells grouped under one configuration key,
    /// addressed by grouping position.
    Grouped(Vec<Cell>),
}

impl Cell {
    /// Build a wrapped cell carrying only `value`.
    #[must_use]
    pub fn wrapped(value: impl Into<Scalar>) -> Self {
        Self::Wrapped {
            value: Some(value.into()),
            formatted_value: None,
            raw_value: None,
        }
    }

    /// Positional access into a grouped cell.
    #[must_use]
    pub fn at(&self, position: usize) -> Option<&Cell> {
        match self {
            Self::Grouped(items) => items.get(position),
            _ => None,
        }
    }

    /// Whether this cell is [`Cell::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<&Value> for Cell {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Array(items) => Self::Grouped(items.iter().map(Self::from).collect()),
            Value::Object(map) => {
                let slot = |key: &str| map.get(key).and_then(Scalar::from_json);
                if !["value", "formattedValue", "rawValue"]
                    .iter()
                    .any(|k| map.contains_key(*k))
                {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(keys = map.len(), "cell object without value slots");
                    return Self::Null;
                }
                Self::Wrapped {
                    value: slot("value"),
                    formatted_value: slot("formattedValue"),
                    raw_value: slot("rawValue"),
                }
            }
            scalar => Scalar::from_json(scalar).map_or(Self::Null, Self::Scalar),
        }
    }
}

impl From<Scalar> for Cell {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self::from(&value))
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

fn present(slot: &Option<Scalar>) -> Option<&Scalar> {
    slot.as_ref().filter(|s| !s.is_empty())
}

/// Resolve a grouping (dimension) cell to its canonical value.
#[must_use]
pub fn resolve(cell: &Cell) -> Option<&Scalar> {
    match cell {
        Cell::Null | Cell::Grouped(_) => None,
        Cell::Scalar(s) => Some(s),
        Cell::Wrapped {
            value,
            formatted_value,
            ..
        } => present(value).or_else(|| present(formatted_value)),
    }
}

/// Resolve a measure cell. `rawValue` wins over the display slots because
/// formatting loses precision.
#[must_use]
pub fn resolve_measure(cell: &Cell) -> Option<&Scalar> {
    match cell {
        Cell::Wrapped { raw_value, .. } => present(raw_value).or_else(|| resolve(cell)),
        _ => resolve(cell),
    }
}

/// Numeric amount of a measure cell, or `default` when the cell is missing
/// or not numeric.
#[must_use]
pub fn parse_measure(cell: &Cell, default: f64) -> f64 {
    let parsed = resolve_measure(cell).and_then(Scalar::as_number);
    #[cfg(feature = "tracing")]
    if parsed.is_none() && !cell.is_null() {
        tracing::trace!(?cell, default, "measure cell fell back to default");
    }
    match parsed {
        Some(n) => n,
        None if default.is_finite() => default,
        None => 0.0,
    }
}
