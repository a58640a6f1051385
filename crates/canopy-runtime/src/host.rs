#![forbid(unsafe_code)]

//! Host contract: what a data push carries in, and what a filter request
//! carries out.
//!
//! # Payload shape
//!
//! ```json
//! {
//!   "fields": { "dims": [{ "id": "country", "name": "Country" }, ...],
//!               "metric": [{ "id": "sales", "name": "Sales" }] },
//!   "tables": { "DEFAULT": [ { "dims": ["FR", "Paris"], "metric": [10] }, ... ] },
//!   "style": { "showValue": { "value": true } },
//!   "interactions": { "onClick": { "supportedActions": ["FILTER"] } }
//! }
//! ```
//!
//! Field arrays may also come under `dimensions` / `metrics`; rows then group
//! their values under those keys instead.

use canopy_core::{FieldAddress, FieldRef, Row, Scalar};
use canopy_layout::Size;
use serde::Serialize;
use serde_json::Value;

use crate::config::StyleConfig;
use crate::error::ConfigError;

const DIMENSION_KEYS: [&str; 2] = ["dims", "dimensions"];
const MEASURE_KEYS: [&str; 2] = ["metric", "metrics"];

// ---------------------------------------------------------------------------
// DataPush
// ---------------------------------------------------------------------------

/// One data delivery from the host.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPush {
    /// Grouping fields, outermost first.
    pub dimensions: Vec<FieldRef>,
    pub measure: Option<FieldRef>,
    pub rows: Vec<Row>,
    pub style: StyleConfig,
    pub interactions: InteractionCaps,
    /// Key under which rows group dimension values positionally.
    pub dimension_config_id: String,
    /// Key under which rows group measure values positionally.
    pub measure_config_id: String,
}

impl DataPush {
    /// A push with default style, no interactions, and the `dims` /
    /// `metric` config ids.
    #[must_use]
    pub fn new(dimensions: Vec<FieldRef>, measure: Option<FieldRef>, rows: Vec<Row>) -> Self {
        Self {
            dimensions,
            measure,
            rows,
            style: StyleConfig::default(),
            interactions: InteractionCaps::default(),
            dimension_config_id: DIMENSION_KEYS[0].to_owned(),
            measure_config_id: MEASURE_KEYS[0].to_owned(),
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: StyleConfig) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn with_interactions(mut self, interactions: InteractionCaps) -> Self {
        self.interactions = interactions;
        self
    }

    /// Decode the host payload.
    ///
    /// Missing sections decode as empty; a `fields` or `tables` entry of the
    /// wrong JSON type is an error.
    pub fn from_json(payload: &Value) -> Result<Self, ConfigError> {
        let fields = match payload.get("fields") {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => return Err(ConfigError::Payload("`fields` is not an object".into())),
        };

        let (dimension_config_id, dimensions) = field_list(fields, &DIMENSION_KEYS)?;
        let (measure_config_id, measures) = field_list(fields, &MEASURE_KEYS)?;

        let rows = match payload.get("tables").and_then(|t| t.get("DEFAULT")) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().map(Row::from_json).collect(),
            Some(_) => {
                return Err(ConfigError::Payload(
                    "`tables.DEFAULT` is not an array".into(),
                ));
            }
        };

        Ok(Self {
            dimensions,
            measure: measures.into_iter().next(),
            rows,
            style: StyleConfig::from_style_map(payload.get("style").unwrap_or(&Value::Null)),
            interactions: InteractionCaps::from_json(
                payload.get("interactions").unwrap_or(&Value::Null),
            ),
            dimension_config_id,
            measure_config_id,
        })
    }

    /// Row addresses of the dimension fields, outermost first.
    #[must_use]
    pub fn dimension_addresses(&self) -> Vec<FieldAddress> {
        self.dimensions
            .iter()
            .enumerate()
            .map(|(i, f)| FieldAddress::grouped(&f.id, &self.dimension_config_id, i))
            .collect()
    }

    #[must_use]
    pub fn measure_address(&self) -> Option<FieldAddress> {
        self.measure
            .as_ref()
            .map(|f| FieldAddress::grouped(&f.id, &self.measure_config_id, 0))
    }

    /// Dimension identifiers, used as filter concepts.
    #[must_use]
    pub fn dimension_ids(&self) -> Vec<String> {
        self.dimensions.iter().map(|f| f.id.clone()).collect()
    }
}

/// First present key among `keys`, with its decoded field list. A value that
/// is not an array decodes as empty.
fn field_list(
    fields: Option<&serde_json::Map<String, Value>>,
    keys: &[&str; 2],
) -> Result<(String, Vec<FieldRef>), ConfigError> {
    let found = fields.and_then(|map| {
        keys.iter()
            .find_map(|key| map.get(*key).filter(|v| !v.is_null()).map(|v| (*key, v)))
    });
    let Some((key, value)) = found else {
        return Ok((keys[0].to_owned(), Vec::new()));
    };
    let list = match value {
        Value::Array(_) => serde_json::from_value(value.clone())
            .map_err(|e| ConfigError::Payload(format!("`fields.{key}`: {e}")))?,
        _ => Vec::new(),
    };
    Ok((key.to_owned(), list))
}

// ---------------------------------------------------------------------------
// Viewport
// ---------------------------------------------------------------------------

/// Drawing area offered by the host.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    /// Used when the host reports an unusable size.
    pub const FALLBACK: Self = Self {
        width: 800.0,
        height: 600.0,
    };

    /// Replace non-finite or negative dimensions with the fallback.
    #[must_use]
    pub fn sanitized(width: f64, height: f64) -> Self {
        let pick = |v: f64, fallback: f64| {
            if v.is_finite() && v >= 0.0 {
                v
            } else {
                fallback
            }
        };
        Self {
            width: pick(width, Self::FALLBACK.width),
            height: pick(height, Self::FALLBACK.height),
        }
    }

    #[must_use]
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::FALLBACK
    }
}

// ---------------------------------------------------------------------------
// Interactions
// ---------------------------------------------------------------------------

/// Interaction capabilities declared by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InteractionCaps {
    /// Whether a click interaction accepts a filter action.
    pub supports_filter: bool,
}

impl InteractionCaps {
    #[must_use]
    pub fn with_filter() -> Self {
        Self {
            supports_filter: true,
        }
    }

    /// Read `interactions.<id>` entries. Filtering is supported when an
    /// entry whose id mentions "click" lists `FILTER` in `supportedActions`
    /// or carries `value.type == "FILTER"`.
    #[must_use]
    pub fn from_json(interactions: &Value) -> Self {
        let Some(map) = interactions.as_object() else {
            return Self::default();
        };
        let supports_filter = map
            .iter()
            .filter(|(id, _)| id.to_ascii_lowercase().contains("click"))
            .any(|(_, entry)| declares_filter(entry));
        Self { supports_filter }
    }
}

fn declares_filter(entry: &Value) -> bool {
    let is_filter = |v: &Value| v.as_str().is_some_and(|s| s.eq_ignore_ascii_case("filter"));
    let listed = entry
        .get("supportedActions")
        .and_then(Value::as_array)
        .is_some_and(|actions| actions.iter().any(is_filter));
    listed
        || entry
            .get("value")
            .and_then(|v| v.get("type"))
            .is_some_and(is_filter)
}

/// A cross-filter request sent back to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FilterEvent {
    /// Filter on one root-to-node path: `concepts[i]` pairs with
    /// `values[0][i]`.
    Set {
        concepts: Vec<String>,
        values: Vec<Vec<Scalar>>,
    },
    /// Drop any filter this view applied.
    Clear,
}
