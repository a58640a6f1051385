#![forbid(unsafe_code)]

//! Rows and field addressing.
//!
//! A host may report a field's cell under its own identifier, or group the
//! cells of several fields as one positional array under a shared
//! configuration id (e.g. `{"dims": ["FR", "Paris"], "metric": [10]}`).
//! [`FieldAddress::lookup`] tries the grouped form first and falls back to
//! the direct form.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cell::Cell;

/// A field declared by the host: stable identifier plus display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl FieldRef {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Display name, falling back to the identifier.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// Where to find one logical field inside a [`Row`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAddress {
    pub field_id: String,
    pub config_id: Option<String>,
    pub position: usize,
}

impl FieldAddress {
    /// Address a field only by its own identifier.
    #[must_use]
    pub fn direct(field_id: impl Into<String>) -> Self {
        Self {
            field_id: field_id.into(),
            config_id: None,
            position: 0,
        }
    }

    /// Address a field grouped at `position` under `config_id`, falling back
    /// to `field_id`.
    #[must_use]
    pub fn grouped(
        field_id: impl Into<String>,
        config_id: impl Into<String>,
        position: usize,
    ) -> Self {
        Self {
            field_id: field_id.into(),
            config_id: Some(config_id.into()),
            position,
        }
    }

    /// Locate this field's cell in `row`.
    #[must_use]
    pub fn lookup<'r>(&self, row: &'r Row) -> Option<&'r Cell> {
        if let Some(config_id) = &self.config_id
            && let Some(cell) = row.get(config_id).and_then(|c| c.at(self.position))
        {
            return Some(cell);
        }
        match row.get(&self.field_id)? {
            Cell::Grouped(items) => items.get(self.position),
            cell => Some(cell),
        }
    }
}

/// One input row: field or config identifier to cell.
///
/// Rows are read-only inputs; they carry no identity beyond their position
/// in the host's table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Row(FxHashMap<String, Cell>);

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a cell (builder style).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, cell: impl Into<Cell>) -> Self {
        self.0.insert(key.into(), cell.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, cell: impl Into<Cell>) {
        self.0.insert(key.into(), cell.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Cell> {
        self.0.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Build a row from a JSON object. Anything else yields an empty row.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self(
                map.iter()
                    .map(|(k, v)| (k.clone(), Cell::from(v)))
                    .collect(),
            ),
            _ => Self::default(),
        }
    }
}
