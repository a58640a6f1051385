#![forbid(unsafe_code)]

//! Error taxonomy for the runtime boundary.
//!
//! Only two kinds of failure ever leave this crate:
//!
//! - [`Precondition`]: the input cannot be drawn as a tree (reported as a
//!   terminal status, never raised).
//! - [`ConfigError`]: a configuration or host payload could not be read.
//!
//! Cell-level anomalies never surface here; the resolver absorbs them.

use thiserror::Error;

/// Why a data push cannot be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Precondition {
    #[error("at least 2 dimensions are needed to build the tree, found {found}")]
    TooFewDimensions { found: usize },
    #[error("no data rows")]
    EmptyRows,
    #[error("the host provides no renderer")]
    MissingRenderer,
}

impl Precondition {
    /// Short label for logs and metrics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::TooFewDimensions { .. } => "too_few_dimensions",
            Self::EmptyRows => "empty_rows",
            Self::MissingRenderer => "missing_renderer",
        }
    }
}

/// Configuration or payload decoding failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse view config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed host payload: {0}")]
    Payload(String),
    #[error("invalid view config: {}", .0.join("; "))]
    Validation(Vec<String>),
}
