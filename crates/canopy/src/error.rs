#![forbid(unsafe_code)]

//! Canopy error model and graceful degradation.
//!
//! Every error maps to a [`Degradation`] telling the host what to show
//! instead of the tree, so no failure ever leaves the view blank without an
//! explanation.

use canopy_runtime::{ConfigError, Precondition, RenderPlan, RenderStatus};
use thiserror::Error;

/// Top-level error type for Canopy hosts.
#[derive(Debug, Error)]
pub enum Error {
    /// View config or host payload could not be decoded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The data cannot be drawn as a tree.
    #[error(transparent)]
    Precondition(#[from] Precondition),
    /// Building the tree failed unexpectedly.
    #[error("building the tree failed")]
    Failed,
}

/// Standard result type for Canopy APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// What the host should do when an error occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degradation {
    /// Replace the tree with [`Error::user_message`].
    ShowMessage,
    /// Keep drawing the last good plan, if any.
    KeepPrevious,
    /// Clear the view.
    Clear,
}

impl Error {
    #[must_use]
    pub fn degradation(&self) -> Degradation {
        match self {
            Self::Precondition(_) => Degradation::ShowMessage,
            Self::Config(_) => Degradation::KeepPrevious,
            Self::Failed => Degradation::Clear,
        }
    }

    /// Error type label for logs.
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Config(ConfigError::Json(_) | ConfigError::Validation(_)) => "config",
            Self::Config(ConfigError::Payload(_)) => "payload",
            Self::Precondition(_) => "precondition",
            Self::Failed => "failed",
        }
    }

    /// Short text for the end user, shown in place of the tree.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Precondition(Precondition::TooFewDimensions { .. }) => {
                "Add at least 2 dimensions to build the tree."
            }
            Self::Precondition(Precondition::EmptyRows) => "No data.",
            Self::Precondition(Precondition::MissingRenderer) => {
                "The rendering host is unavailable."
            }
            Self::Config(_) => "The visualization settings could not be read.",
            Self::Failed => "Something went wrong while drawing the tree.",
        }
    }
}

/// Turn a push status into a `Result`.
pub fn ready(status: RenderStatus) -> Result<RenderPlan> {
    match status {
        RenderStatus::Ready(plan) => Ok(plan),
        RenderStatus::CannotRender(reason) => Err(Error::Precondition(reason)),
        RenderStatus::Failed => Err(Error::Failed),
    }
}
