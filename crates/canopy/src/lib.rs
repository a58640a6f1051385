#![forbid(unsafe_code)]

//! Canopy public facade crate.
//!
//! Canopy turns a flat table (rows, two or more grouping fields, an optional
//! measure) into a collapsible tree with rolled-up values, lays it out as a
//! tidy tree, and tracks expand/collapse state across clicks.
//!
//! ```rust,ignore
//! use canopy::prelude::*;
//!
//! let mut session = Session::new(ViewConfig::from_json_str(view_json)?);
//! let plan = canopy::draw(&mut session, &payload, Some(Viewport::sanitized(w, h)))?;
//! ```

use serde_json::Value;

pub mod error;

pub use error::{Degradation, Error, Result, ready};

// --- Core re-exports -------------------------------------------------------

pub use canopy_core::{
    Cell, FieldAddress, FieldRef, HierarchyBuilder, Row, Scalar, TreeNode, build, parse_measure,
    resolve,
};

// --- Layout re-exports -----------------------------------------------------

pub use canopy_layout::{Canvas, NodeSize, Point, Size, TidyTree, TreeLayout, TreeView};

// --- Runtime re-exports ----------------------------------------------------

pub use canopy_runtime::{
    DataPush, FilterEvent, IdentityPolicy, InteractionCaps, LabelSide, Legend, NodeId, NodeMark,
    Outcome, RenderPlan, RenderStatus, Session, StyleConfig, Transition, TreeState, ViewConfig,
    Viewport,
};

/// Decode a host payload and push it into `session`.
///
/// This is the whole data-push callback: payload decoding errors, unmet
/// preconditions and build failures all come back as [`Error`].
pub fn draw(session: &mut Session, payload: &Value, viewport: Option<Viewport>) -> Result<RenderPlan> {
    let push = DataPush::from_json(payload)?;
    ready(session.push_data(&push, viewport))
}

pub mod prelude {
    pub use crate::{
        DataPush, Degradation, Error, FilterEvent, NodeId, Outcome, RenderPlan, RenderStatus,
        Result, Session, ViewConfig, Viewport,
    };

    pub use crate::{core, layout, runtime};
}

pub use canopy_core as core;
pub use canopy_layout as layout;
pub use canopy_runtime as runtime;
