#![forbid(unsafe_code)]

//! Runtime for Canopy: the interaction state machine and the host contract.
//!
//! A host creates a [`Session`], feeds it [`DataPush`]es, and draws the
//! returned [`RenderPlan`]s. Clicks come back in through
//! [`Session::click`] and [`Session::poll`]; a double click produces a
//! [`FilterEvent`] for the host to apply.
//!
//! # Invariants
//!
//! 1. Node ids are unique within a session and never reused.
//! 2. Every plan reflects a fully built tree.
//!
//! # Failure Modes
//!
//! - Inputs that cannot form a tree yield [`RenderStatus::CannotRender`].
//! - Unexpected build failures yield [`RenderStatus::Failed`] and clear the
//!   session's tree.

pub mod config;
pub mod error;
pub mod gesture;
pub mod host;
pub mod plan;
pub mod session;
pub mod tree_state;

pub use config::{IdentityPolicy, StyleConfig, ViewConfig};
pub use error::{ConfigError, Precondition};
pub use gesture::{Activation, ClickDiscriminator};
pub use host::{DataPush, FilterEvent, InteractionCaps, Viewport};
pub use plan::{LabelSide, Legend, LinkMark, NodeMark, RenderPlan};
pub use session::{Outcome, RenderStatus, Session};
pub use tree_state::{
    IdGenerator, NodeId, PositionDelta, PositionedNode, Transition, TreeState,
};
