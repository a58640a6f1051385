#![forbid(unsafe_code)]

//! The top-level session: one tree per view, driven by host callbacks.
//!
//! # Lifecycle
//!
//! ```text
//! push_data ──► Ready(plan) ──► click / poll / toggle ──► plan with transition
//!     │                              │
//!     ├──► CannotRender(reason)      └──► emit_filter ──► FilterEvent
//!     └──► Failed
//! ```
//!
//! # Invariants
//!
//! 1. After a push that is not `Ready`, no tree is held and every
//!    interaction is a no-op.
//! 2. A push never exposes a partially built tree: the new state is built
//!    aside and swapped in only when complete.
//!
//! # Failure Modes
//!
//! - A panic while building is caught, logged at `error`, and reported as
//!   [`RenderStatus::Failed`]. The previous tree is dropped as well.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use canopy_core::build;
use canopy_layout::Size;

use crate::config::{StyleConfig, ViewConfig};
use crate::error::Precondition;
use crate::gesture::{Activation, ClickDiscriminator};
use crate::host::{DataPush, FilterEvent, InteractionCaps, Viewport};
use crate::plan::{Legend, RenderPlan};
use crate::tree_state::{IdGenerator, NodeId, Transition, TreeState};

/// Result of a data push.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderStatus {
    /// The tree was built; draw this plan.
    Ready(RenderPlan),
    /// The input cannot be shown as a tree; show the reason instead.
    CannotRender(Precondition),
    /// Building failed unexpectedly.
    Failed,
}

impl RenderStatus {
    #[must_use]
    pub fn plan(&self) -> Option<&RenderPlan> {
        match self {
            Self::Ready(plan) => Some(plan),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// What a click or poll produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A node was toggled; redraw with this plan.
    Redraw(RenderPlan),
    /// The host should apply this filter.
    Filter(FilterEvent),
}

#[derive(Debug, Clone)]
struct Loaded {
    tree: TreeState,
    dimension_ids: Vec<String>,
    legend: Legend,
    style: StyleConfig,
    caps: InteractionCaps,
}

impl Loaded {
    fn plan(&self, viewport: Size, view: &ViewConfig, transition: Option<Transition>) -> RenderPlan {
        RenderPlan::compose(
            &self.tree,
            &self.style,
            &self.legend,
            viewport,
            &view.chrome(),
            transition,
        )
    }
}

/// One collapsible tree view.
#[derive(Debug, Clone)]
pub struct Session {
    view: ViewConfig,
    ids: IdGenerator,
    viewport: Viewport,
    clicks: ClickDiscriminator,
    loaded: Option<Loaded>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ViewConfig::default())
    }
}

impl Session {
    #[must_use]
    pub fn new(view: ViewConfig) -> Self {
        Self {
            clicks: ClickDiscriminator::new(view.multi_click_timeout()),
            view,
            ids: IdGenerator::new(),
            viewport: Viewport::FALLBACK,
            loaded: None,
        }
    }

    #[must_use]
    pub fn view(&self) -> &ViewConfig {
        &self.view
    }

    /// Rebuild the tree from a data push.
    ///
    /// `viewport` is `None` when the host offers no drawing surface.
    pub fn push_data(&mut self, push: &DataPush, viewport: Option<Viewport>) -> RenderStatus {
        let span = tracing::debug_span!(
            "session.push",
            rows = push.rows.len(),
            dimensions = push.dimensions.len(),
            duration_us = tracing::field::Empty
        )
        .entered();
        let started = Instant::now();
        self.clicks.reset();

        let checked = match viewport {
            Some(viewport) => check(push).map(|()| viewport),
            None => Err(Precondition::MissingRenderer),
        };
        let viewport = match checked {
            Ok(viewport) => viewport,
            Err(reason) => {
                tracing::warn!(
                    message = "session.cannot_render",
                    reason = reason.label(),
                    detail = %reason
                );
                self.loaded = None;
                return RenderStatus::CannotRender(reason);
            }
        };
        self.viewport = viewport;

        let previous = self.loaded.take();
        let view = &self.view;
        let ids = &mut self.ids;
        let size = viewport.size();
        let built = catch_unwind(AssertUnwindSafe(|| {
            let tree = build(
                &push.rows,
                &push.dimension_addresses(),
                push.measure_address().as_ref(),
            );
            let (state, transition) = TreeState::build(
                &tree,
                push.style.node_size(),
                view,
                ids,
                previous.as_ref().map(|l| &l.tree),
            );
            let loaded = Loaded {
                tree: state,
                dimension_ids: push.dimension_ids(),
                legend: Legend::from_push(push),
                style: push.style.clone(),
                caps: push.interactions,
            };
            let plan = loaded.plan(size, view, Some(transition));
            (loaded, plan)
        }));

        let status = match built {
            Ok((loaded, plan)) => {
                tracing::debug!(
                    message = "session.ready",
                    nodes = loaded.tree.nodes().len(),
                    visible = plan.nodes.len(),
                    root_value = loaded.tree.root().value()
                );
                self.loaded = Some(loaded);
                RenderStatus::Ready(plan)
            }
            Err(payload) => {
                tracing::error!(
                    message = "session.failed",
                    panic = panic_message(payload.as_ref())
                );
                RenderStatus::Failed
            }
        };
        span.record("duration_us", started.elapsed().as_micros() as u64);
        status
    }

    /// Re-fit the current tree to a new viewport.
    pub fn resize(&mut self, viewport: Viewport) -> Option<RenderPlan> {
        self.viewport = Viewport::sanitized(viewport.width, viewport.height);
        self.plan()
    }

    /// Expand or collapse `id` right away.
    pub fn toggle(&mut self, id: NodeId) -> Option<RenderPlan> {
        let loaded = self.loaded.as_mut()?;
        let transition = loaded.tree.toggle(id)?;
        Some(loaded.plan(self.viewport.size(), &self.view, Some(transition)))
    }

    /// Filter request for `id`, if the host accepts filters.
    #[must_use]
    pub fn emit_filter(&self, id: NodeId) -> Option<FilterEvent> {
        let loaded = self.loaded.as_ref()?;
        loaded
            .tree
            .emit_filter(id, &loaded.dimension_ids, loaded.caps)
    }

    /// Feed a primary click on `id`.
    pub fn click(&mut self, id: NodeId, now: Instant) -> Option<Outcome> {
        self.loaded.as_ref()?;
        let activation = self.clicks.click(id, now)?;
        self.activate(activation)
    }

    /// Release a single click whose double-click window has passed.
    pub fn poll(&mut self, now: Instant) -> Option<Outcome> {
        let activation = self.clicks.poll(now)?;
        self.activate(activation)
    }

    /// When the host should next call [`poll`](Self::poll).
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.clicks.deadline()
    }

    /// Plan for the current state, without a transition.
    #[must_use]
    pub fn plan(&self) -> Option<RenderPlan> {
        let loaded = self.loaded.as_ref()?;
        Some(loaded.plan(self.viewport.size(), &self.view, None))
    }

    #[must_use]
    pub fn tree(&self) -> Option<&TreeState> {
        self.loaded.as_ref().map(|l| &l.tree)
    }

    /// Id of the node at `path` (child names from the root).
    #[must_use]
    pub fn find_path(&self, path: &[&str]) -> Option<NodeId> {
        self.tree()?.find_path(path)
    }

    fn activate(&mut self, activation: Activation) -> Option<Outcome> {
        match activation {
            Activation::Toggle(id) => {
                // a pending click may outlive its node when an earlier toggle hid it
                let visible = self
                    .tree()
                    .and_then(|tree| tree.get(id))
                    .is_some_and(|node| node.is_visible());
                if !visible {
                    tracing::debug!(message = "session.stale_click", node = %id);
                    return None;
                }
                self.toggle(id).map(Outcome::Redraw)
            }
            Activation::Filter(id) => self.emit_filter(id).map(Outcome::Filter),
        }
    }
}

fn check(push: &DataPush) -> Result<(), Precondition> {
    if push.dimensions.len() < 2 {
        return Err(Precondition::TooFewDimensions {
            found: push.dimensions.len(),
        });
    }
    if push.rows.is_empty() {
        return Err(Precondition::EmptyRows);
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
