#![forbid(unsafe_code)]

//! Single versus double click discrimination on tree nodes.
//!
//! A single click toggles a node; a double click requests a filter. Because
//! the first click of a double click is indistinguishable from a single
//! click when it arrives, it is held pending for the multi-click window.
//!
//! # Invariants
//!
//! 1. At most one activation is pending at any time.
//! 2. A double click never also produces a `Toggle` for its first click.
//! 3. After `reset()` nothing is pending.
//!
//! # Failure Modes
//!
//! - If the host never calls [`ClickDiscriminator::poll`], a pending single
//!   click is only released by the next click.

use std::time::{Duration, Instant};

use crate::tree_state::NodeId;

/// Semantic outcome of one or two clicks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Expand or collapse the node.
    Toggle(NodeId),
    /// Cross-filter on the node's path.
    Filter(NodeId),
}

#[derive(Debug, Clone, Copy)]
struct PendingClick {
    node: NodeId,
    time: Instant,
}

/// Turns timestamped node clicks into [`Activation`]s.
#[derive(Debug, Clone)]
pub struct ClickDiscriminator {
    timeout: Duration,
    pending: Option<PendingClick>,
}

impl ClickDiscriminator {
    #[must_use]
    pub fn new(multi_click_timeout: Duration) -> Self {
        Self {
            timeout: multi_click_timeout,
            pending: None,
        }
    }

    /// Register a click on `node` at `now`.
    ///
    /// Returns the activation that became certain because of this click: a
    /// `Filter` for a second click inside the window, or the `Toggle` of an
    /// earlier pending click that this one displaced.
    pub fn click(&mut self, node: NodeId, now: Instant) -> Option<Activation> {
        let current = PendingClick { node, time: now };
        match self.pending.replace(current) {
            None => None,
            Some(prev)
                if prev.node == node
                    && now.saturating_duration_since(prev.time) < self.timeout =>
            {
                self.pending = None;
                Some(Activation::Filter(node))
            }
            Some(prev) => Some(Activation::Toggle(prev.node)),
        }
    }

    /// Release a pending click whose window has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<Activation> {
        let pending = self.pending?;
        if now.saturating_duration_since(pending.time) >= self.timeout {
            self.pending = None;
            Some(Activation::Toggle(pending.node))
        } else {
            None
        }
    }

    /// When the pending click, if any, will be released by `poll`.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.time + self.timeout)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop any pending click.
    pub fn reset(&mut self) {
        self.pending = None;
    }
}

impl Default for ClickDiscriminator {
    fn default() -> Self {
        Self::new(Duration::from_millis(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS_100: Duration = Duration::from_millis(100);
    const MS_400: Duration = Duration::from_millis(400);

    fn ids() -> (NodeId, NodeId) {
        (NodeId::new(1), NodeId::new(2))
    }

    #[test]
    fn single_click_toggles_after_window() {
        let (a, _) = ids();
        let mut clicks = ClickDiscriminator::default();
        let t = Instant::now();
        assert_eq!(clicks.click(a, t), None);
        assert_eq!(clicks.poll(t + MS_100), None);
        assert_eq!(clicks.deadline(), Some(t + Duration::from_millis(300)));
        assert_eq!(clicks.poll(t + MS_400), Some(Activation::Toggle(a)));
        assert!(!clicks.is_pending());
    }

    #[test]
    fn double_click_filters_without_toggle() {
        let (a, _) = ids();
        let mut clicks = ClickDiscriminator::default();
        let t = Instant::now();
        clicks.click(a, t);
        assert_eq!(clicks.click(a, t + MS_100), Some(Activation::Filter(a)));
        assert_eq!(clicks.poll(t + MS_400 + MS_400), None);
    }

    #[test]
    fn slow_second_click_is_two_toggles() {
        let (a, _) = ids();
        let mut clicks = ClickDiscriminator::default();
        let t = Instant::now();
        clicks.click(a, t);
        assert_eq!(clicks.click(a, t + MS_400), Some(Activation::Toggle(a)));
        assert_eq!(
            clicks.poll(t + MS_400 + MS_400),
            Some(Activation::Toggle(a))
        );
    }

    #[test]
    fn click_elsewhere_releases_pending_toggle() {
        let (a, b) = ids();
        let mut clicks = ClickDiscriminator::default();
        let t = Instant::now();
        clicks.click(a, t);
        assert_eq!(clicks.click(b, t + MS_100), Some(Activation::Toggle(a)));
        assert!(clicks.is_pending());
    }

    #[test]
    fn reset_drops_pending() {
        let (a, _) = ids();
        let mut clicks = ClickDiscriminator::default();
        let t = Instant::now();
        clicks.click(a, t);
        clicks.reset();
        assert_eq!(clicks.poll(t + MS_400), None);
        assert_eq!(clicks.deadline(), None);
    }
}
