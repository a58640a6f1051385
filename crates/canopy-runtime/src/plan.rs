#![forbid(unsafe_code)]

//! Render plans: the immutable picture handed to a renderer.
//!
//! A [`RenderPlan`] carries no behavior. It lists the canvas, one mark per
//! visible node, the links between them, and an optional [`Transition`]
//! describing how to animate from the previous plan.

use canopy_core::format_number;
use canopy_layout::{Canvas, Chrome, Point, Size};
use serde::Serialize;

use crate::config::StyleConfig;
use crate::host::DataPush;
use crate::tree_state::{NodeId, PositionedNode, Transition, TreeState};

/// Horizontal distance between a node's circle and its label.
pub const LABEL_GAP: f64 = 10.0;

/// Legend text when the push declares no measure.
pub const NO_MEASURE: &str = "no measure";

/// Which side of the node its label sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSide {
    /// Before the node, text anchored at its end.
    Before,
    /// After the node, text anchored at its start.
    After,
}

impl LabelSide {
    /// Signed horizontal offset of the label anchor.
    #[must_use]
    pub fn offset(self) -> f64 {
        match self {
            Self::Before => -LABEL_GAP,
            Self::After => LABEL_GAP,
        }
    }

    /// Text anchor keyword (`"end"` or `"start"`).
    #[must_use]
    pub fn anchor(self) -> &'static str {
        match self {
            Self::Before => "end",
            Self::After => "start",
        }
    }
}

/// One visible node as the renderer draws it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMark {
    pub id: NodeId,
    pub depth: usize,
    pub label: String,
    pub value: f64,
    pub position: Point,
    /// Whether clicking reveals hidden children.
    pub collapsed: bool,
    pub fill: String,
    pub label_side: LabelSide,
}

/// One visible edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinkMark {
    pub source: NodeId,
    pub target: NodeId,
    pub from: Point,
    pub to: Point,
}

/// Field names shown next to the tree.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Legend {
    pub dimensions: Vec<String>,
    pub measure: String,
}

impl Legend {
    #[must_use]
    pub fn from_push(push: &DataPush) -> Self {
        Self {
            dimensions: push
                .dimensions
                .iter()
                .map(|f| f.display_name().to_owned())
                .collect(),
            measure: push
                .measure
                .as_ref()
                .map_or_else(|| NO_MEASURE.to_owned(), |m| m.display_name().to_owned()),
        }
    }
}

/// Everything needed to draw the tree once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    pub canvas: Canvas,
    pub nodes: Vec<NodeMark>,
    pub links: Vec<LinkMark>,
    pub transition: Option<Transition>,
    pub legend: Legend,
    pub style: StyleConfig,
}

impl RenderPlan {
    /// Compose a plan for the current state of `tree`.
    #[must_use]
    pub fn compose(
        tree: &TreeState,
        style: &StyleConfig,
        legend: &Legend,
        viewport: Size,
        chrome: &Chrome,
        transition: Option<Transition>,
    ) -> Self {
        let layout = tree.layout();
        let nodes = tree.visible().map(|node| mark(node, style)).collect();
        let links = layout
            .links()
            .iter()
            .map(|link| {
                let (source, target) = (tree.node(link.source), tree.node(link.target));
                LinkMark {
                    source: source.id(),
                    target: target.id(),
                    from: source.position(),
                    to: target.position(),
                }
            })
            .collect();
        Self {
            canvas: Canvas::fit(&layout.extent(), viewport, chrome),
            nodes,
            links,
            transition,
            legend: legend.clone(),
            style: style.clone(),
        }
    }

    /// Mark for `id`, if visible.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeMark> {
        self.nodes.iter().find(|m| m.id == id)
    }
}

fn mark(node: &PositionedNode, style: &StyleConfig) -> NodeMark {
    let collapsed = node.has_hidden_children();
    NodeMark {
        id: node.id(),
        depth: node.depth(),
        label: label(node, style.show_value),
        value: node.value(),
        position: node.position(),
        collapsed,
        fill: if collapsed {
            style.node_collapsed_color.clone()
        } else {
            style.node_color.clone()
        },
        label_side: if collapsed {
            LabelSide::Before
        } else {
            LabelSide::After
        },
    }
}

/// Node label: empty for the root, `name` or `name (value)`.
#[must_use]
pub fn label(node: &PositionedNode, show_value: bool) -> String {
    if node.depth() == 0 {
        String::new()
    } else if show_value {
        format!("{} ({})", node.name(), format_number(node.value()))
    } else {
        node.name().to_owned()
    }
}
