#![forbid(unsafe_code)]

//! Canvas sizing from a layout extent.
//!
//! The tree grows downwards along `x` (rows) and rightwards along `y`
//! (depth). The canvas keeps the viewport width, and grows taller than the
//! viewport when the visible rows need more room.

use serde::{Deserialize, Serialize};

use crate::{Extent, Point};

/// Space kept free below the canvas inside the viewport.
const VIEWPORT_GUTTER: f64 = 16.0;

/// Width and height in screen units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    #[must_use]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Space around the tree that is not part of the layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Chrome {
    /// Margin on every side of the content.
    pub margin: f64,
    /// Height the host spends above the canvas (legend, toolbars).
    pub reserved_height: f64,
}

impl Default for Chrome {
    fn default() -> Self {
        Self {
            margin: 20.0,
            reserved_height: 0.0,
        }
    }
}

/// Final drawing surface and the translation from layout to screen space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Canvas {
    pub size: Size,
    /// Added to a layout point before swapping axes; see [`Canvas::to_screen`].
    pub shift: Point,
}

impl Canvas {
    /// Fit a canvas around `extent` inside `viewport`.
    #[must_use]
    pub fn fit(extent: &Extent, viewport: Size, chrome: &Chrome) -> Self {
        let content_height = extent.breadth() + 2.0 * chrome.margin;
        let available = viewport.height - chrome.reserved_height - VIEWPORT_GUTTER;
        let content_width = extent.max_y + 2.0 * chrome.margin;
        Self {
            size: Size::new(
                viewport.width.max(content_width),
                available.max(content_height),
            ),
            shift: Point::new(chrome.margin - extent.min_x, chrome.margin),
        }
    }

    /// Screen coordinates `(horizontal, vertical)` of a layout point. Depth
    /// runs left to right, rows top to bottom.
    #[must_use]
    pub fn to_screen(&self, point: Point) -> (f64, f64) {
        (point.y + self.shift.y, point.x + self.shift.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_wins_when_content_is_small() {
        let extent = Extent {
            min_x: -24.0,
            max_x: 24.0,
            max_y: 180.0,
        };
        let canvas = Canvas::fit(&extent, Size::new(800.0, 600.0), &Chrome::default());
        assert_eq!(canvas.size, Size::new(800.0, 584.0));
    }

    #[test]
    fn content_wins_when_rows_overflow() {
        let extent = Extent {
            min_x: -400.0,
            max_x: 400.0,
            max_y: 360.0,
        };
        let chrome = Chrome {
            margin: 20.0,
            reserved_height: 40.0,
        };
        let canvas = Canvas::fit(&extent, Size::new(300.0, 600.0), &chrome);
        assert_eq!(canvas.size.height, 840.0);
        assert_eq!(canvas.size.width, 400.0);
    }

    #[test]
    fn topmost_row_lands_on_margin() {
        let extent = Extent {
            min_x: -36.0,
            max_x: 12.0,
            max_y: 180.0,
        };
        let canvas = Canvas::fit(&extent, Size::new(800.0, 600.0), &Chrome::default());
        assert_eq!(canvas.to_screen(Point::new(-36.0, 0.0)), (20.0, 20.0));
        assert_eq!(canvas.to_screen(Point::new(0.0, 180.0)), (200.0, 56.0));
    }

    #[test]
    fn canvas_serializes_for_hosts() {
        let extent = Extent {
            min_x: -12.0,
            max_x: 12.0,
            max_y: 180.0,
        };
        let canvas = Canvas::fit(&extent, Size::new(800.0, 600.0), &Chrome::default());
        let json = serde_json::to_value(canvas).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "size": { "width": 800.0, "height": 584.0 },
                "shift": { "x": 32.0, "y": 20.0 }
            })
        );
        let back: Canvas = serde_json::from_value(json).unwrap();
        assert_eq!(back, canvas);
    }
}
