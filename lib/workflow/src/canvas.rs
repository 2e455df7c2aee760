//! The persisted canvas snapshot.
//!
//! [`CanvasState`] is the unit exchanged with the persistence collaborator:
//! the full node list, the full edge list, and the viewport.

use crate::edge::WorkflowEdge;
use crate::node::{Position, WorkflowNode};
use serde::{Deserialize, Serialize};

/// Smallest zoom factor the canvas allows.
pub const MIN_ZOOM: f64 = 0.25;
/// Largest zoom factor the canvas allows.
pub const MAX_ZOOM: f64 = 2.0;

/// Pan offset and zoom factor of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// Converts a point relative to the canvas element into canvas coordinates.
    #[must_use]
    pub fn to_canvas(&self, screen_x: f64, screen_y: f64) -> Position {
        let zoom = self.effective_zoom();
        Position::new((screen_x - self.x) / zoom, (screen_y - self.y) / zoom)
    }

    /// Converts canvas coordinates into a point relative to the canvas element.
    #[must_use]
    pub fn to_screen(&self, position: Position) -> (f64, f64) {
        let zoom = self.effective_zoom();
        (position.x * zoom + self.x, position.y * zoom + self.y)
    }

    /// Zooms by `factor` keeping the screen point under the cursor fixed.
    pub fn zoom_at(&mut self, factor: f64, screen_x: f64, screen_y: f64) {
        let anchor = self.to_canvas(screen_x, screen_y);
        self.zoom = (self.effective_zoom() * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        self.x = screen_x - anchor.x * self.zoom;
        self.y = screen_y - anchor.y * self.zoom;
    }

    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    /// Stored canvases may carry a zero or garbage zoom.
    fn effective_zoom(&self) -> f64 {
        if self.zoom.is_finite() && self.zoom > 0.0 {
            self.zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        } else {
            1.0
        }
    }
}

/// The persisted snapshot of a workflow canvas.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasState {
    #[serde(default)]
    pub nodes: Vec<WorkflowNode>,
    #[serde(default)]
    pub edges: Vec<WorkflowEdge>,
    #[serde(default)]
    pub viewport: Viewport,
}

impl CanvasState {
    /// Parses a canvas from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a canvas.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serializes the canvas to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_to_canvas_accounts_for_pan_and_zoom() {
        let viewport = Viewport {
            x: 50.0,
            y: 20.0,
            zoom: 2.0,
        };
        assert_eq!(viewport.to_canvas(250.0, 220.0), Position::new(100.0, 100.0));
        assert_eq!(viewport.to_screen(Position::new(100.0, 100.0)), (250.0, 220.0));
    }

    #[test]
    fn zoom_at_keeps_anchor_fixed_and_clamps() {
        let mut viewport = Viewport::default();
        let before = viewport.to_canvas(400.0, 300.0);
        viewport.zoom_at(1.5, 400.0, 300.0);
        let after = viewport.to_canvas(400.0, 300.0);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);

        viewport.zoom_at(100.0, 0.0, 0.0);
        assert_eq!(viewport.zoom, MAX_ZOOM);
    }

    #[test]
    fn missing_viewport_defaults() {
        let canvas = CanvasState::from_json(r#"{ "nodes": [], "edges": [] }"#).expect("parse");
        assert_eq!(canvas.viewport, Viewport::default());
        assert!(canvas.is_empty());
    }

    #[test]
    fn garbage_zoom_is_treated_as_identity() {
        let viewport = Viewport {
            x: 0.0,
            y: 0.0,
            zoom: 0.0,
        };
        assert_eq!(viewport.to_canvas(10.0, 10.0), Position::new(10.0, 10.0));
    }
}
