//! Platform-agnostic input events.
//!
//! Coordinates are local to the canvas element, in screen pixels. The
//! browser bridge converts DOM pointer, wheel, and gesture events into
//! these before handing them to the session.

use cmap_core::Point;
use serde::Deserialize;

/// The browser's `pointerId`. Stable for one press-move-release sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct PointerId(pub i32);

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PointerEvent {
    #[serde(rename = "pointerId")]
    pub pointer: PointerId,
    pub x: f64,
    pub y: f64,
}

impl PointerEvent {
    pub fn new(pointer: i32, x: f64, y: f64) -> Self {
        Self {
            pointer: PointerId(pointer),
            x,
            y,
        }
    }

    pub fn local(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// Mouse wheel. Only the vertical component zooms.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelEvent {
    pub x: f64,
    pub y: f64,
    pub delta_y: f64,
}

/// Trackpad or touch pinch. `ds` is the scale change since the last event
/// (`0.1` = ten percent larger).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PinchEvent {
    pub x: f64,
    pub y: f64,
    pub ds: f64,
}
