//! Viewport controller: the pan/zoom transform from canvas to screen.
//!
//! `screen = canvas * scale + (x, y)`. Zooming keeps the canvas point under
//! the cursor (or pinch centroid) fixed on screen.

use crate::input::{PinchEvent, WheelEvent};
use cmap_core::config::ViewportConfig;
use cmap_core::{Point, Vec2};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

impl Viewport {
    pub fn offset(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn to_canvas(&self, local: Point) -> Point {
        Point::new((local.x - self.x) / self.scale, (local.y - self.y) / self.scale)
    }

    pub fn to_screen(&self, canvas: Point) -> Point {
        Point::new(canvas.x * self.scale + self.x, canvas.y * self.scale + self.y)
    }
}

#[derive(Debug, Clone)]
pub struct ViewportController {
    viewport: Viewport,
    config: ViewportConfig,
    locked: bool,
}

impl Default for ViewportController {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

impl ViewportController {
    pub fn new(config: ViewportConfig) -> Self {
        Self {
            viewport: Viewport::default(),
            config,
            locked: false,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// While locked, pan and zoom input is ignored. State is kept.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn to_canvas(&self, local: Point) -> Point {
        self.viewport.to_canvas(local)
    }

    pub fn to_screen(&self, canvas: Point) -> Point {
        self.viewport.to_screen(canvas)
    }

    /// Translate by a raw screen delta.
    pub fn pan(&mut self, delta: Vec2) -> bool {
        if self.locked || delta == Vec2::ZERO {
            return false;
        }
        self.viewport.x += delta.x;
        self.viewport.y += delta.y;
        true
    }

    pub fn wheel(&mut self, event: &WheelEvent) -> bool {
        let delta = -event.delta_y / self.config.wheel_divisor;
        self.zoom_by(Point::new(event.x, event.y), delta)
    }

    pub fn pinch(&mut self, event: &PinchEvent) -> bool {
        self.zoom_by(Point::new(event.x, event.y), event.ds)
    }

    /// `scale *= 1 + delta * sensitivity`, anchored at `anchor`.
    pub fn zoom_by(&mut self, anchor: Point, delta: f64) -> bool {
        let target = self.viewport.scale * (1.0 + delta * self.config.zoom_sensitivity);
        self.zoom_to(anchor, target)
    }

    /// Set the scale (clamped) keeping `anchor` fixed on screen.
    pub fn zoom_to(&mut self, anchor: Point, scale: f64) -> bool {
        if self.locked || !scale.is_finite() {
            return false;
        }
        let old = self.viewport.scale;
        let new = scale.clamp(self.config.min_scale, self.config.max_scale);
        if new == old {
            return false;
        }
        let ratio = new / old;
        self.viewport.x = anchor.x - (anchor.x - self.viewport.x) * ratio;
        self.viewport.y = anchor.y - (anchor.y - self.viewport.y) * ratio;
        self.viewport.scale = new;
        log::trace!("zoom {old:.3} -> {new:.3} at ({:.1}, {:.1})", anchor.x, anchor.y);
        true
    }

    /// Back to 1:1 with the canvas point at `center` (the viewport's
    /// screen center) kept in place.
    pub fn reset_zoom(&mut self, center: Point) -> bool {
        let vp = self.viewport;
        self.viewport = Viewport {
            x: center.x - (center.x - vp.x) / vp.scale,
            y: center.y - (center.y - vp.y) / vp.scale,
            scale: 1.0,
        };
        self.viewport != vp
    }

    /// Replace the transform outright, clamping the scale.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Viewport {
            scale: viewport.scale.clamp(self.config.min_scale, self.config.max_scale),
            ..viewport
        };
    }
}
