//! Drag, resize, and pan gestures keyed by pointer.
//!
//! Screen deltas are divided by the viewport scale before they touch the
//! graph. A press that travels no further than the click threshold is
//! reported back as a click on release.

use crate::input::PointerId;
use cmap_core::{ConceptId, ConceptMap, MapMutation, Point, Rect, Size, Vec2};
use cmap_render::Edges;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureKind {
    /// Press on a concept body. Moves it once the pointer travels.
    Drag(ConceptId),
    /// Press on a selected concept's edge.
    Resize {
        id: ConceptId,
        edges: Edges,
        /// Concept rectangle at press time, canvas space.
        origin: Rect,
        min: Size,
    },
    /// Press on a connection label box. Clicks select; travel does nothing.
    Connection(cmap_core::ConnectionId),
    /// Press on empty canvas.
    Pan,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gesture {
    pub kind: GestureKind,
    /// Screen-space press position.
    pub start: Point,
    last: Point,
    travel: f64,
}

impl Gesture {
    pub fn travel(&self) -> f64 {
        self.travel
    }
}

/// What a pointer move asks the session to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Idle,
    Mutate(MapMutation),
    Pan(Vec2),
}

/// A finished gesture. `click` is true when the pointer never left the
/// click threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Release {
    pub kind: GestureKind,
    pub click: bool,
}

#[derive(Debug)]
pub struct Gestures {
    active: HashMap<PointerId, Gesture>,
    click_threshold: f64,
}

impl Default for Gestures {
    fn default() -> Self {
        Self::new(5.0)
    }
}

impl Gestures {
    pub fn new(click_threshold: f64) -> Self {
        Self {
            active: HashMap::new(),
            click_threshold,
        }
    }

    pub fn get(&self, pointer: PointerId) -> Option<&Gesture> {
        self.active.get(&pointer)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn begin(&mut self, pointer: PointerId, kind: GestureKind, screen: Point) {
        log::trace!("pointer {} begins {kind:?}", pointer.0);
        self.active.insert(
            pointer,
            Gesture {
                kind,
                start: screen,
                last: screen,
                travel: 0.0,
            },
        );
    }

    /// Advance `pointer` to `screen`. Resizes are computed from the press
    /// rectangle and the total travel, so `map` supplies the current
    /// position to express the result as a delta.
    pub fn motion(&mut self, pointer: PointerId, screen: Point, scale: f64, map: &ConceptMap) -> Step {
        let threshold = self.click_threshold;
        let Some(gesture) = self.active.get_mut(&pointer) else {
            return Step::Idle;
        };
        gesture.travel = gesture.travel.max((screen - gesture.start).hypot());
        if gesture.travel <= threshold {
            return Step::Idle;
        }
        // `last` holds the press point until the threshold is crossed.
        let delta = screen - gesture.last;
        gesture.last = screen;
        match gesture.kind {
            GestureKind::Drag(id) => Step::Mutate(MapMutation::DragConcept {
                id,
                dx: delta.x / scale,
                dy: delta.y / scale,
            }),
            GestureKind::Resize { id, edges, origin, min } => {
                let Some(concept) = map.concept(id) else {
                    return Step::Idle;
                };
                let total = (screen - gesture.start) / scale;
                let rect = resize_rect(origin, edges, total, min);
                Step::Mutate(MapMutation::ScaleConcept {
                    id,
                    dx: rect.x0 - concept.x,
                    dy: rect.y0 - concept.y,
                    width: rect.width(),
                    height: rect.height(),
                })
            }
            GestureKind::Pan => Step::Pan(delta),
            GestureKind::Connection(_) => Step::Idle,
        }
    }

    pub fn end(&mut self, pointer: PointerId) -> Option<Release> {
        let gesture = self.active.remove(&pointer)?;
        Some(Release {
            kind: gesture.kind,
            click: gesture.travel <= self.click_threshold,
        })
    }

    pub fn cancel(&mut self, pointer: PointerId) -> bool {
        self.active.remove(&pointer).is_some()
    }

    /// Concepts being moved or resized right now. Their menus hide.
    pub fn interacting(&self) -> Vec<ConceptId> {
        let mut ids: Vec<ConceptId> = self
            .active
            .values()
            .filter(|g| g.travel > self.click_threshold)
            .filter_map(|g| match g.kind {
                GestureKind::Drag(id) | GestureKind::Resize { id, .. } => Some(id),
                GestureKind::Connection(_) | GestureKind::Pan => None,
            })
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Move the grabbed edges of `origin` by `delta`, keeping the opposite
/// edges fixed and never shrinking below `min`.
pub fn resize_rect(origin: Rect, edges: Edges, delta: Vec2, min: Size) -> Rect {
    let (mut x0, mut x1) = (origin.x0, origin.x1);
    let (mut y0, mut y1) = (origin.y0, origin.y1);
    if edges.right {
        x1 = (origin.x1 + delta.x).max(x0 + min.width);
    } else if edges.left {
        x0 = (origin.x0 + delta.x).min(x1 - min.width);
    }
    if edges.bottom {
        y1 = (origin.y1 + delta.y).max(y0 + min.height);
    } else if edges.top {
        y0 = (origin.y0 + delta.y).min(y1 - min.height);
    }
    Rect::new(x0, y0, x1, y1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmap_core::Concept;

    const P: PointerId = PointerId(7);

    fn map() -> ConceptMap {
        let mut map = ConceptMap::new();
        map.concepts = vec![Concept::new(ConceptId(0), "A", 100.0, 100.0, 150.0, 60.0)];
        map
    }

    #[test]
    fn short_press_is_a_click() {
        let mut g = Gestures::default();
        g.begin(P, GestureKind::Drag(ConceptId(0)), Point::new(10.0, 10.0));
        assert_eq!(g.motion(P, Point::new(13.0, 14.0), 1.0, &map()), Step::Idle);
        assert!(g.interacting().is_empty());
        let release = g.end(P).unwrap();
        assert!(release.click);
    }

    #[test]
    fn drag_divides_by_scale() {
        let mut g = Gestures::default();
        g.begin(P, GestureKind::Drag(ConceptId(0)), Point::ZERO);
        assert_eq!(
            g.motion(P, Point::new(20.0, -10.0), 2.0, &map()),
            Step::Mutate(MapMutation::DragConcept {
                id: ConceptId(0),
                dx: 10.0,
                dy: -5.0,
            })
        );
        assert_eq!(g.interacting(), vec![ConceptId(0)]);
        // Coming back near the start is still a drag.
        g.motion(P, Point::new(1.0, 0.0), 2.0, &map());
        assert!(!g.end(P).unwrap().click);
    }

    #[test]
    fn small_steps_sum_to_full_travel() {
        let mut g = Gestures::default();
        g.begin(P, GestureKind::Pan, Point::ZERO);
        let mut moved = Vec2::ZERO;
        for step in 1..=30 {
            if let Step::Pan(delta) = g.motion(P, Point::new(f64::from(step), 0.0), 1.0, &map()) {
                moved += delta;
            }
        }
        assert_eq!(moved, Vec2::new(30.0, 0.0));
    }

    #[test]
    fn pan_uses_raw_screen_delta() {
        let mut g = Gestures::default();
        g.begin(P, GestureKind::Pan, Point::ZERO);
        assert_eq!(
            g.motion(P, Point::new(30.0, 40.0), 3.0, &map()),
            Step::Pan(Vec2::new(30.0, 40.0))
        );
    }

    #[test]
    fn left_edge_resize_keeps_right_edge() {
        let origin = Rect::new(100.0, 100.0, 250.0, 160.0);
        let edges = Edges {
            left: true,
            ..Edges::default()
        };
        let min = Size::new(100.0, 50.0);
        assert_eq!(
            resize_rect(origin, edges, Vec2::new(-30.0, 0.0), min),
            Rect::new(70.0, 100.0, 250.0, 160.0)
        );
        assert_eq!(
            resize_rect(origin, edges, Vec2::new(120.0, 0.0), min),
            Rect::new(150.0, 100.0, 250.0, 160.0)
        );
    }

    #[test]
    fn corner_resize_through_motion() {
        let mut g = Gestures::default();
        g.begin(
            P,
            GestureKind::Resize {
                id: ConceptId(0),
                edges: Edges {
                    top: true,
                    right: true,
                    ..Edges::default()
                },
                origin: Rect::new(100.0, 100.0, 250.0, 160.0),
                min: Size::new(100.0, 50.0),
            },
            Point::new(500.0, 200.0),
        );
        assert_eq!(
            g.motion(P, Point::new(540.0, 160.0), 2.0, &map()),
            Step::Mutate(MapMutation::ScaleConcept {
                id: ConceptId(0),
                dx: 0.0,
                dy: -20.0,
                width: 170.0,
                height: 80.0,
            })
        );
    }

    #[test]
    fn pointers_do_not_share_state() {
        let mut g = Gestures::default();
        g.begin(PointerId(1), GestureKind::Pan, Point::ZERO);
        g.begin(PointerId(2), GestureKind::Drag(ConceptId(0)), Point::ZERO);
        g.motion(PointerId(1), Point::new(50.0, 0.0), 1.0, &map());
        assert!(g.end(PointerId(2)).unwrap().click);
        assert!(!g.end(PointerId(1)).unwrap().click);
        assert!(g.is_empty());
    }
}
