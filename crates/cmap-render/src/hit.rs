//! Hit testing: canvas point → topmost interactive element.
//!
//! Concepts paint above connections, so they are probed first, walking
//! each list back-to-front (last painted = topmost).

use cmap_core::geometry::{CONCEPT_HANDLE_OFFSET, Chrome, HANDLE_RADIUS, SceneLayout};
use cmap_core::{ConceptId, ConnectionId, Point, Rect};

/// Which sides of a concept a resize grabs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl Edges {
    pub fn any(&self) -> bool {
        self.left || self.right || self.top || self.bottom
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    ConceptHandle(ConceptId),
    ConceptEdge(ConceptId, Edges),
    Concept(ConceptId),
    ConnectionHandle(ConnectionId),
    Connection(ConnectionId),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HitOptions<'a> {
    pub handles_hidden: bool,
    /// Concepts whose edges are resizable.
    pub selected: &'a [ConceptId],
    /// Edge grab distance in canvas units.
    pub edge_tolerance: f64,
}

/// `layout` must have been computed with an on-screen [`Chrome`].
pub fn hit_test(layout: &SceneLayout, point: Point, opts: &HitOptions<'_>) -> Option<Hit> {
    if !opts.handles_hidden {
        for (id, rect) in layout.concepts.iter().rev() {
            let handle = Point::new(rect.x0, rect.y0) + CONCEPT_HANDLE_OFFSET;
            if (point - handle).hypot() <= HANDLE_RADIUS {
                return Some(Hit::ConceptHandle(*id));
            }
        }
    }

    for (id, rect) in layout.concepts.iter().rev() {
        if !opts.selected.contains(id) {
            continue;
        }
        let edges = edges_near(*rect, point, opts.edge_tolerance);
        if edges.any() {
            return Some(Hit::ConceptEdge(*id, edges));
        }
    }

    if let Some(id) = concept_at(layout, point) {
        return Some(Hit::Concept(id));
    }

    if !opts.handles_hidden {
        let chrome = Chrome::SCREEN;
        for conn in layout.connections.iter().rev() {
            let handle = chrome.connection_handle(conn.label_box);
            if (point - handle).hypot() <= HANDLE_RADIUS {
                return Some(Hit::ConnectionHandle(conn.id));
            }
        }
    }

    layout
        .connections
        .iter()
        .rev()
        .find(|conn| conn.label_box.contains(point))
        .map(|conn| Hit::Connection(conn.id))
}

/// Topmost concept whose rectangle contains `point`.
pub fn concept_at(layout: &SceneLayout, point: Point) -> Option<ConceptId> {
    layout
        .concepts
        .iter()
        .rev()
        .find(|(_, rect)| contains_inclusive(*rect, point))
        .map(|(id, _)| *id)
}

fn contains_inclusive(rect: Rect, p: Point) -> bool {
    p.x >= rect.x0 && p.x <= rect.x1 && p.y >= rect.y0 && p.y <= rect.y1
}

fn edges_near(rect: Rect, p: Point, tolerance: f64) -> Edges {
    if !contains_inclusive(rect.inflate(tolerance, tolerance), p) {
        return Edges::default();
    }
    Edges {
        left: (p.x - rect.x0).abs() <= tolerance,
        right: (p.x - rect.x1).abs() <= tolerance,
        top: (p.y - rect.y0).abs() <= tolerance,
        bottom: (p.y - rect.y1).abs() <= tolerance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmap_core::{Concept, ConceptMap, Connection, Endpoint};
    use pretty_assertions::assert_eq;

    fn scene() -> SceneLayout {
        let mut map = ConceptMap::new();
        map.concepts = vec![
            Concept::new(ConceptId(0), "a", 0.0, 0.0, 100.0, 50.0),
            Concept::new(ConceptId(1), "b", 400.0, 0.0, 100.0, 50.0),
            Concept::new(ConceptId(2), "c", 50.0, 20.0, 100.0, 50.0),
        ];
        map.connections = vec![Connection::new(
            ConnectionId(0),
            "link",
            Endpoint::Concept(ConceptId(0)),
            Endpoint::Concept(ConceptId(1)),
            40.0,
        )];
        SceneLayout::compute(&map, Chrome::SCREEN)
    }

    fn opts(selected: &[ConceptId]) -> HitOptions<'_> {
        HitOptions {
            handles_hidden: false,
            selected,
            edge_tolerance: 8.0,
        }
    }

    #[test]
    fn topmost_concept_wins() {
        let layout = scene();
        // Inside both 0 and 2; 2 is painted later.
        let hit = hit_test(&layout, Point::new(90.0, 45.0), &opts(&[]));
        assert_eq!(hit, Some(Hit::Concept(ConceptId(2))));
    }

    #[test]
    fn handle_beats_body() {
        let layout = scene();
        let hit = hit_test(&layout, Point::new(427.0, 27.0), &opts(&[]));
        assert_eq!(hit, Some(Hit::ConceptHandle(ConceptId(1))));
        let hidden = HitOptions { handles_hidden: true, ..opts(&[]) };
        assert_eq!(
            hit_test(&layout, Point::new(427.0, 27.0), &hidden),
            Some(Hit::Concept(ConceptId(1)))
        );
    }

    #[test]
    fn edges_only_for_selected() {
        let layout = scene();
        let corner = Point::new(503.0, 52.0);
        assert_eq!(hit_test(&layout, corner, &opts(&[])), None);
        let selected = [ConceptId(1)];
        let edges = Edges { right: true, bottom: true, ..Edges::default() };
        assert_eq!(
            hit_test(&layout, corner, &opts(&selected)),
            Some(Hit::ConceptEdge(ConceptId(1), edges))
        );
    }

    #[test]
    fn connection_label_and_handle() {
        let layout = scene();
        let conn = layout.connection(ConnectionId(0)).unwrap();
        let handle = Chrome::SCREEN.connection_handle(conn.label_box);
        assert_eq!(
            hit_test(&layout, handle, &opts(&[])),
            Some(Hit::ConnectionHandle(ConnectionId(0)))
        );
        let body = Point::new(conn.label_box.x1 - 3.0, conn.center.y);
        assert_eq!(
            hit_test(&layout, body, &opts(&[])),
            Some(Hit::Connection(ConnectionId(0)))
        );
    }

    #[test]
    fn background_misses() {
        assert_eq!(hit_test(&scene(), Point::new(250.0, 400.0), &opts(&[])), None);
    }
}
