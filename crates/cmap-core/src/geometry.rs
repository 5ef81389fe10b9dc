//! Geometry kernel: bounds, centers and clipped line endpoints for every
//! endpoint in a [`ConceptMap`].
//!
//! Nothing here mutates the map. Connection positions are resolved lazily
//! through [`Resolver`], which memoizes per pass and reports reference
//! cycles as [`GeometryError::Cycle`] instead of recursing forever.

use crate::id::{ConceptId, ConnectionId};
use crate::model::{Concept, ConceptMap, Connection, Endpoint};
use kurbo::{Line, Point, Rect, Vec2};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("{0} does not exist")]
    Dangling(Endpoint),
    #[error("{0} resolves through itself")]
    Cycle(ConnectionId),
}

// ─── Chrome ──────────────────────────────────────────────────────────────

/// Fixed decoration sizes that turn raw model values into drawn shapes.
///
/// On screen a concept reserves no gutter and a connection label box
/// leaves room for its handle on the left. Exports hide handles and pull
/// concepts in by the handle gutter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chrome {
    /// Removed from the left of every concept rectangle.
    pub concept_gutter: f64,
    pub label_padding_left: f64,
    pub label_padding_right: f64,
    pub label_height: f64,
}

impl Chrome {
    pub const SCREEN: Chrome = Chrome {
        concept_gutter: 0.0,
        label_padding_left: 37.0,
        label_padding_right: 7.0,
        label_height: 34.0,
    };

    pub const SCREEN_HANDLES_HIDDEN: Chrome = Chrome {
        label_padding_left: 7.0,
        ..Chrome::SCREEN
    };

    pub const fn export(gutter: f64) -> Chrome {
        Chrome {
            concept_gutter: gutter,
            label_padding_left: 7.0,
            label_padding_right: 7.0,
            label_height: 34.0,
        }
    }

    pub fn concept_bounds(&self, concept: &Concept) -> Rect {
        let bounds = concept_bounds(concept);
        let inset = self.concept_gutter.min(bounds.width());
        Rect::new(bounds.x0 + inset, bounds.y0, bounds.x1, bounds.y1)
    }

    /// Label box for a connection whose midpoint is `center`.
    pub fn label_box(&self, center: Point, label_width: f64) -> Rect {
        let width = label_width.max(0.0) + self.label_padding_left + self.label_padding_right;
        Rect::from_center_size(center, (width, self.label_height))
    }

    /// Position of the connection handle inside a label box.
    pub fn connection_handle(&self, label_box: Rect) -> Point {
        Point::new(label_box.x0 + CONNECTION_HANDLE_INSET, label_box.center().y)
    }
}

impl Default for Chrome {
    fn default() -> Self {
        Self::SCREEN
    }
}

/// Horizontal distance from a label box's left edge to its handle center.
pub const CONNECTION_HANDLE_INSET: f64 = 17.0;
/// Concept handle center, relative to the concept's top-left.
pub const CONCEPT_HANDLE_OFFSET: Vec2 = Vec2::new(27.0, 27.0);
pub const HANDLE_RADIUS: f64 = 12.0;

// ─── Pure helpers ────────────────────────────────────────────────────────

pub fn concept_center(concept: &Concept) -> Point {
    concept_bounds(concept).center()
}

pub fn concept_bounds(concept: &Concept) -> Rect {
    Rect::from_origin_size(
        (concept.x, concept.y),
        (concept.width.value(), concept.height.value()),
    )
}

pub fn concept_handle(concept: &Concept) -> Point {
    Point::new(concept.x, concept.y) + CONCEPT_HANDLE_OFFSET
}

/// Where the line from `from` toward the center of `target` crosses the
/// boundary of `target`. Degenerate inputs return the center.
pub fn edge_intersection(from: Point, target: Rect) -> Point {
    let center = target.center();
    let d = from - center;
    let half_w = target.width() / 2.0;
    let half_h = target.height() / 2.0;
    if (d.x == 0.0 && d.y == 0.0) || (half_w == 0.0 && half_h == 0.0) {
        return center;
    }
    let sx = if d.x == 0.0 { f64::INFINITY } else { half_w / d.x.abs() };
    let sy = if d.y == 0.0 { f64::INFINITY } else { half_h / d.y.abs() };
    center + d * sx.min(sy)
}

// ─── Resolver ────────────────────────────────────────────────────────────

/// Drawn geometry of one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionGeometry {
    pub id: ConnectionId,
    /// Midpoint between the resolved `from` and `to` centers.
    pub center: Point,
    pub label_box: Rect,
    /// Main line, clipped at both endpoint shapes.
    pub line: Line,
    /// Fan-out lines from `center` to each live extra target.
    pub extra_lines: Vec<(ConceptId, Line)>,
}

impl ConnectionGeometry {
    /// Every point the connection paints, label box included.
    pub fn bounds(&self) -> Rect {
        let mut rect = self.label_box.union_pt(self.line.p0).union_pt(self.line.p1);
        for (_, line) in &self.extra_lines {
            rect = rect.union_pt(line.p1);
        }
        rect
    }
}

/// Resolves endpoint positions over one immutable map snapshot.
///
/// Results are memoized for the resolver's lifetime, so build a fresh one
/// per render or export pass.
pub struct Resolver<'a> {
    map: &'a ConceptMap,
    chrome: Chrome,
    centers: HashMap<ConnectionId, Result<Point, GeometryError>>,
    visiting: Vec<ConnectionId>,
}

impl<'a> Resolver<'a> {
    pub fn new(map: &'a ConceptMap) -> Self {
        Self::with_chrome(map, Chrome::SCREEN)
    }

    pub fn with_chrome(map: &'a ConceptMap, chrome: Chrome) -> Self {
        Self {
            map,
            chrome,
            centers: HashMap::new(),
            visiting: Vec::new(),
        }
    }

    pub fn chrome(&self) -> Chrome {
        self.chrome
    }

    pub fn endpoint_center(&mut self, endpoint: Endpoint) -> Result<Point, GeometryError> {
        match endpoint {
            Endpoint::Concept(id) => self
                .map
                .concept(id)
                .map(|c| self.chrome.concept_bounds(c).center())
                .ok_or(GeometryError::Dangling(endpoint)),
            Endpoint::Connection(id) => self.connection_center(id),
        }
    }

    pub fn connection_center(&mut self, id: ConnectionId) -> Result<Point, GeometryError> {
        if let Some(cached) = self.centers.get(&id) {
            return cached.clone();
        }
        if self.visiting.contains(&id) {
            return Err(GeometryError::Cycle(id));
        }
        let map = self.map;
        let conn = map
            .connection(id)
            .ok_or(GeometryError::Dangling(Endpoint::Connection(id)))?;

        self.visiting.push(id);
        let result = self.endpoint_center(conn.source()).and_then(|from| {
            let to = self.endpoint_center(conn.target())?;
            Ok(from.midpoint(to))
        });
        self.visiting.pop();

        self.centers.insert(id, result.clone());
        result
    }

    /// Shape an endpoint occupies: a concept rectangle or a label box.
    pub fn endpoint_bounds(&mut self, endpoint: Endpoint) -> Result<Rect, GeometryError> {
        match endpoint {
            Endpoint::Concept(id) => self
                .map
                .concept(id)
                .map(|c| self.chrome.concept_bounds(c))
                .ok_or(GeometryError::Dangling(endpoint)),
            Endpoint::Connection(id) => self.connection_bounds(id),
        }
    }

    pub fn connection_bounds(&mut self, id: ConnectionId) -> Result<Rect, GeometryError> {
        let center = self.connection_center(id)?;
        let width = self
            .map
            .connection(id)
            .map(|c| c.width.value())
            .unwrap_or_default();
        Ok(self.chrome.label_box(center, width))
    }

    /// Rendered line endpoints: each end is clipped at its own shape along
    /// the line toward the opposite center.
    pub fn connection_endpoints(&mut self, conn: &Connection) -> Result<Line, GeometryError> {
        let from_center = self.endpoint_center(conn.source())?;
        let to_center = self.endpoint_center(conn.target())?;
        let from_bounds = self.endpoint_bounds(conn.source())?;
        let to_bounds = self.endpoint_bounds(conn.target())?;
        Ok(Line::new(
            edge_intersection(to_center, from_bounds),
            edge_intersection(from_center, to_bounds),
        ))
    }

    pub fn connection_geometry(&mut self, conn: &Connection) -> Result<ConnectionGeometry, GeometryError> {
        let center = self.connection_center(conn.id)?;
        let line = self.connection_endpoints(conn)?;
        let label_box = self.chrome.label_box(center, conn.width.value());
        let extra_lines = conn
            .extra_targets
            .iter()
            .filter_map(|&target| {
                let concept = self.map.concept(target)?;
                let end = edge_intersection(center, self.chrome.concept_bounds(concept));
                Some((target, Line::new(center, end)))
            })
            .collect();
        Ok(ConnectionGeometry {
            id: conn.id,
            center,
            label_box,
            line,
            extra_lines,
        })
    }
}

// ─── Scene ───────────────────────────────────────────────────────────────

/// Everything a render or export pass needs, resolved once.
#[derive(Debug, Clone, Default)]
pub struct SceneLayout {
    /// In paint order.
    pub concepts: Vec<(ConceptId, Rect)>,
    /// In paint order; unresolvable connections are left out.
    pub connections: Vec<ConnectionGeometry>,
    pub skipped: Vec<(ConnectionId, GeometryError)>,
}

impl SceneLayout {
    pub fn compute(map: &ConceptMap, chrome: Chrome) -> Self {
        let mut resolver = Resolver::with_chrome(map, chrome);
        let mut layout = SceneLayout {
            concepts: map
                .concepts
                .iter()
                .map(|c| (c.id, chrome.concept_bounds(c)))
                .collect(),
            ..Default::default()
        };
        for conn in &map.connections {
            match resolver.connection_geometry(conn) {
                Ok(geometry) => layout.connections.push(geometry),
                Err(err) => {
                    log::debug!("skipping {}: {err}", conn.id);
                    layout.skipped.push((conn.id, err));
                }
            }
        }
        layout
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&ConnectionGeometry> {
        self.connections.iter().find(|g| g.id == id)
    }

    /// Union of every painted shape, `None` when nothing is painted.
    pub fn content_bounds(&self) -> Option<Rect> {
        self.concepts
            .iter()
            .map(|(_, r)| *r)
            .chain(self.connections.iter().map(ConnectionGeometry::bounds))
            .reduce(|a, b| a.union(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Point, b: Point) -> bool {
        (a - b).hypot() < 1e-9
    }

    fn concept(id: u32, x: f64, y: f64) -> Concept {
        Concept::new(ConceptId(id), format!("C{id}"), x, y, 100.0, 50.0)
    }

    fn link(id: u32, from: Endpoint, to: Endpoint) -> Connection {
        Connection::new(ConnectionId(id), "", from, to, 90.0)
    }

    fn c(id: u32) -> Endpoint {
        Endpoint::Concept(ConceptId(id))
    }

    fn k(id: u32) -> Endpoint {
        Endpoint::Connection(ConnectionId(id))
    }

    #[test]
    fn intersection_right_and_below() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert!(close(edge_intersection(Point::new(200.0, 25.0), rect), Point::new(100.0, 25.0)));
        assert!(close(edge_intersection(Point::new(50.0, 200.0), rect), Point::new(50.0, 50.0)));
    }

    #[test]
    fn intersection_degenerate_returns_center() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        assert_eq!(edge_intersection(Point::new(50.0, 25.0), rect), Point::new(50.0, 25.0));
        let dot = Rect::new(10.0, 10.0, 10.0, 10.0);
        assert_eq!(edge_intersection(Point::new(90.0, 0.0), dot), Point::new(10.0, 10.0));
    }

    #[test]
    fn intersection_diagonal_hits_nearer_side() {
        let rect = Rect::new(0.0, 0.0, 100.0, 50.0);
        // Direction (1, 1) from center reaches y = 50 before x = 100.
        let hit = edge_intersection(Point::new(150.0, 125.0), rect);
        assert!(close(hit, Point::new(75.0, 50.0)));
    }

    #[test]
    fn connection_center_recurses_through_connections() {
        let mut map = ConceptMap::new();
        map.concepts = vec![concept(0, 0.0, 0.0), concept(1, 200.0, 0.0), concept(2, 100.0, 300.0)];
        map.connections = vec![link(0, c(0), c(1)), link(1, k(0), c(2))];

        let mut resolver = Resolver::new(&map);
        let mid = resolver.connection_center(ConnectionId(0)).unwrap();
        assert!(close(mid, Point::new(150.0, 25.0)));
        let outer = resolver.connection_center(ConnectionId(1)).unwrap();
        assert!(close(outer, Point::new(150.0, 175.0)));
    }

    #[test]
    fn cycle_is_reported_not_followed() {
        let mut map = ConceptMap::new();
        map.concepts = vec![concept(0, 0.0, 0.0)];
        map.connections = vec![link(0, k(1), c(0)), link(1, k(0), c(0))];

        let mut resolver = Resolver::new(&map);
        assert!(matches!(
            resolver.connection_center(ConnectionId(0)),
            Err(GeometryError::Cycle(_))
        ));
    }

    #[test]
    fn dangling_endpoint_is_reported() {
        let mut map = ConceptMap::new();
        map.concepts = vec![concept(0, 0.0, 0.0)];
        map.connections = vec![link(0, c(0), k(9))];
        let mut resolver = Resolver::new(&map);
        assert_eq!(
            resolver.connection_center(ConnectionId(0)),
            Err(GeometryError::Dangling(k(9)))
        );
        let layout = SceneLayout::compute(&map, Chrome::SCREEN);
        assert!(layout.connections.is_empty());
        assert_eq!(layout.skipped.len(), 1);
    }

    #[test]
    fn endpoints_are_clipped_at_both_shapes() {
        let mut map = ConceptMap::new();
        map.concepts = vec![concept(0, 0.0, 0.0), concept(1, 300.0, 0.0)];
        map.connections = vec![link(0, c(0), c(1))];
        let conn = map.connections[0].clone();
        let line = Resolver::new(&map).connection_endpoints(&conn).unwrap();
        assert!(close(line.p0, Point::new(100.0, 25.0)));
        assert!(close(line.p1, Point::new(300.0, 25.0)));
    }

    #[test]
    fn label_box_uses_chrome_padding() {
        let center = Point::new(0.0, 0.0);
        let screen = Chrome::SCREEN.label_box(center, 90.0);
        assert_eq!(screen.width(), 134.0);
        assert_eq!(screen.height(), 34.0);
        let export = Chrome::export(34.0).label_box(center, 90.0);
        assert_eq!(export.width(), 104.0);
    }

    #[test]
    fn resolution_is_repeatable() {
        let mut map = ConceptMap::new();
        map.concepts = vec![concept(0, 13.3, 7.1), concept(1, 211.7, 93.9)];
        map.connections = vec![link(0, c(0), c(1))];
        let a = SceneLayout::compute(&map, Chrome::SCREEN);
        let b = SceneLayout::compute(&map, Chrome::SCREEN);
        assert_eq!(a.connections, b.connections);
    }
}
