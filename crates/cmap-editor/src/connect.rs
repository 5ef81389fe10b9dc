//! Connection drawing, one session per pointer.
//!
//! A press on a concept or connection handle opens a session for that
//! pointer; moves update the rubber-band end; the release decides, from
//! the concept under the pointer, whether to add a connection, fan out an
//! extra target, or abort. Sessions never share state, so two fingers can
//! draw two connections at once.

use crate::input::PointerId;
use cmap_core::{ConceptId, ConceptMap, Endpoint, Line, MapMutation, Point};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingConnection {
    pub from: Endpoint,
    /// Canvas-space press position.
    pub start: Point,
    pub current: Point,
}

impl PendingConnection {
    pub fn preview(&self) -> Line {
        Line::new(self.start, self.current)
    }
}

#[derive(Debug, Default)]
pub struct ConnectionDraw {
    sessions: HashMap<PointerId, PendingConnection>,
    /// Raised by [`Self::begin`]; lowered only by [`Self::settle`], so the
    /// click that trails a release still sees it.
    drawing: bool,
}

impl ConnectionDraw {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn is_active(&self, pointer: PointerId) -> bool {
        self.sessions.contains_key(&pointer)
    }

    pub fn session(&self, pointer: PointerId) -> Option<&PendingConnection> {
        self.sessions.get(&pointer)
    }

    /// Open sessions ordered by pointer id.
    pub fn previews(&self) -> Vec<(PointerId, PendingConnection)> {
        let mut out: Vec<_> = self.sessions.iter().map(|(p, s)| (*p, *s)).collect();
        out.sort_by_key(|(p, _)| *p);
        out
    }

    pub fn begin(&mut self, pointer: PointerId, from: Endpoint, start: Point) {
        log::debug!("pointer {} starts drawing from {from}", pointer.0);
        self.sessions.insert(
            pointer,
            PendingConnection {
                from,
                start,
                current: start,
            },
        );
        self.drawing = true;
    }

    /// Move the rubber-band end. False when `pointer` is not drawing.
    pub fn update(&mut self, pointer: PointerId, current: Point) -> bool {
        let Some(session) = self.sessions.get_mut(&pointer) else {
            return false;
        };
        session.current = current;
        true
    }

    /// Close the session for `pointer`. `target` is the concept under the
    /// release point, if any. Returns the mutation to apply, or `None` when
    /// the gesture aborts.
    pub fn release(&mut self, pointer: PointerId, target: Option<ConceptId>, map: &ConceptMap) -> Option<MapMutation> {
        let session = self.sessions.remove(&pointer)?;
        let Some(target) = target else {
            log::debug!("pointer {} released over nothing; aborting", pointer.0);
            return None;
        };
        match session.from {
            Endpoint::Connection(connection) => {
                let Some(conn) = map.connection(connection) else {
                    log::debug!("{connection} vanished while drawing");
                    return None;
                };
                if !conn.accepts_extra_target(target) {
                    log::debug!("{target} already attached to {connection}");
                    return None;
                }
                Some(MapMutation::AddExtraTarget { connection, target })
            }
            Endpoint::Concept(from) => {
                if from == target {
                    log::debug!("ignoring self-loop on {from}");
                    return None;
                }
                Some(MapMutation::AddConnection {
                    from: session.from,
                    to: Endpoint::Concept(target),
                })
            }
        }
    }

    /// Drop the session without a mutation (capture lost).
    pub fn cancel(&mut self, pointer: PointerId) -> bool {
        self.sessions.remove(&pointer).is_some()
    }

    /// Deferred tick after a release: lower the drawing flag once no
    /// session remains open.
    pub fn settle(&mut self) {
        if self.sessions.is_empty() {
            self.drawing = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmap_core::{Concept, Connection, ConnectionId};

    fn map() -> ConceptMap {
        let mut map = ConceptMap::new();
        map.concepts = (0..3)
            .map(|i| Concept::new(ConceptId(i), format!("C{i}"), i as f64 * 200.0, 0.0, 100.0, 50.0))
            .collect();
        let mut link = Connection::new(
            ConnectionId(0),
            "link",
            Endpoint::Concept(ConceptId(0)),
            Endpoint::Concept(ConceptId(1)),
            90.0,
        );
        link.extra_targets.push(ConceptId(2));
        map.connections = vec![link];
        map
    }

    const P1: PointerId = PointerId(1);
    const P2: PointerId = PointerId(2);

    #[test]
    fn concept_to_concept_adds_connection() {
        let mut draw = ConnectionDraw::new();
        draw.begin(P1, Endpoint::Concept(ConceptId(0)), Point::new(27.0, 27.0));
        assert!(draw.update(P1, Point::new(450.0, 20.0)));
        assert_eq!(
            draw.session(P1).map(|s| s.preview()),
            Some(Line::new(Point::new(27.0, 27.0), Point::new(450.0, 20.0)))
        );
        assert_eq!(
            draw.release(P1, Some(ConceptId(2)), &map()),
            Some(MapMutation::AddConnection {
                from: Endpoint::Concept(ConceptId(0)),
                to: Endpoint::Concept(ConceptId(2)),
            })
        );
        assert!(!draw.is_active(P1));
    }

    #[test]
    fn self_loop_and_empty_release_abort() {
        let mut draw = ConnectionDraw::new();
        draw.begin(P1, Endpoint::Concept(ConceptId(1)), Point::ZERO);
        assert_eq!(draw.release(P1, Some(ConceptId(1)), &map()), None);
        draw.begin(P1, Endpoint::Concept(ConceptId(1)), Point::ZERO);
        assert_eq!(draw.release(P1, None, &map()), None);
        assert!(draw.previews().is_empty());
    }

    #[test]
    fn connection_handle_fans_out() {
        let mut draw = ConnectionDraw::new();
        let from = Endpoint::Connection(ConnectionId(0));
        for (target, expected) in [(1, false), (2, false), (0, false)] {
            draw.begin(P1, from, Point::ZERO);
            assert_eq!(draw.release(P1, Some(ConceptId(target)), &map()).is_some(), expected);
        }

        let mut wider = map();
        wider.concepts.push(Concept::new(ConceptId(3), "D", 0.0, 300.0, 100.0, 50.0));
        draw.begin(P1, from, Point::ZERO);
        assert_eq!(
            draw.release(P1, Some(ConceptId(3)), &wider),
            Some(MapMutation::AddExtraTarget {
                connection: ConnectionId(0),
                target: ConceptId(3),
            })
        );
    }

    #[test]
    fn pointers_are_independent() {
        let mut draw = ConnectionDraw::new();
        draw.begin(P1, Endpoint::Concept(ConceptId(0)), Point::ZERO);
        draw.begin(P2, Endpoint::Concept(ConceptId(2)), Point::new(5.0, 5.0));
        draw.update(P2, Point::new(9.0, 9.0));
        assert_eq!(draw.session(P1).map(|s| s.current), Some(Point::ZERO));

        let second = draw.release(P2, Some(ConceptId(1)), &map());
        assert!(draw.is_active(P1));
        let first = draw.release(P1, Some(ConceptId(1)), &map());
        assert!(first.is_some() && second.is_some());
        assert_ne!(first, second);
    }

    #[test]
    fn drawing_flag_outlives_release_until_settled() {
        let mut draw = ConnectionDraw::new();
        draw.begin(P1, Endpoint::Concept(ConceptId(0)), Point::ZERO);
        draw.begin(P2, Endpoint::Concept(ConceptId(1)), Point::ZERO);
        draw.release(P1, None, &map());
        draw.settle();
        assert!(draw.is_drawing());
        assert!(draw.cancel(P2));
        assert!(draw.is_drawing());
        draw.settle();
        assert!(!draw.is_drawing());
    }
}
