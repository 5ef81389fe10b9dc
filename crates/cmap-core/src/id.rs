use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a concept. Concepts and connections allocate ids from
/// separate spaces, so a `ConceptId(3)` and a `ConnectionId(3)` may coexist.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConceptId(pub u32);

/// Identifier of a connection.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u32);

impl fmt::Debug for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "concept#{}", self.0)
    }
}

impl fmt::Display for ConceptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "concept#{}", self.0)
    }
}

impl fmt::Debug for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection#{}", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "connection#{}", self.0)
    }
}

/// Allocate the next id in a space: `max(existing) + 1`, or `0` when empty.
/// `None` once `u32::MAX` is taken.
///
/// Ids are never reused while a higher id is alive, but deleting the
/// highest id frees it for the next allocation.
pub fn next_id(existing: impl IntoIterator<Item = u32>) -> Option<u32> {
    match existing.into_iter().max() {
        Some(max) => max.checked_add(1),
        None => Some(0),
    }
}
