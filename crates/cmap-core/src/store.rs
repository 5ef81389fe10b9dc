//! Concept-map store: the single owner of the editable graph.
//!
//! Every change goes through a reducer on [`ConceptMapStore`] (directly or
//! via [`MapMutation`]). Reducers never fail: an operation on a missing id,
//! a self-loop or a duplicate extra target is logged and ignored. Each
//! effective change is written through to the backing [`KeyValueStore`].

use crate::config::StoreConfig;
use crate::document::{DocumentError, normalize, validate};
use crate::geometry::{GeometryError, Resolver};
use crate::id::{ConceptId, ConnectionId, next_id};
use crate::length::Length;
use crate::model::{ColorTarget, Concept, ConceptMap, Connection, Endpoint};
use std::collections::HashMap;

// ─── Storage ─────────────────────────────────────────────────────────────

/// Durable string key/value storage (browser `localStorage` or memory).
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// In-memory storage for tests and headless sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

// ─── Mutations ───────────────────────────────────────────────────────────

/// A store reducer call as data. Gesture code produces these; the session
/// applies them in delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum MapMutation {
    DragConcept {
        id: ConceptId,
        dx: f64,
        dy: f64,
    },
    ScaleConcept {
        id: ConceptId,
        dx: f64,
        dy: f64,
        width: f64,
        height: f64,
    },
    SetLabel {
        target: Endpoint,
        label: String,
    },
    AdjustSizeForLabel {
        target: Endpoint,
        width: f64,
        height: Option<f64>,
    },
    SetColor {
        id: ConceptId,
        color: String,
        target: ColorTarget,
    },
    DeleteConcept {
        id: ConceptId,
    },
    DeleteConnection {
        id: ConnectionId,
    },
    AddConcept {
        x: f64,
        y: f64,
    },
    AddConnection {
        from: Endpoint,
        to: Endpoint,
    },
    AddExtraTarget {
        connection: ConnectionId,
        target: ConceptId,
    },
}

/// What applying a [`MapMutation`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Unchanged,
    Changed,
    AddedConcept(ConceptId),
    AddedConnection(ConnectionId),
}

impl Applied {
    pub fn changed(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

impl From<bool> for Applied {
    fn from(changed: bool) -> Self {
        if changed { Self::Changed } else { Self::Unchanged }
    }
}

// ─── Store ───────────────────────────────────────────────────────────────

/// Stored maps pass the same checks as opened documents.
fn restore(raw: &str) -> Result<ConceptMap, DocumentError> {
    let mut map: ConceptMap = serde_json::from_str(raw)?;
    validate(&map)?;
    normalize(&mut map);
    Ok(map)
}

pub struct ConceptMapStore {
    map: ConceptMap,
    config: StoreConfig,
    storage: Box<dyn KeyValueStore>,
}

impl ConceptMapStore {
    /// Restore the in-progress map from `storage`, or seed the first-run
    /// sample when nothing is stored.
    pub fn load(storage: Box<dyn KeyValueStore>, config: StoreConfig) -> Self {
        let map = match storage.get(&config.storage_key) {
            None => seed_map(&config),
            Some(raw) => match restore(&raw) {
                Ok(map) => map,
                Err(err) => {
                    log::warn!("discarding stored map: {err}");
                    ConceptMap {
                        title: config.default_title.clone(),
                        description: config.default_description.clone(),
                        ..ConceptMap::new()
                    }
                }
            },
        };
        let mut store = Self {
            map,
            config,
            storage,
        };
        store.persist();
        store
    }

    /// A store over fresh memory storage holding `map`.
    pub fn in_memory(map: ConceptMap, config: StoreConfig) -> Self {
        let mut store = Self {
            map,
            config,
            storage: Box::new(MemoryStorage::new()),
        };
        store.persist();
        store
    }

    pub fn map(&self) -> &ConceptMap {
        &self.map
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn storage(&self) -> &dyn KeyValueStore {
        self.storage.as_ref()
    }

    pub fn storage_mut(&mut self) -> &mut dyn KeyValueStore {
        self.storage.as_mut()
    }

    /// Replace the whole graph (open, new project).
    pub fn replace(&mut self, map: ConceptMap) {
        self.map = map;
        self.persist();
    }

    fn persist(&mut self) {
        match serde_json::to_string(&self.map) {
            Ok(json) => self.storage.set(&self.config.storage_key, &json),
            Err(err) => log::warn!("could not persist map: {err}"),
        }
    }

    fn commit(&mut self, changed: bool) -> bool {
        if changed {
            self.persist();
        }
        changed
    }

    pub fn apply(&mut self, mutation: MapMutation) -> Applied {
        match mutation {
            MapMutation::DragConcept { id, dx, dy } => self.drag_concept(id, dx, dy).into(),
            MapMutation::ScaleConcept {
                id,
                dx,
                dy,
                width,
                height,
            } => self.scale_concept(id, dx, dy, width, height).into(),
            MapMutation::SetLabel { target, label } => self.set_label(target, label).into(),
            MapMutation::AdjustSizeForLabel {
                target,
                width,
                height,
            } => self.adjust_size_for_label(target, width, height).into(),
            MapMutation::SetColor { id, color, target } => self.set_color(id, color, target).into(),
            MapMutation::DeleteConcept { id } => self.delete_concept(id).into(),
            MapMutation::DeleteConnection { id } => self.delete_connection(id).into(),
            MapMutation::AddConcept { x, y } => match self.add_concept(x, y) {
                Some(id) => Applied::AddedConcept(id),
                None => Applied::Unchanged,
            },
            MapMutation::AddConnection { from, to } => match self.add_connection(from, to) {
                Some(id) => Applied::AddedConnection(id),
                None => Applied::Unchanged,
            },
            MapMutation::AddExtraTarget { connection, target } => {
                self.add_extra_target(connection, target).into()
            }
        }
    }

    // ─── Reducers ────────────────────────────────────────────────────────

    pub fn set_title(&mut self, title: impl Into<String>) -> bool {
        let title = title.into();
        let changed = self.map.title != title;
        self.map.title = title;
        self.commit(changed)
    }

    pub fn set_description(&mut self, description: impl Into<String>) -> bool {
        let description = description.into();
        let changed = self.map.description != description;
        self.map.description = description;
        self.commit(changed)
    }

    /// Translate by a canvas-space delta.
    pub fn drag_concept(&mut self, id: ConceptId, dx: f64, dy: f64) -> bool {
        let Some(concept) = self.map.concept_mut(id) else {
            log::debug!("drag: {id} not found");
            return false;
        };
        concept.x += dx;
        concept.y += dy;
        self.commit(dx != 0.0 || dy != 0.0)
    }

    /// Shift by `(dx, dy)` and set the size in one step.
    pub fn scale_concept(&mut self, id: ConceptId, dx: f64, dy: f64, width: f64, height: f64) -> bool {
        let (min_w, min_h) = (self.config.min_concept_width, self.config.min_concept_height);
        let Some(concept) = self.map.concept_mut(id) else {
            log::debug!("scale: {id} not found");
            return false;
        };
        concept.x += dx;
        concept.y += dy;
        concept.width = Length(width.max(min_w));
        concept.height = Length(height.max(min_h));
        self.commit(true)
    }

    /// Change label text only. Size follows through [`Self::adjust_size_for_label`].
    pub fn set_label(&mut self, target: Endpoint, label: impl Into<String>) -> bool {
        let label = label.into();
        let slot = match target {
            Endpoint::Concept(id) => self.map.concept_mut(id).map(|c| &mut c.label),
            Endpoint::Connection(id) => self.map.connection_mut(id).map(|c| &mut c.label),
        };
        let Some(slot) = slot else {
            log::debug!("label: {target} not found");
            return false;
        };
        let changed = *slot != label;
        *slot = label;
        self.commit(changed)
    }

    /// Apply a measured text footprint. Connections only take the width.
    pub fn adjust_size_for_label(&mut self, target: Endpoint, width: f64, height: Option<f64>) -> bool {
        let changed = match target {
            Endpoint::Concept(id) => self.map.concept_mut(id).map(|c| {
                let before = (c.width, c.height);
                c.width = Length(width);
                if let Some(height) = height {
                    c.height = Length(height);
                }
                before != (c.width, c.height)
            }),
            Endpoint::Connection(id) => self.map.connection_mut(id).map(|c| {
                let before = c.width;
                c.width = Length(width);
                before != c.width
            }),
        };
        match changed {
            Some(changed) => self.commit(changed),
            None => {
                log::debug!("resize for label: {target} not found");
                false
            }
        }
    }

    pub fn set_color(&mut self, id: ConceptId, color: impl Into<String>, target: ColorTarget) -> bool {
        let color = color.into();
        let Some(concept) = self.map.concept_mut(id) else {
            log::debug!("color: {id} not found");
            return false;
        };
        let slot = match target {
            ColorTarget::Background => &mut concept.background_color,
            ColorTarget::Text => &mut concept.text_color,
        };
        let changed = *slot != color;
        *slot = color;
        self.commit(changed)
    }

    /// Remove a concept, every connection that starts or ends on it, and
    /// every extra-target reference to it.
    pub fn delete_concept(&mut self, id: ConceptId) -> bool {
        let before = self.map.concepts.len();
        self.map.concepts.retain(|c| c.id != id);
        if self.map.concepts.len() == before {
            log::debug!("delete: {id} not found");
            return false;
        }
        let endpoint = Endpoint::Concept(id);
        self.map.connections.retain(|c| !c.touches(endpoint));
        for conn in &mut self.map.connections {
            conn.extra_targets.retain(|t| *t != id);
        }
        self.commit(true)
    }

    /// Remove one connection. Connections resolving through it are left in
    /// place and stop rendering.
    pub fn delete_connection(&mut self, id: ConnectionId) -> bool {
        let before = self.map.connections.len();
        self.map.connections.retain(|c| c.id != id);
        let changed = self.map.connections.len() != before;
        if !changed {
            log::debug!("delete: {id} not found");
        }
        self.commit(changed)
    }

    /// New default-sized concept centered on `(x, y)`.
    pub fn add_concept(&mut self, x: f64, y: f64) -> Option<ConceptId> {
        let Some(raw) = next_id(self.map.concepts.iter().map(|c| c.id.0)) else {
            log::warn!("rejecting concept: id space exhausted");
            return None;
        };
        let id = ConceptId(raw);
        let (w, h) = (self.config.default_concept_width, self.config.default_concept_height);
        self.map.concepts.push(Concept::new(
            id,
            self.config.default_concept_label.clone(),
            x - w / 2.0,
            y - h / 2.0,
            w,
            h,
        ));
        self.commit(true);
        Some(id)
    }

    /// Append a connection between two live, distinct endpoints.
    pub fn add_connection(&mut self, from: Endpoint, to: Endpoint) -> Option<ConnectionId> {
        if from == to {
            log::debug!("rejecting self-loop on {from}");
            return None;
        }
        if let Some(missing) = [from, to].into_iter().find(|e| !self.map.contains(*e)) {
            log::debug!("rejecting connection to missing {missing}");
            return None;
        }
        let Some(raw) = next_id(self.map.connections.iter().map(|c| c.id.0)) else {
            log::warn!("rejecting connection: id space exhausted");
            return None;
        };
        let id = ConnectionId(raw);
        let conn = Connection::new(
            id,
            self.config.default_connection_label.clone(),
            from,
            to,
            self.config.default_connection_width,
        );
        self.map.connections.push(conn);
        let resolved = Resolver::new(&self.map).connection_center(id);
        if let Err(err @ GeometryError::Cycle(_)) = resolved {
            log::warn!("rejecting connection: {err}");
            self.map.connections.pop();
            return None;
        }
        self.commit(true);
        Some(id)
    }

    /// Fan an existing connection out to one more concept.
    pub fn add_extra_target(&mut self, connection: ConnectionId, target: ConceptId) -> bool {
        if self.map.concept(target).is_none() {
            log::debug!("extra target: {target} not found");
            return false;
        }
        let Some(conn) = self.map.connection_mut(connection) else {
            log::debug!("extra target: {connection} not found");
            return false;
        };
        if !conn.accepts_extra_target(target) {
            log::debug!("extra target: {target} already attached to {connection}");
            return false;
        }
        conn.extra_targets.push(target);
        self.commit(true)
    }
}

/// The two-concept sample shown on first run.
pub fn seed_map(config: &StoreConfig) -> ConceptMap {
    let a = Concept::new(ConceptId(0), "Concept 0", 150.0, 200.0, 100.0, 50.0);
    let b = Concept::new(ConceptId(1), "Concept 1", 150.0, 500.0, 100.0, 50.0);
    let link = Connection::new(
        ConnectionId(0),
        "Connection 0",
        Endpoint::Concept(a.id),
        Endpoint::Concept(b.id),
        config.default_connection_width,
    );
    ConceptMap {
        title: config.default_title.clone(),
        description: config.default_description.clone(),
        concepts: vec![a, b],
        connections: vec![link],
    }
}
