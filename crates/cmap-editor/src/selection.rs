//! Selection and edit modes for concepts and connections.
//!
//! An id is in at most one of three modes: selected, label editing, or
//! color editing. Every operation that moves an id into a mode takes it out
//! of the others, so callers never have to keep the sets consistent.

use cmap_core::{ColorTarget, ConceptId, ConnectionId};
use serde::Serialize;
use smallvec::SmallVec;

/// An open color picker on one side of a concept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColorEdit {
    pub id: ConceptId,
    pub target: ColorTarget,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    selected_concepts: Vec<ConceptId>,
    selected_connections: Vec<ConnectionId>,
    editing_concepts: Vec<ConceptId>,
    editing_connections: Vec<ConnectionId>,
    color_edits: SmallVec<[ColorEdit; 2]>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_concepts(&self) -> &[ConceptId] {
        &self.selected_concepts
    }

    pub fn selected_connections(&self) -> &[ConnectionId] {
        &self.selected_connections
    }

    pub fn editing_concepts(&self) -> &[ConceptId] {
        &self.editing_concepts
    }

    pub fn editing_connections(&self) -> &[ConnectionId] {
        &self.editing_connections
    }

    pub fn color_edits(&self) -> &[ColorEdit] {
        &self.color_edits
    }

    pub fn is_concept_selected(&self, id: ConceptId) -> bool {
        self.selected_concepts.contains(&id)
    }

    pub fn is_connection_selected(&self, id: ConnectionId) -> bool {
        self.selected_connections.contains(&id)
    }

    pub fn is_editing_concept(&self, id: ConceptId) -> bool {
        self.editing_concepts.contains(&id)
    }

    pub fn is_editing_connection(&self, id: ConnectionId) -> bool {
        self.editing_connections.contains(&id)
    }

    pub fn is_coloring(&self, id: ConceptId, target: ColorTarget) -> bool {
        self.color_edits.iter().any(|e| e.id == id && e.target == target)
    }

    /// True while any label editor is open. The viewport locks on this.
    pub fn is_editing(&self) -> bool {
        !self.editing_concepts.is_empty() || !self.editing_connections.is_empty()
    }

    // ─── Concepts ────────────────────────────────────────────────────────

    /// Select `id` (leaving any edit mode), or deselect it if selected.
    pub fn toggle_concept(&mut self, id: ConceptId) {
        if self.is_concept_selected(id) {
            self.deselect_concept(id);
            return;
        }
        self.stop_editing_concept(id);
        self.stop_coloring(id, None);
        self.selected_concepts.push(id);
    }

    pub fn deselect_concept(&mut self, id: ConceptId) {
        self.selected_concepts.retain(|c| *c != id);
    }

    /// Open the label editor for `id`.
    pub fn start_editing_concept(&mut self, id: ConceptId) {
        self.deselect_concept(id);
        self.stop_coloring(id, None);
        if !self.is_editing_concept(id) {
            self.editing_concepts.push(id);
        }
    }

    pub fn stop_editing_concept(&mut self, id: ConceptId) {
        self.editing_concepts.retain(|c| *c != id);
    }

    /// Open the color picker for one side of `id`.
    pub fn start_coloring(&mut self, id: ConceptId, target: ColorTarget) {
        self.deselect_concept(id);
        self.stop_editing_concept(id);
        if !self.is_coloring(id, target) {
            self.color_edits.push(ColorEdit { id, target });
        }
    }

    /// Close one picker of `id`, or all of them when `target` is `None`.
    pub fn stop_coloring(&mut self, id: ConceptId, target: Option<ColorTarget>) {
        self.color_edits
            .retain(|e| !(e.id == id && target.is_none_or(|t| t == e.target)));
    }

    // ─── Connections ─────────────────────────────────────────────────────

    pub fn toggle_connection(&mut self, id: ConnectionId) {
        if self.is_connection_selected(id) {
            self.deselect_connection(id);
            return;
        }
        self.stop_editing_connection(id);
        self.selected_connections.push(id);
    }

    pub fn deselect_connection(&mut self, id: ConnectionId) {
        self.selected_connections.retain(|c| *c != id);
    }

    pub fn start_editing_connection(&mut self, id: ConnectionId) {
        self.deselect_connection(id);
        if !self.is_editing_connection(id) {
            self.editing_connections.push(id);
        }
    }

    pub fn stop_editing_connection(&mut self, id: ConnectionId) {
        self.editing_connections.retain(|c| *c != id);
    }

    // ─── Bulk ────────────────────────────────────────────────────────────

    /// Drop every id the graph no longer contains.
    pub fn retain_live(&mut self, concept: impl Fn(ConceptId) -> bool, connection: impl Fn(ConnectionId) -> bool) {
        self.selected_concepts.retain(|id| concept(*id));
        self.editing_concepts.retain(|id| concept(*id));
        self.color_edits.retain(|e| concept(e.id));
        self.selected_connections.retain(|id| connection(*id));
        self.editing_connections.retain(|id| connection(*id));
    }

    /// Leave every mode. Used when the project changes under the editor.
    pub fn clear(&mut self) {
        self.selected_concepts.clear();
        self.selected_connections.clear();
        self.editing_concepts.clear();
        self.editing_connections.clear();
        self.color_edits.clear();
    }
}
