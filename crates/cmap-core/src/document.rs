//! Persisted project documents (local file and remote share one schema).

use crate::id::{ConceptId, ConnectionId};
use crate::model::{ConceptMap, Endpoint};
use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed project document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate concept id {0}")]
    DuplicateConcept(ConceptId),
    #[error("duplicate connection id {0}")]
    DuplicateConnection(ConnectionId),
    #[error("connection references form a cycle through {0}")]
    Cycle(ConnectionId),
}

/// `{ id?, title, description, concepts, connections, thumbnailLight?, thumbnailDark? }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub map: ConceptMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_light: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_dark: Option<String>,
}

impl ProjectDocument {
    pub fn from_map(map: ConceptMap) -> Self {
        Self {
            id: None,
            map,
            thumbnail_light: None,
            thumbnail_dark: None,
        }
    }

    /// Parse and validate. Extra-target lists are normalized on the way in.
    pub fn from_json(json: &str) -> Result<Self, DocumentError> {
        let mut doc: ProjectDocument = serde_json::from_str(json)?;
        validate(&doc.map)?;
        normalize(&mut doc.map);
        Ok(doc)
    }

    pub fn to_json_pretty(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn into_map(self) -> ConceptMap {
        self.map
    }
}

/// Reject maps whose ids collide or whose connection references loop.
pub fn validate(map: &ConceptMap) -> Result<(), DocumentError> {
    let mut seen = HashSet::new();
    for concept in &map.concepts {
        if !seen.insert(concept.id) {
            return Err(DocumentError::DuplicateConcept(concept.id));
        }
    }
    let mut seen = HashSet::new();
    for conn in &map.connections {
        if !seen.insert(conn.id) {
            return Err(DocumentError::DuplicateConnection(conn.id));
        }
    }
    if let Some(id) = find_cycle(map) {
        return Err(DocumentError::Cycle(id));
    }
    Ok(())
}

/// A connection on a connection→connection reference cycle, if any.
pub fn find_cycle(map: &ConceptMap) -> Option<ConnectionId> {
    let mut refs: DiGraphMap<ConnectionId, ()> = DiGraphMap::new();
    for conn in &map.connections {
        refs.add_node(conn.id);
        for endpoint in [conn.source(), conn.target()] {
            if let Endpoint::Connection(dep) = endpoint {
                if dep == conn.id {
                    return Some(conn.id);
                }
                refs.add_edge(conn.id, dep, ());
            }
        }
    }
    if !is_cyclic_directed(&refs) {
        return None;
    }
    // Report the first connection that can reach itself.
    refs.nodes().find(|&start| {
        let mut dfs = petgraph::visit::Dfs::new(&refs, start);
        dfs.next(&refs);
        while let Some(node) = dfs.next(&refs) {
            if refs.contains_edge(node, start) {
                return true;
            }
        }
        refs.contains_edge(start, start)
    })
}

/// Drop extra targets that repeat, coincide with `from`/`to`, or point at
/// missing concepts.
pub fn normalize(map: &mut ConceptMap) {
    let live: HashSet<ConceptId> = map.concepts.iter().map(|c| c.id).collect();
    for conn in &mut map.connections {
        let (from, to) = (conn.source(), conn.target());
        let mut kept = HashSet::new();
        conn.extra_targets.retain(|t| {
            let endpoint = Endpoint::Concept(*t);
            live.contains(t) && endpoint != from && endpoint != to && kept.insert(*t)
        });
    }
}

/// File name for a downloaded project: reserved characters become `-`.
pub fn safe_filename(title: &str, extension: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| match c {
            '/' | '\\' | '?' | '%' | '*' | ':' | '|' | '"' | '<' | '>' => '-',
            other => other,
        })
        .collect();
    let stem = cleaned.trim();
    let stem = if stem.is_empty() { "concept_map" } else { stem };
    format!("{stem}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_filename_replaces_reserved() {
        assert_eq!(safe_filename("a/b:c?", "json"), "a-b-c-.json");
        assert_eq!(safe_filename("   ", "json"), "concept_map.json");
        assert_eq!(safe_filename(" Biology ", "png"), "Biology.png");
    }

    #[test]
    fn rejects_duplicate_concepts() {
        let json = r#"{"title":"t","description":"","concepts":[
            {"id":0,"label":"a","x":0,"y":0,"width":"100px","height":"50px"},
            {"id":0,"label":"b","x":0,"y":0,"width":"100px","height":"50px"}
        ],"connections":[]}"#;
        assert!(matches!(
            ProjectDocument::from_json(json),
            Err(DocumentError::DuplicateConcept(ConceptId(0)))
        ));
    }

    #[test]
    fn rejects_reference_cycle() {
        let json = r#"{"title":"t","description":"","concepts":[],"connections":[
            {"id":0,"label":"","from":1,"to":0,"fromType":"connection","toType":"connection","width":"90"},
            {"id":1,"label":"","from":0,"to":0,"fromType":"connection","width":"90"}
        ]}"#;
        assert!(matches!(
            ProjectDocument::from_json(json),
            Err(DocumentError::Cycle(_))
        ));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        assert!(matches!(
            ProjectDocument::from_json("{\"title\":"),
            Err(DocumentError::Parse(_))
        ));
    }

    #[test]
    fn normalizes_extra_targets() {
        let json = r#"{"title":"t","description":"","concepts":[
            {"id":0,"label":"a","x":0,"y":0,"width":"100px","height":"50px"},
            {"id":1,"label":"b","x":0,"y":0,"width":"100px","height":"50px"},
            {"id":2,"label":"c","x":0,"y":0,"width":"100px","height":"50px"}
        ],"connections":[
            {"id":0,"label":"","from":0,"to":1,"width":"90","extraTargets":[2,1,2,7]}
        ]}"#;
        let doc = ProjectDocument::from_json(json).unwrap();
        assert_eq!(doc.map.connections[0].extra_targets.as_slice(), &[ConceptId(2)]);
    }

    #[test]
    fn optional_fields_are_omitted() {
        let doc = ProjectDocument::from_map(ConceptMap::new());
        let json = serde_json::to_string(&doc).unwrap();
        assert_eq!(json, r#"{"title":"","description":"","concepts":[],"connections":[]}"#);
    }
}
