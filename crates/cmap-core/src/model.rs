//! Concept-map data model.
//!
//! A map is a flat list of rectangular concepts plus a list of directed
//! connections. A connection endpoint is either a concept or another
//! connection, so the "position" of a connection is never stored: it is
//! derived from whatever its endpoints resolve to (see [`crate::geometry`]).

use crate::id::{ConceptId, ConnectionId};
use crate::length::Length;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt::Write as _;

// ─── Colors ──────────────────────────────────────────────────────────────

/// RGBA color. Stored as 4 × f32 [0.0, 1.0].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Helper to parse a single hex digit.
pub fn hex_val(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Color {
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, 1.0)
    }

    /// Parse `#RGB`, `#RRGGBB` or `#RRGGBBAA`; the `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let bytes = hex.as_bytes();
        let pair = |i: usize| -> Option<u8> { Some(hex_val(bytes[i])? << 4 | hex_val(bytes[i + 1])?) };

        match bytes.len() {
            3 => {
                let r = hex_val(bytes[0])? * 17;
                let g = hex_val(bytes[1])? * 17;
                let b = hex_val(bytes[2])? * 17;
                Some(Self::rgb8(r, g, b))
            }
            6 => Some(Self::rgb8(pair(0)?, pair(2)?, pair(4)?)),
            8 => {
                let mut c = Self::rgb8(pair(0)?, pair(2)?, pair(4)?);
                c.a = pair(6)? as f32 / 255.0;
                Some(c)
            }
            _ => None,
        }
    }

    /// `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let [r, g, b, a] = self.to_rgba8();
        let mut out = String::with_capacity(9);
        let _ = write!(out, "#{r:02X}{g:02X}{b:02X}");
        if a != 255 {
            let _ = write!(out, "{a:02X}");
        }
        out
    }

    pub fn to_rgba8(&self) -> [u8; 4] {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(self.a)]
    }
}

/// Which of a concept's two colors a color edit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorTarget {
    Background,
    Text,
}

// ─── Endpoints ───────────────────────────────────────────────────────────

/// On-disk discriminator for a connection endpoint id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    #[default]
    Concept,
    Connection,
}

impl EndpointKind {
    pub fn is_concept(&self) -> bool {
        matches!(self, Self::Concept)
    }
}

/// Something a connection can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Endpoint {
    Concept(ConceptId),
    Connection(ConnectionId),
}

impl Endpoint {
    pub fn new(kind: EndpointKind, raw: u32) -> Self {
        match kind {
            EndpointKind::Concept => Self::Concept(ConceptId(raw)),
            EndpointKind::Connection => Self::Connection(ConnectionId(raw)),
        }
    }

    pub fn kind(&self) -> EndpointKind {
        match self {
            Self::Concept(_) => EndpointKind::Concept,
            Self::Connection(_) => EndpointKind::Connection,
        }
    }

    pub fn raw(&self) -> u32 {
        match self {
            Self::Concept(id) => id.0,
            Self::Connection(id) => id.0,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Concept(id) => id.fmt(f),
            Self::Connection(id) => id.fmt(f),
        }
    }
}

// ─── Concept ─────────────────────────────────────────────────────────────

/// A rectangular node. `x`/`y` is the top-left corner in canvas units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concept {
    pub id: ConceptId,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: Length,
    pub height: Length,
    /// Hex color, empty = inherit from theme.
    #[serde(default)]
    pub background_color: String,
    /// Hex color, empty = inherit from theme.
    #[serde(default)]
    pub text_color: String,
}

impl Concept {
    pub fn new(id: ConceptId, label: impl Into<String>, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id,
            label: label.into(),
            x,
            y,
            width: Length(width),
            height: Length(height),
            background_color: String::new(),
            text_color: String::new(),
        }
    }

    pub fn color(&self, target: ColorTarget) -> &str {
        match target {
            ColorTarget::Background => &self.background_color,
            ColorTarget::Text => &self.text_color,
        }
    }

    /// Parsed override color, `None` when inheriting or unparseable.
    pub fn resolved_color(&self, target: ColorTarget) -> Option<Color> {
        let raw = self.color(target);
        if raw.is_empty() { None } else { Color::from_hex(raw) }
    }

    pub fn is_multiline(&self) -> bool {
        self.label.contains('\n')
    }
}

// ─── Connection ──────────────────────────────────────────────────────────

/// A directed labeled edge. `from`/`to` are raw ids interpreted through
/// `from_type`/`to_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub label: String,
    pub from: u32,
    pub to: u32,
    #[serde(default, skip_serializing_if = "EndpointKind::is_concept")]
    pub from_type: EndpointKind,
    #[serde(default, skip_serializing_if = "EndpointKind::is_concept")]
    pub to_type: EndpointKind,
    /// Additional fan-out arrows from this connection's midpoint.
    #[serde(default, skip_serializing_if = "SmallVec::is_empty")]
    pub extra_targets: SmallVec<[ConceptId; 2]>,
    /// Label text width (without the box chrome).
    pub width: Length,
}

impl Connection {
    pub fn new(id: ConnectionId, label: impl Into<String>, from: Endpoint, to: Endpoint, width: f64) -> Self {
        Self {
            id,
            label: label.into(),
            from: from.raw(),
            to: to.raw(),
            from_type: from.kind(),
            to_type: to.kind(),
            extra_targets: SmallVec::new(),
            width: Length(width),
        }
    }

    pub fn source(&self) -> Endpoint {
        Endpoint::new(self.from_type, self.from)
    }

    pub fn target(&self) -> Endpoint {
        Endpoint::new(self.to_type, self.to)
    }

    /// True when `endpoint` is this connection's `from` or `to`.
    pub fn touches(&self, endpoint: Endpoint) -> bool {
        self.source() == endpoint || self.target() == endpoint
    }

    /// Whether `concept` may be appended as a new extra target.
    pub fn accepts_extra_target(&self, concept: ConceptId) -> bool {
        let as_endpoint = Endpoint::Concept(concept);
        !self.touches(as_endpoint) && !self.extra_targets.contains(&concept)
    }
}

// ─── Map ─────────────────────────────────────────────────────────────────

/// The editable graph: title, description, concepts, connections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptMap {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub concepts: Vec<Concept>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Default for ConceptMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ConceptMap {
    pub fn new() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            concepts: Vec::new(),
            connections: Vec::new(),
        }
    }

    pub fn concept(&self, id: ConceptId) -> Option<&Concept> {
        self.concepts.iter().find(|c| c.id == id)
    }

    pub fn concept_mut(&mut self, id: ConceptId) -> Option<&mut Concept> {
        self.concepts.iter_mut().find(|c| c.id == id)
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut Connection> {
        self.connections.iter_mut().find(|c| c.id == id)
    }

    pub fn contains(&self, endpoint: Endpoint) -> bool {
        match endpoint {
            Endpoint::Concept(id) => self.concept(id).is_some(),
            Endpoint::Connection(id) => self.connection(id).is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty() && self.connections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hex_color_roundtrip_forms() {
        let c = Color::from_hex("#6C5CE7").unwrap();
        assert_eq!(c.to_hex(), "#6C5CE7");
        let short = Color::from_hex("fff").unwrap();
        assert_eq!(short.to_hex(), "#FFFFFF");
        let translucent = Color::from_hex("#FF000080").unwrap();
        assert_eq!(translucent.to_hex(), "#FF000080");
        assert!(Color::from_hex("#12").is_none());
        assert!(Color::from_hex("#GGGGGG").is_none());
    }

    #[test]
    fn connection_omits_default_fields() {
        let conn = Connection::new(
            ConnectionId(0),
            "relates to",
            Endpoint::Concept(ConceptId(0)),
            Endpoint::Concept(ConceptId(1)),
            90.0,
        );
        let json = serde_json::to_string(&conn).unwrap();
        assert_eq!(
            json,
            r#"{"id":0,"label":"relates to","from":0,"to":1,"width":"90px"}"#
        );
    }

    #[test]
    fn connection_reads_endpoint_kinds() {
        let conn: Connection = serde_json::from_str(
            r#"{"id":3,"label":"","from":1,"to":0,"fromType":"connection","width":"90","extraTargets":[4,5]}"#,
        )
        .unwrap();
        assert_eq!(conn.source(), Endpoint::Connection(ConnectionId(1)));
        assert_eq!(conn.target(), Endpoint::Concept(ConceptId(0)));
        assert_eq!(conn.extra_targets.as_slice(), &[ConceptId(4), ConceptId(5)]);
    }

    #[test]
    fn concept_colors_default_to_inherit() {
        let concept: Concept = serde_json::from_str(
            r#"{"id":0,"label":"A","x":1,"y":2,"width":"100px","height":"50px"}"#,
        )
        .unwrap();
        assert_eq!(concept.background_color, "");
        assert_eq!(concept.resolved_color(ColorTarget::Background), None);
    }

    #[test]
    fn extra_target_acceptance() {
        let mut conn = Connection::new(
            ConnectionId(0),
            "",
            Endpoint::Concept(ConceptId(1)),
            Endpoint::Concept(ConceptId(2)),
            90.0,
        );
        conn.extra_targets.push(ConceptId(3));
        assert!(!conn.accepts_extra_target(ConceptId(1)));
        assert!(!conn.accepts_extra_target(ConceptId(2)));
        assert!(!conn.accepts_extra_target(ConceptId(3)));
        assert!(conn.accepts_extra_target(ConceptId(4)));
    }
}
