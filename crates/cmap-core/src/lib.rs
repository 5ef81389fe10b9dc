pub mod config;
pub mod document;
pub mod geometry;
pub mod id;
pub mod length;
pub mod model;
pub mod store;

pub use config::CanvasConfig;
pub use document::{DocumentError, ProjectDocument, safe_filename};
pub use geometry::{Chrome, ConnectionGeometry, GeometryError, Resolver, SceneLayout};
pub use id::{ConceptId, ConnectionId};
pub use length::Length;
pub use model::*;
pub use store::{Applied, ConceptMapStore, KeyValueStore, MapMutation, MemoryStorage};

// Re-export kurbo types so downstream crates share one geometry vocabulary
pub use kurbo::{Line, Point, Rect, Size, Vec2};
