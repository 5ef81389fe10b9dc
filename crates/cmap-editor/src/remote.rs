//! Remote project service contract.
//!
//! The service itself lives elsewhere; this module fixes the request and
//! response shapes of `POST/GET/DELETE /projects` and provides an
//! in-memory implementation that honors ownership, authentication, and
//! listing order.

use cmap_core::ProjectDocument;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("not signed in")]
    Unauthorized,
    #[error("project {0} not found")]
    NotFound(String),
    #[error("request failed: {0}")]
    Transport(String),
}

impl RemoteError {
    /// Map an HTTP status from the service. `None` for success codes.
    pub fn from_status(status: u16, id: Option<&str>) -> Option<Self> {
        match status {
            200..=299 => None,
            401 => Some(RemoteError::Unauthorized),
            404 => Some(RemoteError::NotFound(id.unwrap_or_default().to_string())),
            other => Some(RemoteError::Transport(format!("status {other}"))),
        }
    }
}

/// Body of a successful `POST /projects`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSaved {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Milliseconds since the Unix epoch.
    pub updated_at: u64,
}

/// One entry of `GET /projects`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub updated_at: u64,
}

pub trait ProjectApi {
    /// Create when `doc.id` is `None`, otherwise update a project the
    /// current user owns.
    fn save(&mut self, doc: &ProjectDocument) -> Result<ProjectSaved, RemoteError>;
    fn fetch(&self, id: &str) -> Result<ProjectDocument, RemoteError>;
    /// Newest first.
    fn list(&self) -> Result<Vec<ProjectSummary>, RemoteError>;
    fn delete(&mut self, id: &str) -> Result<(), RemoteError>;
}

// ─── In-memory service ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct StoredProject {
    owner: String,
    doc: ProjectDocument,
    updated_at: u64,
}

#[derive(Debug, Default)]
pub struct MemoryProjects {
    user: Option<String>,
    projects: HashMap<String, StoredProject>,
    clock: u64,
    next_id: u64,
}

impl MemoryProjects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in(&mut self, user: impl Into<String>) {
        self.user = Some(user.into());
    }

    pub fn sign_out(&mut self) {
        self.user = None;
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn current_user(&self) -> Result<&str, RemoteError> {
        self.user.as_deref().ok_or(RemoteError::Unauthorized)
    }

    fn owned(&self, id: &str) -> Result<&StoredProject, RemoteError> {
        let user = self.current_user()?;
        self.projects
            .get(id)
            .filter(|p| p.owner == user)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }
}

impl ProjectApi for MemoryProjects {
    fn save(&mut self, doc: &ProjectDocument) -> Result<ProjectSaved, RemoteError> {
        let user = self.current_user()?.to_string();
        let id = match &doc.id {
            Some(id) => {
                self.owned(id)?;
                id.clone()
            }
            None => {
                self.next_id += 1;
                format!("{:024x}", self.next_id)
            }
        };
        let updated_at = self.tick();
        let stored = ProjectDocument {
            id: Some(id.clone()),
            ..doc.clone()
        };
        log::debug!("remote: saved project {id} for {user}");
        self.projects.insert(
            id.clone(),
            StoredProject {
                owner: user,
                doc: stored,
                updated_at,
            },
        );
        Ok(ProjectSaved {
            id,
            title: doc.map.title.clone(),
            description: doc.map.description.clone(),
            updated_at,
        })
    }

    fn fetch(&self, id: &str) -> Result<ProjectDocument, RemoteError> {
        Ok(self.owned(id)?.doc.clone())
    }

    fn list(&self) -> Result<Vec<ProjectSummary>, RemoteError> {
        let user = self.current_user()?;
        let mut out: Vec<ProjectSummary> = self
            .projects
            .iter()
            .filter(|(_, p)| p.owner == user)
            .map(|(id, p)| ProjectSummary {
                id: id.clone(),
                title: p.doc.map.title.clone(),
                description: p.doc.map.description.clone(),
                thumbnail: p.doc.thumbnail_light.clone(),
                updated_at: p.updated_at,
            })
            .collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(out)
    }

    fn delete(&mut self, id: &str) -> Result<(), RemoteError> {
        self.owned(id)?;
        self.projects.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmap_core::ConceptMap;

    fn doc(title: &str) -> ProjectDocument {
        ProjectDocument::from_map(ConceptMap {
            title: title.into(),
            ..ConceptMap::new()
        })
    }

    #[test]
    fn requires_session() {
        let mut api = MemoryProjects::new();
        assert_eq!(api.save(&doc("a")), Err(RemoteError::Unauthorized));
        assert_eq!(api.list(), Err(RemoteError::Unauthorized));
    }

    #[test]
    fn create_then_update_keeps_id() {
        let mut api = MemoryProjects::new();
        api.sign_in("ada");
        let created = api.save(&doc("first")).unwrap();
        let mut next = doc("renamed");
        next.id = Some(created.id.clone());
        let updated = api.save(&next).unwrap();
        assert_eq!(updated.id, created.id);
        assert!(updated.updated_at > created.updated_at);
        assert_eq!(api.fetch(&created.id).unwrap().map.title, "renamed");
    }

    #[test]
    fn other_users_projects_are_not_found() {
        let mut api = MemoryProjects::new();
        api.sign_in("ada");
        let saved = api.save(&doc("mine")).unwrap();
        api.sign_in("bob");
        assert!(matches!(api.fetch(&saved.id), Err(RemoteError::NotFound(_))));
        assert!(matches!(api.delete(&saved.id), Err(RemoteError::NotFound(_))));
        let mut steal = doc("x");
        steal.id = Some(saved.id.clone());
        assert!(matches!(api.save(&steal), Err(RemoteError::NotFound(_))));
        assert!(api.list().unwrap().is_empty());
    }

    #[test]
    fn list_is_newest_first() {
        let mut api = MemoryProjects::new();
        api.sign_in("ada");
        let a = api.save(&doc("a")).unwrap();
        let b = api.save(&doc("b")).unwrap();
        let mut touch = doc("a2");
        touch.id = Some(a.id.clone());
        api.save(&touch).unwrap();
        let ids: Vec<String> = api.list().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![a.id.clone(), b.id]);

        api.delete(&a.id).unwrap();
        assert_eq!(api.list().unwrap().len(), 1);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(RemoteError::from_status(200, None), None);
        assert_eq!(RemoteError::from_status(401, None), Some(RemoteError::Unauthorized));
        assert_eq!(
            RemoteError::from_status(404, Some("x")),
            Some(RemoteError::NotFound("x".into()))
        );
    }
}
