//! Actor Registry
//!
//! Name-based actor discovery and lifecycle bookkeeping.
//!
//! # Lock Ordering
//!
//! When acquiring both locks, ALWAYS take `by_name` before `entries`.

use crate::{ActorError, Result};
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Unique actor identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActorId {
    id: Uuid,
}

impl ActorId {
    /// Create new actor ID
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
        }
    }

    /// Create from UUID
    pub fn from_uuid(id: Uuid) -> Self {
        Self { id }
    }

    /// Get UUID
    pub fn uuid(&self) -> Uuid {
        self.id
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor-{}", self.id.simple())
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

/// Actor status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorStatus {
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
    Restarting,
}

impl ActorStatus {
    /// Whether the actor can still process messages
    pub fn is_live(&self) -> bool {
        matches!(self, ActorStatus::Starting | ActorStatus::Running)
    }
}

/// Bookkeeping for one actor incarnation
#[derive(Debug, Clone)]
pub struct ActorEntry {
    pub name: String,
    pub generation: u64,
    pub status: ActorStatus,
    pub started_at: Instant,
}

/// Actor registry keyed by id, with a name index pointing at the newest incarnation
#[derive(Debug, Default)]
pub struct ActorRegistry {
    by_name: RwLock<HashMap<String, ActorId>>,
    entries: RwLock<HashMap<ActorId, ActorEntry>>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an actor incarnation.
    ///
    /// A previous incarnation under the same name is dropped from the
    /// registry and its id returned.
    pub async fn register_actor(&self, id: ActorId, name: &str, generation: u64) -> Option<ActorId> {
        tracing::debug!(actor_id = %id, name = %name, generation, "Registering actor");

        let mut by_name = self.by_name.write().await;
        let mut entries = self.entries.write().await;

        let previous = by_name.insert(name.to_string(), id.clone());
        if let Some(old) = &previous {
            entries.remove(old);
        }

        entries.insert(
            id,
            ActorEntry {
                name: name.to_string(),
                generation,
                status: ActorStatus::Starting,
                started_at: Instant::now(),
            },
        );

        previous
    }

    /// Update an actor's status
    pub async fn set_status(&self, id: &ActorId, status: ActorStatus) {
        let mut entries = self.entries.write().await;
        match entries.get_mut(id) {
            Some(entry) => {
                let old = entry.status;
                entry.status = status;
                tracing::debug!(
                    actor_id = %id,
                    name = %entry.name,
                    "Actor status change: {:?} -> {:?}",
                    old,
                    status
                );
            }
            None => {
                tracing::debug!(actor_id = %id, ?status, "Status update for unregistered actor ignored");
            }
        }
    }

    /// Unregister actor
    pub async fn unregister_actor(&self, id: &ActorId) -> Result<()> {
        tracing::debug!("Unregistering actor: {}", id);

        let mut by_name = self.by_name.write().await;
        let mut entries = self.entries.write().await;

        match entries.remove(id) {
            Some(entry) => {
                if by_name.get(&entry.name) == Some(id) {
                    by_name.remove(&entry.name);
                }
                Ok(())
            }
            None => {
                tracing::warn!("Attempted to unregister unknown actor: {}", id);
                Err(ActorError::not_found(id.to_string()))
            }
        }
    }

    /// Newest incarnation registered under `name`
    pub async fn lookup(&self, name: &str) -> Option<ActorId> {
        self.by_name.read().await.get(name).cloned()
    }

    /// Get an actor's entry
    pub async fn entry(&self, id: &ActorId) -> Option<ActorEntry> {
        self.entries.read().await.get(id).cloned()
    }

    /// Get an actor's status
    pub async fn status(&self, id: &ActorId) -> Option<ActorStatus> {
        self.entries.read().await.get(id).map(|entry| entry.status)
    }

    /// List all registered actors
    pub async fn list_actors(&self) -> Vec<(ActorId, ActorEntry)> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone()))
            .collect()
    }

    /// Get total actor count
    pub async fn total_actors(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check if actor exists
    pub async fn contains_actor(&self, id: &ActorId) -> bool {
        self.entries.read().await.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_actor_id_creation() {
        let id1 = ActorId::new();
        let id2 = ActorId::new();

        assert_ne!(id1, id2);
        assert_ne!(id1.uuid(), id2.uuid());
    }

    #[tokio::test]
    async fn test_actor_id_display() {
        let id = ActorId::new();
        let display = format!("{}", id);
        assert!(display.starts_with("actor-"));
    }

    #[tokio::test]
    async fn test_registry_lifecycle() {
        let registry = ActorRegistry::new();
        let actor_id = ActorId::new();

        assert!(registry.register_actor(actor_id.clone(), "orange", 0).await.is_none());
        assert!(registry.contains_actor(&actor_id).await);
        assert_eq!(registry.lookup("orange").await, Some(actor_id.clone()));
        assert_eq!(registry.status(&actor_id).await, Some(ActorStatus::Starting));

        registry.set_status(&actor_id, ActorStatus::Running).await;
        assert_eq!(registry.status(&actor_id).await, Some(ActorStatus::Running));

        registry.unregister_actor(&actor_id).await.unwrap();
        assert!(!registry.contains_actor(&actor_id).await);
        assert!(registry.lookup("orange").await.is_none());
        assert_eq!(registry.total_actors().await, 0);
    }

    #[tokio::test]
    async fn test_reregister_replaces_previous_incarnation() {
        let registry = ActorRegistry::new();
        let first = ActorId::new();
        let second = ActorId::new();

        registry.register_actor(first.clone(), "blue", 0).await;
        let previous = registry.register_actor(second.clone(), "blue", 1).await;

        assert_eq!(previous, Some(first.clone()));
        assert!(!registry.contains_actor(&first).await);
        assert_eq!(registry.lookup("blue").await, Some(second.clone()));
        assert_eq!(registry.entry(&second).await.unwrap().generation, 1);
        assert_eq!(registry.total_actors().await, 1);
    }

    #[tokio::test]
    async fn test_unregister_unknown_actor() {
        let registry = ActorRegistry::new();
        let result = registry.unregister_actor(&ActorId::new()).await;
        assert!(matches!(result, Err(ActorError::NotFound { .. })));
    }

    #[test]
    fn test_status_liveness() {
        assert!(ActorStatus::Starting.is_live());
        assert!(ActorStatus::Running.is_live());
        assert!(!ActorStatus::Failed.is_live());
        assert!(!ActorStatus::Stopped.is_live());
    }
}
