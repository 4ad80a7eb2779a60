//! Door Worker
//!
//! A door owns an ordered sequence of items inside its own actor task.
//! Pushes prepend, pops take the front, so the sequence behaves as a stack.
//! Nothing outside the task touches the sequence: every operation is a
//! message processed in mailbox order, which makes each one atomic to
//! observers without any lock.

use crate::error::{PortalError, Result};
use crate::supervisor::DoorSupervisor;

use async_trait::async_trait;
use portal_actors::{ActorBehavior, ActorError, ActorId, ActorRef, Message, ReplyTo};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Anything a door can hold
pub trait Item: Clone + fmt::Debug + Send + Sync + 'static {}

impl<T> Item for T where T: Clone + fmt::Debug + Send + Sync + 'static {}

/// Immutable label identifying a door within its supervisor
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Color {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Color {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Requests understood by a door worker
pub enum DoorMessage<T> {
    Push { item: T, reply: ReplyTo<()> },
    Pop { reply: ReplyTo<Option<T>> },
    Get { reply: ReplyTo<Vec<T>> },
    Len { reply: ReplyTo<usize> },
    /// Make the handler fail so the supervisor replaces the worker
    Fault { reason: String },
}

impl<T: Send + 'static> Message for DoorMessage<T> {
    fn kind(&self) -> &'static str {
        match self {
            DoorMessage::Push { .. } => "push",
            DoorMessage::Pop { .. } => "pop",
            DoorMessage::Get { .. } => "get",
            DoorMessage::Len { .. } => "len",
            DoorMessage::Fault { .. } => "fault",
        }
    }
}

impl<T> fmt::Debug for DoorMessage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DoorMessage::Push { .. } => f.write_str("Push"),
            DoorMessage::Pop { .. } => f.write_str("Pop"),
            DoorMessage::Get { .. } => f.write_str("Get"),
            DoorMessage::Len { .. } => f.write_str("Len"),
            DoorMessage::Fault { reason } => f.debug_struct("Fault").field("reason", reason).finish(),
        }
    }
}

/// Door worker state, owned by exactly one actor task
pub struct Door<T> {
    color: Color,
    items: VecDeque<T>,
}

impl<T: Item> Door<T> {
    /// Empty door, as started by the supervisor
    pub fn new(color: Color) -> Self {
        Self {
            color,
            items: VecDeque::new(),
        }
    }
}

#[async_trait]
impl<T: Item> ActorBehavior for Door<T> {
    type Message = DoorMessage<T>;

    async fn handle(&mut self, msg: DoorMessage<T>) -> portal_actors::Result<()> {
        match msg {
            DoorMessage::Push { item, reply } => {
                self.items.push_front(item);
                reply.send(());
            }
            DoorMessage::Pop { reply } => {
                // An asker that timed out must not cost the door its front item
                if !reply.is_waiting() {
                    debug!(color = %self.color, "Pop abandoned by caller, door unchanged");
                    return Ok(());
                }
                let item = self.items.pop_front();
                if item.is_none() {
                    debug!(color = %self.color, "Pop on empty door");
                }
                if let Err(Some(item)) = reply.deliver(item) {
                    debug!(color = %self.color, "Pop abandoned during reply, item restored");
                    self.items.push_front(item);
                }
            }
            DoorMessage::Get { reply } => {
                reply.send(self.items.iter().cloned().collect());
            }
            DoorMessage::Len { reply } => {
                reply.send(self.items.len());
            }
            DoorMessage::Fault { reason } => {
                warn!(color = %self.color, items = self.items.len(), %reason, "Door fault injected");
                return Err(ActorError::handler(self.color.as_str(), reason));
            }
        }
        Ok(())
    }

    async fn on_start(&mut self) -> portal_actors::Result<()> {
        debug!(color = %self.color, "Door worker started");
        Ok(())
    }

    async fn on_stop(&mut self) -> portal_actors::Result<()> {
        if !self.items.is_empty() {
            info!(color = %self.color, dropped = self.items.len(), "Door stopped with items");
        }
        Ok(())
    }
}

/// Handle to one incarnation of a door.
///
/// Once the supervisor replaces the worker every operation through this
/// handle fails with [`PortalError::DeadHandle`]; fetch a new handle from
/// the supervisor to reach the replacement.
pub struct DoorHandle<T> {
    color: Color,
    actor: ActorRef<DoorMessage<T>>,
}

/// Ask the supervisor for a new door labelled `color`
pub async fn create<T: Item>(supervisor: &DoorSupervisor<T>, color: impl Into<Color>) -> Result<DoorHandle<T>> {
    supervisor.start_child(color).await
}

impl<T: Item> DoorHandle<T> {
    pub(crate) fn new(color: Color, actor: ActorRef<DoorMessage<T>>) -> Self {
        Self { color, actor }
    }

    pub fn color(&self) -> &Color {
        &self.color
    }

    /// Incarnation this handle was issued for
    pub fn generation(&self) -> u64 {
        self.actor.generation()
    }

    pub fn id(&self) -> &ActorId {
        self.actor.id()
    }

    /// True once the worker behind this handle is gone
    pub fn is_stale(&self) -> bool {
        self.actor.is_stale()
    }

    /// Same handle with a different request deadline
    pub fn with_timeout(&self, request_timeout: Duration) -> Self {
        Self {
            color: self.color.clone(),
            actor: self.actor.with_timeout(request_timeout),
        }
    }

    fn translate(&self, err: ActorError) -> PortalError {
        PortalError::from_door(&self.color, self.generation(), err)
    }

    /// Insert `item` at the front
    pub async fn push(&self, item: T) -> Result<()> {
        self.actor
            .ask(|reply| DoorMessage::Push { item, reply })
            .await
            .map_err(|e| self.translate(e))
    }

    /// Remove and return the front item, `None` when empty
    pub async fn pop(&self) -> Result<Option<T>> {
        self.actor
            .ask(|reply| DoorMessage::Pop { reply })
            .await
            .map_err(|e| self.translate(e))
    }

    /// Snapshot of the contents, front first
    pub async fn get(&self) -> Result<Vec<T>> {
        self.actor
            .ask(|reply| DoorMessage::Get { reply })
            .await
            .map_err(|e| self.translate(e))
    }

    pub async fn len(&self) -> Result<usize> {
        self.actor
            .ask(|reply| DoorMessage::Len { reply })
            .await
            .map_err(|e| self.translate(e))
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Crash the worker. Requests queued behind the fault are dropped and
    /// the supervisor starts an empty replacement.
    pub async fn fault(&self, reason: impl Into<String>) -> Result<()> {
        self.actor
            .tell(DoorMessage::Fault { reason: reason.into() })
            .await
            .map_err(|e| self.translate(e))
    }
}

impl<T> Clone for DoorHandle<T> {
    fn clone(&self) -> Self {
        Self {
            color: self.color.clone(),
            actor: self.actor.clone(),
        }
    }
}

impl<T> fmt::Debug for DoorHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DoorHandle")
            .field("color", &self.color)
            .field("actor", &self.actor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_actors::{ActorSystem, ActorSystemConfig, SupervisorConfig};

    fn supervisor() -> DoorSupervisor<i32> {
        DoorSupervisor::new(ActorSystem::new(), SupervisorConfig::default())
    }

    #[test]
    fn test_color_conversions() {
        let color = Color::from("orange");
        assert_eq!(color.as_str(), "orange");
        assert_eq!(color.to_string(), "orange");
        assert_eq!(Color::from(String::from("blue")), Color::new("blue"));
    }

    #[tokio::test]
    async fn test_push_prepends_and_pop_takes_front() {
        let doors = supervisor();
        let door = create(&doors, "orange").await.unwrap();

        for item in [1, 2, 3] {
            door.push(item).await.unwrap();
        }
        assert_eq!(door.get().await.unwrap(), vec![3, 2, 1]);
        assert_eq!(door.len().await.unwrap(), 3);

        assert_eq!(door.pop().await.unwrap(), Some(3));
        assert_eq!(door.pop().await.unwrap(), Some(2));
        assert_eq!(door.pop().await.unwrap(), Some(1));
        assert_eq!(door.pop().await.unwrap(), None);
        assert!(door.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_concurrent_pushes_are_all_applied() {
        let doors = supervisor();
        let door = create(&doors, "orange").await.unwrap();

        let pushes: Vec<_> = (0..50)
            .map(|item| {
                let door = door.clone();
                tokio::spawn(async move { door.push(item).await })
            })
            .collect();
        for push in pushes {
            push.await.unwrap().unwrap();
        }

        let mut items = door.get().await.unwrap();
        items.sort();
        assert_eq!(items, (0..50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_fault_kills_handle_and_restarts_empty() {
        let doors = supervisor();
        let old = create(&doors, "orange").await.unwrap();
        old.push(7).await.unwrap();

        old.fault("simulated crash").await.unwrap();
        let fresh = doors.await_restart(&old).await.unwrap();

        assert!(old.is_stale());
        let err = old.push(8).await.unwrap_err();
        assert_eq!(
            err,
            PortalError::DeadHandle {
                color: Color::from("orange"),
                generation: 0
            }
        );

        assert_eq!(fresh.color(), old.color());
        assert_eq!(fresh.generation(), 1);
        assert_eq!(fresh.get().await.unwrap(), Vec::<i32>::new());
    }

    #[tokio::test]
    async fn test_slow_door_is_unavailable() {
        let system = ActorSystem::with_config(ActorSystemConfig {
            mailbox_capacity: 1,
            request_timeout: Duration::from_millis(50),
        });
        let doors: DoorSupervisor<i32> = DoorSupervisor::new(system, SupervisorConfig::default());
        let door = create(&doors, "orange").await.unwrap();

        let impatient = door.with_timeout(Duration::ZERO);
        let err = impatient.pop().await.unwrap_err();
        assert!(matches!(err, PortalError::Unavailable { timeout_ms: 0, .. }));

        // The worker itself is still fine
        assert_eq!(door.pop().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_timed_out_pop_keeps_item() {
        let doors = supervisor();
        let door = create(&doors, "orange").await.unwrap();
        for item in [1, 2, 3] {
            door.push(item).await.unwrap();
        }

        // Queued, then abandoned before the worker gets to it
        let impatient = door.with_timeout(Duration::ZERO);
        let err = impatient.pop().await.unwrap_err();
        assert!(matches!(err, PortalError::Unavailable { .. }));

        assert_eq!(door.get().await.unwrap(), vec![3, 2, 1]);
        assert_eq!(door.pop().await.unwrap(), Some(3));
    }
}
