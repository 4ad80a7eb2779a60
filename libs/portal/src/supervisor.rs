//! Door Supervisor
//!
//! Thin layer over the generic [`Supervisor`]: children are keyed by color,
//! every incarnation starts as an empty door, and runtime errors come back
//! as [`PortalError`].

use crate::door::{Color, Door, DoorHandle, Item};
use crate::error::{PortalError, Result};

use portal_actors::{
    ActorSystem, ActorSystemConfig, ChildInfo, Supervisor, SupervisorConfig, SystemStats,
};
use portal_config::PortalConfig;
use tracing::{info, warn};

/// Creates door workers and restarts them when they crash
pub struct DoorSupervisor<T: Item> {
    inner: Supervisor<Door<T>>,
}

impl<T: Item> Clone for DoorSupervisor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Actor runtime settings taken from the loaded configuration
pub fn system_config(config: &PortalConfig) -> ActorSystemConfig {
    ActorSystemConfig {
        mailbox_capacity: config.actors.mailbox_capacity,
        request_timeout: config.actors.request_timeout(),
    }
}

/// Restart policy taken from the loaded configuration
pub fn supervisor_config(config: &PortalConfig) -> SupervisorConfig {
    let supervision = &config.supervision;
    SupervisorConfig {
        max_restarts: supervision.max_restarts,
        restart_window: supervision.restart_window(),
        restart_delay: supervision.restart_delay(),
        restart_timeout: supervision.restart_timeout(),
        max_children: supervision.max_children,
    }
}

impl<T: Item> DoorSupervisor<T> {
    pub fn new(system: ActorSystem, config: SupervisorConfig) -> Self {
        Self {
            inner: Supervisor::new("doors", system, config),
        }
    }

    /// Build a fresh actor system and supervisor from configuration
    pub fn from_config(config: &PortalConfig) -> Self {
        let system = ActorSystem::with_config(system_config(config));
        Self::new(system, supervisor_config(config))
    }

    /// Spawn an empty door labelled `color` and supervise it
    pub async fn start_child(&self, color: impl Into<Color>) -> Result<DoorHandle<T>> {
        let color = color.into();
        let label = color.clone();
        let actor = self
            .inner
            .start_child(color.as_str(), move || Door::new(label.clone()))
            .await?;

        info!(color = %color, actor_id = %actor.id(), "Door created");
        Ok(DoorHandle::new(color, actor))
    }

    /// Handle to the current incarnation of the door labelled `color`
    pub async fn door(&self, color: impl Into<Color>) -> Result<DoorHandle<T>> {
        let color = color.into();
        let actor = self.inner.child(color.as_str()).await?;
        Ok(DoorHandle::new(color, actor))
    }

    /// Wait for the replacement of the worker behind `handle`
    pub async fn await_restart(&self, handle: &DoorHandle<T>) -> Result<DoorHandle<T>> {
        let color = handle.color().clone();
        let actor = self
            .inner
            .wait_for_restart(color.as_str(), handle.generation())
            .await
            .map_err(|e| {
                warn!(color = %color, generation = handle.generation(), error = %e, "Door did not come back");
                PortalError::from(e)
            })?;
        Ok(DoorHandle::new(color, actor))
    }

    /// Stop a door for good; its handles become dead
    pub async fn terminate(&self, color: impl Into<Color>) -> Result<()> {
        let color = color.into();
        self.inner.terminate_child(color.as_str()).await?;
        Ok(())
    }

    /// Colors of all supervised doors, sorted
    pub async fn colors(&self) -> Vec<Color> {
        self.inner
            .children()
            .await
            .into_iter()
            .map(|child| Color::from(child.name))
            .collect()
    }

    /// Lifecycle summary of every door
    pub async fn doors(&self) -> Vec<ChildInfo> {
        self.inner.children().await
    }

    pub fn stats(&self) -> SystemStats {
        self.inner.system().metrics().snapshot()
    }

    /// Stop every door and the underlying actor system
    pub async fn shutdown(&self) {
        self.inner.shutdown().await;
        self.inner.system().shutdown().await;
    }
}
