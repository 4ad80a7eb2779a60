//! Test fixtures

use portal::{DoorSupervisor, Portal, Result};
use portal_config::PortalConfig;

/// Configuration tuned for tests: short deadlines, immediate restarts
pub fn test_config() -> PortalConfig {
    let mut config = PortalConfig::default();
    config.actors.request_timeout_ms = 500;
    config.supervision.restart_delay_ms = 0;
    config.supervision.restart_timeout_ms = 1_000;
    config
}

/// A supervisor with an `orange` (left) and `blue` (right) door
pub struct PortalFixture {
    pub doors: DoorSupervisor<i32>,
    pub portal: Portal<i32>,
}

impl PortalFixture {
    pub async fn new(data: &[i32]) -> Result<Self> {
        Self::with_config(&test_config(), data).await
    }

    pub async fn with_config(config: &PortalConfig, data: &[i32]) -> Result<Self> {
        let doors = DoorSupervisor::from_config(config);
        let orange = doors.start_child("orange").await?;
        let blue = doors.start_child("blue").await?;
        let portal = Portal::setup(orange, blue, data.iter().copied()).await?;
        Ok(Self { doors, portal })
    }

    /// Current contents of (left, right), front first
    pub async fn contents(&self) -> Result<(Vec<i32>, Vec<i32>)> {
        let snapshot = self.portal.snapshot().await?;
        Ok((snapshot.left, snapshot.right))
    }

    pub async fn shutdown(&self) {
        self.doors.shutdown().await;
    }
}
