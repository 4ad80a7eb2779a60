//! # Portal
//!
//! Two supervised "doors", each an actor owning a stack of items, and a
//! [`Portal`] that moves one item at a time between them.
//!
//! ```text
//!                 DoorSupervisor
//!                 /            \
//!        Door(orange)       Door(blue)      one task + mailbox each
//!              ^                 ^
//!              |  pop       push |
//!              +---- Portal -----+           runs in the caller's task
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use portal::{Direction, DoorSupervisor, Portal};
//! use portal_config::PortalConfig;
//!
//! # async fn example() -> portal::Result<()> {
//! let doors = DoorSupervisor::<i32>::from_config(&PortalConfig::default());
//! let orange = doors.start_child("orange").await?;
//! let blue = doors.start_child("blue").await?;
//!
//! let portal = Portal::setup(orange, blue, [1, 2, 3]).await?;
//! portal.transfer(Direction::TowardRight).await?;
//! println!("{}", portal.render().await?);
//! # Ok(())
//! # }
//! ```
//!
//! A door that crashes is restarted empty under a new generation. Handles
//! to the crashed incarnation fail with [`PortalError::DeadHandle`]; ask the
//! supervisor for a fresh one.

pub mod door;
pub mod error;
pub mod portal;
pub mod render;
pub mod supervisor;

pub use door::{create, Color, Door, DoorHandle, DoorMessage, Item};
pub use error::{PortalError, Result};
pub use portal::{Direction, Portal, PortalSnapshot, TransferOutcome};
pub use render::render;
pub use supervisor::{supervisor_config, system_config, DoorSupervisor};
