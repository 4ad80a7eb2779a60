//! Actor Runtime
//!
//! Single-writer actors for the portal workspace. Each actor is a tokio task
//! that owns its state and drains a bounded FIFO mailbox; callers interact
//! only through [`ActorRef`] (tell / ask with a deadline). A [`Supervisor`]
//! starts named children, restarts them with fresh state when they crash,
//! and invalidates references to crashed incarnations through a generation
//! tag.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │         Supervisor<A>        │   name -> { factory, epoch, state }
//! │                              │
//! │  start_child ──► launch ─────┼──► ActorTask (tokio task)
//! │        ▲                     │        │ owns A, drains mailbox
//! │        └── on exit: restart ◄┼────────┘ exit: Failed | Panicked
//! └──────────────────────────────┘
//!            │
//!            ▼
//!   ActorRef<M> { generation, epoch, mpsc::Sender<M> }
//!     tell(msg) / ask(|reply| msg)  -- bounded by request_timeout
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use portal_actors::{ActorBehavior, ActorSystem, Message, ReplyTo, Result};
//!
//! enum Msg {
//!     Add(u64),
//!     Total(ReplyTo<u64>),
//! }
//!
//! impl Message for Msg {}
//!
//! struct Counter(u64);
//!
//! #[async_trait]
//! impl ActorBehavior for Counter {
//!     type Message = Msg;
//!
//!     async fn handle(&mut self, msg: Msg) -> Result<()> {
//!         match msg {
//!             Msg::Add(n) => self.0 += n,
//!             Msg::Total(reply) => {
//!                 reply.send(self.0);
//!             }
//!         }
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> Result<()> {
//! let system = ActorSystem::new();
//! let counter = system.spawn("counter", Counter(0)).await?;
//! counter.tell(Msg::Add(2)).await?;
//! assert_eq!(counter.ask(Msg::Total).await?, 2);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod messages;
pub mod registry;
pub mod supervisor;
pub mod system;

pub use error::{ActorError, Result};
pub use messages::{Message, ReplyTo};
pub use registry::{ActorEntry, ActorId, ActorRegistry, ActorStatus};
pub use supervisor::{ChildFactory, ChildInfo, ChildStatus, Supervisor, SupervisorConfig};
pub use system::{
    ActorBehavior, ActorExit, ActorRef, ActorSystem, ActorSystemConfig, RestartStats,
    SupervisorDirective, SystemMetrics, SystemStats,
};
