//! Actor Supervision
//!
//! A `Supervisor` owns a set of named children of one actor type. It starts
//! each child from a factory, watches its task, and when the task ends
//! abnormally (handler failure with a `Restart` directive, or a panic) it
//! builds a fresh actor from the same factory in a new task.
//!
//! Every incarnation gets a generation number. The child's shared epoch cell
//! is moved to the new generation before the replacement starts, so
//! references handed out for older generations fail with `ActorError::Stale`
//! instead of reaching the wrong state.
//!
//! Restarts are asynchronous with respect to callers. `wait_for_restart`
//! lets a caller block (bounded) until a newer incarnation is published.

use super::error::{ActorError, Result};
use super::messages::Message;
use super::system::{ActorBehavior, ActorExit, ActorRef, ActorSystem};

use futures::future::{BoxFuture, FutureExt};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, warn};

/// Configuration for a supervisor
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Maximum restarts allowed within `restart_window`
    pub max_restarts: u32,

    /// Time window for counting restarts
    pub restart_window: Duration,

    /// Delay before a replacement is started
    pub restart_delay: Duration,

    /// Upper bound for `wait_for_restart`
    pub restart_timeout: Duration,

    /// Maximum number of children
    pub max_children: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_restarts: 5,
            restart_window: Duration::from_secs(60),
            restart_delay: Duration::from_millis(10),
            restart_timeout: Duration::from_secs(5),
            max_children: 1024,
        }
    }
}

/// Builds a fresh actor for every incarnation of a child
pub type ChildFactory<A> = Arc<dyn Fn() -> A + Send + Sync>;

/// Externally visible state of a child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildStatus {
    Running,
    Restarting,
    Stopped,
    Failed,
}

/// Summary of one supervised child
#[derive(Debug, Clone)]
pub struct ChildInfo {
    pub name: String,
    pub generation: u64,
    pub status: ChildStatus,
    pub restarts: u32,
}

/// Published state of a child, observed through a watch channel
enum ChildState<M> {
    Running(ActorRef<M>),
    Restarting { generation: u64 },
    Stopped { generation: u64 },
    Failed { generation: u64, reason: String },
}

impl<M: Message> ChildState<M> {
    fn status(&self) -> ChildStatus {
        match self {
            ChildState::Running(_) => ChildStatus::Running,
            ChildState::Restarting { .. } => ChildStatus::Restarting,
            ChildState::Stopped { .. } => ChildStatus::Stopped,
            ChildState::Failed { .. } => ChildStatus::Failed,
        }
    }

    fn generation(&self) -> u64 {
        match self {
            ChildState::Running(actor_ref) => actor_ref.generation(),
            ChildState::Restarting { generation }
            | ChildState::Stopped { generation }
            | ChildState::Failed { generation, .. } => *generation,
        }
    }
}

impl<M> Clone for ChildState<M> {
    fn clone(&self) -> Self {
        match self {
            ChildState::Running(actor_ref) => ChildState::Running(actor_ref.clone()),
            ChildState::Restarting { generation } => ChildState::Restarting {
                generation: *generation,
            },
            ChildState::Stopped { generation } => ChildState::Stopped {
                generation: *generation,
            },
            ChildState::Failed { generation, reason } => ChildState::Failed {
                generation: *generation,
                reason: reason.clone(),
            },
        }
    }
}

/// Restart accounting for one child
#[derive(Debug)]
struct RestartWindow {
    /// Number of restarts attempted in current time window
    restart_count: AtomicU32,
    /// Total restarts over the child's lifetime
    total_restarts: AtomicU32,
    max_restarts: u32,
    window: Duration,
    /// Timestamp of first restart in current window
    window_start: Mutex<Option<Instant>>,
}

impl RestartWindow {
    fn new(max_restarts: u32, window: Duration) -> Self {
        Self {
            restart_count: AtomicU32::new(0),
            total_restarts: AtomicU32::new(0),
            max_restarts,
            window,
            window_start: Mutex::new(None),
        }
    }

    /// Check if the child can be restarted or should be given up on
    fn should_restart(&self) -> bool {
        if self.max_restarts == 0 {
            return false;
        }

        let now = Instant::now();
        let mut window_start = self.window_start.lock();

        let allowed = match *window_start {
            Some(start) if now.duration_since(start) <= self.window => {
                let count = self.restart_count.fetch_add(1, Ordering::Relaxed) + 1;
                count <= self.max_restarts
            }
            _ => {
                // Initialize or reset an expired window
                *window_start = Some(now);
                self.restart_count.store(1, Ordering::Relaxed);
                true
            }
        };

        if allowed {
            self.total_restarts.fetch_add(1, Ordering::Relaxed);
        }
        allowed
    }

    fn total(&self) -> u32 {
        self.total_restarts.load(Ordering::Relaxed)
    }
}

struct Child<A: ActorBehavior> {
    factory: ChildFactory<A>,
    epoch: Arc<AtomicU64>,
    state: watch::Sender<ChildState<A::Message>>,
    restarts: RestartWindow,
}

impl<A: ActorBehavior> Child<A> {
    fn current(&self) -> ChildState<A::Message> {
        self.state.borrow().clone()
    }
}

struct SupervisorInner<A: ActorBehavior> {
    name: String,
    system: ActorSystem,
    config: SupervisorConfig,
    children: RwLock<HashMap<String, Child<A>>>,
    shut_down: AtomicBool,
}

/// Supervisor for children of one actor type, addressed by name
pub struct Supervisor<A: ActorBehavior> {
    inner: Arc<SupervisorInner<A>>,
}

impl<A: ActorBehavior> Clone for Supervisor<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: ActorBehavior> fmt::Debug for Supervisor<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("name", &self.inner.name)
            .field("config", &self.inner.config)
            .field("shut_down", &self.inner.shut_down.load(Ordering::Relaxed))
            .finish()
    }
}

impl<A: ActorBehavior> Supervisor<A> {
    /// Create a supervisor spawning its children into `system`
    pub fn new(name: impl Into<String>, system: ActorSystem, config: SupervisorConfig) -> Self {
        let name = name.into();
        info!(
            supervisor = %name,
            max_restarts = config.max_restarts,
            restart_window_secs = config.restart_window.as_secs(),
            max_children = config.max_children,
            "Creating supervisor"
        );

        Self {
            inner: Arc::new(SupervisorInner {
                name,
                system,
                config,
                children: RwLock::new(HashMap::new()),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn system(&self) -> &ActorSystem {
        &self.inner.system
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.inner.config
    }

    /// Start a supervised child and return a reference to its first incarnation
    pub async fn start_child<F>(&self, name: impl Into<String>, factory: F) -> Result<ActorRef<A::Message>>
    where
        F: Fn() -> A + Send + Sync + 'static,
    {
        let name = name.into();
        if self.inner.is_shut_down() {
            return Err(ActorError::ShutDown);
        }

        let mut children = self.inner.children.write().await;
        if children.contains_key(&name) {
            warn!(supervisor = %self.inner.name, child = %name, "Rejected duplicate child");
            return Err(ActorError::DuplicateName { name });
        }
        if children.len() >= self.inner.config.max_children {
            warn!(
                supervisor = %self.inner.name,
                child = %name,
                limit = self.inner.config.max_children,
                "Rejected child, supervisor at capacity"
            );
            return Err(ActorError::CapacityExceeded {
                limit: self.inner.config.max_children,
            });
        }

        let factory: ChildFactory<A> = Arc::new(factory);
        let epoch = Arc::new(AtomicU64::new(0));
        let actor_ref = SupervisorInner::launch(&self.inner, &name, 0, &epoch, &factory).await;

        let (state, _) = watch::channel(ChildState::Running(actor_ref.clone()));
        children.insert(
            name.clone(),
            Child {
                factory,
                epoch,
                state,
                restarts: RestartWindow::new(
                    self.inner.config.max_restarts,
                    self.inner.config.restart_window,
                ),
            },
        );

        debug!(supervisor = %self.inner.name, child = %name, "Child started");
        Ok(actor_ref)
    }

    /// Reference to the current incarnation of a child
    pub async fn child(&self, name: &str) -> Result<ActorRef<A::Message>> {
        let children = self.inner.children.read().await;
        let child = children.get(name).ok_or_else(|| ActorError::not_found(name))?;
        Self::running(name, child.current())
    }

    fn running(name: &str, state: ChildState<A::Message>) -> Result<ActorRef<A::Message>> {
        match state {
            ChildState::Running(actor_ref) => Ok(actor_ref),
            ChildState::Restarting { .. } => Err(ActorError::Restarting {
                name: name.to_string(),
            }),
            ChildState::Stopped { .. } => Err(ActorError::not_found(name)),
            ChildState::Failed { reason, .. } => Err(ActorError::ChildFailed {
                name: name.to_string(),
                reason,
            }),
        }
    }

    /// Wait until an incarnation newer than `after_generation` is running.
    ///
    /// Fails if the child gives up (`ChildFailed`), is removed (`NotFound`),
    /// or nothing is published within `restart_timeout`.
    pub async fn wait_for_restart(&self, name: &str, after_generation: u64) -> Result<ActorRef<A::Message>> {
        let mut rx = {
            let children = self.inner.children.read().await;
            let child = children.get(name).ok_or_else(|| ActorError::not_found(name))?;
            child.state.subscribe()
        };

        let restart_timeout = self.inner.config.restart_timeout;
        let settled = tokio::time::timeout(restart_timeout, async {
            rx.wait_for(|state| match state {
                ChildState::Running(actor_ref) => actor_ref.generation() > after_generation,
                ChildState::Restarting { .. } => false,
                ChildState::Stopped { .. } | ChildState::Failed { .. } => {
                    state.generation() >= after_generation
                }
            })
            .await
            .map(|state| (*state).clone())
        })
        .await;

        match settled {
            Err(_) => Err(ActorError::RestartTimeout {
                name: name.to_string(),
                timeout_ms: restart_timeout.as_millis() as u64,
            }),
            Ok(Err(_)) => Err(ActorError::not_found(name)),
            Ok(Ok(state)) => Self::running(name, state),
        }
    }

    /// Stop a child for good and forget it. Its references become dead.
    pub async fn terminate_child(&self, name: &str) -> Result<()> {
        let child = self
            .inner
            .children
            .write()
            .await
            .remove(name)
            .ok_or_else(|| ActorError::not_found(name))?;

        self.inner.retire(name, child).await;
        info!(supervisor = %self.inner.name, child = %name, "Child terminated");
        Ok(())
    }

    /// Summaries of all children, sorted by name
    pub async fn children(&self) -> Vec<ChildInfo> {
        let children = self.inner.children.read().await;
        let mut out: Vec<ChildInfo> = children
            .iter()
            .map(|(name, child)| {
                let state = child.state.borrow();
                ChildInfo {
                    name: name.clone(),
                    generation: state.generation(),
                    status: state.status(),
                    restarts: child.restarts.total(),
                }
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Stop all children and refuse new ones
    pub async fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(supervisor = %self.inner.name, "Shutting down supervisor");

        let drained: Vec<(String, Child<A>)> = self.inner.children.write().await.drain().collect();
        let count = drained.len();
        let retirements: Vec<_> = drained
            .into_iter()
            .map(|(name, child)| {
                let inner = Arc::clone(&self.inner);
                async move { inner.retire(&name, child).await }
            })
            .collect();
        futures::future::join_all(retirements).await;

        info!(supervisor = %self.inner.name, children = count, "Supervisor shutdown complete");
    }
}

impl<A: ActorBehavior> SupervisorInner<A> {
    fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire) || self.system.is_shut_down()
    }

    /// Start one incarnation and watch its task
    async fn launch(
        this: &Arc<Self>,
        name: &str,
        generation: u64,
        epoch: &Arc<AtomicU64>,
        factory: &ChildFactory<A>,
    ) -> ActorRef<A::Message> {
        let (actor_ref, handle) = this
            .system
            .launch(name, generation, Arc::clone(epoch), factory())
            .await;

        let inner = Arc::clone(this);
        let id = actor_ref.id().clone();
        let child_name = name.to_string();
        let child_epoch = Arc::clone(epoch);
        tokio::spawn(async move {
            let exit = inner.system.settle(&id, handle.await).await;
            Self::on_child_exit(inner, child_name, child_epoch, generation, exit).await;
        });

        actor_ref
    }

    /// Boxed so the launch -> watch -> relaunch cycle has a nameable future type
    fn on_child_exit(
        this: Arc<Self>,
        name: String,
        epoch: Arc<AtomicU64>,
        generation: u64,
        exit: ActorExit,
    ) -> BoxFuture<'static, ()> {
        async move { Self::handle_child_exit(this, name, epoch, generation, exit).await }.boxed()
    }

    /// `epoch` identifies the child entry the exited task belongs to; a child
    /// re-created under the same name has its own cell.
    async fn handle_child_exit(
        this: Arc<Self>,
        name: String,
        epoch: Arc<AtomicU64>,
        generation: u64,
        exit: ActorExit,
    ) {
        let mut children = this.children.write().await;
        let child = match children.get_mut(&name) {
            Some(child) if Arc::ptr_eq(&child.epoch, &epoch) => child,
            _ => {
                debug!(
                    supervisor = %this.name,
                    child = %name,
                    generation,
                    "Exit of removed child ignored"
                );
                return;
            }
        };
        if child.epoch.load(Ordering::Acquire) != generation {
            debug!(
                supervisor = %this.name,
                child = %name,
                generation,
                "Exit of superseded incarnation ignored"
            );
            return;
        }

        if !exit.is_abnormal() || this.is_shut_down() {
            let state = match &exit {
                ActorExit::Escalated(reason) => {
                    error!(
                        supervisor = %this.name,
                        child = %name,
                        generation,
                        reason = %reason,
                        "Child escalated, not restarting"
                    );
                    ChildState::Failed {
                        generation,
                        reason: reason.to_string(),
                    }
                }
                _ => ChildState::Stopped { generation },
            };
            child.state.send_replace(state);
            return;
        }

        let reason = exit.reason().unwrap_or("abnormal exit").to_string();
        let metrics = this.system.metrics();

        if !child.restarts.should_restart() {
            metrics.record_actor_restart(false);
            error!(
                supervisor = %this.name,
                child = %name,
                generation,
                reason = %reason,
                max_restarts = this.config.max_restarts,
                "Child exceeded restart limit, giving up"
            );
            child.state.send_replace(ChildState::Failed { generation, reason });
            return;
        }

        let next = generation + 1;
        // Invalidate every reference to the crashed incarnation first
        child.epoch.store(next, Ordering::Release);
        child.state.send_replace(ChildState::Restarting { generation: next });
        let factory = Arc::clone(&child.factory);
        drop(children);

        warn!(
            supervisor = %this.name,
            child = %name,
            generation = next,
            reason = %reason,
            "Restarting child with fresh state"
        );

        if !this.config.restart_delay.is_zero() {
            tokio::time::sleep(this.config.restart_delay).await;
        }

        let actor_ref = Self::launch(&this, &name, next, &epoch, &factory).await;

        let published = {
            let children = this.children.read().await;
            match children.get(&name) {
                Some(child)
                    if Arc::ptr_eq(&child.epoch, &epoch)
                        && child.epoch.load(Ordering::Acquire) == next =>
                {
                    child.state.send_replace(ChildState::Running(actor_ref.clone()));
                    true
                }
                _ => false,
            }
        };

        if published {
            metrics.record_actor_restart(true);
        } else {
            // Terminated or superseded while the replacement was starting
            debug!(supervisor = %this.name, child = %name, "Discarding orphaned replacement");
            if let Err(e) = this.system.stop_actor(actor_ref.id()).await {
                debug!(child = %name, error = %e, "Orphaned replacement already stopped");
            }
        }
    }

    /// Stop whatever incarnation a removed child is running
    async fn retire(&self, name: &str, child: Child<A>) {
        let state = child.current();
        let generation = state.generation();
        if let ChildState::Running(actor_ref) = state {
            if let Err(e) = self.system.stop_actor(actor_ref.id()).await {
                debug!(child = %name, error = %e, "Child task already gone");
            }
        }
        child.state.send_replace(ChildState::Stopped { generation });
        if let Some(id) = self.system.registry().lookup(name).await {
            if let Err(e) = self.system.registry().unregister_actor(&id).await {
                debug!(child = %name, error = %e, "Child already unregistered");
            }
        }
    }
}
