//! Actor System Core
//!
//! Actor runtime with lifecycle management, request/response messaging and
//! exit classification for supervision. Every actor is a tokio task that owns
//! its state and drains a bounded FIFO mailbox; nothing outside the task can
//! touch that state.
//!
//! ## Exit classification
//! - Mailbox closed or `Stop` directive: `ActorExit::Stopped`
//! - `Restart` directive or failed `on_start`: `ActorExit::Failed`
//! - `Escalate` directive: `ActorExit::Escalated`
//! - Panic inside the task: `ActorExit::Panicked`
//! - Aborted by `stop_actor`/`shutdown`: `ActorExit::Aborted`
//!
//! Supervisors restart `Failed` and `Panicked` actors only.
//!
//! # Lock Ordering
//!
//! `task_registry` is never held while awaiting the `registry` locks.

use super::error::{ActorError, Result};
use super::messages::{reply_channel, Message, ReplyTo};
use super::registry::{ActorId, ActorRegistry, ActorStatus};

use async_trait::async_trait;
use parking_lot::Mutex;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Configuration for the actor system
#[derive(Debug, Clone)]
pub struct ActorSystemConfig {
    /// Bounded mailbox size per actor
    pub mailbox_capacity: usize,
    /// Deadline for a single tell/ask exchange
    pub request_timeout: Duration,
}

impl Default for ActorSystemConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1000,
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Core actor system managing actor lifecycles
#[derive(Clone)]
pub struct ActorSystem {
    /// Name and status bookkeeping for every incarnation
    registry: Arc<ActorRegistry>,

    /// System-wide metrics
    metrics: Arc<SystemMetrics>,

    /// Abort handles of running tasks, for stop and shutdown
    task_registry: Arc<RwLock<HashMap<ActorId, AbortHandle>>>,

    shut_down: Arc<AtomicBool>,

    config: ActorSystemConfig,

    /// System ID for debugging
    system_id: String,
}

/// System-wide metrics
#[derive(Debug, Default)]
pub struct SystemMetrics {
    pub actors_spawned: AtomicU64,
    pub actors_stopped: AtomicU64,
    pub actors_failed: AtomicU64,
    pub messages_processed: AtomicU64,
    pub handler_errors: AtomicU64,
    pub total_processing_time_ns: AtomicU64,
    pub actor_restarts: AtomicU64,
    pub restart_failures: AtomicU64,
    pub request_timeouts: AtomicU64,
    messages_by_kind: Mutex<HashMap<&'static str, u64>>,
}

impl SystemMetrics {
    pub fn record_message_handled(&self, kind: &'static str, duration: Duration) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
        self.total_processing_time_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
        *self.messages_by_kind.lock().entry(kind).or_insert(0) += 1;
    }

    pub fn record_handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record actor restart event
    pub fn record_actor_restart(&self, success: bool) {
        self.actor_restarts.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.restart_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_timeout(&self) {
        self.request_timeouts.fetch_add(1, Ordering::Relaxed);
    }

    fn record_exit(&self, exit: &ActorExit) {
        if exit.is_failure() {
            self.actors_failed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.actors_stopped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn avg_processing_time_ns(&self) -> f64 {
        let count = self.messages_processed.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total = self.total_processing_time_ns.load(Ordering::Relaxed);
        total as f64 / count as f64
    }

    /// Messages handled successfully for one message kind
    pub fn messages_of_kind(&self, kind: &str) -> u64 {
        self.messages_by_kind.lock().get(kind).copied().unwrap_or(0)
    }

    /// Get metrics snapshot
    pub fn snapshot(&self) -> SystemStats {
        let total_restarts = self.actor_restarts.load(Ordering::Relaxed);
        let restart_failures = self.restart_failures.load(Ordering::Relaxed);
        let restart_success_rate = if total_restarts > 0 {
            ((total_restarts - restart_failures) as f64 / total_restarts as f64) * 100.0
        } else {
            100.0
        };

        SystemStats {
            actors_spawned: self.actors_spawned.load(Ordering::Relaxed),
            actors_stopped: self.actors_stopped.load(Ordering::Relaxed),
            actors_failed: self.actors_failed.load(Ordering::Relaxed),
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            request_timeouts: self.request_timeouts.load(Ordering::Relaxed),
            avg_processing_time_ns: self.avg_processing_time_ns(),
            restart_stats: RestartStats {
                total_restarts,
                restart_failures,
                restart_success_rate,
            },
        }
    }
}

/// Basic system statistics
#[derive(Debug, Clone)]
pub struct SystemStats {
    pub actors_spawned: u64,
    pub actors_stopped: u64,
    pub actors_failed: u64,
    pub messages_processed: u64,
    pub handler_errors: u64,
    pub request_timeouts: u64,
    pub avg_processing_time_ns: f64,
    pub restart_stats: RestartStats,
}

/// Actor restart statistics
#[derive(Debug, Clone)]
pub struct RestartStats {
    pub total_restarts: u64,
    pub restart_failures: u64,
    pub restart_success_rate: f64,
}

/// How an actor task ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActorExit {
    Stopped,
    Failed(String),
    Escalated(String),
    Panicked(String),
    Aborted,
}

impl ActorExit {
    /// Abnormal termination that a supervisor should answer with a restart
    pub fn is_abnormal(&self) -> bool {
        matches!(self, ActorExit::Failed(_) | ActorExit::Panicked(_))
    }

    /// Any exit caused by a fault, restartable or not
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ActorExit::Failed(_) | ActorExit::Panicked(_) | ActorExit::Escalated(_)
        )
    }

    /// Failure reason, if any
    pub fn reason(&self) -> Option<&str> {
        match self {
            ActorExit::Failed(reason) | ActorExit::Escalated(reason) | ActorExit::Panicked(reason) => {
                Some(reason)
            }
            ActorExit::Stopped | ActorExit::Aborted => None,
        }
    }

    fn from_join_error(err: JoinError) -> Self {
        if err.is_cancelled() {
            return ActorExit::Aborted;
        }
        match err.try_into_panic() {
            Ok(payload) => ActorExit::Panicked(panic_message(payload)),
            Err(err) => ActorExit::Failed(err.to_string()),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

impl ActorSystem {
    /// Create new actor system with default configuration
    pub fn new() -> Self {
        Self::with_config(ActorSystemConfig::default())
    }

    /// Create new actor system
    pub fn with_config(config: ActorSystemConfig) -> Self {
        let system_id = format!("system-{}", Uuid::new_v4());
        info!(
            system_id = %system_id,
            mailbox_capacity = config.mailbox_capacity,
            request_timeout_ms = config.request_timeout.as_millis() as u64,
            "Creating new actor system"
        );

        Self {
            registry: Arc::new(ActorRegistry::new()),
            metrics: Arc::new(SystemMetrics::default()),
            task_registry: Arc::new(RwLock::new(HashMap::new())),
            shut_down: Arc::new(AtomicBool::new(false)),
            config,
            system_id,
        }
    }

    pub fn config(&self) -> &ActorSystemConfig {
        &self.config
    }

    pub fn system_id(&self) -> &str {
        &self.system_id
    }

    pub fn registry(&self) -> Arc<ActorRegistry> {
        Arc::clone(&self.registry)
    }

    /// Get system metrics
    pub fn metrics(&self) -> Arc<SystemMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Spawn an unsupervised actor. Its exit is recorded but never answered
    /// with a restart, and its registry entry is dropped once it ends.
    pub async fn spawn<A>(&self, name: &str, actor: A) -> Result<ActorRef<A::Message>>
    where
        A: ActorBehavior,
    {
        if self.is_shut_down() {
            return Err(ActorError::ShutDown);
        }

        let epoch = Arc::new(AtomicU64::new(0));
        let (actor_ref, handle) = self.launch(name, 0, epoch, actor).await;

        let system = self.clone();
        let id = actor_ref.id().clone();
        tokio::spawn(async move {
            system.settle(&id, handle.await).await;
            // Unsupervised actors have no later incarnation to replace the entry
            if let Err(e) = system.registry.unregister_actor(&id).await {
                debug!(actor_id = %id, error = %e, "Actor already unregistered");
            }
        });

        Ok(actor_ref)
    }

    /// Start one incarnation of an actor and hand back its reference and
    /// task handle. The caller owns awaiting the handle and calling `settle`.
    pub(crate) async fn launch<A>(
        &self,
        name: &str,
        generation: u64,
        epoch: Arc<AtomicU64>,
        actor: A,
    ) -> (ActorRef<A::Message>, JoinHandle<ActorExit>)
    where
        A: ActorBehavior,
    {
        let actor_id = ActorId::new();
        let start_time = Instant::now();
        let (sender, receiver) = mpsc::channel(self.config.mailbox_capacity);

        self.registry
            .register_actor(actor_id.clone(), name, generation)
            .await;

        let task = ActorTask {
            id: actor_id.clone(),
            name: name.to_string(),
            behavior: actor,
            receiver,
            registry: Arc::clone(&self.registry),
            metrics: Arc::clone(&self.metrics),
        };

        let handle = tokio::spawn(task.run());
        self.task_registry
            .write()
            .await
            .insert(actor_id.clone(), handle.abort_handle());
        self.metrics.actors_spawned.fetch_add(1, Ordering::Relaxed);

        let actor_ref = ActorRef {
            id: actor_id,
            name: Arc::from(name),
            generation,
            epoch,
            sender,
            request_timeout: self.config.request_timeout,
            metrics: Arc::clone(&self.metrics),
        };

        info!(
            actor_id = %actor_ref.id,
            name = %name,
            generation,
            system_id = %self.system_id,
            actor_type = std::any::type_name::<A>(),
            spawn_duration_us = start_time.elapsed().as_micros() as u64,
            "Actor spawned"
        );

        (actor_ref, handle)
    }

    /// Record how a task ended and release its bookkeeping
    pub(crate) async fn settle(
        &self,
        id: &ActorId,
        outcome: std::result::Result<ActorExit, JoinError>,
    ) -> ActorExit {
        let exit = match outcome {
            Ok(exit) => exit,
            Err(err) => ActorExit::from_join_error(err),
        };

        self.task_registry.write().await.remove(id);
        let status = if exit.is_failure() {
            ActorStatus::Failed
        } else {
            ActorStatus::Stopped
        };
        self.registry.set_status(id, status).await;
        self.metrics.record_exit(&exit);

        match &exit {
            ActorExit::Stopped | ActorExit::Aborted => {
                debug!(actor_id = %id, exit = ?exit, "Actor task ended");
            }
            ActorExit::Failed(reason) | ActorExit::Panicked(reason) => {
                warn!(actor_id = %id, reason = %reason, exit = ?exit, "Actor terminated abnormally");
            }
            ActorExit::Escalated(reason) => {
                error!(actor_id = %id, reason = %reason, "Actor escalated failure");
            }
        }

        exit
    }

    /// Stop an actor by aborting its task
    pub async fn stop_actor(&self, actor_id: &ActorId) -> Result<()> {
        debug!("Stopping actor {}", actor_id);

        let abort = self.task_registry.write().await.remove(actor_id);
        match abort {
            Some(handle) => {
                self.registry.set_status(actor_id, ActorStatus::Stopping).await;
                handle.abort();
                debug!("Aborted task for actor {}", actor_id);
                Ok(())
            }
            None => {
                warn!("Attempted to stop unknown actor {}", actor_id);
                Err(ActorError::not_found(actor_id.to_string()))
            }
        }
    }

    /// Ids of actors whose tasks are still running
    pub async fn list_actors(&self) -> Vec<ActorId> {
        self.task_registry.read().await.keys().cloned().collect()
    }

    /// Number of actors whose tasks are still running
    pub async fn actor_count(&self) -> usize {
        self.task_registry.read().await.len()
    }

    /// Shutdown the entire actor system
    pub async fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            debug!("Actor system {} already shut down", self.system_id);
            return;
        }
        info!("Shutting down actor system {}", self.system_id);

        let actor_ids = self.list_actors().await;
        let stop_futures: Vec<_> = actor_ids.iter().map(|id| self.stop_actor(id)).collect();

        for (i, stop_result) in futures::future::join_all(stop_futures)
            .await
            .into_iter()
            .enumerate()
        {
            if let Err(e) = stop_result {
                warn!("Error stopping actor {}: {}", actor_ids[i], e);
            }
        }

        info!("Actor system {} shutdown complete", self.system_id);
    }
}

impl Default for ActorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ActorSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorSystem")
            .field("system_id", &self.system_id)
            .field("config", &self.config)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Trait for actor behavior
#[async_trait]
pub trait ActorBehavior: Send + Sync + 'static {
    type Message: Message;

    /// Handle incoming message
    async fn handle(&mut self, msg: Self::Message) -> Result<()>;

    /// Called when actor starts
    async fn on_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called before actor stops
    async fn on_stop(&mut self) -> Result<()> {
        Ok(())
    }

    /// Handle failure - return supervision directive
    async fn on_error(&mut self, error: &ActorError) -> SupervisorDirective {
        warn!(error = %error, "Actor error, requesting restart");
        SupervisorDirective::Restart
    }
}

/// Supervision directive for error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorDirective {
    /// Resume processing with current state
    Resume,
    /// Terminate abnormally so the supervisor starts a fresh incarnation
    Restart,
    /// Stop the actor
    Stop,
    /// Terminate and let the supervisor give up on the child
    Escalate,
}

/// Reference to one incarnation of an actor.
///
/// The reference carries the generation it was issued for and shares the
/// supervisor's epoch cell; once the supervisor moves the epoch on, every
/// operation through this reference fails with `ActorError::Stale`.
pub struct ActorRef<M> {
    id: ActorId,
    name: Arc<str>,
    generation: u64,
    epoch: Arc<AtomicU64>,
    sender: mpsc::Sender<M>,
    request_timeout: Duration,
    metrics: Arc<SystemMetrics>,
}

impl<M: Message> ActorRef<M> {
    /// Get actor ID
    pub fn id(&self) -> &ActorId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Same reference with a different request deadline
    pub fn with_timeout(&self, request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            ..self.clone()
        }
    }

    /// True once this incarnation was replaced or its task has ended
    pub fn is_stale(&self) -> bool {
        self.epoch.load(Ordering::Acquire) != self.generation || self.sender.is_closed()
    }

    fn check_live(&self) -> Result<()> {
        let current = self.epoch.load(Ordering::Acquire);
        if current != self.generation {
            debug!(
                actor_id = %self.id,
                name = %self.name,
                generation = self.generation,
                current,
                "Rejected message for stale reference"
            );
            return Err(ActorError::Stale {
                name: self.name.to_string(),
                generation: self.generation,
                current,
            });
        }
        Ok(())
    }

    fn closed(&self) -> ActorError {
        ActorError::MailboxClosed {
            name: self.name.to_string(),
        }
    }

    fn timed_out(&self, kind: &str) -> ActorError {
        self.metrics.record_timeout();
        warn!(
            actor_id = %self.id,
            name = %self.name,
            kind,
            timeout_ms = self.request_timeout.as_millis() as u64,
            "Actor request timed out"
        );
        ActorError::timeout(
            format!("{} to '{}'", kind, self.name),
            self.request_timeout.as_millis() as u64,
        )
    }

    /// Send a message without waiting for it to be handled
    pub async fn tell(&self, msg: M) -> Result<()> {
        self.check_live()?;
        let kind = msg.kind();

        match tokio::time::timeout(self.request_timeout, self.sender.send(msg)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(self.closed()),
            Err(_) => Err(self.timed_out(kind)),
        }
    }

    /// Send a request and wait for its answer.
    ///
    /// Queueing and answering together are bounded by the request timeout.
    pub async fn ask<R, F>(&self, build: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(ReplyTo<R>) -> M,
    {
        self.check_live()?;

        let (reply, rx) = reply_channel();
        let msg = build(reply);
        let kind = msg.kind();

        let exchange = async {
            self.sender.send(msg).await.map_err(|_| self.closed())?;
            rx.await.map_err(|_| ActorError::ReplyDropped {
                name: self.name.to_string(),
            })
        };

        match tokio::time::timeout(self.request_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(self.timed_out(kind)),
        }
    }
}

impl<M> Clone for ActorRef<M> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: Arc::clone(&self.name),
            generation: self.generation,
            epoch: Arc::clone(&self.epoch),
            sender: self.sender.clone(),
            request_timeout: self.request_timeout,
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<M> fmt::Debug for ActorRef<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorRef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Actor task runner
struct ActorTask<A: ActorBehavior> {
    id: ActorId,
    name: String,
    behavior: A,
    receiver: mpsc::Receiver<A::Message>,
    registry: Arc<ActorRegistry>,
    metrics: Arc<SystemMetrics>,
}

impl<A: ActorBehavior> ActorTask<A> {
    async fn run(mut self) -> ActorExit {
        let task_start = Instant::now();

        // Lifecycle: Start
        if let Err(e) = self.behavior.on_start().await {
            error!(
                actor_id = %self.id,
                name = %self.name,
                error = %e,
                "Actor failed to start during initialization"
            );
            return ActorExit::Failed(e.to_string());
        }
        self.registry.set_status(&self.id, ActorStatus::Running).await;

        debug!(
            actor_id = %self.id,
            name = %self.name,
            startup_duration_us = task_start.elapsed().as_micros() as u64,
            "Actor started, entering message loop"
        );

        let mut exit = ActorExit::Stopped;

        // Main message loop
        while let Some(msg) = self.receiver.recv().await {
            let start = Instant::now();
            let kind = msg.kind();

            let e = match self.behavior.handle(msg).await {
                Ok(()) => {
                    self.metrics.record_message_handled(kind, start.elapsed());
                    continue;
                }
                Err(e) => e,
            };

            self.metrics.record_handler_error();
            error!(
                actor_id = %self.id,
                name = %self.name,
                kind,
                error = %e,
                error_category = e.category(),
                "Actor message processing failed"
            );

            match self.behavior.on_error(&e).await {
                SupervisorDirective::Resume => {
                    debug!(actor_id = %self.id, directive = "Resume", "Actor resumed after error");
                }
                SupervisorDirective::Restart => {
                    exit = ActorExit::Failed(e.to_string());
                    break;
                }
                SupervisorDirective::Stop => {
                    warn!(actor_id = %self.id, directive = "Stop", error = %e, "Stopping actor due to error directive");
                    break;
                }
                SupervisorDirective::Escalate => {
                    exit = ActorExit::Escalated(e.to_string());
                    break;
                }
            }
        }

        // Refuse new messages; queued ones are dropped with their reply slots
        self.receiver.close();

        // Lifecycle: Stop
        if let Err(e) = self.behavior.on_stop().await {
            error!(
                actor_id = %self.id,
                error = %e,
                "Actor failed to stop cleanly"
            );
        }

        info!(
            actor_id = %self.id,
            name = %self.name,
            exit = ?exit,
            total_runtime_ms = task_start.elapsed().as_millis() as u64,
            "Actor task execution completed"
        );
        exit
    }
}
