//! Actor Runtime Error Types
//!
//! Failures surfaced by actor references, the actor system and supervisors.
//! Every variant carries enough context (actor name, generation, limits) to be
//! logged without further lookups.

use thiserror::Error;

/// Main actor runtime error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActorError {
    /// Reference points at an incarnation that has since been replaced
    #[error("Stale reference: actor '{name}' generation {generation} (current generation {current})")]
    Stale {
        name: String,
        generation: u64,
        current: u64,
    },

    /// Mailbox receiver is gone, the actor task has terminated
    #[error("Mailbox closed: actor '{name}' is no longer running")]
    MailboxClosed { name: String },

    /// The actor dropped the reply channel without answering
    #[error("Reply dropped: actor '{name}' terminated before answering")]
    ReplyDropped { name: String },

    /// Request did not complete within its deadline
    #[error("Timeout error: {operation} exceeded {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    /// A supervised child with this name already exists
    #[error("Duplicate child name: '{name}'")]
    DuplicateName { name: String },

    /// Supervisor is at its configured child limit
    #[error("Capacity exceeded: supervisor limit of {limit} children reached")]
    CapacityExceeded { limit: usize },

    /// No child or actor is registered under this name
    #[error("Actor not found: '{name}'")]
    NotFound { name: String },

    /// Child crashed and its replacement is not running yet
    #[error("Actor '{name}' is restarting")]
    Restarting { name: String },

    /// Child exhausted its restart budget or escalated its failure
    #[error("Actor '{name}' failed permanently: {reason}")]
    ChildFailed { name: String, reason: String },

    /// Supervisor or system has been shut down
    #[error("Actor system is shut down")]
    ShutDown,

    /// No new incarnation was published in time
    #[error("Restart of '{name}' not observed within {timeout_ms}ms")]
    RestartTimeout { name: String, timeout_ms: u64 },

    /// Failure raised by an actor's own message handler
    #[error("Handler error in '{actor}': {message}")]
    Handler { actor: String, message: String },
}

/// Result type alias for actor operations
pub type Result<T> = std::result::Result<T, ActorError>;

impl ActorError {
    /// Create a handler error
    pub fn handler(actor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Handler {
            actor: actor.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a not-found error
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// True when the target actor is gone: stale, closed, or terminated mid-request
    pub fn is_dead_reference(&self) -> bool {
        matches!(
            self,
            Self::Stale { .. } | Self::MailboxClosed { .. } | Self::ReplyDropped { .. }
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Stale { .. } | Self::MailboxClosed { .. } | Self::ReplyDropped { .. } => "dead_reference",
            Self::Timeout { .. } | Self::RestartTimeout { .. } => "timeout",
            Self::DuplicateName { .. } | Self::CapacityExceeded { .. } | Self::ShutDown => "allocation",
            Self::NotFound { .. } | Self::Restarting { .. } | Self::ChildFailed { .. } => "lookup",
            Self::Handler { .. } => "handler",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dead_reference_classification() {
        let stale = ActorError::Stale {
            name: "orange".into(),
            generation: 0,
            current: 1,
        };
        assert!(stale.is_dead_reference());
        assert!(ActorError::MailboxClosed { name: "blue".into() }.is_dead_reference());
        assert!(!ActorError::timeout("ask", 10).is_dead_reference());
        assert!(!ActorError::ShutDown.is_dead_reference());
    }

    #[test]
    fn test_error_display() {
        let err = ActorError::timeout("ask orange", 250);
        assert_eq!(err.to_string(), "Timeout error: ask orange exceeded 250ms");
        assert_eq!(err.category(), "timeout");

        let err = ActorError::handler("orange", "boom");
        assert_eq!(err.to_string(), "Handler error in 'orange': boom");
        assert_eq!(err.category(), "handler");
    }
}
