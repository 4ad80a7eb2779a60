//! Portal Error Types
//!
//! Domain failures of door operations and transfers. Runtime errors from the
//! actor layer are translated here so callers see door colors and
//! generations instead of actor ids.

use crate::door::Color;
use portal_actors::ActorError;
use thiserror::Error;

/// Main portal error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PortalError {
    /// Direction is not one of the two recognized values
    #[error("Invalid direction '{0}': expected 'toward-left' or 'toward-right'")]
    InvalidDirection(String),

    /// Handle refers to a door worker that terminated or was replaced
    #[error("Dead handle: door '{color}' generation {generation} is no longer running")]
    DeadHandle { color: Color, generation: u64 },

    /// Door did not answer within the request timeout
    #[error("Door '{color}' unavailable: no answer within {timeout_ms}ms")]
    Unavailable { color: Color, timeout_ms: u64 },

    /// Item was popped from `from` but could not be pushed into `to`
    #[error("Item lost moving from '{from}' to '{to}': {source}")]
    LostItem {
        from: Color,
        to: Color,
        source: Box<PortalError>,
    },

    /// Supervisor refused or could not resolve a door
    #[error("Supervisor error: {0}")]
    Supervisor(#[from] ActorError),
}

/// Result type alias for portal operations
pub type Result<T> = std::result::Result<T, PortalError>;

impl PortalError {
    /// Translate a runtime error raised while talking to one door incarnation
    pub fn from_door(color: &Color, generation: u64, err: ActorError) -> Self {
        match err {
            err if err.is_dead_reference() => Self::DeadHandle {
                color: color.clone(),
                generation,
            },
            ActorError::Timeout { timeout_ms, .. } => Self::Unavailable {
                color: color.clone(),
                timeout_ms,
            },
            other => Self::Supervisor(other),
        }
    }

    /// True for failures caused by a terminated or replaced door
    pub fn is_dead_handle(&self) -> bool {
        match self {
            Self::DeadHandle { .. } => true,
            Self::LostItem { source, .. } => source.is_dead_handle(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_door_error_translation() {
        let orange = Color::from("orange");

        let stale = ActorError::Stale {
            name: "orange".into(),
            generation: 0,
            current: 1,
        };
        assert_eq!(
            PortalError::from_door(&orange, 0, stale),
            PortalError::DeadHandle {
                color: orange.clone(),
                generation: 0
            }
        );

        let closed = ActorError::ReplyDropped { name: "orange".into() };
        assert!(PortalError::from_door(&orange, 3, closed).is_dead_handle());

        let timeout = ActorError::timeout("pop to 'orange'", 40);
        assert_eq!(
            PortalError::from_door(&orange, 0, timeout),
            PortalError::Unavailable {
                color: orange.clone(),
                timeout_ms: 40
            }
        );

        let shut = PortalError::from_door(&orange, 0, ActorError::ShutDown);
        assert_eq!(shut, PortalError::Supervisor(ActorError::ShutDown));
    }

    #[test]
    fn test_lost_item_display() {
        let err = PortalError::LostItem {
            from: Color::from("orange"),
            to: Color::from("blue"),
            source: Box::new(PortalError::DeadHandle {
                color: Color::from("blue"),
                generation: 2,
            }),
        };
        assert!(err.is_dead_handle());
        assert_eq!(
            err.to_string(),
            "Item lost moving from 'orange' to 'blue': Dead handle: door 'blue' generation 2 is no longer running"
        );
    }
}
