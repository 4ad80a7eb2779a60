//! Actor Messages
//!
//! Message contract for actor mailboxes plus the reply half of the
//! request/response (ask) exchange. Messages never leave the process, so
//! there is no serialization layer here: a message is moved into the
//! mailbox and a `ReplyTo` carries the answer back over a oneshot channel.

use std::fmt;
use tokio::sync::oneshot;

/// Message accepted by an actor mailbox
pub trait Message: Send + 'static {
    /// Short label used in logs and per-kind metrics
    fn kind(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Reply slot for a request/response message.
///
/// Dropping it without calling [`ReplyTo::send`] makes the asking side fail
/// with `ActorError::ReplyDropped`.
pub struct ReplyTo<R> {
    tx: oneshot::Sender<R>,
}

impl<R> ReplyTo<R> {
    /// Answer the request. Returns false if the asker already gave up.
    pub fn send(self, value: R) -> bool {
        self.tx.send(value).is_ok()
    }

    /// Answer the request, handing the value back if the asker already gave up
    pub fn deliver(self, value: R) -> Result<(), R> {
        self.tx.send(value)
    }

    /// Whether the asker is still waiting for the answer
    pub fn is_waiting(&self) -> bool {
        !self.tx.is_closed()
    }
}

impl<R> fmt::Debug for ReplyTo<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplyTo")
            .field("waiting", &self.is_waiting())
            .finish()
    }
}

/// Create a connected reply slot and its receiving end
pub(crate) fn reply_channel<R>() -> (ReplyTo<R>, oneshot::Receiver<R>) {
    let (tx, rx) = oneshot::channel();
    (ReplyTo { tx }, rx)
}
