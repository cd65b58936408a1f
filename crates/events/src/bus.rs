//! Event publishing/subscription abstraction (mechanics only).
//!
//! - **Broadcast**: every subscription receives a copy of every published message
//! - **Publish after commit**: callers publish only facts that are already durable
//! - **No persistence**: a subscriber that is not listening misses messages
//!
//! Consumers must tolerate duplicates.

use std::sync::Arc;

use tokio::sync::mpsc::{UnboundedReceiver, error::TryRecvError};

/// A subscription to an event stream.
///
/// Meant for a single consuming task. Messages from one publisher arrive in
/// publish order.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: UnboundedReceiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: UnboundedReceiver<M>) -> Self {
        Self { receiver }
    }

    /// Wait for the next message. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Try to receive a message without waiting.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Domain-agnostic event bus (pub/sub abstraction).
///
/// `publish` is synchronous so it can be called from any context right after a
/// commit. Failures are surfaced to the caller, who decides whether they matter;
/// the recorded state is already durable at that point.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + core::fmt::Display + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
