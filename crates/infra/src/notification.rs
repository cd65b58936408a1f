//! Notification delivery, decoupled from the lifecycle transaction.
//!
//! The orchestrator publishes a lifecycle event after commit. The worker here
//! subscribes, maps the transition to a [`NotificationType`] and hands it to a
//! [`NotificationDispatcher`], retrying with backoff. A delivery that still
//! fails after the last attempt is logged and dropped; it never affects the
//! committed transition.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use rentflow_core::OrderId;
use rentflow_events::EventBus;
use rentflow_fulfillment::NotificationType;

use crate::lifecycle::LifecycleEnvelope;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// Worth retrying (timeouts, provider hiccups).
    #[error("transient delivery failure: {0}")]
    Transient(String),

    /// The provider refused the message; retrying will not help.
    #[error("delivery rejected: {0}")]
    Rejected(String),
}

impl NotificationError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, NotificationError::Transient(_))
    }
}

/// Outbound notification channel (email, SMS, push...).
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send(
        &self,
        notification: NotificationType,
        order_id: OrderId,
    ) -> Result<(), NotificationError>;
}

/// Dispatcher that only logs. Default when no provider is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotificationDispatcher;

#[async_trait]
impl NotificationDispatcher for LoggingNotificationDispatcher {
    async fn send(
        &self,
        notification: NotificationType,
        order_id: OrderId,
    ) -> Result<(), NotificationError> {
        info!(%order_id, notification = %notification, "notification dispatched");
        Ok(())
    }
}

/// Backoff strategy for retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Same delay every time.
    Fixed,
    /// base * attempt
    Linear,
    /// base * 2^(attempt - 1)
    #[default]
    Exponential,
}

/// Retry policy for one delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Cap on any single delay.
    pub max_delay: Duration,
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            strategy: BackoffStrategy::Exponential,
        }
    }
}

impl RetryPolicy {
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
        }
    }

    pub fn exponential(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            max_delay,
            strategy: BackoffStrategy::Exponential,
        }
    }

    /// Delay after failed attempt number `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let delay = match self.strategy {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Linear => self.base_delay.saturating_mul(attempt),
            BackoffStrategy::Exponential => {
                let factor = 2u32.checked_pow(attempt - 1).unwrap_or(u32::MAX);
                self.base_delay.saturating_mul(factor)
            }
        };
        delay.min(self.max_delay)
    }

    /// Whether another attempt follows failed attempt number `attempt`.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Deliver one notification, retrying per `policy`. Returns the attempts used.
pub async fn deliver<D>(
    dispatcher: &D,
    policy: &RetryPolicy,
    notification: NotificationType,
    order_id: OrderId,
) -> Result<u32, NotificationError>
where
    D: NotificationDispatcher + ?Sized,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match dispatcher.send(notification, order_id).await {
            Ok(()) => {
                debug!(%order_id, notification = %notification, attempt, "notification delivered");
                return Ok(attempt);
            }
            Err(e) if e.is_retryable() && policy.should_retry(attempt) => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    %order_id,
                    notification = %notification,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "notification failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                error!(
                    %order_id,
                    notification = %notification,
                    attempt,
                    error = %e,
                    "notification dead-lettered"
                );
                return Err(e);
            }
        }
    }
}

/// Handle to stop the worker.
#[derive(Debug)]
pub struct NotificationWorkerHandle {
    shutdown: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl NotificationWorkerHandle {
    /// Stop taking new events, wait for in-flight deliveries, then return.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.join.await {
            warn!(error = %e, "notification worker ended abnormally");
        }
    }
}

#[derive(Debug)]
pub struct NotificationWorker;

impl NotificationWorker {
    /// Subscribe to `bus` and deliver notifications in the background.
    ///
    /// Each delivery runs in its own task so one slow retry does not hold up
    /// the rest. Must be called inside a tokio runtime.
    pub fn spawn<B, D>(bus: &B, dispatcher: Arc<D>, policy: RetryPolicy) -> NotificationWorkerHandle
    where
        B: EventBus<LifecycleEnvelope> + ?Sized,
        D: NotificationDispatcher + ?Sized + 'static,
    {
        let mut subscription = bus.subscribe();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let join = tokio::spawn(async move {
            let mut in_flight = JoinSet::new();
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
                    message = subscription.recv() => {
                        let Some(envelope) = message else { break };
                        let event = envelope.into_payload();
                        let Some(notification) = event.notification() else {
                            debug!(order_id = %event.order_id, to = %event.to, "no notification for transition");
                            continue;
                        };
                        let dispatcher = Arc::clone(&dispatcher);
                        let policy = policy.clone();
                        in_flight.spawn(async move {
                            let _ = deliver(dispatcher.as_ref(), &policy, notification, event.order_id).await;
                        });
                    }
                }
            }
            while in_flight.join_next().await.is_some() {}
            debug!("notification worker stopped");
        });

        NotificationWorkerHandle {
            shutdown: shutdown_tx,
            join,
        }
    }
}
