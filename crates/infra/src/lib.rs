//! Infrastructure layer: transactional stores, the fulfillment services that
//! run domain rules inside them, notification delivery and configuration.

pub mod availability;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod notification;
pub mod reservation;
pub mod scan_ledger;
pub mod service;
pub mod store;

pub use availability::AvailabilityCalculator;
pub use config::{AppConfig, ConfigError, DEFAULT_JWT_SECRET};
pub use error::{ErrorKind, FulfillmentError, StoreError};
pub use lifecycle::{LifecycleEnvelope, LifecycleOrchestrator};
pub use notification::{
    BackoffStrategy, LoggingNotificationDispatcher, NotificationDispatcher, NotificationError,
    NotificationWorker, NotificationWorkerHandle, RetryPolicy,
};
pub use reservation::ReservationManager;
pub use scan_ledger::ScanLedger;
pub use service::FulfillmentService;
pub use store::{FulfillmentStore, InMemoryFulfillmentStore, PostgresFulfillmentStore, RowLock, StoreTx};

#[cfg(test)]
mod integration_tests;
