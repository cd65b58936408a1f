//! Event envelope and pub/sub mechanics.
//!
//! Events are facts recorded after a transaction commits. The bus distributes
//! them to in-process consumers such as the notification worker; it is not a
//! store and makes no durability promises.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
