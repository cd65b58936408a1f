//! `rentflow-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the shared domain error and small value objects.

pub mod entity;
pub mod error;
pub mod id;
pub mod value_object;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{
    AssetId, BookingId, CompanyId, ConditionChangeId, HistoryEntryId, OrderId, OrderItemId,
    ScanEventId, UserId,
};
pub use value_object::{DateRange, ValueObject};
