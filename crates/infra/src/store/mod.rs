//! Transactional persistence for fulfillment records.
//!
//! Every lifecycle or scan operation is one unit of work: begin, read under the
//! locks it needs, validate, write, commit. Dropping a [`StoreTx`] without
//! committing rolls everything back.
//!
//! Scan events, status history and condition changes are append-only: the
//! trait offers no way to update or delete them, and the Postgres schema
//! rejects it with triggers.

mod in_memory;
mod postgres;

pub use in_memory::InMemoryFulfillmentStore;
pub use postgres::PostgresFulfillmentStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use rentflow_core::{AssetId, DateRange, OrderId};
use rentflow_fulfillment::{
    Asset, AssetBooking, AssetConditionChange, AssetUsage, Order, OrderItem, OrderStatus, ScanEvent,
    StatusHistoryEntry,
};

use crate::error::StoreError;

/// Row lock taken when reading a record inside a transaction.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RowLock {
    None,
    /// Blocks writers, admits other shared lockers.
    Share,
    /// Exclusive until commit.
    Update,
}

#[async_trait]
pub trait FulfillmentStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError>;
}

#[async_trait]
impl<S> FulfillmentStore for Arc<S>
where
    S: FulfillmentStore + ?Sized,
{
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        (**self).begin().await
    }
}

/// One open unit of work.
#[async_trait]
pub trait StoreTx: Send {
    async fn load_order(&mut self, order_id: OrderId, lock: RowLock) -> Result<Option<Order>, StoreError>;

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>, StoreError>;

    async fn asset(&mut self, asset_id: AssetId, lock: RowLock) -> Result<Option<Asset>, StoreError>;

    async fn asset_by_qr(&mut self, qr_code: &str, lock: RowLock) -> Result<Option<Asset>, StoreError>;

    /// Lock asset rows for update, in ascending id order.
    async fn lock_assets(&mut self, asset_ids: &[AssetId]) -> Result<Vec<Asset>, StoreError>;

    /// Bookings of committed orders plus scan totals for one asset.
    ///
    /// With a window, only bookings whose order event window overlaps it count.
    async fn asset_usage(
        &mut self,
        asset_id: AssetId,
        window: Option<DateRange>,
    ) -> Result<AssetUsage, StoreError>;

    async fn bookings_for_order(&mut self, order_id: OrderId) -> Result<Vec<AssetBooking>, StoreError>;

    async fn insert_bookings(&mut self, bookings: &[AssetBooking]) -> Result<(), StoreError>;

    /// Remove every booking of an order; returns how many were removed.
    async fn delete_bookings(&mut self, order_id: OrderId) -> Result<u64, StoreError>;

    async fn scan_events(&mut self, order_id: OrderId) -> Result<Vec<ScanEvent>, StoreError>;

    async fn append_scan(&mut self, event: &ScanEvent) -> Result<(), StoreError>;

    async fn update_order_status(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn append_history(&mut self, entry: &StatusHistoryEntry) -> Result<(), StoreError>;

    /// Oldest first.
    async fn status_history(&mut self, order_id: OrderId) -> Result<Vec<StatusHistoryEntry>, StoreError>;

    async fn update_asset_condition(&mut self, asset: &Asset) -> Result<(), StoreError>;

    async fn append_condition_change(&mut self, change: &AssetConditionChange) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
