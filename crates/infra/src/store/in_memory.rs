use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use rentflow_core::{AssetId, DateRange, OrderId};
use rentflow_fulfillment::{
    Asset, AssetBooking, AssetConditionChange, AssetUsage, Order, OrderItem, OrderStatus, ScanEvent,
    ScanType, StatusHistoryEntry,
};

use super::{FulfillmentStore, RowLock, StoreTx};
use crate::error::StoreError;

#[derive(Debug, Clone, Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    items: HashMap<OrderId, Vec<OrderItem>>,
    assets: HashMap<AssetId, Asset>,
    bookings: Vec<AssetBooking>,
    scans: Vec<ScanEvent>,
    history: Vec<StatusHistoryEntry>,
    condition_changes: Vec<AssetConditionChange>,
}

/// In-memory store.
///
/// A transaction holds the single state lock from `begin` until it is
/// committed or dropped, so units of work are fully serialized. Writes go to a
/// staged copy that replaces the shared state on commit.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFulfillmentStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryFulfillmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace an asset (catalog management lives elsewhere).
    pub async fn insert_asset(&self, asset: Asset) {
        let mut state = self.state.lock().await;
        state.assets.insert(asset.id, asset);
    }

    /// Seed an order with its item snapshot.
    pub async fn insert_order(&self, order: Order, items: Vec<OrderItem>) {
        let mut state = self.state.lock().await;
        state.items.insert(order.id, items);
        state.orders.insert(order.id, order);
    }

    /// Every booking currently held, across orders.
    pub async fn all_bookings(&self) -> Vec<AssetBooking> {
        self.state.lock().await.bookings.clone()
    }

    pub async fn condition_changes(&self, asset_id: AssetId) -> Vec<AssetConditionChange> {
        self.state
            .lock()
            .await
            .condition_changes
            .iter()
            .filter(|c| c.asset_id == asset_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl FulfillmentStore for InMemoryFulfillmentStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>, StoreError> {
        let guard = self.state.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTx { guard, staged }))
    }
}

struct InMemoryTx {
    guard: OwnedMutexGuard<State>,
    staged: State,
}

impl State {
    fn scanned(&self, asset_id: AssetId, scan_type: ScanType) -> u64 {
        self.scans
            .iter()
            .filter(|s| s.asset_id == asset_id && s.scan_type == scan_type)
            .map(|s| u64::from(s.quantity))
            .sum()
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn load_order(&mut self, order_id: OrderId, _lock: RowLock) -> Result<Option<Order>, StoreError> {
        Ok(self.staged.orders.get(&order_id).cloned())
    }

    async fn order_items(&mut self, order_id: OrderId) -> Result<Vec<OrderItem>, StoreError> {
        Ok(self.staged.items.get(&order_id).cloned().unwrap_or_default())
    }

    async fn asset(&mut self, asset_id: AssetId, _lock: RowLock) -> Result<Option<Asset>, StoreError> {
        Ok(self.staged.assets.get(&asset_id).cloned())
    }

    async fn asset_by_qr(&mut self, qr_code: &str, _lock: RowLock) -> Result<Option<Asset>, StoreError> {
        Ok(self
            .staged
            .assets
            .values()
            .find(|a| a.qr_code == qr_code)
            .cloned())
    }

    async fn lock_assets(&mut self, asset_ids: &[AssetId]) -> Result<Vec<Asset>, StoreError> {
        let mut ids = asset_ids.to_vec();
        ids.sort();
        ids.dedup();
        Ok(ids
            .iter()
            .filter_map(|id| self.staged.assets.get(id).cloned())
            .collect())
    }

    async fn asset_usage(
        &mut self,
        asset_id: AssetId,
        window: Option<DateRange>,
    ) -> Result<AssetUsage, StoreError> {
        let state = &self.staged;
        let booked = state
            .bookings
            .iter()
            .filter(|b| b.asset_id == asset_id)
            .filter(|b| {
                state.orders.get(&b.order_id).is_some_and(|o| {
                    o.status.is_committed()
                        && window.is_none_or(|w| o.event_window.overlaps(&w))
                })
            })
            .map(|b| u64::from(b.quantity))
            .sum();

        Ok(AssetUsage {
            booked,
            outbound: state.scanned(asset_id, ScanType::Outbound),
            inbound: state.scanned(asset_id, ScanType::Inbound),
        })
    }

    async fn bookings_for_order(&mut self, order_id: OrderId) -> Result<Vec<AssetBooking>, StoreError> {
        Ok(self
            .staged
            .bookings
            .iter()
            .filter(|b| b.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn insert_bookings(&mut self, bookings: &[AssetBooking]) -> Result<(), StoreError> {
        for booking in bookings {
            let duplicate = self
                .staged
                .bookings
                .iter()
                .any(|b| b.order_id == booking.order_id && b.asset_id == booking.asset_id);
            if duplicate {
                return Err(StoreError::Constraint(format!(
                    "booking for order {} and asset {} already exists",
                    booking.order_id, booking.asset_id
                )));
            }
            self.staged.bookings.push(booking.clone());
        }
        Ok(())
    }

    async fn delete_bookings(&mut self, order_id: OrderId) -> Result<u64, StoreError> {
        let before = self.staged.bookings.len();
        self.staged.bookings.retain(|b| b.order_id != order_id);
        Ok((before - self.staged.bookings.len()) as u64)
    }

    async fn scan_events(&mut self, order_id: OrderId) -> Result<Vec<ScanEvent>, StoreError> {
        Ok(self
            .staged
            .scans
            .iter()
            .filter(|s| s.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn append_scan(&mut self, event: &ScanEvent) -> Result<(), StoreError> {
        self.staged.scans.push(event.clone());
        Ok(())
    }

    async fn update_order_status(
        &mut self,
        order_id: OrderId,
        status: OrderStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let order = self
            .staged
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::Constraint(format!("order {order_id} does not exist")))?;
        order.status = status;
        order.updated_at = updated_at;
        Ok(())
    }

    async fn append_history(&mut self, entry: &StatusHistoryEntry) -> Result<(), StoreError> {
        self.staged.history.push(entry.clone());
        Ok(())
    }

    async fn status_history(&mut self, order_id: OrderId) -> Result<Vec<StatusHistoryEntry>, StoreError> {
        let mut entries: Vec<_> = self
            .staged
            .history
            .iter()
            .filter(|h| h.order_id == order_id)
            .cloned()
            .collect();
        // Stable: ties keep insertion order.
        entries.sort_by_key(|h| h.recorded_at);
        Ok(entries)
    }

    async fn update_asset_condition(&mut self, asset: &Asset) -> Result<(), StoreError> {
        let stored = self
            .staged
            .assets
            .get_mut(&asset.id)
            .ok_or_else(|| StoreError::Constraint(format!("asset {} does not exist", asset.id)))?;
        stored.condition = asset.condition;
        stored.refurb_days_estimate = asset.refurb_days_estimate;
        Ok(())
    }

    async fn append_condition_change(&mut self, change: &AssetConditionChange) -> Result<(), StoreError> {
        self.staged.condition_changes.push(change.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
