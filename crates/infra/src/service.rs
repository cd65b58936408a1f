//! Public entry point for fulfillment operations.

use tracing::instrument;

use rentflow_auth::{Actor, Capability, authorize};
use rentflow_core::{AssetId, DateRange, OrderId};
use rentflow_events::EventBus;
use rentflow_fulfillment::{
    AssetAvailability, NewScan, Order, OrderStatus, ScanProgress, ScanType, StatusHistoryEntry,
};

use crate::availability::AvailabilityCalculator;
use crate::error::FulfillmentError;
use crate::lifecycle::{LifecycleEnvelope, LifecycleOrchestrator};
use crate::reservation::ReservationManager;
use crate::scan_ledger::ScanLedger;
use crate::store::{FulfillmentStore, RowLock};

/// Fulfillment operations over one store and one lifecycle bus.
#[derive(Debug, Clone)]
pub struct FulfillmentService<S, B> {
    store: S,
    availability: AvailabilityCalculator,
    lifecycle: LifecycleOrchestrator<S, B>,
    scans: ScanLedger<S>,
}

impl<S, B> FulfillmentService<S, B>
where
    S: FulfillmentStore + Clone,
    B: EventBus<LifecycleEnvelope>,
{
    pub fn new(store: S, bus: B) -> Self {
        let availability = AvailabilityCalculator::new();
        Self {
            lifecycle: LifecycleOrchestrator::new(
                store.clone(),
                bus,
                ReservationManager::new(availability),
            ),
            scans: ScanLedger::new(store.clone()),
            availability,
            store,
        }
    }

    pub async fn progress_order_status(
        &self,
        order_id: OrderId,
        new_status: OrderStatus,
        note: Option<String>,
        actor: &Actor,
    ) -> Result<Order, FulfillmentError> {
        self.lifecycle
            .progress_status(order_id, new_status, note, actor)
            .await
    }

    pub async fn record_scan(
        &self,
        order_id: OrderId,
        scan: NewScan,
        actor: &Actor,
    ) -> Result<ScanProgress, FulfillmentError> {
        self.scans.record_scan(order_id, scan, actor).await
    }

    pub async fn scan_progress(
        &self,
        order_id: OrderId,
        scan_type: ScanType,
        actor: &Actor,
    ) -> Result<ScanProgress, FulfillmentError> {
        self.scans.scan_progress(order_id, scan_type, actor).await
    }

    pub async fn complete_scan_phase(
        &self,
        order_id: OrderId,
        actor: &Actor,
    ) -> Result<Order, FulfillmentError> {
        self.lifecycle.complete_scan_phase(order_id, actor).await
    }

    #[instrument(skip(self, actor), fields(actor_id = %actor.id), err)]
    pub async fn get_availability(
        &self,
        asset_id: AssetId,
        window: Option<DateRange>,
        actor: &Actor,
    ) -> Result<AssetAvailability, FulfillmentError> {
        authorize(actor, Capability::ViewAvailability)?;

        let mut tx = self.store.begin().await?;
        let asset = tx
            .asset(asset_id, RowLock::None)
            .await?
            .ok_or_else(|| FulfillmentError::not_found("asset", asset_id))?;
        let availability = self.availability.for_asset(tx.as_mut(), &asset, window).await?;
        tx.commit().await?;
        Ok(availability)
    }

    pub async fn get_order_status_history(
        &self,
        order_id: OrderId,
        actor: &Actor,
    ) -> Result<Vec<StatusHistoryEntry>, FulfillmentError> {
        self.lifecycle.status_history(order_id, actor).await
    }
}
