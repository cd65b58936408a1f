//! Outbound and inbound scanning against the append-only ledger.

use chrono::Utc;
use tracing::{info, instrument};

use rentflow_auth::{Actor, Capability, authorize, authorize_company};
use rentflow_core::{ConditionChangeId, OrderId, ScanEventId};
use rentflow_fulfillment::{
    AssetConditionChange, NewScan, Order, ScanEvent, ScanProgress, ScanType, required_quantities,
    scan::validate_scan,
};

use crate::error::FulfillmentError;
use crate::store::{FulfillmentStore, RowLock, StoreTx};

#[derive(Debug, Clone)]
pub struct ScanLedger<S> {
    store: S,
}

impl<S> ScanLedger<S>
where
    S: FulfillmentStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Validate and append one scan, returning the phase progress after it.
    ///
    /// The order row is share-locked so the status cannot move underneath the
    /// scan; the asset row is locked for update so concurrent scans of the same
    /// asset serialize their over-scan check against the insert.
    #[instrument(skip(self, scan, actor), fields(actor_id = %actor.id, scan_type = %scan.scan_type), err)]
    pub async fn record_scan(
        &self,
        order_id: OrderId,
        scan: NewScan,
        actor: &Actor,
    ) -> Result<ScanProgress, FulfillmentError> {
        authorize(actor, Capability::RecordScan)?;

        let mut tx = self.store.begin().await?;
        let order = load_order(tx.as_mut(), order_id, RowLock::Share).await?;
        authorize_company(actor, order.company_id)?;

        let mut asset = tx
            .asset_by_qr(&scan.qr_code, RowLock::Update)
            .await?
            .ok_or_else(|| FulfillmentError::not_found("qr_code", &scan.qr_code))?;

        let items = tx.order_items(order.id).await?;
        let required = required_quantities(&items);
        let mut events = tx.scan_events(order.id).await?;

        let quantity = validate_scan(
            order.status,
            scan.scan_type,
            asset.id,
            asset.tracking_method,
            scan.quantity,
            &required,
            &events,
        )?;

        let now = Utc::now();
        let event = ScanEvent {
            id: ScanEventId::new(),
            order_id: order.id,
            asset_id: asset.id,
            scan_type: scan.scan_type,
            quantity,
            condition: scan.condition,
            notes: scan.notes.clone(),
            photos: scan.photos.clone(),
            actor_id: actor.id,
            scanned_at: now,
        };
        tx.append_scan(&event).await?;

        if scan.scan_type == ScanType::Inbound && scan.condition != asset.condition {
            let change = AssetConditionChange {
                id: ConditionChangeId::new(),
                asset_id: asset.id,
                previous: asset.condition,
                new: scan.condition,
                order_id: Some(order.id),
                actor_id: actor.id,
                notes: scan.notes,
                photos: scan.photos,
                recorded_at: now,
            };
            asset.apply_condition(scan.condition);
            tx.update_asset_condition(&asset).await?;
            tx.append_condition_change(&change).await?;
            info!(
                asset_id = %asset.id,
                previous = %change.previous,
                new = %change.new,
                "asset condition changed on return"
            );
        }

        events.push(event);
        let progress = ScanProgress::compute(order.id, scan.scan_type, &required, &events);
        tx.commit().await?;

        info!(
            order_id = %order.id,
            asset_id = %asset.id,
            quantity,
            scanned = progress.total_scanned,
            required = progress.total_required,
            "scan recorded"
        );
        Ok(progress)
    }

    /// Current progress of a phase, without writing.
    pub async fn scan_progress(
        &self,
        order_id: OrderId,
        scan_type: ScanType,
        actor: &Actor,
    ) -> Result<ScanProgress, FulfillmentError> {
        authorize(actor, Capability::ViewScanProgress)?;

        let mut tx = self.store.begin().await?;
        let order = load_order(tx.as_mut(), order_id, RowLock::None).await?;
        authorize_company(actor, order.company_id)?;
        let progress = phase_progress(tx.as_mut(), &order, scan_type).await?;
        tx.commit().await?;
        Ok(progress)
    }
}

pub(crate) async fn load_order(
    tx: &mut dyn StoreTx,
    order_id: OrderId,
    lock: RowLock,
) -> Result<Order, FulfillmentError> {
    tx.load_order(order_id, lock)
        .await?
        .ok_or_else(|| FulfillmentError::not_found("order", order_id))
}

/// Progress of `scan_type` for `order`, aggregated from the ledger.
pub(crate) async fn phase_progress(
    tx: &mut dyn StoreTx,
    order: &Order,
    scan_type: ScanType,
) -> Result<ScanProgress, FulfillmentError> {
    let items = tx.order_items(order.id).await?;
    let events = tx.scan_events(order.id).await?;
    Ok(ScanProgress::compute(
        order.id,
        scan_type,
        &required_quantities(&items),
        &events,
    ))
}

