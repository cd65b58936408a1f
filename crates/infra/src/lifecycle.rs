//! Lifecycle orchestration.
//!
//! Every status change follows one pipeline, whether it is requested directly
//! or triggered by closing a scanning phase:
//!
//! ```text
//! begin
//!   ↓
//! 1. Load order FOR UPDATE, check company scope
//!   ↓
//! 2. Validate edge + role
//!   ↓
//! 3. Completeness gate (closing a scan phase), no cancel once goods are out
//!   ↓
//! 4. Reserve / release when crossing the committed-range boundary
//!   ↓
//! 5. Update status, append history
//!   ↓
//! commit → publish lifecycle event
//! ```
//!
//! Publication happens after commit and never fails the operation.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};

use rentflow_auth::{Actor, Capability, authorize, authorize_company};
use rentflow_core::{HistoryEntryId, OrderId};
use rentflow_events::{EventBus, EventEnvelope};
use rentflow_fulfillment::transition::{self, reservation_effect};
use rentflow_fulfillment::{
    LifecycleEvent, Order, OrderStatus, ReservationEffect, ScanType, StatusHistoryEntry,
};

use crate::error::FulfillmentError;
use crate::reservation::ReservationManager;
use crate::scan_ledger::{load_order, phase_progress};
use crate::store::{FulfillmentStore, RowLock, StoreTx};

/// Message type carried on the lifecycle bus.
pub type LifecycleEnvelope = EventEnvelope<LifecycleEvent>;

pub const ORDER_STREAM: &str = "fulfillment.order";

#[derive(Debug, Clone)]
pub struct LifecycleOrchestrator<S, B> {
    store: S,
    bus: B,
    reservations: ReservationManager,
}

impl<S, B> LifecycleOrchestrator<S, B>
where
    S: FulfillmentStore,
    B: EventBus<LifecycleEnvelope>,
{
    pub fn new(store: S, bus: B, reservations: ReservationManager) -> Self {
        Self {
            store,
            bus,
            reservations,
        }
    }

    /// Move an order to `requested` on behalf of `actor`.
    #[instrument(skip(self, note, actor), fields(actor_id = %actor.id, role = %actor.role), err)]
    pub async fn progress_status(
        &self,
        order_id: OrderId,
        requested: OrderStatus,
        note: Option<String>,
        actor: &Actor,
    ) -> Result<Order, FulfillmentError> {
        authorize(actor, Capability::RequestTransition)?;

        let mut tx = self.store.begin().await?;
        let order = load_order(tx.as_mut(), order_id, RowLock::Update).await?;
        authorize_company(actor, order.company_id)?;

        let (order, event) = self
            .apply_transition(tx.as_mut(), order, requested, note, actor)
            .await?;
        tx.commit().await?;

        self.publish(&order, event);
        Ok(order)
    }

    /// Close the scanning phase the order is in.
    ///
    /// Outbound completion moves IN_PREPARATION to READY_FOR_DELIVERY; inbound
    /// completion moves AWAITING_RETURN to CLOSED and releases the bookings.
    #[instrument(skip(self, actor), fields(actor_id = %actor.id), err)]
    pub async fn complete_scan_phase(
        &self,
        order_id: OrderId,
        actor: &Actor,
    ) -> Result<Order, FulfillmentError> {
        authorize(actor, Capability::CompleteScanPhase)?;

        let mut tx = self.store.begin().await?;
        let order = load_order(tx.as_mut(), order_id, RowLock::Update).await?;
        authorize_company(actor, order.company_id)?;

        let scan_type = ScanType::for_phase(order.status)
            .ok_or(FulfillmentError::NoScanPhase { status: order.status })?;
        let note = format!("{scan_type} scanning complete");

        let (order, event) = self
            .apply_transition(
                tx.as_mut(),
                order,
                scan_type.completion_target(),
                Some(note),
                actor,
            )
            .await?;
        tx.commit().await?;

        self.publish(&order, event);
        Ok(order)
    }

    /// Realized transitions of an order, oldest first.
    pub async fn status_history(
        &self,
        order_id: OrderId,
        actor: &Actor,
    ) -> Result<Vec<StatusHistoryEntry>, FulfillmentError> {
        authorize(actor, Capability::ViewStatusHistory)?;

        let mut tx = self.store.begin().await?;
        let order = load_order(tx.as_mut(), order_id, RowLock::None).await?;
        authorize_company(actor, order.company_id)?;
        let history = tx.status_history(order.id).await?;
        tx.commit().await?;
        Ok(history)
    }

    async fn apply_transition(
        &self,
        tx: &mut dyn StoreTx,
        mut order: Order,
        requested: OrderStatus,
        note: Option<String>,
        actor: &Actor,
    ) -> Result<(Order, LifecycleEvent), FulfillmentError> {
        let from = order.status;
        transition::validate(from, requested, actor.role)?;

        if let Some(scan_type) = ScanType::for_phase(from) {
            if scan_type.completion_target() == requested {
                ensure_phase_complete(tx, &order, scan_type).await?;
            }
        }

        if requested == OrderStatus::Cancelled {
            ensure_nothing_scanned_out(tx, &order).await?;
        }

        let now = Utc::now();
        match reservation_effect(from, requested) {
            ReservationEffect::Reserve => {
                self.reservations.reserve(tx, &order, now).await?;
            }
            ReservationEffect::Release => {
                self.reservations.release(tx, &order).await?;
            }
            ReservationEffect::None => {}
        }

        let recorded_at = next_timestamp(now, order.updated_at);
        tx.update_order_status(order.id, requested, recorded_at).await?;
        tx.append_history(&StatusHistoryEntry {
            id: HistoryEntryId::new(),
            order_id: order.id,
            status: requested,
            actor_id: actor.id,
            note,
            recorded_at,
        })
        .await?;

        order.status = requested;
        order.updated_at = recorded_at;

        info!(
            order_id = %order.id,
            order_ref = %order.order_ref,
            from = %from,
            to = %requested,
            "order status changed"
        );

        let event = LifecycleEvent {
            order_id: order.id,
            order_ref: order.order_ref.clone(),
            company_id: order.company_id,
            from,
            to: requested,
            actor_id: actor.id,
            occurred_at: recorded_at,
        };
        Ok((order, event))
    }

    fn publish(&self, order: &Order, event: LifecycleEvent) {
        let envelope = EventEnvelope::new(
            order.company_id,
            *order.id.as_uuid(),
            ORDER_STREAM,
            event.occurred_at,
            event,
        );
        if let Err(e) = self.bus.publish(envelope) {
            warn!(order_id = %order.id, error = %e, "failed to publish lifecycle event");
        }
    }
}

async fn ensure_phase_complete(
    tx: &mut dyn StoreTx,
    order: &Order,
    scan_type: ScanType,
) -> Result<(), FulfillmentError> {
    let progress = phase_progress(tx, order, scan_type).await?;
    if !progress.can_complete {
        return Err(FulfillmentError::IncompleteScan {
            scan_type,
            scanned: progress.total_scanned,
            required: progress.total_required,
        });
    }
    Ok(())
}

/// Outbound units of a cancelled order could never be scanned back in.
async fn ensure_nothing_scanned_out(tx: &mut dyn StoreTx, order: &Order) -> Result<(), FulfillmentError> {
    let units = tx
        .scan_events(order.id)
        .await?
        .iter()
        .filter(|e| e.scan_type == ScanType::Outbound)
        .fold(0u32, |acc, e| acc.saturating_add(e.quantity));
    if units > 0 {
        return Err(FulfillmentError::GoodsScannedOut { units });
    }
    Ok(())
}

/// History timestamps strictly increase per order even if the clock does not.
fn next_timestamp(now: DateTime<Utc>, last: DateTime<Utc>) -> DateTime<Utc> {
    let floor = last + Duration::microseconds(1);
    if now > floor { now } else { floor }
}
