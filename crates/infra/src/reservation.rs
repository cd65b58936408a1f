//! Booking side effects of entering and leaving the committed range.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use rentflow_fulfillment::{AssetBooking, Order, required_quantities};

use crate::availability::AvailabilityCalculator;
use crate::error::FulfillmentError;
use crate::store::StoreTx;

#[derive(Debug, Default, Clone, Copy)]
pub struct ReservationManager {
    availability: AvailabilityCalculator,
}

impl ReservationManager {
    pub fn new(availability: AvailabilityCalculator) -> Self {
        Self { availability }
    }

    /// Book every item of `order`, or nothing.
    ///
    /// Asset rows are locked in id order before availability is read, so two
    /// orders racing for the last unit serialize here and the loser sees the
    /// winner's booking.
    pub async fn reserve(
        &self,
        tx: &mut dyn StoreTx,
        order: &Order,
        now: DateTime<Utc>,
    ) -> Result<Vec<AssetBooking>, FulfillmentError> {
        let items = tx.order_items(order.id).await?;
        let required = required_quantities(&items);
        let asset_ids: Vec<_> = required.keys().copied().collect();
        let assets = tx.lock_assets(&asset_ids).await?;

        let mut bookings = Vec::with_capacity(required.len());
        for (&asset_id, &requested) in &required {
            let asset = assets
                .iter()
                .find(|a| a.id == asset_id)
                .ok_or_else(|| FulfillmentError::not_found("asset", asset_id))?;

            let availability = self.availability.for_asset(tx, asset, None).await?;
            debug!(
                order_id = %order.id,
                asset_id = %asset_id,
                requested,
                available = availability.available,
                "checking availability"
            );
            if requested > availability.available {
                return Err(FulfillmentError::InsufficientAvailability {
                    asset_id,
                    requested,
                    available: availability.available,
                });
            }
            bookings.push(AssetBooking::new(order.id, asset_id, requested, now));
        }

        tx.insert_bookings(&bookings).await?;
        info!(order_id = %order.id, bookings = bookings.len(), "assets reserved");
        Ok(bookings)
    }

    /// Drop every booking of `order`.
    ///
    /// The deleted row count must match what the order held in this unit of
    /// work; anything else means a concurrent writer touched the bookings.
    pub async fn release(&self, tx: &mut dyn StoreTx, order: &Order) -> Result<u64, FulfillmentError> {
        let held = tx.bookings_for_order(order.id).await?;
        let units = held.iter().fold(0u64, |acc, b| acc + u64::from(b.quantity));

        let released = tx.delete_bookings(order.id).await?;
        if released != held.len() as u64 {
            return Err(FulfillmentError::Conflict(format!(
                "order {} held {} booking(s) but {} were released",
                order.id,
                held.len(),
                released
            )));
        }
        info!(order_id = %order.id, released, units, "bookings released");
        Ok(released)
    }
}
