//! Every availability read goes through here: catalog reads, reservations and
//! the HTTP surface all share one formula.

use rentflow_core::DateRange;
use rentflow_fulfillment::{Asset, AssetAvailability};

use crate::error::StoreError;
use crate::store::StoreTx;

#[derive(Debug, Default, Clone, Copy)]
pub struct AvailabilityCalculator;

impl AvailabilityCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Availability of `asset` as seen by the open transaction.
    ///
    /// Callers that act on the result (reservations) must already hold the
    /// asset row lock.
    pub async fn for_asset(
        &self,
        tx: &mut dyn StoreTx,
        asset: &Asset,
        window: Option<DateRange>,
    ) -> Result<AssetAvailability, StoreError> {
        let usage = tx.asset_usage(asset.id, window).await?;
        Ok(AssetAvailability::compute(asset, usage))
    }
}
