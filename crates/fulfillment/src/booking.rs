use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rentflow_core::{AssetId, BookingId, OrderId};

/// Quantity of an asset committed to an order.
///
/// Exists only while the order sits in the committed range; one row per
/// (order, asset).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBooking {
    pub id: BookingId,
    pub order_id: OrderId,
    pub asset_id: AssetId,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
}

impl AssetBooking {
    pub fn new(order_id: OrderId, asset_id: AssetId, quantity: u32, created_at: DateTime<Utc>) -> Self {
        Self {
            id: BookingId::new(),
            order_id,
            asset_id,
            quantity,
            created_at,
        }
    }
}
