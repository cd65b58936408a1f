use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rentflow_core::{AssetId, CompanyId, DateRange, DomainError, DomainResult, Entity, OrderId, OrderItemId};

use crate::OrderStatus;

/// A rental order as seen by fulfillment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-readable reference shown to clients and staff.
    pub order_ref: String,
    pub company_id: CompanyId,
    pub status: OrderStatus,
    /// Billing state. Carried, never interpreted here.
    pub financial_status: String,
    pub event_window: DateRange,
    pub venue: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Order {
    pub fn new(
        order_ref: impl Into<String>,
        company_id: CompanyId,
        status: OrderStatus,
        event_window: DateRange,
        venue: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            order_ref: order_ref.into(),
            company_id,
            status,
            financial_status: "PENDING_QUOTE".to_string(),
            event_window,
            venue: venue.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Snapshot of one requested asset, frozen at submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub asset_id: AssetId,
    pub quantity: u32,
    pub unit_volume_m3: f64,
    pub unit_weight_kg: f64,
}

impl OrderItem {
    pub fn new(order_id: OrderId, asset_id: AssetId, quantity: u32) -> DomainResult<Self> {
        if quantity == 0 {
            return Err(DomainError::validation("order item quantity must be at least 1"));
        }
        Ok(Self {
            id: OrderItemId::new(),
            order_id,
            asset_id,
            quantity,
            unit_volume_m3: 0.0,
            unit_weight_kg: 0.0,
        })
    }

    pub fn with_dimensions(mut self, unit_volume_m3: f64, unit_weight_kg: f64) -> Self {
        self.unit_volume_m3 = unit_volume_m3;
        self.unit_weight_kg = unit_weight_kg;
        self
    }

    pub fn total_volume_m3(&self) -> f64 {
        self.unit_volume_m3 * f64::from(self.quantity)
    }

    pub fn total_weight_kg(&self) -> f64 {
        self.unit_weight_kg * f64::from(self.quantity)
    }
}

/// Required quantity per asset, summing items that reference the same asset.
///
/// Ordered by asset id so callers lock assets in a stable order.
pub fn required_quantities(items: &[OrderItem]) -> BTreeMap<AssetId, u32> {
    let mut required = BTreeMap::new();
    for item in items {
        let total = required.entry(item.asset_id).or_insert(0u32);
        *total = total.saturating_add(item.quantity);
    }
    required
}
