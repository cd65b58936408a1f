//! Append-only audit records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rentflow_core::{AssetId, ConditionChangeId, HistoryEntryId, OrderId, UserId};

use crate::{Condition, OrderStatus};

/// One realized status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub id: HistoryEntryId,
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub actor_id: UserId,
    pub note: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Condition change of an asset reported during an inbound scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConditionChange {
    pub id: ConditionChangeId,
    pub asset_id: AssetId,
    pub previous: Condition,
    pub new: Condition,
    pub order_id: Option<OrderId>,
    pub actor_id: UserId,
    pub notes: Option<String>,
    pub photos: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}
