//! Scan ledger records, scan validation and progress.
//!
//! The ledger is append-only: quantities scanned so far are always re-derived
//! by summing events, never kept in a counter.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rentflow_core::{AssetId, OrderId, ScanEventId, UserId};

use crate::{Condition, OrderStatus, TrackingMethod};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanType {
    /// Leaving the warehouse.
    Outbound,
    /// Coming back from the event.
    Inbound,
}

impl ScanType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanType::Outbound => "OUTBOUND",
            ScanType::Inbound => "INBOUND",
        }
    }

    /// Order status during which this scan type is accepted.
    pub fn phase(self) -> OrderStatus {
        match self {
            ScanType::Outbound => OrderStatus::InPreparation,
            ScanType::Inbound => OrderStatus::AwaitingReturn,
        }
    }

    /// Status an order moves to once the phase is complete.
    pub fn completion_target(self) -> OrderStatus {
        match self {
            ScanType::Outbound => OrderStatus::ReadyForDelivery,
            ScanType::Inbound => OrderStatus::Closed,
        }
    }

    /// Scan phase an order in `status` is running, if any.
    pub fn for_phase(status: OrderStatus) -> Option<ScanType> {
        match status {
            OrderStatus::InPreparation => Some(ScanType::Outbound),
            OrderStatus::AwaitingReturn => Some(ScanType::Inbound),
            _ => None,
        }
    }
}

impl core::fmt::Display for ScanType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for ScanType {
    type Err = ScanRejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OUTBOUND" => Ok(ScanType::Outbound),
            "INBOUND" => Ok(ScanType::Inbound),
            other => Err(ScanRejection::UnknownScanType(other.to_string())),
        }
    }
}

/// A scan as submitted by a scanner, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewScan {
    pub qr_code: String,
    pub scan_type: ScanType,
    #[serde(default)]
    pub quantity: Option<u32>,
    pub condition: Condition,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
}

/// Ledger row. Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub id: ScanEventId,
    pub order_id: OrderId,
    pub asset_id: AssetId,
    pub scan_type: ScanType,
    pub quantity: u32,
    pub condition: Condition,
    pub notes: Option<String>,
    pub photos: Vec<String>,
    pub actor_id: UserId,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScanRejection {
    #[error("{scan_type} scans are not accepted while the order is {status}")]
    WrongPhase {
        scan_type: ScanType,
        status: OrderStatus,
    },

    #[error("asset {asset_id} is not part of this order")]
    AssetNotInOrder { asset_id: AssetId },

    #[error("batch-tracked assets need a scanned quantity")]
    MissingBatchQuantity,

    #[error("scanned quantity must be greater than zero")]
    ZeroQuantity,

    #[error("individually tracked units are scanned one at a time (got quantity {quantity})")]
    IndividualQuantity { quantity: u32 },

    #[error(
        "{scan_type} over-scan for asset {asset_id}: {already} already scanned, {requested} requested, {required} required"
    )]
    OverScan {
        asset_id: AssetId,
        scan_type: ScanType,
        already: u32,
        requested: u32,
        required: u32,
    },

    #[error("unknown scan type '{0}'")]
    UnknownScanType(String),
}

/// Reject scans taken outside their phase.
pub fn ensure_phase(scan_type: ScanType, status: OrderStatus) -> Result<(), ScanRejection> {
    if scan_type.phase() == status {
        Ok(())
    } else {
        Err(ScanRejection::WrongPhase { scan_type, status })
    }
}

/// Quantity a single scan stands for.
pub fn resolve_quantity(
    tracking: TrackingMethod,
    quantity: Option<u32>,
) -> Result<u32, ScanRejection> {
    match (tracking, quantity) {
        (TrackingMethod::Batch, None) => Err(ScanRejection::MissingBatchQuantity),
        (TrackingMethod::Batch, Some(0)) => Err(ScanRejection::ZeroQuantity),
        (TrackingMethod::Batch, Some(q)) => Ok(q),
        (TrackingMethod::Individual, None | Some(1)) => Ok(1),
        (TrackingMethod::Individual, Some(quantity)) => {
            Err(ScanRejection::IndividualQuantity { quantity })
        }
    }
}

/// Sum of scanned units of one asset for one scan type.
pub fn scanned_quantity(events: &[ScanEvent], asset_id: AssetId, scan_type: ScanType) -> u32 {
    events
        .iter()
        .filter(|e| e.asset_id == asset_id && e.scan_type == scan_type)
        .fold(0u32, |acc, e| acc.saturating_add(e.quantity))
}

/// Over-scan guard: `already + requested <= required`.
pub fn ensure_within_required(
    asset_id: AssetId,
    scan_type: ScanType,
    already: u32,
    requested: u32,
    required: u32,
) -> Result<(), ScanRejection> {
    if already.saturating_add(requested) > required {
        return Err(ScanRejection::OverScan {
            asset_id,
            scan_type,
            already,
            requested,
            required,
        });
    }
    Ok(())
}

/// Full pre-append validation of one scan; yields the quantity to record.
///
/// `events` must be the order's complete ledger for the current unit of work.
pub fn validate_scan(
    status: OrderStatus,
    scan_type: ScanType,
    asset_id: AssetId,
    tracking: TrackingMethod,
    quantity: Option<u32>,
    required: &BTreeMap<AssetId, u32>,
    events: &[ScanEvent],
) -> Result<u32, ScanRejection> {
    ensure_phase(scan_type, status)?;
    let required = *required
        .get(&asset_id)
        .ok_or(ScanRejection::AssetNotInOrder { asset_id })?;
    let quantity = resolve_quantity(tracking, quantity)?;
    let already = scanned_quantity(events, asset_id, scan_type);
    ensure_within_required(asset_id, scan_type, already, quantity, required)?;
    Ok(quantity)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemProgress {
    pub asset_id: AssetId,
    pub required: u32,
    pub scanned: u32,
    pub remaining: u32,
    pub complete: bool,
}

/// Progress of one scanning phase, aggregated from the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanProgress {
    pub order_id: OrderId,
    pub scan_type: ScanType,
    pub items: Vec<ItemProgress>,
    pub total_required: u32,
    pub total_scanned: u32,
    /// Floor of `total_scanned * 100 / total_required`; 100 when nothing is required.
    pub percent_complete: u32,
    pub can_complete: bool,
}

impl ScanProgress {
    pub fn compute(
        order_id: OrderId,
        scan_type: ScanType,
        required: &BTreeMap<AssetId, u32>,
        events: &[ScanEvent],
    ) -> Self {
        let items: Vec<ItemProgress> = required
            .iter()
            .map(|(&asset_id, &required)| {
                let scanned = scanned_quantity(events, asset_id, scan_type);
                ItemProgress {
                    asset_id,
                    required,
                    scanned,
                    remaining: required.saturating_sub(scanned),
                    complete: scanned >= required,
                }
            })
            .collect();

        let total_required = items.iter().fold(0u32, |acc, i| acc.saturating_add(i.required));
        let total_scanned = items.iter().fold(0u32, |acc, i| acc.saturating_add(i.scanned));
        let percent_complete = if total_required == 0 {
            100
        } else {
            (u64::from(total_scanned) * 100 / u64::from(total_required)) as u32
        };
        let can_complete = items.iter().all(|i| i.complete);

        Self {
            order_id,
            scan_type,
            items,
            total_required,
            total_scanned,
            percent_complete,
            can_complete,
        }
    }

    pub fn item(&self, asset_id: AssetId) -> Option<&ItemProgress> {
        self.items.iter().find(|i| i.asset_id == asset_id)
    }
}
