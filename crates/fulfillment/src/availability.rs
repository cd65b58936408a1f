//! The single availability formula.
//!
//! ```text
//! booked      = Σ bookings of committed orders (optionally window-filtered)
//! out         = max(0, Σ OUTBOUND − Σ INBOUND)
//! maintenance = total_quantity if condition is RED, else 0
//! available   = max(0, total − booked − out − maintenance)
//! ```

use serde::{Deserialize, Serialize};

use rentflow_core::AssetId;

use crate::{Asset, AssetStatus};

/// Raw usage figures for one asset, as read from bookings and the scan ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetUsage {
    pub booked: u64,
    pub outbound: u64,
    pub inbound: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetAvailability {
    pub asset_id: AssetId,
    pub total: u32,
    pub available: u32,
    pub booked: u32,
    pub out: u32,
    pub maintenance: u32,
    pub status: AssetStatus,
}

impl AssetAvailability {
    pub fn compute(asset: &Asset, usage: AssetUsage) -> Self {
        let total = u64::from(asset.total_quantity);
        let out = usage.outbound.saturating_sub(usage.inbound);
        let maintenance = if asset.is_under_maintenance() { total } else { 0 };
        let available = total
            .saturating_sub(usage.booked)
            .saturating_sub(out)
            .saturating_sub(maintenance);

        let status = if maintenance > 0 {
            AssetStatus::Maintenance
        } else if out > 0 {
            AssetStatus::Out
        } else if available == 0 && usage.booked > 0 {
            AssetStatus::Booked
        } else {
            AssetStatus::Available
        };

        Self {
            asset_id: asset.id,
            total: asset.total_quantity,
            available: clamp(available),
            booked: clamp(usage.booked),
            out: clamp(out),
            maintenance: clamp(maintenance),
            status,
        }
    }
}

fn clamp(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}
