use serde::{Deserialize, Serialize};

use crate::Role;

/// Operation-level capability.
///
/// Which status transitions a role may request is decided by the fulfillment
/// role matrix; capabilities gate the operations themselves.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Ask for an order status change (further restricted per edge).
    RequestTransition,
    /// Record an outbound or inbound scan.
    RecordScan,
    /// Close a scanning phase after server-side completeness checks.
    CompleteScanPhase,
    /// Read scan progress for an order.
    ViewScanProgress,
    /// Read asset availability.
    ViewAvailability,
    /// Read an order's status history.
    ViewStatusHistory,
}

impl Capability {
    pub const ALL: [Capability; 6] = [
        Capability::RequestTransition,
        Capability::RecordScan,
        Capability::CompleteScanPhase,
        Capability::ViewScanProgress,
        Capability::ViewAvailability,
        Capability::ViewStatusHistory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::RequestTransition => "request_transition",
            Capability::RecordScan => "record_scan",
            Capability::CompleteScanPhase => "complete_scan_phase",
            Capability::ViewScanProgress => "view_scan_progress",
            Capability::ViewAvailability => "view_availability",
            Capability::ViewStatusHistory => "view_status_history",
        }
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    /// Capability table. Exhaustive on both enums.
    pub fn grants(self, capability: Capability) -> bool {
        use Capability::*;

        match self {
            Role::Admin => true,
            Role::Fulfillment => match capability {
                RequestTransition | RecordScan | CompleteScanPhase | ViewScanProgress
                | ViewAvailability | ViewStatusHistory => true,
            },
            Role::Client => match capability {
                RequestTransition | ViewAvailability | ViewStatusHistory => true,
                RecordScan | CompleteScanPhase | ViewScanProgress => false,
            },
        }
    }

    pub fn capabilities(self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.grants(*c))
            .collect()
    }
}
