use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fulfillment status of an order.
///
/// Changes only through the lifecycle orchestrator. The financial status is a
/// separate, opaque field on [`crate::Order`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Draft,
    Submitted,
    PricingReview,
    PendingApproval,
    Quoted,
    Declined,
    Confirmed,
    AwaitingFabrication,
    InPreparation,
    ReadyForDelivery,
    InTransit,
    Delivered,
    InUse,
    AwaitingReturn,
    ReturnInTransit,
    Closed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 17] = [
        OrderStatus::Draft,
        OrderStatus::Submitted,
        OrderStatus::PricingReview,
        OrderStatus::PendingApproval,
        OrderStatus::Quoted,
        OrderStatus::Declined,
        OrderStatus::Confirmed,
        OrderStatus::AwaitingFabrication,
        OrderStatus::InPreparation,
        OrderStatus::ReadyForDelivery,
        OrderStatus::InTransit,
        OrderStatus::Delivered,
        OrderStatus::InUse,
        OrderStatus::AwaitingReturn,
        OrderStatus::ReturnInTransit,
        OrderStatus::Closed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "DRAFT",
            OrderStatus::Submitted => "SUBMITTED",
            OrderStatus::PricingReview => "PRICING_REVIEW",
            OrderStatus::PendingApproval => "PENDING_APPROVAL",
            OrderStatus::Quoted => "QUOTED",
            OrderStatus::Declined => "DECLINED",
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::AwaitingFabrication => "AWAITING_FABRICATION",
            OrderStatus::InPreparation => "IN_PREPARATION",
            OrderStatus::ReadyForDelivery => "READY_FOR_DELIVERY",
            OrderStatus::InTransit => "IN_TRANSIT",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::InUse => "IN_USE",
            OrderStatus::AwaitingReturn => "AWAITING_RETURN",
            OrderStatus::ReturnInTransit => "RETURN_IN_TRANSIT",
            OrderStatus::Closed => "CLOSED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// No outgoing edges.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Declined | OrderStatus::Closed | OrderStatus::Cancelled
        )
    }

    /// Statuses during which the order holds asset bookings.
    pub fn is_committed(&self) -> bool {
        match self {
            OrderStatus::Confirmed
            | OrderStatus::AwaitingFabrication
            | OrderStatus::InPreparation
            | OrderStatus::ReadyForDelivery
            | OrderStatus::InTransit
            | OrderStatus::Delivered
            | OrderStatus::InUse
            | OrderStatus::ReturnInTransit
            | OrderStatus::AwaitingReturn => true,
            OrderStatus::Draft
            | OrderStatus::Submitted
            | OrderStatus::PricingReview
            | OrderStatus::PendingApproval
            | OrderStatus::Quoted
            | OrderStatus::Declined
            | OrderStatus::Closed
            | OrderStatus::Cancelled => false,
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}
