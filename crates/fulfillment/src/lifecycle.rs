//! Lifecycle events and the notifications they trigger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rentflow_core::{CompanyId, OrderId, UserId};
use rentflow_events::Event;

use crate::OrderStatus;

/// Emitted after a status change has committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub order_id: OrderId,
    pub order_ref: String,
    pub company_id: CompanyId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub actor_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

impl LifecycleEvent {
    pub fn notification(&self) -> Option<NotificationType> {
        notification_for(self.from, self.to)
    }
}

impl Event for LifecycleEvent {
    fn event_type(&self) -> &'static str {
        "fulfillment.order.status_changed"
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    OrderSubmitted,
    QuoteSent,
    QuoteRevised,
    OrderConfirmed,
    QuoteDeclined,
    OrderCancelled,
    FabricationStarted,
    PreparationStarted,
    ReadyForDelivery,
    InTransit,
    Delivered,
    PickupReminder,
    OrderClosed,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::OrderSubmitted => "ORDER_SUBMITTED",
            NotificationType::QuoteSent => "QUOTE_SENT",
            NotificationType::QuoteRevised => "QUOTE_REVISED",
            NotificationType::OrderConfirmed => "ORDER_CONFIRMED",
            NotificationType::QuoteDeclined => "QUOTE_DECLINED",
            NotificationType::OrderCancelled => "ORDER_CANCELLED",
            NotificationType::FabricationStarted => "FABRICATION_STARTED",
            NotificationType::PreparationStarted => "PREPARATION_STARTED",
            NotificationType::ReadyForDelivery => "READY_FOR_DELIVERY",
            NotificationType::InTransit => "IN_TRANSIT",
            NotificationType::Delivered => "DELIVERED",
            NotificationType::PickupReminder => "PICKUP_REMINDER",
            NotificationType::OrderClosed => "ORDER_CLOSED",
        }
    }
}

impl core::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification owed for a realized transition, if any.
pub fn notification_for(from: OrderStatus, to: OrderStatus) -> Option<NotificationType> {
    use crate::OrderStatus::*;

    let notification = match (from, to) {
        (Draft, Submitted) => NotificationType::OrderSubmitted,
        (PricingReview | PendingApproval | Submitted, Quoted) => NotificationType::QuoteSent,
        (Quoted, PricingReview) => NotificationType::QuoteRevised,
        (Quoted, Confirmed) => NotificationType::OrderConfirmed,
        (Quoted, Declined) => NotificationType::QuoteDeclined,
        (_, Cancelled) => NotificationType::OrderCancelled,
        (_, AwaitingFabrication) => NotificationType::FabricationStarted,
        (_, InPreparation) => NotificationType::PreparationStarted,
        (_, ReadyForDelivery) => NotificationType::ReadyForDelivery,
        (_, InTransit) => NotificationType::InTransit,
        (_, Delivered) => NotificationType::Delivered,
        (InUse, AwaitingReturn | ReturnInTransit) => NotificationType::PickupReminder,
        (_, Closed) => NotificationType::OrderClosed,
        _ => return None,
    };
    Some(notification)
}
