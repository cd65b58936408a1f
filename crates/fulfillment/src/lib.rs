//! `rentflow-fulfillment`: rental order fulfillment domain.
//!
//! Pure rules only: the status graph and role matrix, the booking and scan
//! records, scan validation and progress, and the availability formula.
//! Nothing here performs IO; the infra crate runs these rules inside store
//! transactions.

pub mod asset;
pub mod availability;
pub mod booking;
pub mod history;
pub mod lifecycle;
pub mod order;
pub mod scan;
pub mod status;
pub mod transition;

pub use asset::{Asset, AssetStatus, Condition, TrackingMethod};
pub use availability::{AssetAvailability, AssetUsage};
pub use booking::AssetBooking;
pub use history::{AssetConditionChange, StatusHistoryEntry};
pub use lifecycle::{LifecycleEvent, NotificationType, notification_for};
pub use order::{Order, OrderItem, required_quantities};
pub use scan::{
    ItemProgress, NewScan, ScanEvent, ScanProgress, ScanRejection, ScanType,
};
pub use status::{OrderStatus, UnknownStatus};
pub use transition::{ReservationEffect, TransitionDenial};
