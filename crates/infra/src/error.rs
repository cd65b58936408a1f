//! Error model of the fulfillment services.

use thiserror::Error;

use rentflow_auth::AuthzError;
use rentflow_core::{AssetId, DomainError};
use rentflow_fulfillment::{OrderStatus, ScanRejection, ScanType, TransitionDenial};

/// Failure of the backing store.
///
/// Nothing is partially committed when one of these surfaces: the unit of
/// work is rolled back as a whole.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Lost a race against another transaction (serialization failure,
    /// deadlock, unique violation). Safe to retry.
    #[error("concurrent write conflict: {0}")]
    Concurrency(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("database error: {0}")]
    Database(String),

    /// A persisted row could not be decoded into a domain value.
    #[error("corrupt row: {0}")]
    Decode(String),
}

/// Error surfaced by every fulfillment operation.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error(transparent)]
    Transition(#[from] TransitionDenial),

    #[error(transparent)]
    Scan(#[from] ScanRejection),

    #[error(transparent)]
    Unauthorized(#[from] AuthzError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("order is {status}, which has no scanning phase")]
    NoScanPhase { status: OrderStatus },

    #[error("{entity} '{key}' not found")]
    NotFound { entity: &'static str, key: String },

    #[error(
        "insufficient availability for asset {asset_id}: requested {requested}, available {available}"
    )]
    InsufficientAvailability {
        asset_id: AssetId,
        requested: u32,
        available: u32,
    },

    #[error("{scan_type} scanning incomplete: {scanned} of {required} units scanned")]
    IncompleteScan {
        scan_type: ScanType,
        scanned: u32,
        required: u32,
    },

    /// Goods already left the warehouse; they must come back through the
    /// inbound phase before the order can end.
    #[error("order has {units} unit(s) scanned out and cannot be cancelled")]
    GoodsScannedOut { units: u32 },

    #[error("conflicting concurrent update, retry: {0}")]
    Conflict(String),

    #[error(transparent)]
    Store(StoreError),
}

/// Coarse error category, used by transports to pick a status code.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    NotFound,
    Conflict,
    Store,
}

impl FulfillmentError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            FulfillmentError::Transition(TransitionDenial::NotInGraph { .. }) => ErrorKind::Validation,
            FulfillmentError::Transition(TransitionDenial::RoleNotPermitted { .. }) => {
                ErrorKind::Authorization
            }
            FulfillmentError::Scan(_)
            | FulfillmentError::Validation(_)
            | FulfillmentError::NoScanPhase { .. } => ErrorKind::Validation,
            FulfillmentError::Unauthorized(_) => ErrorKind::Authorization,
            FulfillmentError::NotFound { .. } => ErrorKind::NotFound,
            FulfillmentError::InsufficientAvailability { .. }
            | FulfillmentError::IncompleteScan { .. }
            | FulfillmentError::GoodsScannedOut { .. }
            | FulfillmentError::Conflict(_) => ErrorKind::Conflict,
            FulfillmentError::Store(_) => ErrorKind::Store,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            FulfillmentError::Transition(TransitionDenial::NotInGraph { .. }) => "illegal_transition",
            FulfillmentError::Transition(TransitionDenial::RoleNotPermitted { .. }) => {
                "transition_not_permitted"
            }
            FulfillmentError::Scan(ScanRejection::OverScan { .. }) => "over_scan",
            FulfillmentError::Scan(ScanRejection::WrongPhase { .. }) => "wrong_scan_phase",
            FulfillmentError::Scan(ScanRejection::AssetNotInOrder { .. }) => "asset_not_in_order",
            FulfillmentError::Scan(_) => "invalid_scan",
            FulfillmentError::Validation(_) => "validation_error",
            FulfillmentError::NoScanPhase { .. } => "no_scan_phase",
            FulfillmentError::Unauthorized(_) => "forbidden",
            FulfillmentError::NotFound { .. } => "not_found",
            FulfillmentError::InsufficientAvailability { .. } => "insufficient_availability",
            FulfillmentError::IncompleteScan { .. } => "incomplete_scan",
            FulfillmentError::GoodsScannedOut { .. } => "goods_scanned_out",
            FulfillmentError::Conflict(_) => "conflict",
            FulfillmentError::Store(_) => "store_error",
        }
    }
}

impl From<StoreError> for FulfillmentError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Concurrency(msg) => FulfillmentError::Conflict(msg),
            other => FulfillmentError::Store(other),
        }
    }
}

impl From<DomainError> for FulfillmentError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::NotFound => FulfillmentError::NotFound {
                entity: "record",
                key: String::new(),
            },
            other => FulfillmentError::Validation(other.to_string()),
        }
    }
}
