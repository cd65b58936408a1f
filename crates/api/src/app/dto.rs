use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rentflow_auth::{CompanyScope, Role};
use rentflow_core::{CompanyId, DateRange, UserId};
use rentflow_fulfillment::{Condition, NewScan, OrderStatus, ScanType};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ProgressStatusRequest {
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
}

impl ProgressStatusRequest {
    pub fn status(&self) -> Result<OrderStatus, axum::response::Response> {
        self.status
            .parse()
            .map_err(|e: rentflow_fulfillment::UnknownStatus| errors::bad_request("invalid_status", e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct RecordScanRequest {
    pub qr_code: String,
    pub scan_type: String,
    #[serde(default)]
    pub quantity: Option<u32>,
    pub condition: Condition,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub photos: Vec<String>,
}

impl RecordScanRequest {
    pub fn into_scan(self) -> Result<NewScan, axum::response::Response> {
        Ok(NewScan {
            scan_type: parse_scan_type(&self.scan_type)?,
            qr_code: self.qr_code,
            quantity: self.quantity,
            condition: self.condition,
            notes: self.notes,
            photos: self.photos,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ScanProgressQuery {
    pub scan_type: String,
}

impl ScanProgressQuery {
    pub fn scan_type(&self) -> Result<ScanType, axum::response::Response> {
        parse_scan_type(&self.scan_type)
    }
}

/// `?from=&to=` (RFC 3339). Both or neither.
#[derive(Debug, Default, Deserialize)]
pub struct AvailabilityQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AvailabilityQuery {
    pub fn window(&self) -> Result<Option<DateRange>, axum::response::Response> {
        match (self.from, self.to) {
            (None, None) => Ok(None),
            (Some(from), Some(to)) => DateRange::new(from, to)
                .map(Some)
                .map_err(|e| errors::bad_request("invalid_window", e.to_string())),
            _ => Err(errors::bad_request(
                "invalid_window",
                "from and to must be given together",
            )),
        }
    }
}

fn parse_scan_type(raw: &str) -> Result<ScanType, axum::response::Response> {
    raw.to_ascii_uppercase()
        .parse()
        .map_err(|e: rentflow_fulfillment::ScanRejection| errors::bad_request("invalid_scan_type", e.to_string()))
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub user_id: UserId,
    pub role: Role,
    pub company_id: Option<CompanyId>,
}

impl WhoAmIResponse {
    pub fn new(user_id: UserId, role: Role, scope: CompanyScope) -> Self {
        let company_id = match scope {
            CompanyScope::Platform => None,
            CompanyScope::Company(id) => Some(id),
        };
        Self {
            user_id,
            role,
            company_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn window_needs_both_bounds() {
        let now = Utc::now();
        assert!(AvailabilityQuery::default().window().unwrap().is_none());

        let query = AvailabilityQuery {
            from: Some(now),
            to: Some(now + Duration::days(1)),
        };
        assert!(query.window().unwrap().is_some());

        let half_open = AvailabilityQuery {
            from: Some(now),
            to: None,
        };
        assert!(half_open.window().is_err());

        let inverted = AvailabilityQuery {
            from: Some(now),
            to: Some(now - Duration::days(1)),
        };
        assert!(inverted.window().is_err());
    }

    #[test]
    fn scan_type_is_case_insensitive() {
        let query = ScanProgressQuery {
            scan_type: "outbound".into(),
        };
        assert_eq!(query.scan_type().unwrap(), ScanType::Outbound);
        assert!(ScanProgressQuery { scan_type: "sideways".into() }.scan_type().is_err());
    }
}
