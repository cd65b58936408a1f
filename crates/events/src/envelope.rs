use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rentflow_core::CompanyId;

/// Envelope for an event, carrying company and stream metadata.
///
/// - `company_id` scopes the event to the owning client company.
/// - `stream_id`/`stream_type` name the record the event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    company_id: CompanyId,

    stream_id: Uuid,
    stream_type: String,

    recorded_at: DateTime<Utc>,

    payload: E,
}

impl<E> EventEnvelope<E> {
    pub fn new(
        company_id: CompanyId,
        stream_id: Uuid,
        stream_type: impl Into<String>,
        recorded_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            company_id,
            stream_id,
            stream_type: stream_type.into(),
            recorded_at,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn company_id(&self) -> CompanyId {
        self.company_id
    }

    pub fn stream_id(&self) -> Uuid {
        self.stream_id
    }

    pub fn stream_type(&self) -> &str {
        &self.stream_type
    }

    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}
