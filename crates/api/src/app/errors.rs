use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use rentflow_infra::{ErrorKind, FulfillmentError};

pub fn fulfillment_error_to_response(err: FulfillmentError) -> axum::response::Response {
    let status = match err.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Store => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(error = %err, "fulfillment operation failed");
    }
    json_error(status, err.code(), err.to_string())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn bad_request(code: &'static str, message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, code, message)
}

/// Parse a path id, or answer 400.
pub fn parse_id<T: std::str::FromStr>(raw: &str, what: &str) -> Result<T, axum::response::Response> {
    raw.parse()
        .map_err(|_| bad_request("invalid_id", format!("invalid {what} id")))
}
