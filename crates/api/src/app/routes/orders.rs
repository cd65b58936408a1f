use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::{JsonRejection, QueryRejection}},
    response::IntoResponse,
    routing::{get, post},
};

use rentflow_core::OrderId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/:id/status", post(progress_status))
        .route("/:id/scans", post(record_scan))
        .route("/:id/scans/progress", get(scan_progress))
        .route("/:id/scans/complete", post(complete_scan_phase))
        .route("/:id/history", get(status_history))
}

pub async fn progress_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::ProgressStatusRequest>, JsonRejection>,
) -> axum::response::Response {
    let order_id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::bad_request("invalid_body", e.body_text()),
    };
    let status = match body.status() {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services
        .fulfillment
        .progress_order_status(order_id, status, body.note, ctx.actor())
        .await
    {
        Ok(order) => Json(order).into_response(),
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}

pub async fn record_scan(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::RecordScanRequest>, JsonRejection>,
) -> axum::response::Response {
    let order_id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let scan = match body {
        Ok(Json(b)) => match b.into_scan() {
            Ok(scan) => scan,
            Err(resp) => return resp,
        },
        Err(e) => return errors::bad_request("invalid_body", e.body_text()),
    };

    match services.fulfillment.record_scan(order_id, scan, ctx.actor()).await {
        Ok(progress) => Json(progress).into_response(),
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}

pub async fn scan_progress(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    query: Result<Query<dto::ScanProgressQuery>, QueryRejection>,
) -> axum::response::Response {
    let order_id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let scan_type = match query {
        Ok(Query(q)) => match q.scan_type() {
            Ok(t) => t,
            Err(resp) => return resp,
        },
        Err(e) => return errors::bad_request("invalid_query", e.body_text()),
    };

    match services
        .fulfillment
        .scan_progress(order_id, scan_type, ctx.actor())
        .await
    {
        Ok(progress) => Json(progress).into_response(),
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}

pub async fn complete_scan_phase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .fulfillment
        .complete_scan_phase(order_id, ctx.actor())
        .await
    {
        Ok(order) => Json(order).into_response(),
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}

pub async fn status_history(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id: OrderId = match errors::parse_id(&id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .fulfillment
        .get_order_status_history(order_id, ctx.actor())
        .await
    {
        Ok(history) => Json(history).into_response(),
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}
