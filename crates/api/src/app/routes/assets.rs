use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query, rejection::QueryRejection},
    response::IntoResponse,
    routing::get,
};

use rentflow_core::AssetId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new().route("/:id/availability", get(get_availability))
}

pub async fn get_availability(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<ActorContext>,
    Path(id): Path<String>,
    query: Result<Query<dto::AvailabilityQuery>, QueryRejection>,
) -> axum::response::Response {
    let asset_id: AssetId = match errors::parse_id(&id, "asset") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let window = match query {
        Ok(Query(q)) => match q.window() {
            Ok(w) => w,
            Err(resp) => return resp,
        },
        Err(e) => return errors::bad_request("invalid_query", e.body_text()),
    };

    match services
        .fulfillment
        .get_availability(asset_id, window, ctx.actor())
        .await
    {
        Ok(availability) => Json(availability).into_response(),
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}
