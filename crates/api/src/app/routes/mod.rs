use axum::{Router, routing::get};

pub mod assets;
pub mod orders;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/orders", orders::router())
        .nest("/assets", assets::router())
}
