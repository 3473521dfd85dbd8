//! Route configuration and setup

use std::sync::Arc;

use axum::{http::Method, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::constants::API_PREFIX;
use crate::handlers;
use crate::state::AppState;

pub fn setup_routes(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);

    let api = Router::new()
        .route(
            "/collections/{user}/{coll}/download",
            get(handlers::download::download_collection),
        )
        .route(
            "/collections/{user}/{coll}/recordings/{recs}/download",
            get(handlers::download::download_recordings),
        )
        .route("/download/webdata", get(handlers::webdata::list_webdata))
        .route(
            "/download/{user}/{coll}/{filename}",
            get(handlers::webdata::download_file),
        );

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest(API_PREFIX, api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
