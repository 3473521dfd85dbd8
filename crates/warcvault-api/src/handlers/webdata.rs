//! WASAPI-style listing and single-file download of committed WARC files.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::error::HttpAppError;
use crate::handlers::attachment;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WebdataQuery {
    pub user: Option<String>,
    pub coll_name: Option<String>,
}

#[tracing::instrument(skip(state), fields(operation = "list_webdata"))]
pub async fn list_webdata(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WebdataQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    // An absent user is looked up like any other and reported as no_such_user.
    let user = query.user.unwrap_or_default();
    let coll = query.coll_name.filter(|c| !c.is_empty());

    let listing = state.catalog.list(&user, coll.as_deref()).await?;
    tracing::debug!(user = %user, files = listing.files.len(), "Listed committed files");
    Ok(Json(listing))
}

#[tracing::instrument(skip(state), fields(operation = "download_file"))]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path((user, coll, filename)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, HttpAppError> {
    let download = state.catalog.download_file(&user, &coll, &filename).await?;
    attachment(download)
}
