//! Collection and recording archive downloads.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use warcvault_core::models::{ArchiveRequest, ArchiveTarget};

use crate::error::HttpAppError;
use crate::handlers::attachment;
use crate::state::AppState;

#[tracing::instrument(skip(state), fields(operation = "download_collection"))]
pub async fn download_collection(
    State(state): State<Arc<AppState>>,
    Path((user, coll)): Path<(String, String)>,
) -> Result<impl IntoResponse, HttpAppError> {
    let request = ArchiveRequest {
        owner: user,
        collection: coll,
        target: ArchiveTarget::All,
        mode: state.delivery_mode(),
    };
    let download = state.assembler.assemble(&request).await?;
    attachment(download)
}

/// `recs` is one recording id or a comma-separated list.
#[tracing::instrument(skip(state), fields(operation = "download_recordings"))]
pub async fn download_recordings(
    State(state): State<Arc<AppState>>,
    Path((user, coll, recs)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, HttpAppError> {
    let request = ArchiveRequest {
        owner: user,
        collection: coll,
        target: ArchiveTarget::parse(&recs),
        mode: state.delivery_mode(),
    };
    let download = state.assembler.assemble(&request).await?;
    attachment(download)
}
