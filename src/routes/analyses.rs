use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    routing::{get, post},
    Json, Router,
};

use crate::{
    error::AppError,
    models::{AnalysisReport, StoredAnalysis},
    services::file_processor::{self, Upload},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/upload-file/", post(upload_file))
        .route("/analyses/", get(list_analyses))
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<AnalysisReport>, AppError> {
    let upload = read_upload(multipart).await?;
    tracing::info!(
        "Received upload {:?}, size: {}KB",
        upload.filename,
        upload.data.len() / 1024
    );

    let store = Arc::clone(&state.store);
    let report = tokio::task::spawn_blocking(move || {
        file_processor::process_upload(store.as_ref(), upload)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(Json(report))
}

async fn list_analyses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<StoredAnalysis>>, AppError> {
    let store = Arc::clone(&state.store);
    let analyses = tokio::task::spawn_blocking(move || store.list_all())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    tracing::debug!("Listing {} stored analyses", analyses.len());
    Ok(Json(analyses))
}

/// Pulls the `file` field out of the form; other fields are ignored.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart request: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(String::from);
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::InvalidInput(format!("Failed to read upload: {}", e)))?;
        return Ok(Upload { filename, data });
    }

    Err(AppError::InvalidInput("No file provided".to_string()))
}
