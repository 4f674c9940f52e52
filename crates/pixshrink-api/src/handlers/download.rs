use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};
use pixshrink_core::{AppError, OutputFormat};
use pixshrink_infra::{collect_cleanup_targets, CleanupStream, CleanupTrigger, ErrorResponse};
use pixshrink_storage::StorageError;

use crate::auth::AuthUser;
use crate::error::HttpAppError;
use crate::state::AppState;

/// Download one optimized image
///
/// The file and the upload it came from are removed once the body has been
/// sent in full, so a second download of the same name is a 404.
#[utoipa::path(
    get,
    path = "/api/images/download/{filename}",
    tag = "images",
    params(
        ("filename" = String, Path, description = "Optimized filename returned by /process")
    ),
    responses(
        (status = 200, description = "Image file", content_type = "application/octet-stream"),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
pub async fn download_image(
    user: AuthUser,
    Path(filename): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, HttpAppError> {
    let not_found = || HttpAppError(AppError::NotFound("File not found".to_string()));

    let size = match state.store.size(&filename).await {
        Ok(size) => size,
        Err(StorageError::NotFound(_)) | Err(StorageError::InvalidFilename(_)) => {
            return Err(not_found())
        }
        Err(e) => return Err(e.into()),
    };

    // Originals are paired before anything is deleted.
    let targets = collect_cleanup_targets(state.store.as_ref(), std::slice::from_ref(&filename)).await;

    let stream = match state.store.open_stream(&filename).await {
        Ok(stream) => stream,
        Err(StorageError::NotFound(_)) => return Err(not_found()),
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        user_id = %user.user_id,
        filename = %filename,
        size_bytes = size,
        cleanup_files = targets.len(),
        "Single file download started"
    );

    let body = CleanupStream::new(
        stream,
        state.store.clone(),
        targets,
        CleanupTrigger::OnCompletion,
        "single download",
    )
    .with_expected_len(size);

    Response::builder()
        .status(StatusCode::OK)
        .header(
            header::CONTENT_TYPE,
            OutputFormat::content_type_for_filename(&filename),
        )
        .header(header::CONTENT_LENGTH, size)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from_stream(body))
        .map_err(|e| HttpAppError(AppError::Internal(format!("Failed to build response: {}", e))))
}
