use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::Response,
};
use pixshrink_core::AppError;
use pixshrink_infra::{
    collect_cleanup_targets, create_zip_archive, CleanupStream, CleanupTrigger, ErrorResponse,
};

use super::FilenamesRequest;
use crate::auth::AuthUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Download several optimized images as one ZIP
///
/// Missing files are left out. The archive streams while it is being built,
/// so the response has no length. Once the transfer ends, whether it
/// completed or the client went away, the listed files and their originals
/// are removed.
#[utoipa::path(
    post,
    path = "/api/images/download-zip",
    tag = "images",
    request_body = FilenamesRequest,
    responses(
        (status = 200, description = "ZIP archive", content_type = "application/zip"),
        (status = 400, description = "No filenames provided", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Failed to create ZIP archive", body = ErrorResponse)
    )
)]
pub async fn download_zip(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<FilenamesRequest>,
) -> Result<Response, HttpAppError> {
    let filenames = request.into_filenames()?;
    for filename in &filenames {
        state.store.resolve(filename)?;
    }
    tracing::info!(
        user_id = %user.user_id,
        requested = filenames.len(),
        "ZIP download requested"
    );

    let targets = collect_cleanup_targets(state.store.as_ref(), &filenames).await;
    let archive = create_zip_archive(state.store.clone(), &filenames).await?;

    let body = CleanupStream::new(
        archive.into_body(),
        state.store.clone(),
        targets,
        CleanupTrigger::Always,
        "zip download",
    );

    let archive_name = format!(
        "optimized-images-{}.zip",
        chrono::Utc::now().timestamp_millis()
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename={}", archive_name),
        )
        .body(Body::from_stream(body))
        .map_err(|e| HttpAppError(AppError::Internal(format!("Failed to build response: {}", e))))
}
