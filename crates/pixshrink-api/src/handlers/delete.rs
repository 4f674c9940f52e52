use std::sync::Arc;

use axum::{extract::State, Json};
use pixshrink_infra::ErrorResponse;
use serde::Serialize;
use utoipa::ToSchema;

use super::FilenamesRequest;
use crate::auth::AuthUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Delete the listed files
///
/// Only the given names are removed; originals are not looked up. Names that
/// are already gone count as deleted.
#[utoipa::path(
    delete,
    path = "/api/images/delete",
    tag = "images",
    request_body = FilenamesRequest,
    responses(
        (status = 200, description = "Files deleted", body = DeleteResponse),
        (status = 400, description = "No filenames provided", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn delete_files(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<FilenamesRequest>,
) -> Result<Json<DeleteResponse>, HttpAppError> {
    let filenames = request.into_filenames()?;

    let report = state.store.delete_all(&filenames).await;
    tracing::info!(
        user_id = %user.user_id,
        deleted = report.deleted.len(),
        missing = report.missing.len(),
        failed = report.failed.len(),
        "Delete requested"
    );

    Ok(Json(DeleteResponse {
        success: true,
        message: "Files deleted successfully".to_string(),
    }))
}
