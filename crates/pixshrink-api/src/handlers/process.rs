use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use pixshrink_core::constants::UPLOAD_FIELD_NAME;
use pixshrink_core::naming::stored_filename;
use pixshrink_core::{
    format_file_size, AppError, BatchSummary, ProcessingLogEntry, ProcessingOptions,
    ProcessingResult, UploadedFile,
};
use pixshrink_infra::ErrorResponse;
use pixshrink_processing::ValidationError;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::AuthUser;
use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessResponse {
    pub success: bool,
    pub message: String,
    pub results: Vec<ProcessingResult>,
    pub summary: BatchSummary,
}

/// One buffered file part
struct PendingUpload {
    client_filename: String,
    content_type: String,
    data: Vec<u8>,
}

/// The whole-body cap says nothing about which limit was broken, so it gets
/// its own message instead of a per-file one.
fn multipart_error(state: &AppState, err: MultipartError) -> HttpAppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return HttpAppError(AppError::UploadLimit(format!(
            "Upload exceeds the {} request limit (at most {} files of {} each)",
            format_file_size(state.config.max_request_body_bytes() as i64),
            state.validator.max_files(),
            format_file_size(state.validator.max_file_size() as i64),
        )));
    }
    HttpAppError(AppError::BadRequest(format!(
        "Invalid multipart body: {}",
        err.body_text()
    )))
}

/// Read the whole form, enforcing the upload limits as parts arrive.
///
/// Returns the files and the raw `quality` / `format` values.
async fn read_form(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<(Vec<PendingUpload>, Option<String>, Option<String>), HttpAppError> {
    let mut files = Vec::new();
    let mut quality = None;
    let mut format = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(state, e))?
    {
        let name = field.name().unwrap_or_default().to_string();

        let Some(client_filename) = field.file_name().map(str::to_string) else {
            let value = field.text().await.map_err(|e| multipart_error(state, e))?;
            match name.as_str() {
                "quality" => quality = Some(value),
                "format" => format = Some(value),
                _ => tracing::debug!(field = %name, "Ignoring unknown form field"),
            }
            continue;
        };

        if name != UPLOAD_FIELD_NAME {
            return Err(ValidationError::UnexpectedField(name).into());
        }
        state.validator.validate_file_count(files.len())?;

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        state
            .validator
            .validate_image(&client_filename, &content_type)?;

        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(state, e))? {
            state.validator.validate_file_size(data.len() + chunk.len())?;
            data.extend_from_slice(&chunk);
        }

        files.push(PendingUpload {
            client_filename,
            content_type,
            data,
        });
    }

    Ok((files, quality, format))
}

/// Persist the buffered files under fresh names. Nothing is left behind on failure.
async fn store_uploads(
    state: &AppState,
    pending: Vec<PendingUpload>,
) -> Result<Vec<UploadedFile>, HttpAppError> {
    let mut stored: Vec<UploadedFile> = Vec::with_capacity(pending.len());

    for file in pending {
        let filename = stored_filename(&file.client_filename, &file.content_type);
        match state.store.write(&filename, &file.data).await {
            Ok(size_bytes) => stored.push(UploadedFile {
                stored_filename: filename,
                original_filename: file.client_filename,
                content_type: file.content_type,
                size_bytes,
            }),
            Err(e) => {
                let written: Vec<String> =
                    stored.iter().map(|f| f.stored_filename.clone()).collect();
                state.store.delete_all(&written).await;
                return Err(e.into());
            }
        }
    }

    Ok(stored)
}

async fn log_results(state: &AppState, user: &AuthUser, results: &[ProcessingResult]) {
    for result in results {
        let Some(entry) = ProcessingLogEntry::from_result(&user.user_id, result) else {
            continue;
        };
        if let Err(e) = state.log_sink.record(entry).await {
            tracing::error!(
                user_id = %user.user_id,
                original_filename = %result.original_filename,
                error = %e,
                "Failed to log processing"
            );
        }
    }
}

/// Upload and optimize a batch of images
#[utoipa::path(
    post,
    path = "/api/images/process",
    tag = "images",
    request_body(content = inline(Object), content_type = "multipart/form-data", description = "`images` files plus optional `quality` (1-100) and `format` (webp, jpeg, png, avif)"),
    responses(
        (status = 200, description = "Batch processed", body = ProcessResponse),
        (status = 400, description = "Invalid upload or options", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(user, state, multipart), fields(user_id = %user.user_id))]
pub async fn process_images(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, HttpAppError> {
    let (pending, quality, format) = read_form(&state, &mut multipart).await?;

    if pending.is_empty() {
        return Err(AppError::BadRequest("No files uploaded".to_string()).into());
    }

    let config = &state.config;
    let options = ProcessingOptions::parse(
        quality.as_deref(),
        format.as_deref(),
        config.max_width(),
        config.default_quality(),
        config.default_format(),
    )?;

    let uploads = store_uploads(&state, pending).await?;
    tracing::info!(
        files = uploads.len(),
        format = %options.format,
        quality = options.quality,
        "Processing upload batch"
    );

    let results = state.batch.process_batch(&uploads, &options).await;
    log_results(&state, &user, &results).await;

    let summary = BatchSummary::from_results(&results);
    Ok(Json(ProcessResponse {
        success: true,
        message: "Images processed successfully".to_string(),
        results,
        summary,
    }))
}
