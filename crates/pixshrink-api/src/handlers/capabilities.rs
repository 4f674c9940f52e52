use std::sync::Arc;

use axum::{extract::State, Json};
use pixshrink_core::Capabilities;
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct CapabilitiesResponse {
    pub success: bool,
    pub capabilities: Capabilities,
}

/// Output formats and upload limits
#[utoipa::path(
    get,
    path = "/api/images/capabilities",
    tag = "images",
    responses(
        (status = 200, description = "Optimizer capabilities", body = CapabilitiesResponse)
    )
)]
pub async fn get_capabilities(State(state): State<Arc<AppState>>) -> Json<CapabilitiesResponse> {
    let config = &state.config;
    Json(CapabilitiesResponse {
        success: true,
        capabilities: Capabilities::new(
            config.max_file_size_bytes(),
            config.max_files(),
            config.max_width(),
            config.default_quality(),
            config.default_format(),
            config.supported_input_formats().to_vec(),
        ),
    })
}
