//! OpenAPI documentation, served at `/api/openapi.json`.

use utoipa::OpenApi;

use crate::handlers;
use pixshrink_core::models;
use pixshrink_infra::ErrorResponse;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pixshrink API",
        version = "0.1.0",
        description = "Batch image optimizer: upload images, get them resized and recompressed, download them once."
    ),
    paths(
        handlers::process::process_images,
        handlers::download::download_image,
        handlers::download_zip::download_zip,
        handlers::delete::delete_files,
        handlers::capabilities::get_capabilities,
        handlers::health::health_check,
    ),
    components(schemas(
        ErrorResponse,
        handlers::FilenamesRequest,
        handlers::process::ProcessResponse,
        handlers::delete::DeleteResponse,
        handlers::capabilities::CapabilitiesResponse,
        handlers::health::HealthResponse,
        models::OutputFormat,
        models::Dimensions,
        models::ImageDimensions,
        models::ProcessingResult,
        models::BatchSummary,
        models::Capabilities,
        models::FormatDetails,
    )),
    tags(
        (name = "images", description = "Upload, optimize, download and delete images"),
        (name = "health", description = "Service status")
    )
)]
pub struct ApiDoc;

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_every_route() {
        let spec = get_openapi_spec();
        for path in [
            "/api/images/process",
            "/api/images/download/{filename}",
            "/api/images/download-zip",
            "/api/images/delete",
            "/api/images/capabilities",
            "/api/health",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
    }
}
