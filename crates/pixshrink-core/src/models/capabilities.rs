use serde::Serialize;
use utoipa::ToSchema;

use super::OutputFormat;

/// Details for one output format
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FormatDetails {
    pub name: OutputFormat,
    pub mime_type: String,
    pub extension: String,
    pub lossless: bool,
    pub supports_quality: bool,
}

impl From<OutputFormat> for FormatDetails {
    fn from(format: OutputFormat) -> Self {
        Self {
            name: format,
            mime_type: format.mime_type().to_string(),
            extension: format.extension().to_string(),
            lossless: format.is_lossless(),
            supports_quality: format.supports_quality(),
        }
    }
}

/// What the optimizer accepts and produces
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub formats: Vec<OutputFormat>,
    pub format_details: Vec<FormatDetails>,
    pub max_file_size: usize,
    pub max_files: usize,
    pub max_width: u32,
    pub default_quality: u8,
    pub default_format: OutputFormat,
    pub supported_input_formats: Vec<String>,
}

impl Capabilities {
    pub fn new(
        max_file_size: usize,
        max_files: usize,
        max_width: u32,
        default_quality: u8,
        default_format: OutputFormat,
        supported_input_formats: Vec<String>,
    ) -> Self {
        Self {
            formats: OutputFormat::ALL.to_vec(),
            format_details: OutputFormat::ALL.into_iter().map(FormatDetails::from).collect(),
            max_file_size,
            max_files,
            max_width,
            default_quality,
            default_format,
            supported_input_formats,
        }
    }
}
