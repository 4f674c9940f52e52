pub mod capabilities;
pub mod delete;
pub mod download;
pub mod download_zip;
pub mod health;
pub mod process;

use pixshrink_core::AppError;
use serde::Deserialize;
use utoipa::ToSchema;

pub const NO_FILENAMES_MESSAGE: &str = "No filenames provided";

/// Body of the ZIP download and delete endpoints
#[derive(Debug, Deserialize, ToSchema)]
pub struct FilenamesRequest {
    /// Derived (or uploaded) filenames
    #[serde(default)]
    #[schema(value_type = Option<Vec<String>>)]
    pub filenames: Option<serde_json::Value>,
}

impl FilenamesRequest {
    /// Non-empty list of names. Anything else (absent, not an array, empty) is
    /// rejected; so are entries that are not strings.
    pub fn into_filenames(self) -> Result<Vec<String>, AppError> {
        let no_filenames = || AppError::InvalidInput(NO_FILENAMES_MESSAGE.to_string());

        let items = match self.filenames {
            Some(serde_json::Value::Array(items)) if !items.is_empty() => items,
            _ => return Err(no_filenames()),
        };

        items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(name) => Ok(name),
                _ => Err(AppError::InvalidInput("Invalid filename".to_string())),
            })
            .collect()
    }
}
