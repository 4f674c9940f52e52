use std::path::Path;

use pixshrink_core::format::round2;

/// Upload validation errors. The display strings are client-facing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("File size exceeds {}MB limit", round2(*max as f64 / (1024.0 * 1024.0)))]
    FileTooLarge { size: usize, max: usize },

    #[error("Maximum {max} files allowed")]
    TooManyFiles { max: usize },

    #[error("Unexpected field in upload")]
    UnexpectedField(String),

    #[error("Only image files are allowed")]
    NotAnImage {
        filename: String,
        content_type: String,
    },
}

/// Upload validator
///
/// Checks the limits and the image-only filter that apply to every file of a
/// multipart upload, before anything is written to the store.
#[derive(Debug, Clone)]
pub struct UploadValidator {
    max_file_size: usize,
    max_files: usize,
    allowed_extensions: Vec<String>,
    allowed_content_types: Vec<String>,
}

impl UploadValidator {
    pub fn new(
        max_file_size: usize,
        max_files: usize,
        allowed_extensions: Vec<String>,
        allowed_content_types: Vec<String>,
    ) -> Self {
        Self {
            max_file_size,
            max_files,
            allowed_extensions,
            allowed_content_types,
        }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    /// Validate the size of a single file
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Validate that one more file still fits the batch, given how many were already accepted
    pub fn validate_file_count(&self, accepted: usize) -> Result<(), ValidationError> {
        if accepted >= self.max_files {
            return Err(ValidationError::TooManyFiles {
                max: self.max_files,
            });
        }
        Ok(())
    }

    /// Content type must be an allowed image type; an extension, when present, must be one too.
    pub fn validate_image(&self, filename: &str, content_type: &str) -> Result<(), ValidationError> {
        let not_an_image = || ValidationError::NotAnImage {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
        };

        let content_type_lower = content_type.trim().to_lowercase();
        if !self.allowed_content_types.contains(&content_type_lower) {
            return Err(not_an_image());
        }

        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        if let Some(extension) = extension {
            if !self.allowed_extensions.contains(&extension) {
                return Err(not_an_image());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> UploadValidator {
        UploadValidator::new(
            10 * 1024 * 1024,
            2,
            vec!["jpg".into(), "jpeg".into(), "png".into()],
            vec!["image/jpeg".into(), "image/png".into()],
        )
    }

    #[test]
    fn test_file_size_limit() {
        let v = validator();
        assert!(v.validate_file_size(10 * 1024 * 1024).is_ok());
        let err = v.validate_file_size(10 * 1024 * 1024 + 1).unwrap_err();
        assert_eq!(err.to_string(), "File size exceeds 10MB limit");
    }

    #[test]
    fn test_fractional_megabyte_limit_message() {
        let v = UploadValidator::new(1536 * 1024, 1, vec![], vec![]);
        let err = v.validate_file_size(2 * 1024 * 1024).unwrap_err();
        assert_eq!(err.to_string(), "File size exceeds 1.5MB limit");
    }

    #[test]
    fn test_file_count_limit() {
        let v = validator();
        assert!(v.validate_file_count(0).is_ok());
        assert!(v.validate_file_count(1).is_ok());
        let err = v.validate_file_count(2).unwrap_err();
        assert_eq!(err.to_string(), "Maximum 2 files allowed");
    }

    #[test]
    fn test_image_filter() {
        let v = validator();
        assert!(v.validate_image("photo.JPG", "image/jpeg").is_ok());
        assert!(v.validate_image("no-extension", "image/png").is_ok());

        let err = v.validate_image("notes.txt", "text/plain").unwrap_err();
        assert_eq!(err.to_string(), "Only image files are allowed");
        assert!(v.validate_image("photo.exe", "image/jpeg").is_err());
    }

    #[test]
    fn test_unexpected_field_message() {
        let err = ValidationError::UnexpectedField("avatar".into());
        assert_eq!(err.to_string(), "Unexpected field in upload");
    }
}
