/// A file received in a multipart upload and persisted in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Flat name inside the file store, `<base>.<ext>`
    pub stored_filename: String,
    /// Name the client sent
    pub original_filename: String,
    pub content_type: String,
    pub size_bytes: u64,
}
