//! File naming convention
//!
//! Uploads are stored as `<base>.<ext>` with `<base>` = `<unix-millis>-<random>`.
//! Each derived file is `<base>-optimized.<ext>`, which is what links it back to
//! its upload when nothing else remembers the pairing.

use std::sync::LazyLock;

use rand::Rng;
use regex::Regex;

use crate::constants::OPTIMIZED_MARKER;
use crate::models::OutputFormat;

static OPTIMIZED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+)-optimized\.\w+$").expect("optimized filename pattern is valid")
});

const FALLBACK_EXTENSION: &str = "img";
const MAX_EXTENSION_LEN: usize = 8;

/// Fresh `<unix-millis>-<random>` base name for an upload.
pub fn generate_base_name() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let random: u32 = rand::rng().random_range(0..1_000_000_000);
    format!("{}-{}", millis, random)
}

/// Stored name for an upload: a fresh base name plus an extension taken from
/// the client filename, or from the content type when the name has none.
pub fn stored_filename(client_filename: &str, content_type: &str) -> String {
    format!(
        "{}.{}",
        generate_base_name(),
        upload_extension(client_filename, content_type)
    )
}

fn upload_extension(client_filename: &str, content_type: &str) -> String {
    let is_clean = |ext: &str| {
        !ext.is_empty()
            && ext.len() <= MAX_EXTENSION_LEN
            && ext.chars().all(|c| c.is_ascii_alphanumeric())
    };

    if let Some((_, ext)) = client_filename.rsplit_once('.') {
        if is_clean(ext) {
            return ext.to_ascii_lowercase();
        }
    }

    content_type
        .strip_prefix("image/")
        .filter(|ext| is_clean(ext))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// Name of the derived file for a stored upload.
pub fn optimized_filename(stored_filename: &str, format: OutputFormat) -> String {
    let stem = stored_filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(stored_filename);
    format!("{}{}.{}", stem, OPTIMIZED_MARKER, format.extension())
}

/// Extracts `<base>` from `<base>-optimized.<ext>`.
pub fn parse_optimized_filename(filename: &str) -> Option<&str> {
    OPTIMIZED_NAME
        .captures(filename)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Whether `candidate` may be the upload a derived file with `base` came from.
pub fn is_original_candidate(candidate: &str, base: &str) -> bool {
    candidate.starts_with(base) && !candidate.contains(OPTIMIZED_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_base_name_shape() {
        let base = generate_base_name();
        let (millis, random) = base.split_once('-').unwrap();
        assert!(millis.parse::<i64>().unwrap() > 0);
        assert!(random.parse::<u32>().unwrap() < 1_000_000_000);
        assert!(!base.contains(OPTIMIZED_MARKER));
    }

    #[test]
    fn test_stored_filename_uses_client_extension() {
        let name = stored_filename("Holiday Photo.JPG", "image/jpeg");
        assert!(name.ends_with(".jpg"));
        assert!(!name.contains(' '));
    }

    #[test]
    fn test_stored_filename_ignores_hostile_names() {
        let name = stored_filename("../../etc/passwd", "image/png");
        assert!(name.ends_with(".png"));
        assert!(!name.contains('/'));

        let name = stored_filename("noext", "application/octet-stream");
        assert!(name.ends_with(".img"));
    }

    #[test]
    fn test_optimized_filename() {
        assert_eq!(
            optimized_filename("1760697125354-520574130.jpg", OutputFormat::Webp),
            "1760697125354-520574130-optimized.webp"
        );
        assert_eq!(
            optimized_filename("1-2.png", OutputFormat::Jpeg),
            "1-2-optimized.jpeg"
        );
    }

    #[test]
    fn test_parse_optimized_filename() {
        assert_eq!(
            parse_optimized_filename("1760697125354-520574130-optimized.webp"),
            Some("1760697125354-520574130")
        );
        assert_eq!(parse_optimized_filename("photo.webp"), None);
        assert_eq!(parse_optimized_filename("-optimized.webp"), None);
        assert_eq!(parse_optimized_filename("a-optimized."), None);
    }

    #[test]
    fn test_is_original_candidate() {
        let base = "1760697125354-520574130";
        assert!(is_original_candidate("1760697125354-520574130.jpg", base));
        assert!(!is_original_candidate(
            "1760697125354-520574130-optimized.webp",
            base
        ));
        assert!(!is_original_candidate("other.jpg", base));
    }
}
