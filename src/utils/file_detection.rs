use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "ico", "webp", "svg",
    "tiff", "tif", "heic", "heif", "avif", "jfif",
];

/// Fallback media type for files we cannot classify.
pub const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// Determines the media type of a file.
///
/// The extension is checked first. Files without a known extension are
/// sniffed from their leading bytes, mirroring what a browser reports for a
/// picked file.
pub fn detect_media_type(path: &Path) -> String {
    if let Some(mime) = mime_guess::from_path(path).first() {
        return mime.essence_str().to_string();
    }

    match tree_magic_mini::from_filepath(path) {
        Some(mime) => {
            tracing::debug!("Sniffed media type {} for {}", mime, path.display());
            mime.to_string()
        }
        None => UNKNOWN_MEDIA_TYPE.to_string(),
    }
}

/// `true` for any `image/*` media type.
pub fn is_image_media_type(media_type: &str) -> bool {
    media_type
        .split('/')
        .next()
        .is_some_and(|top| top.eq_ignore_ascii_case("image"))
        && media_type.len() > "image/".len()
}

/// The extensions offered by the native picker's image filter.
pub fn image_extensions() -> &'static [&'static str] {
    IMAGE_EXTENSIONS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    #[test]
    fn test_detects_by_extension() {
        assert_eq!(detect_media_type(Path::new("a.PNG")), "image/png");
        assert_eq!(detect_media_type(Path::new("b.jpg")), "image/jpeg");
        assert_eq!(detect_media_type(Path::new("notes.txt")), "text/plain");
    }

    #[test]
    fn test_extensionless_file_gets_a_media_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fundus_capture");
        fs::write(&path, PNG_MAGIC).unwrap();

        assert!(!detect_media_type(&path).is_empty());
    }

    #[test]
    fn test_image_media_type_filter() {
        assert!(is_image_media_type("image/png"));
        assert!(is_image_media_type("IMAGE/jpeg"));
        assert!(!is_image_media_type("image/"));
        assert!(!is_image_media_type("application/pdf"));
        assert!(!is_image_media_type(UNKNOWN_MEDIA_TYPE));
    }

    #[test]
    fn test_picker_extensions_are_images() {
        for ext in image_extensions() {
            let name = format!("scan.{}", ext);
            assert!(
                is_image_media_type(&detect_media_type(Path::new(&name))),
                "{} is offered by the picker but not detected as an image",
                name
            );
        }
    }
}
