//! Attachment staging: image files become base64 inline parts, documents
//! become name-only references (their bytes are never transmitted).

use anyhow::{bail, Context, Result};
use base64::Engine as _;
use engine::{DocumentRef, ImageAttachment};
use std::fs;
use std::path::Path;

fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

pub fn load_image(path: &Path) -> Result<ImageAttachment> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let Some(mime_type) = mime_for_extension(extension) else {
        bail!("unsupported image type: {:?}", path);
    };
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(ImageAttachment {
        data: base64::engine::general_purpose::STANDARD.encode(&bytes),
        mime_type: mime_type.to_string(),
    })
}

pub fn document_ref(path: &Path) -> Result<DocumentRef> {
    if !path.exists() {
        bail!("no such file: {}", path.display());
    }
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document")
        .to_string();
    Ok(DocumentRef { file_name })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_image_encodes_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dot.png");
        fs::write(&path, b"ABC").unwrap();
        let attachment = load_image(&path).unwrap();
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(attachment.data, "QUJD");
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"hi").unwrap();
        assert!(load_image(&path).is_err());
    }

    #[test]
    fn test_document_ref_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        fs::write(&path, b"%PDF").unwrap();
        let doc = document_ref(&path).unwrap();
        assert_eq!(doc.file_name, "report.pdf");
    }

    #[test]
    fn test_document_ref_missing_file() {
        assert!(document_ref(Path::new("/definitely/not/here.pdf")).is_err());
    }
}
