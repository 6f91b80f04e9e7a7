//! The immutable file value that flows in and out of the pipeline.
//!
//! An [`ImageFile`] is an opaque byte blob plus the metadata an uploaded file
//! would carry: a declared content type, a name and (optionally) the origin it
//! was loaded from. The bytes live behind an `Arc<[u8]>` so handing a file to
//! a `spawn_blocking` task is a pointer copy, not a buffer copy.

use crate::error::ScanError;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Content type used when nothing better is known.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// An immutable image file: bytes, declared content type, name and origin.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageFile {
    name: String,
    content_type: String,
    bytes: Arc<[u8]>,
    origin: Option<String>,
}

impl ImageFile {
    /// Create a same-origin file.
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: Arc::from(bytes.into()),
            origin: None,
        }
    }

    /// Mark the file as loaded from `origin` (e.g. `https://cdn.example.com`).
    ///
    /// Files with an origin are subject to [`crate::config::OriginPolicy`].
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Read a local file into memory.
    ///
    /// The content type is inferred from the extension; unknown extensions
    /// get `application/octet-stream` and rely on magic-byte sniffing later.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ScanError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ScanError::ReadFailed {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = content_type_for_path(path);
        debug!(
            "Read {} ({} bytes, declared {})",
            path.display(),
            bytes.len(),
            content_type
        );

        Ok(Self::new(name, content_type, bytes))
    }
}

/// Guess a MIME type from a path's extension.
pub fn content_type_for_path(path: &Path) -> String {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "heic" => "image/heic".to_string(),
        "heif" => "image/heif".to_string(),
        other => image::ImageFormat::from_extension(other)
            .map(|f| f.to_mime_type().to_string())
            .unwrap_or_else(|| OCTET_STREAM.to_string()),
    }
}

impl fmt::Debug for ImageFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageFile")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .field("origin", &self.origin)
            .finish()
    }
}

// Summary only: bytes are omitted, the data reference carries them.
impl Serialize for ImageFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ImageFile", 4)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("content_type", &self.content_type)?;
        s.serialize_field("size", &self.bytes.len())?;
        s.serialize_field("origin", &self.origin)?;
        s.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for_path(Path::new("a.PNG")), "image/png");
        assert_eq!(content_type_for_path(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(content_type_for_path(Path::new("a.HEIC")), "image/heic");
        assert_eq!(content_type_for_path(Path::new("a.heif")), "image/heif");
        assert_eq!(content_type_for_path(Path::new("a.bin")), OCTET_STREAM);
        assert_eq!(content_type_for_path(Path::new("noext")), OCTET_STREAM);
    }

    #[test]
    fn debug_omits_bytes() {
        let f = ImageFile::new("x.png", "image/png", vec![1u8; 1024]);
        let dbg = format!("{f:?}");
        assert!(dbg.contains("len: 1024"));
        assert!(!dbg.contains("[1, 1"));
    }

    #[test]
    fn serialize_summary() {
        let f = ImageFile::new("x.png", "image/png", vec![0u8; 3]).with_origin("https://a.test");
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["name"], "x.png");
        assert_eq!(json["size"], 3);
        assert_eq!(json["origin"], "https://a.test");
    }

    #[tokio::test]
    async fn from_path_missing_file() {
        let err = ImageFile::from_path("/definitely/not/here.png")
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::FileNotFound { .. }), "got {err:?}");
    }

    #[tokio::test]
    async fn from_path_reads_bytes_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("page.jpeg");
        std::fs::write(&p, b"abc").unwrap();
        let f = ImageFile::from_path(&p).await.unwrap();
        assert_eq!(f.name(), "page.jpeg");
        assert_eq!(f.content_type(), "image/jpeg");
        assert_eq!(f.bytes(), b"abc");
        assert!(f.origin().is_none());
    }
}
