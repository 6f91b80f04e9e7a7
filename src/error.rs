//! Error types for the edgequake-docscan library.
//!
//! Every failure is **terminal** for the invocation that hit it: the pipeline
//! never retries and never falls back to a different threshold. Errors are
//! returned as `Err(ScanError)` from the top-level `binarize` / `scan_*`
//! functions with the underlying cause attached via `#[source]`.
//!
//! Tainted-source failures get their own variant because the fix is a
//! configuration change (allow the origin), not a data change. Callers that
//! surface errors to users should keep the two apart.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-docscan library.
#[derive(Debug, Error)]
pub enum ScanError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// Reading the input file failed for a reason other than the two above.
    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input exceeds the configured byte limit.
    #[error("Image '{name}' is {size} bytes, above the {limit}-byte limit.\nRaise --max-input-bytes if this is intended.")]
    InputTooLarge { name: String, size: u64, limit: u64 },

    // ── Raster errors ─────────────────────────────────────────────────────
    /// The bytes are not a raster format this build can decode.
    #[error("Could not decode image '{name}' (declared type '{content_type}'): {source}")]
    Decode {
        name: String,
        content_type: String,
        #[source]
        source: image::ImageError,
    },

    /// Pixels were decoded but reading them is blocked by origin policy.
    #[error(
        "Pixel access blocked for '{name}': origin '{origin}' is not allowed.\n\
Add the origin to the allow-list (--allow-origin) or load the image from the same origin."
    )]
    TaintedSource { name: String, origin: String },

    /// Re-encoding the pixel buffer failed or produced no bytes.
    #[error("Failed to encode scanned image as {content_type}: {detail}")]
    Encode {
        content_type: &'static str,
        detail: String,
        #[source]
        source: Option<image::ImageError>,
    },

    /// The external format normalizer produced no usable frame.
    #[error("Failed to convert '{name}' to a standard raster format: {detail}")]
    Normalization { name: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output image file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ScanError {
    /// True for [`ScanError::TaintedSource`].
    ///
    /// Shorthand for UIs that show a configuration hint instead of a
    /// "try another file" message.
    pub fn is_tainted_source(&self) -> bool {
        matches!(self, ScanError::TaintedSource { .. })
    }
}
