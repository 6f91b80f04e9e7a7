//! Format normalization: niche raster formats → a standard raster file.
//!
//! The raster codec only reads mainstream formats. Photos straight off a
//! phone are often HEIC/HEIF, so they pass through a [`FormatNormalizer`]
//! first. The crate ships no HEIC codec; [`HeicNormalizer`] wraps a
//! caller-supplied [`HeicFrameDecoder`] and handles everything around it:
//! detection, first-frame selection, JPEG re-encode and renaming.

use crate::config::OutputType;
use crate::error::ScanError;
use crate::file::ImageFile;
use crate::pipeline::raster::{PixelBuffer, RasterCodec};
use image::DynamicImage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};

const HEIC_MIME_TYPES: [&str; 4] = [
    "image/heic",
    "image/heif",
    "image/heic-sequence",
    "image/heif-sequence",
];

static RE_HEIC_EXTENSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.hei[cf]$").unwrap());

/// JPEG quality for normalized output.
pub const NORMALIZED_JPEG_QUALITY: f32 = 0.92;

/// Converts files the raster codec cannot read into ones it can.
pub trait FormatNormalizer: Send + Sync {
    /// True if `file` needs [`Self::normalize`] before decoding.
    fn is_niche_format(&self, file: &ImageFile) -> bool;

    /// Produce one standard raster file from `file`.
    ///
    /// # Errors
    /// [`ScanError::Normalization`] if no usable frame comes out.
    fn normalize(&self, file: &ImageFile) -> Result<ImageFile, ScanError>;
}

/// Decodes the frames of a HEIC/HEIF container.
pub trait HeicFrameDecoder: Send + Sync {
    fn decode_frames(&self, bytes: &[u8]) -> Result<Vec<DynamicImage>, String>;
}

/// True if the declared type or the file name says HEIC/HEIF.
pub fn is_heic_file(file: &ImageFile) -> bool {
    let ty = file.content_type().to_ascii_lowercase();
    HEIC_MIME_TYPES.contains(&ty.as_str()) || RE_HEIC_EXTENSION.is_match(file.name())
}

/// `photo.HEIC` → `photo.jpg`. Names without a HEIC extension are unchanged.
pub fn heic_to_jpeg_name(name: &str) -> String {
    RE_HEIC_EXTENSION.replace(name, ".jpg").into_owned()
}

/// HEIC/HEIF → JPEG normalizer around an injected frame decoder.
#[derive(Clone)]
pub struct HeicNormalizer {
    decoder: Arc<dyn HeicFrameDecoder>,
    codec: RasterCodec,
}

impl HeicNormalizer {
    pub fn new(decoder: Arc<dyn HeicFrameDecoder>) -> Self {
        Self {
            decoder,
            codec: RasterCodec::default(),
        }
    }
}

impl FormatNormalizer for HeicNormalizer {
    fn is_niche_format(&self, file: &ImageFile) -> bool {
        is_heic_file(file)
    }

    fn normalize(&self, file: &ImageFile) -> Result<ImageFile, ScanError> {
        let failed = |detail: String| ScanError::Normalization {
            name: file.name().to_string(),
            detail,
        };

        let frames = self.decoder.decode_frames(file.bytes()).map_err(failed)?;
        let frame_count = frames.len();
        let first = frames
            .into_iter()
            .next()
            .ok_or_else(|| failed("decoder returned no frames".into()))?;
        debug!(
            "'{}': {} frame(s), using the first ({}x{})",
            file.name(),
            frame_count,
            first.width(),
            first.height()
        );

        let output = OutputType::Jpeg {
            quality: Some(NORMALIZED_JPEG_QUALITY),
        };
        let jpeg = self
            .codec
            .encode(
                &PixelBuffer::from(first.into_rgba8()),
                output,
                heic_to_jpeg_name(file.name()),
            )
            .map_err(|e| failed(e.to_string()))?;

        info!("Normalized '{}' → '{}'", file.name(), jpeg.name());
        Ok(match file.origin() {
            Some(origin) => jpeg.with_origin(origin),
            None => jpeg,
        })
    }
}
