//! Raster loader/exporter: [`ImageFile`] ⇄ [`PixelBuffer`].
//!
//! ## Decode handles
//!
//! Every decode opens a [`DecodeHandle`] over the source bytes. The handle is
//! an owned value with a per-call id taken from a monotonic counter, never
//! derived from the content, so two concurrent decodes of identical bytes can
//! never alias. It is dropped (released) immediately after the pixel grid is
//! produced or the decode fails, before any error propagates.
//!
//! Each [`RasterCodec`] counts its live handles so tests and long-running
//! hosts can assert that nothing leaks.
//!
//! ## Tainted sources
//!
//! Decoding always proceeds; *reading* the pixels of a file whose origin the
//! [`OriginPolicy`] does not allow fails with [`ScanError::TaintedSource`].

use crate::config::{OriginPolicy, OutputType};
use crate::error::ScanError;
use crate::file::ImageFile;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, ImageReader, Rgb, RgbImage, RgbaImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// A width × height grid of RGBA8 pixels.
///
/// `as_raw().len() == width * height * 4` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes. Returns `None` if the length does not match.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, data).map(|image| Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn as_raw_mut(&mut self) -> &mut [u8] {
        &mut self.image
    }

    /// Pixel at `(x, y)` as `[r, g, b, a]`. Panics when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.image.get_pixel(x, y).0
    }

    /// Drop alpha for encoders without an alpha channel.
    fn to_rgb(&self) -> RgbImage {
        RgbImage::from_fn(self.width(), self.height(), |x, y| {
            let [r, g, b, _] = self.pixel(x, y);
            Rgb([r, g, b])
        })
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        Self { image }
    }
}

/// Counts live [`DecodeHandle`]s. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct HandleTracker {
    live: Arc<AtomicUsize>,
}

impl HandleTracker {
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

/// Temporary, per-call handle over the bytes being decoded.
///
/// Released exactly once, on drop.
pub struct DecodeHandle<'a> {
    id: u64,
    bytes: &'a [u8],
    tracker: HandleTracker,
}

impl<'a> DecodeHandle<'a> {
    fn open(file: &'a ImageFile, tracker: &HandleTracker) -> Self {
        let id = NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed);
        tracker.live.fetch_add(1, Ordering::SeqCst);
        debug!("decode handle #{id} opened for '{}'", file.name());
        Self {
            id,
            bytes: file.bytes(),
            tracker: tracker.clone(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Decode the referenced bytes; `content_type` is the fallback when the
    /// magic bytes are not recognised.
    fn decode(&self, content_type: &str) -> Result<RgbaImage, image::ImageError> {
        let mut reader = ImageReader::new(Cursor::new(self.bytes)).with_guessed_format()?;
        if reader.format().is_none() {
            if let Some(format) = ImageFormat::from_mime_type(content_type) {
                reader.set_format(format);
            }
        }
        Ok(reader.decode()?.into_rgba8())
    }
}

impl Drop for DecodeHandle<'_> {
    fn drop(&mut self) {
        self.tracker.live.fetch_sub(1, Ordering::SeqCst);
        debug!("decode handle #{} released", self.id);
    }
}

/// Decodes files into pixel buffers and encodes buffers back into files.
///
/// Cheap to clone; clones share the handle tracker.
#[derive(Debug, Clone, Default)]
pub struct RasterCodec {
    origin_policy: OriginPolicy,
    tracker: HandleTracker,
}

impl RasterCodec {
    pub fn new(origin_policy: OriginPolicy) -> Self {
        Self {
            origin_policy,
            tracker: HandleTracker::default(),
        }
    }

    /// Number of decode handles currently open on this codec.
    pub fn open_handles(&self) -> usize {
        self.tracker.live()
    }

    /// Decode `file` into a buffer sized to the image's natural dimensions.
    ///
    /// # Errors
    /// - [`ScanError::Decode`] if the bytes are not a supported raster format
    /// - [`ScanError::TaintedSource`] if the origin policy blocks pixel access
    pub fn decode(&self, file: &ImageFile) -> Result<PixelBuffer, ScanError> {
        let decoded = {
            let handle = DecodeHandle::open(file, &self.tracker);
            let result = handle.decode(file.content_type());
            drop(handle);
            result
        };

        let image = decoded.map_err(|source| ScanError::Decode {
            name: file.name().to_string(),
            content_type: file.content_type().to_string(),
            source,
        })?;

        if !self.origin_policy.permits(file.origin()) {
            let origin = file.origin().unwrap_or_default().to_string();
            warn!(
                "Pixel access blocked for '{}' (origin {})",
                file.name(),
                origin
            );
            return Err(ScanError::TaintedSource {
                name: file.name().to_string(),
                origin,
            });
        }

        debug!(
            "Decoded '{}' → {}x{} px",
            file.name(),
            image.width(),
            image.height()
        );
        Ok(PixelBuffer { image })
    }

    /// Serialise `buffer` as `output`, naming the result `name`.
    ///
    /// JPEG drops the alpha channel; PNG keeps it.
    ///
    /// # Errors
    /// [`ScanError::Encode`] if the encoder fails or writes zero bytes.
    pub fn encode(
        &self,
        buffer: &PixelBuffer,
        output: OutputType,
        name: impl Into<String>,
    ) -> Result<ImageFile, ScanError> {
        let content_type = output.mime_type();
        let mut buf: Vec<u8> = Vec::new();

        let written = match output {
            OutputType::Png => buffer
                .image
                .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png),
            OutputType::Jpeg { .. } => {
                JpegEncoder::new_with_quality(&mut buf, output.jpeg_quality())
                    .encode_image(&buffer.to_rgb())
            }
        };
        written.map_err(|e| ScanError::Encode {
            content_type,
            detail: e.to_string(),
            source: Some(e),
        })?;

        if buf.is_empty() {
            return Err(ScanError::Encode {
                content_type,
                detail: "encoder produced 0 bytes".into(),
                source: None,
            });
        }

        debug!(
            "Encoded {}x{} px → {} bytes {}",
            buffer.width(),
            buffer.height(),
            buf.len(),
            content_type
        );
        Ok(ImageFile::new(name, content_type, buf))
    }
}
