//! Pipeline stages for document scanning.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! normalize ──▶ raster::decode ──▶ threshold ──▶ raster::encode ──▶ encode
//! (HEIC→JPEG)   (bytes→RGBA)       (B/W)         (RGBA→PNG/JPEG)    (data:…)
//! ```
//!
//! 1. [`normalize`]: optional; convert niche formats (HEIC/HEIF) to JPEG
//! 2. [`raster`]:    decode into a [`raster::PixelBuffer`] and encode back;
//!    owns the per-call decode handle and the origin (taint) check
//! 3. [`threshold`]: luminosity + fixed threshold, in place
//! 4. [`encode`]:    base64-wrap the output file as a data reference

pub mod encode;
pub mod normalize;
pub mod raster;
pub mod threshold;
