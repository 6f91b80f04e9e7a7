//! # edgequake-docscan
//!
//! Turn a photographed or screenshotted document into a crisp black-and-white
//! "scan".
//!
//! ## Why this crate?
//!
//! OCR engines and vision models read high-contrast pages far more reliably
//! than phone photos with shadows, tinted paper and JPEG noise. A fixed
//! luminosity threshold is the simplest transform that gets there: every
//! pixel becomes pure black or pure white, alpha untouched.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ImageFile
//!  │
//!  ├─ 1. Normalize  HEIC/HEIF → JPEG (optional, injected decoder)
//!  ├─ 2. Decode     bytes → RGBA pixel buffer (spawn_blocking, per-call handle)
//!  ├─ 3. Classify   L = 0.299R + 0.587G + 0.114B; L > 150 → white, else black
//!  ├─ 4. Encode     pixel buffer → PNG or JPEG
//!  └─ 5. Reference  output → `data:<type>;base64, <payload>`
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_docscan::{scan_file, ScanConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ScanConfig::default();
//!     let result = scan_file("receipt.jpg", &config).await?;
//!     std::fs::write(result.file.name(), result.file.bytes())?;
//!     println!("{}", result.url);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docscan` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-docscan = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod file;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod scan;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OriginPolicy, OutputType, ScanConfig, ScanConfigBuilder};
pub use error::ScanError;
pub use file::ImageFile;
pub use output::{ProcessingResult, ScanStats};
pub use pipeline::encode::{to_data_reference, DataReference};
pub use pipeline::normalize::{FormatNormalizer, HeicFrameDecoder, HeicNormalizer};
pub use pipeline::raster::{PixelBuffer, RasterCodec};
pub use progress::{NoopProgressCallback, ProgressCallback, ScanProgressCallback};
pub use scan::{
    binarize, binarize_with_codec, output_file_name, scan_document, scan_file, scan_sync,
    scan_to_file, write_output,
};
