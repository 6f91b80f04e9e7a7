//! Scan entry points: the binarization engine and its wrappers.
//!
//! [`binarize`] is the core: decode → classify → encode → data reference.
//! [`scan_document`] adds the optional format-normalization step in front of
//! it, and [`scan_file`] / [`scan_to_file`] / [`scan_sync`] adapt it to paths
//! and blocking callers.
//!
//! Decode and encode run on `spawn_blocking`; both are CPU-bound and would
//! otherwise stall a Tokio worker for the length of a large image. The
//! classification pass runs on the same blocking thread right after decode.
//! If the caller drops the future mid-scan the blocking task still runs to
//! completion, and its decode handle is released by `Drop` as usual.

use crate::config::{OutputType, ScanConfig};
use crate::error::ScanError;
use crate::file::ImageFile;
use crate::output::{ProcessingResult, ScanStats};
use crate::pipeline::{encode, normalize, raster::RasterCodec, threshold};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fallback base name when the input name has nothing before its first `.`.
pub const DEFAULT_BASE_NAME: &str = "document";

/// Binarize `file` into a black-and-white scan.
///
/// Uses a fresh [`RasterCodec`] built from `config.origin_policy`. Use
/// [`binarize_with_codec`] to share a codec (and its handle tracker).
///
/// # Errors
/// - [`ScanError::InputTooLarge`] above `config.max_input_bytes`
/// - [`ScanError::Decode`] / [`ScanError::TaintedSource`] from decoding
/// - [`ScanError::Encode`] from re-encoding
pub async fn binarize(
    file: ImageFile,
    config: &ScanConfig,
) -> Result<ProcessingResult, ScanError> {
    let codec = RasterCodec::new(config.origin_policy.clone());
    binarize_with_codec(&codec, file, config).await
}

/// [`binarize`] with an explicit codec.
///
/// The codec's origin policy is used instead of `config.origin_policy`.
pub async fn binarize_with_codec(
    codec: &RasterCodec,
    file: ImageFile,
    config: &ScanConfig,
) -> Result<ProcessingResult, ScanError> {
    let name = file.name().to_string();
    info!("Starting scan: {} ({} bytes)", name, file.len());

    if let Some(ref cb) = config.progress_callback {
        cb.on_scan_start(&name);
    }

    let result = run_pipeline(codec, file, config).await;

    match (&result, &config.progress_callback) {
        (Ok(r), Some(cb)) => cb.on_scan_complete(r.file.name()),
        (Err(e), Some(cb)) => cb.on_scan_error(&e.to_string()),
        _ => {}
    }
    if let Err(ref e) = result {
        warn!("Scan of '{}' failed: {}", name, e);
    }
    result
}

async fn run_pipeline(
    codec: &RasterCodec,
    file: ImageFile,
    config: &ScanConfig,
) -> Result<ProcessingResult, ScanError> {
    let total_start = Instant::now();
    check_input_size(&file, config)?;

    // ── Step 1–3: Decode + classify ─────────────────────────────────────
    let decode_codec = codec.clone();
    let source = file.clone();
    let (buffer, counts, decode_ms, classify_ms) = tokio::task::spawn_blocking(move || {
        let start = Instant::now();
        let mut buffer = decode_codec.decode(&source)?;
        let decode_ms = start.elapsed().as_millis() as u64;

        let start = Instant::now();
        let counts = threshold::binarize_pixels(&mut buffer);
        let classify_ms = start.elapsed().as_millis() as u64;

        Ok::<_, ScanError>((buffer, counts, decode_ms, classify_ms))
    })
    .await
    .map_err(|e| ScanError::Internal(format!("Decode task panicked: {}", e)))??;

    let (width, height) = (buffer.width(), buffer.height());
    info!(
        "Binarized {}x{} px: {} black / {} white",
        width, height, counts.black, counts.white
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_decoded(width, height);
    }

    // ── Step 4–5: Encode + name ─────────────────────────────────────────
    let output = config.output;
    let out_name = output_file_name(file.name(), output, config.match_extension);
    let encode_codec = codec.clone();
    let encode_start = Instant::now();
    let out_file = tokio::task::spawn_blocking(move || encode_codec.encode(&buffer, output, out_name))
        .await
        .map_err(|e| ScanError::Internal(format!("Encode task panicked: {}", e)))??;
    let encode_ms = encode_start.elapsed().as_millis() as u64;

    if let Some(ref cb) = config.progress_callback {
        cb.on_encoded(out_file.len());
    }

    // ── Step 6: Data reference ──────────────────────────────────────────
    let for_url = out_file.clone();
    let url = tokio::task::spawn_blocking(move || encode::to_data_reference(&for_url))
        .await
        .map_err(|e| ScanError::Internal(format!("Data reference task panicked: {}", e)))?;

    let stats = ScanStats {
        width,
        height,
        black_pixels: counts.black,
        white_pixels: counts.white,
        output_bytes: out_file.len(),
        decode_ms,
        classify_ms,
        encode_ms,
        total_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Scan complete: '{}' → '{}' ({} bytes, {}ms total)",
        file.name(),
        out_file.name(),
        stats.output_bytes,
        stats.total_ms
    );

    Ok(ProcessingResult {
        file: out_file,
        url,
        stats,
    })
}

/// Reject `file` if it is above `config.max_input_bytes`.
fn check_input_size(file: &ImageFile, config: &ScanConfig) -> Result<(), ScanError> {
    let size = file.len() as u64;
    if size > config.max_input_bytes {
        return Err(ScanError::InputTooLarge {
            name: file.name().to_string(),
            size,
            limit: config.max_input_bytes,
        });
    }
    Ok(())
}

/// Normalize niche formats if a normalizer is configured, then [`binarize`].
///
/// The input size limit applies to the caller's file, before normalization.
pub async fn scan_document(
    file: ImageFile,
    config: &ScanConfig,
) -> Result<ProcessingResult, ScanError> {
    check_input_size(&file, config)?;

    let file = match config.normalizer {
        Some(ref normalizer) if normalizer.is_niche_format(&file) => {
            info!("Normalizing '{}' ({})", file.name(), file.content_type());
            let normalizer = normalizer.clone();
            tokio::task::spawn_blocking(move || normalizer.normalize(&file))
                .await
                .map_err(|e| ScanError::Internal(format!("Normalize task panicked: {}", e)))??
        }
        None if normalize::is_heic_file(&file) => {
            warn!(
                "'{}' looks like HEIC/HEIF but no normalizer is configured; decode will likely fail",
                file.name()
            );
            file
        }
        _ => file,
    };

    binarize(file, config).await
}

/// Read `path` and scan it.
pub async fn scan_file(
    path: impl AsRef<Path>,
    config: &ScanConfig,
) -> Result<ProcessingResult, ScanError> {
    let file = ImageFile::from_path(path).await?;
    scan_document(file, config).await
}

/// Scan `input_path` and write the output file to `output_path`.
///
/// Uses atomic write (temp file in the same directory + rename) to prevent
/// partial files.
pub async fn scan_to_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ScanConfig,
) -> Result<ProcessingResult, ScanError> {
    let result = scan_file(input_path, config).await?;
    write_output(&result.file, output_path).await?;
    Ok(result)
}

/// Atomically write `file`'s bytes to `path`, creating parent directories.
pub async fn write_output(file: &ImageFile, path: impl AsRef<Path>) -> Result<(), ScanError> {
    let path = path.as_ref().to_path_buf();
    let file = file.clone();

    tokio::task::spawn_blocking(move || write_atomic(&path, file.bytes()))
        .await
        .map_err(|e| ScanError::Internal(format!("Write task panicked: {}", e)))?
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ScanError> {
    let failed = |source: std::io::Error| ScanError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent).map_err(failed)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(failed)?;
    tmp.write_all(bytes).map_err(failed)?;
    tmp.persist(path).map_err(|e| failed(e.error))?;

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Synchronous wrapper around [`scan_document`].
///
/// Creates a temporary tokio runtime internally.
pub fn scan_sync(file: ImageFile, config: &ScanConfig) -> Result<ProcessingResult, ScanError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ScanError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(scan_document(file, config))
}

/// `scanned_<base>.<ext>` where `<base>` is everything before the first `.`.
///
/// `<ext>` is `png` unless `match_extension` is set, in which case it follows
/// `output` (`jpg` for JPEG).
pub fn output_file_name(input_name: &str, output: OutputType, match_extension: bool) -> String {
    let base = input_name.split('.').next().unwrap_or_default();
    let base = if base.is_empty() { DEFAULT_BASE_NAME } else { base };
    let ext = if match_extension {
        output.extension()
    } else {
        OutputType::Png.extension()
    };
    format!("scanned_{base}.{ext}")
}
