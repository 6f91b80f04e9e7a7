//! Configuration types for document scanning.
//!
//! All scan behaviour is controlled through [`ScanConfig`], built via its
//! [`ScanConfigBuilder`]. The binarization math itself (luminosity weights and
//! the 150 threshold) is fixed; see [`crate::pipeline::threshold`].

use crate::error::ScanError;
use crate::pipeline::normalize::FormatNormalizer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// JPEG quality used when the caller does not pass one.
pub const DEFAULT_JPEG_QUALITY: f32 = 0.92;

/// Default cap on input size: 64 MiB.
pub const DEFAULT_MAX_INPUT_BYTES: u64 = 64 * 1024 * 1024;

/// Configuration for a scan.
///
/// # Example
/// ```rust
/// use edgequake_docscan::{OutputType, ScanConfig};
///
/// let config = ScanConfig::builder()
///     .output(OutputType::Jpeg { quality: Some(0.8) })
///     .allow_origin("https://cdn.example.com")
///     .build()
///     .unwrap();
/// assert_eq!(config.output.mime_type(), "image/jpeg");
/// ```
#[derive(Clone)]
pub struct ScanConfig {
    /// Encoding of the scanned file. Default: [`OutputType::Png`].
    pub output: OutputType,

    /// Which origins may have their pixels read. Default: same-origin only.
    pub origin_policy: OriginPolicy,

    /// Name the output after its real type (`.jpg` for JPEG). Default: false.
    ///
    /// When false, every output is named `scanned_<base>.png` regardless of
    /// the encoding, which is what existing consumers of the naming scheme
    /// expect.
    pub match_extension: bool,

    /// Converter for formats the raster codec cannot read (HEIC/HEIF).
    pub normalizer: Option<Arc<dyn FormatNormalizer>>,

    /// Optional stage-level progress callback.
    pub progress_callback: Option<ProgressCallback>,

    /// Reject inputs larger than this many bytes before decoding. Default: 64 MiB.
    pub max_input_bytes: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            output: OutputType::default(),
            origin_policy: OriginPolicy::default(),
            match_extension: false,
            normalizer: None,
            progress_callback: None,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
        }
    }
}

impl fmt::Debug for ScanConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanConfig")
            .field("output", &self.output)
            .field("origin_policy", &self.origin_policy)
            .field("match_extension", &self.match_extension)
            .field(
                "normalizer",
                &self.normalizer.as_ref().map(|_| "<dyn FormatNormalizer>"),
            )
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ScanProgressCallback>"),
            )
            .field("max_input_bytes", &self.max_input_bytes)
            .finish()
    }
}

impl ScanConfig {
    /// Create a new builder for `ScanConfig`.
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ScanConfig`].
#[derive(Debug)]
pub struct ScanConfigBuilder {
    config: ScanConfig,
}

impl ScanConfigBuilder {
    pub fn output(mut self, output: OutputType) -> Self {
        self.config.output = output;
        self
    }

    /// Shorthand for `output(OutputType::Jpeg { quality: Some(q) })`.
    pub fn jpeg(mut self, quality: f32) -> Self {
        self.config.output = OutputType::Jpeg {
            quality: Some(quality),
        };
        self
    }

    pub fn origin_policy(mut self, policy: OriginPolicy) -> Self {
        self.config.origin_policy = policy;
        self
    }

    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.config.origin_policy = self.config.origin_policy.allow(origin);
        self
    }

    pub fn match_extension(mut self, v: bool) -> Self {
        self.config.match_extension = v;
        self
    }

    pub fn normalizer(mut self, normalizer: Arc<dyn FormatNormalizer>) -> Self {
        self.config.normalizer = Some(normalizer);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn max_input_bytes(mut self, n: u64) -> Self {
        self.config.max_input_bytes = n;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ScanConfig, ScanError> {
        let c = &self.config;
        if let OutputType::Jpeg { quality: Some(q) } = c.output {
            if !(q > 0.0 && q <= 1.0) {
                return Err(ScanError::InvalidConfig(format!(
                    "JPEG quality must be in (0, 1], got {q}"
                )));
            }
        }
        if c.max_input_bytes == 0 {
            return Err(ScanError::InvalidConfig(
                "max_input_bytes must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Encoding of the scanned output.
///
/// A closed set: quality only exists on the lossy variant.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum OutputType {
    /// Lossless PNG, alpha preserved. (default)
    #[default]
    Png,
    /// Baseline JPEG. `quality` is in `(0, 1]`; `None` means 0.92.
    Jpeg { quality: Option<f32> },
}

impl OutputType {
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputType::Png => "image/png",
            OutputType::Jpeg { .. } => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputType::Png => "png",
            OutputType::Jpeg { .. } => "jpg",
        }
    }

    /// JPEG quality on the encoder's 1–100 scale. Out-of-range input is
    /// clamped; NaN and infinities fall back to [`DEFAULT_JPEG_QUALITY`].
    pub fn jpeg_quality(&self) -> u8 {
        let q = match self {
            OutputType::Jpeg { quality: Some(q) } if q.is_finite() => *q,
            _ => DEFAULT_JPEG_QUALITY,
        };
        (q * 100.0).round().clamp(1.0, 100.0) as u8
    }

    /// Parse `image/png` / `image/jpeg` (quality left at the default).
    pub fn from_mime_type(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "image/png" => Some(OutputType::Png),
            "image/jpeg" | "image/jpg" => Some(OutputType::Jpeg { quality: None }),
            _ => None,
        }
    }
}

/// Which origins' pixels may be read after decode.
///
/// Files without an origin are same-origin and always readable. A file
/// whose origin is not allowed decodes fine, but reading its pixels fails
/// with [`ScanError::TaintedSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginPolicy {
    allowed: Vec<String>,
    allow_any: bool,
}

impl OriginPolicy {
    /// Only same-origin files are readable. (default)
    pub fn same_origin() -> Self {
        Self::default()
    }

    /// Every origin is readable.
    pub fn allow_any() -> Self {
        Self {
            allowed: Vec::new(),
            allow_any: true,
        }
    }

    /// Add an origin to the allow-list. `*` is equivalent to [`Self::allow_any`].
    pub fn allow(mut self, origin: impl Into<String>) -> Self {
        let origin = normalise_origin(&origin.into());
        if origin == "*" {
            self.allow_any = true;
        } else if !self.allowed.contains(&origin) {
            self.allowed.push(origin);
        }
        self
    }

    /// Whether pixels from `origin` may be read.
    pub fn permits(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(_) if self.allow_any => true,
            Some(o) => {
                let o = normalise_origin(o);
                self.allowed.iter().any(|a| *a == o)
            }
        }
    }
}

/// Lower-case and drop a trailing `/` so `https://A.test/` == `https://a.test`.
fn normalise_origin(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = ScanConfig::default();
        assert_eq!(c.output, OutputType::Png);
        assert!(!c.match_extension);
        assert!(c.normalizer.is_none());
        assert_eq!(c.max_input_bytes, DEFAULT_MAX_INPUT_BYTES);
    }

    #[test]
    fn builder_rejects_bad_quality() {
        for q in [0.0, -0.5, 1.5, f32::NAN] {
            let err = ScanConfig::builder().jpeg(q).build().unwrap_err();
            assert!(matches!(err, ScanError::InvalidConfig(_)), "q={q}");
        }
        assert!(ScanConfig::builder().jpeg(1.0).build().is_ok());
    }

    #[test]
    fn builder_rejects_zero_limit() {
        assert!(ScanConfig::builder().max_input_bytes(0).build().is_err());
    }

    #[test]
    fn jpeg_quality_scale() {
        assert_eq!(OutputType::Jpeg { quality: None }.jpeg_quality(), 92);
        assert_eq!(OutputType::Jpeg { quality: Some(0.5) }.jpeg_quality(), 50);
        assert_eq!(OutputType::Jpeg { quality: Some(0.001) }.jpeg_quality(), 1);
        assert_eq!(OutputType::Png.jpeg_quality(), 92);
        assert_eq!(OutputType::Jpeg { quality: Some(7.0) }.jpeg_quality(), 100);
    }

    #[test]
    fn non_finite_quality_uses_default() {
        // Struct syntax bypasses `build()`, so the encoder side must cope.
        for q in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert_eq!(OutputType::Jpeg { quality: Some(q) }.jpeg_quality(), 92, "q={q}");
        }
    }

    #[test]
    fn output_type_from_mime() {
        assert_eq!(OutputType::from_mime_type("image/png"), Some(OutputType::Png));
        assert_eq!(
            OutputType::from_mime_type("IMAGE/JPEG"),
            Some(OutputType::Jpeg { quality: None })
        );
        assert_eq!(OutputType::from_mime_type("image/webp"), None);
    }

    #[test]
    fn origin_policy_rules() {
        let p = OriginPolicy::same_origin();
        assert!(p.permits(None));
        assert!(!p.permits(Some("https://cdn.example.com")));

        let p = p.allow("https://CDN.example.com/");
        assert!(p.permits(Some("https://cdn.example.com")));
        assert!(!p.permits(Some("https://evil.example.com")));

        let p = OriginPolicy::same_origin().allow("*");
        assert!(p.permits(Some("https://anything.test")));
        assert_eq!(p, OriginPolicy::allow_any());
    }

    #[test]
    fn debug_hides_trait_objects() {
        let dbg = format!("{:?}", ScanConfig::default());
        assert!(dbg.contains("ScanConfig"));
        assert!(dbg.contains("normalizer: None"));
    }
}
