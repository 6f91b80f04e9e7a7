//! Result types returned by the scan entry points.

use crate::file::ImageFile;
use crate::pipeline::encode::DataReference;
use serde::Serialize;

/// The scanned image in two forms, plus timing and pixel statistics.
///
/// `file` is for persisting or uploading; `url` can be rendered directly
/// (e.g. as an `<img src>`), with no further I/O.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    pub file: ImageFile,
    pub url: DataReference,
    pub stats: ScanStats,
}

/// Per-scan statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub width: u32,
    pub height: u32,
    /// Pixels classified black.
    pub black_pixels: u64,
    /// Pixels classified white.
    pub white_pixels: u64,
    /// Size of the encoded output file.
    pub output_bytes: usize,
    pub decode_ms: u64,
    pub classify_ms: u64,
    pub encode_ms: u64,
    pub total_ms: u64,
}

impl ScanStats {
    /// Fraction of pixels classified black, in `[0, 1]`. 0 for an empty image.
    pub fn ink_ratio(&self) -> f64 {
        let total = self.black_pixels + self.white_pixels;
        if total == 0 {
            0.0
        } else {
            self.black_pixels as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ink_ratio() {
        let s = ScanStats {
            black_pixels: 1,
            white_pixels: 3,
            ..Default::default()
        };
        assert!((s.ink_ratio() - 0.25).abs() < f64::EPSILON);
        assert_eq!(ScanStats::default().ink_ratio(), 0.0);
    }
}
