//! Progress-callback trait for per-stage scan events.
//!
//! Inject an [`Arc<dyn ScanProgressCallback>`] via
//! [`crate::config::ScanConfigBuilder::progress_callback`] to be told when a
//! scan starts, when the image is decoded, when the output is encoded and
//! when the scan finishes or fails.
//!
//! # Example
//!
//! ```rust
//! use edgequake_docscan::{ScanConfig, ScanProgressCallback};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ScanProgressCallback for Printer {
//!     fn on_decoded(&self, width: u32, height: u32) {
//!         eprintln!("decoded {width}x{height}");
//!     }
//! }
//!
//! let config = ScanConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn ScanProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the scan pipeline at each stage boundary.
///
/// Implementations must be `Send + Sync`: independent scans may run on
/// different tasks and share one callback. All methods default to no-ops.
pub trait ScanProgressCallback: Send + Sync {
    /// Called once before decoding starts.
    fn on_scan_start(&self, name: &str) {
        let _ = name;
    }

    /// Called after the pixel buffer is available.
    fn on_decoded(&self, width: u32, height: u32) {
        let _ = (width, height);
    }

    /// Called after the binarized buffer is re-encoded.
    fn on_encoded(&self, bytes: usize) {
        let _ = bytes;
    }

    /// Called once after the data reference is built.
    ///
    /// # Arguments
    /// * `output_name`: name of the produced file, e.g. `scanned_receipt.png`
    fn on_scan_complete(&self, output_name: &str) {
        let _ = output_name;
    }

    /// Called once when the scan fails, before the error is returned.
    fn on_scan_error(&self, error: &str) {
        let _ = error;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ScanProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ScanConfig`].
pub type ProgressCallback = Arc<dyn ScanProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        events: Mutex<Vec<String>>,
        errors: AtomicUsize,
    }

    impl ScanProgressCallback for TrackingCallback {
        fn on_scan_start(&self, name: &str) {
            self.events.lock().unwrap().push(format!("start:{name}"));
        }

        fn on_decoded(&self, width: u32, height: u32) {
            self.events
                .lock()
                .unwrap()
                .push(format!("decoded:{width}x{height}"));
        }

        fn on_scan_error(&self, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_scan_start("a.png");
        cb.on_decoded(1, 1);
        cb.on_encoded(10);
        cb.on_scan_complete("scanned_a.png");
        cb.on_scan_error("boom");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let t = TrackingCallback::default();
        t.on_scan_start("a.png");
        t.on_decoded(4, 3);
        t.on_encoded(99); // default no-op
        t.on_scan_error("x");
        assert_eq!(
            *t.events.lock().unwrap(),
            vec!["start:a.png".to_string(), "decoded:4x3".to_string()]
        );
        assert_eq!(t.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_scan_start("x");
    }
}
