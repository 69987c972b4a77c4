//! Progress-callback trait for pipeline and per-page events.
//!
//! Inject an [`Arc<dyn FlattenProgressCallback>`] via
//! [`crate::config::FlattenConfigBuilder::progress_callback`] to receive
//! events as the pipeline moves through its stages and rasterises each page.
//!
//! # Example
//!
//! ```rust
//! use pdf_flatten::{FlattenConfig, FlattenProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl FlattenProgressCallback for CountingCallback {
//!     fn on_page_rendered(&self, page_num: usize, total_pages: usize, width: u32, height: u32) {
//!         self.rendered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Page {}/{} → {}x{} px", page_num, total_pages, width, height);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { rendered: AtomicUsize::new(0) });
//!
//! let config = FlattenConfig::builder()
//!     .progress_callback(counter as Arc<dyn FlattenProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::pipeline::Stage;
use std::sync::Arc;

/// Called by the flattening pipeline as it runs.
///
/// The pipeline is single-threaded, but implementations must be
/// `Send + Sync` so a config can be shared across threads. All methods have
/// default no-op implementations so callers only override what they care
/// about.
pub trait FlattenProgressCallback: Send + Sync {
    /// Called once the source page count is known, before rasterising.
    fn on_flatten_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called when the pipeline enters a stage.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called after each page is rasterised.
    ///
    /// # Arguments
    /// * `page_num`    — 1-indexed page number
    /// * `total_pages` — total pages in the document
    /// * `width`, `height` — rendered size in pixels
    fn on_page_rendered(&self, page_num: usize, total_pages: usize, width: u32, height: u32) {
        let _ = (page_num, total_pages, width, height);
    }

    /// Called once after the output file is in place.
    fn on_flatten_complete(&self, total_pages: usize) {
        let _ = total_pages;
    }
}

/// A no-op implementation for callers that need a callback value but no
/// progress events. Leaving the config's callback unset has the same effect.
pub struct NoopProgressCallback;

impl FlattenProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::FlattenConfig`].
pub type ProgressCallback = Arc<dyn FlattenProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct TrackingCallback {
        started_total: AtomicUsize,
        rendered: AtomicUsize,
        stages: Mutex<Vec<Stage>>,
        completed_total: AtomicUsize,
    }

    impl FlattenProgressCallback for TrackingCallback {
        fn on_flatten_start(&self, total_pages: usize) {
            self.started_total.store(total_pages, Ordering::SeqCst);
        }

        fn on_stage(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }

        fn on_page_rendered(&self, _page_num: usize, _total: usize, _w: u32, _h: u32) {
            self.rendered.fetch_add(1, Ordering::SeqCst);
        }

        fn on_flatten_complete(&self, total_pages: usize) {
            self.completed_total.store(total_pages, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_flatten_start(5);
        cb.on_stage(Stage::Rasterize);
        cb.on_page_rendered(1, 5, 1700, 2200);
        cb.on_flatten_complete(5);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            started_total: AtomicUsize::new(0),
            rendered: AtomicUsize::new(0),
            stages: Mutex::new(Vec::new()),
            completed_total: AtomicUsize::new(0),
        };

        tracker.on_flatten_start(2);
        tracker.on_stage(Stage::Rasterize);
        tracker.on_page_rendered(1, 2, 10, 10);
        tracker.on_page_rendered(2, 2, 10, 10);
        tracker.on_stage(Stage::Assemble);
        tracker.on_flatten_complete(2);

        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.rendered.load(Ordering::SeqCst), 2);
        assert_eq!(
            *tracker.stages.lock().unwrap(),
            vec![Stage::Rasterize, Stage::Assemble]
        );
        assert_eq!(tracker.completed_total.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn FlattenProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_flatten_start(10);
        cb.on_stage(Stage::Compress);
    }
}
