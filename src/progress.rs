//! Progress reporting.
//!
//! A [`ProgressCallback`] observes a conversion while frames are read. Callbacks
//! are infallible and cannot stop the run; a conversion either completes or
//! fails.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use gifcast::{Converter, OutputTarget, ProcessingConfig, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("{pct:.1}% ({} kept)", info.frames_admitted);
//!         }
//!     }
//! }
//!
//! let converter = Converter::new(ProcessingConfig::new())?
//!     .with_progress(Arc::new(PrintProgress));
//! converter.convert("input.mp4", OutputTarget::path("output.gif"))?;
//! # Ok::<(), gifcast::GifcastError>(())
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// A snapshot of conversion progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Frames pulled from the source so far.
    pub frames_read: u64,
    /// Frames admitted so far.
    pub frames_admitted: u64,
    /// Frame count announced by the container, if known.
    pub total_frames: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total_frames` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on read throughput so far.
    pub estimated_remaining: Option<Duration>,
}

/// Receives progress updates during a conversion.
pub trait ProgressCallback: Send + Sync {
    /// Called every `batch_size` frames and once when reading finishes.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks counters and fires the callback at the configured cadence.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total: Option<u64>,
    read: u64,
    admitted: u64,
    batch_size: u64,
    start_time: Instant,
    since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(callback: Arc<dyn ProgressCallback>, total: Option<u64>, batch_size: u64) -> Self {
        Self {
            callback,
            total: total.filter(|&t| t > 0),
            read: 0,
            admitted: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            since_last_report: 0,
        }
    }

    /// Record one read frame and whether it was admitted.
    pub(crate) fn advance(&mut self, admitted: bool) {
        self.read += 1;
        if admitted {
            self.admitted += 1;
        }
        self.since_last_report += 1;
        if self.since_last_report >= self.batch_size {
            self.report();
            self.since_last_report = 0;
        }
    }

    /// Emit a final report unconditionally.
    pub(crate) fn finish(&mut self) {
        self.report();
    }

    fn report(&self) {
        let elapsed = self.start_time.elapsed();

        // Header frame counts are estimates; never report past 100%.
        let percentage = self
            .total
            .map(|t| ((self.read as f32 / t as f32) * 100.0).min(100.0));

        let estimated_remaining = if self.read > 0 {
            self.total.map(|t| {
                let remaining = t.saturating_sub(self.read);
                elapsed.mul_f64(remaining as f64 / self.read as f64)
            })
        } else {
            None
        };

        self.callback.on_progress(&ProgressInfo {
            frames_read: self.read,
            frames_admitted: self.admitted,
            total_frames: self.total,
            percentage,
            elapsed,
            estimated_remaining,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(u64, u64)>>,
    }

    impl ProgressCallback for Recorder {
        fn on_progress(&self, info: &ProgressInfo) {
            self.seen
                .lock()
                .unwrap()
                .push((info.frames_read, info.frames_admitted));
        }
    }

    #[test]
    fn reports_every_batch_and_on_finish() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker = ProgressTracker::new(recorder.clone(), Some(5), 2);
        for i in 0..5 {
            tracker.advance(i % 2 == 0);
        }
        tracker.finish();
        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![(2, 1), (4, 2), (5, 3)]);
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker = ProgressTracker::new(recorder.clone(), None, 0);
        tracker.advance(true);
        assert_eq!(recorder.seen.lock().unwrap().len(), 1);
    }
}
