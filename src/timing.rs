//! Per-stage wall-clock accounting.
//!
//! [`TimingStats`] is threaded through a conversion as a `&mut` borrow. Every
//! stage transition is wrapped by [`TimingStats::time`], which adds the
//! elapsed time to that stage's running total. After the run the value is
//! read-only and can be rendered with [`TimingStats::report`].

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::{Duration, Instant};

/// A timed pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Pulling the next frame from the source.
    Read,
    /// Geometric resampling.
    Resize,
    /// Admission decision.
    MotionGate,
    /// K-means color clustering.
    VectorQuantize,
    /// Palette construction and index mapping.
    PaletteReduce,
    /// GIF assembly and file write.
    Encode,
}

impl Stage {
    /// Every stage, in pipeline order.
    pub const ALL: [Stage; 6] = [
        Stage::Read,
        Stage::Resize,
        Stage::MotionGate,
        Stage::VectorQuantize,
        Stage::PaletteReduce,
        Stage::Encode,
    ];

    /// Short human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Stage::Read => "read",
            Stage::Resize => "resize",
            Stage::MotionGate => "motion-gate",
            Stage::VectorQuantize => "vector-quantize",
            Stage::PaletteReduce => "palette-reduce",
            Stage::Encode => "encode",
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

/// Cumulative stage durations and frame counters for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimingStats {
    stages: [Duration; 6],
    total: Duration,
    /// Frames pulled from the source.
    pub frames_read: u64,
    /// Frames the motion gate let through.
    pub frames_admitted: u64,
    /// Pixels submitted to k-means clustering, summed over all frames.
    pub clustered_pixels: u64,
}

impl TimingStats {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `operation` and add its wall-clock time to `stage`.
    pub fn time<T>(&mut self, stage: Stage, operation: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = operation();
        self.record(stage, start.elapsed());
        result
    }

    /// Add `elapsed` to the running total of `stage`.
    pub fn record(&mut self, stage: Stage, elapsed: Duration) {
        self.stages[stage.slot()] += elapsed;
    }

    /// Set the wall-clock time of the whole run.
    pub(crate) fn set_total(&mut self, total: Duration) {
        self.total = total;
    }

    /// Cumulative time spent in `stage`.
    pub fn stage(&self, stage: Stage) -> Duration {
        self.stages[stage.slot()]
    }

    /// Wall-clock time of the whole run.
    ///
    /// Falls back to the sum of all stages when the run total was never set.
    pub fn total(&self) -> Duration {
        if self.total.is_zero() {
            self.stages.iter().sum()
        } else {
            self.total
        }
    }

    /// Share of the total run time spent in `stage`, in percent.
    pub fn percentage(&self, stage: Stage) -> f64 {
        let total = self.total().as_secs_f64();
        if total > 0.0 {
            self.stage(stage).as_secs_f64() / total * 100.0
        } else {
            0.0
        }
    }

    /// Admitted frames per second of wall time.
    pub fn throughput(&self) -> f64 {
        let total = self.total().as_secs_f64();
        if total > 0.0 {
            self.frames_admitted as f64 / total
        } else {
            0.0
        }
    }

    /// Average time spent on one admitted frame.
    pub fn per_frame(&self) -> Option<Duration> {
        (self.frames_admitted > 0).then(|| self.total().div_f64(self.frames_admitted as f64))
    }

    /// Human-readable report.
    pub fn report(&self) -> TimingReport<'_> {
        TimingReport { stats: self }
    }
}

/// Display adapter returned by [`TimingStats::report`].
///
/// Stages that never ran are omitted.
pub struct TimingReport<'a> {
    stats: &'a TimingStats,
}

impl Display for TimingReport<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let stats = self.stats;
        writeln!(f, "frames read:     {}", stats.frames_read)?;
        writeln!(f, "frames admitted: {}", stats.frames_admitted)?;
        writeln!(f, "total:           {}", format_duration(stats.total()))?;
        for stage in Stage::ALL {
            let elapsed = stats.stage(stage);
            if elapsed.is_zero() {
                continue;
            }
            writeln!(
                f,
                "  {:<16} {:>9} ({:.1}%)",
                stage.label(),
                format_duration(elapsed),
                stats.percentage(stage)
            )?;
        }
        if let Some(per_frame) = stats.per_frame() {
            writeln!(f, "per frame:       {}", format_duration(per_frame))?;
        }
        write!(f, "throughput:      {:.1} fps", stats.throughput())
    }
}

/// Format a duration as microseconds, milliseconds or seconds.
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs_f64();
    if seconds < 0.001 {
        format!("{:.0}µs", seconds * 1_000_000.0)
    } else if seconds < 1.0 {
        format!("{:.1}ms", seconds * 1_000.0)
    } else {
        format!("{seconds:.2}s")
    }
}
