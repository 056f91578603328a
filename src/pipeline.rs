//! The conversion pipeline.
//!
//! [`Converter`] drives one run end to end: frames are pulled from a
//! [`FrameSource`] one at a time, filtered by the [`MotionGate`], transformed
//! by the [`PipelineOrderer`], collected in order and finally handed to the
//! GIF encoder. Every stage is timed into a [`TimingStats`].
//!
//! # Example
//!
//! ```no_run
//! use gifcast::{ConversionOutcome, Converter, OutputTarget, ProcessingConfig};
//!
//! let converter = Converter::new(ProcessingConfig::new())?;
//! match converter.convert("input.mp4", OutputTarget::path("output.gif"))? {
//!     ConversionOutcome::Completed(report) => {
//!         println!("{} frames, {} ms each", report.frame_count, report.frame_duration_ms);
//!     }
//!     ConversionOutcome::Cancelled => println!("nothing written"),
//! }
//! # Ok::<(), gifcast::GifcastError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::config::{ColorStrategy, PaletteMode, ProcessingConfig, ProcessingOrder};
use crate::error::GifcastError;
use crate::frame::{RawFrame, ReducedFrame};
use crate::gif::{frame_duration_ms, write_gif};
use crate::motion::MotionGate;
use crate::output::OutputTarget;
use crate::progress::{NoOpProgress, ProgressCallback, ProgressTracker};
use crate::quantize::ColorReducer;
use crate::scale::Scaler;
use crate::source::{FrameSource, VideoFile};
use crate::timing::{Stage, TimingStats};

/// Frames between progress notifications unless configured otherwise.
const DEFAULT_PROGRESS_INTERVAL: u64 = 10;

type StageFn =
    fn(&Scaler, &ColorReducer, RawFrame, &mut TimingStats) -> Result<ReducedFrame, GifcastError>;

/// Composition of the scale and color-reduction stages.
///
/// The composition is picked once, when the orderer is built, from the color
/// strategy and the [`ProcessingOrder`]:
///
/// | strategy           | order      | stages                    |
/// |--------------------|------------|---------------------------|
/// | vector quantize    | quality    | quantize, then scale      |
/// | vector quantize    | efficiency | scale, then quantize      |
/// | palette            | either     | scale, then palette       |
#[derive(Clone, Copy)]
pub struct PipelineOrderer {
    scaler: Scaler,
    reducer: ColorReducer,
    stage: StageFn,
    label: &'static str,
}

impl Debug for PipelineOrderer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("PipelineOrderer")
            .field("scaler", &self.scaler)
            .field("reducer", &self.reducer)
            .field("stages", &self.label)
            .finish()
    }
}

impl PipelineOrderer {
    /// Pick the stage composition for this run.
    pub fn new(scaler: Scaler, reducer: ColorReducer, order: ProcessingOrder) -> Self {
        let (stage, label): (StageFn, &'static str) = match (reducer.strategy(), order) {
            (ColorStrategy::VectorQuantize { .. }, ProcessingOrder::Quality) => {
                (quantize_then_scale, "quantize -> scale")
            }
            (ColorStrategy::VectorQuantize { .. }, ProcessingOrder::Efficiency) => {
                (scale_then_quantize, "scale -> quantize")
            }
            (ColorStrategy::Palette(_), _) => (scale_then_palette, "scale -> palette"),
        };
        Self {
            scaler,
            reducer,
            stage,
            label,
        }
    }

    /// Human-readable stage order, e.g. `"scale -> quantize"`.
    pub fn describe(&self) -> &'static str {
        self.label
    }

    /// Run one admitted frame through the composed stages.
    ///
    /// # Errors
    ///
    /// Returns [`GifcastError::Encode`] if the frame cannot be indexed into a
    /// GIF palette.
    pub fn process(
        &self,
        frame: RawFrame,
        stats: &mut TimingStats,
    ) -> Result<ReducedFrame, GifcastError> {
        (self.stage)(&self.scaler, &self.reducer, frame, stats)
    }
}

fn quantize_then_scale(
    scaler: &Scaler,
    reducer: &ColorReducer,
    frame: RawFrame,
    stats: &mut TimingStats,
) -> Result<ReducedFrame, GifcastError> {
    let quantized = reducer.vector_quantize(frame.image, stats);
    let image = stats.time(Stage::Resize, || scaler.apply(quantized));
    Ok(ReducedFrame::Rgb {
        index: frame.index,
        image,
    })
}

fn scale_then_quantize(
    scaler: &Scaler,
    reducer: &ColorReducer,
    frame: RawFrame,
    stats: &mut TimingStats,
) -> Result<ReducedFrame, GifcastError> {
    let scaled = stats.time(Stage::Resize, || scaler.apply(frame.image));
    let image = reducer.vector_quantize(scaled, stats);
    Ok(ReducedFrame::Rgb {
        index: frame.index,
        image,
    })
}

fn scale_then_palette(
    scaler: &Scaler,
    reducer: &ColorReducer,
    frame: RawFrame,
    stats: &mut TimingStats,
) -> Result<ReducedFrame, GifcastError> {
    let mode = match reducer.strategy() {
        ColorStrategy::Palette(mode) => mode,
        ColorStrategy::VectorQuantize { .. } => PaletteMode::Adaptive,
    };
    let scaled = stats.time(Stage::Resize, || scaler.apply(frame.image));
    reducer.palette_reduce(frame.index, &scaled, mode, stats)
}

/// Reduced frames ready for encoding.
#[derive(Debug, Clone)]
pub struct RenderedAnimation {
    /// Admitted frames in source order.
    pub frames: Vec<ReducedFrame>,
    /// Display duration of every frame.
    pub frame_duration_ms: u32,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
}

/// Summary of a completed conversion.
#[derive(Debug, Clone)]
pub struct ConversionReport {
    /// Where the GIF was written.
    pub output_path: PathBuf,
    /// Number of frames in the GIF.
    pub frame_count: usize,
    /// Display duration of every frame.
    pub frame_duration_ms: u32,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Per-stage timing, present when timing was enabled in the config.
    pub timing: Option<TimingStats>,
}

/// Result of [`Converter::convert`].
#[derive(Debug, Clone)]
pub enum ConversionOutcome {
    /// The GIF was written.
    Completed(ConversionReport),
    /// The output target was a cancellation; nothing was read or written.
    Cancelled,
}

/// Runs conversions for one [`ProcessingConfig`].
///
/// The configuration is validated once, in [`Converter::new`]. A converter can
/// be reused for any number of inputs.
pub struct Converter {
    config: ProcessingConfig,
    orderer: PipelineOrderer,
    progress: Arc<dyn ProgressCallback>,
    progress_interval: u64,
}

impl Debug for Converter {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("Converter")
            .field("config", &self.config)
            .field("orderer", &self.orderer)
            .field("progress_interval", &self.progress_interval)
            .finish_non_exhaustive()
    }
}

impl Converter {
    /// Validate `config` and prepare the stages.
    ///
    /// # Errors
    ///
    /// - [`GifcastError::InvalidConfig`] if a value is out of range.
    /// - [`GifcastError::DependencyUnavailable`] if vector quantization is
    ///   requested in a build without it.
    pub fn new(config: ProcessingConfig) -> Result<Self, GifcastError> {
        config.validate()?;
        let reducer = ColorReducer::new(config.color)?;
        let orderer = PipelineOrderer::new(Scaler::new(config.scale_factor), reducer, config.order);
        log::debug!("Pipeline stages: {}", orderer.describe());

        Ok(Self {
            config,
            orderer,
            progress: Arc::new(NoOpProgress),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        })
    }

    /// Register a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Notify the progress callback every `frames` decoded frames.
    #[must_use]
    pub fn with_progress_interval(mut self, frames: u64) -> Self {
        self.progress_interval = frames.max(1);
        self
    }

    /// The validated configuration.
    pub fn config(&self) -> &ProcessingConfig {
        &self.config
    }

    /// The stage composition in use.
    pub fn orderer(&self) -> &PipelineOrderer {
        &self.orderer
    }

    /// Convert the video at `input` into a GIF at `target`.
    ///
    /// A cancelled target returns [`ConversionOutcome::Cancelled`] without
    /// opening the input.
    ///
    /// # Errors
    ///
    /// Any error from opening, decoding or encoding. See
    /// [`Converter::convert_source`].
    pub fn convert<P: AsRef<Path>>(
        &self,
        input: P,
        target: OutputTarget,
    ) -> Result<ConversionOutcome, GifcastError> {
        if target.is_cancelled() {
            log::debug!("Output cancelled; skipping {}", input.as_ref().display());
            return Ok(ConversionOutcome::Cancelled);
        }
        let source = VideoFile::open(input)?;
        self.convert_source(source, target)
    }

    /// Convert frames from an already-open `source`.
    ///
    /// Nothing touches the output path until every frame has been processed.
    ///
    /// # Errors
    ///
    /// - [`GifcastError::EmptyStream`] if the source yields no frame.
    /// - [`GifcastError::EmptySequence`] if no frame is admitted.
    /// - [`GifcastError::Encode`] if the GIF cannot be produced or written.
    pub fn convert_source<S: FrameSource>(
        &self,
        source: S,
        target: OutputTarget,
    ) -> Result<ConversionOutcome, GifcastError> {
        let OutputTarget::Path(output_path) = target else {
            return Ok(ConversionOutcome::Cancelled);
        };

        let started = Instant::now();
        let mut stats = TimingStats::new();
        let animation = self.render(source, &mut stats)?;

        stats.time(Stage::Encode, || {
            write_gif(&output_path, &animation.frames, animation.frame_duration_ms)
        })?;
        stats.set_total(started.elapsed());

        log::debug!(
            "Wrote {} frame(s) to {}\n{}",
            animation.frames.len(),
            output_path.display(),
            stats.report()
        );

        Ok(ConversionOutcome::Completed(ConversionReport {
            output_path,
            frame_count: animation.frames.len(),
            frame_duration_ms: animation.frame_duration_ms,
            width: animation.width,
            height: animation.height,
            timing: self.config.time_logging.then_some(stats),
        }))
    }

    /// Decode, admit and reduce every frame of `source`, without encoding.
    ///
    /// # Errors
    ///
    /// - [`GifcastError::EmptyStream`] if the source yields no frame.
    /// - [`GifcastError::EmptySequence`] if no frame is admitted.
    /// - Any decoding error from the source.
    pub fn render<S: FrameSource>(
        &self,
        mut source: S,
        stats: &mut TimingStats,
    ) -> Result<RenderedAnimation, GifcastError> {
        let info = source.info().clone();
        let mut gate = MotionGate::new(self.config.admission);
        let mut tracker = ProgressTracker::new(
            self.progress.clone(),
            Some(info.frame_count),
            self.progress_interval,
        );
        let mut frames = Vec::new();
        let mut read = 0u64;

        while let Some(frame) = stats.time(Stage::Read, || source.next_frame())? {
            read += 1;
            stats.frames_read += 1;

            let admitted = stats.time(Stage::MotionGate, || gate.admit(&frame));
            tracker.advance(admitted);
            if !admitted {
                continue;
            }
            stats.frames_admitted += 1;
            frames.push(self.orderer.process(frame, stats)?);
        }
        tracker.finish();

        if read == 0 {
            return Err(GifcastError::EmptyStream);
        }
        let (width, height) = frames
            .first()
            .map(ReducedFrame::dimensions)
            .ok_or(GifcastError::EmptySequence)?;

        log::debug!(
            "Admitted {} of {read} frame(s) from {}",
            frames.len(),
            info.path.display()
        );

        Ok(RenderedAnimation {
            frames,
            frame_duration_ms: frame_duration_ms(info.frames_per_second, &self.config.admission),
            width,
            height,
        })
    }
}
