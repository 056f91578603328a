//! # gifcast
//!
//! Turn a video clip into a small, infinitely looping animated GIF.
//!
//! `gifcast` decodes the source with FFmpeg (through
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next)), keeps a subset of
//! the frames, shrinks and color-reduces each kept frame, and writes the
//! result as a GIF whose per-frame delay matches the effective frame rate.
//!
//! ## Quick Start
//!
//! ```no_run
//! use gifcast::{ColorStrategy, Converter, FrameAdmissionPolicy, OutputTarget, ProcessingConfig};
//!
//! let config = ProcessingConfig::new()
//!     .with_admission(FrameAdmissionPolicy::FixedStride { step: 2 })
//!     .with_scale_factor(0.5)
//!     .with_color(ColorStrategy::VectorQuantize { colors: 32 });
//!
//! let converter = Converter::new(config)?;
//! converter.convert("input.mp4", OutputTarget::path("output.gif"))?;
//! # Ok::<(), gifcast::GifcastError>(())
//! ```
//!
//! ## Pipeline
//!
//! 1. **Read**: a [`FrameSource`] yields RGB frames in decode order.
//! 2. **Admit**: the [`MotionGate`] keeps every n-th frame, or only frames
//!    that differ enough from the last kept one.
//! 3. **Scale and reduce**: the [`PipelineOrderer`] runs the [`Scaler`] and
//!    the [`ColorReducer`] in the order picked by [`ProcessingOrder`].
//! 4. **Encode**: kept frames are written as a looping GIF.
//!
//! Every stage is timed into a [`TimingStats`], returned with the
//! [`ConversionReport`] when timing is enabled.
//!
//! ## Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `vector-quantization` (default) | Per-frame k-means color clustering |
//!
//! Without `vector-quantization`, asking for [`ColorStrategy::VectorQuantize`]
//! fails with [`GifcastError::DependencyUnavailable`] before any frame is
//! decoded.
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod frame;
pub mod gif;
#[cfg(feature = "vector-quantization")]
pub mod kmeans;
pub mod motion;
pub mod output;
pub mod palette;
pub mod pipeline;
pub mod progress;
pub mod quantize;
pub mod scale;
pub mod source;
pub mod timing;
mod utilities;

pub use config::{
    ColorStrategy, FAST_PALETTE_COLORS, FrameAdmissionPolicy, MAX_PALETTE_COLORS, PaletteMode,
    ProcessingConfig, ProcessingOrder, Settings,
};
pub use error::GifcastError;
pub use ffmpeg::{FfmpegLogLevel, set_ffmpeg_log_level};
pub use frame::{RawFrame, ReducedFrame};
pub use gif::{FALLBACK_FRAME_DURATION_MS, delay_centiseconds, encode_to_memory, frame_duration_ms, write_gif};
pub use motion::{MotionGate, difference_score};
pub use output::{ConflictPolicy, OutputTarget, default_output_path, resolve_output};
pub use pipeline::{ConversionOutcome, ConversionReport, Converter, PipelineOrderer, RenderedAnimation};
pub use progress::{ProgressCallback, ProgressInfo};
pub use quantize::{ColorReducer, vector_quantization_available};
pub use scale::Scaler;
pub use source::{FrameSource, MemorySource, VideoFile, VideoSource};
pub use timing::{Stage, TimingReport, TimingStats, format_duration};
