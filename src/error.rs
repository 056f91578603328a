//! Error types for the `gifcast` crate.
//!
//! This module defines [`GifcastError`], the unified error type returned by
//! every fallible operation in the crate. Every variant is terminal for the
//! run that produced it: the pipeline never retries a stage.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use thiserror::Error;

/// The unified error type for all `gifcast` operations.
///
/// Variants carry enough context to explain the failure without additional
/// logging at the call site.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GifcastError {
    /// The source video could not be opened or is not a supported container.
    #[error("Failed to open video file at {path}: {reason}")]
    Open {
        /// Path that was passed to [`crate::VideoFile::open`].
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The container does not hold a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A stage was requested whose runtime support is not compiled in.
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// The source produced no decodable frames at all.
    #[error("No frames could be decoded from the source")]
    EmptyStream,

    /// Frames were decoded but the motion gate admitted none of them.
    #[error("No frames were admitted for encoding")]
    EmptySequence,

    /// The output animation could not be produced or written.
    #[error("GIF encoding error: {0}")]
    Encode(String),

    /// A configuration value is outside its valid range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A settings file could not be read or parsed.
    #[error("Invalid settings file: {0}")]
    Settings(String),

    /// A decoded frame could not be converted to an RGB buffer.
    #[error("Failed to decode video frame: {0}")]
    Decode(String),

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}

impl From<FfmpegError> for GifcastError {
    fn from(error: FfmpegError) -> Self {
        GifcastError::Ffmpeg(error.to_string())
    }
}
