//! Animated GIF assembly.
//!
//! Reduced frames are written in order with one uniform delay and a
//! NETSCAPE2.0 loop extension requesting infinite repetition. Each frame
//! carries its own local palette.
//!
//! The animation is encoded into memory first and written to disk in one
//! step, so a failed run never leaves a half-written GIF behind.

use std::fs;
use std::path::Path;

use gif::{Encoder, Frame, Repeat};

use crate::config::FrameAdmissionPolicy;
use crate::error::GifcastError;
use crate::frame::ReducedFrame;

/// Frame duration used when the effective frame rate is unknown.
pub const FALLBACK_FRAME_DURATION_MS: u32 = 100;

/// Display duration of one output frame, in milliseconds.
///
/// A fixed stride of `n` divides the native rate by `n`; adaptive admission
/// keeps the native rate. The result is `trunc(1000 / effective_fps)`, or
/// [`FALLBACK_FRAME_DURATION_MS`] when the rate is zero, negative or not
/// finite.
///
/// ```
/// use gifcast::{FrameAdmissionPolicy, frame_duration_ms};
///
/// let every_third = FrameAdmissionPolicy::FixedStride { step: 3 };
/// assert_eq!(frame_duration_ms(30.0, &every_third), 100);
/// assert_eq!(frame_duration_ms(0.0, &every_third), 100);
/// ```
pub fn frame_duration_ms(native_fps: f64, admission: &FrameAdmissionPolicy) -> u32 {
    let effective_fps = match *admission {
        FrameAdmissionPolicy::FixedStride { step } => native_fps / step.max(1) as f64,
        FrameAdmissionPolicy::Adaptive { .. } => native_fps,
    };
    if !effective_fps.is_finite() || effective_fps <= 0.0 {
        return FALLBACK_FRAME_DURATION_MS;
    }
    (1000.0 / effective_fps) as u32
}

/// GIF delays are stored in hundredths of a second; never zero.
pub fn delay_centiseconds(duration_ms: u32) -> u16 {
    let centiseconds = (duration_ms as f64 / 10.0).round();
    centiseconds.clamp(1.0, u16::MAX as f64) as u16
}

/// Encode `frames` into an in-memory GIF.
///
/// # Errors
///
/// - [`GifcastError::EmptySequence`] if `frames` is empty.
/// - [`GifcastError::Encode`] if a frame is larger than 65535 pixels on a
///   side, frames disagree on geometry, or the encoder rejects a frame.
pub fn encode_to_memory(frames: &[ReducedFrame], frame_duration_ms: u32) -> Result<Vec<u8>, GifcastError> {
    let first = frames.first().ok_or(GifcastError::EmptySequence)?;
    let (width, height) = first.dimensions();
    let screen_width = gif_dimension(width)?;
    let screen_height = gif_dimension(height)?;
    let delay = delay_centiseconds(frame_duration_ms);

    log::debug!(
        "Encoding {} frame(s) at {width}x{height}, delay {delay}cs",
        frames.len()
    );

    let mut buffer = Vec::new();
    {
        let mut encoder = Encoder::new(&mut buffer, screen_width, screen_height, &[])
            .map_err(|e| GifcastError::Encode(format!("Failed to create GIF encoder: {e}")))?;
        encoder
            .set_repeat(Repeat::Infinite)
            .map_err(|e| GifcastError::Encode(format!("Failed to set GIF repeat: {e}")))?;

        for frame in frames {
            if frame.dimensions() != (width, height) {
                let (w, h) = frame.dimensions();
                return Err(GifcastError::Encode(format!(
                    "frame {} is {w}x{h}, expected {width}x{height}",
                    frame.index()
                )));
            }

            let (pixels, palette) = indexed(frame)?;
            let palette: Vec<u8> = palette.into_iter().flatten().collect();
            let mut gif_frame = Frame::from_palette_pixels(screen_width, screen_height, pixels, palette, None);
            gif_frame.delay = delay;

            encoder
                .write_frame(&gif_frame)
                .map_err(|e| GifcastError::Encode(format!("Failed to write GIF frame: {e}")))?;
        }
    }

    Ok(buffer)
}

/// Encode `frames` and write the result to `path`.
///
/// If the write fails, whatever reached the disk is removed.
///
/// # Errors
///
/// Everything [`encode_to_memory`] returns. A destination that cannot be
/// written is also reported as [`GifcastError::Encode`].
pub fn write_gif<P: AsRef<Path>>(
    path: P,
    frames: &[ReducedFrame],
    frame_duration_ms: u32,
) -> Result<(), GifcastError> {
    let path = path.as_ref();
    let bytes = encode_to_memory(frames, frame_duration_ms)?;
    log::debug!("Writing {} bytes to {}", bytes.len(), path.display());

    if let Err(error) = fs::write(path, &bytes) {
        if path.exists() {
            let _ = fs::remove_file(path);
        }
        return Err(GifcastError::Encode(format!(
            "failed to write {}: {error}",
            path.display()
        )));
    }
    Ok(())
}

pub(crate) fn gif_dimension(value: u32) -> Result<u16, GifcastError> {
    u16::try_from(value)
        .map_err(|_| GifcastError::Encode(format!("dimension {value} exceeds the GIF limit of 65535")))
}

fn indexed(frame: &ReducedFrame) -> Result<crate::palette::Indexed, GifcastError> {
    match frame {
        ReducedFrame::Indexed { pixels, palette, .. } => Ok((pixels.clone(), palette.clone())),
        ReducedFrame::Rgb { image, .. } => crate::palette::adaptive(image),
    }
}
