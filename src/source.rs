//! Frame acquisition.
//!
//! A [`FrameSource`] is a lazy, finite, forward-only cursor of [`RawFrame`]s.
//! It cannot be rewound; a new pass needs a new source.
//!
//! [`VideoFile`] decodes a container with FFmpeg. It owns the demuxer and
//! decoder for as long as it lives and releases both when dropped, which
//! covers successful runs, errors propagated with `?`, and early returns
//! alike. [`MemorySource`] serves frames already held in memory.
//!
//! # Example
//!
//! ```no_run
//! use gifcast::{FrameSource, VideoFile};
//!
//! let mut source = VideoFile::open("input.mp4")?;
//! println!("{}x{} @ {:.2} fps", source.info().width, source.info().height, source.info().frames_per_second);
//! while let Some(frame) = source.next_frame()? {
//!     println!("frame {}", frame.index);
//! }
//! # Ok::<(), gifcast::GifcastError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use image::RgbImage;

use crate::error::GifcastError;
use crate::frame::RawFrame;
use crate::utilities::{rational_to_fps, rgb_plane_to_buffer};

/// Consecutive demuxer read errors after which the stream is treated as
/// finished.
const MAX_CONSECUTIVE_READ_FAILURES: u32 = 32;

/// Properties of an opened video, read from the container header.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoSource {
    /// Path the source was opened from.
    pub path: PathBuf,
    /// Nominal frames per second; `0.0` when the container does not say.
    pub frames_per_second: f64,
    /// Frame count from the stream header, or estimated from duration × fps.
    pub frame_count: u64,
    /// Native frame width in pixels.
    pub width: u32,
    /// Native frame height in pixels.
    pub height: u32,
    /// Container duration.
    pub duration: Duration,
    /// Codec name (e.g. `"h264"`).
    pub codec: String,
}

/// A sequential producer of decoded frames.
pub trait FrameSource {
    /// Header properties of the source.
    fn info(&self) -> &VideoSource;

    /// Decode the next frame, or `None` at end of stream.
    ///
    /// After `None` has been returned, every further call returns `None`.
    fn next_frame(&mut self) -> Result<Option<RawFrame>, GifcastError>;
}

impl<S: FrameSource + ?Sized> FrameSource for &mut S {
    fn info(&self) -> &VideoSource {
        (**self).info()
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>, GifcastError> {
        (**self).next_frame()
    }
}

/// Pixel-format converter bound to one decoded geometry.
struct PixelConverter {
    context: ScalingContext,
    format: Pixel,
    width: u32,
    height: u32,
}

/// FFmpeg-backed [`FrameSource`] over the best video stream of a file.
pub struct VideoFile {
    input: Input,
    decoder: VideoDecoder,
    stream_index: usize,
    info: VideoSource,
    converter: Option<PixelConverter>,
    decoded: VideoFrame,
    rgb: VideoFrame,
    next_index: u64,
    read_failures: u32,
    eof_sent: bool,
    finished: bool,
}

impl Debug for VideoFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoFile")
            .field("info", &self.info)
            .field("stream_index", &self.stream_index)
            .field("next_index", &self.next_index)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl VideoFile {
    /// Open a video file and prepare a decoder for its best video stream.
    ///
    /// Initializes FFmpeg (idempotent).
    ///
    /// # Errors
    ///
    /// - [`GifcastError::Open`] if the file cannot be opened or its video
    ///   codec is unsupported.
    /// - [`GifcastError::NoVideoStream`] if the container has no video.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, GifcastError> {
        let path = path.as_ref().to_path_buf();
        let open_error = |reason: String| GifcastError::Open {
            path: path.clone(),
            reason,
        };

        log::debug!("Opening video file: {}", path.display());

        ffmpeg_next::init().map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;
        let input = ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or(GifcastError::NoVideoStream)?;
        let stream_index = stream.index();

        let decoder_context = CodecContext::from_parameters(stream.parameters())
            .map_err(|error| open_error(format!("Failed to read codec parameters: {error}")))?;
        let decoder = decoder_context
            .decoder()
            .video()
            .map_err(|error| open_error(format!("Failed to create video decoder: {error}")))?;

        let width = decoder.width();
        let height = decoder.height();
        if width == 0 || height == 0 {
            return Err(open_error(format!("invalid frame size {width}x{height}")));
        }

        let frames_per_second = rational_to_fps(stream.avg_frame_rate())
            .or_else(|| rational_to_fps(stream.rate()))
            .unwrap_or(0.0);

        let duration = if input.duration() > 0 {
            Duration::from_micros(input.duration() as u64)
        } else {
            Duration::ZERO
        };

        let frame_count = if stream.frames() > 0 {
            stream.frames() as u64
        } else {
            (duration.as_secs_f64() * frames_per_second) as u64
        };

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let info = VideoSource {
            path,
            frames_per_second,
            frame_count,
            width,
            height,
            duration,
            codec,
        };
        log::debug!(
            "Video stream {stream_index}: {}x{} @ {:.3} fps, ~{} frames [{}]",
            info.width,
            info.height,
            info.frames_per_second,
            info.frame_count,
            info.codec,
        );

        Ok(Self {
            input,
            decoder,
            stream_index,
            info,
            converter: None,
            decoded: VideoFrame::empty(),
            rgb: VideoFrame::empty(),
            next_index: 0,
            read_failures: 0,
            eof_sent: false,
            finished: false,
        })
    }

    /// Convert the frame currently held in `decoded` to RGB24 at native size.
    ///
    /// The converter is built from the first decoded frame's real pixel
    /// format and rebuilt whenever the decoded geometry changes.
    fn convert_decoded(&mut self) -> Result<RgbImage, GifcastError> {
        let format = self.decoded.format();
        let width = self.decoded.width();
        let height = self.decoded.height();

        let stale = self
            .converter
            .as_ref()
            .is_none_or(|c| c.format != format || c.width != width || c.height != height);
        if stale {
            log::debug!("Creating RGB converter for {format:?} {width}x{height}");
            let context = ScalingContext::get(
                format,
                width,
                height,
                Pixel::RGB24,
                self.info.width,
                self.info.height,
                ScalingFlags::AREA,
            )?;
            self.converter = Some(PixelConverter {
                context,
                format,
                width,
                height,
            });
        }

        if let Some(converter) = self.converter.as_mut() {
            converter.context.run(&self.decoded, &mut self.rgb)?;
        }

        let buffer = rgb_plane_to_buffer(&self.rgb, self.info.width, self.info.height).ok_or_else(|| {
            GifcastError::Decode("converted frame is smaller than the stream geometry".to_string())
        })?;
        RgbImage::from_raw(self.info.width, self.info.height, buffer).ok_or_else(|| {
            GifcastError::Decode("Failed to construct RGB image from decoded frame data".to_string())
        })
    }

    fn finish_input(&mut self) {
        if let Err(error) = self.decoder.send_eof() {
            log::debug!("Decoder rejected end-of-stream: {error}");
        }
        self.eof_sent = true;
    }
}

impl FrameSource for VideoFile {
    fn info(&self) -> &VideoSource {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>, GifcastError> {
        if self.finished {
            return Ok(None);
        }

        loop {
            // Drain whatever the decoder already produced.
            if self.decoder.receive_frame(&mut self.decoded).is_ok() {
                let image = self.convert_decoded()?;
                let frame = RawFrame::new(self.next_index, image);
                self.next_index += 1;
                return Ok(Some(frame));
            }

            if self.eof_sent {
                self.finished = true;
                return Ok(None);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    self.read_failures = 0;
                    if packet.stream() != self.stream_index {
                        continue;
                    }
                    if let Err(error) = self.decoder.send_packet(&packet) {
                        log::warn!("Skipping undecodable packet: {error}");
                    }
                }
                Err(FfmpegError::Eof) => self.finish_input(),
                Err(error) => {
                    self.read_failures += 1;
                    if self.read_failures >= MAX_CONSECUTIVE_READ_FAILURES {
                        log::warn!(
                            "Giving up on {} after {} consecutive read errors (last: {error})",
                            self.info.path.display(),
                            self.read_failures,
                        );
                        self.finish_input();
                    }
                }
            }
        }
    }
}

impl Drop for VideoFile {
    fn drop(&mut self) {
        log::debug!(
            "Releasing decoder for {} after {} frame(s)",
            self.info.path.display(),
            self.next_index,
        );
    }
}

/// [`FrameSource`] over frames already in memory.
///
/// Useful for synthetic input and for driving the pipeline without FFmpeg.
#[derive(Debug)]
pub struct MemorySource {
    info: VideoSource,
    frames: std::vec::IntoIter<RgbImage>,
    next_index: u64,
}

impl MemorySource {
    /// Serve `frames` in order, announcing `frames_per_second`.
    ///
    /// Header width and height are taken from the first frame.
    pub fn new(frames: Vec<RgbImage>, frames_per_second: f64) -> Self {
        let (width, height) = frames.first().map(RgbImage::dimensions).unwrap_or((0, 0));
        let duration = if frames_per_second > 0.0 {
            Duration::from_secs_f64(frames.len() as f64 / frames_per_second)
        } else {
            Duration::ZERO
        };
        let info = VideoSource {
            path: PathBuf::from("<memory>"),
            frames_per_second,
            frame_count: frames.len() as u64,
            width,
            height,
            duration,
            codec: "rawvideo".to_string(),
        };
        Self {
            info,
            frames: frames.into_iter(),
            next_index: 0,
        }
    }
}

impl FrameSource for MemorySource {
    fn info(&self) -> &VideoSource {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<RawFrame>, GifcastError> {
        Ok(self.frames.next().map(|image| {
            let frame = RawFrame::new(self.next_index, image);
            self.next_index += 1;
            frame
        }))
    }
}
