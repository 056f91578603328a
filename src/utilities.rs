//! Internal helpers shared by the decoder.

use ffmpeg_next::{Rational, frame::Video as VideoFrame};

/// Copy the first plane of a packed RGB24 frame into a tightly-packed buffer.
///
/// FFmpeg rows often carry padding (stride > width × 3); the padding is
/// dropped so the result can be handed to [`image::RgbImage::from_raw`].
/// Returns `None` if the plane is shorter than `width` x `height` pixels.
pub(crate) fn rgb_plane_to_buffer(video_frame: &VideoFrame, width: u32, height: u32) -> Option<Vec<u8>> {
    let stride = video_frame.stride(0);
    let row_len = width as usize * 3;
    let rows = height as usize;
    let data = video_frame.data(0);

    if stride == row_len {
        return data.get(..row_len * rows).map(<[u8]>::to_vec);
    }

    let mut buffer = Vec::with_capacity(row_len * rows);
    for row in 0..rows {
        let start = row * stride;
        buffer.extend_from_slice(data.get(start..start + row_len)?);
    }
    Some(buffer)
}

/// Frames per second from a stream rate, or `None` for an unset rate.
pub(crate) fn rational_to_fps(rate: Rational) -> Option<f64> {
    (rate.numerator() > 0 && rate.denominator() > 0)
        .then(|| rate.numerator() as f64 / rate.denominator() as f64)
}
