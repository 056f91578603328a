//! Frame types flowing through the pipeline.
//!
//! A [`RawFrame`] is what a [`FrameSource`](crate::FrameSource) yields: an
//! RGB8 image tagged with its position in the source. A [`ReducedFrame`] is
//! what the color-reduction stage produces and what the encoder consumes.

use image::{GrayImage, RgbImage};

/// A decoded RGB8 frame and its 0-based sequence index in the source.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Position of the frame in decode order.
    pub index: u64,
    /// Interleaved RGB8 pixels.
    pub image: RgbImage,
}

impl RawFrame {
    /// Wrap an image with its sequence index.
    pub fn new(index: u64, image: RgbImage) -> Self {
        Self { index, image }
    }

    /// Grayscale representation using BT.601 luma weights.
    pub fn to_gray(&self) -> GrayImage {
        to_gray(&self.image)
    }
}

/// A frame after color reduction.
#[derive(Debug, Clone, PartialEq)]
pub enum ReducedFrame {
    /// Full RGB buffer whose colors were snapped to cluster centroids.
    Rgb {
        /// Source sequence index.
        index: u64,
        /// Reduced pixels.
        image: RgbImage,
    },
    /// Palette indices plus the palette they refer to.
    Indexed {
        /// Source sequence index.
        index: u64,
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// One palette index per pixel, row-major.
        pixels: Vec<u8>,
        /// Palette entries (at most 256).
        palette: Vec<[u8; 3]>,
    },
}

impl ReducedFrame {
    /// Source sequence index of this frame.
    pub fn index(&self) -> u64 {
        match self {
            ReducedFrame::Rgb { index, .. } | ReducedFrame::Indexed { index, .. } => *index,
        }
    }

    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            ReducedFrame::Rgb { image, .. } => image.dimensions(),
            ReducedFrame::Indexed { width, height, .. } => (*width, *height),
        }
    }

    /// Expand to an RGB image, resolving palette indices if needed.
    pub fn to_rgb(&self) -> RgbImage {
        match self {
            ReducedFrame::Rgb { image, .. } => image.clone(),
            ReducedFrame::Indexed {
                width,
                height,
                pixels,
                palette,
                ..
            } => {
                let mut buffer = Vec::with_capacity(pixels.len() * 3);
                for &entry in pixels {
                    buffer.extend_from_slice(&palette[entry as usize]);
                }
                // Length is width * height * 3 by construction.
                RgbImage::from_raw(*width, *height, buffer).unwrap_or_default()
            }
        }
    }
}

/// BT.601 luma with the same 14-bit fixed-point weights common video tooling
/// uses for RGB to gray conversion.
pub(crate) fn to_gray(image: &RgbImage) -> GrayImage {
    const R_WEIGHT: u32 = 4899;
    const G_WEIGHT: u32 = 9617;
    const B_WEIGHT: u32 = 1868;
    const ROUND: u32 = 1 << 13;

    let (width, height) = image.dimensions();
    let luma: Vec<u8> = image
        .as_raw()
        .chunks_exact(3)
        .map(|px| {
            let y = (px[0] as u32 * R_WEIGHT + px[1] as u32 * G_WEIGHT + px[2] as u32 * B_WEIGHT
                + ROUND)
                >> 14;
            y.min(255) as u8
        })
        .collect();
    GrayImage::from_raw(width, height, luma).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn gray_of_primaries_matches_bt601() {
        let mut image = RgbImage::new(3, 1);
        image.put_pixel(0, 0, Rgb([255, 0, 0]));
        image.put_pixel(1, 0, Rgb([0, 255, 0]));
        image.put_pixel(2, 0, Rgb([0, 0, 255]));
        let gray = to_gray(&image);
        assert_eq!(gray.as_raw(), &vec![76, 150, 29]);
    }

    #[test]
    fn white_stays_white() {
        let image = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        assert!(to_gray(&image).as_raw().iter().all(|&v| v == 255));
    }

    #[test]
    fn indexed_frame_expands_through_palette() {
        let frame = ReducedFrame::Indexed {
            index: 7,
            width: 2,
            height: 1,
            pixels: vec![1, 0],
            palette: vec![[10, 20, 30], [40, 50, 60]],
        };
        assert_eq!(frame.index(), 7);
        assert_eq!(frame.to_rgb().as_raw(), &vec![40, 50, 60, 10, 20, 30]);
    }
}
