//! Color reduction.
//!
//! [`ColorReducer`] applies the run's [`ColorStrategy`] to one frame at a
//! time. Vector quantization keeps the RGB layout and snaps pixels to k-means
//! centroids; palette quantization produces indices plus a palette. The two
//! are never both applied to the same frame.

use image::RgbImage;

use crate::config::{ColorStrategy, PaletteMode};
use crate::error::GifcastError;
use crate::frame::ReducedFrame;
use crate::timing::{Stage, TimingStats};

/// Color reduction stage configured once per run.
#[derive(Debug, Clone, Copy)]
pub struct ColorReducer {
    strategy: ColorStrategy,
}

impl ColorReducer {
    /// Create a reducer for `strategy`.
    ///
    /// # Errors
    ///
    /// Returns [`GifcastError::DependencyUnavailable`] when vector
    /// quantization is requested but the crate was built without the
    /// `vector-quantization` feature.
    pub fn new(strategy: ColorStrategy) -> Result<Self, GifcastError> {
        if matches!(strategy, ColorStrategy::VectorQuantize { .. }) && !vector_quantization_available() {
            return Err(GifcastError::DependencyUnavailable(
                "vector quantization requires building gifcast with the `vector-quantization` feature"
                    .to_string(),
            ));
        }
        Ok(Self { strategy })
    }

    /// The configured strategy.
    pub fn strategy(&self) -> ColorStrategy {
        self.strategy
    }

    /// Cluster `image` with k-means, recording time and pixel count.
    ///
    /// Only meaningful for [`ColorStrategy::VectorQuantize`]; any other
    /// strategy returns the image untouched.
    pub fn vector_quantize(&self, image: RgbImage, stats: &mut TimingStats) -> RgbImage {
        let ColorStrategy::VectorQuantize { colors } = self.strategy else {
            return image;
        };
        stats.clustered_pixels += image.width() as u64 * image.height() as u64;
        stats.time(Stage::VectorQuantize, || cluster(&image, colors as usize))
    }

    /// Build a palette for `image`, recording time.
    ///
    /// # Errors
    ///
    /// Returns [`GifcastError::Encode`] if `image` is too large for a GIF.
    pub fn palette_reduce(
        &self,
        index: u64,
        image: &RgbImage,
        mode: PaletteMode,
        stats: &mut TimingStats,
    ) -> Result<ReducedFrame, GifcastError> {
        let (pixels, palette) = stats.time(Stage::PaletteReduce, || {
            crate::palette::quantize(image, mode)
        })?;
        Ok(ReducedFrame::Indexed {
            index,
            width: image.width(),
            height: image.height(),
            pixels,
            palette,
        })
    }
}

/// Whether k-means clustering is compiled into this build.
pub const fn vector_quantization_available() -> bool {
    cfg!(feature = "vector-quantization")
}

#[cfg(feature = "vector-quantization")]
fn cluster(image: &RgbImage, colors: usize) -> RgbImage {
    crate::kmeans::quantize(image, colors)
}

#[cfg(not(feature = "vector-quantization"))]
fn cluster(image: &RgbImage, _colors: usize) -> RgbImage {
    // Unreachable: `ColorReducer::new` rejects the strategy in this build.
    image.clone()
}
