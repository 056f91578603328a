//! Geometric resampling.
//!
//! [`Scaler`] resizes frames by a fixed ratio with an area-averaging kernel:
//! every destination pixel is the coverage-weighted mean of the source pixels
//! its footprint overlaps. Both output dimensions are always even, which may
//! discard up to one row or column.

use image::{RgbImage, imageops};

/// Resampler configured once per run.
#[derive(Debug, Clone, Copy)]
pub struct Scaler {
    scale_factor: f64,
}

impl Scaler {
    /// Create a scaler for the given ratio.
    pub fn new(scale_factor: f64) -> Self {
        Self { scale_factor }
    }

    /// The configured ratio.
    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    /// Output dimensions for a `width` x `height` input.
    pub fn target_dimensions(&self, width: u32, height: u32) -> (u32, u32) {
        if self.is_identity() {
            return (even_floor(width), even_floor(height));
        }
        (
            scaled_even(width, self.scale_factor),
            scaled_even(height, self.scale_factor),
        )
    }

    /// Resample `image` to [`target_dimensions`](Scaler::target_dimensions).
    ///
    /// At a ratio of exactly `1.0` nothing is resampled: even-sized input is
    /// returned untouched and odd-sized input loses its last row/column. A
    /// side of a single pixel cannot be cropped to an even size and is
    /// stretched to 2 instead.
    pub fn apply(&self, image: RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        let (target_width, target_height) = self.target_dimensions(width, height);

        if self.is_identity() && target_width <= width && target_height <= height {
            if (target_width, target_height) == (width, height) {
                return image;
            }
            return imageops::crop_imm(&image, 0, 0, target_width, target_height).to_image();
        }

        resample_area(&image, target_width, target_height)
    }

    fn is_identity(&self) -> bool {
        self.scale_factor == 1.0
    }
}

fn even_floor(value: u32) -> u32 {
    (value / 2 * 2).max(2)
}

fn scaled_even(value: u32, scale_factor: f64) -> u32 {
    let scaled = (value as f64 * scale_factor).floor();
    let scaled = if scaled >= u32::MAX as f64 {
        u32::MAX
    } else {
        scaled as u32
    };
    even_floor(scaled)
}

/// Contribution of one source sample to one destination sample.
#[derive(Debug, Clone, Copy)]
struct Tap {
    source: usize,
    weight: f32,
}

/// Box-coverage taps mapping `source_len` samples onto `target_len` samples.
fn area_taps(source_len: u32, target_len: u32) -> Vec<Vec<Tap>> {
    let ratio = source_len as f64 / target_len as f64;
    (0..target_len)
        .map(|out| {
            let start = out as f64 * ratio;
            let end = ((out + 1) as f64 * ratio).min(source_len as f64);
            let first = start.floor() as u32;
            let last = (end.ceil() as u32).min(source_len).max(first + 1);
            let span = end - start;

            (first..last)
                .filter_map(|source| {
                    let lo = (source as f64).max(start);
                    let hi = ((source + 1) as f64).min(end);
                    let overlap = hi - lo;
                    (overlap > 0.0).then(|| Tap {
                        source: source as usize,
                        weight: (overlap / span) as f32,
                    })
                })
                .collect()
        })
        .collect()
}

/// Separable area resample: horizontal pass into a float buffer, then
/// vertical pass with rounding.
fn resample_area(image: &RgbImage, target_width: u32, target_height: u32) -> RgbImage {
    let (width, height) = image.dimensions();
    let source = image.as_raw();
    let horizontal = area_taps(width, target_width);
    let vertical = area_taps(height, target_height);

    let row_len = target_width as usize * 3;
    let mut rows = vec![0f32; row_len * height as usize];
    for y in 0..height as usize {
        let source_row = &source[y * width as usize * 3..(y + 1) * width as usize * 3];
        let out_row = &mut rows[y * row_len..(y + 1) * row_len];
        for (x, taps) in horizontal.iter().enumerate() {
            let mut acc = [0f32; 3];
            for tap in taps {
                let px = &source_row[tap.source * 3..tap.source * 3 + 3];
                acc[0] += px[0] as f32 * tap.weight;
                acc[1] += px[1] as f32 * tap.weight;
                acc[2] += px[2] as f32 * tap.weight;
            }
            out_row[x * 3..x * 3 + 3].copy_from_slice(&acc);
        }
    }

    let mut output = Vec::with_capacity(row_len * target_height as usize);
    for taps in &vertical {
        for column in 0..row_len {
            let value: f32 = taps
                .iter()
                .map(|tap| rows[tap.source * row_len + column] * tap.weight)
                .sum();
            output.push((value + 0.5).clamp(0.0, 255.0) as u8);
        }
    }

    RgbImage::from_raw(target_width, target_height, output).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn dimensions_round_down_to_even() {
        let scaler = Scaler::new(0.5);
        assert_eq!(scaler.target_dimensions(1920, 1080), (960, 540));
        assert_eq!(scaler.target_dimensions(1366, 766), (682, 382));
        assert_eq!(Scaler::new(0.33).target_dimensions(640, 480), (210, 158));
    }

    #[test]
    fn tiny_frames_keep_at_least_two_pixels() {
        assert_eq!(Scaler::new(0.1).target_dimensions(5, 5), (2, 2));
    }

    #[test]
    fn unit_scale_is_a_pass_through_for_even_frames() {
        let mut image = RgbImage::new(6, 4);
        for (x, y, px) in image.enumerate_pixels_mut() {
            *px = Rgb([x as u8 * 40, y as u8 * 60, 7]);
        }
        let output = Scaler::new(1.0).apply(image.clone());
        assert_eq!(output, image);
    }

    #[test]
    fn unit_scale_crops_odd_frames() {
        let image = RgbImage::from_pixel(7, 5, Rgb([1, 2, 3]));
        let output = Scaler::new(1.0).apply(image);
        assert_eq!(output.dimensions(), (6, 4));
        assert!(output.pixels().all(|px| *px == Rgb([1, 2, 3])));
    }

    #[test]
    fn unit_scale_stretches_single_pixel_sides() {
        let image = RgbImage::from_pixel(1, 4, Rgb([9, 8, 7]));
        let output = Scaler::new(1.0).apply(image);
        assert_eq!(output.dimensions(), (2, 4));
        assert!(output.pixels().all(|px| *px == Rgb([9, 8, 7])));
    }

    #[test]
    fn halving_averages_two_by_two_blocks() {
        let mut image = RgbImage::from_pixel(4, 4, Rgb([50, 60, 70]));
        image.put_pixel(0, 0, Rgb([0, 0, 0]));
        image.put_pixel(1, 0, Rgb([100, 100, 100]));
        image.put_pixel(0, 1, Rgb([200, 200, 200]));
        image.put_pixel(1, 1, Rgb([100, 100, 100]));
        let output = Scaler::new(0.5).apply(image);
        assert_eq!(output.dimensions(), (2, 2));
        assert_eq!(output.get_pixel(0, 0), &Rgb([100, 100, 100]));
        assert_eq!(output.get_pixel(1, 0), &Rgb([50, 60, 70]));
        assert_eq!(output.get_pixel(0, 1), &Rgb([50, 60, 70]));
    }

    #[test]
    fn solid_color_survives_resampling() {
        let image = RgbImage::from_pixel(37, 23, Rgb([12, 200, 99]));
        for factor in [0.25, 0.5, 0.75, 1.5] {
            let output = Scaler::new(factor).apply(image.clone());
            assert!(
                output.pixels().all(|px| *px == Rgb([12, 200, 99])),
                "factor {factor} altered a flat color",
            );
            let (w, h) = output.dimensions();
            assert!(w % 2 == 0 && h % 2 == 0);
        }
    }

    #[test]
    fn taps_cover_each_output_fully() {
        for (source, target) in [(10, 4), (7, 3), (3, 8)] {
            for taps in area_taps(source, target) {
                let total: f32 = taps.iter().map(|tap| tap.weight).sum();
                assert!((total - 1.0).abs() < 1e-5);
            }
        }
    }
}
