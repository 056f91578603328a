//! Frame admission.
//!
//! [`MotionGate`] decides, frame by frame, whether a decoded frame makes it
//! into the output animation. Under [`FrameAdmissionPolicy::FixedStride`] the
//! decision depends only on the sequence index. Under
//! [`FrameAdmissionPolicy::Adaptive`] every candidate is compared against the
//! *last admitted* frame (not the previous decoded one), so a near-static
//! stretch can be skipped for any number of consecutive frames.

use image::GrayImage;

use crate::config::FrameAdmissionPolicy;
use crate::frame::RawFrame;

/// Stateful admission filter for one run.
#[derive(Debug)]
pub struct MotionGate {
    policy: FrameAdmissionPolicy,
    /// Grayscale form of the last admitted frame (adaptive mode only).
    retained: Option<GrayImage>,
}

impl MotionGate {
    /// Create a gate for the given policy.
    pub fn new(policy: FrameAdmissionPolicy) -> Self {
        Self {
            policy,
            retained: None,
        }
    }

    /// Decide whether `frame` is admitted, updating the retained baseline when
    /// it is.
    pub fn admit(&mut self, frame: &RawFrame) -> bool {
        match self.policy {
            FrameAdmissionPolicy::FixedStride { step } => frame.index % step.max(1) as u64 == 0,
            FrameAdmissionPolicy::Adaptive { motion_threshold } => {
                let gray = frame.to_gray();
                let admitted = match &self.retained {
                    None => true,
                    Some(previous) => difference_score(previous, &gray) >= motion_threshold,
                };
                if admitted {
                    self.retained = Some(gray);
                }
                admitted
            }
        }
    }
}

/// Mean over all pixels of the squared absolute grayscale difference.
///
/// Frames of different geometry are treated as maximally different.
pub fn difference_score(previous: &GrayImage, current: &GrayImage) -> f64 {
    if previous.dimensions() != current.dimensions() {
        return f64::INFINITY;
    }
    let count = previous.as_raw().len();
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = previous
        .as_raw()
        .iter()
        .zip(current.as_raw())
        .map(|(&a, &b)| {
            let diff = a.abs_diff(b) as u64;
            diff * diff
        })
        .sum();
    sum as f64 / count as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    fn solid(index: u64, value: u8) -> RawFrame {
        RawFrame::new(index, RgbImage::from_pixel(4, 4, Rgb([value, value, value])))
    }

    #[test]
    fn fixed_stride_keeps_multiples_of_step() {
        let mut gate = MotionGate::new(FrameAdmissionPolicy::FixedStride { step: 3 });
        let admitted: Vec<u64> = (0..10)
            .map(|i| solid(i, 0))
            .filter(|frame| gate.admit(frame))
            .map(|frame| frame.index)
            .collect();
        assert_eq!(admitted, vec![0, 3, 6, 9]);
    }

    #[test]
    fn adaptive_compares_against_last_admitted_frame() {
        // Each frame drifts by 2 levels; a threshold of 10 needs a drift of
        // at least 4 levels (4^2 = 16) from the last admitted frame.
        let mut gate = MotionGate::new(FrameAdmissionPolicy::Adaptive {
            motion_threshold: 10.0,
        });
        let admitted: Vec<u64> = (0..7)
            .map(|i| solid(i, (i * 2) as u8))
            .filter(|frame| gate.admit(frame))
            .map(|frame| frame.index)
            .collect();
        assert_eq!(admitted, vec![0, 2, 4, 6]);
    }

    #[test]
    fn zero_threshold_admits_everything() {
        let mut gate = MotionGate::new(FrameAdmissionPolicy::Adaptive {
            motion_threshold: 0.0,
        });
        assert!((0..5).map(|i| solid(i, 100)).all(|frame| gate.admit(&frame)));
    }

    #[test]
    fn score_squares_absolute_differences() {
        let a = GrayImage::from_pixel(2, 1, Luma([10]));
        let mut b = GrayImage::from_pixel(2, 1, Luma([10]));
        b.put_pixel(0, 0, Luma([4]));
        // (6^2 + 0^2) / 2
        assert_eq!(difference_score(&a, &b), 18.0);
        assert_eq!(difference_score(&b, &a), 18.0);
    }

    #[test]
    fn score_is_bounded_by_full_range() {
        let black = GrayImage::from_pixel(3, 3, Luma([0]));
        let white = GrayImage::from_pixel(3, 3, Luma([255]));
        assert_eq!(difference_score(&black, &white), 65025.0);
    }
}
