//! Conversion configuration.
//!
//! [`ProcessingConfig`] is the typed, validated description of one conversion
//! run. The two mutually exclusive toggles of the pipeline are modelled as sum
//! types ([`FrameAdmissionPolicy`] and [`ColorStrategy`]) so that, for
//! example, both color strategies can never be active at once.
//!
//! [`Settings`] is the flat shape produced by a settings dialog or a JSON
//! settings file. It keeps the boolean-flag vocabulary of that surface and is
//! folded into a [`ProcessingConfig`] with [`TryFrom`].
//!
//! # Example
//!
//! ```
//! use gifcast::{ColorStrategy, FrameAdmissionPolicy, ProcessingConfig, ProcessingOrder};
//!
//! let config = ProcessingConfig::new()
//!     .with_admission(FrameAdmissionPolicy::FixedStride { step: 3 })
//!     .with_scale_factor(0.5)
//!     .with_color(ColorStrategy::VectorQuantize { colors: 32 })
//!     .with_order(ProcessingOrder::Quality);
//!
//! assert!(config.validate().is_ok());
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GifcastError;

/// Number of palette entries used by [`PaletteMode::Fast`].
pub const FAST_PALETTE_COLORS: usize = 32;

/// Largest palette a GIF frame can carry.
pub const MAX_PALETTE_COLORS: usize = 256;

/// Which decoded frames are kept for the output animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameAdmissionPolicy {
    /// Keep frame `i` iff `i % step == 0`.
    FixedStride {
        /// Stride between kept frames; `1` keeps every frame.
        step: u32,
    },
    /// Keep a frame when it differs enough from the last kept frame.
    ///
    /// The first frame is always kept. A threshold of `0.0` keeps every
    /// frame.
    Adaptive {
        /// Minimum difference score for admission.
        motion_threshold: f64,
    },
}

impl Default for FrameAdmissionPolicy {
    fn default() -> Self {
        FrameAdmissionPolicy::FixedStride { step: 1 }
    }
}

/// How a palette is built when vector quantization is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PaletteMode {
    /// Fixed 32-color budget built with an octree.
    Fast,
    /// Palette sized to the frame's color diversity (at most 256 entries).
    #[default]
    Adaptive,
}

/// The color reduction applied to every admitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorStrategy {
    /// Per-frame mini-batch k-means clustering into `colors` centroids.
    VectorQuantize {
        /// Number of clusters (1..=256).
        colors: u16,
    },
    /// Indexed-color palette quantization.
    Palette(PaletteMode),
}

impl Default for ColorStrategy {
    fn default() -> Self {
        ColorStrategy::Palette(PaletteMode::Adaptive)
    }
}

/// Relative order of the scale and color-reduction stages.
///
/// Only matters for [`ColorStrategy::VectorQuantize`]; palette quantization
/// always runs after scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingOrder {
    /// Scale first, then cluster the smaller buffer.
    #[default]
    Efficiency,
    /// Cluster at native resolution, then scale the reduced frame.
    Quality,
}

impl Display for ProcessingOrder {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ProcessingOrder::Efficiency => f.write_str("efficiency"),
            ProcessingOrder::Quality => f.write_str("quality"),
        }
    }
}

impl FromStr for ProcessingOrder {
    type Err = GifcastError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "efficiency" | "fast" => Ok(ProcessingOrder::Efficiency),
            "quality" => Ok(ProcessingOrder::Quality),
            other => Err(GifcastError::InvalidConfig(format!(
                "unknown processing order `{other}` (expected efficiency or quality)"
            ))),
        }
    }
}

/// Typed configuration for one conversion run.
///
/// Supplied once per run and never mutated by the pipeline. Use the `with_*`
/// builder methods, or convert a [`Settings`] value.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingConfig {
    /// Frame admission policy.
    pub admission: FrameAdmissionPolicy,
    /// Resampling ratio applied by the scaler.
    pub scale_factor: f64,
    /// Color reduction strategy.
    pub color: ColorStrategy,
    /// Stage ordering for vector quantization.
    pub order: ProcessingOrder,
    /// Whether per-stage timing is returned with the conversion report.
    pub time_logging: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            admission: FrameAdmissionPolicy::default(),
            scale_factor: 0.5,
            color: ColorStrategy::default(),
            order: ProcessingOrder::default(),
            time_logging: true,
        }
    }
}

impl ProcessingConfig {
    /// Create a configuration with default settings.
    ///
    /// Defaults: every frame, half size, adaptive palette, efficiency order,
    /// timing enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the frame admission policy.
    #[must_use]
    pub fn with_admission(mut self, admission: FrameAdmissionPolicy) -> Self {
        self.admission = admission;
        self
    }

    /// Set the resampling ratio.
    #[must_use]
    pub fn with_scale_factor(mut self, scale_factor: f64) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    /// Set the color reduction strategy.
    #[must_use]
    pub fn with_color(mut self, color: ColorStrategy) -> Self {
        self.color = color;
        self
    }

    /// Set the stage order.
    #[must_use]
    pub fn with_order(mut self, order: ProcessingOrder) -> Self {
        self.order = order;
        self
    }

    /// Enable or disable the timing report.
    #[must_use]
    pub fn with_time_logging(mut self, enabled: bool) -> Self {
        self.time_logging = enabled;
        self
    }

    /// Check every value against its valid range.
    ///
    /// # Errors
    ///
    /// Returns [`GifcastError::InvalidConfig`] describing the first offending
    /// value.
    pub fn validate(&self) -> Result<(), GifcastError> {
        match self.admission {
            FrameAdmissionPolicy::FixedStride { step: 0 } => {
                return Err(GifcastError::InvalidConfig(
                    "frame_step must be greater than zero".to_string(),
                ));
            }
            FrameAdmissionPolicy::Adaptive { motion_threshold }
                if !motion_threshold.is_finite() || motion_threshold < 0.0 =>
            {
                return Err(GifcastError::InvalidConfig(format!(
                    "motion_threshold must be a non-negative number, got {motion_threshold}"
                )));
            }
            _ => {}
        }

        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(GifcastError::InvalidConfig(format!(
                "scale_factor must be a positive number, got {}",
                self.scale_factor
            )));
        }

        if let ColorStrategy::VectorQuantize { colors } = self.color {
            if colors == 0 || colors as usize > MAX_PALETTE_COLORS {
                return Err(GifcastError::InvalidConfig(format!(
                    "vector_colors must be between 1 and {MAX_PALETTE_COLORS}, got {colors}"
                )));
            }
        }

        Ok(())
    }
}

/// Flat settings as produced by a settings dialog or JSON file.
///
/// Missing keys take their default values. Convert with
/// `ProcessingConfig::try_from(settings)`.
///
/// ```
/// use gifcast::{ProcessingConfig, Settings};
///
/// let settings: Settings = serde_json::from_str(
///     r#"{ "frame_step": 2, "vector_quantization": true, "vector_colors": 64 }"#,
/// ).unwrap();
/// let config = ProcessingConfig::try_from(settings).unwrap();
/// assert_eq!(config.scale_factor, 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Stride for fixed admission (1 = every frame).
    pub frame_step: u32,
    /// Resampling ratio.
    pub scale_factor: f64,
    /// Use the fast 32-color palette when palette quantization is active.
    pub color_optim: bool,
    /// Use k-means clustering instead of palette quantization.
    pub vector_quantization: bool,
    /// Cluster count for vector quantization.
    pub vector_colors: u16,
    /// Use adaptive (motion-based) admission instead of fixed stride.
    pub dynamic_framerate: bool,
    /// Sensitivity of adaptive admission.
    pub motion_threshold: f64,
    /// Stage order.
    pub processing_order: ProcessingOrder,
    /// Report per-stage timing.
    pub time_logging: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frame_step: 1,
            scale_factor: 0.5,
            color_optim: false,
            vector_quantization: false,
            vector_colors: 16,
            dynamic_framerate: false,
            motion_threshold: 10.0,
            processing_order: ProcessingOrder::Efficiency,
            time_logging: true,
        }
    }
}

impl Settings {
    /// Read settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`GifcastError::Io`] if the file cannot be read, or
    /// [`GifcastError::Settings`] if it is not valid settings JSON.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, GifcastError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&text).map_err(|error| {
            GifcastError::Settings(format!("{}: {error}", path.as_ref().display()))
        })
    }
}

impl TryFrom<Settings> for ProcessingConfig {
    type Error = GifcastError;

    fn try_from(settings: Settings) -> Result<Self, Self::Error> {
        let admission = if settings.dynamic_framerate {
            FrameAdmissionPolicy::Adaptive {
                motion_threshold: settings.motion_threshold,
            }
        } else {
            FrameAdmissionPolicy::FixedStride {
                step: settings.frame_step,
            }
        };

        let color = if settings.vector_quantization {
            ColorStrategy::VectorQuantize {
                colors: settings.vector_colors,
            }
        } else if settings.color_optim {
            ColorStrategy::Palette(PaletteMode::Fast)
        } else {
            ColorStrategy::Palette(PaletteMode::Adaptive)
        };

        let config = ProcessingConfig {
            admission,
            scale_factor: settings.scale_factor,
            color,
            order: settings.processing_order,
            time_logging: settings.time_logging,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_fold_into_sum_types() {
        let settings = Settings {
            dynamic_framerate: true,
            motion_threshold: 4.5,
            color_optim: true,
            ..Settings::default()
        };
        let config = ProcessingConfig::try_from(settings).unwrap();
        assert_eq!(
            config.admission,
            FrameAdmissionPolicy::Adaptive {
                motion_threshold: 4.5
            }
        );
        assert_eq!(config.color, ColorStrategy::Palette(PaletteMode::Fast));
    }

    #[test]
    fn vector_quantization_wins_over_color_optim() {
        let settings = Settings {
            vector_quantization: true,
            color_optim: true,
            vector_colors: 8,
            ..Settings::default()
        };
        let config = ProcessingConfig::try_from(settings).unwrap();
        assert_eq!(config.color, ColorStrategy::VectorQuantize { colors: 8 });
    }

    #[test]
    fn zero_stride_is_rejected() {
        let config = ProcessingConfig::new()
            .with_admission(FrameAdmissionPolicy::FixedStride { step: 0 });
        assert!(matches!(
            config.validate(),
            Err(GifcastError::InvalidConfig(_))
        ));
    }

    #[test]
    fn zero_stride_is_ignored_in_adaptive_mode() {
        let settings = Settings {
            frame_step: 0,
            dynamic_framerate: true,
            ..Settings::default()
        };
        assert!(ProcessingConfig::try_from(settings).is_ok());
    }

    #[test]
    fn scale_factor_must_be_positive() {
        for bad in [0.0, -0.5, f64::NAN, f64::INFINITY] {
            let config = ProcessingConfig::new().with_scale_factor(bad);
            assert!(config.validate().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn vector_colors_bounded_by_gif_palette() {
        let too_many = ProcessingConfig::new().with_color(ColorStrategy::VectorQuantize { colors: 257 });
        assert!(too_many.validate().is_err());
        let none = ProcessingConfig::new().with_color(ColorStrategy::VectorQuantize { colors: 0 });
        assert!(none.validate().is_err());
    }

    #[test]
    fn processing_order_parses_case_insensitively() {
        assert_eq!(
            "Quality".parse::<ProcessingOrder>().unwrap(),
            ProcessingOrder::Quality
        );
        assert!("speed".parse::<ProcessingOrder>().is_err());
    }
}
