//! FFmpeg console verbosity.
//!
//! FFmpeg writes its own diagnostics straight to stderr, independent of the
//! `log` facade used by this crate. Decoding a slightly damaged clip can
//! print a wall of warnings that have no bearing on the resulting GIF, so
//! callers usually want to pin FFmpeg to a quieter level than their own
//! logging.
//!
//! ```no_run
//! use gifcast::FfmpegLogLevel;
//!
//! gifcast::set_ffmpeg_log_level(FfmpegLogLevel::Error);
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use ffmpeg_next::util::log::Level;

use crate::error::GifcastError;

/// FFmpeg log verbosity, most quiet first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FfmpegLogLevel {
    /// Print nothing.
    Quiet,
    /// Unrecoverable errors only.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's own default).
    Warning,
    /// Informational messages.
    Info,
    /// Verbose informational messages.
    Verbose,
    /// Debugging output.
    Debug,
}

impl FfmpegLogLevel {
    /// Every level, most quiet first.
    pub const ALL: [FfmpegLogLevel; 7] = [
        FfmpegLogLevel::Quiet,
        FfmpegLogLevel::Fatal,
        FfmpegLogLevel::Error,
        FfmpegLogLevel::Warning,
        FfmpegLogLevel::Info,
        FfmpegLogLevel::Verbose,
        FfmpegLogLevel::Debug,
    ];

    /// Level matching the crate's own verbosity: errors normally, warnings
    /// and up when verbose output was requested.
    pub fn for_verbosity(verbose: bool) -> Self {
        if verbose {
            FfmpegLogLevel::Warning
        } else {
            FfmpegLogLevel::Error
        }
    }

    fn name(self) -> &'static str {
        match self {
            FfmpegLogLevel::Quiet => "quiet",
            FfmpegLogLevel::Fatal => "fatal",
            FfmpegLogLevel::Error => "error",
            FfmpegLogLevel::Warning => "warning",
            FfmpegLogLevel::Info => "info",
            FfmpegLogLevel::Verbose => "verbose",
            FfmpegLogLevel::Debug => "debug",
        }
    }

    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Verbose => Level::Verbose,
            FfmpegLogLevel::Debug => Level::Debug,
        }
    }
}

impl Display for FfmpegLogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.name())
    }
}

impl FromStr for FfmpegLogLevel {
    type Err = GifcastError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_ascii_lowercase();
        let value = if value == "warn" { "warning" } else { value.as_str() };
        FfmpegLogLevel::ALL
            .into_iter()
            .find(|level| level.name() == value)
            .ok_or_else(|| {
                GifcastError::InvalidConfig(format!("unsupported FFmpeg log level `{value}`"))
            })
    }
}

/// Set FFmpeg's console verbosity for the whole process.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    log::debug!("Setting FFmpeg log level to {level}");
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for level in FfmpegLogLevel::ALL {
            assert_eq!(level.to_string().parse::<FfmpegLogLevel>().unwrap(), level);
        }
    }

    #[test]
    fn warn_is_accepted_as_alias() {
        assert_eq!("WARN".parse::<FfmpegLogLevel>().unwrap(), FfmpegLogLevel::Warning);
        assert!("trace".parse::<FfmpegLogLevel>().is_err());
    }

    #[test]
    fn verbose_mode_is_louder() {
        assert!(FfmpegLogLevel::for_verbosity(true) > FfmpegLogLevel::for_verbosity(false));
    }
}
