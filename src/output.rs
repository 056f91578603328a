//! Output path resolution.
//!
//! The pipeline never asks questions about the destination: it receives an
//! [`OutputTarget`] that is either a final path or a cancellation. This
//! module derives a default path from the input and applies a
//! [`ConflictPolicy`] when that path is already taken.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::GifcastError;

/// Where a conversion writes its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Write (or overwrite) the GIF at this path.
    Path(PathBuf),
    /// The user declined to write anything.
    Cancelled,
}

impl OutputTarget {
    /// Target the given path.
    pub fn path<P: Into<PathBuf>>(path: P) -> Self {
        OutputTarget::Path(path.into())
    }

    /// Whether this target is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OutputTarget::Cancelled)
    }
}

/// What to do when the output path already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Give up and produce [`OutputTarget::Cancelled`].
    #[default]
    Cancel,
    /// Overwrite the existing file.
    Replace,
    /// Pick the first free `<stem> (n).gif` next to it.
    Rename,
}

impl Display for ConflictPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ConflictPolicy::Cancel => f.write_str("cancel"),
            ConflictPolicy::Replace => f.write_str("replace"),
            ConflictPolicy::Rename => f.write_str("rename"),
        }
    }
}

impl FromStr for ConflictPolicy {
    type Err = GifcastError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cancel" | "skip" => Ok(ConflictPolicy::Cancel),
            "replace" | "overwrite" => Ok(ConflictPolicy::Replace),
            "rename" => Ok(ConflictPolicy::Rename),
            other => Err(GifcastError::InvalidConfig(format!(
                "unknown conflict policy `{other}` (expected cancel, replace or rename)"
            ))),
        }
    }
}

/// `<input dir>/<input stem>.gif`, or `<input stem>-loop.gif` when the input
/// is itself a GIF, so the default never points back at the source.
///
/// ```
/// use std::path::Path;
/// use gifcast::default_output_path;
///
/// assert_eq!(
///     default_output_path("clips/holiday.mp4"),
///     Path::new("clips/holiday.gif"),
/// );
/// assert_eq!(
///     default_output_path("clips/holiday.gif"),
///     Path::new("clips/holiday-loop.gif"),
/// );
/// ```
pub fn default_output_path<P: AsRef<Path>>(input: P) -> PathBuf {
    let input = input.as_ref();
    let is_gif = input
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("gif"));
    if !is_gif {
        return input.with_extension("gif");
    }

    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}-loop.gif"))
}

/// Apply `policy` to `path`.
///
/// A path that does not exist yet is always returned as-is.
pub fn resolve_output<P: AsRef<Path>>(path: P, policy: ConflictPolicy) -> OutputTarget {
    let path = path.as_ref();
    if !path.exists() {
        return OutputTarget::path(path);
    }

    match policy {
        ConflictPolicy::Replace => {
            log::debug!("Replacing existing file {}", path.display());
            OutputTarget::path(path)
        }
        ConflictPolicy::Cancel => {
            log::debug!("{} exists; cancelling", path.display());
            OutputTarget::Cancelled
        }
        ConflictPolicy::Rename => {
            let renamed = first_free_name(path);
            log::debug!("{} exists; writing {} instead", path.display(), renamed.display());
            OutputTarget::Path(renamed)
        }
    }
}

fn first_free_name(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    (1u32..)
        .map(|n| path.with_file_name(format!("{stem} ({n}){extension}")))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_swaps_extension() {
        assert_eq!(default_output_path("/tmp/a.b.mkv"), PathBuf::from("/tmp/a.b.gif"));
        assert_eq!(default_output_path("noext"), PathBuf::from("noext.gif"));
    }

    #[test]
    fn default_path_never_targets_a_gif_input() {
        assert_eq!(default_output_path("clips/clip.gif"), PathBuf::from("clips/clip-loop.gif"));
        assert_eq!(default_output_path("CLIP.GIF"), PathBuf::from("CLIP-loop.gif"));
    }

    #[test]
    fn replacing_the_default_for_a_gif_input_keeps_the_source() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("clip.gif");
        std::fs::write(&input, b"source").unwrap();

        let target = resolve_output(default_output_path(&input), ConflictPolicy::Replace);
        assert_eq!(target, OutputTarget::path(dir.path().join("clip-loop.gif")));
        assert_ne!(target, OutputTarget::path(&input));
    }

    #[test]
    fn missing_path_ignores_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.gif");
        assert_eq!(resolve_output(&path, ConflictPolicy::Cancel), OutputTarget::path(&path));
    }

    #[test]
    fn existing_path_follows_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.gif");
        std::fs::write(&path, b"taken").unwrap();
        std::fs::write(dir.path().join("out (1).gif"), b"taken").unwrap();

        assert!(resolve_output(&path, ConflictPolicy::Cancel).is_cancelled());
        assert_eq!(resolve_output(&path, ConflictPolicy::Replace), OutputTarget::path(&path));
        assert_eq!(
            resolve_output(&path, ConflictPolicy::Rename),
            OutputTarget::path(dir.path().join("out (2).gif"))
        );
    }

    #[test]
    fn policy_parses_aliases() {
        assert_eq!("Overwrite".parse::<ConflictPolicy>().unwrap(), ConflictPolicy::Replace);
        assert!("ask".parse::<ConflictPolicy>().is_err());
    }
}
