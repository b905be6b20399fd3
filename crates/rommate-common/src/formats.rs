//! Disc-image format definitions and extension helpers.
//!
//! These predicates drive both pipelines: the playlist scanner filters by
//! them, and the converter uses them to pick its inputs and name its output.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// A recognized disc-image file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscFormat {
    /// Cue sheet referencing one or more raw `.bin` tracks.
    Cue,
    /// Dreamcast GD-ROM index.
    Gdi,
    /// DiscJuggler image.
    Cdi,
    /// Plain ISO 9660 image.
    Iso,
    /// MAME compressed hunks of data — the archive format chdman produces.
    Chd,
}

/// Extensions of the original source formats, in scan order.
pub const SOURCE_EXTENSIONS: &[&str] = &["cue", "gdi", "cdi", "iso"];

/// Extension of the compressed archive format.
pub const ARCHIVE_EXTENSION: &str = "chd";

impl DiscFormat {
    /// The lowercase file extension for this format.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Cue => "cue",
            Self::Gdi => "gdi",
            Self::Cdi => "cdi",
            Self::Iso => "iso",
            Self::Chd => "chd",
        }
    }

    /// Determine the format from a path's extension, if recognized.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "cue" => Some(Self::Cue),
            "gdi" => Some(Self::Gdi),
            "cdi" => Some(Self::Cdi),
            "iso" => Some(Self::Iso),
            "chd" => Some(Self::Chd),
            _ => None,
        }
    }

    /// Whether this format is an input the converter accepts.
    pub fn is_convertible(self) -> bool {
        !matches!(self, Self::Chd)
    }
}

impl fmt::Display for DiscFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Check if a path is a convertible source image (cue/gdi/cdi/iso).
pub fn is_convertible_source(path: &Path) -> bool {
    DiscFormat::from_path(path).is_some_and(DiscFormat::is_convertible)
}

/// The sidecar data file that travels with a source image, if any.
///
/// A cue sheet references a same-stem `.bin` track file which must be
/// removed alongside it when the caller asks for source deletion.
pub fn sidecar_path(source: &Path) -> Option<PathBuf> {
    match DiscFormat::from_path(source)? {
        DiscFormat::Cue => Some(source.with_extension("bin")),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_path_recognizes_extensions() {
        assert_eq!(
            DiscFormat::from_path(Path::new("Game (Disc 1).cue")),
            Some(DiscFormat::Cue)
        );
        assert_eq!(
            DiscFormat::from_path(Path::new("/roms/game.CHD")),
            Some(DiscFormat::Chd)
        );
        assert_eq!(DiscFormat::from_path(Path::new("game.bin")), None);
        assert_eq!(DiscFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn convertible_excludes_archive() {
        assert!(is_convertible_source(Path::new("a.iso")));
        assert!(is_convertible_source(Path::new("a.GDI")));
        assert!(!is_convertible_source(Path::new("a.chd")));
        assert!(!is_convertible_source(Path::new("a.m3u")));
    }

    #[test]
    fn cue_sidecar_is_bin() {
        assert_eq!(
            sidecar_path(Path::new("/roms/Game (Disc 1).cue")),
            Some(PathBuf::from("/roms/Game (Disc 1).bin"))
        );
        assert_eq!(sidecar_path(Path::new("/roms/game.iso")), None);
        assert_eq!(sidecar_path(Path::new("/roms/game.chd")), None);
    }

    #[test]
    fn display_matches_extension() {
        assert_eq!(DiscFormat::Gdi.to_string(), "gdi");
        assert_eq!(DiscFormat::Chd.to_string(), "chd");
    }
}
