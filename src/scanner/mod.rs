//! Directory scanning and format detection.
//!
//! Scans are single-directory by convention: a playlist and the disc files
//! it references must live in the same folder, so nothing here recurses.

pub mod grouper;

use rommate_common::formats::{ARCHIVE_EXTENSION, SOURCE_EXTENSIONS};
use rommate_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// List files in `dir` whose extension matches one of `extensions`
/// (case-insensitive, no leading dot). The result is sorted by file name so
/// repeated scans of an unchanged directory are identical.
pub fn list_by_extensions(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::NotADirectory(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).max_depth(1).follow_links(true) {
        let entry = entry.map_err(|e| {
            let path = e
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| dir.to_path_buf());
            Error::io(path, e.into())
        })?;

        if entry.file_type().is_dir() {
            continue;
        }

        let matched = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .is_some_and(|e| extensions.contains(&e.as_str()));
        if matched {
            files.push(entry.into_path());
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    debug!("Found {} file(s) in {:?} matching {:?}", files.len(), dir, extensions);
    Ok(files)
}

/// Which disc-file families are present in a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInventory {
    /// Any original source format (cue/gdi/cdi/iso) is present.
    pub has_original: bool,
    /// The compressed archive format (chd) is present.
    pub has_archive: bool,
}

impl FormatInventory {
    pub fn is_empty(&self) -> bool {
        !self.has_original && !self.has_archive
    }
}

/// Detect which disc-file families exist in `dir`.
pub fn detect_formats(dir: &Path) -> Result<FormatInventory> {
    let has_original = !list_by_extensions(dir, SOURCE_EXTENSIONS)?.is_empty();
    let has_archive = !list_by_extensions(dir, &[ARCHIVE_EXTENSION])?.is_empty();
    Ok(FormatInventory {
        has_original,
        has_archive,
    })
}

/// The three-way answer when both file families could be grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatSelection {
    /// Group the compressed archives (chd).
    Archive,
    /// Group the original images (cue/gdi/cdi/iso).
    Original,
    /// Stop without grouping anything.
    Abort,
}

/// Decision point supplied by the caller, consulted only when a directory
/// holds both original and archive files. The surrounding UI owns how the
/// question is asked; the pipeline only blocks on the answer.
pub trait FormatPrompt {
    fn choose(&self, inventory: &FormatInventory) -> FormatSelection;
}

/// A prompt with a fixed answer, for non-interactive callers and tests.
pub struct FixedSelection(pub FormatSelection);

impl FormatPrompt for FixedSelection {
    fn choose(&self, _inventory: &FormatInventory) -> FormatSelection {
        self.0
    }
}

/// Work out which extensions a grouping pass should scan.
///
/// Returns `Ok(None)` when the directory holds no disc files at all. When
/// both families are present the prompt decides; [`FormatSelection::Abort`]
/// surfaces as [`Error::Aborted`].
pub fn resolve_scan_extensions(
    dir: &Path,
    prompt: &dyn FormatPrompt,
) -> Result<Option<&'static [&'static str]>> {
    let inventory = detect_formats(dir)?;

    if inventory.is_empty() {
        return Ok(None);
    }

    let selection = if inventory.has_original && inventory.has_archive {
        prompt.choose(&inventory)
    } else if inventory.has_archive {
        FormatSelection::Archive
    } else {
        FormatSelection::Original
    };

    match selection {
        FormatSelection::Archive => Ok(Some(&[ARCHIVE_EXTENSION])),
        FormatSelection::Original => Ok(Some(SOURCE_EXTENSIONS)),
        FormatSelection::Abort => Err(Error::Aborted),
    }
}
