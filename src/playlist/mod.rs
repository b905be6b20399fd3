//! M3U playlist emission.
//!
//! A playlist is a plain text file named `{title}.m3u` next to the discs it
//! references, one bare file name per line in disc order. Writes go through
//! a temp file in the same directory and publish with a no-clobber rename,
//! so a reader never observes a half-written playlist and an existing file
//! is never touched.

use crate::scanner::grouper::{group_files, DiscGroup};
use crate::scanner::{list_by_extensions, resolve_scan_extensions, FormatPrompt};
use crate::state::AppEvent;
use rommate_common::{Error, Result};
use std::io::Write as _;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Write the playlist for `group` into `dir`.
///
/// Returns `Ok(true)` if the file was created, `Ok(false)` if a playlist
/// with that name already exists (the existing file is left untouched).
pub fn write_playlist(group: &DiscGroup, dir: &Path, extension: &str) -> Result<bool> {
    let target = dir.join(format!("{}.{}", group.title, extension));
    if target.exists() {
        return Ok(false);
    }

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    for disc in &group.discs {
        writeln!(tmp, "{}", disc.file_name).map_err(|e| Error::io(&target, e))?;
    }
    tmp.flush().map_err(|e| Error::io(&target, e))?;

    match tmp.persist_noclobber(&target) {
        Ok(_) => Ok(true),
        // Lost a race to another writer; same outcome as the exists() check.
        Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(Error::io(&target, e.error)),
    }
}

/// Counts from one playlist pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaylistReport {
    pub created: usize,
    pub skipped: usize,
    pub rejected: usize,
}

/// Scan `dir`, group its disc files and write a playlist per group.
///
/// `prompt` is consulted only when the directory holds both original images
/// and chd archives. Emits progress events on `events` when a sender is
/// supplied.
pub fn create_playlists(
    dir: &Path,
    playlist_extension: &str,
    prompt: &dyn FormatPrompt,
    events: Option<&broadcast::Sender<AppEvent>>,
) -> Result<PlaylistReport> {
    let emit = |event: AppEvent| {
        if let Some(tx) = events {
            let _ = tx.send(event);
        }
    };

    let Some(scan_extensions) = resolve_scan_extensions(dir, prompt)? else {
        info!("No disc files found in {:?}", dir);
        return Ok(PlaylistReport::default());
    };

    let files = list_by_extensions(dir, scan_extensions)?;
    let grouping = group_files(&files);

    let mut report = PlaylistReport {
        rejected: grouping.mixed_format.len(),
        ..Default::default()
    };
    for rejected in &grouping.mixed_format {
        emit(AppEvent::group_rejected(
            rejected.title.clone(),
            rejected.extensions.clone(),
        ));
    }

    for group in grouping.groups.values() {
        let target = dir.join(format!("{}.{}", group.title, playlist_extension));
        if write_playlist(group, dir, playlist_extension)? {
            info!("Created playlist {:?} ({} discs)", target, group.discs.len());
            emit(AppEvent::playlist_created(target.clone(), group.discs.len()));
            report.created += 1;
        } else {
            warn!("Playlist {:?} already exists, leaving it alone", target);
            emit(AppEvent::playlist_skipped(target.clone()));
            report.skipped += 1;
        }
    }

    Ok(report)
}
