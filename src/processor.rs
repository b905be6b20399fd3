//! Combined pass: convert a directory, then write playlists for the
//! archives.
//!
//! Conversion failures are per-task; the titles that did convert still get
//! their playlist, so the playlist pass runs whenever the conversion run
//! actually executed. Only an unavailable tool or a user cancel skips it.

use crate::config::Config;
use crate::conversion::ConversionRun;
use crate::playlist::{create_playlists, PlaylistReport};
use crate::scanner::{FixedSelection, FormatSelection};
use crate::state::{AppEvent, RunOutcome};
use rommate_common::Result;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::broadcast;

pub fn process_directory(
    dir: &Path,
    config: &Config,
    stop_signal: Arc<AtomicBool>,
    event_tx: broadcast::Sender<AppEvent>,
) -> Result<(RunOutcome, PlaylistReport)> {
    let run = ConversionRun::new(config.clone(), stop_signal, event_tx.clone());
    let outcome = run.execute(dir)?;

    let report = match outcome {
        RunOutcome::ToolUnavailable | RunOutcome::Cancelled { .. } => PlaylistReport::default(),
        RunOutcome::Completed { .. } | RunOutcome::NothingToConvert => create_playlists(
            dir,
            &config.playlist.extension,
            &FixedSelection(FormatSelection::Archive),
            Some(&event_tx),
        )?,
    };

    Ok((outcome, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::event_channel;
    use std::fs;

    #[cfg(unix)]
    fn fake_chdman(dir: &Path) -> std::path::PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("chdman");
        let script = r#"#!/bin/sh
if [ "$1" = "--help" ]; then exit 0; fi
case "$3" in
    *bad*) echo "unreadable input" >&2; exit 1 ;;
esac
touch "$5"
exit 0
"#;
        fs::write(&path, script).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[test]
    fn playlists_are_written_despite_a_failed_conversion() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = fake_chdman(tmp.path());
        let library = tmp.path().join("library");
        fs::create_dir(&library).unwrap();
        for name in [
            "Saga (Disc 1).iso",
            "Saga (Disc 2).iso",
            "bad apple.iso",
        ] {
            fs::write(library.join(name), b"data").unwrap();
        }

        let mut config = Config::default();
        config.tools.chdman_path = Some(tool);

        let (tx, _rx) = event_channel();
        let (outcome, report) =
            process_directory(&library, &config, Arc::new(AtomicBool::new(false)), tx).unwrap();

        match outcome {
            RunOutcome::Completed { summary } => {
                assert_eq!(summary.succeeded, 2);
                assert_eq!(summary.failed, 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        // The failed single-disc title cannot block the converted set's
        // playlist.
        assert_eq!(report.created, 1);
        assert_eq!(
            fs::read_to_string(library.join("Saga.m3u")).unwrap(),
            "Saga (Disc 1).chd\nSaga (Disc 2).chd\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn already_converted_library_still_gets_playlists() {
        let tmp = tempfile::tempdir().unwrap();
        let tool = fake_chdman(tmp.path());
        let library = tmp.path().join("library");
        fs::create_dir(&library).unwrap();
        fs::write(library.join("Saga (Disc 1).chd"), b"").unwrap();
        fs::write(library.join("Saga (Disc 2).chd"), b"").unwrap();

        let mut config = Config::default();
        config.tools.chdman_path = Some(tool);

        let (tx, _rx) = event_channel();
        let (outcome, report) =
            process_directory(&library, &config, Arc::new(AtomicBool::new(false)), tx).unwrap();

        assert_eq!(outcome, RunOutcome::NothingToConvert);
        assert_eq!(report.created, 1);
        assert!(library.join("Saga.m3u").exists());
    }
}
