use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rommate")]
#[command(author, version, about = "Disc image organizer: m3u playlists and CHD conversion")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Which disc-file family to group when a directory holds both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Group compressed archives (.chd)
    Chd,
    /// Group original images (.cue/.gdi/.cdi/.iso)
    Original,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Group multi-disc titles in a directory into m3u playlists
    Playlist {
        /// Directory holding the disc images
        #[arg(required = true)]
        directory: PathBuf,

        /// Which format to group when both chd and originals are present
        /// (prompts interactively if omitted)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },

    /// Convert every source image in a directory to CHD with chdman
    Convert {
        /// Directory holding the disc images
        #[arg(required = true)]
        directory: PathBuf,

        /// Delete each original (and its .bin sidecar) after a successful
        /// conversion
        #[arg(long)]
        delete_originals: bool,
    },

    /// Convert to CHD, then write playlists for the resulting archives
    Process {
        /// Directory holding the disc images
        #[arg(required = true)]
        directory: PathBuf,

        /// Delete originals after successful conversion
        #[arg(long)]
        delete_originals: bool,
    },

    /// Check that chdman is installed and healthy
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
