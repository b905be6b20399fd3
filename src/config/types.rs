use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,

    #[serde(default)]
    pub conversion: ConversionConfig,

    #[serde(default)]
    pub playlist: PlaylistConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Explicit path to the chdman executable. Checked first when set.
    #[serde(default)]
    pub chdman_path: Option<PathBuf>,

    /// Directory shipped alongside the application that may carry a bundled
    /// chdman build. Searched after the explicit path, before `PATH`.
    #[serde(default = "default_bundled_dir")]
    pub bundled_dir: PathBuf,

    /// Seconds allowed for the startup verification probe.
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_bundled_dir() -> PathBuf {
    PathBuf::from("tools")
}

fn default_probe_timeout() -> u64 {
    5
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            chdman_path: None,
            bundled_dir: default_bundled_dir(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConversionConfig {
    /// Delete source images (and their sidecar data files) after a
    /// successful conversion.
    #[serde(default)]
    pub delete_originals: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaylistConfig {
    /// Extension of the emitted playlist files.
    #[serde(default = "default_playlist_extension")]
    pub extension: String,
}

fn default_playlist_extension() -> String {
    "m3u".to_string()
}

impl Default for PlaylistConfig {
    fn default() -> Self {
        Self {
            extension: default_playlist_extension(),
        }
    }
}
