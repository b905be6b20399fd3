mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./rommate.toml",
        "~/.config/rommate/config.toml",
        "/etc/rommate/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.playlist.extension.is_empty() {
        anyhow::bail!("Playlist extension cannot be empty");
    }
    if config.playlist.extension.contains(['/', '\\', '.']) {
        anyhow::bail!(
            "Playlist extension must be a bare extension, got {:?}",
            config.playlist.extension
        );
    }

    if config.tools.probe_timeout_secs == 0 {
        anyhow::bail!("Tool probe timeout cannot be 0");
    }

    if let Some(ref path) = config.tools.chdman_path {
        if !path.exists() {
            tracing::warn!("Configured chdman path does not exist: {:?}", path);
        }
    }

    Ok(())
}
