//! Unified error type for the rommate workspace.
//!
//! Failures that affect a single unit of work (one file, one group) are
//! handled locally and counted; this type covers failures that the caller
//! must see, always with enough context to name the offending path or tool.

use std::path::PathBuf;

/// Unified error type covering all failure modes in rommate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O operation failed on a specific path.
    #[error("IO error on {path}: {source}")]
    Io {
        /// The path the operation was acting on.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An external tool (chdman) failed or is unusable.
    #[error("Tool error [{tool}]: {message}")]
    Tool {
        /// Name of the tool that failed.
        tool: String,
        /// Human-readable error description.
        message: String,
    },

    /// A directory that the operation requires is missing or not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The user aborted an interactive choice.
    #[error("Aborted by user")]
    Aborted,
}

impl Error {
    /// Convenience constructor for [`Error::Io`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Convenience constructor for [`Error::Tool`].
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_display_names_path() {
        let err = Error::io(
            "/games/foo.cue",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let text = err.to_string();
        assert!(text.contains("/games/foo.cue"));
        assert!(text.contains("denied"));
    }

    #[test]
    fn tool_display() {
        let err = Error::tool("chdman", "exit code 1");
        assert_eq!(err.to_string(), "Tool error [chdman]: exit code 1");
    }

    #[test]
    fn aborted_display() {
        assert_eq!(Error::Aborted.to_string(), "Aborted by user");
    }
}
