//! Error types shared by every component of the core.

use std::path::PathBuf;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Station name not in the catalog
    #[error("station not found: {0}")]
    NotFound(String),

    /// The player process could not be spawned
    #[error("cannot start player '{program}': {source}")]
    PlayerLaunch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Signalling, waiting for or killing the player failed.
    /// The session is idle again when this is returned.
    #[error("cannot stop player: {0}")]
    PlayerStop(String),

    /// Preference or config file could not be written
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The system mixer command failed
    #[error("mixer error: {0}")]
    Mixer(String),

    /// Config file present but unusable
    #[error("configuration error: {0}")]
    Config(String),

    /// Unrecognised command input
    #[error("cannot parse command: {0}")]
    Parse(String),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
