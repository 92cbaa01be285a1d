// Error types for the library side of the player.
// The playback path itself never surfaces these to callers: device and store
// failures are logged and degraded, see session.rs.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "prefs")]
    #[error("Preference database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The host audio channel refused a command
    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Audio decode error: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, Error>;
