//! Error types for piano-keys

use thiserror::Error;

/// Result type alias for piano-keys operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in piano-keys
///
/// Static query violations (`UnknownNoteName`, `InvalidNote`,
/// `RegisterOutOfRange`, `UnknownDevice`) are programming errors on the
/// caller's side and are returned as soon as they are detected. Malformed
/// device input is never an error; it is dropped by the event normalizer.
#[derive(Debug, Error)]
pub enum Error {
    /// A pitch-class spelling that the keyboard does not know
    #[error("Unknown note name: {0:?}")]
    UnknownNoteName(String),

    /// A note string that is not `<name><register>`
    #[error("Invalid note: {0:?}")]
    InvalidNote(String),

    /// Register outside 0-8
    #[error("Register out of range: {0} (expected 0-8)")]
    RegisterOutOfRange(u8),

    /// Device index not in the current device list
    #[error("Unknown input device index {index} ({available} devices available)")]
    UnknownDevice { index: usize, available: usize },

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// MIDI backend error
    #[error("MIDI error: {0}")]
    Midi(String),

    /// Terminal/TUI error
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON serialization error (event log)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
