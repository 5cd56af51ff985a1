//! Error types for spotlet-player

use thiserror::Error;

/// Playback start errors
///
/// Both variants leave the current session untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// Track has no preview URL
    #[error("Track has no preview: {0}")]
    Unplayable(String),

    /// No track in the requested queue has a preview URL
    #[error("No playable tracks in queue")]
    EmptyQueue,
}

/// Convenience Result type using PlaybackError
pub type Result<T> = std::result::Result<T, PlaybackError>;
