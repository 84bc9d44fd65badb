//! Error and status types shared with collaborators

use thiserror::Error;

/// Status codes crossing the coordinator/collaborator boundary.
///
/// These model the status space of the media pipeline rather than Rust-side
/// failures: `EndOfStream` in particular is the normal terminal status of a
/// stream and only becomes a listener-visible error in contexts where more
/// data was required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("end of stream")]
    EndOfStream,

    #[error("operation invalid in the current state")]
    InvalidOperation,

    #[error("format or feature not supported")]
    Unsupported,

    #[error("no DRM license for protected content")]
    DrmNoLicense,

    #[error("media error {0}")]
    Unknown(i32),
}

/// Errors surfaced by the [`PlayerHandle`](crate::PlayerHandle) API.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The player task has shut down and no longer accepts commands.
    #[error("player channel closed")]
    ChannelClosed,

    #[error(transparent)]
    Media(#[from] MediaError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_error_display() {
        assert_eq!(MediaError::EndOfStream.to_string(), "end of stream");
        assert_eq!(MediaError::Unknown(-38).to_string(), "media error -38");
    }

    #[test]
    fn test_player_error_from_media_error() {
        let err: PlayerError = MediaError::InvalidOperation.into();
        assert!(matches!(err, PlayerError::Media(MediaError::InvalidOperation)));
    }
}
