//! Deferred actions
//!
//! Long-running transitions (seek, surface change, decoder teardown, reset)
//! cannot interleave with an in-flight flush. They queue here in order and
//! drain from [`Player::process_deferred_actions`] only while both streams'
//! flush statuses are settled.
//!
//! [`Player::process_deferred_actions`]: super::Player

use std::sync::Arc;

use tokio::sync::oneshot;

use crate::renderer::VideoSurface;

/// One queued transition.
pub enum DeferredAction {
    /// Seek the source to an absolute position.
    Seek { position_us: i64 },
    /// Rebind (or clear) the video output surface.
    SetSurface {
        surface: Option<Arc<dyn VideoSurface>>,
    },
    /// Flush-with-shutdown for the named decoders.
    ShutdownDecoders { audio: bool, video: bool },
    /// Flush both decoders without teardown.
    Flush,
    /// Re-run source scanning if any enabled decoder is missing.
    Scan,
    /// Tear everything down and report reset completion.
    Reset,
    /// Signal a waiting collaborator that the actions queued before this
    /// one have executed.
    Reply(oneshot::Sender<()>),
}

impl DeferredAction {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Seek { .. } => "seek",
            Self::SetSurface { .. } => "set_surface",
            Self::ShutdownDecoders { .. } => "shutdown_decoders",
            Self::Flush => "flush",
            Self::Scan => "scan",
            Self::Reset => "reset",
            Self::Reply(_) => "reply",
        }
    }
}

impl std::fmt::Debug for DeferredAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Seek { position_us } => write!(f, "Seek({position_us}us)"),
            _ => f.write_str(self.label()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_labels() {
        assert_eq!(DeferredAction::Flush.label(), "flush");
        assert_eq!(DeferredAction::Scan.label(), "scan");
        assert_eq!(
            DeferredAction::ShutdownDecoders {
                audio: true,
                video: false
            }
            .label(),
            "shutdown_decoders"
        );
        assert_eq!(format!("{:?}", DeferredAction::Seek { position_us: 7 }), "Seek(7us)");
    }
}
