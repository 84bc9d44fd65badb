//! Per-stream flush/shutdown status machine
//!
//! Each stream (audio, video) tracks where it stands in a decoder flush or
//! teardown. Deferred actions only run while both streams are settled, so
//! seeks, surface changes, and resets cannot overlap an in-flight flush.
//!
//! ```text
//! None ──flush(shutdown=false)──▶ FlushingDecoder ──FlushCompleted──▶ Flushed
//! None ──flush(shutdown=true)──▶ FlushingDecoderShutdown
//!   ──FlushCompleted──▶ ShuttingDownDecoder ──ShutdownCompleted──▶ ShutDown
//! (decoder Error while not settled) ──▶ ShutDown, handle dropped
//! ```

/// Flush progress of one stream's decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushStatus {
    /// No transition in flight.
    #[default]
    None,
    /// Flush requested, decoder keeps running afterwards.
    FlushingDecoder,
    /// Flush requested as the first half of a teardown.
    FlushingDecoderShutdown,
    /// Flush acknowledged; waiting for the sibling stream to settle before
    /// both resume together.
    Flushed,
    /// Teardown issued after the flush completed.
    ShuttingDownDecoder,
    /// Decoder fully torn down and its handle cleared.
    ShutDown,
}

impl FlushStatus {
    /// Whether a flush is in flight, and if so whether it must be followed
    /// by a decoder shutdown.
    pub fn flushing_needs_shutdown(self) -> Option<bool> {
        match self {
            Self::FlushingDecoder => Some(false),
            Self::FlushingDecoderShutdown => Some(true),
            _ => None,
        }
    }

    /// A settled stream does not block deferred actions: nothing in
    /// flight, or the transition reached a resting point.
    pub fn is_settled(self) -> bool {
        matches!(self, Self::None | Self::Flushed | Self::ShutDown)
    }
}

impl std::fmt::Display for FlushStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::FlushingDecoder => "flushing_decoder",
            Self::FlushingDecoderShutdown => "flushing_decoder_shutdown",
            Self::Flushed => "flushed",
            Self::ShuttingDownDecoder => "shutting_down_decoder",
            Self::ShutDown => "shut_down",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flushing_needs_shutdown() {
        assert_eq!(FlushStatus::FlushingDecoder.flushing_needs_shutdown(), Some(false));
        assert_eq!(
            FlushStatus::FlushingDecoderShutdown.flushing_needs_shutdown(),
            Some(true)
        );
        assert_eq!(FlushStatus::None.flushing_needs_shutdown(), None);
        assert_eq!(FlushStatus::Flushed.flushing_needs_shutdown(), None);
        assert_eq!(FlushStatus::ShuttingDownDecoder.flushing_needs_shutdown(), None);
    }

    #[test]
    fn test_settled_states() {
        assert!(FlushStatus::None.is_settled());
        assert!(FlushStatus::Flushed.is_settled());
        assert!(FlushStatus::ShutDown.is_settled());

        assert!(!FlushStatus::FlushingDecoder.is_settled());
        assert!(!FlushStatus::FlushingDecoderShutdown.is_settled());
        assert!(!FlushStatus::ShuttingDownDecoder.is_settled());
    }
}
