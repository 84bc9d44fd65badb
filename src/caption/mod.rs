//! Closed-caption decoder interface
//!
//! Captions ride inside the video elementary stream. The coordinator taps
//! every video access unit into the caption decoder before forwarding it,
//! and asks for display at each rendered frame's media time.

use crate::media::{AccessUnit, MediaError, SubtitleData, TrackInfo};

/// Extracts and exposes caption tracks embedded in video access units.
pub trait CaptionDecoder: Send {
    /// Scans one video access unit for caption payloads.
    fn decode(&mut self, unit: &AccessUnit);

    /// Emits caption data due at `time_us` through the notify channel.
    fn display(&mut self, time_us: i64);

    fn is_selected(&self) -> bool;

    fn track_count(&self) -> usize;
    fn track_info(&self, index: usize) -> Option<TrackInfo>;
    fn select_track(&mut self, index: usize, select: bool) -> Result<(), MediaError>;
}

/// Notifications a caption decoder posts to the coordinator.
#[derive(Debug)]
pub enum CaptionEvent {
    /// Caption payload ready for the listener. The track index is local to
    /// the caption decoder; the coordinator rebases it past the source's
    /// in-band tracks.
    Data { data: SubtitleData },
    /// A new caption track was discovered mid-stream.
    TrackAdded,
}
