//! Driver (host application) interface
//!
//! The driver is the binding to the embedding application. The player holds
//! it weakly: notifications promote the reference on use and silently drop
//! when the driver is gone, so a departing host never keeps the engine
//! alive or crashes it.

use crate::media::{MediaError, SourceFlags, SubtitleData, TimedTextData};

/// Out-of-band events forwarded to the application listener.
#[derive(Debug)]
pub enum ListenerEvent {
    PlaybackComplete,
    Error { error: MediaError },
    /// First video frame was presented.
    VideoRenderingStart,
    /// Playback started being rendered.
    Started,
    BufferingUpdate { percent: i32 },
    BufferingStart,
    BufferingEnd,
    VideoSizeChanged { width: i32, height: i32 },
    Subtitle { data: SubtitleData },
    /// `None` clears the currently displayed timed text.
    TimedText { data: Option<TimedTextData> },
    /// Track metadata changed (e.g. a caption track appeared).
    MetadataUpdate,
}

/// Completion and progress callbacks into the host application.
///
/// All methods are invoked on the player task and must return quickly.
pub trait Driver: Send + Sync {
    fn notify_set_data_source_completed(&self, result: Result<(), MediaError>);
    fn notify_prepare_completed(&self, result: Result<(), MediaError>);
    fn notify_duration(&self, duration_us: i64);
    fn notify_position(&self, position_us: i64);
    fn notify_frame_stats(&self, total: u64, dropped: u64);
    fn notify_seek_complete(&self);
    fn notify_set_surface_complete(&self);
    fn notify_reset_complete(&self);
    fn notify_flags_changed(&self, flags: SourceFlags);
    fn notify_listener(&self, event: ListenerEvent);
}
