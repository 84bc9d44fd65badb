//! Source interface
//!
//! A source demuxes a container (file, stream, live, real-time) into
//! per-stream access units. Implementations run their own I/O; they talk
//! back to the coordinator only through the [`SourceNotify`] channel handed
//! to them at construction.
//!
//! [`SourceNotify`]: crate::player::SourceNotify

use tokio::sync::oneshot;

use bytes::Bytes;

use crate::media::{
    AccessUnit, Discontinuity, MediaError, MediaFormat, SourceFlags, StreamKind, SubtitleData,
    TimedTextData, TrackInfo, TrackKind,
};

/// Result of a non-blocking access-unit dequeue.
#[derive(Debug)]
pub enum Dequeue {
    Buffer(AccessUnit),
    /// In-band format/time break; drives the flush state machine.
    Discontinuity(Discontinuity),
    /// No data buffered right now; retry after feeding the source.
    WouldBlock,
    /// Terminal status for this stream, `EndOfStream` included.
    Error(MediaError),
}

/// Demuxed media source driven by the coordinator.
///
/// All methods are called on the coordinator task and must not block;
/// long-running work (preparation, network reads) completes through
/// [`SourceEvent`] notifications.
pub trait Source: Send {
    /// Begins asynchronous preparation, completed by [`SourceEvent::Prepared`].
    fn prepare(&mut self);

    fn start(&mut self);
    fn stop(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);

    fn seek_to(&mut self, position_us: i64);

    /// Current content duration, if known.
    fn duration_us(&mut self) -> Option<i64>;

    /// Format of the given stream, or `None` while it is still unknown.
    fn format(&mut self, kind: StreamKind) -> Option<MediaFormat>;

    fn track_count(&mut self) -> usize;
    fn track_info(&mut self, index: usize) -> Option<TrackInfo>;
    fn selected_track(&mut self, kind: TrackKind) -> Option<usize>;
    fn select_track(&mut self, index: usize, select: bool) -> Result<(), MediaError>;

    fn dequeue_access_unit(&mut self, kind: StreamKind) -> Dequeue;

    /// Pulls more container data into the source's buffers.
    /// `Err(EndOfStream)` means the container is exhausted.
    fn feed_more_data(&mut self) -> Result<(), MediaError>;

    fn is_real_time(&self) -> bool;

    /// Hands pre-allocated (secure) input buffers to the source so it can
    /// decrypt directly into decoder memory.
    fn set_buffers(&mut self, kind: StreamKind, buffers: Vec<Bytes>) -> Result<(), MediaError>;
}

/// Notifications a source posts to the coordinator.
#[derive(Debug)]
pub enum SourceEvent {
    Prepared {
        result: Result<(), MediaError>,
    },
    FlagsChanged {
        flags: SourceFlags,
    },
    VideoSizeChanged {
        format: MediaFormat,
    },
    BufferingUpdate {
        percent: i32,
    },
    BufferingStart,
    BufferingEnd,
    SubtitleData {
        data: SubtitleData,
    },
    TimedTextData {
        data: TimedTextData,
        /// Stamped by the coordinator on re-posts; a stale value drops the
        /// sample. Fresh source posts leave it empty.
        generation: Option<u32>,
    },
    /// The source needs the named decoders torn down (e.g. a protected
    /// stream switching periods); `done` fires once the teardown and
    /// rescan have been queued behind any in-flight flush.
    QueueDecoderShutdown {
        audio: bool,
        video: bool,
        done: oneshot::Sender<()>,
    },
    DrmNoLicense,
}
