//! Renderer interface
//!
//! The renderer owns pacing: it holds the A/V clock, drains the audio sink,
//! and decides when (or whether) each queued buffer is presented. It runs
//! on its own task or thread and reports position, lateness, and stream
//! completion back to the coordinator.

use tokio::sync::oneshot;

use crate::media::{DecodedBuffer, MediaError, StreamKind, VideoScalingMode};

/// Behavior flags fixed at renderer construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RendererFlags {
    /// Real-time source; never stall waiting for the lagging stream.
    pub real_time: bool,
    /// Audio is offloaded to the sink's hardware decoder.
    pub offload_audio: bool,
}

/// A/V renderer driven by the coordinator.
///
/// All methods are called on the coordinator task and must not block;
/// completions and progress arrive as [`RendererEvent`] notifications.
pub trait Renderer: Send {
    /// Queues a decoded buffer; `done` returns buffer ownership to the
    /// decoder once rendered or dropped.
    fn queue_buffer(&mut self, kind: StreamKind, buffer: DecodedBuffer, done: oneshot::Sender<()>);

    /// Marks the end of a stream; `EndOfStream` is the normal case, any
    /// other error is reported with the final EOS notification.
    fn queue_eos(&mut self, kind: StreamKind, error: MediaError);

    /// Discards all queued buffers of a stream.
    fn flush(&mut self, kind: StreamKind);

    fn pause(&mut self);
    fn resume(&mut self);

    /// A timeline break completed flushing; restart A/V sync from the next
    /// queued buffers.
    fn signal_time_discontinuity(&mut self);

    /// The audio sink was closed and re-opened; renegotiate its position.
    fn signal_audio_sink_changed(&mut self);

    /// Offload fell back to PCM; stop expecting sink callbacks.
    fn signal_disable_offload_audio(&mut self);
}

/// Notifications a renderer posts to the coordinator.
#[derive(Debug)]
pub enum RendererEvent {
    /// A stream fully drained. `final_result` is `EndOfStream` in the
    /// normal case, otherwise the error that terminated the stream.
    Eos {
        kind: StreamKind,
        final_result: MediaError,
    },
    /// Periodic playback progress.
    Position {
        position_us: i64,
        video_late_by_us: i64,
    },
    FlushComplete {
        kind: StreamKind,
    },
    /// First video frame presented.
    VideoRenderingStart,
    /// Playback audibly/visibly started.
    MediaRenderingStart,
    /// The offloaded audio path died (e.g. routing change); the
    /// coordinator must rebuild the audio chain on the PCM path and resume
    /// from `position_us`.
    AudioOffloadTearDown {
        position_us: i64,
    },
}

/// Video output surface handed to the player by the host application.
pub trait VideoSurface: Send + Sync {
    fn set_scaling_mode(&self, mode: VideoScalingMode) -> Result<(), crate::media::MediaError>;
}
