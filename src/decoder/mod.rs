//! Decoder interface
//!
//! Decoders (hardware, software, or offload pass-through) consume access
//! units and emit decoded buffers. A decoder pulls its input by posting
//! [`DecoderEvent::FillThisBuffer`] and pushes output with
//! [`DecoderEvent::DrainThisBuffer`]; every event it posts carries the
//! generation stamped into its notify channel at instantiation, which is
//! how the coordinator tells live callbacks from those of a torn-down
//! decoder.

use tokio::sync::oneshot;

use bytes::Bytes;

use crate::media::{AccessUnit, DecodedBuffer, MediaError, MediaFormat};

/// Reply to a [`DecoderEvent::FillThisBuffer`] request.
#[derive(Debug)]
pub enum FillResponse {
    Buffer(AccessUnit),
    /// The stream hit a discontinuity (or the request raced a flush);
    /// the decoder should expect a flush or format signal instead of data.
    Discontinuity,
    /// No buffer this time and nothing wrong; the request was consumed by
    /// a transition handled through decoder signals.
    Empty,
    Error(MediaError),
}

/// A stream decoder driven by the coordinator.
///
/// All methods are signal-style: they are called on the coordinator task,
/// must not block, and complete through [`DecoderEvent`] notifications.
pub trait Decoder: Send {
    fn init(&mut self);
    fn configure(&mut self, format: &MediaFormat);

    /// Discards all in-flight buffers; completes with
    /// [`DecoderEvent::FlushCompleted`]. A new input format may accompany
    /// the flush when the timeline break also switched formats.
    fn signal_flush(&mut self, new_format: Option<MediaFormat>);

    /// Resumes input requests after a completed flush.
    fn signal_resume(&mut self);

    /// Begins teardown; completes with [`DecoderEvent::ShutdownCompleted`].
    fn initiate_shutdown(&mut self);

    /// Adopts a new format without flushing (seamless change).
    fn signal_update_format(&mut self, format: MediaFormat);

    fn supports_seamless_format_change(&self, format: &MediaFormat) -> bool;

    /// The decoder's input buffers, for the secure path where the source
    /// must decrypt directly into decoder memory.
    fn input_buffers(&mut self) -> Result<Vec<Bytes>, MediaError>;
}

/// Notifications a decoder posts to the coordinator.
#[derive(Debug)]
pub enum DecoderEvent {
    /// The decoder wants input; answer on `reply`.
    FillThisBuffer {
        reply: oneshot::Sender<FillResponse>,
    },
    /// The decoder produced output; `reply` returns buffer ownership once
    /// the renderer (or the coordinator, when discarding) is done with it.
    DrainThisBuffer {
        buffer: DecodedBuffer,
        reply: oneshot::Sender<()>,
    },
    OutputFormatChanged {
        format: MediaFormat,
    },
    FlushCompleted,
    ShutdownCompleted,
    /// Input side reached end of stream (`EndOfStream`) or a terminal
    /// error propagated from the source.
    Eos {
        error: MediaError,
    },
    Error {
        error: MediaError,
    },
}
