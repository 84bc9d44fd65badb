//! Audio sink interface and open parameters
//!
//! The sink is the platform audio output. The coordinator owns it
//! exclusively: it closes and re-opens the sink on every transition
//! between the PCM and compressed-offload paths, then tells the renderer
//! the sink changed.

pub mod offload;

use crate::media::{AudioEncoding, AudioStreamType, ChannelMask, MediaError};

/// Output path flags for a sink open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkFlags {
    /// Large output buffer for long, video-less playback.
    pub deep_buffer: bool,
    /// Compressed offload to the sink's hardware decoder.
    pub offload: bool,
}

/// Parameters of a negotiated compressed-offload session.
///
/// Compared against the previous negotiation to skip redundant re-opens.
#[derive(Debug, Clone, PartialEq)]
pub struct OffloadInfo {
    pub sample_rate: u32,
    pub channel_mask: ChannelMask,
    pub encoding: AudioEncoding,
    pub stream_type: AudioStreamType,
    pub bit_rate: Option<u32>,
    pub has_video: bool,
    pub is_streaming: bool,
    pub duration_us: Option<i64>,
}

/// Everything a sink needs to open an output stream.
#[derive(Debug, Clone)]
pub struct SinkParams {
    pub sample_rate: u32,
    pub channel_count: u32,
    pub channel_mask: ChannelMask,
    pub encoding: AudioEncoding,
    pub buffer_count: u32,
    /// Offload mode: the sink pulls data through the renderer's callback
    /// instead of being pushed PCM.
    pub renderer_callback: bool,
    pub flags: SinkFlags,
    /// Present iff opening in offload mode; carries the codec metadata the
    /// hardware decoder needs.
    pub offload_info: Option<OffloadInfo>,
}

/// Platform audio output owned by the coordinator.
pub trait AudioSink: Send + Sync {
    fn open(&self, params: SinkParams) -> Result<(), MediaError>;
    fn start(&self) -> Result<(), MediaError>;
    fn close(&self);
    fn stream_type(&self) -> AudioStreamType;
}
