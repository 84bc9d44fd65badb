//! Buffers and in-band signals flowing through the pipeline

use bytes::Bytes;

use super::format::StreamKind;

/// One compressed sample (frame/packet) dequeued from the source.
#[derive(Debug, Clone)]
pub struct AccessUnit {
    pub data: Bytes,
    /// Presentation time in microseconds.
    pub time_us: i64,
    /// Whether other frames predict from this one. Marked by the source
    /// during parsing; the coordinator never inspects the bitstream.
    pub is_reference_frame: bool,
}

impl AccessUnit {
    pub fn new(data: Bytes, time_us: i64) -> Self {
        Self {
            data,
            time_us,
            is_reference_frame: true,
        }
    }
}

/// A decoded buffer handed from a decoder to the renderer.
#[derive(Debug, Clone)]
pub struct DecodedBuffer {
    pub data: Bytes,
    pub time_us: i64,
}

/// An in-band discontinuity signal from the source.
///
/// `audio_format` / `video_format` flag a format change on the respective
/// stream; `time` flags a timeline break. `resume_at_us`, when present on a
/// time change, suppresses rendering of the affected stream until that
/// media time is reached.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discontinuity {
    pub audio_format: bool,
    pub video_format: bool,
    pub time: bool,
    pub resume_at_us: Option<i64>,
}

impl Discontinuity {
    /// A pure timeline break, as produced by seeks.
    pub fn time_change(resume_at_us: Option<i64>) -> Self {
        Self {
            time: true,
            resume_at_us,
            ..Default::default()
        }
    }

    /// Whether this discontinuity changes the format of `kind`.
    pub fn format_change(&self, kind: StreamKind) -> bool {
        match kind {
            StreamKind::Audio => self.audio_format,
            StreamKind::Video => self.video_format,
        }
    }
}

/// Subtitle or closed-caption payload addressed to a track.
#[derive(Debug, Clone)]
pub struct SubtitleData {
    pub track_index: usize,
    pub time_us: i64,
    pub duration_us: i64,
    pub payload: Bytes,
}

impl SubtitleData {
    /// Serializes the packet for delivery to the host application.
    ///
    /// Layout: track index, time, duration as little-endian integers, then
    /// the payload length written twice, then the payload bytes. The
    /// doubled length prefix is a wire-compatibility artifact and must be
    /// preserved bit-for-bit.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(28 + self.payload.len());
        out.extend_from_slice(&(self.track_index as i32).to_le_bytes());
        out.extend_from_slice(&self.time_us.to_le_bytes());
        out.extend_from_slice(&self.duration_us.to_le_bytes());
        out.extend_from_slice(&(self.payload.len() as i32).to_le_bytes());
        out.extend_from_slice(&(self.payload.len() as i32).to_le_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}

/// A timed-text sample awaiting display at `time_us`.
#[derive(Debug, Clone)]
pub struct TimedTextData {
    pub time_us: i64,
    pub payload: Bytes,
}
