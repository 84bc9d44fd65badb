//! Player message types and collaborator notify channels
//!
//! Everything that mutates player state arrives as one [`PlayerRequest`] on
//! the single message queue: external commands posted by the handle,
//! internally re-posted timers, and collaborator notifications. The
//! `*Notify` types are the write half handed to each collaborator;
//! [`DecoderNotify`] additionally stamps every event with the generation
//! current when the decoder was instantiated.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::caption::CaptionEvent;
use crate::decoder::DecoderEvent;
use crate::media::{MediaError, StreamKind, TrackInfo, TrackKind, VideoScalingMode};
use crate::renderer::{RendererEvent, VideoSurface};
use crate::sink::AudioSink;
use crate::source::{Source, SourceEvent};

/// A message handled to completion on the player task.
pub(crate) enum PlayerRequest {
    // External commands
    SetDataSource {
        source: Option<Box<dyn Source>>,
    },
    Prepare,
    SetVideoSurface {
        surface: Option<Arc<dyn VideoSurface>>,
    },
    SetAudioSink {
        sink: Arc<dyn AudioSink>,
    },
    SetVideoScalingMode {
        mode: VideoScalingMode,
    },
    Start,
    Pause,
    Resume,
    Seek {
        position_us: i64,
    },
    Reset,

    // Request/response commands
    GetTrackInfo {
        reply: oneshot::Sender<Vec<TrackInfo>>,
    },
    GetSelectedTrack {
        kind: TrackKind,
        reply: oneshot::Sender<Result<Option<usize>, MediaError>>,
    },
    SelectTrack {
        index: usize,
        select: bool,
        reply: oneshot::Sender<Result<(), MediaError>>,
    },

    // Self-posted timers, invalidated by generation bumps
    ScanSources {
        generation: u32,
    },
    PollDuration {
        generation: u32,
    },

    // Collaborator notifications
    Decoder {
        kind: StreamKind,
        generation: u32,
        event: DecoderEvent,
    },
    Renderer {
        event: RendererEvent,
    },
    Source {
        event: SourceEvent,
    },
    Caption {
        event: CaptionEvent,
    },
}

impl PlayerRequest {
    /// Short name for tracing.
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::SetDataSource { .. } => "set_data_source",
            Self::Prepare => "prepare",
            Self::SetVideoSurface { .. } => "set_video_surface",
            Self::SetAudioSink { .. } => "set_audio_sink",
            Self::SetVideoScalingMode { .. } => "set_video_scaling_mode",
            Self::Start => "start",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Seek { .. } => "seek",
            Self::Reset => "reset",
            Self::GetTrackInfo { .. } => "get_track_info",
            Self::GetSelectedTrack { .. } => "get_selected_track",
            Self::SelectTrack { .. } => "select_track",
            Self::ScanSources { .. } => "scan_sources",
            Self::PollDuration { .. } => "poll_duration",
            Self::Decoder { .. } => "decoder_notify",
            Self::Renderer { .. } => "renderer_notify",
            Self::Source { .. } => "source_notify",
            Self::Caption { .. } => "caption_notify",
        }
    }
}

/// Write half of the player queue for a source.
///
/// Obtained from [`PlayerHandle::source_notify`] and passed to the source
/// at construction. Sends never block; once the player is gone they are
/// silently dropped so a winding-down source cannot error.
///
/// [`PlayerHandle::source_notify`]: super::PlayerHandle::source_notify
#[derive(Clone)]
pub struct SourceNotify {
    pub(crate) tx: mpsc::UnboundedSender<PlayerRequest>,
}

impl SourceNotify {
    pub fn send(&self, event: SourceEvent) {
        let _ = self.tx.send(PlayerRequest::Source { event });
    }
}

/// Write half of the player queue for a decoder, generation-stamped.
///
/// Every event sent through this notify carries the generation assigned at
/// decoder instantiation; the player ignores (or answers with a
/// discontinuity) anything stamped with an older generation.
#[derive(Clone)]
pub struct DecoderNotify {
    pub(crate) tx: mpsc::UnboundedSender<PlayerRequest>,
    pub(crate) kind: StreamKind,
    pub(crate) generation: u32,
}

impl DecoderNotify {
    pub fn send(&self, event: DecoderEvent) {
        let _ = self.tx.send(PlayerRequest::Decoder {
            kind: self.kind,
            generation: self.generation,
            event,
        });
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Write half of the player queue for the renderer.
#[derive(Clone)]
pub struct RendererNotify {
    pub(crate) tx: mpsc::UnboundedSender<PlayerRequest>,
}

impl RendererNotify {
    pub fn send(&self, event: RendererEvent) {
        let _ = self.tx.send(PlayerRequest::Renderer { event });
    }
}

/// Write half of the player queue for the closed-caption decoder.
#[derive(Clone)]
pub struct CaptionNotify {
    pub(crate) tx: mpsc::UnboundedSender<PlayerRequest>,
}

impl CaptionNotify {
    pub fn send(&self, event: CaptionEvent) {
        let _ = self.tx.send(PlayerRequest::Caption { event });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_notify_stamps_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let notify = DecoderNotify {
            tx,
            kind: StreamKind::Audio,
            generation: 7,
        };

        notify.send(DecoderEvent::FlushCompleted);

        match rx.try_recv().unwrap() {
            PlayerRequest::Decoder {
                kind, generation, ..
            } => {
                assert_eq!(kind, StreamKind::Audio);
                assert_eq!(generation, 7);
            }
            other => panic!("unexpected request {}", other.label()),
        }
    }

    #[test]
    fn test_notify_send_after_player_gone_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);

        let notify = SourceNotify { tx };
        notify.send(SourceEvent::BufferingStart);
    }
}
