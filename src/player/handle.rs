//! PlayerHandle - command interface to the player task
//!
//! Cloneable and cheap: every method posts a message onto the player's
//! queue. Commands are fire-and-forget and never block; the track queries
//! are async and await a reply posted back by the player.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::media::{MediaError, PlayerError, TrackInfo, TrackKind, VideoScalingMode};
use crate::renderer::VideoSurface;
use crate::sink::AudioSink;
use crate::source::Source;

use super::messages::{PlayerRequest, SourceNotify};

/// Command interface to a running [`Player`](super::Player).
#[derive(Clone)]
pub struct PlayerHandle {
    tx: mpsc::UnboundedSender<PlayerRequest>,
}

impl PlayerHandle {
    pub(crate) fn new(tx: mpsc::UnboundedSender<PlayerRequest>) -> Self {
        Self { tx }
    }

    fn send(&self, request: PlayerRequest) -> Result<(), PlayerError> {
        self.tx.send(request).map_err(|_| PlayerError::ChannelClosed)
    }

    /// A notify channel for constructing a source bound to this player.
    pub fn source_notify(&self) -> SourceNotify {
        SourceNotify {
            tx: self.tx.clone(),
        }
    }

    /// Hands the player its source. `None` reports the caller's failure to
    /// open one; the driver hears about either outcome through
    /// `notify_set_data_source_completed`.
    pub fn set_data_source(&self, source: Option<Box<dyn Source>>) -> Result<(), PlayerError> {
        self.send(PlayerRequest::SetDataSource { source })
    }

    pub fn prepare(&self) -> Result<(), PlayerError> {
        self.send(PlayerRequest::Prepare)
    }

    /// Rebinds (or clears) the video output surface. The running video
    /// decoder is torn down first and rebuilt against the new surface.
    pub fn set_video_surface(
        &self,
        surface: Option<Arc<dyn VideoSurface>>,
    ) -> Result<(), PlayerError> {
        self.send(PlayerRequest::SetVideoSurface { surface })
    }

    pub fn set_audio_sink(&self, sink: Arc<dyn AudioSink>) -> Result<(), PlayerError> {
        self.send(PlayerRequest::SetAudioSink { sink })
    }

    pub fn set_video_scaling_mode(&self, mode: VideoScalingMode) -> Result<(), PlayerError> {
        self.send(PlayerRequest::SetVideoScalingMode { mode })
    }

    pub fn start(&self) -> Result<(), PlayerError> {
        self.send(PlayerRequest::Start)
    }

    pub fn pause(&self) -> Result<(), PlayerError> {
        self.send(PlayerRequest::Pause)
    }

    pub fn resume(&self) -> Result<(), PlayerError> {
        self.send(PlayerRequest::Resume)
    }

    pub fn seek_to(&self, position_us: i64) -> Result<(), PlayerError> {
        self.send(PlayerRequest::Seek { position_us })
    }

    pub fn reset(&self) -> Result<(), PlayerError> {
        self.send(PlayerRequest::Reset)
    }

    /// All known tracks: the source's in-band tracks followed by
    /// closed-caption tracks.
    pub async fn track_info(&self) -> Result<Vec<TrackInfo>, PlayerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PlayerRequest::GetTrackInfo { reply: reply_tx })?;
        reply_rx.await.map_err(|_| PlayerError::ChannelClosed)
    }

    /// The source's selected track index for a track kind.
    pub async fn selected_track(&self, kind: TrackKind) -> Result<Option<usize>, PlayerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PlayerRequest::GetSelectedTrack {
            kind,
            reply: reply_tx,
        })?;
        let result: Result<Option<usize>, MediaError> =
            reply_rx.await.map_err(|_| PlayerError::ChannelClosed)?;
        Ok(result?)
    }

    /// Selects or deselects a track by its index in the combined track
    /// list (in-band first, then closed-caption).
    pub async fn select_track(&self, index: usize, select: bool) -> Result<(), PlayerError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(PlayerRequest::SelectTrack {
            index,
            select,
            reply: reply_tx,
        })?;
        let result: Result<(), MediaError> =
            reply_rx.await.map_err(|_| PlayerError::ChannelClosed)?;
        Ok(result?)
    }
}
