//! Playback coordinator task
//!
//! [`Player`] owns the source, decoders, renderer, audio sink, and surface,
//! and mutates them only from its own task while draining the message
//! queue. External callers talk to it through [`PlayerHandle`]; every
//! collaborator talks back through a notify channel. Transitions that must
//! wait for in-flight decoder flushes (seek, surface change, teardown,
//! reset) go through the deferred-action queue, which advances only while
//! both streams' flush statuses are settled.
//!
//! [`PlayerHandle`]: super::PlayerHandle

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::backend::{Backend, DecoderSpec};
use crate::caption::{CaptionDecoder, CaptionEvent};
use crate::config::PlayerConfig;
use crate::decoder::{Decoder, DecoderEvent, FillResponse};
use crate::driver::{Driver, ListenerEvent};
use crate::media::{
    display_dimensions, AudioEncoding, DecodedBuffer, Discontinuity, MediaError, MediaFormat,
    SourceFlags, StreamKind, TimedTextData, TrackKind, VideoScalingMode,
};
use crate::renderer::{Renderer, RendererEvent, RendererFlags, VideoSurface};
use crate::sink::{offload, AudioSink, OffloadInfo, SinkFlags, SinkParams};
use crate::source::{Dequeue, Source, SourceEvent};

use super::actions::DeferredAction;
use super::flush::FlushStatus;
use super::handle::PlayerHandle;
use super::messages::{CaptionNotify, DecoderNotify, PlayerRequest, RendererNotify};

/// Outcome of answering one decoder input request.
enum FeedOutcome {
    /// The reply was sent (buffer, discontinuity, or error).
    Handled,
    /// The source had nothing buffered; the request (with its reply) must
    /// be re-posted once the source has been fed.
    WouldBlock(oneshot::Sender<FillResponse>),
}

/// Outcome of digesting an in-band discontinuity for one stream.
enum DiscontinuityOutcome {
    Reply(FillResponse),
    /// This stream is unaffected; treat the dequeue as would-block.
    Unaffected,
}

/// The playback coordinator.
///
/// Construct with [`Player::new`], wire the host with [`Player::set_driver`],
/// grab a [`PlayerHandle`], then spawn [`Player::run`] on the runtime.
pub struct Player {
    config: PlayerConfig,
    tx: mpsc::UnboundedSender<PlayerRequest>,
    rx: mpsc::UnboundedReceiver<PlayerRequest>,
    driver: Option<Weak<dyn Driver>>,
    backend: Box<dyn Backend>,

    source: Option<Box<dyn Source>>,
    source_flags: SourceFlags,
    audio_decoder: Option<Box<dyn Decoder>>,
    video_decoder: Option<Box<dyn Decoder>>,
    audio_decoder_generation: u32,
    video_decoder_generation: u32,
    caption_decoder: Option<Box<dyn CaptionDecoder>>,
    renderer: Option<Box<dyn Renderer>>,
    audio_sink: Option<Arc<dyn AudioSink>>,
    surface: Option<Arc<dyn VideoSurface>>,

    offload_audio: bool,
    current_offload_info: Option<OffloadInfo>,

    flushing_audio: FlushStatus,
    flushing_video: FlushStatus,
    deferred_actions: VecDeque<DeferredAction>,

    scan_sources_pending: bool,
    scan_sources_generation: u32,
    poll_duration_generation: u32,
    timed_text_generation: u32,

    current_position_us: i64,
    video_late_by_us: i64,
    audio_eos: bool,
    video_eos: bool,
    skip_rendering_audio_until_us: Option<i64>,
    skip_rendering_video_until_us: Option<i64>,
    time_discontinuity_pending: bool,
    num_frames_total: u64,
    num_frames_dropped: u64,
    video_scaling_mode: VideoScalingMode,
    video_is_avc: bool,
    started: bool,
}

impl Player {
    pub fn new(config: PlayerConfig, backend: Box<dyn Backend>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            tx,
            rx,
            driver: None,
            backend,
            source: None,
            source_flags: SourceFlags::default(),
            audio_decoder: None,
            video_decoder: None,
            audio_decoder_generation: 0,
            video_decoder_generation: 0,
            caption_decoder: None,
            renderer: None,
            audio_sink: None,
            surface: None,
            offload_audio: false,
            current_offload_info: None,
            flushing_audio: FlushStatus::None,
            flushing_video: FlushStatus::None,
            deferred_actions: VecDeque::new(),
            scan_sources_pending: false,
            scan_sources_generation: 0,
            poll_duration_generation: 0,
            timed_text_generation: 0,
            current_position_us: 0,
            video_late_by_us: 0,
            audio_eos: false,
            video_eos: false,
            skip_rendering_audio_until_us: None,
            skip_rendering_video_until_us: None,
            time_discontinuity_pending: false,
            num_frames_total: 0,
            num_frames_dropped: 0,
            video_scaling_mode: VideoScalingMode::default(),
            video_is_avc: false,
            started: false,
        }
    }

    /// Binds the host application. Held weakly: notifications promote on
    /// use and fall silent once the host is gone.
    pub fn set_driver(&mut self, driver: Weak<dyn Driver>) {
        self.driver = Some(driver);
    }

    /// A cloneable command interface to this player.
    pub fn handle(&self) -> PlayerHandle {
        PlayerHandle::new(self.tx.clone())
    }

    /// Runs the coordinator until every handle and notify channel is gone.
    pub async fn run(mut self) {
        info!("player started");

        while let Some(request) = self.rx.recv().await {
            debug!(request = request.label(), "handling request");
            self.on_request(request);
        }

        info!("player stopped");
    }

    fn on_request(&mut self, request: PlayerRequest) {
        match request {
            PlayerRequest::SetDataSource { source } => self.on_set_data_source(source),
            PlayerRequest::Prepare => self.on_prepare(),
            PlayerRequest::SetVideoSurface { surface } => self.on_set_video_surface(surface),
            PlayerRequest::SetAudioSink { sink } => {
                debug!("audio sink set");
                self.audio_sink = Some(sink);
            }
            PlayerRequest::SetVideoScalingMode { mode } => self.on_set_video_scaling_mode(mode),
            PlayerRequest::Start => self.on_start(),
            PlayerRequest::Pause => self.on_pause(),
            PlayerRequest::Resume => self.on_resume(),
            PlayerRequest::Seek { position_us } => self.on_seek(position_us),
            PlayerRequest::Reset => self.on_reset(),
            PlayerRequest::GetTrackInfo { reply } => self.on_get_track_info(reply),
            PlayerRequest::GetSelectedTrack { kind, reply } => {
                self.on_get_selected_track(kind, reply)
            }
            PlayerRequest::SelectTrack {
                index,
                select,
                reply,
            } => self.on_select_track(index, select, reply),
            PlayerRequest::ScanSources { generation } => self.on_scan_sources(generation),
            PlayerRequest::PollDuration { generation } => self.on_poll_duration(generation),
            PlayerRequest::Decoder {
                kind,
                generation,
                event,
            } => self.on_decoder_event(kind, generation, event),
            PlayerRequest::Renderer { event } => self.on_renderer_event(event),
            PlayerRequest::Source { event } => self.on_source_event(event),
            PlayerRequest::Caption { event } => self.on_caption_event(event),
        }
    }

    // ---------------------------------------------------------------------
    // External commands

    fn on_set_data_source(&mut self, source: Option<Box<dyn Source>>) {
        debug!(present = source.is_some(), "set data source");

        if self.source.is_some() {
            error!("data source already set");
            debug_assert!(false, "data source already set");
        }

        let result = match source {
            Some(source) => {
                self.source = Some(source);
                Ok(())
            }
            None => Err(MediaError::Unknown(0)),
        };

        if let Some(driver) = self.driver() {
            driver.notify_set_data_source_completed(result);
        }
    }

    fn on_prepare(&mut self) {
        match self.source.as_mut() {
            Some(source) => source.prepare(),
            None => {
                warn!("prepare without a data source");
                if let Some(driver) = self.driver() {
                    driver.notify_prepare_completed(Err(MediaError::InvalidOperation));
                }
            }
        }
    }

    fn on_set_video_surface(&mut self, surface: Option<Arc<dyn VideoSurface>>) {
        debug!(present = surface.is_some(), "set video surface");

        self.deferred_actions.push_back(DeferredAction::ShutdownDecoders {
            audio: false,
            video: true,
        });

        let rebind = surface.is_some();
        self.deferred_actions.push_back(DeferredAction::SetSurface { surface });

        if rebind {
            // A fresh surface needs the video decoder rebuilt at the
            // current position.
            self.deferred_actions.push_back(DeferredAction::Seek {
                position_us: self.current_position_us,
            });
            self.deferred_actions.push_back(DeferredAction::Scan);
        }

        self.process_deferred_actions();
    }

    fn on_set_video_scaling_mode(&mut self, mode: VideoScalingMode) {
        self.video_scaling_mode = mode;
        if let Some(surface) = self.surface.as_ref()
            && let Err(error) = surface.set_scaling_mode(mode)
        {
            warn!(%error, "failed to apply video scaling mode");
        }
    }

    fn on_start(&mut self) {
        debug!("start");

        self.video_is_avc = false;
        self.offload_audio = false;
        self.audio_eos = false;
        self.video_eos = false;
        self.skip_rendering_audio_until_us = None;
        self.skip_rendering_video_until_us = None;
        self.video_late_by_us = 0;
        self.num_frames_total = 0;
        self.num_frames_dropped = 0;
        self.started = true;

        if self.source.is_none() {
            warn!("start without a data source");
            return;
        }

        // Secure content cannot wait for the scan loop: the source needs
        // the decoders' protected input buffers before the first dequeue.
        if self.source_flags.secure {
            if self.surface.is_some()
                && let Err(error) = self.instantiate_decoder(StreamKind::Video)
            {
                warn!(%error, "secure video decoder instantiation failed");
            }
            if self.audio_sink.is_some()
                && let Err(error) = self.instantiate_decoder(StreamKind::Audio)
            {
                warn!(%error, "secure audio decoder instantiation failed");
            }
        }

        let Some(source) = self.source.as_mut() else {
            return;
        };
        source.start();
        let real_time = source.is_real_time();
        let audio_format = source.format(StreamKind::Audio);
        let has_video = source.format(StreamKind::Video).is_some();

        let stream_type = self
            .audio_sink
            .as_ref()
            .map(|sink| sink.stream_type())
            .unwrap_or_default();

        self.offload_audio = audio_format
            .as_ref()
            .map(|format| offload::can_offload(format, has_video, true, stream_type))
            .unwrap_or(false);

        let flags = RendererFlags {
            real_time,
            offload_audio: self.offload_audio,
        };
        info!(?flags, "starting playback");

        let notify = RendererNotify { tx: self.tx.clone() };
        self.renderer = Some(
            self.backend
                .create_renderer(self.audio_sink.clone(), flags, notify),
        );

        self.post_scan_sources();
    }

    fn on_pause(&mut self) {
        if self.renderer.is_none() {
            warn!("pause without renderer");
            return;
        }
        if let Some(source) = self.source.as_mut() {
            source.pause();
        }
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.pause();
        }
    }

    fn on_resume(&mut self) {
        if self.renderer.is_none() {
            warn!("resume without renderer");
            return;
        }
        if let Some(source) = self.source.as_mut() {
            source.resume();
        }
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.resume();
        }
    }

    fn on_seek(&mut self, position_us: i64) {
        debug!(position_us, "seek requested");

        self.deferred_actions.push_back(DeferredAction::Flush);
        self.deferred_actions.push_back(DeferredAction::Seek { position_us });

        self.process_deferred_actions();
    }

    fn on_reset(&mut self) {
        debug!("reset requested");

        self.deferred_actions.push_back(DeferredAction::ShutdownDecoders {
            audio: true,
            video: true,
        });
        self.deferred_actions.push_back(DeferredAction::Reset);

        self.process_deferred_actions();
    }

    // ---------------------------------------------------------------------
    // Track queries

    fn on_get_track_info(&mut self, reply: oneshot::Sender<Vec<crate::media::TrackInfo>>) {
        let mut tracks = Vec::new();

        if let Some(source) = self.source.as_mut() {
            let inband = source.track_count();
            for index in 0..inband {
                if let Some(info) = source.track_info(index) {
                    tracks.push(info);
                }
            }
        }

        if let Some(caption) = self.caption_decoder.as_ref() {
            for index in 0..caption.track_count() {
                if let Some(info) = caption.track_info(index) {
                    tracks.push(info);
                }
            }
        }

        let _ = reply.send(tracks);
    }

    fn on_get_selected_track(
        &mut self,
        kind: TrackKind,
        reply: oneshot::Sender<Result<Option<usize>, MediaError>>,
    ) {
        let result = match self.source.as_mut() {
            Some(source) => Ok(source.selected_track(kind)),
            None => Err(MediaError::InvalidOperation),
        };
        let _ = reply.send(result);
    }

    fn on_select_track(
        &mut self,
        index: usize,
        select: bool,
        reply: oneshot::Sender<Result<(), MediaError>>,
    ) {
        let inband = self
            .source
            .as_mut()
            .map(|source| source.track_count())
            .unwrap_or(0);

        let result = if index < inband {
            match self.source.as_mut() {
                Some(source) => {
                    let result = source.select_track(index, select);
                    if !select
                        && result.is_ok()
                        && source
                            .track_info(index)
                            .map(|info| info.kind == TrackKind::TimedText)
                            .unwrap_or(false)
                    {
                        // Deselecting timed text invalidates any sample
                        // still waiting on its display time.
                        self.timed_text_generation += 1;
                    }
                    result
                }
                None => Err(MediaError::InvalidOperation),
            }
        } else {
            let caption_index = index - inband;
            match self.caption_decoder.as_mut() {
                Some(caption) if caption_index < caption.track_count() => {
                    caption.select_track(caption_index, select)
                }
                _ => Err(MediaError::InvalidOperation),
            }
        };

        let _ = reply.send(result);
    }

    // ---------------------------------------------------------------------
    // Source scanning and decoder instantiation

    fn post_scan_sources(&mut self) {
        if self.scan_sources_pending {
            return;
        }
        self.post(PlayerRequest::ScanSources {
            generation: self.scan_sources_generation,
        });
        self.scan_sources_pending = true;
    }

    fn on_scan_sources(&mut self, generation: u32) {
        if generation != self.scan_sources_generation {
            debug!(generation, current = self.scan_sources_generation, "dropping stale scan");
            return;
        }
        self.scan_sources_pending = false;

        debug!(
            have_audio = self.audio_decoder.is_some(),
            have_video = self.video_decoder.is_some(),
            "scanning sources"
        );

        let had_any = self.audio_decoder.is_some() || self.video_decoder.is_some();

        // Video first: its presence decides the audio deep-buffer mode.
        if self.surface.is_some()
            && let Err(error) = self.instantiate_decoder(StreamKind::Video)
        {
            warn!(%error, "video decoder instantiation failed");
        }

        if self.audio_sink.is_some() {
            if self.offload_audio {
                // Offload opens the sink up front from the source format.
                let format = self
                    .source
                    .as_mut()
                    .and_then(|source| source.format(StreamKind::Audio));
                if let Some(format) = format {
                    self.open_audio_sink(&format, true);
                }
            }
            if let Err(error) = self.instantiate_decoder(StreamKind::Audio) {
                warn!(%error, "audio decoder instantiation failed");
            }
        }

        if !had_any
            && (self.audio_decoder.is_some() || self.video_decoder.is_some())
            && self.source_flags.dynamic_duration
        {
            self.schedule_poll_duration();
        }

        let feed = match self.source.as_mut() {
            Some(source) => source.feed_more_data(),
            None => return,
        };
        if let Err(error) = feed {
            if self.audio_decoder.is_none() && self.video_decoder.is_none() {
                // Nothing decodable was found and the input ran out.
                if error == MediaError::EndOfStream {
                    self.notify_listener(ListenerEvent::PlaybackComplete);
                } else {
                    self.notify_listener(ListenerEvent::Error { error });
                }
            }
            return;
        }

        if (self.audio_decoder.is_none() && self.audio_sink.is_some())
            || (self.video_decoder.is_none() && self.surface.is_some())
        {
            self.post_delayed(
                PlayerRequest::ScanSources { generation },
                self.config.scan_retry(),
            );
            self.scan_sources_pending = true;
        }
    }

    /// Creates the decoder for `kind` if its format is known.
    ///
    /// `Ok(false)` means the source has not determined the format yet and
    /// the caller's retry loop should come back.
    fn instantiate_decoder(&mut self, kind: StreamKind) -> Result<bool, MediaError> {
        if self.decoder_mut(kind).is_some() {
            return Ok(true);
        }

        let Some(source) = self.source.as_mut() else {
            return Ok(false);
        };
        let Some(mut format) = source.format(kind) else {
            return Ok(false);
        };

        if kind == StreamKind::Video {
            self.video_is_avc = format.is_avc();
            let caption_notify = CaptionNotify { tx: self.tx.clone() };
            self.caption_decoder = Some(self.backend.create_caption_decoder(caption_notify));
            if self.source_flags.secure {
                format.secure = true;
            }
        }

        let generation = match kind {
            StreamKind::Audio => {
                self.audio_decoder_generation += 1;
                self.audio_decoder_generation
            }
            StreamKind::Video => {
                self.video_decoder_generation += 1;
                self.video_decoder_generation
            }
        };
        let notify = DecoderNotify {
            tx: self.tx.clone(),
            kind,
            generation,
        };
        let spec = DecoderSpec {
            pass_through: kind == StreamKind::Audio && self.offload_audio,
            surface: match kind {
                StreamKind::Video => self.surface.clone(),
                StreamKind::Audio => None,
            },
        };

        info!(
            stream = %kind,
            generation,
            pass_through = spec.pass_through,
            mime = %format.mime,
            "instantiating decoder"
        );

        let mut decoder = self.backend.create_decoder(kind, spec, notify);
        decoder.init();
        decoder.configure(&format);
        *self.decoder_slot(kind) = Some(decoder);

        if kind == StreamKind::Video && self.source_flags.secure {
            let buffers = match self.decoder_mut(kind) {
                Some(decoder) => decoder.input_buffers()?,
                None => Vec::new(),
            };
            if let Some(source) = self.source.as_mut()
                && let Err(error) = source.set_buffers(StreamKind::Video, buffers)
            {
                error!(%error, "secure source rejected decoder input buffers");
                return Err(error);
            }
        }

        Ok(true)
    }

    fn schedule_poll_duration(&mut self) {
        self.post(PlayerRequest::PollDuration {
            generation: self.poll_duration_generation,
        });
    }

    fn cancel_poll_duration(&mut self) {
        self.poll_duration_generation += 1;
    }

    fn on_poll_duration(&mut self, generation: u32) {
        if generation != self.poll_duration_generation {
            debug!("dropping stale duration poll");
            return;
        }

        let duration = self.source.as_mut().and_then(|source| source.duration_us());
        if let (Some(driver), Some(duration_us)) = (self.driver(), duration) {
            driver.notify_duration(duration_us);
        }

        self.post_delayed(
            PlayerRequest::PollDuration { generation },
            self.config.poll_duration_interval(),
        );
    }

    // ---------------------------------------------------------------------
    // Decoder notifications

    fn on_decoder_event(&mut self, kind: StreamKind, generation: u32, event: DecoderEvent) {
        let current = match kind {
            StreamKind::Audio => self.audio_decoder_generation,
            StreamKind::Video => self.video_decoder_generation,
        };
        if generation != current {
            debug!(
                stream = %kind,
                generation,
                current,
                "notification from torn-down decoder"
            );
            // Answer any enclosed reply so the old decoder can wind down.
            match event {
                DecoderEvent::FillThisBuffer { reply } => {
                    let _ = reply.send(FillResponse::Discontinuity);
                }
                DecoderEvent::DrainThisBuffer { reply, .. } => {
                    let _ = reply.send(());
                }
                _ => {}
            }
            return;
        }

        match event {
            DecoderEvent::FillThisBuffer { reply } => {
                match self.feed_decoder_input_data(kind, reply) {
                    FeedOutcome::Handled => {}
                    FeedOutcome::WouldBlock(reply) => {
                        let fed = self
                            .source
                            .as_mut()
                            .map(|source| source.feed_more_data());
                        if let Some(Ok(())) = fed {
                            self.post_delayed(
                                PlayerRequest::Decoder {
                                    kind,
                                    generation,
                                    event: DecoderEvent::FillThisBuffer { reply },
                                },
                                self.config.feed_retry(),
                            );
                        }
                    }
                }
            }
            DecoderEvent::Eos { error } => {
                if error == MediaError::EndOfStream {
                    debug!(stream = %kind, "decoder reached end of stream");
                } else {
                    warn!(stream = %kind, %error, "decoder end of stream with error");
                }
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.queue_eos(kind, error);
                }
            }
            DecoderEvent::FlushCompleted => self.on_decoder_flush_completed(kind),
            DecoderEvent::OutputFormatChanged { format } => match kind {
                StreamKind::Audio => self.open_audio_sink(&format, false),
                StreamKind::Video => {
                    let input = self
                        .source
                        .as_mut()
                        .and_then(|source| source.format(StreamKind::Video));
                    self.update_video_size(input.as_ref(), Some(&format));
                }
            },
            DecoderEvent::ShutdownCompleted => self.on_decoder_shutdown_completed(kind),
            DecoderEvent::Error { error } => {
                error!(stream = %kind, %error, "decoder error, aborting playback of stream");
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.queue_eos(kind, error);
                }
                if self.flushing(kind) != FlushStatus::None {
                    *self.decoder_slot(kind) = None;
                    *self.flushing_mut(kind) = FlushStatus::ShutDown;
                }
                self.finish_flush_if_possible();
            }
            DecoderEvent::DrainThisBuffer { buffer, reply } => {
                self.render_buffer(kind, buffer, reply)
            }
        }
    }

    fn on_decoder_flush_completed(&mut self, kind: StreamKind) {
        let status = self.flushing(kind);
        let Some(needs_shutdown) = status.flushing_needs_shutdown() else {
            error!(stream = %kind, state = %status, "flush completed while not flushing");
            debug_assert!(false, "flush completed while not flushing");
            return;
        };

        *self.flushing_mut(kind) = FlushStatus::Flushed;
        if kind == StreamKind::Video {
            self.video_late_by_us = 0;
        }
        debug!(stream = %kind, "decoder flush completed");

        if needs_shutdown {
            debug!(stream = %kind, "initiating decoder shutdown");
            if let Some(decoder) = self.decoder_mut(kind) {
                decoder.initiate_shutdown();
            }
            *self.flushing_mut(kind) = FlushStatus::ShuttingDownDecoder;
        }

        self.finish_flush_if_possible();
    }

    fn on_decoder_shutdown_completed(&mut self, kind: StreamKind) {
        *self.decoder_slot(kind) = None;

        let status = self.flushing(kind);
        if status != FlushStatus::ShuttingDownDecoder {
            error!(stream = %kind, state = %status, "shutdown completed in unexpected state");
            debug_assert!(false, "shutdown completed in unexpected state");
        }
        *self.flushing_mut(kind) = FlushStatus::ShutDown;
        debug!(stream = %kind, "decoder shutdown completed");

        self.finish_flush_if_possible();
    }

    /// Answers one decoder input request from the source.
    fn feed_decoder_input_data(
        &mut self,
        kind: StreamKind,
        reply: oneshot::Sender<FillResponse>,
    ) -> FeedOutcome {
        if self.flushing(kind) != FlushStatus::None {
            let _ = reply.send(FillResponse::Discontinuity);
            return FeedOutcome::Handled;
        }

        loop {
            let Some(source) = self.source.as_mut() else {
                let _ = reply.send(FillResponse::Error(MediaError::InvalidOperation));
                return FeedOutcome::Handled;
            };

            match source.dequeue_access_unit(kind) {
                Dequeue::WouldBlock => return FeedOutcome::WouldBlock(reply),
                Dequeue::Discontinuity(discontinuity) => {
                    match self.handle_input_discontinuity(kind, discontinuity) {
                        DiscontinuityOutcome::Reply(response) => {
                            let _ = reply.send(response);
                            return FeedOutcome::Handled;
                        }
                        DiscontinuityOutcome::Unaffected => {
                            return FeedOutcome::WouldBlock(reply)
                        }
                    }
                }
                Dequeue::Error(error) => {
                    let _ = reply.send(FillResponse::Error(error));
                    return FeedOutcome::Handled;
                }
                Dequeue::Buffer(unit) => {
                    if kind == StreamKind::Video {
                        self.num_frames_total += 1;

                        let drop_unit = !self.source_flags.secure
                            && self.video_late_by_us > self.config.video_late_threshold_us
                            && self.video_is_avc
                            && !unit.is_reference_frame;
                        if drop_unit {
                            self.num_frames_dropped += 1;
                            debug!(
                                time_us = unit.time_us,
                                late_by_us = self.video_late_by_us,
                                "dropping late non-reference video unit"
                            );
                            continue;
                        }

                        if let Some(caption) = self.caption_decoder.as_mut() {
                            caption.decode(&unit);
                        }
                    }

                    let _ = reply.send(FillResponse::Buffer(unit));
                    return FeedOutcome::Handled;
                }
            }
        }
    }

    fn handle_input_discontinuity(
        &mut self,
        kind: StreamKind,
        discontinuity: Discontinuity,
    ) -> DiscontinuityOutcome {
        let mut format_change = discontinuity.format_change(kind);
        let time_change = discontinuity.time;
        info!(stream = %kind, format_change, time_change, "input discontinuity");

        *self.skip_until_mut(kind) = None;
        if time_change && let Some(resume_at_us) = discontinuity.resume_at_us {
            info!(stream = %kind, resume_at_us, "suppressing rendering until resume point");
            *self.skip_until_mut(kind) = Some(resume_at_us);
        }

        self.time_discontinuity_pending = self.time_discontinuity_pending || time_change;

        let new_format = self
            .source
            .as_mut()
            .and_then(|source| source.format(kind));

        let mut seamless = false;
        if format_change {
            let decoder = match kind {
                StreamKind::Audio => self.audio_decoder.as_ref(),
                StreamKind::Video => self.video_decoder.as_ref(),
            };
            if let (Some(decoder), Some(format)) = (decoder, new_format.as_ref()) {
                seamless = decoder.supports_seamless_format_change(format);
            }
            format_change = !seamless;
        }

        let shutdown_or_flush = format_change || time_change;

        // Queue one rescan per discontinuity: once the first affected
        // stream starts flushing, its status is no longer NONE and later
        // streams of the same discontinuity skip this.
        if self.flushing_audio == FlushStatus::None
            && self.flushing_video == FlushStatus::None
            && shutdown_or_flush
        {
            self.deferred_actions.push_front(DeferredAction::Scan);
        }

        if format_change {
            // Non-seamless format change: the decoder must be replaced.
            self.flush_decoder(kind, true, None);
            DiscontinuityOutcome::Reply(FillResponse::Discontinuity)
        } else if time_change {
            self.flush_decoder(kind, false, new_format);
            DiscontinuityOutcome::Reply(FillResponse::Empty)
        } else if seamless {
            self.update_decoder_format_without_flush(kind, new_format);
            DiscontinuityOutcome::Reply(FillResponse::Empty)
        } else {
            DiscontinuityOutcome::Unaffected
        }
    }

    /// Forwards a drained buffer to the renderer, honoring flushes and
    /// post-seek skip windows.
    fn render_buffer(&mut self, kind: StreamKind, buffer: DecodedBuffer, done: oneshot::Sender<()>) {
        if self.flushing(kind) != FlushStatus::None {
            // The decoder wants all buffers back to complete the flush;
            // nothing from before the flush may reach the renderer.
            let _ = done.send(());
            return;
        }

        let time_us = buffer.time_us;
        if let Some(skip_until_us) = *self.skip_until_mut(kind) {
            if time_us < skip_until_us {
                debug!(stream = %kind, time_us, skip_until_us, "dropping buffer before resume point");
                let _ = done.send(());
                return;
            }
            *self.skip_until_mut(kind) = None;
        }

        if kind == StreamKind::Video
            && let Some(caption) = self.caption_decoder.as_mut()
            && caption.is_selected()
        {
            caption.display(time_us);
        }

        match self.renderer.as_mut() {
            Some(renderer) => renderer.queue_buffer(kind, buffer, done),
            None => {
                let _ = done.send(());
            }
        }
    }

    // ---------------------------------------------------------------------
    // Renderer notifications

    fn on_renderer_event(&mut self, event: RendererEvent) {
        match event {
            RendererEvent::Eos { kind, final_result } => {
                match kind {
                    StreamKind::Audio => self.audio_eos = true,
                    StreamKind::Video => self.video_eos = true,
                }

                if final_result == MediaError::EndOfStream {
                    debug!(stream = %kind, "stream playback complete");
                } else {
                    error!(stream = %kind, error = %final_result, "stream terminated with error");
                    self.notify_listener(ListenerEvent::Error { error: final_result });
                }

                if (self.audio_eos || self.audio_decoder.is_none())
                    && (self.video_eos || self.video_decoder.is_none())
                {
                    self.notify_listener(ListenerEvent::PlaybackComplete);
                }
            }
            RendererEvent::Position {
                position_us,
                video_late_by_us,
            } => {
                self.current_position_us = position_us;
                self.video_late_by_us = video_late_by_us;
                if let Some(driver) = self.driver() {
                    driver.notify_position(position_us);
                    driver.notify_frame_stats(self.num_frames_total, self.num_frames_dropped);
                }
            }
            RendererEvent::FlushComplete { kind } => {
                debug!(stream = %kind, "renderer flush completed");
            }
            RendererEvent::VideoRenderingStart => {
                self.notify_listener(ListenerEvent::VideoRenderingStart);
            }
            RendererEvent::MediaRenderingStart => {
                debug!("media rendering started");
                self.notify_listener(ListenerEvent::Started);
            }
            RendererEvent::AudioOffloadTearDown { position_us } => {
                info!(position_us, "audio offload torn down, falling back to PCM");

                self.close_audio_sink();
                self.audio_decoder = None;

                let has_video = self.video_decoder.is_some();
                if let Some(renderer) = self.renderer.as_mut() {
                    renderer.flush(StreamKind::Audio);
                    if has_video {
                        renderer.flush(StreamKind::Video);
                    }
                    renderer.signal_disable_offload_audio();
                }
                self.offload_audio = false;

                self.perform_seek(position_us);
                if let Err(error) = self.instantiate_decoder(StreamKind::Audio) {
                    warn!(%error, "audio decoder re-instantiation failed after offload teardown");
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Source notifications

    fn on_source_event(&mut self, event: SourceEvent) {
        match event {
            SourceEvent::Prepared { result } => {
                if self.source.is_none() {
                    // The source was reset away while preparing.
                    debug!("ignoring stale prepared notification");
                    return;
                }
                let duration = self.source.as_mut().and_then(|source| source.duration_us());
                if let Some(driver) = self.driver() {
                    // Duration first, so it is set by the time the
                    // application sees prepare-completed.
                    if let Some(duration_us) = duration {
                        driver.notify_duration(duration_us);
                    }
                    driver.notify_prepare_completed(result);
                }
            }
            SourceEvent::FlagsChanged { flags } => {
                debug!(?flags, "source flags changed");
                if let Some(driver) = self.driver() {
                    driver.notify_flags_changed(flags);
                }

                let had_dynamic = self.source_flags.dynamic_duration;
                if had_dynamic && !flags.dynamic_duration {
                    self.cancel_poll_duration();
                } else if !had_dynamic
                    && flags.dynamic_duration
                    && (self.audio_decoder.is_some() || self.video_decoder.is_some())
                {
                    self.schedule_poll_duration();
                }

                self.source_flags = flags;
            }
            SourceEvent::VideoSizeChanged { format } => {
                self.update_video_size(Some(&format), None);
            }
            SourceEvent::BufferingUpdate { percent } => {
                self.notify_listener(ListenerEvent::BufferingUpdate { percent });
            }
            SourceEvent::BufferingStart => {
                self.notify_listener(ListenerEvent::BufferingStart);
            }
            SourceEvent::BufferingEnd => {
                self.notify_listener(ListenerEvent::BufferingEnd);
            }
            SourceEvent::SubtitleData { data } => {
                self.notify_listener(ListenerEvent::Subtitle { data });
            }
            SourceEvent::TimedTextData { data, generation } => {
                self.on_timed_text(data, generation);
            }
            SourceEvent::QueueDecoderShutdown { audio, video, done } => {
                self.queue_decoder_shutdown(audio, video, done);
            }
            SourceEvent::DrmNoLicense => {
                self.notify_listener(ListenerEvent::Error {
                    error: MediaError::DrmNoLicense,
                });
            }
        }
    }

    fn on_timed_text(&mut self, data: TimedTextData, generation: Option<u32>) {
        if let Some(generation) = generation
            && generation != self.timed_text_generation
        {
            debug!(
                generation,
                current = self.timed_text_generation,
                "dropping stale timed text"
            );
            return;
        }

        let position_us = self.current_position_us;
        if position_us < data.time_us {
            // Not due yet; re-post stamped with the current generation so
            // a seek or track deselection in the meantime kills it.
            let delay = Duration::from_micros((data.time_us - position_us) as u64);
            self.post_delayed(
                PlayerRequest::Source {
                    event: SourceEvent::TimedTextData {
                        data,
                        generation: Some(self.timed_text_generation),
                    },
                },
                delay,
            );
        } else if data.payload.is_empty() {
            self.notify_listener(ListenerEvent::TimedText { data: None });
        } else {
            self.notify_listener(ListenerEvent::TimedText { data: Some(data) });
        }
    }

    fn queue_decoder_shutdown(&mut self, audio: bool, video: bool, done: oneshot::Sender<()>) {
        info!(audio, video, "source requested decoder shutdown");

        self.deferred_actions
            .push_back(DeferredAction::ShutdownDecoders { audio, video });
        self.deferred_actions.push_back(DeferredAction::Scan);
        self.deferred_actions.push_back(DeferredAction::Reply(done));

        self.process_deferred_actions();
    }

    // ---------------------------------------------------------------------
    // Caption notifications

    fn on_caption_event(&mut self, event: CaptionEvent) {
        match event {
            CaptionEvent::Data { mut data } => {
                // Caption tracks are indexed after the source's in-band
                // tracks in the track list the application sees.
                let inband = self
                    .source
                    .as_mut()
                    .map(|source| source.track_count())
                    .unwrap_or(0);
                data.track_index += inband;
                self.notify_listener(ListenerEvent::Subtitle { data });
            }
            CaptionEvent::TrackAdded => {
                self.notify_listener(ListenerEvent::MetadataUpdate);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Flush machinery

    fn flush_decoder(
        &mut self,
        kind: StreamKind,
        needs_shutdown: bool,
        new_format: Option<MediaFormat>,
    ) {
        if self.decoder_mut(kind).is_none() {
            info!(stream = %kind, "flush requested without decoder present");
            return;
        }

        // No source scanning until this flush settles.
        self.scan_sources_generation += 1;
        self.scan_sources_pending = false;

        if let Some(decoder) = self.decoder_mut(kind) {
            decoder.signal_flush(new_format);
        }
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.flush(kind);
        }

        let new_status = if needs_shutdown {
            FlushStatus::FlushingDecoderShutdown
        } else {
            FlushStatus::FlushingDecoder
        };
        let previous = self.flushing(kind);
        if previous != FlushStatus::None {
            error!(stream = %kind, state = %previous, "flush requested while already flushing");
        }
        *self.flushing_mut(kind) = new_status;
        debug!(stream = %kind, needs_shutdown, "decoder flush initiated");
    }

    fn update_decoder_format_without_flush(
        &mut self,
        kind: StreamKind,
        format: Option<MediaFormat>,
    ) {
        let Some(decoder) = self.decoder_mut(kind) else {
            info!(stream = %kind, "format update requested without decoder present");
            return;
        };
        if let Some(format) = format {
            debug!(stream = %kind, "seamless format update");
            decoder.signal_update_format(format);
        }
    }

    /// Settles a completed flush round: once neither stream is mid
    /// transition, propagate any pending time discontinuity, resume
    /// flushed decoders together, and drain the deferred-action queue.
    fn finish_flush_if_possible(&mut self) {
        if !self.flushing_audio.is_settled() || !self.flushing_video.is_settled() {
            return;
        }

        debug!(
            audio = %self.flushing_audio,
            video = %self.flushing_video,
            "both streams settled"
        );

        if self.time_discontinuity_pending {
            if let Some(renderer) = self.renderer.as_mut() {
                renderer.signal_time_discontinuity();
            }
            self.time_discontinuity_pending = false;
        }

        if self.flushing_audio == FlushStatus::Flushed
            && let Some(decoder) = self.audio_decoder.as_mut()
        {
            decoder.signal_resume();
        }
        if self.flushing_video == FlushStatus::Flushed
            && let Some(decoder) = self.video_decoder.as_mut()
        {
            decoder.signal_resume();
        }

        self.flushing_audio = FlushStatus::None;
        self.flushing_video = FlushStatus::None;

        self.process_deferred_actions();
    }

    // ---------------------------------------------------------------------
    // Deferred actions

    fn process_deferred_actions(&mut self) {
        while !self.deferred_actions.is_empty() {
            if self.flushing_audio != FlushStatus::None || self.flushing_video != FlushStatus::None
            {
                debug!(
                    audio = %self.flushing_audio,
                    video = %self.flushing_video,
                    "postponing deferred actions until flushing settles"
                );
                break;
            }

            let Some(action) = self.deferred_actions.pop_front() else {
                break;
            };
            debug!(action = action.label(), "executing deferred action");

            match action {
                DeferredAction::Seek { position_us } => self.perform_seek(position_us),
                DeferredAction::SetSurface { surface } => self.perform_set_surface(surface),
                DeferredAction::ShutdownDecoders { audio, video } => {
                    self.perform_decoder_shutdown(audio, video)
                }
                DeferredAction::Flush => self.perform_decoder_flush(),
                DeferredAction::Scan => self.perform_scan_sources(),
                DeferredAction::Reset => self.perform_reset(),
                DeferredAction::Reply(done) => {
                    let _ = done.send(());
                }
            }
        }
    }

    fn perform_seek(&mut self, position_us: i64) {
        debug!(position_us, "performing seek");

        if let Some(source) = self.source.as_mut() {
            source.seek_to(position_us);
        }
        self.timed_text_generation += 1;

        if let Some(driver) = self.driver() {
            driver.notify_position(position_us);
            driver.notify_seek_complete();
        }
    }

    fn perform_decoder_flush(&mut self) {
        debug!("performing decoder flush");

        if self.audio_decoder.is_none() && self.video_decoder.is_none() {
            return;
        }

        self.time_discontinuity_pending = true;

        if self.audio_decoder.is_some() {
            self.flush_decoder(StreamKind::Audio, false, None);
        }
        if self.video_decoder.is_some() {
            self.flush_decoder(StreamKind::Video, false, None);
        }
    }

    fn perform_decoder_shutdown(&mut self, audio: bool, video: bool) {
        debug!(audio, video, "performing decoder shutdown");

        if (!audio || self.audio_decoder.is_none()) && (!video || self.video_decoder.is_none()) {
            return;
        }

        self.time_discontinuity_pending = true;

        if audio && self.audio_decoder.is_some() {
            self.flush_decoder(StreamKind::Audio, true, None);
        }
        if video && self.video_decoder.is_some() {
            self.flush_decoder(StreamKind::Video, true, None);
        }
    }

    fn perform_reset(&mut self) {
        debug!("performing reset");

        if self.audio_decoder.is_some() || self.video_decoder.is_some() {
            error!("reset executed with decoders still present");
            debug_assert!(false, "reset executed with decoders still present");
        }

        self.cancel_poll_duration();
        self.scan_sources_generation += 1;
        self.scan_sources_pending = false;

        self.renderer = None;
        self.caption_decoder = None;

        if let Some(mut source) = self.source.take() {
            source.stop();
        }

        if let Some(driver) = self.driver() {
            driver.notify_reset_complete();
        }

        self.started = false;
    }

    fn perform_scan_sources(&mut self) {
        debug!("performing scan sources");

        if !self.started {
            return;
        }

        if self.audio_decoder.is_none() || self.video_decoder.is_none() {
            self.post_scan_sources();
        }
    }

    fn perform_set_surface(&mut self, surface: Option<Arc<dyn VideoSurface>>) {
        debug!(present = surface.is_some(), "performing set surface");

        self.surface = surface;

        if let Some(surface) = self.surface.as_ref()
            && let Err(error) = surface.set_scaling_mode(self.video_scaling_mode)
        {
            warn!(%error, "failed to re-apply video scaling mode");
        }

        if let Some(driver) = self.driver() {
            driver.notify_set_surface_complete();
        }
    }

    // ---------------------------------------------------------------------
    // Audio sink

    /// Opens (or re-opens) the audio sink for `format`.
    ///
    /// With offload enabled this negotiates the compressed path first and
    /// silently falls back to PCM on failure; `offload_only` skips the PCM
    /// fallback (used when pre-opening the sink during scanning).
    fn open_audio_sink(&mut self, format: &MediaFormat, offload_only: bool) {
        debug!(offload_only, offload_audio = self.offload_audio, "opening audio sink");

        let Some(sink) = self.audio_sink.clone() else {
            warn!("no audio sink to open");
            return;
        };
        let (Some(channel_count), Some(sample_rate)) = (format.channel_count, format.sample_rate)
        else {
            warn!(mime = %format.mime, "audio format missing channel count or sample rate");
            return;
        };
        let channel_mask = format.channel_mask.unwrap_or_default();

        let mut sink_changed = false;
        let mut flags = SinkFlags::default();

        let duration_us = self.source.as_mut().and_then(|source| source.duration_us());
        if self.video_decoder.is_none()
            && duration_us
                .map(|duration| duration > self.config.min_deep_buffer_duration_us)
                .unwrap_or(false)
        {
            flags.deep_buffer = true;
        }

        if self.offload_audio {
            match offload::encoding_for_mime(&format.mime) {
                None => {
                    error!(mime = %format.mime, "cannot map mime to an offload encoding");
                    self.offload_audio = false;
                }
                Some(mut encoding) => {
                    if encoding == AudioEncoding::Aac
                        && let Some(profile) = format.aac_profile
                    {
                        encoding = offload::refine_aac_encoding(profile);
                    }

                    let info = OffloadInfo {
                        sample_rate,
                        channel_mask,
                        encoding,
                        stream_type: sink.stream_type(),
                        bit_rate: format.bit_rate,
                        has_video: self.video_decoder.is_some(),
                        is_streaming: true,
                        duration_us: format.duration_us,
                    };

                    if self.current_offload_info.as_ref() == Some(&info) {
                        debug!("no change in offload configuration");
                        return;
                    }

                    flags.offload = true;
                    flags.deep_buffer = false;
                    sink_changed = true;
                    sink.close();

                    let params = SinkParams {
                        sample_rate,
                        channel_count,
                        channel_mask,
                        encoding,
                        buffer_count: self.config.sink_buffer_count,
                        renderer_callback: true,
                        flags,
                        offload_info: Some(info.clone()),
                    };
                    match sink.open(params).and_then(|()| sink.start()) {
                        Ok(()) => {
                            debug!(?encoding, "audio sink opened in offload mode");
                            self.current_offload_info = Some(info);
                        }
                        Err(error) => {
                            warn!(%error, "offload open failed, falling back to PCM");
                            sink.close();
                            if let Some(renderer) = self.renderer.as_mut() {
                                renderer.signal_disable_offload_audio();
                            }
                            self.offload_audio = false;
                            self.current_offload_info = None;
                        }
                    }
                }
            }
        }

        if !offload_only && !self.offload_audio {
            flags.offload = false;
            debug!("opening audio sink in PCM mode");

            sink_changed = true;
            sink.close();
            self.current_offload_info = None;

            let params = SinkParams {
                sample_rate,
                channel_count,
                channel_mask,
                encoding: AudioEncoding::Pcm16,
                buffer_count: self.config.sink_buffer_count,
                renderer_callback: false,
                flags,
                offload_info: None,
            };
            if let Err(error) = sink.open(params) {
                error!(%error, "failed to open audio sink");
                return;
            }
            let _ = sink.start();
        }

        if sink_changed && let Some(renderer) = self.renderer.as_mut() {
            renderer.signal_audio_sink_changed();
        }
    }

    fn close_audio_sink(&mut self) {
        if let Some(sink) = self.audio_sink.as_ref() {
            sink.close();
        }
        self.current_offload_info = None;
    }

    // ---------------------------------------------------------------------
    // Video size

    fn update_video_size(&mut self, input: Option<&MediaFormat>, output: Option<&MediaFormat>) {
        let Some(input) = input else {
            warn!("unknown video size, reporting 0x0");
            self.notify_listener(ListenerEvent::VideoSizeChanged {
                width: 0,
                height: 0,
            });
            return;
        };

        let (width, height) = display_dimensions(input, output);
        debug!(width, height, "video display size changed");
        self.notify_listener(ListenerEvent::VideoSizeChanged { width, height });
    }

    // ---------------------------------------------------------------------
    // Plumbing

    fn post(&self, request: PlayerRequest) {
        let _ = self.tx.send(request);
    }

    fn post_delayed(&self, request: PlayerRequest, delay: Duration) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(request);
        });
    }

    fn driver(&self) -> Option<Arc<dyn Driver>> {
        self.driver.as_ref().and_then(Weak::upgrade)
    }

    fn notify_listener(&self, event: ListenerEvent) {
        if let Some(driver) = self.driver() {
            driver.notify_listener(event);
        }
    }

    fn flushing(&self, kind: StreamKind) -> FlushStatus {
        match kind {
            StreamKind::Audio => self.flushing_audio,
            StreamKind::Video => self.flushing_video,
        }
    }

    fn flushing_mut(&mut self, kind: StreamKind) -> &mut FlushStatus {
        match kind {
            StreamKind::Audio => &mut self.flushing_audio,
            StreamKind::Video => &mut self.flushing_video,
        }
    }

    fn decoder_mut(&mut self, kind: StreamKind) -> Option<&mut Box<dyn Decoder>> {
        match kind {
            StreamKind::Audio => self.audio_decoder.as_mut(),
            StreamKind::Video => self.video_decoder.as_mut(),
        }
    }

    fn decoder_slot(&mut self, kind: StreamKind) -> &mut Option<Box<dyn Decoder>> {
        match kind {
            StreamKind::Audio => &mut self.audio_decoder,
            StreamKind::Video => &mut self.video_decoder,
        }
    }

    fn skip_until_mut(&mut self, kind: StreamKind) -> &mut Option<i64> {
        match kind {
            StreamKind::Audio => &mut self.skip_rendering_audio_until_us,
            StreamKind::Video => &mut self.skip_rendering_video_until_us,
        }
    }
}
