//! Backend factory seam
//!
//! The coordinator decides *when* decoders, the caption decoder, and the
//! renderer exist; a [`Backend`] decides *what* they are. Platform
//! integrations implement this trait once, and every created collaborator
//! receives a notify channel wired back into the player's message loop.

use std::sync::Arc;

use crate::caption::CaptionDecoder;
use crate::decoder::Decoder;
use crate::media::StreamKind;
use crate::player::{CaptionNotify, DecoderNotify, RendererNotify};
use crate::renderer::{Renderer, RendererFlags, VideoSurface};
use crate::sink::AudioSink;

/// What kind of decoder the coordinator needs.
#[derive(Clone)]
pub struct DecoderSpec {
    /// Offload pass-through: the "decoder" only frames compressed audio
    /// for the sink's hardware path.
    pub pass_through: bool,
    /// Output surface for video decoders.
    pub surface: Option<Arc<dyn VideoSurface>>,
}

/// Creates the collaborators the coordinator instantiates at runtime.
pub trait Backend: Send {
    fn create_decoder(
        &mut self,
        kind: StreamKind,
        spec: DecoderSpec,
        notify: DecoderNotify,
    ) -> Box<dyn Decoder>;

    fn create_renderer(
        &mut self,
        sink: Option<Arc<dyn AudioSink>>,
        flags: RendererFlags,
        notify: RendererNotify,
    ) -> Box<dyn Renderer>;

    fn create_caption_decoder(&mut self, notify: CaptionNotify) -> Box<dyn CaptionDecoder>;
}
