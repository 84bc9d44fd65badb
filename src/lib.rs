//! Playhead - media playback coordination engine
//!
//! Playhead is the core of a media player: a single-task coordinator that
//! owns a source, an audio decoder, a video decoder, and a renderer, and
//! drives them through their lifecycle via an asynchronous message loop.
//! It translates external commands into correctly ordered operations on
//! those collaborators while preserving A/V synchronization and the
//! one-thing-at-a-time invariant during flush and shutdown.
//!
//! # Core Concepts
//!
//! - **Single Writer**: all coordinator state mutates on one tokio task;
//!   callers and collaborators only post messages
//! - **Flush Machine**: per-stream transition tracking sequences
//!   discontinuities, seeks, surface changes, and resets
//! - **Deferred Actions**: long-running transitions queue up and drain
//!   only while no flush is in flight
//! - **Generations**: integer stamps invalidate callbacks from torn-down
//!   decoders and cancelled timers
//!
//! # Modules
//!
//! - [`player`] - the coordinator, its handle, and notify channels
//! - [`media`] - formats, buffers, and status codes
//! - [`source`], [`decoder`], [`caption`], [`renderer`], [`sink`] -
//!   collaborator interfaces
//! - [`driver`] - callbacks into the embedding application
//! - [`backend`] - factory seam for decoders and the renderer
//! - [`config`] - coordinator tunables

pub mod backend;
pub mod caption;
pub mod config;
pub mod decoder;
pub mod driver;
pub mod media;
pub mod player;
pub mod renderer;
pub mod sink;
pub mod source;

// Re-export commonly used types
pub use backend::{Backend, DecoderSpec};
pub use caption::{CaptionDecoder, CaptionEvent};
pub use config::PlayerConfig;
pub use decoder::{Decoder, DecoderEvent, FillResponse};
pub use driver::{Driver, ListenerEvent};
pub use media::{
    AccessUnit, AudioEncoding, AudioStreamType, ChannelMask, DecodedBuffer, Discontinuity,
    MediaError, MediaFormat, PlayerError, SourceFlags, StreamKind, SubtitleData, TimedTextData,
    TrackInfo, TrackKind, VideoScalingMode,
};
pub use player::{
    CaptionNotify, DecoderNotify, FlushStatus, Player, PlayerHandle, RendererNotify, SourceNotify,
};
pub use renderer::{Renderer, RendererEvent, RendererFlags, VideoSurface};
pub use sink::{AudioSink, OffloadInfo, SinkFlags, SinkParams};
pub use source::{Dequeue, Source, SourceEvent};
