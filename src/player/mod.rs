//! Playback coordinator
//!
//! The coordinator translates external commands (set-data-source, prepare,
//! start, seek, set-surface, reset, select-track) into correctly ordered
//! operations on the source, decoders, renderer, and audio sink:
//! - **Message loop:** all state lives on one task; everyone else posts.
//! - **Flush machine:** per-stream transition tracking so audio and video
//!   settle and resume together.
//! - **Deferred actions:** long transitions queue and drain only between
//!   flushes.
//! - **Generations:** stale callbacks from torn-down decoders and
//!   cancelled timers are discarded.

mod actions;
mod core;
mod flush;
mod handle;
mod messages;

pub use self::core::Player;
pub use flush::FlushStatus;
pub use handle::PlayerHandle;
pub use messages::{CaptionNotify, DecoderNotify, RendererNotify, SourceNotify};
