//! Domain types shared across the playback pipeline
//!
//! Formats, buffers, in-band signals, and the status space exchanged
//! between the coordinator and its collaborators.

mod buffer;
mod error;
mod format;

pub use buffer::{AccessUnit, DecodedBuffer, Discontinuity, SubtitleData, TimedTextData};
pub use error::{MediaError, PlayerError};
pub use format::{
    display_dimensions, mime, AacProfile, AudioEncoding, AudioStreamType, ChannelMask, MediaFormat,
    SourceFlags, StreamKind, TrackInfo, TrackKind, VideoCrop, VideoScalingMode,
};
