//! Audio offload policy
//!
//! Decides whether a stream's audio can bypass the software mixer and be
//! decoded by the sink hardware, and maps container MIME types onto sink
//! encodings.

use tracing::debug;

use crate::media::{mime, AacProfile, AudioEncoding, AudioStreamType, MediaFormat};

/// Maps an audio MIME type to the sink encoding it offloads as.
pub fn encoding_for_mime(mime_type: &str) -> Option<AudioEncoding> {
    let lowered = mime_type.to_ascii_lowercase();
    match lowered.as_str() {
        mime::AUDIO_AAC => Some(AudioEncoding::Aac),
        mime::AUDIO_MPEG => Some(AudioEncoding::Mp3),
        mime::AUDIO_VORBIS => Some(AudioEncoding::Vorbis),
        mime::AUDIO_OPUS => Some(AudioEncoding::Opus),
        mime::AUDIO_RAW => Some(AudioEncoding::Pcm16),
        _ => None,
    }
}

/// Refines a generic AAC encoding by the stream's AAC profile.
pub fn refine_aac_encoding(profile: AacProfile) -> AudioEncoding {
    match profile {
        AacProfile::Lc => AudioEncoding::AacLc,
        AacProfile::HeV1 => AudioEncoding::AacHeV1,
        AacProfile::HeV2 => AudioEncoding::AacHeV2,
    }
}

/// Whether an audio stream is eligible for compressed offload.
///
/// Offload requires a compressed encoding the sink can decode, music
/// routing, and no accompanying video (video playback keeps audio on the
/// mixer path so A/V sync stays under renderer control).
pub fn can_offload(
    format: &MediaFormat,
    has_video: bool,
    is_streaming: bool,
    stream_type: AudioStreamType,
) -> bool {
    let Some(encoding) = encoding_for_mime(&format.mime) else {
        debug!(mime = %format.mime, "offload: unmappable mime");
        return false;
    };

    if encoding == AudioEncoding::Pcm16 {
        return false;
    }

    if has_video || stream_type != AudioStreamType::Music {
        return false;
    }

    debug!(mime = %format.mime, ?encoding, is_streaming, "audio stream is offloadable");
    true
}
