//! Stream formats, track descriptors, and video geometry

use serde::{Deserialize, Serialize};

/// Well-known MIME types used by the coordinator itself.
///
/// Collaborators may of course carry any MIME; these are the ones the core
/// inspects (AVC detection, audio offload mapping).
pub mod mime {
    pub const VIDEO_AVC: &str = "video/avc";
    pub const AUDIO_AAC: &str = "audio/mp4a-latm";
    pub const AUDIO_MPEG: &str = "audio/mpeg";
    pub const AUDIO_VORBIS: &str = "audio/vorbis";
    pub const AUDIO_OPUS: &str = "audio/opus";
    pub const AUDIO_RAW: &str = "audio/raw";
}

/// The two elementary streams the coordinator drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Audio,
    Video,
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Audio => write!(f, "audio"),
            Self::Video => write!(f, "video"),
        }
    }
}

/// Track categories reported through track enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackKind {
    Audio,
    Video,
    Subtitle,
    TimedText,
}

/// One entry of the track list returned by
/// [`PlayerHandle::track_info`](crate::PlayerHandle::track_info).
///
/// Subtitle tracks additionally carry their MIME and selection flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub kind: TrackKind,
    pub language: String,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub auto_select: bool,
    #[serde(default)]
    pub default_track: bool,
    #[serde(default)]
    pub forced: bool,
}

/// Capability and content flags reported by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceFlags {
    /// Content requires the encrypted buffer path.
    #[serde(default)]
    pub secure: bool,
    /// Duration may grow while playing (e.g. live recordings); poll it.
    #[serde(default)]
    pub dynamic_duration: bool,
    /// Real-time source; the renderer must not stall the pipeline.
    #[serde(default)]
    pub real_time: bool,
}

/// How video is mapped onto the output surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoScalingMode {
    #[default]
    ScaleToWindow,
    ScaleToWindowCrop,
}

/// Audio sample encodings negotiable with the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioEncoding {
    Pcm16,
    Aac,
    AacLc,
    AacHeV1,
    AacHeV2,
    Mp3,
    Vorbis,
    Opus,
}

/// AAC profile refinement carried in audio formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AacProfile {
    Lc,
    HeV1,
    HeV2,
}

/// Output channel routing requested from the audio sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChannelMask {
    /// Let the sink derive the mask from the channel count.
    #[default]
    UseChannelOrder,
    Mask(u32),
}

/// Stream type routing hint for the audio sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioStreamType {
    #[default]
    Music,
    System,
    Voice,
}

/// Crop rectangle in an output format, inclusive on all edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoCrop {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// A stream format as exchanged between source, decoders, and sink.
///
/// Fields are optional because a format accumulates detail over the
/// pipeline: a source-reported input format typically carries MIME and raw
/// dimensions, while a decoder output format adds the crop rectangle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaFormat {
    pub mime: String,
    #[serde(default)]
    pub duration_us: Option<i64>,

    // Audio
    #[serde(default)]
    pub channel_count: Option<u32>,
    #[serde(default)]
    pub channel_mask: Option<ChannelMask>,
    #[serde(default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub bit_rate: Option<u32>,
    #[serde(default)]
    pub aac_profile: Option<AacProfile>,

    // Video
    #[serde(default)]
    pub width: Option<i32>,
    #[serde(default)]
    pub height: Option<i32>,
    #[serde(default)]
    pub crop: Option<VideoCrop>,
    /// Sample aspect ratio as (width, height).
    #[serde(default)]
    pub sar: Option<(i32, i32)>,
    #[serde(default)]
    pub rotation_degrees: Option<i32>,
    /// Requires the encrypted buffer path end to end.
    #[serde(default)]
    pub secure: bool,
}

impl MediaFormat {
    /// Minimal audio format, enough for sink negotiation.
    pub fn audio(mime: impl Into<String>, sample_rate: u32, channel_count: u32) -> Self {
        Self {
            mime: mime.into(),
            sample_rate: Some(sample_rate),
            channel_count: Some(channel_count),
            ..Default::default()
        }
    }

    /// Minimal video format.
    pub fn video(mime: impl Into<String>, width: i32, height: i32) -> Self {
        Self {
            mime: mime.into(),
            width: Some(width),
            height: Some(height),
            ..Default::default()
        }
    }

    pub fn is_avc(&self) -> bool {
        self.mime.eq_ignore_ascii_case(mime::VIDEO_AVC)
    }
}

/// Derives the display dimensions for a video stream.
///
/// The decoder output format wins when present: its crop rectangle (edges
/// inclusive) gives the visible region, falling back to its raw dimensions.
/// Otherwise the source input format's dimensions are used. Sample aspect
/// ratio scales the width; a 90/270 degree rotation swaps the axes.
pub fn display_dimensions(input: &MediaFormat, output: Option<&MediaFormat>) -> (i32, i32) {
    let (mut width, mut height) = match output {
        Some(out) => match out.crop {
            Some(crop) => (crop.right - crop.left + 1, crop.bottom - crop.top + 1),
            None => (out.width.unwrap_or(0), out.height.unwrap_or(0)),
        },
        None => (input.width.unwrap_or(0), input.height.unwrap_or(0)),
    };

    if let Some((sar_width, sar_height)) = input.sar
        && sar_height > 0
    {
        width = width * sar_width / sar_height;
    }

    let rotation = input.rotation_degrees.unwrap_or(0);
    if rotation == 90 || rotation == 270 {
        std::mem::swap(&mut width, &mut height);
    }

    (width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_dimensions_from_crop() {
        let input = MediaFormat::video(mime::VIDEO_AVC, 1920, 1088);
        let mut output = MediaFormat::video(mime::VIDEO_AVC, 1920, 1088);
        output.crop = Some(VideoCrop {
            left: 0,
            top: 0,
            right: 1919,
            bottom: 1079,
        });

        assert_eq!(display_dimensions(&input, Some(&output)), (1920, 1080));
    }

    #[test]
    fn test_display_dimensions_input_fallback() {
        let input = MediaFormat::video(mime::VIDEO_AVC, 640, 480);
        assert_eq!(display_dimensions(&input, None), (640, 480));
    }

    #[test]
    fn test_display_dimensions_sample_aspect_ratio() {
        let mut input = MediaFormat::video(mime::VIDEO_AVC, 720, 576);
        input.sar = Some((16, 11));

        // Anamorphic PAL: width stretches, height untouched.
        assert_eq!(display_dimensions(&input, None), (720 * 16 / 11, 576));
    }

    #[test]
    fn test_display_dimensions_rotation_swaps_axes() {
        let mut input = MediaFormat::video(mime::VIDEO_AVC, 1280, 720);
        input.rotation_degrees = Some(90);
        assert_eq!(display_dimensions(&input, None), (720, 1280));

        input.rotation_degrees = Some(180);
        assert_eq!(display_dimensions(&input, None), (1280, 720));
    }

    #[test]
    fn test_avc_detection_is_case_insensitive() {
        let format = MediaFormat::video("Video/AVC", 0, 0);
        assert!(format.is_avc());
        assert!(!MediaFormat::audio(mime::AUDIO_AAC, 44100, 2).is_avc());
    }
}
