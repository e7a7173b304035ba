//! Probe data model and keyframe lookup
//!
//! [`ProbeResult`] mirrors the JSON written by `ffprobe -print_format json
//! -show_format -show_streams -show_chapters`. Numeric fields arrive as
//! strings and are parsed on access.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod keyframes;
pub mod locator;

pub use keyframes::KeyframeIndexCache;
pub use locator::ProbeKeyframeLocator;

/// Streams, format and chapters of one media file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    #[serde(default)]
    pub streams: Vec<StreamInfo>,
    #[serde(default)]
    pub format: FormatInfo,
    #[serde(default)]
    pub chapters: Vec<ChapterInfo>,
}

impl ProbeResult {
    /// Container duration in seconds
    pub fn duration(&self) -> Option<f64> {
        parse_number(self.format.duration.as_deref()).filter(|d| *d > 0.0)
    }

    /// Stream with the given input index
    pub fn stream(&self, index: usize) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.index == index)
    }

    /// First video stream that is not an attached picture
    pub fn first_video_stream(&self) -> Option<&StreamInfo> {
        self.streams
            .iter()
            .find(|s| s.is_video() && !s.is_attached_picture())
    }

    /// Indices of every stream
    pub fn stream_indices(&self) -> Vec<usize> {
        self.streams.iter().map(|s| s.index).collect()
    }
}

/// One stream of a probed file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub index: usize,
    #[serde(default)]
    pub codec_type: String,
    #[serde(default)]
    pub codec_name: Option<String>,
    #[serde(default)]
    pub bit_rate: Option<String>,
    #[serde(default)]
    pub r_frame_rate: Option<String>,
    #[serde(default)]
    pub avg_frame_rate: Option<String>,
    #[serde(default)]
    pub time_base: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub disposition: BTreeMap<String, i64>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl StreamInfo {
    pub fn is_video(&self) -> bool {
        self.codec_type == "video"
    }

    pub fn is_audio(&self) -> bool {
        self.codec_type == "audio"
    }

    /// Cover art and similar single-image streams
    pub fn is_attached_picture(&self) -> bool {
        self.disposition.get("attached_pic").copied().unwrap_or(0) == 1
    }

    /// Frames per second, preferring the average rate
    pub fn frame_rate(&self) -> Option<f64> {
        self.avg_frame_rate
            .as_deref()
            .and_then(parse_ratio)
            .or_else(|| self.r_frame_rate.as_deref().and_then(parse_ratio))
            .filter(|fps| *fps > 0.0 && fps.is_finite())
    }

    /// Stream bitrate in bits per second
    pub fn bitrate(&self) -> Option<u64> {
        self.bit_rate.as_deref().and_then(|b| b.trim().parse().ok())
    }

    /// Timescale (denominator of the time base), e.g. `15360` for `1/15360`
    pub fn timescale(&self) -> Option<u64> {
        let (num, den) = self.time_base.as_deref()?.split_once('/')?;
        if num.trim() != "1" {
            return None;
        }
        den.trim().parse().ok().filter(|d| *d > 0)
    }
}

/// Container-level information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatInfo {
    #[serde(default)]
    pub format_name: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub bit_rate: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl FormatInfo {
    /// First name of the comma-separated demuxer list
    pub fn primary_name(&self) -> Option<&str> {
        self.format_name
            .as_deref()
            .and_then(|names| names.split(',').next())
            .filter(|name| !name.is_empty())
    }
}

/// A chapter present in the source file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChapterInfo {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

/// Parse a `num/den` ratio such as `30000/1001`
pub fn parse_ratio(value: &str) -> Option<f64> {
    match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                None
            } else {
                Some(num / den)
            }
        }
        None => value.trim().parse().ok(),
    }
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_JSON: &str = r#"{
        "streams": [
            {
                "index": 0, "codec_type": "video", "codec_name": "h264",
                "avg_frame_rate": "30000/1001", "r_frame_rate": "30000/1001",
                "time_base": "1/30000", "bit_rate": "4500000",
                "width": 1920, "height": 1080,
                "disposition": { "default": 1, "attached_pic": 0 }
            },
            { "index": 1, "codec_type": "audio", "codec_name": "aac", "bit_rate": "128000" },
            {
                "index": 2, "codec_type": "video", "codec_name": "mjpeg",
                "disposition": { "attached_pic": 1 }
            }
        ],
        "format": { "format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "120.500000" },
        "chapters": [ { "start_time": "0.000000", "end_time": "60.000000", "tags": { "title": "One" } } ]
    }"#;

    #[test]
    fn test_parse_probe_output() {
        let probe: ProbeResult = serde_json::from_str(PROBE_JSON).unwrap();
        assert_eq!(probe.streams.len(), 3);
        assert_eq!(probe.duration(), Some(120.5));
        assert_eq!(probe.format.primary_name(), Some("mov"));
        assert_eq!(probe.chapters.len(), 1);

        let video = probe.first_video_stream().unwrap();
        assert_eq!(video.index, 0);
        assert!((video.frame_rate().unwrap() - 29.97).abs() < 0.01);
        assert_eq!(video.bitrate(), Some(4_500_000));
        assert_eq!(video.timescale(), Some(30000));
        assert!(probe.stream(2).unwrap().is_attached_picture());
        assert!(probe.stream(1).unwrap().is_audio());
    }

    #[test]
    fn test_missing_fields_default() {
        let probe: ProbeResult = serde_json::from_str(r#"{ "streams": [ { "index": 0 } ] }"#).unwrap();
        assert_eq!(probe.duration(), None);
        assert!(probe.first_video_stream().is_none());
        assert_eq!(probe.streams[0].frame_rate(), None);
    }

    #[test]
    fn test_parse_ratio() {
        assert_eq!(parse_ratio("25/1"), Some(25.0));
        assert_eq!(parse_ratio("0/0"), None);
        assert_eq!(parse_ratio("24"), Some(24.0));
        assert_eq!(parse_ratio("abc"), None);
    }
}
