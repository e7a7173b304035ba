//! Smart-cut decision and encoder selection

use tracing::debug;

use crate::error::{SeamcutError, SeamcutResult};
use crate::probe::keyframes::TIME_TOLERANCE;
use crate::probe::StreamInfo;

/// Path chosen for one segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SmartCutDecision {
    /// The start is on a keyframe; a plain copy cut is exact
    Plain,
    /// No keyframe before the end; re-encode the whole segment
    EncodeWhole,
    /// The start is less than one frame before `keyframe`; copy from the keyframe
    CopyFromKeyframe { keyframe: f64 },
    /// Re-encode `[start, encode_to]`, copy from `keyframe` to the end, then concatenate
    EncodePart { keyframe: f64, encode_to: f64 },
}

/// Decide how to cut `[start, end)`.
///
/// `next_keyframe` is the first known keyframe at or after `start`, and
/// `searched_until` is the end of the window that was searched for it.
pub fn decide_smart_cut(
    start: f64,
    end: f64,
    next_keyframe: Option<f64>,
    searched_until: f64,
    fps: Option<f64>,
) -> SeamcutResult<SmartCutDecision> {
    if let Some(keyframe) = next_keyframe {
        if (keyframe - start).abs() < TIME_TOLERANCE {
            return Ok(SmartCutDecision::Plain);
        }
    }

    let keyframe = match next_keyframe {
        Some(keyframe) => keyframe,
        None if end <= searched_until => f64::INFINITY,
        None => {
            return Err(SeamcutError::KeyframeSearchFailed {
                time: start,
                window: searched_until - start,
            })
        }
    };

    let fps = fps.ok_or_else(|| SeamcutError::SmartCutUnsupported {
        reason: "the video frame rate is unknown".to_string(),
    })?;

    if keyframe >= end {
        return Ok(SmartCutDecision::EncodeWhole);
    }

    let encode_to = keyframe - 1.0 / fps;
    if encode_to <= start {
        debug!(
            "Start {:.3}s is within one frame of keyframe {:.3}s, copying from the keyframe",
            start, keyframe
        );
        return Ok(SmartCutDecision::CopyFromKeyframe { keyframe });
    }

    Ok(SmartCutDecision::EncodePart {
        keyframe,
        encode_to,
    })
}

/// Encoder matching the source video stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    pub encoder: String,
    /// Target bitrate in bits per second
    pub bitrate: Option<u64>,
    /// Output track timescale
    pub timescale: Option<u64>,
}

impl EncoderSettings {
    /// Pick an encoder, bitrate and timescale for re-encoding `stream`
    pub fn for_stream(stream: &StreamInfo) -> SeamcutResult<Self> {
        let codec = stream.codec_name.as_deref().unwrap_or_default();
        let encoder = match codec {
            "h264" => "libx264",
            "hevc" => "libx265",
            "vp8" => "libvpx",
            "vp9" => "libvpx-vp9",
            "av1" => "libsvtav1",
            "mpeg4" => "mpeg4",
            "mpeg2video" => "mpeg2video",
            "prores" => "prores_ks",
            other => {
                return Err(SeamcutError::SmartCutUnsupported {
                    reason: format!("no encoder known for video codec '{}'", other),
                })
            }
        };
        Ok(Self {
            encoder: encoder.to_string(),
            bitrate: stream.bitrate(),
            timescale: stream.timescale(),
        })
    }

    /// Arguments encoding output stream `output_index`
    pub fn args(&self, output_index: usize) -> Vec<String> {
        let mut args = vec![format!("-c:{}", output_index), self.encoder.clone()];
        if let Some(bitrate) = self.bitrate {
            args.push(format!("-b:{}", output_index));
            args.push(bitrate.to_string());
        }
        args
    }
}
