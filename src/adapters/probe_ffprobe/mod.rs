//! FFprobe adapter for media file probing
//!
//! Streams, format and chapters come from one JSON probe. Keyframe samples
//! are read from the packet list of the first video stream, limited to the
//! requested interval with `-read_intervals`.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::model::KeyframeSample;
use crate::error::{SeamcutError, SeamcutResult};
use crate::ports::ProbePort;
use crate::probe::ProbeResult;
use crate::utils::time::format_seconds_arg;

/// FFprobe-based probe adapter
#[derive(Debug, Clone)]
pub struct FfprobeAdapter {
    program: String,
}

impl FfprobeAdapter {
    /// Use the given executable name or path
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run_json(&self, args: &[String]) -> SeamcutResult<Vec<u8>> {
        debug!("Running {} {}", self.program, args.join(" "));
        let output = Command::new(&self.program)
            .kill_on_drop(true)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| SeamcutError::ExternalToolFailure {
                program: self.program.clone(),
                exit_code: None,
                log_tail: format!("failed to start: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("{} returned non-zero status: {}", self.program, stderr);
            return Err(SeamcutError::ExternalToolFailure {
                program: self.program.clone(),
                exit_code: output.status.code(),
                log_tail: stderr,
            });
        }
        Ok(output.stdout)
    }
}

impl Default for FfprobeAdapter {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

#[derive(Debug, Deserialize)]
struct PacketList {
    #[serde(default)]
    packets: Vec<Packet>,
}

#[derive(Debug, Deserialize)]
struct Packet {
    #[serde(default)]
    pts_time: Option<String>,
    #[serde(default)]
    flags: Option<String>,
}

/// Parse `-show_format -show_streams -show_chapters` JSON
pub fn parse_probe_json(json: &[u8]) -> SeamcutResult<ProbeResult> {
    serde_json::from_slice(json).map_err(|e| SeamcutError::Probe {
        message: format!("invalid probe output: {}", e),
    })
}

/// Parse `-show_packets` JSON into samples; the `K` flag marks a keyframe
pub fn parse_packets_json(json: &[u8]) -> SeamcutResult<Vec<KeyframeSample>> {
    let list: PacketList = serde_json::from_slice(json).map_err(|e| SeamcutError::Probe {
        message: format!("invalid packet output: {}", e),
    })?;

    let mut samples: Vec<KeyframeSample> = list
        .packets
        .into_iter()
        .filter_map(|packet| {
            let time = packet.pts_time?.parse::<f64>().ok()?;
            let is_keyframe = packet
                .flags
                .as_deref()
                .map_or(false, |flags| flags.starts_with('K'));
            Some(KeyframeSample { time, is_keyframe })
        })
        .collect();
    samples.sort_by(|a, b| a.time.total_cmp(&b.time));
    Ok(samples)
}

#[async_trait]
impl ProbePort for FfprobeAdapter {
    async fn probe(&self, path: &Path) -> SeamcutResult<ProbeResult> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-print_format".to_string(),
            "json".to_string(),
            "-show_format".to_string(),
            "-show_streams".to_string(),
            "-show_chapters".to_string(),
            path.to_string_lossy().into_owned(),
        ];
        let json = self.run_json(&args).await?;
        let result = parse_probe_json(&json)?;
        debug!(
            "Probed {}: {} stream(s), duration {:?}",
            path.display(),
            result.streams.len(),
            result.duration()
        );
        Ok(result)
    }

    async fn read_frames(
        &self,
        path: &Path,
        from: f64,
        to: f64,
    ) -> SeamcutResult<Vec<KeyframeSample>> {
        let args = vec![
            "-v".to_string(),
            "error".to_string(),
            "-select_streams".to_string(),
            "v:0".to_string(),
            "-show_packets".to_string(),
            "-read_intervals".to_string(),
            format!("{}%{}", format_seconds_arg(from.max(0.0)), format_seconds_arg(to)),
            "-show_entries".to_string(),
            "packet=pts_time,flags".to_string(),
            "-of".to_string(),
            "json".to_string(),
            path.to_string_lossy().into_owned(),
        ];
        let json = self.run_json(&args).await?;
        parse_packets_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_probe_json() {
        let json = br#"{
            "streams": [
                {"index": 0, "codec_type": "video", "codec_name": "h264",
                 "avg_frame_rate": "30000/1001", "time_base": "1/15360",
                 "bit_rate": "4000000", "disposition": {"default": 1, "attached_pic": 0}},
                {"index": 1, "codec_type": "audio", "codec_name": "aac"}
            ],
            "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "120.500000"},
            "chapters": []
        }"#;
        let result = parse_probe_json(json).unwrap();
        assert_eq!(result.streams.len(), 2);
        assert_eq!(result.duration(), Some(120.5));
        assert_eq!(result.format.primary_name(), Some("mov"));
        let video = result.first_video_stream().unwrap();
        assert_eq!(video.timescale(), Some(15360));
        assert!((video.frame_rate().unwrap() - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_packets_json() {
        let json = br#"{"packets": [
            {"pts_time": "2.002000", "flags": "__"},
            {"pts_time": "0.000000", "flags": "K_"},
            {"flags": "K_"},
            {"pts_time": "4.004000", "flags": "K__"}
        ]}"#;
        let samples = parse_packets_json(json).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], KeyframeSample { time: 0.0, is_keyframe: true });
        assert!(!samples[1].is_keyframe);
        assert!(samples[2].is_keyframe);
    }

    #[test]
    fn test_invalid_json_is_probe_error() {
        assert!(matches!(
            parse_probe_json(b"not json"),
            Err(SeamcutError::Probe { .. })
        ));
    }
}
