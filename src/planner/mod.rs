//! Cut planning: settings, cut plans and their translation into tool arguments

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::model::Chapter;

pub mod builder;
pub mod chapters;
pub mod smart_cut;
pub mod stream_map;

pub use builder::{build_concat_args, build_cut_args, ConcatPlan, PlanOutcome, PlannedCut};
pub use smart_cut::{decide_smart_cut, EncoderSettings, SmartCutDecision};
pub use stream_map::output_stream_index;

/// Mode passed to `-avoid_negative_ts` when the start is trimmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvoidNegativeTs {
    Auto,
    MakeZero,
    MakeNonNegative,
    Disabled,
}

impl AvoidNegativeTs {
    pub fn as_arg(&self) -> &'static str {
        match self {
            AvoidNegativeTs::Auto => "auto",
            AvoidNegativeTs::MakeZero => "make_zero",
            AvoidNegativeTs::MakeNonNegative => "make_non_negative",
            AvoidNegativeTs::Disabled => "disabled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().replace('-', "_").as_str() {
            "auto" => Some(AvoidNegativeTs::Auto),
            "make_zero" => Some(AvoidNegativeTs::MakeZero),
            "make_non_negative" => Some(AvoidNegativeTs::MakeNonNegative),
            "disabled" => Some(AvoidNegativeTs::Disabled),
            _ => None,
        }
    }
}

/// Which metadata of the source is carried into the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreserveMetadata {
    /// Global and per-stream metadata
    Default,
    /// Per-stream metadata only
    NonGlobal,
    /// Nothing
    None,
}

impl PreserveMetadata {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().replace('_', "-").as_str() {
            "default" => Some(PreserveMetadata::Default),
            "non-global" => Some(PreserveMetadata::NonGlobal),
            "none" => Some(PreserveMetadata::None),
            _ => None,
        }
    }
}

/// Per-call cut settings supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CutSettings {
    /// Seek before the input (fast, starts on the preceding keyframe)
    pub keyframe_cut: bool,
    pub avoid_negative_ts: AvoidNegativeTs,
    pub preserve_metadata: PreserveMetadata,
    /// `-movflags use_metadata_tags` for mov/mp4 outputs
    pub preserve_mov_data: bool,
    /// `-movflags +faststart` for mov/mp4 outputs
    pub mov_fast_start: bool,
    /// One chapter per merged file when concatenating
    pub segments_to_chapters: bool,
    pub overwrite: bool,
    pub smart_cut: bool,
    /// Output playback speed factor; `1.0` leaves timestamps untouched
    pub output_playback_rate: f64,
    /// Rotation written into the first video stream's metadata
    pub rotation: Option<i32>,
    /// `-video_track_timescale`
    pub video_timescale: Option<u64>,
    /// Format-level metadata tags
    pub custom_tags: BTreeMap<String, String>,
}

impl Default for CutSettings {
    fn default() -> Self {
        Self {
            keyframe_cut: true,
            avoid_negative_ts: AvoidNegativeTs::MakeZero,
            preserve_metadata: PreserveMetadata::Default,
            preserve_mov_data: false,
            mov_fast_start: true,
            segments_to_chapters: false,
            overwrite: false,
            smart_cut: false,
            output_playback_rate: 1.0,
            rotation: None,
            video_timescale: None,
            custom_tags: BTreeMap::new(),
        }
    }
}

impl CutSettings {
    /// Builder-style overwrite toggle
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Builder-style smart-cut toggle
    pub fn with_smart_cut(mut self, smart_cut: bool) -> Self {
        self.smart_cut = smart_cut;
        self
    }

    /// Builder-style keyframe-cut toggle
    pub fn with_keyframe_cut(mut self, keyframe_cut: bool) -> Self {
        self.keyframe_cut = keyframe_cut;
        self
    }
}

/// Streams of one input file to copy into the output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyFile {
    pub path: PathBuf,
    pub streams: Vec<usize>,
}

impl CopyFile {
    pub fn new(path: impl Into<PathBuf>, streams: Vec<usize>) -> Self {
        Self {
            path: path.into(),
            streams,
        }
    }
}

/// Overrides for one input stream, applied to wherever it lands in the output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamOverride {
    pub file: PathBuf,
    pub stream: usize,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    #[serde(default)]
    pub disposition: Option<String>,
    #[serde(default)]
    pub bitstream_filter: Option<String>,
}

impl StreamOverride {
    pub fn new(file: impl Into<PathBuf>, stream: usize) -> Self {
        Self {
            file: file.into(),
            stream,
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.disposition = Some(disposition.into());
        self
    }

    pub fn with_bitstream_filter(mut self, filter: impl Into<String>) -> Self {
        self.bitstream_filter = Some(filter.into());
        self
    }
}

/// How the output streams are produced
#[derive(Debug, Clone, PartialEq)]
pub enum CodecChoice {
    /// Copy every stream
    Copy,
    /// Copy every stream except one input stream, which is re-encoded
    Encode {
        file: PathBuf,
        stream: usize,
        settings: EncoderSettings,
    },
}

/// Everything needed to build one cut invocation
#[derive(Debug, Clone, PartialEq)]
pub struct CutPlan {
    /// Inputs in copy order; this order defines output stream indices
    pub inputs: Vec<CopyFile>,
    pub from: f64,
    pub to: f64,
    /// Media duration, used to skip no-op trims of the end
    pub media_duration: Option<f64>,
    pub chapters: Option<Vec<Chapter>>,
    pub overrides: Vec<StreamOverride>,
    pub codec: CodecChoice,
    pub output: PathBuf,
    /// Output container format (`-f`)
    pub format: String,
}

impl CutPlan {
    /// Create a stream-copy plan
    pub fn new(
        inputs: Vec<CopyFile>,
        from: f64,
        to: f64,
        output: impl Into<PathBuf>,
        format: impl Into<String>,
    ) -> Self {
        Self {
            inputs,
            from,
            to,
            media_duration: None,
            chapters: None,
            overrides: Vec::new(),
            codec: CodecChoice::Copy,
            output: output.into(),
            format: format.into(),
        }
    }

    pub fn with_media_duration(mut self, duration: Option<f64>) -> Self {
        self.media_duration = duration;
        self
    }

    pub fn with_chapters(mut self, chapters: Vec<Chapter>) -> Self {
        self.chapters = Some(chapters);
        self
    }

    pub fn with_overrides(mut self, overrides: Vec<StreamOverride>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_codec(mut self, codec: CodecChoice) -> Self {
        self.codec = codec;
        self
    }

    /// Whether the start is trimmed (not the natural media start)
    pub fn trims_start(&self) -> bool {
        self.from > 0.0
    }

    /// Whether the end is trimmed (not the natural media end)
    pub fn trims_end(&self) -> bool {
        match self.media_duration {
            Some(duration) => self.to < duration,
            None => true,
        }
    }

    /// Duration of the cut in source time
    pub fn duration(&self) -> f64 {
        (self.to - self.from).max(0.0)
    }

    /// The primary input (first in copy order)
    pub fn primary_input(&self) -> Option<&Path> {
        self.inputs.first().map(|f| f.path.as_path())
    }
}

impl fmt::Display for CutPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.3}s, {:.3}s) -> {}",
            self.from,
            self.to,
            self.output.display()
        )
    }
}
