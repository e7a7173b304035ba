// Domain models - Core types and data structures

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque unique identity of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(Uuid);

impl SegmentId {
    /// Generate a fresh identity
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cut segment on the timeline.
///
/// `start`/`end` of `None` mean "bound to the timeline start/end". When both
/// are set, `start < end` holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub color_index: u32,
    pub start: Option<f64>,
    pub end: Option<f64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl Segment {
    /// Create a new segment with a fresh id
    pub fn new(start: Option<f64>, end: Option<f64>, color_index: u32) -> Self {
        Self {
            id: SegmentId::new(),
            color_index,
            start,
            end,
            name: String::new(),
            tags: BTreeMap::new(),
        }
    }

    /// A segment spanning the whole timeline
    pub fn full_timeline(color_index: u32) -> Self {
        Self::new(None, None, color_index)
    }

    /// Builder-style name setter
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Builder-style tag setter
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// True when neither bound has been set yet
    pub fn is_open(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Resolve undefined bounds against the media duration
    pub fn apparent(&self, duration: Option<f64>) -> ApparentSegment {
        ApparentSegment {
            id: self.id,
            start: self.start.unwrap_or(0.0),
            end: self.end.or(duration).unwrap_or(0.0),
        }
    }

    /// Whether the defined bounds keep `start < end`
    pub fn has_valid_bounds(&self) -> bool {
        match (self.start, self.end) {
            (Some(start), Some(end)) => start < end,
            _ => true,
        }
    }
}

/// A segment with its bounds resolved against the media start/duration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApparentSegment {
    pub id: SegmentId,
    pub start: f64,
    pub end: f64,
}

impl ApparentSegment {
    /// Length in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `start < end`
    pub fn is_valid(&self) -> bool {
        self.start < self.end
    }

    /// Whether `time` lies strictly inside the segment
    pub fn contains(&self, time: f64) -> bool {
        self.start < time && time < self.end
    }

    /// Whether two segments share any time
    pub fn overlaps(&self, other: &ApparentSegment) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Which bound of a segment an edit targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CutSide {
    Start,
    End,
}

/// Which bound(s) of the selected segments a bulk edit targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundSelector {
    Start,
    End,
    Both,
}

impl BoundSelector {
    /// Whether the start bound is affected
    pub fn includes_start(self) -> bool {
        matches!(self, BoundSelector::Start | BoundSelector::Both)
    }

    /// Whether the end bound is affected
    pub fn includes_end(self) -> bool {
        matches!(self, BoundSelector::End | BoundSelector::Both)
    }
}

/// Direction used when snapping a time to a keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyframeDirection {
    /// Closest keyframe on either side
    Nearest,
    /// Last keyframe at or before the time
    Before,
    /// First keyframe at or after the time
    After,
}

impl KeyframeDirection {
    /// Parse a direction name
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "nearest" => Some(KeyframeDirection::Nearest),
            "before" => Some(KeyframeDirection::Before),
            "after" => Some(KeyframeDirection::After),
            _ => None,
        }
    }
}

/// One frame sample read from the video stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyframeSample {
    pub time: f64,
    pub is_keyframe: bool,
}

/// A chapter to be written into the output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub start: f64,
    pub end: f64,
    pub name: Option<String>,
}

/// A detected time interval (black, silence, or a span between scene changes)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: f64,
    pub end: f64,
}

impl Interval {
    /// Create a new interval
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}
