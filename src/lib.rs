//! Seamcut Library
//!
//! Lossless segment cutting on top of the ffmpeg command-line tools.
//!
//! # Features
//!
//! - Segment store with undo/redo, selection, invert and keyframe alignment
//! - Stream-copy cut plans with exact output stream index mapping
//! - Smart cut: re-encode only the head of a segment up to its first keyframe
//! - Concat-demuxer merges with optional chapters
//! - Black, silence and scene interval detection
//! - Cooperative cancellation of every running job of an export session
//!
//! # Usage
//!
//! ```bash
//! seamcut cut talk.mp4 --segment 00:01:00-00:02:00:Intro --smart-cut
//! seamcut concat a.mp4 b.mp4 -o joined.mp4 --chapters
//! seamcut keyframes talk.mp4 --at 61.5
//! seamcut detect talk.mp4 --kind silence
//! ```

pub mod adapters;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod planner;
pub mod ports;
pub mod probe;
pub mod segments;
pub mod utils;

// Re-export commonly used types
pub use domain::model::{ApparentSegment, Chapter, Interval, KeyframeSample, Segment, SegmentId};
pub use engine::{BatchCutRequest, ConcatRequest, CutOutcome, ExportSession};
pub use error::{SeamcutError, SeamcutResult};
pub use planner::{CutPlan, CutSettings};
pub use segments::SegmentStore;
