//! Cutting engine: process lifecycle, progress and the cut pipelines

use std::path::{Path, PathBuf};

use crate::probe::ProbeResult;
use crate::utils::path::{extension_of, format_for_extension};

pub mod batch;
pub mod cancel;
pub mod cleanup;
pub mod clipper;
pub mod concat;
pub mod detect;
pub mod hybrid;
pub mod progress;
pub mod runner;

pub use batch::{BatchCutRequest, ExportSession};
pub use cancel::{CancelToken, JobRegistry};
pub use concat::ConcatRequest;
pub use detect::IntervalDetector;
pub use runner::ProcessRunner;

/// Fallback muxer when neither the caller nor the file name decide
pub const DEFAULT_FORMAT: &str = "matroska";

/// Outcome of one output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CutOutcome {
    /// The output file was written
    Written(PathBuf),
    /// The output already existed and overwriting was disabled
    Skipped(PathBuf),
}

impl CutOutcome {
    pub fn path(&self) -> &Path {
        match self {
            CutOutcome::Written(path) | CutOutcome::Skipped(path) => path,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, CutOutcome::Written(_))
    }
}

/// Choose the output muxer: explicit, then by extension, then the source's
pub fn resolve_format(explicit: Option<&str>, output: &Path, source: Option<&ProbeResult>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| {
            extension_of(output)
                .and_then(|ext| format_for_extension(&ext))
                .map(str::to_string)
        })
        .or_else(|| {
            source
                .and_then(|s| s.format.primary_name())
                .map(str::to_string)
        })
        .unwrap_or_else(|| DEFAULT_FORMAT.to_string())
}
