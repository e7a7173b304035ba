// Ports - Interface definitions (contracts)

use std::path::Path;

use async_trait::async_trait;

use crate::domain::model::{KeyframeDirection, KeyframeSample};
use crate::engine::cancel::CancelToken;
use crate::error::SeamcutResult;
use crate::probe::ProbeResult;

/// Callback receiving one log line from the external tool
pub type LineSink<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// One invocation of the external media tool
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolInvocation {
    /// Argument vector, program name excluded
    pub args: Vec<String>,
    /// Text piped to the tool's stdin (concat demuxer file lists)
    pub stdin: Option<String>,
}

impl ToolInvocation {
    /// Create an invocation without stdin
    pub fn new(args: Vec<String>) -> Self {
        Self { args, stdin: None }
    }

    /// Attach a stdin payload
    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    /// Last argument, which is the output path for every invocation we build
    pub fn output_arg(&self) -> Option<&str> {
        self.args.last().map(String::as_str)
    }
}

/// Result of a successful invocation
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    /// Last lines written to the error channel
    pub log_tail: String,
}

/// Port for running the external media tool (ffmpeg)
#[async_trait]
pub trait MediaToolPort: Send + Sync {
    /// Program name used in logs and errors
    fn program(&self) -> &str;

    /// Run the tool to completion.
    ///
    /// Every line from the error channel is passed to `on_line`. When
    /// `cancel` fires the process must be terminated and reaped before
    /// `SeamcutError::Cancelled` is returned.
    async fn run(
        &self,
        invocation: &ToolInvocation,
        cancel: &CancelToken,
        on_line: LineSink<'_>,
    ) -> SeamcutResult<ToolOutput>;
}

/// Port for read-only media queries (ffprobe)
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Streams, format and chapters of a file
    async fn probe(&self, path: &Path) -> SeamcutResult<ProbeResult>;

    /// Video frame samples of the first video stream within `[from, to]`
    async fn read_frames(&self, path: &Path, from: f64, to: f64)
        -> SeamcutResult<Vec<KeyframeSample>>;
}

/// Keyframe lookup used when snapping segment bounds
#[async_trait]
pub trait KeyframeLocator: Send + Sync {
    /// Keyframe closest to `time` in the given direction, within the search window
    async fn find_keyframe(
        &self,
        time: f64,
        direction: KeyframeDirection,
    ) -> SeamcutResult<Option<f64>>;

    /// Half-width of the search window in seconds
    fn search_window(&self) -> f64;
}
