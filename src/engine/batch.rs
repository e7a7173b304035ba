//! Export session: the consumer-facing cut, merge and detect operations
//!
//! One session owns the process registry for its jobs and the keyframe
//! cache of the file being worked on. Segments of a batch are cut one after
//! another; aborting the session cancels the running job and stops the batch
//! before the next segment.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{error, info};

use crate::domain::model::{Interval, Segment};
use crate::engine::cancel::JobRegistry;
use crate::engine::clipper::run_single_cut;
use crate::engine::concat::{run_concat, ConcatRequest};
use crate::engine::detect::{IntervalCollector, IntervalDetector};
use crate::engine::hybrid::SmartCutter;
use crate::engine::progress::{parse_progress, MonotonicProgress, ProgressFn};
use crate::engine::runner::ProcessRunner;
use crate::engine::{resolve_format, CutOutcome};
use crate::error::{SeamcutError, SeamcutResult};
use crate::planner::{CopyFile, CutPlan, CutSettings, StreamOverride};
use crate::ports::{MediaToolPort, ProbePort, ToolInvocation};
use crate::probe::locator::DEFAULT_SEARCH_WINDOW;
use crate::probe::{KeyframeIndexCache, ProbeKeyframeLocator, ProbeResult};
use crate::utils::path::{extension_of, segment_output_path};
use crate::utils::time::format_seconds_arg;

/// Segments of one input to cut into separate files
#[derive(Debug, Clone, PartialEq)]
pub struct BatchCutRequest {
    pub input: PathBuf,
    pub segments: Vec<Segment>,
    /// Streams to copy in output order; every stream of `input` when unset
    pub streams: Option<Vec<CopyFile>>,
    pub out_dir: PathBuf,
    /// Output muxer; derived from the input's extension when unset
    pub format: Option<String>,
    pub overrides: Vec<StreamOverride>,
}

impl BatchCutRequest {
    pub fn new(input: impl Into<PathBuf>, segments: Vec<Segment>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            segments,
            streams: None,
            out_dir: out_dir.into(),
            format: None,
            overrides: Vec::new(),
        }
    }

    pub fn with_streams(mut self, streams: Vec<CopyFile>) -> Self {
        self.streams = Some(streams);
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_overrides(mut self, overrides: Vec<StreamOverride>) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Context for one export session.
///
/// After [`ExportSession::abort_all`] every further job is refused with
/// [`SeamcutError::Cancelled`]; start a new session for the next export.
pub struct ExportSession {
    runner: ProcessRunner,
    probe: Arc<dyn ProbePort>,
    keyframes: Arc<KeyframeIndexCache>,
    keyframe_window: f64,
}

impl ExportSession {
    /// Create a session with its own registry and keyframe cache
    pub fn new(tool: Arc<dyn MediaToolPort>, probe: Arc<dyn ProbePort>) -> Self {
        Self {
            runner: ProcessRunner::new(tool),
            keyframes: Arc::new(KeyframeIndexCache::new(probe.clone())),
            probe,
            keyframe_window: DEFAULT_SEARCH_WINDOW,
        }
    }

    /// Seconds searched after a segment start for the next keyframe
    pub fn with_keyframe_window(mut self, window: f64) -> Self {
        self.keyframe_window = window;
        self
    }

    /// Replace the keyframe cache with one of the given capacity
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.keyframes = Arc::new(KeyframeIndexCache::with_capacity(
            self.probe.clone(),
            capacity,
        ));
        self
    }

    pub fn registry(&self) -> &JobRegistry {
        self.runner.registry()
    }

    pub fn keyframes(&self) -> Arc<KeyframeIndexCache> {
        self.keyframes.clone()
    }

    /// Keyframe locator for `path` sharing this session's cache
    pub fn keyframe_locator(&self, path: impl Into<PathBuf>) -> ProbeKeyframeLocator {
        ProbeKeyframeLocator::new(self.keyframes.clone(), path).with_window(self.keyframe_window)
    }

    /// Probe a media file
    pub async fn probe(&self, path: &Path) -> SeamcutResult<ProbeResult> {
        self.probe.probe(path).await
    }

    /// Cancel every running job and refuse new ones.
    ///
    /// Returns the number of jobs that were signalled.
    pub fn abort_all(&self) -> usize {
        let cancelled = self.registry().abort_all();
        info!("Aborting export session, {} running job(s) cancelled", cancelled);
        cancelled
    }

    /// Cut one plan with stream copy
    pub async fn build_and_run_single_cut(
        &self,
        plan: &CutPlan,
        settings: &CutSettings,
        on_progress: ProgressFn<'_>,
    ) -> SeamcutResult<CutOutcome> {
        run_single_cut(&self.runner, plan, settings, on_progress).await
    }

    /// Cut one plan, re-encoding only what the keyframe layout requires
    pub async fn run_smart_cut_segment(
        &self,
        plan: &CutPlan,
        settings: &CutSettings,
        on_progress: ProgressFn<'_>,
    ) -> SeamcutResult<CutOutcome> {
        let primary = plan
            .primary_input()
            .ok_or_else(|| SeamcutError::invalid_range("no input selected for the cut"))?;
        let source = self.probe.probe(primary).await?;
        self.smart_cutter()
            .run(plan, &source, settings, on_progress)
            .await
    }

    /// Cut every segment of `request` into its own file, one after another.
    ///
    /// Overall progress is `(finished + current) / count` and never moves
    /// backwards. An abort stops the batch with [`SeamcutError::Cancelled`];
    /// outputs finished before it are kept.
    pub async fn run_batch_cut(
        &self,
        request: &BatchCutRequest,
        settings: &CutSettings,
        on_progress: ProgressFn<'_>,
    ) -> SeamcutResult<Vec<CutOutcome>> {
        let input_probe = self.probe.probe(&request.input).await?;
        let inputs = request.streams.clone().unwrap_or_else(|| {
            vec![CopyFile::new(
                request.input.clone(),
                input_probe.stream_indices(),
            )]
        });

        let source = match inputs.first() {
            Some(first) if first.path != request.input => self.probe.probe(&first.path).await?,
            _ => input_probe,
        };
        let duration = source.duration();

        // Outputs keep the input's extension
        let extension = extension_of(&request.input).unwrap_or_else(|| "mkv".to_string());
        let format = resolve_format(request.format.as_deref(), &request.input, Some(&source));

        let mut ranges = Vec::with_capacity(request.segments.len());
        for segment in &request.segments {
            if segment.end.is_none() && duration.is_none() {
                return Err(SeamcutError::DurationUnknown);
            }
            let apparent = segment.apparent(duration);
            if !apparent.is_valid() {
                return Err(SeamcutError::invalid_range(format!(
                    "segment [{:.3}s, {:.3}s) is empty",
                    apparent.start, apparent.end
                )));
            }
            ranges.push((apparent.start, apparent.end, segment.name.as_str()));
        }

        let total = ranges.len();
        let overall = MonotonicProgress::new(on_progress);
        let mut outcomes = Vec::with_capacity(total);
        info!(
            "Cutting {} segment(s) of {}",
            total,
            request.input.display()
        );

        for (i, (start, end, name)) in ranges.into_iter().enumerate() {
            if self.registry().is_aborted() {
                info!("Batch aborted before segment {}", i + 1);
                return Err(SeamcutError::Cancelled);
            }

            let output =
                segment_output_path(&request.input, &request.out_dir, start, end, name, &extension);
            let plan = CutPlan::new(inputs.clone(), start, end, output, format.clone())
                .with_media_duration(duration)
                .with_overrides(request.overrides.clone());

            let segment_progress = |p: f64| overall.report((i as f64 + p) / total as f64);
            let result = if settings.smart_cut {
                self.smart_cutter()
                    .run(&plan, &source, settings, &segment_progress)
                    .await
            } else {
                run_single_cut(&self.runner, &plan, settings, &segment_progress).await
            };

            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) if e.is_cancellation() => {
                    info!("Batch cancelled during segment {}", i + 1);
                    return Err(e);
                }
                Err(e) => {
                    error!("Segment {} of {} failed: {}", i + 1, total, e);
                    return Err(e);
                }
            }
        }

        overall.report(1.0);
        Ok(outcomes)
    }

    /// Merge whole files into one output
    pub async fn run_concat(
        &self,
        request: &ConcatRequest,
        settings: &CutSettings,
        on_progress: ProgressFn<'_>,
    ) -> SeamcutResult<CutOutcome> {
        run_concat(&self.runner, self.probe.as_ref(), request, settings, on_progress).await
    }

    /// Run `detector` over `[from, to]` of `file`; `to` defaults to the file's end
    pub async fn detect_intervals(
        &self,
        detector: IntervalDetector,
        file: &Path,
        from: f64,
        to: Option<f64>,
        on_progress: ProgressFn<'_>,
    ) -> SeamcutResult<Vec<Interval>> {
        let to = match to {
            Some(to) => to,
            None => self
                .probe
                .probe(file)
                .await?
                .duration()
                .ok_or(SeamcutError::DurationUnknown)?,
        };
        if to <= from {
            return Err(SeamcutError::invalid_range(format!(
                "detection end {:.3}s must be after start {:.3}s",
                to, from
            )));
        }

        let mut args = vec!["-hide_banner".to_string()];
        if from > 0.0 {
            args.push("-ss".to_string());
            args.push(format_seconds_arg(from));
        }
        args.push("-i".to_string());
        args.push(file.to_string_lossy().into_owned());
        args.push("-t".to_string());
        args.push(format_seconds_arg(to - from));
        args.extend(detector.filter_args());
        args.extend(["-f", "null", "-"].iter().map(|s| s.to_string()));

        info!("Detecting {} in {}", detector, file.display());
        let collector = Mutex::new(IntervalCollector::new(detector.mode(), from, to));
        let span = to - from;
        let on_line = |line: &str| {
            if let Some(event) = detector.match_line(line) {
                collector
                    .lock()
                    .unwrap_or_else(|p| p.into_inner())
                    .push(event);
            } else if let Some(fraction) = parse_progress(line, span) {
                on_progress(fraction);
            }
        };
        self.runner
            .run_with_lines(&ToolInvocation::new(args), &on_line)
            .await?;
        on_progress(1.0);

        let intervals = collector
            .into_inner()
            .unwrap_or_else(|p| p.into_inner())
            .finish();
        info!("Detected {} interval(s)", intervals.len());
        Ok(intervals)
    }

    fn smart_cutter(&self) -> SmartCutter<'_> {
        SmartCutter::new(
            &self.runner,
            self.probe.as_ref(),
            &self.keyframes,
            self.keyframe_window,
        )
    }
}
