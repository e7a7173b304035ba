//! Merging whole files with the concat demuxer

use std::path::PathBuf;

use tracing::info;

use crate::domain::model::Chapter;
use crate::engine::clipper::remove_partial_output;
use crate::engine::progress::ProgressFn;
use crate::engine::runner::ProcessRunner;
use crate::engine::{resolve_format, CutOutcome};
use crate::error::{SeamcutError, SeamcutResult};
use crate::planner::{build_concat_args, ConcatPlan, CutSettings, PlanOutcome};
use crate::ports::ProbePort;

/// Files to merge, in join order
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatRequest {
    pub files: Vec<PathBuf>,
    pub output: PathBuf,
    /// Output muxer; derived from the output name when unset
    pub format: Option<String>,
}

impl ConcatRequest {
    pub fn new(files: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            files,
            output: output.into(),
            format: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// One chapter per file, named after the file stem
pub fn chapters_for_files(files: &[PathBuf], durations: &[f64]) -> Vec<Chapter> {
    let mut chapters = Vec::with_capacity(files.len());
    let mut at = 0.0;
    for (file, duration) in files.iter().zip(durations) {
        chapters.push(Chapter {
            start: at,
            end: at + duration,
            name: file.file_stem().map(|s| s.to_string_lossy().into_owned()),
        });
        at += duration;
    }
    chapters
}

/// Merge `request.files` into one output, mapping the streams of the first file
pub async fn run_concat(
    runner: &ProcessRunner,
    probe: &dyn ProbePort,
    request: &ConcatRequest,
    settings: &CutSettings,
    on_progress: ProgressFn<'_>,
) -> SeamcutResult<CutOutcome> {
    if request.files.is_empty() {
        return Err(SeamcutError::invalid_range("no files to concatenate"));
    }
    if !settings.overwrite && request.output.exists() {
        info!("Output {} already exists, skipping", request.output.display());
        on_progress(1.0);
        return Ok(CutOutcome::Skipped(request.output.clone()));
    }

    let mut probes = Vec::with_capacity(request.files.len());
    for file in &request.files {
        probes.push(probe.probe(file).await?);
    }
    let durations: Option<Vec<f64>> = probes.iter().map(|p| p.duration()).collect();

    let chapters = if settings.segments_to_chapters {
        let durations = durations.as_deref().ok_or(SeamcutError::DurationUnknown)?;
        Some(chapters_for_files(&request.files, durations))
    } else {
        None
    };

    let first = probes.first();
    let plan = ConcatPlan {
        files: request.files.clone(),
        streams: first.map(|p| p.stream_indices()).unwrap_or_default(),
        chapters,
        output: request.output.clone(),
        format: resolve_format(request.format.as_deref(), &request.output, first),
    };

    let planned = match build_concat_args(&plan, settings)? {
        PlanOutcome::Skip => {
            on_progress(1.0);
            return Ok(CutOutcome::Skipped(request.output.clone()));
        }
        PlanOutcome::Run(planned) => planned,
    };

    info!(
        "Merging {} file(s) into {}",
        request.files.len(),
        request.output.display()
    );
    let total = durations.map(|d| d.iter().sum::<f64>());
    let result = runner.run(&planned.invocation, total, on_progress).await;
    drop(planned);

    match result {
        Ok(_) => Ok(CutOutcome::Written(request.output.clone())),
        Err(e) => {
            remove_partial_output(&request.output).await;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapters_follow_file_order() {
        let files = vec![PathBuf::from("/a/intro.mp4"), PathBuf::from("/a/main.mp4")];
        let chapters = chapters_for_files(&files, &[2.5, 10.0]);
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].start, 0.0);
        assert_eq!(chapters[0].end, 2.5);
        assert_eq!(chapters[1].start, 2.5);
        assert_eq!(chapters[1].end, 12.5);
        assert_eq!(chapters[1].name.as_deref(), Some("main"));
    }
}
