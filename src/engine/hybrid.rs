//! Smart cut: re-encode only the head of a segment up to its first keyframe
//!
//! A segment whose start is not on a keyframe is produced in up to three
//! steps: the head `[start, keyframe)` is re-encoded, the tail from the
//! keyframe is stream-copied, and both parts are joined with the concat
//! demuxer. The two parts run concurrently.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::domain::model::KeyframeDirection;
use crate::engine::cleanup::{remove_files, CLEANUP_CONCURRENCY};
use crate::engine::clipper::{remove_partial_output, run_single_cut};
use crate::engine::progress::{scaled, PartsProgress, ProgressFn};
use crate::engine::runner::ProcessRunner;
use crate::engine::CutOutcome;
use crate::error::{SeamcutError, SeamcutResult};
use crate::planner::{
    build_concat_args, decide_smart_cut, AvoidNegativeTs, CodecChoice, ConcatPlan, CopyFile,
    CutPlan, CutSettings, EncoderSettings, PlanOutcome, SmartCutDecision,
};
use crate::ports::ProbePort;
use crate::probe::{KeyframeIndexCache, ProbeResult, StreamInfo};
use crate::utils::path::temp_sibling;

/// Share of the overall progress spent producing the two parts
const PARTS_SPAN: f64 = 0.5;

/// Smart-cut pipeline for one export session
pub struct SmartCutter<'a> {
    runner: &'a ProcessRunner,
    probe: &'a dyn ProbePort,
    keyframes: &'a KeyframeIndexCache,
    /// Seconds searched after the start for the next keyframe
    window: f64,
}

impl<'a> SmartCutter<'a> {
    pub fn new(
        runner: &'a ProcessRunner,
        probe: &'a dyn ProbePort,
        keyframes: &'a KeyframeIndexCache,
        window: f64,
    ) -> Self {
        Self {
            runner,
            probe,
            keyframes,
            window,
        }
    }

    /// Decide how `plan` must be cut given the probed primary input
    pub async fn decide(
        &self,
        plan: &CutPlan,
        source: &ProbeResult,
    ) -> SeamcutResult<SmartCutDecision> {
        let (input, video) = match selected_video_stream(plan, source) {
            Some(found) => found,
            None => {
                debug!("No video stream selected, smart cut falls back to a plain cut");
                return Ok(SmartCutDecision::Plain);
            }
        };

        self.keyframes
            .ensure_window(&input.path, plan.from, self.window)
            .await?;
        let searched_until = plan.from + self.window;
        let next_keyframe = self
            .keyframes
            .find_nearest_keyframe(plan.from, KeyframeDirection::After)
            .filter(|keyframe| *keyframe <= searched_until);

        decide_smart_cut(
            plan.from,
            plan.to,
            next_keyframe,
            searched_until,
            video.frame_rate(),
        )
    }

    /// Produce the output of `plan`, re-encoding as little as possible
    pub async fn run(
        &self,
        plan: &CutPlan,
        source: &ProbeResult,
        settings: &CutSettings,
        on_progress: ProgressFn<'_>,
    ) -> SeamcutResult<CutOutcome> {
        if !settings.overwrite && plan.output.exists() {
            info!("Output {} already exists, skipping", plan.output.display());
            on_progress(1.0);
            return Ok(CutOutcome::Skipped(plan.output.clone()));
        }

        let decision = self.decide(plan, source).await?;
        info!("Smart cut {}: {:?}", plan, decision);

        match decision {
            SmartCutDecision::Plain => {
                run_single_cut(self.runner, plan, settings, on_progress).await
            }
            SmartCutDecision::CopyFromKeyframe { keyframe } => {
                let mut copy_plan = plan.clone();
                copy_plan.from = keyframe;
                run_single_cut(self.runner, &copy_plan, settings, on_progress).await
            }
            SmartCutDecision::EncodeWhole => {
                let codec = encode_choice(plan, source)?;
                let encode_plan = plan.clone().with_codec(codec);
                let encode_settings = settings.clone().with_keyframe_cut(false);
                run_single_cut(self.runner, &encode_plan, &encode_settings, on_progress).await
            }
            SmartCutDecision::EncodePart {
                keyframe,
                encode_to,
            } => {
                self.run_parts(plan, source, settings, keyframe, encode_to, on_progress)
                    .await
            }
        }
    }

    /// Encode the head and copy the tail, then join them.
    ///
    /// The encoded part maps every selected stream, not only the video, so
    /// both parts share the stream layout the concat demuxer requires.
    async fn run_parts(
        &self,
        plan: &CutPlan,
        source: &ProbeResult,
        settings: &CutSettings,
        keyframe: f64,
        encode_to: f64,
        on_progress: ProgressFn<'_>,
    ) -> SeamcutResult<CutOutcome> {
        let codec = encode_choice(plan, source)?;
        let encoded_path = temp_sibling(&plan.output, "encoded");
        let copy_path = temp_sibling(&plan.output, "copy");

        let mut part_settings = settings.clone().with_overwrite(true);
        part_settings.segments_to_chapters = false;
        // Tags are written once, on the joined output
        part_settings.custom_tags.clear();

        let mut encode_plan = plan.clone().with_codec(codec);
        encode_plan.to = encode_to;
        encode_plan.chapters = None;
        encode_plan.output = encoded_path.clone();
        let encode_settings = part_settings.clone().with_keyframe_cut(false);

        let mut copy_plan = plan.clone();
        copy_plan.from = keyframe;
        copy_plan.chapters = None;
        copy_plan.output = copy_path.clone();
        let mut copy_settings = part_settings.with_keyframe_cut(true);
        // Join timestamps come from the concat demuxer
        copy_settings.avoid_negative_ts = AvoidNegativeTs::Disabled;

        debug!(
            "Encoding [{:.3}, {:.3}] and copying [{:.3}, {:.3})",
            plan.from, encode_to, keyframe, plan.to
        );

        let parts_sink = |p: f64| on_progress(scaled(p, 0.0, PARTS_SPAN));
        let parts = PartsProgress::new(2, &parts_sink);
        let encode_progress = |p: f64| parts.update(0, p);
        let copy_progress = |p: f64| parts.update(1, p);

        let result = match tokio::try_join!(
            run_single_cut(self.runner, &encode_plan, &encode_settings, &encode_progress),
            run_single_cut(self.runner, &copy_plan, &copy_settings, &copy_progress),
        ) {
            Ok(_) => {
                let parts = vec![encoded_path.clone(), copy_path.clone()];
                self.join_parts(plan, settings, parts, on_progress).await
            }
            Err(e) => Err(e),
        };

        let removed = remove_files(vec![encoded_path, copy_path], CLEANUP_CONCURRENCY).await;
        debug!("Removed {} intermediate file(s)", removed);
        result
    }

    async fn join_parts(
        &self,
        plan: &CutPlan,
        settings: &CutSettings,
        parts: Vec<PathBuf>,
        on_progress: ProgressFn<'_>,
    ) -> SeamcutResult<CutOutcome> {
        let tail = parts
            .last()
            .map(|p| p.as_path())
            .unwrap_or(plan.output.as_path());
        let tail_probe = self.probe.probe(tail).await?;

        let concat = ConcatPlan {
            files: parts,
            streams: tail_probe.stream_indices(),
            chapters: plan.chapters.clone(),
            output: plan.output.clone(),
            format: plan.format.clone(),
        };
        let planned = match build_concat_args(&concat, settings)? {
            PlanOutcome::Skip => {
                warn!(
                    "Output {} appeared while cutting, keeping it",
                    plan.output.display()
                );
                on_progress(1.0);
                return Ok(CutOutcome::Skipped(plan.output.clone()));
            }
            PlanOutcome::Run(planned) => planned,
        };

        let rate = settings.output_playback_rate;
        let output_duration = if rate > 0.0 {
            plan.duration() / rate
        } else {
            plan.duration()
        };
        let join_progress = |p: f64| on_progress(scaled(p, PARTS_SPAN, 1.0 - PARTS_SPAN));
        let result = self
            .runner
            .run(&planned.invocation, Some(output_duration), &join_progress)
            .await;
        drop(planned);

        match result {
            Ok(_) => Ok(CutOutcome::Written(plan.output.clone())),
            Err(e) => {
                remove_partial_output(&plan.output).await;
                Err(e)
            }
        }
    }
}

/// First selected video stream of the primary input, if any
fn selected_video_stream<'p>(
    plan: &'p CutPlan,
    source: &'p ProbeResult,
) -> Option<(&'p CopyFile, &'p StreamInfo)> {
    let input = plan.inputs.first()?;
    input
        .streams
        .iter()
        .filter_map(|index| source.stream(*index))
        .find(|stream| stream.is_video() && !stream.is_attached_picture())
        .map(|stream| (input, stream))
}

fn encode_choice(plan: &CutPlan, source: &ProbeResult) -> SeamcutResult<CodecChoice> {
    let (input, video) =
        selected_video_stream(plan, source).ok_or_else(|| SeamcutError::SmartCutUnsupported {
            reason: "no video stream selected".to_string(),
        })?;
    Ok(CodecChoice::Encode {
        file: input.path.clone(),
        stream: video.index,
        settings: EncoderSettings::for_stream(video)?,
    })
}
