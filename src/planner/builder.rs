//! Cut Plan Builder: translates cut and concat plans into tool argument vectors

use std::path::PathBuf;

use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::domain::model::Chapter;
use crate::error::{SeamcutError, SeamcutResult};
use crate::planner::chapters::write_chapter_file;
use crate::planner::stream_map::{output_stream_count, output_stream_index};
use crate::planner::{CodecChoice, CutPlan, CutSettings, PreserveMetadata};
use crate::ports::ToolInvocation;
use crate::utils::path::concat_list;
use crate::utils::time::format_seconds_arg;

/// Muxers of the mov family accepting `-movflags` and `-video_track_timescale`
const MOV_FORMATS: &[&str] = &["mov", "mp4", "ipod", "3gp", "3g2", "f4v", "psp", "ismv"];

/// Muxers accepting `-default_mode`
const MATROSKA_FORMATS: &[&str] = &["matroska", "webm"];

/// A ready-to-run invocation plus resources that must outlive it
#[derive(Debug)]
pub struct PlannedCut {
    pub invocation: ToolInvocation,
    /// Temporary chapter resource; deleted when dropped
    pub chapter_file: Option<NamedTempFile>,
}

/// Result of planning one output
#[derive(Debug)]
pub enum PlanOutcome {
    Run(PlannedCut),
    /// The output exists and overwriting is disabled
    Skip,
}

/// Inputs for a concat-demuxer merge
#[derive(Debug, Clone, PartialEq)]
pub struct ConcatPlan {
    /// Files in join order
    pub files: Vec<PathBuf>,
    /// Stream indices of the first file to map
    pub streams: Vec<usize>,
    pub chapters: Option<Vec<Chapter>>,
    pub output: PathBuf,
    pub format: String,
}

/// Build the invocation for a single cut
pub fn build_cut_args(plan: &CutPlan, settings: &CutSettings) -> SeamcutResult<PlanOutcome> {
    if !settings.overwrite && plan.output.exists() {
        info!(
            "Output {} already exists, skipping",
            plan.output.display()
        );
        return Ok(PlanOutcome::Skip);
    }
    if output_stream_count(&plan.inputs) == 0 {
        return Err(SeamcutError::invalid_range("no streams selected for the output"));
    }
    if plan.to <= plan.from {
        return Err(SeamcutError::invalid_range(format!(
            "cut end {:.3}s must be after start {:.3}s",
            plan.to, plan.from
        )));
    }

    let chapter_file = match &plan.chapters {
        Some(chapters) if !chapters.is_empty() => Some(write_chapter_file(chapters)?),
        _ => None,
    };

    let rate = settings.output_playback_rate;
    let scale_args: Vec<String> = if rate > 0.0 && (rate - 1.0).abs() > f64::EPSILON {
        vec!["-itsscale".to_string(), (1.0 / rate).to_string()]
    } else {
        Vec::new()
    };
    let seek_args: Vec<String> = if plan.trims_start() {
        vec!["-ss".to_string(), format_seconds_arg(plan.from)]
    } else {
        Vec::new()
    };

    let mut args = vec!["-hide_banner".to_string()];

    for input in &plan.inputs {
        args.extend(scale_args.iter().cloned());
        if settings.keyframe_cut {
            args.extend(seek_args.iter().cloned());
        }
        args.push("-i".to_string());
        args.push(input.path.to_string_lossy().into_owned());
    }
    if let Some(file) = &chapter_file {
        push_all(&mut args, &["-f", "ffmetadata", "-i"]);
        args.push(file.path().to_string_lossy().into_owned());
    }
    if !settings.keyframe_cut {
        args.extend(seek_args.iter().cloned());
    }
    if plan.trims_end() {
        let scaled = if scale_args.is_empty() {
            plan.duration()
        } else {
            plan.duration() / rate
        };
        args.push("-t".to_string());
        args.push(format_seconds_arg(scaled));
    }
    if plan.trims_start() {
        args.push("-avoid_negative_ts".to_string());
        args.push(settings.avoid_negative_ts.as_arg().to_string());
    }

    for (file_index, input) in plan.inputs.iter().enumerate() {
        for stream in &input.streams {
            args.push("-map".to_string());
            args.push(format!("{}:{}", file_index, stream));
        }
    }
    push_all(&mut args, &["-c", "copy"]);

    let mut encoder_timescale = None;
    if let CodecChoice::Encode {
        file,
        stream,
        settings: encoder,
    } = &plan.codec
    {
        let output_index = output_stream_index(&plan.inputs, file, *stream).ok_or_else(|| {
            SeamcutError::SmartCutUnsupported {
                reason: format!(
                    "stream {} of {} is not part of the output",
                    stream,
                    file.display()
                ),
            }
        })?;
        args.extend(encoder.args(output_index));
        encoder_timescale = encoder.timescale;
    }

    for stream_override in &plan.overrides {
        let Some(index) =
            output_stream_index(&plan.inputs, &stream_override.file, stream_override.stream)
        else {
            warn!(
                "Ignoring overrides for stream {} of {}, it is not copied",
                stream_override.stream,
                stream_override.file.display()
            );
            continue;
        };
        for (key, value) in &stream_override.metadata {
            args.push(format!("-metadata:s:{}", index));
            args.push(format!("{}={}", key, value));
        }
        if let Some(disposition) = &stream_override.disposition {
            args.push(format!("-disposition:{}", index));
            args.push(disposition.clone());
        }
        if let Some(filter) = &stream_override.bitstream_filter {
            args.push(format!("-bsf:{}", index));
            args.push(filter.clone());
        }
    }

    args.extend(metadata_args(settings.preserve_metadata));
    if chapter_file.is_some() {
        args.push("-map_chapters".to_string());
        args.push(plan.inputs.len().to_string());
    }
    args.extend(container_args(&plan.format, settings));
    args.extend(tag_args(settings));

    if let Some(rotation) = settings.rotation {
        args.push("-metadata:s:v:0".to_string());
        args.push(format!("rotate={}", rotation));
    }
    if let Some(timescale) = encoder_timescale.or(settings.video_timescale) {
        if MOV_FORMATS.contains(&plan.format.as_str()) {
            args.push("-video_track_timescale".to_string());
            args.push(timescale.to_string());
        }
    }

    push_all(&mut args, &["-ignore_unknown", "-f"]);
    args.push(plan.format.clone());
    args.push("-y".to_string());
    args.push(plan.output.to_string_lossy().into_owned());

    Ok(PlanOutcome::Run(PlannedCut {
        invocation: ToolInvocation::new(args),
        chapter_file,
    }))
}

/// Build the invocation joining `plan.files` with the concat demuxer
pub fn build_concat_args(plan: &ConcatPlan, settings: &CutSettings) -> SeamcutResult<PlanOutcome> {
    if !settings.overwrite && plan.output.exists() {
        info!(
            "Output {} already exists, skipping",
            plan.output.display()
        );
        return Ok(PlanOutcome::Skip);
    }
    if plan.files.is_empty() {
        return Err(SeamcutError::invalid_range("no files to concatenate"));
    }

    let list = concat_list(&plan.files)?;
    let chapter_file = match &plan.chapters {
        Some(chapters) if !chapters.is_empty() => Some(write_chapter_file(chapters)?),
        _ => None,
    };

    let mut args = vec!["-hide_banner".to_string()];
    push_all(
        &mut args,
        &[
            "-f",
            "concat",
            "-safe",
            "0",
            "-protocol_whitelist",
            "file,pipe,fd",
            "-i",
            "-",
        ],
    );
    if let Some(file) = &chapter_file {
        push_all(&mut args, &["-f", "ffmetadata", "-i"]);
        args.push(file.path().to_string_lossy().into_owned());
    }

    for stream in &plan.streams {
        args.push("-map".to_string());
        args.push(format!("0:{}", stream));
    }
    push_all(&mut args, &["-c", "copy"]);

    args.extend(metadata_args(settings.preserve_metadata));
    if chapter_file.is_some() {
        push_all(&mut args, &["-map_chapters", "1"]);
    }
    args.extend(container_args(&plan.format, settings));
    args.extend(tag_args(settings));

    push_all(&mut args, &["-ignore_unknown", "-f"]);
    args.push(plan.format.clone());
    args.push("-y".to_string());
    args.push(plan.output.to_string_lossy().into_owned());

    Ok(PlanOutcome::Run(PlannedCut {
        invocation: ToolInvocation::new(args).with_stdin(list),
        chapter_file,
    }))
}

fn metadata_args(preserve: PreserveMetadata) -> Vec<String> {
    let pair = match preserve {
        PreserveMetadata::Default => ["-map_metadata", "0"],
        PreserveMetadata::NonGlobal => ["-map_metadata:g", "-1"],
        PreserveMetadata::None => ["-map_metadata", "-1"],
    };
    pair.iter().map(|s| s.to_string()).collect()
}

fn container_args(format: &str, settings: &CutSettings) -> Vec<String> {
    if MOV_FORMATS.contains(&format) {
        let mut flags = Vec::new();
        if settings.preserve_mov_data {
            flags.push("+use_metadata_tags");
        }
        if settings.mov_fast_start {
            flags.push("+faststart");
        }
        if flags.is_empty() {
            return Vec::new();
        }
        return vec!["-movflags".to_string(), flags.concat()];
    }
    if MATROSKA_FORMATS.contains(&format) {
        return vec!["-default_mode".to_string(), "infer_no_subs".to_string()];
    }
    Vec::new()
}

fn tag_args(settings: &CutSettings) -> Vec<String> {
    settings
        .custom_tags
        .iter()
        .flat_map(|(key, value)| ["-metadata".to_string(), format!("{}={}", key, value)])
        .collect()
}

fn push_all(args: &mut Vec<String>, values: &[&str]) {
    args.extend(values.iter().map(|s| s.to_string()));
}
