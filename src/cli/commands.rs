//! Command implementations

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use anyhow::{anyhow, bail, Context, Result};
use tracing::info;

use crate::adapters::toml_config::AppConfig;
use crate::cli::args::{parse_segment_spec, parse_tag, ConcatArgs, CutArgs, DetectArgs, KeyframesArgs};
use crate::cli::Commands;
use crate::domain::model::{BoundSelector, KeyframeDirection, Segment};
use crate::engine::{BatchCutRequest, ConcatRequest, CutOutcome, ExportSession, IntervalDetector};
use crate::error::SeamcutResult;
use crate::planner::{AvoidNegativeTs, CopyFile, CutSettings, PreserveMetadata};
use crate::segments::project::ProjectFile;
use crate::segments::SegmentStore;
use crate::utils::time::{format_timecode, parse_time};

/// Run one command against a session
pub async fn execute(session: &ExportSession, config: &AppConfig, command: Commands) -> Result<()> {
    match command {
        Commands::Cut(args) => cut(session, config, args).await,
        Commands::Concat(args) => concat(session, config, args).await,
        Commands::Keyframes(args) => keyframes(session, config, args).await,
        Commands::Detect(args) => detect(session, args).await,
    }
}

/// Execute the cut command
pub async fn cut(session: &ExportSession, config: &AppConfig, args: CutArgs) -> Result<()> {
    info!("Starting cut operation");
    info!("Input: {}", args.input.display());

    if !args.input.exists() {
        return Err(anyhow!("Input file does not exist: {}", args.input.display()));
    }

    let probe = session
        .probe(&args.input)
        .await
        .context("Failed to probe input file")?;
    let duration = probe.duration();

    let mut store = if let Some(project) = &args.project {
        ProjectFile::load(project)
            .await
            .with_context(|| format!("Failed to load project {}", project.display()))?
            .into_store(duration)?
    } else if args.segments.is_empty() {
        bail!("No segments given; use --segment or --project");
    } else {
        let segments = args
            .segments
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                parse_segment_spec(spec)
                    .map(|s| Segment::new(s.start, s.end, i as u32).with_name(s.name))
            })
            .collect::<SeamcutResult<Vec<_>>>()
            .context("Invalid --segment value")?;
        SegmentStore::from_segments(segments, duration)?
    };

    if let Some(align) = &args.align {
        let direction = KeyframeDirection::parse(align)
            .ok_or_else(|| anyhow!("Invalid --align '{}', expected nearest, before or after", align))?;
        let locator = session.keyframe_locator(&args.input);
        store
            .align_selected_to_keyframes(&locator, BoundSelector::Both, direction)
            .await
            .context("Failed to align segments to keyframes")?;
    }

    if args.invert {
        let created = store.invert_all().context("Failed to invert segments")?;
        if created == 0 {
            bail!("The segments cover the whole file, nothing is left after inverting");
        }
    }

    if let Some(path) = &args.save_project {
        let media_file_name = args
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        ProjectFile::from_store(&store, media_file_name)
            .save(path)
            .await
            .with_context(|| format!("Failed to save project {}", path.display()))?;
    }

    let settings = cut_settings(&config.cut, &args)?;
    let out_dir = args
        .out_dir
        .clone()
        .or_else(|| args.input.parent().map(Path::to_path_buf))
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("."));
    tokio::fs::create_dir_all(&out_dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    let segments = store.selected_segments().into_iter().cloned().collect();
    let mut request = BatchCutRequest::new(&args.input, segments, out_dir);
    if !args.streams.is_empty() {
        request = request.with_streams(vec![CopyFile::new(&args.input, args.streams.clone())]);
    }
    if let Some(format) = &args.format {
        request = request.with_format(format);
    }

    let progress = progress_logger("Cutting");
    let outcomes = session
        .run_batch_cut(&request, &settings, &progress)
        .await
        .context("Failed to cut segments")?;
    print_outcomes(&outcomes);

    info!("Cut operation completed successfully");
    Ok(())
}

/// Execute the concat command
pub async fn concat(session: &ExportSession, config: &AppConfig, args: ConcatArgs) -> Result<()> {
    info!("Starting concat operation");

    for file in &args.files {
        if !file.exists() {
            return Err(anyhow!("Input file does not exist: {}", file.display()));
        }
    }

    let mut settings = config.cut.clone();
    settings.overwrite |= args.overwrite;
    settings.segments_to_chapters |= args.chapters;

    let mut request = ConcatRequest::new(args.files, args.output);
    if let Some(format) = args.format {
        request = request.with_format(format);
    }

    let progress = progress_logger("Merging");
    let outcome = session
        .run_concat(&request, &settings, &progress)
        .await
        .context("Failed to merge files")?;
    print_outcomes(&[outcome]);

    info!("Concat operation completed successfully");
    Ok(())
}

/// Execute the keyframes command
pub async fn keyframes(session: &ExportSession, config: &AppConfig, args: KeyframesArgs) -> Result<()> {
    if !args.input.exists() {
        return Err(anyhow!("Input file does not exist: {}", args.input.display()));
    }

    let at = parse_time(&args.at).with_context(|| format!("Invalid time '{}'", args.at))?;
    let window = args.window.unwrap_or(config.keyframes.window);
    if window <= 0.0 {
        bail!("The search window must be positive");
    }

    let cache = session.keyframes();
    let samples: Vec<_> = cache
        .ensure_window(&args.input, at, window)
        .await
        .context("Failed to read keyframes")?
        .into_iter()
        .filter(|s| s.is_keyframe && (s.time - at).abs() <= window)
        .collect();

    if args.json {
        let json = serde_json::to_string_pretty(&samples)
            .context("Failed to serialize keyframes to JSON")?;
        println!("{}", json);
        return Ok(());
    }

    println!("Keyframes within {:.1}s of {}:", window, format_timecode(at));
    for sample in &samples {
        println!("  {}  ({:.6}s)", format_timecode(sample.time), sample.time);
    }
    for direction in [KeyframeDirection::Before, KeyframeDirection::After] {
        if let Some(keyframe) = cache
            .find_nearest_keyframe(at, direction)
            .filter(|k| (k - at).abs() <= window)
        {
            println!("{:?}: {}", direction, format_timecode(keyframe));
        }
    }
    Ok(())
}

/// Execute the detect command
pub async fn detect(session: &ExportSession, args: DetectArgs) -> Result<()> {
    if !args.input.exists() {
        return Err(anyhow!("Input file does not exist: {}", args.input.display()));
    }

    let detector = IntervalDetector::parse(&args.kind)
        .ok_or_else(|| anyhow!("Unknown detector '{}'", args.kind))?;
    let from = match &args.from {
        Some(from) => parse_time(from).with_context(|| format!("Invalid --from '{}'", from))?,
        None => 0.0,
    };
    let to = match &args.to {
        Some(to) => Some(parse_time(to).with_context(|| format!("Invalid --to '{}'", to))?),
        None => None,
    };

    let progress = progress_logger("Detecting");
    let intervals = session
        .detect_intervals(detector, &args.input, from, to, &progress)
        .await
        .context("Failed to detect intervals")?;

    if args.json {
        let json = serde_json::to_string_pretty(&intervals)
            .context("Failed to serialize intervals to JSON")?;
        println!("{}", json);
    } else {
        for interval in &intervals {
            println!(
                "{} - {}",
                format_timecode(interval.start),
                format_timecode(interval.end)
            );
        }
    }
    Ok(())
}

/// Merge the cut flags into the configured defaults
fn cut_settings(defaults: &CutSettings, args: &CutArgs) -> Result<CutSettings> {
    let mut settings = defaults.clone();
    settings.smart_cut |= args.smart_cut;
    settings.overwrite |= args.overwrite;
    if let Some(keyframe_cut) = args.keyframe_cut {
        settings.keyframe_cut = keyframe_cut;
    }
    if let Some(mode) = &args.preserve_metadata {
        settings.preserve_metadata = PreserveMetadata::parse(mode)
            .ok_or_else(|| anyhow!("Invalid --preserve-metadata '{}'", mode))?;
    }
    if let Some(mode) = &args.avoid_negative_ts {
        settings.avoid_negative_ts = AvoidNegativeTs::parse(mode)
            .ok_or_else(|| anyhow!("Invalid --avoid-negative-ts '{}'", mode))?;
    }
    if let Some(rate) = args.playback_rate {
        if !(rate > 0.0 && rate.is_finite()) {
            bail!("The playback rate must be positive");
        }
        settings.output_playback_rate = rate;
    }
    if args.rotate.is_some() {
        settings.rotation = args.rotate;
    }
    for tag in &args.tags {
        let (key, value) =
            parse_tag(tag).ok_or_else(|| anyhow!("Invalid --tag '{}', expected KEY=VALUE", tag))?;
        settings.custom_tags.insert(key, value);
    }
    Ok(settings)
}

/// Log progress in steps of ten percent
fn progress_logger(label: &'static str) -> impl Fn(f64) + Send + Sync {
    let last = AtomicU32::new(0);
    move |fraction: f64| {
        let step = ((fraction.clamp(0.0, 1.0) * 100.0) as u32) / 10 * 10;
        if last.fetch_max(step, Ordering::Relaxed) < step {
            info!("{} {}%", label, step);
        }
    }
}

fn print_outcomes(outcomes: &[CutOutcome]) {
    for outcome in outcomes {
        match outcome {
            CutOutcome::Written(path) => println!("Wrote {}", path.display()),
            CutOutcome::Skipped(path) => println!("Skipped {} (already exists)", path.display()),
        }
    }
}
