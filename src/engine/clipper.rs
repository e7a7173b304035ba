//! Single cut: one plan, one invocation, one output

use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::engine::progress::ProgressFn;
use crate::engine::runner::ProcessRunner;
use crate::engine::CutOutcome;
use crate::error::SeamcutResult;
use crate::planner::{build_cut_args, CutPlan, CutSettings, PlanOutcome};

/// Build the arguments for `plan` and run them.
///
/// A skipped output reports full progress and returns
/// [`CutOutcome::Skipped`]. On failure or cancellation the partial output is
/// removed; the chapter resource is removed in every case.
pub async fn run_single_cut(
    runner: &ProcessRunner,
    plan: &CutPlan,
    settings: &CutSettings,
    on_progress: ProgressFn<'_>,
) -> SeamcutResult<CutOutcome> {
    let planned = match build_cut_args(plan, settings)? {
        PlanOutcome::Skip => {
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

    info!("Cutting {}", plan);
    let result = runner
        .run(&planned.invocation, Some(output_duration), on_progress)
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

/// Remove an output left behind by a failed or cancelled invocation
pub(crate) async fn remove_partial_output(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial output {}: {}", path.display(), e),
    }
}
