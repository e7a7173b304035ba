//! Process runner: registers each invocation and feeds its log into the progress parser

use std::sync::Arc;

use tracing::{debug, error};

use crate::engine::cancel::JobRegistry;
use crate::engine::progress::{parse_progress, ProgressFn};
use crate::error::{SeamcutError, SeamcutResult};
use crate::ports::{LineSink, MediaToolPort, ToolInvocation, ToolOutput};

/// Runs external-tool invocations on behalf of one export session
#[derive(Clone)]
pub struct ProcessRunner {
    tool: Arc<dyn MediaToolPort>,
    registry: JobRegistry,
}

impl ProcessRunner {
    /// Create a runner over a tool with its own registry
    pub fn new(tool: Arc<dyn MediaToolPort>) -> Self {
        Self::with_registry(tool, JobRegistry::new())
    }

    /// Create a runner sharing an existing registry
    pub fn with_registry(tool: Arc<dyn MediaToolPort>, registry: JobRegistry) -> Self {
        Self { tool, registry }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Run an invocation, mapping `time=` lines to progress against `duration`
    pub async fn run(
        &self,
        invocation: &ToolInvocation,
        duration: Option<f64>,
        on_progress: ProgressFn<'_>,
    ) -> SeamcutResult<ToolOutput> {
        let on_line = |line: &str| {
            if let Some(fraction) = duration.and_then(|d| parse_progress(line, d)) {
                on_progress(fraction);
            }
        };
        let output = self.run_with_lines(invocation, &on_line).await?;
        on_progress(1.0);
        Ok(output)
    }

    /// Run an invocation, handing every log line to `on_line`
    pub async fn run_with_lines(
        &self,
        invocation: &ToolInvocation,
        on_line: LineSink<'_>,
    ) -> SeamcutResult<ToolOutput> {
        if self.registry.is_aborted() {
            return Err(SeamcutError::Cancelled);
        }

        let guard = self.registry.register();
        debug!(
            job = guard.id(),
            "Running {} {}",
            self.tool.program(),
            invocation.args.join(" ")
        );

        let result = self.tool.run(invocation, guard.token(), on_line).await;
        match &result {
            Ok(_) => debug!(job = guard.id(), "{} finished", self.tool.program()),
            Err(SeamcutError::Cancelled) => {
                debug!(job = guard.id(), "{} cancelled", self.tool.program())
            }
            Err(e) => error!(job = guard.id(), "{} failed: {}", self.tool.program(), e),
        }
        result
    }
}
