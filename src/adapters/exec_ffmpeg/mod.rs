//! FFmpeg execution adapter
//!
//! Runs the `ffmpeg` command-line tool as a child process. The error channel
//! is read incrementally and split on both `\r` and `\n`, since ffmpeg
//! rewrites its progress line in place with carriage returns.

use std::collections::VecDeque;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::engine::cancel::CancelToken;
use crate::error::{SeamcutError, SeamcutResult};
use crate::ports::{LineSink, MediaToolPort, ToolInvocation, ToolOutput};

/// Number of log lines kept for error reports
const LOG_TAIL_LINES: usize = 20;

const READ_CHUNK: usize = 4096;

/// FFmpeg-based execution adapter
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    program: String,
}

impl FfmpegTool {
    /// Use the given executable name or path
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn failure(&self, exit_code: Option<i32>, log_tail: impl Into<String>) -> SeamcutError {
        SeamcutError::ExternalToolFailure {
            program: self.program.clone(),
            exit_code,
            log_tail: log_tail.into(),
        }
    }
}

impl Default for FfmpegTool {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl MediaToolPort for FfmpegTool {
    fn program(&self) -> &str {
        &self.program
    }

    async fn run(
        &self,
        invocation: &ToolInvocation,
        cancel: &CancelToken,
        on_line: LineSink<'_>,
    ) -> SeamcutResult<ToolOutput> {
        if cancel.is_cancelled() {
            return Err(SeamcutError::Cancelled);
        }

        let mut command = Command::new(&self.program);
        command
            .kill_on_drop(true)
            .args(&invocation.args)
            .stdin(if invocation.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| self.failure(None, format!("failed to start: {}", e)))?;

        let stdin_task = match (child.stdin.take(), invocation.stdin.clone()) {
            (Some(mut stdin), Some(payload)) => Some(tokio::spawn(async move {
                stdin.write_all(payload.as_bytes()).await?;
                stdin.shutdown().await
            })),
            _ => None,
        };

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| self.failure(None, "error channel was not captured"))?;
        let mut lines = LogLines::new(stderr);
        let mut tail = LogTail::new(LOG_TAIL_LINES);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Terminating {}", self.program);
                    if let Err(e) = child.kill().await {
                        warn!("Failed to terminate {}: {}", self.program, e);
                    }
                    return Err(SeamcutError::Cancelled);
                }
                line = lines.next_line() => match line? {
                    Some(line) => {
                        on_line(&line);
                        tail.push(line);
                    }
                    None => break,
                },
            }
        }

        let status = tokio::select! {
            _ = cancel.cancelled() => {
                if let Err(e) = child.kill().await {
                    warn!("Failed to terminate {}: {}", self.program, e);
                }
                return Err(SeamcutError::Cancelled);
            }
            status = child.wait() => status?,
        };

        if let Some(task) = stdin_task {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!("Writing stdin of {} failed: {}", self.program, e),
                Err(e) => debug!("Stdin writer of {} panicked: {}", self.program, e),
            }
        }

        let log_tail = tail.joined();
        if status.success() {
            Ok(ToolOutput { log_tail })
        } else {
            Err(self.failure(status.code(), log_tail))
        }
    }
}

/// Splits a byte stream into lines on `\r` or `\n`, skipping empty lines
pub(crate) struct LogLines<R> {
    reader: R,
    buffer: Vec<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LogLines<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            eof: false,
        }
    }

    /// Next non-empty line, or `None` at the end of the stream.
    ///
    /// Safe to drop mid-await: bytes already read stay buffered.
    pub(crate) async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|b| *b == b'\r' || *b == b'\n') {
                let rest = self.buffer.split_off(pos + 1);
                let mut line = std::mem::replace(&mut self.buffer, rest);
                line.truncate(pos);
                if line.is_empty() {
                    continue;
                }
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            if self.eof {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                let line = std::mem::take(&mut self.buffer);
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            let mut chunk = [0u8; READ_CHUNK];
            let read = self.reader.read(&mut chunk).await?;
            if read == 0 {
                self.eof = true;
            } else {
                self.buffer.extend_from_slice(&chunk[..read]);
            }
        }
    }
}

/// Last `capacity` log lines
struct LogTail {
    lines: VecDeque<String>,
    capacity: usize,
}

impl LogTail {
    fn new(capacity: usize) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    fn push(&mut self, line: String) {
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    fn joined(&self) -> String {
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}
