//! Infrastructure implementation of the `CommandRunner` port.
//!
//! `TokioCommandRunner` is the production implementation that uses tokio
//! for async process execution with guaranteed timeout and kill on all platforms.

use std::collections::VecDeque;
use std::process::{Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::application::ports::{CommandRunner, StreamedOutput};

/// Default timeout for short docker CLI commands such as `image inspect`.
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(60);

/// Number of stderr lines kept from a streamed process.
pub const STDERR_TAIL_LINES: usize = 40;

/// Production `CommandRunner` — uses tokio for async process execution
/// with guaranteed timeout and kill on all platforms.
///
/// `tokio::time::timeout` around `.output().await` drops the future but not
/// the OS process on Windows; `tokio::select!` with an explicit
/// `child.kill()` guarantees the process is terminated.
pub struct TokioCommandRunner {
    timeout: Duration,
    /// Forward streamed lines to the terminal's stderr.
    echo: bool,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            echo: true,
        }
    }

    /// Silence streamed output (`--quiet` / `--json`).
    #[must_use]
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

async fn read_all(handle: Option<impl AsyncRead + Unpin>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = h.read_to_end(&mut buf).await;
    }
    buf
}

/// Forward lines as they arrive, keeping the last `keep` of them.
///
/// Reads raw bytes so a line that is not UTF-8 is decoded lossily instead of
/// closing the pipe under a still-writing child.
async fn forward_lines(
    handle: Option<impl AsyncRead + Unpin>,
    program: &str,
    echo: bool,
    keep: usize,
) -> VecDeque<String> {
    let mut tail = VecDeque::with_capacity(keep);
    let Some(h) = handle else {
        return tail;
    };
    let mut reader = BufReader::new(h);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(program, error = %e, "output stream closed");
                break;
            }
        }
        let line = String::from_utf8_lossy(&buf)
            .trim_end_matches(['\n', '\r'])
            .to_string();
        tracing::debug!(program, "{line}");
        if echo {
            eprintln!("  {line}");
        }
        if keep > 0 {
            if tail.len() == keep {
                tail.pop_front();
            }
            tail.push_back(line);
        }
    }
    tail
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();

        tokio::select! {
            result = async {
                let (status, stdout, stderr) = tokio::join!(
                    child.wait(),
                    read_all(stdout_handle),
                    read_all(stderr_handle),
                );
                Ok(Output {
                    status: status.with_context(|| format!("waiting for {program}"))?,
                    stdout,
                    stderr,
                })
            } => result,
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
            }
        }
    }

    async fn run_streaming(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<StreamedOutput> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();
        let echo = self.echo;

        tokio::select! {
            result = async {
                let (status, _, tail) = tokio::join!(
                    child.wait(),
                    forward_lines(stdout_handle, program, echo, 0),
                    forward_lines(stderr_handle, program, echo, STDERR_TAIL_LINES),
                );
                Ok(StreamedOutput {
                    status: status.with_context(|| format!("waiting for {program}"))?,
                    stderr_tail: tail.into_iter().collect::<Vec<_>>().join("\n"),
                })
            } => result,
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
            }
        }
    }

    async fn run_status(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<std::process::ExitStatus> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        tokio::select! {
            status = child.wait() => status.with_context(|| format!("waiting for {program}")),
            () = tokio::time::sleep(timeout) => {
                let _ = child.kill().await;
                anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
            }
        }
    }
}
