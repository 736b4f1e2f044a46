//! Docker CLI implementation of the `ImageBuilder` port.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, ImageBuilder, StepOutcome};
use crate::domain::error::ReleaseError;

/// Platform TEE instances run.
pub const TARGET_PLATFORM: &str = "linux/amd64";

/// Upper bound for `docker build`.
pub const BUILD_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Upper bound for a registry transfer (`docker push` / `docker pull`).
pub const TRANSFER_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Upper bound for an interactive `docker login`.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Drives `docker` through a [`CommandRunner`].
pub struct DockerCli<R> {
    runner: R,
}

impl<R: CommandRunner> DockerCli<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

fn path_arg(path: &Path) -> Result<&str> {
    path.to_str()
        .with_context(|| format!("path is not valid UTF-8: {}", path.display()))
}

impl<R: CommandRunner> ImageBuilder for DockerCli<R> {
    async fn build(&self, dockerfile: &Path, context: &Path, tag: &str) -> Result<()> {
        let args = [
            "build",
            "--platform",
            TARGET_PLATFORM,
            "-t",
            tag,
            "-f",
            path_arg(dockerfile)?,
            path_arg(context)?,
        ];
        let out = self
            .runner
            .run_streaming("docker", &args, BUILD_TIMEOUT)
            .await?;
        if !out.status.success() {
            return Err(ReleaseError::BuildFailed {
                code: out.status.code().unwrap_or(-1),
            }
            .into());
        }
        Ok(())
    }

    async fn push(&self, image: &str) -> Result<StepOutcome> {
        let out = self
            .runner
            .run_streaming("docker", &["push", image], TRANSFER_TIMEOUT)
            .await?;
        Ok(if out.status.success() {
            StepOutcome::Succeeded
        } else {
            StepOutcome::Failed(out.stderr_tail)
        })
    }

    async fn remediate_push_access(&self, registry: &str) -> Result<StepOutcome> {
        // Inherited stdio so the user can enter credentials.
        let status = self
            .runner
            .run_status("docker", &["login", registry], LOGIN_TIMEOUT)
            .await?;
        Ok(if status.success() {
            StepOutcome::Succeeded
        } else {
            StepOutcome::Failed(format!(
                "docker login {registry} exited with code {}",
                status.code().unwrap_or(-1)
            ))
        })
    }

    async fn pull(&self, image: &str) -> Result<()> {
        let args = ["pull", "--platform", TARGET_PLATFORM, image];
        let out = self
            .runner
            .run_streaming("docker", &args, TRANSFER_TIMEOUT)
            .await?;
        if !out.status.success() {
            return Err(ReleaseError::PullFailed {
                image: image.to_string(),
                detail: out.stderr_tail,
            }
            .into());
        }
        Ok(())
    }

    async fn repo_digests(&self, image: &str) -> Result<Vec<String>> {
        let out = self
            .runner
            .run(
                "docker",
                &["image", "inspect", "--format", "{{json .RepoDigests}}", image],
            )
            .await?;
        if !out.status.success() {
            return Err(ReleaseError::DigestUnavailable {
                image: image.to_string(),
            }
            .into());
        }
        let stdout = String::from_utf8_lossy(&out.stdout);
        let digests: Option<Vec<String>> = serde_json::from_str(stdout.trim())
            .with_context(|| format!("cannot parse RepoDigests for {image}"))?;
        Ok(digests.unwrap_or_default())
    }
}
