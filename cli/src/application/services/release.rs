//! Application service — release preparation.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! Turns a Dockerfile or image reference plus an env file into a
//! [`ReleaseDescriptor`]. Either the whole descriptor is returned or an error.

use std::path::Path;

use alloy::primitives::{Address, Bytes};
use anyhow::{Context, Result};

use crate::application::ports::{ImageBuilder, KmsEncryptor, ProgressReporter};
use crate::domain::error::ReleaseError;
use crate::domain::release::{
    LogVisibility, PushAttempt, ReleaseDescriptor, ReleaseSource, app_image_tag, image_registry,
    parse_env_file, select_repo_digest, upgrade_deadline,
};

/// Inputs to [`prepare`].
pub struct PrepareRequest<'a> {
    pub source: &'a ReleaseSource,
    /// Contents of the env file, if one was given.
    pub env_contents: Option<&'a str>,
    pub instance_type: &'a str,
    pub log_visibility: LogVisibility,
    pub app_id: Address,
    /// Current unix time; the upgrade deadline is derived from it.
    pub now_unix: u64,
}

/// A descriptor plus the image reference it was built from.
#[derive(Debug)]
pub struct PreparedRelease {
    pub descriptor: ReleaseDescriptor,
    pub image_ref: String,
}

/// Build or pull the image, resolve its digest, encrypt the environment and
/// assemble the release descriptor.
///
/// The env file is parsed first so a malformed file fails before any build.
///
/// # Errors
///
/// Returns a [`ReleaseError`] for build, push, pull, digest, env file or
/// encryption failures.
pub async fn prepare(
    images: &impl ImageBuilder,
    kms: &impl KmsEncryptor,
    reporter: &impl ProgressReporter,
    req: PrepareRequest<'_>,
) -> Result<PreparedRelease> {
    let env = parse_env_file(req.env_contents.unwrap_or_default())?
        .with_reserved(req.instance_type, req.log_visibility);

    let image_ref = match req.source {
        ReleaseSource::Dockerfile {
            path,
            context,
            repository,
        } => {
            let tag = app_image_tag(repository, req.app_id);
            let context = context
                .as_deref()
                .or_else(|| path.parent().filter(|p| !p.as_os_str().is_empty()))
                .unwrap_or(Path::new("."));
            reporter.step(&format!("building {tag}..."));
            images.build(path, context, &tag).await?;
            reporter.step(&format!("pushing {tag}..."));
            push_with_remediation(images, reporter, &tag).await?;
            tag
        }
        ReleaseSource::Image(image) => {
            reporter.step(&format!("pulling {image}..."));
            images.pull(image).await?;
            image.clone()
        }
    };

    let digests = images.repo_digests(&image_ref).await?;
    let (digest, registry) = select_repo_digest(&digests, &image_ref)?;
    tracing::debug!(image = %image_ref, %digest, %registry, "resolved image digest");

    let public_env = serde_json::to_vec(&env.public).context("cannot serialize public env")?;
    let private_env = serde_json::to_vec(&env.private).context("cannot serialize private env")?;

    reporter.step("encrypting environment...");
    let encrypted_env = kms
        .encrypt(req.app_id, &private_env)
        .await
        .map_err(|e| ReleaseError::EncryptionFailed(format!("{e:#}")))?;

    Ok(PreparedRelease {
        descriptor: ReleaseDescriptor::new(
            digest,
            registry,
            encrypted_env,
            Bytes::from(public_env),
            upgrade_deadline(req.now_unix),
        ),
        image_ref,
    })
}

/// Push `image`, re-authenticating and retrying once if the registry denies
/// write access. Any other failure is fatal on the first attempt.
///
/// # Errors
///
/// Returns [`ReleaseError::PushDenied`] or [`ReleaseError::PushFailed`].
pub async fn push_with_remediation(
    images: &impl ImageBuilder,
    reporter: &impl ProgressReporter,
    image: &str,
) -> Result<()> {
    let mut state = PushAttempt::First;
    loop {
        state = match state {
            s @ (PushAttempt::First | PushAttempt::Second) => {
                let outcome = images.push(image).await?;
                s.after_push(image, outcome.into_result())
            }
            s @ PushAttempt::Remediate { .. } => {
                let registry = image_registry(image);
                reporter.warn(&format!("push denied; logging in to {registry} and retrying"));
                let outcome = images.remediate_push_access(registry).await?;
                s.after_remediation(image, outcome.into_result())
            }
            PushAttempt::Pushed => return Ok(()),
            PushAttempt::Failed(err) => return Err(err.into()),
        };
    }
}
