//! Release descriptor and the pure helpers behind release preparation.
//!
//! Image naming, repo-digest parsing, env file parsing and the push retry
//! state machine. No I/O here; `application::services::release` drives
//! Docker and the KMS through ports.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

use alloy::hex;
use alloy::primitives::{Address, B256, Bytes};
use regex::Regex;

use crate::domain::contracts::{Artifact, Release, RmsRelease};
use crate::domain::error::ReleaseError;

// ── Constants ────────────────────────────────────────────────────────────────

/// How long an upgrade stays valid after the descriptor is assembled.
pub const UPGRADE_WINDOW_SECS: u64 = 3600;

/// Suffix marking an env key as public.
pub const PUBLIC_SUFFIX: &str = "_PUBLIC";

/// Reserved public keys added by the preparer.
pub const INSTANCE_TYPE_KEY: &str = "TEE_INSTANCE_TYPE_PUBLIC";
pub const LOG_VISIBILITY_KEY: &str = "TEE_LOG_VISIBILITY_PUBLIC";
const RESERVED_KEYS: &[&str] = &[INSTANCE_TYPE_KEY, LOG_VISIBILITY_KEY];

/// Registry assumed for image references without an explicit host.
pub const DEFAULT_REGISTRY: &str = "docker.io";

// ── Inputs ───────────────────────────────────────────────────────────────────

/// Where the release image comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseSource {
    /// Build locally and push to `repository`.
    Dockerfile {
        path: PathBuf,
        context: Option<PathBuf>,
        repository: String,
    },
    /// Use an image that is already in a registry.
    Image(String),
}

/// Who may read the app's logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogVisibility {
    Public,
    #[default]
    Private,
    Off,
}

impl LogVisibility {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Off => "off",
        }
    }

    /// Whether the log-view permission should be granted to anyone.
    #[must_use]
    pub fn is_public(self) -> bool {
        self == Self::Public
    }
}

impl std::str::FromStr for LogVisibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            "off" => Ok(Self::Off),
            other => Err(format!(
                "invalid log visibility '{other}' (expected public, private or off)"
            )),
        }
    }
}

// ── Descriptor ───────────────────────────────────────────────────────────────

/// Everything the application controller needs to roll out a release.
///
/// Built in one step by [`ReleaseDescriptor::new`] and consumed by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    digest: B256,
    registry: String,
    encrypted_env: Bytes,
    public_env: Bytes,
    upgrade_by: u32,
}

impl ReleaseDescriptor {
    #[must_use]
    pub fn new(
        digest: B256,
        registry: String,
        encrypted_env: Bytes,
        public_env: Bytes,
        upgrade_by: u32,
    ) -> Self {
        Self {
            digest,
            registry,
            encrypted_env,
            public_env,
            upgrade_by,
        }
    }

    #[must_use]
    pub fn digest(&self) -> B256 {
        self.digest
    }

    #[must_use]
    pub fn registry(&self) -> &str {
        &self.registry
    }

    #[must_use]
    pub fn public_env(&self) -> &Bytes {
        &self.public_env
    }

    #[must_use]
    pub fn encrypted_env(&self) -> &Bytes {
        &self.encrypted_env
    }

    #[must_use]
    pub fn upgrade_by(&self) -> u32 {
        self.upgrade_by
    }

    /// Convert into the ABI struct.
    #[must_use]
    pub fn into_release(self) -> Release {
        Release {
            rmsRelease: RmsRelease {
                artifacts: vec![Artifact {
                    digest: self.digest,
                    registry: self.registry,
                }],
                upgradeByTime: self.upgrade_by,
            },
            publicEnv: self.public_env,
            encryptedEnv: self.encrypted_env,
        }
    }
}

/// Upgrade deadline for a descriptor assembled at `now_unix`.
#[must_use]
pub fn upgrade_deadline(now_unix: u64) -> u32 {
    u32::try_from(now_unix.saturating_add(UPGRADE_WINDOW_SECS)).unwrap_or(u32::MAX)
}

// ── Image references ─────────────────────────────────────────────────────────

/// Deterministic tag for a locally built image: `<repository>:app-<hex>`.
#[must_use]
pub fn app_image_tag(repository: &str, app_id: Address) -> String {
    format!("{repository}:app-{}", hex::encode(app_id))
}

/// Repository part of an image reference (no tag, no digest).
#[must_use]
pub fn image_repository(image_ref: &str) -> &str {
    let without_digest = image_ref.split('@').next().unwrap_or(image_ref);
    // A ':' after the last '/' starts the tag; earlier ones are registry ports.
    let last_slash = without_digest.rfind('/').map_or(0, |i| i + 1);
    match without_digest[last_slash..].find(':') {
        Some(i) => &without_digest[..last_slash + i],
        None => without_digest,
    }
}

/// Registry host of an image reference, defaulting to Docker Hub.
#[must_use]
pub fn image_registry(image_ref: &str) -> &str {
    let repo = image_repository(image_ref);
    match repo.split_once('/') {
        Some((first, _)) if first.contains('.') || first.contains(':') || first == "localhost" => {
            first
        }
        _ => DEFAULT_REGISTRY,
    }
}

static REPO_DIGEST_RE: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^(?P<repo>[^@\s]+)@sha256:(?P<hex>[0-9a-fA-F]{64})$"));

/// Parse one `repo@sha256:<64 hex>` entry.
///
/// # Errors
///
/// Returns [`ReleaseError::DigestUnavailable`] if the entry is malformed.
pub fn parse_repo_digest(entry: &str, image: &str) -> Result<(String, B256), ReleaseError> {
    let unavailable = || ReleaseError::DigestUnavailable {
        image: image.to_string(),
    };
    let re = REPO_DIGEST_RE.as_ref().map_err(|_| unavailable())?;
    let caps = re.captures(entry.trim()).ok_or_else(unavailable)?;
    let digest: B256 = caps["hex"].parse().map_err(|_| unavailable())?;
    Ok((caps["repo"].to_string(), digest))
}

/// Pick the digest for `image` from `docker inspect` RepoDigests.
///
/// Prefers the entry whose repository matches the image; falls back to the
/// first entry. Returns the digest and the repository it was pushed to,
/// which the TEE pulls `<repository>@sha256:<digest>` from.
///
/// # Errors
///
/// Returns [`ReleaseError::DigestUnavailable`] if no entry parses.
pub fn select_repo_digest(entries: &[String], image: &str) -> Result<(B256, String), ReleaseError> {
    let wanted = image_repository(image);
    let parsed: Vec<(String, B256)> = entries
        .iter()
        .filter_map(|e| parse_repo_digest(e, image).ok())
        .collect();
    let (repo, digest) = parsed
        .iter()
        .find(|(repo, _)| repo == wanted)
        .or_else(|| parsed.first())
        .cloned()
        .ok_or_else(|| ReleaseError::DigestUnavailable {
            image: image.to_string(),
        })?;
    Ok((digest, repo))
}

// ── Push retry state machine ─────────────────────────────────────────────────

/// Why a push failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushFailureKind {
    /// The registry refused write access; remediable once.
    PermissionDenied,
    Other,
}

static PUSH_DENIED_RE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(denied|unauthorized|insufficient_scope|authentication required|\b403\b)",
    )
});

/// Classify a failed push from its stderr tail.
#[must_use]
pub fn classify_push_failure(stderr: &str) -> PushFailureKind {
    match PUSH_DENIED_RE.as_ref() {
        Ok(re) if re.is_match(stderr) => PushFailureKind::PermissionDenied,
        _ => PushFailureKind::Other,
    }
}

/// Bounded push retry: `First → Remediate → Second → Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushAttempt {
    First,
    Remediate { detail: String },
    Second,
    Pushed,
    Failed(ReleaseError),
}

impl PushAttempt {
    /// Advance after a push returned. `Err` carries the stderr tail.
    #[must_use]
    pub fn after_push(self, image: &str, result: Result<(), String>) -> Self {
        match (self, result) {
            (Self::First | Self::Second, Ok(())) => Self::Pushed,
            (Self::First, Err(detail)) => match classify_push_failure(&detail) {
                PushFailureKind::PermissionDenied => Self::Remediate { detail },
                PushFailureKind::Other => Self::Failed(ReleaseError::PushFailed {
                    image: image.to_string(),
                    detail,
                }),
            },
            (Self::Second, Err(detail)) => match classify_push_failure(&detail) {
                PushFailureKind::PermissionDenied => Self::Failed(ReleaseError::PushDenied {
                    image: image.to_string(),
                    detail,
                }),
                PushFailureKind::Other => Self::Failed(ReleaseError::PushFailed {
                    image: image.to_string(),
                    detail,
                }),
            },
            (state, _) => state,
        }
    }

    /// Advance after the remediation step returned.
    #[must_use]
    pub fn after_remediation(self, image: &str, result: Result<(), String>) -> Self {
        match (self, result) {
            (Self::Remediate { .. }, Ok(())) => Self::Second,
            (Self::Remediate { detail }, Err(login)) => Self::Failed(ReleaseError::PushDenied {
                image: image.to_string(),
                detail: format!("{detail}\nregistry login failed: {login}"),
            }),
            (state, _) => state,
        }
    }
}

// ── Env file ─────────────────────────────────────────────────────────────────

/// Env file entries split by visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvPayload {
    pub public: BTreeMap<String, String>,
    pub private: BTreeMap<String, String>,
}

impl EnvPayload {
    /// Add the reserved public keys.
    #[must_use]
    pub fn with_reserved(mut self, instance_type: &str, logs: LogVisibility) -> Self {
        self.public
            .insert(INSTANCE_TYPE_KEY.to_string(), instance_type.to_string());
        self.public
            .insert(LOG_VISIBILITY_KEY.to_string(), logs.as_str().to_string());
        self
    }
}

/// Parse dotenv content into public and private maps.
///
/// Supports `#` comments, blank lines, an optional `export ` prefix and
/// single or double quoted values. Later duplicates win.
///
/// # Errors
///
/// Returns [`ReleaseError::InvalidEnvFile`] for malformed lines and
/// [`ReleaseError::ReservedEnvKey`] for keys the preparer sets itself.
pub fn parse_env_file(content: &str) -> Result<EnvPayload, ReleaseError> {
    let mut payload = EnvPayload::default();
    for (idx, raw) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").map_or(line, str::trim_start);
        let Some((key, value)) = line.split_once('=') else {
            return Err(ReleaseError::InvalidEnvFile {
                line: line_no,
                reason: "expected KEY=VALUE".to_string(),
            });
        };
        let key = key.trim();
        if !is_valid_env_key(key) {
            return Err(ReleaseError::InvalidEnvFile {
                line: line_no,
                reason: format!("invalid key '{key}'"),
            });
        }
        if RESERVED_KEYS.contains(&key) {
            return Err(ReleaseError::ReservedEnvKey(key.to_string()));
        }
        let value = unquote(value.trim(), line_no)?;
        if key.ends_with(PUBLIC_SUFFIX) {
            payload.public.insert(key.to_string(), value);
        } else {
            payload.private.insert(key.to_string(), value);
        }
    }
    Ok(payload)
}

fn is_valid_env_key(key: &str) -> bool {
    let mut chars = key.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn unquote(value: &str, line: usize) -> Result<String, ReleaseError> {
    for quote in ['"', '\''] {
        if let Some(rest) = value.strip_prefix(quote) {
            return rest
                .strip_suffix(quote)
                .map(str::to_string)
                .ok_or_else(|| ReleaseError::InvalidEnvFile {
                    line,
                    reason: "unterminated quote".to_string(),
                });
        }
    }
    // Unquoted values may carry a trailing comment.
    let value = value.split(" #").next().unwrap_or(value);
    Ok(value.trim_end().to_string())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
