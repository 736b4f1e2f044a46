//! File-backed `CredentialStore` under `~/.teectl`.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::CredentialStore;

/// Stores the signing key in a single owner-only file.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `~/.teectl/private-key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(super::teectl_home()?.join("private-key")))
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => {
                let secret = content.trim();
                Ok((!secret.is_empty()).then(|| secret.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("cannot read {}", self.path.display())),
        }
    }

    fn put(&self, secret: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }

        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("cannot write {}", self.path.display()))?;
            // Pre-existing files keep their old mode on open.
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("cannot set permissions on {}", self.path.display()))?;
            writeln!(file, "{secret}")
                .with_context(|| format!("cannot write {}", self.path.display()))?;
        }
        #[cfg(not(unix))]
        std::fs::write(&self.path, format!("{secret}\n"))
            .with_context(|| format!("cannot write {}", self.path.display()))?;

        tracing::debug!(path = %self.path.display(), "credential stored");
        Ok(())
    }

    fn delete(&self) -> Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).with_context(|| format!("cannot remove {}", self.path.display())),
        }
    }
}
