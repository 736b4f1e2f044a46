//! Infrastructure implementation of the `ConfigStore` port.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::application::ports::ConfigStore;
use crate::domain::config::TeectlConfig;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "TEECTL_CONFIG";

/// Production implementation of `ConfigStore` that uses a YAML file on disk.
pub struct YamlConfigStore {
    path: PathBuf,
}

impl YamlConfigStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `$TEECTL_CONFIG` if set, else `~/.teectl/config.yaml`.
    ///
    /// # Errors
    ///
    /// Returns an error if no override is set and the home directory is unknown.
    pub fn from_env() -> Result<Self> {
        if let Some(val) = std::env::var_os(CONFIG_PATH_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::new(PathBuf::from(val)));
        }
        Ok(Self::new(super::teectl_home()?.join("config.yaml")))
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<TeectlConfig> {
        if !self.path.exists() {
            return Ok(TeectlConfig::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("cannot read {}", self.path.display()))?;
        if content.trim().is_empty() {
            return Ok(TeectlConfig::default());
        }
        serde_yaml::from_str(&content)
            .with_context(|| format!("cannot parse {}", self.path.display()))
    }

    fn save(&self, config: &TeectlConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(config).context("cannot serialize config")?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("cannot write {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("cannot set permissions on {}", self.path.display()))?;
        }
        Ok(())
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
