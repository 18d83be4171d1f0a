// Configuration loading for slideshow-seed
//
// Layers, lowest precedence first: built-in defaults, optional YAML file,
// SEED_* environment variables, command line flags.

pub mod settings;

pub use settings::{
    AdminCredentials, SeedConfig, SeedUser, SlideshowFit, SlideshowOrder, SlideshowPreferences,
};

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::SeedError;

const MIN_INTERVAL_SECS: u32 = 5;
const MAX_INTERVAL_SECS: u32 = 3600;

/// Values supplied on the command line; `None` leaves the lower layer alone
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub admin_identity: Option<String>,
    pub admin_password: Option<String>,
    pub user_email: Option<String>,
    pub user_password: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub no_cleanup: bool,
}

impl SeedConfig {
    /// Read a YAML config file, or start from defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let yml = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        serde_yaml::from_str(&yml)
            .with_context(|| format!("Invalid yaml configuration in {}", path.display()))
    }

    /// Apply SEED_* variables from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = get("SEED_BASE_URL") {
            self.base_url = v;
        }
        if let Some(v) = get("SEED_ADMIN_IDENTITY") {
            self.admin.identity = v;
        }
        if let Some(v) = get("SEED_ADMIN_PASSWORD") {
            self.admin.password = v;
        }
        if let Some(v) = get("SEED_USER_EMAIL") {
            self.user.email = v;
        }
        if let Some(v) = get("SEED_USER_PASSWORD") {
            self.user.password = v;
        }
        if let Some(v) = get("SEED_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(v) = overrides.base_url {
            self.base_url = v;
        }
        if let Some(v) = overrides.admin_identity {
            self.admin.identity = v;
        }
        if let Some(v) = overrides.admin_password {
            self.admin.password = v;
        }
        if let Some(v) = overrides.user_email {
            self.user.email = v;
        }
        if let Some(v) = overrides.user_password {
            self.user.password = v;
        }
        if let Some(v) = overrides.output_dir {
            self.output_dir = v;
        }
        if overrides.no_cleanup {
            self.cleanup = false;
        }
    }

    /// Reject configurations the backend would refuse or the workflow cannot run
    pub fn validate(&self) -> Result<(), SeedError> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| SeedError::Config(format!("base_url '{}': {}", self.base_url, e)))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SeedError::Config(format!(
                "base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        let required = [
            ("admin.identity", &self.admin.identity),
            ("admin.password", &self.admin.password),
            ("user.email", &self.user.email),
            ("user.password", &self.user.password),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(SeedError::Config(format!("{} must not be empty", name)));
            }
        }

        if let Some(interval) = self.user.preferences.slideshow_interval {
            if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&interval) {
                return Err(SeedError::Config(format!(
                    "slideshow_interval must be between {} and {} seconds",
                    MIN_INTERVAL_SECS, MAX_INTERVAL_SECS
                )));
            }
        }

        if self.images.is_empty() {
            return Err(SeedError::Config("images must list at least one placeholder".to_string()));
        }
        let mut seen = HashSet::new();
        for spec in &self.images {
            if spec.name.trim().is_empty() {
                return Err(SeedError::Config("image name must not be empty".to_string()));
            }
            if Path::new(&spec.name).file_name().and_then(|n| n.to_str()) != Some(spec.name.as_str()) {
                return Err(SeedError::Config(format!(
                    "image name '{}' must be a plain file name",
                    spec.name
                )));
            }
            if spec.width == 0 || spec.height == 0 {
                return Err(SeedError::Config(format!(
                    "image '{}' must have non-zero dimensions",
                    spec.name
                )));
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(SeedError::Config(format!("Duplicate image name: {}", spec.name)));
            }
        }

        Ok(())
    }
}
