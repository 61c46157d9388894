use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::records::Dedupe;
use crate::report::DEFAULT_TOP_MODULES;

pub const CONFIG_PATH_ENV: &str = "CASEBOOK_CONFIG_PATH";
pub const WEBHOOK_URL_ENV: &str = "CASEBOOK_WEBHOOK_URL";
pub const STORE_ENV: &str = "CASEBOOK_STORE";

pub const DEFAULT_STORE_PATH: &str = "Reports/test_cases.json";

/// User settings, stored as YAML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Endpoint that generates test cases
    pub webhook_url: Option<String>,
    /// Location of the saved test cases
    pub store_path: String,
    /// Give up waiting for the webhook after this many seconds
    pub timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Drop incoming records whose ticket or id was already seen
    pub dedupe: bool,
    /// Modules shown in the module chart
    pub top_modules: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            webhook_url: None,
            store_path: DEFAULT_STORE_PATH.to_string(),
            timeout_secs: 60,
            poll_interval_ms: 500,
            dedupe: false,
            top_modules: DEFAULT_TOP_MODULES,
        }
    }
}

impl Settings {
    /// Loads settings from `path`. A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {:?}", path))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {:?}", path))
    }

    /// Loads settings from the default location and applies environment
    /// overrides
    pub fn load_default() -> Result<Self> {
        let mut settings = Self::load(get_config_path()?)?;
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    /// Save the settings to the specified path
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(&self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&path, content)
            .with_context(|| format!("Failed to write settings to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Applies `CASEBOOK_WEBHOOK_URL` and `CASEBOOK_STORE` from `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key| lookup(key).filter(|v: &String| !v.trim().is_empty());

        if let Some(url) = non_empty(WEBHOOK_URL_ENV) {
            self.webhook_url = Some(url);
        }
        if let Some(store) = non_empty(STORE_ENV) {
            self.store_path = store;
        }
    }

    /// Store path to use: the command-line value if given, else the
    /// configured one (which already reflects `CASEBOOK_STORE`)
    pub fn resolve_store_path(&self, cli: Option<&Path>) -> PathBuf {
        match cli {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(&self.store_path),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn dedupe_mode(&self) -> Dedupe {
        if self.dedupe {
            Dedupe::ByKey
        } else {
            Dedupe::None
        }
    }
}

/// Gets the path to the settings file
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    // Default to ~/.casebook.config
    let home_dir = dirs::home_dir().context("Failed to determine home directory")?;

    Ok(home_dir.join(".casebook.config"))
}
