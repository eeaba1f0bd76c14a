//! CLI configuration
//!
//! Read from a TOML file; every field is optional and falls back to the
//! defaults below. Command-line flags override the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use mb_core::types::DAY_MS;
use mb_core::{BlockerOptions, ListSources};

pub const DEFAULT_URL_BLACKLIST: &str =
    "https://github.com/rafiq8k-moga/mojuassets/raw/refs/heads/main/mojublockurl.txt";
pub const DEFAULT_WORD_BLACKLIST: &str =
    "https://github.com/rafiq8k-moga/mojuassets/raw/refs/heads/main/mojublockword.txt";

const MAX_FETCH_TIMEOUT_SECS: u64 = 60 * 60;
const MAX_REFRESH_INTERVAL_HOURS: u64 = 24 * 365;
const MAX_IGNORE_DAYS: u64 = 3650;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub url_blacklist_endpoint: String,
    pub word_blacklist_endpoint: String,
    pub fetch_timeout_secs: u64,
    pub refresh_interval_hours: u64,
    pub ignore_days: u64,
    /// Report retention cap; 0 keeps everything.
    pub max_reports: usize,
    /// Optional upstream endpoint that receives each report as JSON.
    pub report_endpoint: Option<String>,
    pub state_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url_blacklist_endpoint: DEFAULT_URL_BLACKLIST.to_string(),
            word_blacklist_endpoint: DEFAULT_WORD_BLACKLIST.to_string(),
            fetch_timeout_secs: 20,
            refresh_interval_hours: 24,
            ignore_days: 7,
            max_reports: 1000,
            report_endpoint: None,
            state_dir: None,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location if none is given.
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => match project_dirs() {
                Some(dirs) => (dirs.config_dir().join("config.toml"), false),
                None => return Ok(Self::default()),
            },
        };

        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
        Self::from_toml(&content).map_err(|e| format!("Invalid config '{}': {}", path.display(), e))
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(content).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.fetch_timeout_secs == 0 {
            return Err("fetch_timeout_secs must be at least 1".to_string());
        }
        if self.refresh_interval_hours == 0 {
            return Err("refresh_interval_hours must be at least 1".to_string());
        }
        if self.ignore_days == 0 {
            return Err("ignore_days must be at least 1".to_string());
        }
        if self.fetch_timeout_secs > MAX_FETCH_TIMEOUT_SECS {
            return Err(format!("fetch_timeout_secs must be at most {MAX_FETCH_TIMEOUT_SECS}"));
        }
        if self.refresh_interval_hours > MAX_REFRESH_INTERVAL_HOURS {
            return Err(format!("refresh_interval_hours must be at most {MAX_REFRESH_INTERVAL_HOURS}"));
        }
        if self.ignore_days > MAX_IGNORE_DAYS {
            return Err(format!("ignore_days must be at most {MAX_IGNORE_DAYS}"));
        }
        Ok(())
    }

    pub fn state_dir(&self) -> Result<PathBuf, String> {
        if let Some(dir) = &self.state_dir {
            return Ok(dir.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| "Could not determine a state directory; pass --state-dir".to_string())
    }

    pub fn sources(&self) -> ListSources {
        ListSources {
            url_blacklist_endpoint: self.url_blacklist_endpoint.clone(),
            word_blacklist_endpoint: self.word_blacklist_endpoint.clone(),
        }
    }

    pub fn blocker_options(&self) -> BlockerOptions {
        BlockerOptions {
            ignore_duration_ms: self.ignore_days.min(MAX_IGNORE_DAYS) * DAY_MS,
            max_reports: self.max_reports,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.min(MAX_FETCH_TIMEOUT_SECS))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_hours.min(MAX_REFRESH_INTERVAL_HOURS) * 60 * 60)
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "mojublock", "mojublock")
}
