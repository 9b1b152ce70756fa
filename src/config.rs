//! Persisted user settings, stored as JSON under Application Support.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::orchestrator::{DEFAULT_RUN_TIMEOUT_SECS, FailurePolicy};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overrides the default per-user log location when set.
    pub log_path: Option<PathBuf>,
    /// One of "debug", "info", "warning", "error".
    pub log_level: String,
    pub run_timeout_secs: u64,
    pub auto_close_after_update: bool,
    pub failure_policy: FailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_path: None,
            log_level: "info".into(),
            run_timeout_secs: DEFAULT_RUN_TIMEOUT_SECS,
            auto_close_after_update: true,
            failure_policy: FailurePolicy::default(),
        }
    }
}

pub fn config_path() -> PathBuf {
    home::home_dir()
        .unwrap_or_else(|| PathBuf::from("/Users/unknown"))
        .join("Library")
        .join("Application Support")
        .join("DockUpdater")
        .join("config.json")
}

impl Config {
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    /// Missing or corrupt files fall back to defaults; settings are not
    /// worth refusing to start over.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(cfg) => cfg,
                Err(e) => {
                    eprintln!("ignoring corrupt config at {}: {e}", path.display());
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create config dir {:?}", parent))?;
        }
        let raw = serde_json::to_string_pretty(self).context("serialize config")?;
        std::fs::write(path, raw).with_context(|| format!("write config {:?}", path))
    }

    pub fn level_filter(&self) -> LevelFilter {
        match self.log_level.to_lowercase().as_str() {
            "debug" => LevelFilter::Debug,
            "warning" | "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            _ => LevelFilter::Info,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("dock_updater_{}_{name}.json", std::process::id()))
    }

    #[test]
    fn defaults_match_the_documented_budgets() {
        let cfg = Config::default();
        assert_eq!(cfg.run_timeout_secs, 300);
        assert!(cfg.auto_close_after_update);
        assert_eq!(cfg.failure_policy, FailurePolicy::AbortRun);
        assert_eq!(cfg.level_filter(), LevelFilter::Info);
    }

    #[test]
    fn roundtrips_through_disk() {
        let path = temp_config("roundtrip");
        let cfg = Config {
            log_path: Some(PathBuf::from("/tmp/custom.log")),
            log_level: "debug".into(),
            run_timeout_secs: 120,
            auto_close_after_update: false,
            failure_policy: FailurePolicy::IsolatePerManager,
        };
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.log_path, cfg.log_path);
        assert_eq!(loaded.level_filter(), LevelFilter::Debug);
        assert_eq!(loaded.run_timeout_secs, 120);
        assert_eq!(loaded.failure_policy, FailurePolicy::IsolatePerManager);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_and_corrupt_files_fall_back_to_defaults() {
        let missing = Config::load_from(Path::new("/nonexistent/config.json"));
        assert_eq!(missing.run_timeout_secs, 300);

        let path = temp_config("corrupt");
        std::fs::write(&path, "{not json").unwrap();
        let corrupt = Config::load_from(&path);
        assert_eq!(corrupt.log_level, "info");
        std::fs::remove_file(&path).unwrap();
    }
}
