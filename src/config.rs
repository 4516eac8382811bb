//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use crate::export::default_share_command;
use crate::grants::default_status_folder;
use crate::ticker::DEFAULT_POLL_INTERVAL;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Folder to browse; the well-known status folder when unset
    pub folder: Option<PathBuf>,

    /// Where `save` copies files; the user's Downloads folder when unset
    pub downloads_dir: Option<PathBuf>,

    /// Share handler, `{path}` and `{mime}` substituted
    pub share_command: Vec<String>,

    /// Progress polling interval while a video plays
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            folder: None,
            downloads_dir: None,
            share_command: default_share_command(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
        }
    }
}

impl Config {
    /// Load from `path`, or from the default location. A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_config_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            debug!("config: {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let cfg: Config = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        debug!("config: loaded {}", path.display());
        Ok(cfg)
    }

    /// Folder to browse, after applying the command-line override.
    pub fn folder(&self, cli_override: Option<&Path>) -> Option<PathBuf> {
        cli_override
            .map(Path::to_path_buf)
            .or_else(|| self.folder.clone())
            .or_else(default_status_folder)
    }

    pub fn downloads_dir(&self) -> Option<PathBuf> {
        self.downloads_dir.clone().or_else(|| {
            directories::UserDirs::new().and_then(|u| u.download_dir().map(Path::to_path_buf))
        })
    }

    #[cfg_attr(not(feature = "mpv"), allow(dead_code))]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "ssv", "ssv").map(|d| d.config_dir().join("config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(Some(&dir.path().join("nope.json"))).unwrap();
        assert_eq!(cfg, Config::default());
        assert_eq!(cfg.poll_interval(), Duration::from_millis(500));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.json");
        std::fs::write(&p, r#"{ "folder": "/sdcard/statuses", "poll_interval_ms": 250 }"#).unwrap();
        let cfg = Config::load(Some(&p)).unwrap();
        assert_eq!(cfg.folder.as_deref(), Some(Path::new("/sdcard/statuses")));
        assert_eq!(cfg.poll_interval(), Duration::from_millis(250));
        assert_eq!(cfg.share_command, default_share_command());
    }

    #[test]
    fn malformed_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("config.json");
        std::fs::write(&p, "{ not json").unwrap();
        let err = Config::load(Some(&p)).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing"));
    }

    #[test]
    fn cli_override_wins() {
        let cfg = Config {
            folder: Some(PathBuf::from("/from/config")),
            ..Config::default()
        };
        assert_eq!(
            cfg.folder(Some(Path::new("/from/cli"))),
            Some(PathBuf::from("/from/cli"))
        );
        assert_eq!(cfg.folder(None), Some(PathBuf::from("/from/config")));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let cfg = Config {
            poll_interval_ms: 0,
            ..Config::default()
        };
        assert_eq!(cfg.poll_interval(), Duration::from_millis(1));
    }
}
