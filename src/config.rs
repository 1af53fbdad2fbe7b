//! Application settings for the capture coordinator
//!
//! These are the coordinator's own settings, loaded from TOML. They are not
//! the config blob pushed by the UI; that one lives in [`crate::store`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::store::UnresolvedConfigPolicy;

/// Main settings structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Shared container layout
    #[serde(default)]
    pub container: ContainerSettings,

    /// How config blobs are interpreted
    #[serde(default)]
    pub config: ConfigSettings,

    /// Host capture commands
    #[serde(default)]
    pub host: HostSettings,

    /// Artifact watcher
    #[serde(default)]
    pub watch: WatchSettings,

    /// Diagnostic log output
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Path to settings file (not serialized)
    #[serde(skip)]
    settings_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSettings {
    /// Root of the storage area shared with the extension process
    #[serde(default = "default_shared_root")]
    pub shared_root: PathBuf,

    /// Relative path the extension writes artifacts into
    #[serde(default = "default_artifact_path")]
    pub artifact_path: String,

    /// Durable key the raw config blob is persisted under
    #[serde(default = "default_config_key")]
    pub config_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSettings {
    /// JSON pointer to the artifact destination directory inside the blob
    #[serde(default = "default_destination_pointer")]
    pub destination_pointer: String,

    /// Whether a blob without a destination is still handed to the extension
    #[serde(default)]
    pub unresolved_policy: UnresolvedConfigPolicy,
}

/// External commands standing in for the host capture primitives.
/// Each is an argv list; an absent command means "no recorder available".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostSettings {
    pub start_command: Option<Vec<String>>,
    pub stop_command: Option<Vec<String>>,
    pub activate_command: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSettings {
    /// Report shared artifact changes as notifications
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log directory; the platform state/data dir when unset
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Filter directive used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Days to keep rotated log files; 0 keeps them forever
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,

    /// Also write log lines to stderr
    #[serde(default)]
    pub stderr: bool,
}

fn default_shared_root() -> PathBuf {
    directories::ProjectDirs::from("dev", "capture-coordinator", "coordinator")
        .map(|dirs| dirs.data_dir().join("shared"))
        .unwrap_or_else(|| std::env::temp_dir().join("capture-coordinator-shared"))
}

fn default_artifact_path() -> String {
    "images".to_string()
}

fn default_config_key() -> String {
    "config".to_string()
}

fn default_destination_pointer() -> String {
    "/chara_detail/scraping_dir".to_string()
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_retention_days() -> u64 {
    7
}

impl Default for ContainerSettings {
    fn default() -> Self {
        Self {
            shared_root: default_shared_root(),
            artifact_path: default_artifact_path(),
            config_key: default_config_key(),
        }
    }
}

impl Default for ConfigSettings {
    fn default() -> Self {
        Self {
            destination_pointer: default_destination_pointer(),
            unresolved_policy: UnresolvedConfigPolicy::default(),
        }
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: None,
            level: default_log_level(),
            retention_days: default_retention_days(),
            stderr: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            container: ContainerSettings::default(),
            config: ConfigSettings::default(),
            host: HostSettings::default(),
            watch: WatchSettings::default(),
            logging: LoggingSettings::default(),
            settings_path: None,
        }
    }
}

impl Settings {
    /// Load settings from the default location or create defaults
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_settings_path()?)
    }

    /// Load settings from `path`, writing defaults there if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings file: {:?}", path))?;

            let mut settings: Settings = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse settings file: {:?}", path))?;

            settings.settings_path = Some(path.to_path_buf());
            Ok(settings)
        } else {
            let settings = Settings {
                settings_path: Some(path.to_path_buf()),
                ..Settings::default()
            };
            settings.save()?;
            Ok(settings)
        }
    }

    /// Save settings to file
    pub fn save(&self) -> Result<()> {
        let settings_path = self.settings_path()?;

        if let Some(parent) = settings_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create settings directory: {:?}", parent))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize settings")?;

        std::fs::write(&settings_path, contents)
            .with_context(|| format!("Failed to write settings file: {:?}", settings_path))?;

        Ok(())
    }

    /// Get the settings file path
    pub fn settings_path(&self) -> Result<PathBuf> {
        match &self.settings_path {
            Some(path) => Ok(path.clone()),
            None => Self::default_settings_path(),
        }
    }

    fn default_settings_path() -> Result<PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("dev", "capture-coordinator", "coordinator")
            .context("Failed to determine config directory")?;

        Ok(proj_dirs.config_dir().join("settings.toml"))
    }
}
