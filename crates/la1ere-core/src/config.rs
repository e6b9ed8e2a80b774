use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::platform;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub mixer: MixerConfig,
    #[serde(default)]
    pub stations: StationsConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Which external player drives playback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    #[default]
    Vlc,
    Mpv,
    /// `program` + `args` with `{volume}` / `{url}` placeholders.
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub kind: PlayerKind,
    /// Program override. Empty means the kind's default binary.
    #[serde(default)]
    pub program: String,
    /// Argument template, only used by `kind = "custom"`.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,
}

/// Command that sets the default output sink volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerConfig {
    #[serde(default = "default_mixer_program")]
    pub program: String,
    #[serde(default = "default_mixer_args")]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationsConfig {
    /// Path to a local TOML station file. Built-in stations are used when
    /// it is missing. Defaults to `~/.config/la1ere/stations.toml`.
    #[serde(default = "platform::default_stations_file")]
    pub stations_toml: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "platform::default_preferences_file")]
    pub preferences_file: PathBuf,
}

impl PlayerConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            kind: PlayerKind::default(),
            program: String::new(),
            args: Vec::new(),
            stop_timeout_secs: default_stop_timeout_secs(),
        }
    }
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            program: default_mixer_program(),
            args: default_mixer_args(),
        }
    }
}

impl Default for StationsConfig {
    fn default() -> Self {
        Self {
            stations_toml: platform::default_stations_file(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            preferences_file: platform::default_preferences_file(),
        }
    }
}

fn default_stop_timeout_secs() -> u64 {
    5
}

fn default_mixer_program() -> String {
    "pactl".to_string()
}

fn default_mixer_args() -> Vec<String> {
    vec![
        "set-sink-volume".to_string(),
        "@DEFAULT_SINK@".to_string(),
        "{volume}%".to_string(),
    ]
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Read `path`, writing the defaults there first if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        toml::from_str(&content).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| Error::io(path, e))?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::default_config_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.player.kind, PlayerKind::Vlc);
        assert_eq!(config.player.stop_timeout(), Duration::from_secs(5));
        assert_eq!(config.mixer.program, "pactl");
        assert_eq!(config.mixer.args.last().unwrap(), "{volume}%");
        assert!(config
            .stations
            .stations_toml
            .ends_with("la1ere/stations.toml"));
        assert!(config
            .paths
            .preferences_file
            .ends_with("la1ere/preferences.toml"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str("[player]\nkind = \"mpv\"\n").unwrap();
        assert_eq!(config.player.kind, PlayerKind::Mpv);
        assert_eq!(config.player.stop_timeout_secs, 5);
        assert_eq!(config.mixer, MixerConfig::default());
    }

    #[test]
    fn test_load_from_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_from_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[player]\nkind = \"winamp\"\n").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
