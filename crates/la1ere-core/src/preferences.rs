//! Persisted station selection and volume.
//!
//! The file is a small TOML document:
//!
//! ```toml
//! [preferences]
//! station_index = 3
//! volume = 65
//! ```
//!
//! Reading is deliberately forgiving. Each field is resolved on its own, so a
//! malformed `volume` never discards a good `station_index`. Documents that
//! are not valid TOML are scanned line by line for `key = value` pairs, which
//! also covers INI-style files with a `[Preferences]` header.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub const DEFAULT_STATION_INDEX: usize = 0;
pub const DEFAULT_VOLUME: u8 = 50;
pub const MAX_VOLUME: u8 = 100;

const STATION_INDEX_KEY: &str = "station_index";
const VOLUME_KEY: &str = "volume";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub station_index: usize,
    pub volume: u8,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            station_index: DEFAULT_STATION_INDEX,
            volume: DEFAULT_VOLUME,
        }
    }
}

#[derive(Serialize)]
struct PreferencesFile<'a> {
    preferences: &'a Preferences,
}

/// Owns the preference file location.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
    legacy_path: Option<PathBuf>,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            legacy_path: None,
        }
    }

    /// INI-style file from an older install, imported once when `path` is missing.
    pub fn with_legacy_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.legacy_path = Some(path.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Never fails. A missing file is created from the legacy file, if any,
    /// or with the defaults.
    pub fn load(&self) -> Preferences {
        match read_lossy(&self.path) {
            Ok(content) => parse_preferences(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let prefs = self.import_legacy().unwrap_or_else(|| {
                    info!("No preferences at {}, writing defaults", self.path.display());
                    Preferences::default()
                });
                if let Err(e) = self.save(&prefs) {
                    warn!("Could not persist preferences: {}", e);
                }
                prefs
            }
            Err(e) => {
                warn!(
                    "Cannot read preferences {}: {}, using defaults",
                    self.path.display(),
                    e
                );
                Preferences::default()
            }
        }
    }

    fn import_legacy(&self) -> Option<Preferences> {
        let legacy = self.legacy_path.as_ref()?;
        match read_lossy(legacy) {
            Ok(content) => {
                info!("Importing preferences from {}", legacy.display());
                Some(parse_preferences(&content))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Cannot read {}: {}", legacy.display(), e);
                None
            }
        }
    }

    /// Write to a sibling temp file, then rename over the target.
    pub fn save(&self, prefs: &Preferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
        }

        let content = toml::to_string_pretty(&PreferencesFile { preferences: prefs })
            .map_err(|e| Error::Config(e.to_string()))?;

        let tmp = self.temp_path();
        let write = || -> std::io::Result<()> {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()
        };
        if let Err(e) = write() {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::io(&tmp, e));
        }
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(Error::io(&self.path, e));
        }
        debug!(
            "Saved preferences station_index={} volume={}",
            prefs.station_index, prefs.volume
        );
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

/// Stray non-UTF-8 bytes only spoil the line they sit on.
fn read_lossy(path: &Path) -> std::io::Result<String> {
    std::fs::read(path).map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Resolve both fields from file content, defaulting each independently.
pub fn parse_preferences(content: &str) -> Preferences {
    let fields = match content.parse::<toml::Table>() {
        Ok(table) => fields_from_table(&table),
        Err(e) => {
            debug!("Preferences are not TOML ({}), scanning lines", e.message());
            fields_from_lines(content)
        }
    };

    let station_index = match fields.get(STATION_INDEX_KEY) {
        None => DEFAULT_STATION_INDEX,
        Some(raw) => match parse_int(raw) {
            Some(i) if i >= 0 => i as usize,
            _ => {
                warn!("Malformed station_index {:?}, using default", raw);
                DEFAULT_STATION_INDEX
            }
        },
    };

    let volume = match fields.get(VOLUME_KEY) {
        None => DEFAULT_VOLUME,
        Some(raw) => match parse_int(raw) {
            Some(v) => v.clamp(0, MAX_VOLUME as i64) as u8,
            None => {
                warn!("Malformed volume {:?}, using default", raw);
                DEFAULT_VOLUME
            }
        },
    };

    Preferences {
        station_index,
        volume,
    }
}

/// Pick the `[preferences]` table (any case) or fall back to top-level keys.
fn fields_from_table(table: &toml::Table) -> HashMap<String, String> {
    let section = table
        .iter()
        .find(|(k, v)| k.eq_ignore_ascii_case("preferences") && v.is_table())
        .and_then(|(_, v)| v.as_table())
        .unwrap_or(table);

    section
        .iter()
        .filter_map(|(k, v)| {
            let raw = match v {
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::String(s) => s.clone(),
                toml::Value::Boolean(b) => b.to_string(),
                _ => return None,
            };
            Some((k.to_ascii_lowercase(), raw))
        })
        .collect()
}

fn fields_from_lines(content: &str) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(&['#', ';', '['][..]) {
            continue;
        }
        let Some((key, value)) = line.split_once(|c| c == '=' || c == ':') else {
            continue;
        };
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        fields
            .entry(key.trim().to_ascii_lowercase())
            .or_insert_with(|| value.to_string());
    }
    fields
}

/// Integers, or decimals rounded to the nearest integer ("50.0").
fn parse_int(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(i) = raw.parse::<i64>() {
        return Some(i);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> PreferenceStore {
        PreferenceStore::new(dir.path().join("la1ere").join("preferences.toml"))
    }

    #[test]
    fn test_missing_file_yields_defaults_and_creates_it() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(!store.path().exists());

        let prefs = store.load();
        assert_eq!(
            prefs,
            Preferences {
                station_index: 0,
                volume: 50
            }
        );
        assert!(store.path().exists());
        assert_eq!(store.load(), prefs);
    }

    #[test]
    fn test_malformed_volume_keeps_station_index() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            "[preferences]\nstation_index = 4\nvolume = \"abc\"\n",
        )
        .unwrap();

        let prefs = store.load();
        assert_eq!(prefs.station_index, 4);
        assert_eq!(prefs.volume, 50);
    }

    #[test]
    fn test_invalid_toml_still_resolves_fields() {
        // `volume = abc` is not valid TOML at all
        let prefs = parse_preferences("[preferences]\nstation_index = 2\nvolume = abc\n");
        assert_eq!(prefs.station_index, 2);
        assert_eq!(prefs.volume, 50);
    }

    #[test]
    fn test_ini_style_file() {
        let prefs = parse_preferences("[Preferences]\nstation_index = 6\nvolume = 72.0\n\n");
        assert_eq!(
            prefs,
            Preferences {
                station_index: 6,
                volume: 72
            }
        );
    }

    #[test]
    fn test_missing_and_unknown_fields() {
        let prefs = parse_preferences("[preferences]\nvolume = 30\ntheme = \"dark\"\n");
        assert_eq!(prefs.station_index, 0);
        assert_eq!(prefs.volume, 30);

        let prefs = parse_preferences("");
        assert_eq!(prefs, Preferences::default());
    }

    #[test]
    fn test_out_of_range_values() {
        let prefs = parse_preferences("[preferences]\nstation_index = -3\nvolume = 250\n");
        assert_eq!(prefs.station_index, 0);
        assert_eq!(prefs.volume, 100);

        let prefs = parse_preferences("[preferences]\nvolume = -20\n");
        assert_eq!(prefs.volume, 0);
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        for prefs in [
            Preferences {
                station_index: 0,
                volume: 0,
            },
            Preferences {
                station_index: 8,
                volume: 100,
            },
            Preferences {
                station_index: 3,
                volume: 65,
            },
        ] {
            store.save(&prefs).unwrap();
            assert_eq!(store.load(), prefs);
        }
    }

    #[test]
    fn test_save_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.save(&Preferences::default()).unwrap();
        let entries: Vec<_> = std::fs::read_dir(store.path().parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("preferences.toml")]);
    }

    #[test]
    fn test_invalid_utf8_keeps_good_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();

        std::fs::write(
            store.path(),
            b"[Preferences]\nstation_index = 3\n# caf\xe9\nvolume = 70\n",
        )
        .unwrap();
        assert_eq!(
            store.load(),
            Preferences {
                station_index: 3,
                volume: 70
            }
        );

        std::fs::write(
            store.path(),
            b"[Preferences]\nstation_index = 5\nvolume = 7\xff0\n",
        )
        .unwrap();
        let prefs = store.load();
        assert_eq!(prefs.station_index, 5);
        assert_eq!(prefs.volume, 50);
    }

    #[test]
    fn test_legacy_file_imported_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let legacy = dir.path().join(".outremer_radio.conf");
        std::fs::write(&legacy, "[Preferences]\nstation_index = 7\nvolume = 35\n").unwrap();
        let store = store_in(&dir).with_legacy_file(&legacy);

        let expected = Preferences {
            station_index: 7,
            volume: 35,
        };
        assert_eq!(store.load(), expected);
        assert!(store.path().exists());

        // Once preferences.toml exists the legacy file is no longer consulted
        std::fs::write(&legacy, "[Preferences]\nstation_index = 1\nvolume = 99\n").unwrap();
        assert_eq!(store.load(), expected);
    }

    #[test]
    fn test_missing_legacy_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).with_legacy_file(dir.path().join("absent.conf"));
        assert_eq!(store.load(), Preferences::default());
        assert!(store.path().exists());
    }

    #[test]
    fn test_save_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let store = PreferenceStore::new(blocker.join("preferences.toml"));
        assert!(matches!(
            store.save(&Preferences::default()),
            Err(Error::Io { .. })
        ));
    }
}
