use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::StationsConfig;
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    pub url: String,
}

impl Station {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// The nine regional "La 1ère" streams, in display order.
const BUILTIN: &[(&str, &str)] = &[
    (
        "Guadeloupe La 1ère",
        "https://guadeloupe.ice.infomaniak.ch/guadeloupe-128.mp3",
    ),
    (
        "Martinique La 1ère",
        "https://martinique.ice.infomaniak.ch/martinique-128.mp3",
    ),
    (
        "Guyane La 1ère",
        "https://guyane.ice.infomaniak.ch/guyane-128.mp3",
    ),
    (
        "La Réunion La 1ère",
        "https://reunion.ice.infomaniak.ch/reunion-128.mp3",
    ),
    (
        "Mayotte La 1ère",
        "https://mayotte.ice.infomaniak.ch/mayotte-128.mp3",
    ),
    (
        "Nouvelle-Calédonie La 1ère",
        "https://nouvelle-caledonie.ice.infomaniak.ch/nouvelle-caledonie-128.mp3",
    ),
    (
        "Polynésie La 1ère",
        "https://polynesie.ice.infomaniak.ch/polynesie-128.mp3",
    ),
    (
        "Wallis et Futuna La 1ère",
        "https://wallisetfutuna.ice.infomaniak.ch/wallisetfutuna-128.mp3",
    ),
    (
        "Saint-Pierre et Miquelon La 1ère",
        "https://saint-pierreetmiquelon.ice.infomaniak.ch/saint-pierreetmiquelon-128.mp3",
    ),
];

/// Read-only, ordered station list. Never empty.
#[derive(Debug, Clone)]
pub struct Catalog {
    stations: Vec<Station>,
}

impl Catalog {
    pub fn builtin() -> Self {
        Self {
            stations: BUILTIN
                .iter()
                .map(|(name, url)| Station::new(*name, *url))
                .collect(),
        }
    }

    /// Build from an explicit list. Duplicate names keep their first
    /// occurrence; an empty list yields `None`.
    pub fn from_stations(stations: Vec<Station>) -> Option<Self> {
        let mut seen = HashSet::new();
        let stations: Vec<Station> = stations
            .into_iter()
            .filter(|s| {
                let fresh = seen.insert(s.name.clone());
                if !fresh {
                    warn!("Duplicate station '{}' ignored", s.name);
                }
                fresh
            })
            .collect();
        if stations.is_empty() {
            None
        } else {
            Some(Self { stations })
        }
    }

    /// User station file when present and usable, built-in list otherwise.
    pub fn load(config: &StationsConfig) -> Self {
        let path = &config.stations_toml;
        if path.exists() {
            match load_stations_from_toml(path) {
                Ok(stations) => match Self::from_stations(stations) {
                    Some(catalog) => {
                        info!(
                            "Loaded {} stations from TOML: {}",
                            catalog.len(),
                            path.display()
                        );
                        return catalog;
                    }
                    None => warn!("{} lists no stations, using built-ins", path.display()),
                },
                Err(e) => warn!("Failed to parse TOML stations: {}", e),
            }
        }
        Self::builtin()
    }

    pub fn list(&self) -> &[Station] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn find(&self, name: &str) -> Result<&Station> {
        self.stations
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.stations
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Clamp a possibly stale index into range.
    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.stations.len() - 1)
    }

    pub fn get(&self, index: usize) -> &Station {
        &self.stations[self.clamp_index(index)]
    }

    pub fn next(&self, index: usize) -> usize {
        (self.clamp_index(index) + 1) % self.stations.len()
    }

    pub fn prev(&self, index: usize) -> usize {
        let current = self.clamp_index(index);
        if current == 0 {
            self.stations.len() - 1
        } else {
            current - 1
        }
    }

    pub fn random_index(&self) -> usize {
        use rand::Rng;
        rand::thread_rng().gen_range(0..self.stations.len())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

// ── TOML station loader ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct TomlStationFile {
    #[serde(default)]
    station: Vec<Station>,
}

pub fn load_stations_from_toml(path: &Path) -> Result<Vec<Station>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_stations_from_toml_str(&content)
}

pub fn parse_stations_from_toml_str(content: &str) -> Result<Vec<Station>> {
    let file: TomlStationFile =
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
    Ok(file.station)
}
