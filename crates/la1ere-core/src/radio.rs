/// Radio: explicitly constructed owner of every core component.
///
/// Holds the catalog, the preference store and its in-memory copy, the
/// playback session and the volume controller. All transitions take
/// `&mut self`, so whoever owns the `Radio` serialises them; the front end
/// keeps it inside a single event-loop task.
use std::process::ExitStatus;

use tracing::{info, warn};

use crate::catalog::{Catalog, Station};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::platform;
use crate::preferences::{PreferenceStore, Preferences};
use crate::protocol::{StationRef, Status};
use crate::session::{PlaybackSession, StopOutcome};
use crate::volume::VolumeController;

pub struct Radio {
    catalog: Catalog,
    store: PreferenceStore,
    prefs: Preferences,
    session: PlaybackSession,
    volume: VolumeController,
}

impl Radio {
    pub fn new(config: &Config) -> Self {
        let catalog = Catalog::load(&config.stations);
        let mut store = PreferenceStore::new(&config.paths.preferences_file);
        if let Some(legacy) = platform::legacy_preferences_file() {
            store = store.with_legacy_file(legacy);
        }
        let session = PlaybackSession::new(config.player.clone());
        let volume = VolumeController::new(config.mixer.clone(), store.clone());
        Self::with_parts(catalog, store, session, volume)
    }

    /// Loads preferences from `store` and clamps a stale station index.
    pub fn with_parts(
        catalog: Catalog,
        store: PreferenceStore,
        session: PlaybackSession,
        volume: VolumeController,
    ) -> Self {
        let mut prefs = store.load();
        let clamped = catalog.clamp_index(prefs.station_index);
        if clamped != prefs.station_index {
            warn!(
                "Stored station index {} out of range, using {}",
                prefs.station_index, clamped
            );
            prefs.station_index = clamped;
        }
        info!(
            "Preferences: station '{}' volume {}",
            catalog.get(prefs.station_index).name,
            prefs.volume
        );

        Self {
            catalog,
            store,
            prefs,
            session,
            volume,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn preferences(&self) -> Preferences {
        self.prefs
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn is_playing(&self) -> bool {
        self.session.is_playing()
    }

    pub fn selected(&self) -> &Station {
        self.catalog.get(self.prefs.station_index)
    }

    fn resolve(&self, station: &StationRef) -> Result<usize> {
        match station {
            StationRef::Index(i) if *i < self.catalog.len() => Ok(*i),
            StationRef::Index(i) => Err(Error::NotFound(format!(
                "station {} (valid: 0-{})",
                i,
                self.catalog.len() - 1
            ))),
            StationRef::Name(name) => self.catalog.index_of(name),
        }
    }

    /// Start (or restart) the selected station at the stored volume.
    pub async fn play(&mut self) -> Result<()> {
        let station = self.selected().clone();
        self.session.start(&station, self.prefs.volume).await
    }

    /// Select `station`, then start or switch to it.
    pub async fn play_station(&mut self, station: &StationRef) -> Result<()> {
        let index = self.resolve(station)?;
        let saved = self.remember_station(index);
        self.play().await?;
        saved
    }

    pub async fn play_named(&mut self, name: &str) -> Result<()> {
        self.play_station(&StationRef::Name(name.to_string())).await
    }

    /// Change the selection; a playing session switches to the new station.
    pub async fn select(&mut self, station: &StationRef) -> Result<&Station> {
        let index = self.resolve(station)?;
        if index != self.prefs.station_index {
            let saved = self.remember_station(index);
            if self.session.is_playing() {
                self.play().await?;
            }
            saved?;
        }
        Ok(self.selected())
    }

    pub async fn next(&mut self) -> Result<&Station> {
        let index = self.catalog.next(self.prefs.station_index);
        self.select(&StationRef::Index(index)).await
    }

    pub async fn prev(&mut self) -> Result<&Station> {
        let index = self.catalog.prev(self.prefs.station_index);
        self.select(&StationRef::Index(index)).await
    }

    pub async fn random(&mut self) -> Result<&Station> {
        let index = self.catalog.random_index();
        self.select(&StationRef::Index(index)).await
    }

    pub async fn stop(&mut self) -> Result<StopOutcome> {
        self.session.stop().await
    }

    /// Play when idle, stop when playing. Returns the new playing state.
    pub async fn toggle(&mut self) -> Result<bool> {
        if self.session.is_playing() {
            self.stop().await?;
        } else {
            self.play().await?;
        }
        Ok(self.session.is_playing())
    }

    pub async fn set_volume(&mut self, level: i64) -> Result<u8> {
        self.volume.set_volume(&mut self.prefs, level).await
    }

    /// Liveness check for a player that may have exited by itself.
    pub fn heartbeat(&mut self) -> Option<ExitStatus> {
        self.session.reap_exited()
    }

    pub fn status(&self) -> Status {
        Status {
            station_index: self.prefs.station_index,
            station: self.selected().name.clone(),
            playing: self.session.is_playing(),
            volume: self.prefs.volume,
            since: self.session.started_at(),
            pid: self.session.pid(),
        }
    }

    /// Persist preferences and stop the player.
    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Shutting down");
        let saved = self.store.save(&self.prefs);
        if let Err(e) = &saved {
            warn!("Could not save preferences on exit: {}", e);
        }
        self.session.stop().await?;
        saved
    }

    fn remember_station(&mut self, index: usize) -> Result<()> {
        self.prefs.station_index = index;
        self.store.save(&self.prefs).map_err(|e| {
            warn!("Could not save station selection: {}", e);
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MixerConfig, PlayerConfig};

    fn radio_in(dir: &tempfile::TempDir) -> Radio {
        let store = PreferenceStore::new(dir.path().join("preferences.toml"));
        let mixer = MixerConfig {
            program: String::new(),
            args: Vec::new(),
        };
        Radio::with_parts(
            Catalog::builtin(),
            store.clone(),
            PlaybackSession::new(PlayerConfig::default()),
            VolumeController::new(mixer, store),
        )
    }

    #[test]
    fn test_stale_index_clamped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("preferences.toml"),
            "[preferences]\nstation_index = 99\nvolume = 20\n",
        )
        .unwrap();
        let radio = radio_in(&dir);
        assert_eq!(radio.preferences().station_index, 8);
        assert_eq!(radio.preferences().volume, 20);
        assert_eq!(radio.selected().name, "Saint-Pierre et Miquelon La 1ère");
    }

    #[tokio::test]
    async fn test_select_while_idle_persists_without_playing() {
        let dir = tempfile::tempdir().unwrap();
        let mut radio = radio_in(&dir);

        let station = radio
            .select(&StationRef::Name("Mayotte La 1ère".to_string()))
            .await
            .unwrap();
        assert_eq!(station.name, "Mayotte La 1ère");
        assert!(!radio.is_playing());

        let reloaded = radio_in(&dir);
        assert_eq!(reloaded.preferences().station_index, 4);
    }

    #[tokio::test]
    async fn test_unknown_name_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut radio = radio_in(&dir);
        assert!(matches!(
            radio.play_named("Radio Nowhere").await,
            Err(Error::NotFound(_))
        ));
        assert!(!radio.is_playing());
        assert_eq!(radio.preferences().station_index, 0);
    }

    #[tokio::test]
    async fn test_index_past_end_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut radio = radio_in(&dir);
        radio.select(&StationRef::Index(2)).await.unwrap();

        assert!(matches!(
            radio.select(&StationRef::Index(42)).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            radio.play_station(&StationRef::Index(9)).await,
            Err(Error::NotFound(_))
        ));
        assert!(!radio.is_playing());
        assert_eq!(radio.preferences().station_index, 2);
        assert_eq!(
            radio.select(&StationRef::Index(8)).await.unwrap().name,
            "Saint-Pierre et Miquelon La 1ère"
        );
    }

    #[tokio::test]
    async fn test_next_prev_wrap() {
        let dir = tempfile::tempdir().unwrap();
        let mut radio = radio_in(&dir);
        assert_eq!(radio.prev().await.unwrap().name, "Saint-Pierre et Miquelon La 1ère");
        assert_eq!(radio.next().await.unwrap().name, "Guadeloupe La 1ère");
    }

    #[tokio::test]
    async fn test_volume_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut radio = radio_in(&dir);
        assert_eq!(radio.set_volume(150).await.unwrap(), 100);
        assert_eq!(radio.set_volume(-5).await.unwrap(), 0);

        let status = radio.status();
        assert_eq!(status.volume, 0);
        assert!(!status.playing);
        assert!(status.since.is_none());
        assert_eq!(status.station, "Guadeloupe La 1ère");
        assert_eq!(radio_in(&dir).preferences().volume, 0);
    }

    #[tokio::test]
    async fn test_shutdown_when_idle() {
        let dir = tempfile::tempdir().unwrap();
        let mut radio = radio_in(&dir);
        radio.shutdown().await.unwrap();
        assert!(dir.path().join("preferences.toml").exists());
    }
}
