use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::MixerConfig;
use crate::error::{Error, Result};
use crate::platform;
use crate::preferences::{PreferenceStore, Preferences, MAX_VOLUME};

pub fn clamp_volume(level: i64) -> u8 {
    level.clamp(0, MAX_VOLUME as i64) as u8
}

/// Drives the system mixer and remembers the level.
///
/// The player is launched with a fixed initial volume and never
/// reconfigured, so the level is applied to the default output sink and
/// works the same whether or not anything is playing.
#[derive(Debug, Clone)]
pub struct VolumeController {
    mixer: MixerConfig,
    store: PreferenceStore,
}

impl VolumeController {
    pub fn new(mixer: MixerConfig, store: PreferenceStore) -> Self {
        Self { mixer, store }
    }

    /// Clamp, apply to the mixer, then update and persist `prefs`.
    ///
    /// The preference is stored even when the mixer fails; the mixer error
    /// takes precedence in the returned result.
    pub async fn set_volume(&self, prefs: &mut Preferences, level: i64) -> Result<u8> {
        let volume = clamp_volume(level);
        if volume as i64 != level {
            debug!("Volume {} clamped to {}", level, volume);
        }

        let mixed = self.apply_to_mixer(volume).await;
        prefs.volume = volume;
        let saved = self.store.save(prefs);

        match (mixed, saved) {
            (Ok(()), Ok(())) => {
                info!("Volume set to {}%", volume);
                Ok(volume)
            }
            (Ok(()), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(io)) => {
                warn!("Volume {} not persisted: {}", volume, io);
                Err(e)
            }
        }
    }

    /// Run the mixer command with `{volume}` substituted. An empty program
    /// disables the mixer.
    pub async fn apply_to_mixer(&self, volume: u8) -> Result<()> {
        if self.mixer.program.is_empty() {
            debug!("Mixer disabled, volume {} only stored", volume);
            return Ok(());
        }

        let level = volume.to_string();
        let args: Vec<String> = self
            .mixer
            .args
            .iter()
            .map(|a| a.replace("{volume}", &level))
            .collect();
        let program = platform::resolve_binary(&self.mixer.program);
        debug!("Mixer: {:?} {:?}", program, args);

        let output = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::Mixer(format!("cannot run '{}': {}", self.mixer.program, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Mixer(format!(
                "'{}' failed ({}): {}",
                self.mixer.program,
                output.status,
                stderr.trim()
            )));
        }
        Ok(())
    }
}
