/// Playback session: owns at most one external player process.
///
/// ```text
///            start(s)                    start(s') (switch)
///   Idle ─────────────▶ Playing ──────────────────────────┐
///    ▲                    │  ▲                             │
///    │       stop()       │  └── stop old, spawn new ◀─────┘
///    └────────────────────┘
/// ```
///
/// The child handle lives inside the `Playing` variant, so "handle present
/// iff playing" holds by construction. `stop()` moves the handle out and
/// marks the session idle before any signalling happens; whatever goes wrong
/// afterwards, the session is idle. Children are spawned with
/// `kill_on_drop`, so a dropped handle never outlives its owner.
///
/// Shutdown is graceful-then-forced: SIGTERM, bounded wait, SIGKILL.
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::catalog::Station;
use crate::config::{PlayerConfig, PlayerKind};
use crate::error::{Error, Result};
use crate::platform;

/// How a `stop()` call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// Nothing was playing.
    AlreadyIdle,
    /// The player exited within the timeout after SIGTERM.
    Exited,
    /// The timeout elapsed and the player was killed.
    Killed,
}

/// Fully resolved player invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl PlayerCommand {
    pub fn build(config: &PlayerConfig, volume: u8, url: &str) -> Self {
        let vol = volume.min(100).to_string();
        let (default_program, args) = match config.kind {
            PlayerKind::Vlc => (
                "vlc",
                vec![
                    "--intf".to_string(),
                    "dummy".to_string(),
                    "--no-video".to_string(),
                    "--volume".to_string(),
                    vol,
                    url.to_string(),
                ],
            ),
            PlayerKind::Mpv => (
                "mpv",
                vec![
                    "--no-video".to_string(),
                    "--quiet".to_string(),
                    format!("--volume={}", vol),
                    url.to_string(),
                ],
            ),
            PlayerKind::Custom => (
                "",
                config
                    .args
                    .iter()
                    .map(|a| a.replace("{volume}", &vol).replace("{url}", url))
                    .collect(),
            ),
        };

        let program = if config.program.is_empty() {
            default_program
        } else {
            config.program.as_str()
        };

        Self {
            program: platform::resolve_binary(program),
            args,
        }
    }
}

struct ActivePlayer {
    child: Child,
    station: Station,
    started_at: DateTime<Local>,
}

enum SessionState {
    Idle,
    Playing(ActivePlayer),
}

pub struct PlaybackSession {
    player: PlayerConfig,
    stop_timeout: Duration,
    state: SessionState,
}

impl PlaybackSession {
    pub fn new(player: PlayerConfig) -> Self {
        let stop_timeout = player.stop_timeout();
        Self {
            player,
            stop_timeout,
            state: SessionState::Idle,
        }
    }

    /// Override the SIGTERM grace period (sub-second values are allowed here).
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, SessionState::Playing(_))
    }

    pub fn current_station(&self) -> Option<&Station> {
        match &self.state {
            SessionState::Playing(active) => Some(&active.station),
            SessionState::Idle => None,
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        match &self.state {
            SessionState::Playing(active) => Some(active.started_at),
            SessionState::Idle => None,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        match &self.state {
            SessionState::Playing(active) => active.child.id(),
            SessionState::Idle => None,
        }
    }

    /// Start `station`, or switch to it when something is already playing.
    ///
    /// On a switch the previous player is fully stopped before the new one is
    /// spawned. If spawning fails the session is left idle.
    pub async fn start(&mut self, station: &Station, volume: u8) -> Result<()> {
        if let Some(previous) = self.current_station() {
            info!("Switching from '{}' to '{}'", previous.name, station.name);
            if let Err(e) = self.stop().await {
                warn!("Previous player did not stop cleanly: {}", e);
            }
        }

        let cmd = PlayerCommand::build(&self.player, volume, &station.url);
        debug!("Spawning player: {:?} {:?}", cmd.program, cmd.args);

        let child = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                warn!("Failed to start player for '{}': {}", station.name, source);
                Error::PlayerLaunch {
                    program: cmd.program.display().to_string(),
                    source,
                }
            })?;

        info!(
            "Playing '{}' (pid {:?}, volume {})",
            station.name,
            child.id(),
            volume
        );
        self.state = SessionState::Playing(ActivePlayer {
            child,
            station: station.clone(),
            started_at: Local::now(),
        });
        Ok(())
    }

    /// Stop playback. Idle sessions return `AlreadyIdle`.
    ///
    /// On `Err(PlayerStop)` the session is idle anyway.
    pub async fn stop(&mut self) -> Result<StopOutcome> {
        let active = match std::mem::replace(&mut self.state, SessionState::Idle) {
            SessionState::Playing(active) => active,
            SessionState::Idle => return Ok(StopOutcome::AlreadyIdle),
        };

        info!("Stopping '{}'", active.station.name);
        terminate(active.child, self.stop_timeout).await
    }

    /// Non-blocking liveness check. A player that exited on its own (stream
    /// dropped, crash) moves the session back to idle.
    pub fn reap_exited(&mut self) -> Option<ExitStatus> {
        let SessionState::Playing(active) = &mut self.state else {
            return None;
        };

        match active.child.try_wait() {
            Ok(None) => None,
            Ok(Some(status)) => {
                warn!("Player for '{}' exited: {}", active.station.name, status);
                self.state = SessionState::Idle;
                Some(status)
            }
            Err(e) => {
                warn!("Player liveness check failed: {}", e);
                None
            }
        }
    }
}

/// SIGTERM, wait up to `timeout`, then SIGKILL.
async fn terminate(mut child: Child, timeout: Duration) -> Result<StopOutcome> {
    if let Err(e) = request_exit(&mut child) {
        warn!("Could not signal player: {}", e);
        force_kill(&mut child).await;
        return Err(Error::PlayerStop(format!("signalling player: {}", e)));
    }

    let waited = tokio::time::timeout(timeout, child.wait()).await;
    match waited {
        Ok(Ok(status)) => {
            debug!("Player exited: {}", status);
            Ok(StopOutcome::Exited)
        }
        Ok(Err(e)) => {
            warn!("Waiting for player failed: {}", e);
            force_kill(&mut child).await;
            Err(Error::PlayerStop(format!("waiting for player: {}", e)))
        }
        Err(_) => {
            warn!("Player still running after {:?}, killing", timeout);
            child
                .kill()
                .await
                .map_err(|e| Error::PlayerStop(format!("killing player: {}", e)))?;
            Ok(StopOutcome::Killed)
        }
    }
}

async fn force_kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        debug!("Forced kill failed: {}", e);
    }
}

#[cfg(unix)]
fn request_exit(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match child.id() {
        Some(pid) => kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(std::io::Error::from),
        // Already reaped
        None => Ok(()),
    }
}

// No cooperative termination request outside unix; the wait below then
// only covers the kill itself.
#[cfg(not(unix))]
fn request_exit(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station() -> Station {
        Station::new("Test FM", "http://127.0.0.1:9/stream.mp3")
    }

    #[test]
    fn test_vlc_command_line() {
        let cmd = PlayerCommand::build(&PlayerConfig::default(), 65, "http://x/y.mp3");
        assert!(cmd.program.ends_with("vlc") || cmd.program.ends_with("vlc.exe"));
        assert_eq!(
            cmd.args,
            vec!["--intf", "dummy", "--no-video", "--volume", "65", "http://x/y.mp3"]
        );
    }

    #[test]
    fn test_mpv_command_line() {
        let config = PlayerConfig {
            kind: PlayerKind::Mpv,
            ..PlayerConfig::default()
        };
        let cmd = PlayerCommand::build(&config, 120, "http://x/y.mp3");
        assert_eq!(
            cmd.args,
            vec!["--no-video", "--quiet", "--volume=100", "http://x/y.mp3"]
        );
    }

    #[test]
    fn test_custom_command_placeholders() {
        let config = PlayerConfig {
            kind: PlayerKind::Custom,
            program: "ffplay".to_string(),
            args: vec![
                "-nodisp".to_string(),
                "-volume".to_string(),
                "{volume}".to_string(),
                "{url}".to_string(),
            ],
            ..PlayerConfig::default()
        };
        let cmd = PlayerCommand::build(&config, 30, "http://x/y.mp3");
        assert!(cmd.program.ends_with("ffplay") || cmd.program.ends_with("ffplay.exe"));
        assert_eq!(cmd.args, vec!["-nodisp", "-volume", "30", "http://x/y.mp3"]);
    }

    #[test]
    fn test_stop_timeout_from_config() {
        let config = PlayerConfig {
            stop_timeout_secs: 2,
            ..PlayerConfig::default()
        };
        let session = PlaybackSession::new(config);
        assert_eq!(session.stop_timeout(), Duration::from_secs(2));
        let session = session.with_stop_timeout(Duration::from_millis(250));
        assert_eq!(session.stop_timeout(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let mut session = PlaybackSession::new(PlayerConfig::default());
        assert!(!session.is_playing());
        assert_eq!(session.stop().await.unwrap(), StopOutcome::AlreadyIdle);
        assert_eq!(session.stop().await.unwrap(), StopOutcome::AlreadyIdle);
        assert!(session.current_station().is_none());
        assert!(session.pid().is_none());
        assert!(session.reap_exited().is_none());
    }

    #[tokio::test]
    async fn test_missing_player_reports_launch_error() {
        let config = PlayerConfig {
            program: "/nonexistent/bin/la1ere-player".to_string(),
            ..PlayerConfig::default()
        };
        let mut session = PlaybackSession::new(config);
        match session.start(&station(), 50).await {
            Err(Error::PlayerLaunch { program, .. }) => {
                assert!(program.contains("la1ere-player"))
            }
            other => panic!("expected PlayerLaunch, got {:?}", other),
        }
        assert!(!session.is_playing());
        assert!(session.started_at().is_none());
    }
}
