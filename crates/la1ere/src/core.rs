/// RadioCore: single-owner event loop around `Radio`.
///
/// stdin, the heartbeat ticker and Ctrl-C each run on their own and
/// only send `CoreEvent`s here. Only this loop touches the `Radio`, so two
/// player transitions can never overlap. Events arriving during a slow
/// `stop()` (up to the SIGTERM grace period) are queued in the channel and
/// handled in order once it returns.
use std::time::Duration;

use la1ere_core::protocol::HELP;
use la1ere_core::{Command, Radio, StopOutcome};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

/// All inputs into the RadioCore loop.
#[derive(Debug)]
pub enum CoreEvent {
    /// A parsed line from the user.
    Command(Command),
    /// Check whether the player is still alive.
    HeartbeatTick,
    /// stdin closed or Ctrl-C.
    Shutdown,
}

pub struct RadioCore {
    radio: Radio,
    event_tx: mpsc::Sender<CoreEvent>,
}

impl RadioCore {
    pub fn new(radio: Radio, event_tx: mpsc::Sender<CoreEvent>) -> Self {
        Self { radio, event_tx }
    }

    /// Run until `Quit`/`Shutdown`, then persist and stop the player.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<CoreEvent>) -> anyhow::Result<()> {
        info!("RadioCore: starting event loop");

        let heartbeat_tx = self.event_tx.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(HEARTBEAT_INTERVAL).await;
                if heartbeat_tx.send(CoreEvent::HeartbeatTick).await.is_err() {
                    break;
                }
            }
        });

        loop {
            match event_rx.recv().await {
                None | Some(CoreEvent::Shutdown) | Some(CoreEvent::Command(Command::Quit)) => {
                    info!("RadioCore: shutting down");
                    break;
                }

                Some(CoreEvent::Command(cmd)) => {
                    info!("RadioCore: command {:?}", cmd);
                    match self.handle_command(cmd).await {
                        Ok(reply) => println!("{}", reply),
                        Err(e) => {
                            error!("RadioCore: command error: {}", e);
                            println!("error: {}", e);
                        }
                    }
                }

                Some(CoreEvent::HeartbeatTick) => {
                    if let Some(status) = self.radio.heartbeat() {
                        warn!("RadioCore: heartbeat: player exited ({})", status);
                        println!("player stopped ({})", status);
                    }
                }
            }
        }

        self.radio.shutdown().await?;
        Ok(())
    }

    async fn handle_command(&mut self, cmd: Command) -> anyhow::Result<String> {
        let reply = match cmd {
            Command::List => format_station_list(&self.radio),
            Command::Play { station } => {
                match station {
                    Some(station) => self.radio.play_station(&station).await?,
                    None => self.radio.play().await?,
                }
                format!("playing {}", self.radio.selected().name)
            }
            Command::Stop => match self.radio.stop().await? {
                StopOutcome::AlreadyIdle => "not playing".to_string(),
                StopOutcome::Exited => "stopped".to_string(),
                StopOutcome::Killed => "stopped (player killed)".to_string(),
            },
            Command::Toggle => {
                if self.radio.toggle().await? {
                    format!("playing {}", self.radio.selected().name)
                } else {
                    "stopped".to_string()
                }
            }
            Command::Select { station } => {
                let name = self.radio.select(&station).await?.name.clone();
                self.selection_reply(name)
            }
            Command::Next => {
                let name = self.radio.next().await?.name.clone();
                self.selection_reply(name)
            }
            Command::Prev => {
                let name = self.radio.prev().await?.name.clone();
                self.selection_reply(name)
            }
            Command::Random => {
                let name = self.radio.random().await?.name.clone();
                self.selection_reply(name)
            }
            Command::Volume { level } => {
                let volume = self.radio.set_volume(level).await?;
                format!("volume {}%", volume)
            }
            Command::Status => serde_json::to_string(&self.radio.status())?,
            Command::Help => HELP.to_string(),
            Command::Quit => "bye".to_string(),
        };
        Ok(reply)
    }

    fn selection_reply(&self, name: String) -> String {
        if self.radio.is_playing() {
            format!("playing {}", name)
        } else {
            format!("selected {}", name)
        }
    }
}

/// One station per line; `*` marks the selection, `>` the playing one.
pub fn format_station_list(radio: &Radio) -> String {
    let selected = radio.preferences().station_index;
    let playing = radio.is_playing();
    radio
        .catalog()
        .list()
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mark = match (i == selected, playing) {
                (true, true) => '>',
                (true, false) => '*',
                _ => ' ',
            };
            format!("{} {:>2}  {}", mark, i, s.name)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
