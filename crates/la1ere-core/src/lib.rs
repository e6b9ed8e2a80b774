//! Core of the La 1ère radio player: station catalog, persisted preferences,
//! the external-player session and the system volume control.

pub mod catalog;
pub mod config;
pub mod error;
pub mod platform;
pub mod preferences;
pub mod protocol;
pub mod radio;
pub mod session;
pub mod volume;

pub use catalog::{Catalog, Station};
pub use config::Config;
pub use error::{Error, Result};
pub use preferences::{PreferenceStore, Preferences};
pub use protocol::{Command, StationRef, Status};
pub use radio::Radio;
pub use session::{PlaybackSession, StopOutcome};
pub use volume::VolumeController;
