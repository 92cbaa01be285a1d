// ambientplay - context-aware ambient playlist engine
// Fades, silence gaps and combat cues over one shared audio channel

pub mod audio;    // tracks, catalog, scanning, device adapters
pub mod config;   // settings file
pub mod context;  // environment sampling
pub mod error;
pub mod notify;   // now-playing announcements
pub mod playback; // transition state machine
pub mod selection; // what plays next
pub mod session;  // the owned engine instance
pub mod ui;       // terminal driver glue

pub use audio::{AudioDevice, Catalog, MusicScanner, SimulatedDevice, Track, TrackFlags, TrackId};
pub use config::Config;
pub use context::{ContextOracle, ContextProvider, ContextSnapshot};
pub use error::{Error, Result};
pub use playback::{EngineEvent, PlaybackEngine, PlaybackStatus};
pub use selection::{Direction, PlayMode, SelectionPolicy, TrackPreferences};
pub use session::{Session, SessionStatus};
