pub mod catalog;
pub mod device;
pub mod metadata_parser;
#[cfg(feature = "audio")]
pub mod player;
pub mod scanner;
pub mod track;

pub use catalog::Catalog;
pub use device::{AudioDevice, SimulatedDevice};
#[cfg(feature = "audio")]
pub use player::RodioDevice;
pub use scanner::{CatalogProvider, MusicScanner};
pub use track::{Category, Track, TrackFlags, TrackId, TrackOrigin};

/// Extensions the scanner picks up and the parser strips
pub const SUPPORTED_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "oga", "mp4", "m4a", "aac", "wav"];
