pub mod engine;
pub mod fade;
pub mod state;

pub use engine::{format_time, EngineEvent, PlaybackEngine, TransitionSettings};
pub use state::{PlaybackState, PlaybackStatus};
