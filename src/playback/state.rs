use crate::audio::Track;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackStatus {
    Idle,
    Playing,
    Paused,
    FadingOut,
    FadingIn,
    WaitingBetweenSongs,
}

impl PlaybackStatus {
    pub fn is_fading(&self) -> bool {
        matches!(self, PlaybackStatus::FadingOut | PlaybackStatus::FadingIn)
    }

    /// States where a replacement track is queued up
    pub fn holds_pending(&self) -> bool {
        matches!(
            self,
            PlaybackStatus::FadingOut | PlaybackStatus::WaitingBetweenSongs
        )
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlaybackStatus::Idle => "Idle",
            PlaybackStatus::Playing => "Playing",
            PlaybackStatus::Paused => "Paused",
            PlaybackStatus::FadingOut => "Fading out",
            PlaybackStatus::FadingIn => "Fading in",
            PlaybackStatus::WaitingBetweenSongs => "Waiting",
        };
        f.write_str(label)
    }
}

/// Everything the transition state machine knows. Owned by the engine alone;
/// callers only ever see it through `&`.
#[derive(Debug, Clone)]
pub struct PlaybackState {
    pub current: Option<Arc<Track>>,
    pub status: PlaybackStatus,
    pub fade_progress: f32,
    /// seconds; the duration in effect for the running fade pair
    pub fade_duration: f32,
    pub volume_before_fade: f32,
    /// volume the engine computed for this tick while fading
    pub fade_volume: f32,
    pub pending: Option<Arc<Track>>,
    pub silence_elapsed: f32,
    pub silence_duration: f32,
    pub is_manual_skip: bool,
    /// paused because the game paused, not because the user asked
    pub paused_by_host: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current: None,
            status: PlaybackStatus::Idle,
            fade_progress: 0.0,
            fade_duration: 0.0,
            volume_before_fade: 0.0,
            fade_volume: 0.0,
            pending: None,
            silence_elapsed: 0.0,
            silence_duration: 0.0,
            is_manual_skip: false,
            paused_by_host: false,
        }
    }
}

impl PlaybackState {
    /// Drops any fade or silence in flight. Current track and status are left alone.
    pub fn clear_transition(&mut self) {
        self.pending = None;
        self.fade_progress = 0.0;
        self.fade_volume = 0.0;
        self.silence_elapsed = 0.0;
        self.silence_duration = 0.0;
        self.is_manual_skip = false;
    }

    /// pending is set exactly while fading out or waiting, progress stays in range
    pub fn is_consistent(&self) -> bool {
        self.pending.is_some() == self.status.holds_pending()
            && (0.0..=1.0).contains(&self.fade_progress)
    }
}
