// Configuration management for ambientplay
// Handles loading/saving settings, with sensible defaults when config is missing

use crate::playback::TransitionSettings;
use crate::selection::PlayMode;
use anyhow::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest silence gap a user can configure, in seconds
pub const MAX_SILENCE_LIMIT: f32 = 600.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub music_directories: Vec<PathBuf>,
    /// music that ships with the host; opt-in via `playback.include_host_tracks`
    pub host_music_directories: Vec<PathBuf>,
    pub database_path: PathBuf,
    pub playback: PlaybackConfig,
    pub context: ContextConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub shuffle: bool,
    pub context_aware: bool,
    pub include_host_tracks: bool,
    pub block_event_triggers: bool,
    pub show_now_playing: bool,
    pub pause_with_game: bool,
    pub player_volume: f32,
    pub min_silence_secs: f32,
    pub max_silence_secs: f32,
    pub natural_fade: FadeSpeed,
    pub manual_fade: FadeSpeed,
    pub auto_start_frames: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub poll_interval_secs: f32,
    pub day_start_hour: f32,
    pub day_end_hour: f32,
    /// real minutes per in-world day for the built-in clock
    pub minutes_per_day: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub show_notifications: bool,
    pub notification_duration_ms: u64,
    pub frame_ms: u64,
}

/// Fade length presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FadeSpeed {
    Off,
    SuperSlow,
    VerySlow,
    Slow,
    Normal,
    Fast,
    VeryFast,
    SuperFast,
    Flash,
}

impl FadeSpeed {
    pub fn seconds(&self) -> f32 {
        match self {
            FadeSpeed::Off => 0.0,
            FadeSpeed::SuperSlow => 5.0,
            FadeSpeed::VerySlow => 4.0,
            FadeSpeed::Slow => 3.0,
            FadeSpeed::Normal => 2.0,
            FadeSpeed::Fast => 1.0,
            FadeSpeed::VeryFast => 0.5,
            FadeSpeed::SuperFast => 0.2,
            FadeSpeed::Flash => 0.4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FadeSpeed::Off => "Off",
            FadeSpeed::SuperSlow => "Super slow",
            FadeSpeed::VerySlow => "Very slow",
            FadeSpeed::Slow => "Slow",
            FadeSpeed::Normal => "Normal",
            FadeSpeed::Fast => "Fast",
            FadeSpeed::VeryFast => "Very fast",
            FadeSpeed::SuperFast => "Super fast",
            FadeSpeed::Flash => "Flash",
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ambientplay");

        Self {
            music_directories: vec![dirs::audio_dir().unwrap_or_else(|| PathBuf::from("~/Music"))],
            host_music_directories: Vec::new(),
            database_path: config_dir.join("ambientplay.db"),
            playback: PlaybackConfig::default(),
            context: ContextConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            shuffle: true,
            context_aware: true,
            include_host_tracks: false,
            block_event_triggers: false,
            show_now_playing: true,
            pause_with_game: true,
            player_volume: 1.0,
            min_silence_secs: 2.0,
            max_silence_secs: 25.0,
            natural_fade: FadeSpeed::Normal,
            manual_fade: FadeSpeed::Flash,
            auto_start_frames: 60,
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 0.25,
            day_start_hour: 6.0,
            day_end_hour: 18.0,
            minutes_per_day: 16.0,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_notifications: false,
            notification_duration_ms: 3000,
            frame_ms: 16,
        }
    }
}

impl PlaybackConfig {
    /// Keeps the silence bounds inside [0, MAX_SILENCE_LIMIT] with min <= max,
    /// and the volume inside 0..=1.
    pub fn normalize(&mut self) {
        self.min_silence_secs = self.min_silence_secs.clamp(0.0, MAX_SILENCE_LIMIT);
        self.max_silence_secs = self.max_silence_secs.clamp(0.0, MAX_SILENCE_LIMIT);
        if self.min_silence_secs > self.max_silence_secs {
            self.max_silence_secs = self.min_silence_secs;
        }
        self.player_volume = self.player_volume.clamp(0.0, 1.0);
    }

    pub fn play_mode(&self) -> PlayMode {
        if self.shuffle {
            PlayMode::Shuffle
        } else {
            PlayMode::Sequential
        }
    }

    pub fn transition_settings(&self) -> TransitionSettings {
        TransitionSettings {
            natural_fade: self.natural_fade.seconds(),
            manual_fade: self.manual_fade.seconds(),
            min_silence: self.min_silence_secs,
            max_silence: self.max_silence_secs,
            player_volume: self.player_volume,
            block_event_triggers: self.block_event_triggers,
        }
        .normalized()
    }
}

impl ContextConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f32(self.poll_interval_secs.max(0.0))
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Reads `path`, or writes the defaults there if it does not exist yet
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.playback.normalize();
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("ambientplay");

        Ok(config_dir.join("config.toml"))
    }
}
