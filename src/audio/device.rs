// The host's single audio channel, seen through the only seam that issues
// transport and volume commands. The engine owns the channel's volume while
// it is fading, but the host may overwrite it on its own update pass.

use super::track::{Track, TrackId};
use crate::Result;
use std::time::Duration;

pub trait AudioDevice {
    /// False while the host has not wired up its channel yet
    fn is_available(&self) -> bool {
        true
    }

    /// Starts `track` from the top. Resets the channel volume to the host default.
    fn play(&mut self, track: &Track) -> Result<()>;
    fn stop(&mut self);
    fn pause(&mut self);
    fn resume(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn volume(&self) -> f32;
    /// Normalized position in 0..=1
    fn seek(&mut self, position: f32);
    fn is_playing(&self) -> bool;
    /// (elapsed, total) in seconds for the loaded clip
    fn elapsed_and_total(&self) -> Option<(f32, f32)>;

    /// The host's own music volume preference
    fn host_volume(&self) -> f32 {
        1.0
    }

    /// Called once per frame by the driver. Devices with a real clock ignore it.
    fn tick(&mut self, _dt: Duration) {}
}

// lets the binary pick a backend at runtime
impl<D: AudioDevice + ?Sized> AudioDevice for Box<D> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }
    fn play(&mut self, track: &Track) -> Result<()> {
        (**self).play(track)
    }
    fn stop(&mut self) {
        (**self).stop()
    }
    fn pause(&mut self) {
        (**self).pause()
    }
    fn resume(&mut self) {
        (**self).resume()
    }
    fn set_volume(&mut self, volume: f32) {
        (**self).set_volume(volume)
    }
    fn volume(&self) -> f32 {
        (**self).volume()
    }
    fn seek(&mut self, position: f32) {
        (**self).seek(position)
    }
    fn is_playing(&self) -> bool {
        (**self).is_playing()
    }
    fn elapsed_and_total(&self) -> Option<(f32, f32)> {
        (**self).elapsed_and_total()
    }
    fn host_volume(&self) -> f32 {
        (**self).host_volume()
    }
    fn tick(&mut self, dt: Duration) {
        (**self).tick(dt)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    Play(TrackId),
    Stop,
    Pause,
    Resume,
    SetVolume(f32),
    Seek(f32),
}

#[derive(Debug, Clone)]
struct LoadedClip {
    id: TrackId,
    length: f32,
}

/// A channel with a manual clock. Drives `--no-audio` runs and the tests:
/// nothing moves until `advance` is called.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    available: bool,
    clip: Option<LoadedClip>,
    position: f32,
    playing: bool,
    volume: f32,
    host_volume: f32,
    default_length: f32,
    fail_plays: bool,
    // off unless asked for; the driver ticks this device every frame
    log_commands: bool,
    commands: Vec<DeviceCommand>,
}

impl SimulatedDevice {
    pub fn new() -> Self {
        Self {
            available: true,
            clip: None,
            position: 0.0,
            playing: false,
            volume: 1.0,
            host_volume: 1.0,
            // unknown durations are treated as three minutes
            default_length: 180.0,
            fail_plays: false,
            log_commands: false,
            commands: Vec::new(),
        }
    }

    pub fn with_host_volume(mut self, host_volume: f32) -> Self {
        self.host_volume = host_volume.clamp(0.0, 1.0);
        self.volume = self.host_volume;
        self
    }

    /// Records every transport and volume command for inspection
    pub fn with_command_log(mut self) -> Self {
        self.log_commands = true;
        self
    }

    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    pub fn set_fail_plays(&mut self, fail: bool) {
        self.fail_plays = fail;
    }

    /// Moves the playhead. A clip that runs out stops and rewinds to 0.
    pub fn advance(&mut self, dt: Duration) {
        if !self.playing {
            return;
        }
        let Some(clip) = &self.clip else {
            return;
        };

        self.position += dt.as_secs_f32();
        if self.position >= clip.length {
            self.position = 0.0;
            self.playing = false;
        }
    }

    /// What the host does on its own update pass: stomp the channel volume
    pub fn host_update(&mut self) {
        self.volume = self.host_volume;
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn loaded_track(&self) -> Option<&TrackId> {
        self.clip.as_ref().map(|clip| &clip.id)
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    fn record(&mut self, command: DeviceCommand) {
        if self.log_commands {
            self.commands.push(command);
        }
    }
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioDevice for SimulatedDevice {
    fn is_available(&self) -> bool {
        self.available
    }

    fn play(&mut self, track: &Track) -> Result<()> {
        if self.fail_plays {
            return Err(crate::Error::Decode(format!(
                "simulated decode failure for {}",
                track.id
            )));
        }

        self.record(DeviceCommand::Play(track.id.clone()));
        self.clip = Some(LoadedClip {
            id: track.id.clone(),
            length: track
                .duration
                .map(|d| d.as_secs_f32())
                .unwrap_or(self.default_length),
        });
        self.position = 0.0;
        self.playing = true;
        self.volume = self.host_volume;
        Ok(())
    }

    fn stop(&mut self) {
        self.record(DeviceCommand::Stop);
        self.playing = false;
        self.position = 0.0;
    }

    fn pause(&mut self) {
        self.record(DeviceCommand::Pause);
        self.playing = false;
    }

    fn resume(&mut self) {
        self.record(DeviceCommand::Resume);
        if self.clip.is_some() {
            self.playing = true;
        }
    }

    fn set_volume(&mut self, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        self.record(DeviceCommand::SetVolume(volume));
        self.volume = volume;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn seek(&mut self, position: f32) {
        let position = position.clamp(0.0, 1.0);
        self.record(DeviceCommand::Seek(position));
        if let Some(clip) = &self.clip {
            self.position = position * clip.length;
        }
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn elapsed_and_total(&self) -> Option<(f32, f32)> {
        self.clip
            .as_ref()
            .map(|clip| (self.position, clip.length))
    }

    fn host_volume(&self) -> f32 {
        self.host_volume
    }

    fn tick(&mut self, dt: Duration) {
        self.advance(dt);
    }
}
