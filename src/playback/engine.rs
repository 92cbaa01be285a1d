use super::fade::{fade_in_volume, fade_out_volume, roll_silence, step_progress};
use super::state::{PlaybackState, PlaybackStatus};
use crate::audio::{AudioDevice, Track};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Notifications for whoever drives the engine (UI, announcer)
#[derive(Debug, Clone)]
pub enum EngineEvent {
    TrackStarted(Arc<Track>),
    Paused,
    Resumed,
    Stopped,
    FadeOutStarted { manual: bool, duration: f32 },
    SilenceStarted(f32),
    FadeInCompleted,
}

/// Transition timings and volume, all in seconds / 0..1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionSettings {
    pub natural_fade: f32,
    pub manual_fade: f32,
    pub min_silence: f32,
    pub max_silence: f32,
    pub player_volume: f32,
    /// after a stop, context changes may not start music until the user does
    pub block_event_triggers: bool,
}

impl Default for TransitionSettings {
    fn default() -> Self {
        Self {
            natural_fade: 2.0,
            manual_fade: 0.4,
            min_silence: 2.0,
            max_silence: 25.0,
            player_volume: 1.0,
            block_event_triggers: false,
        }
    }
}

impl TransitionSettings {
    pub fn normalized(mut self) -> Self {
        self.natural_fade = self.natural_fade.max(0.0);
        self.manual_fade = self.manual_fade.max(0.0);
        self.min_silence = self.min_silence.clamp(0.0, 600.0);
        self.max_silence = self.max_silence.clamp(self.min_silence, 600.0);
        self.player_volume = self.player_volume.clamp(0.0, 1.0);
        self
    }

    pub fn silence_enabled(&self) -> bool {
        self.max_silence > 0.0
    }
}

/// The transition state machine. Sole writer of the device's transport and
/// volume while it owns a track; driven by `advance` once per frame.
pub struct PlaybackEngine<D: AudioDevice> {
    device: D,
    state: PlaybackState,
    settings: TransitionSettings,
    in_combat: bool,
    event_triggers_blocked: bool,
    event_sender: Option<mpsc::UnboundedSender<EngineEvent>>,
}

impl<D: AudioDevice> PlaybackEngine<D> {
    pub fn new(device: D, settings: TransitionSettings) -> Self {
        Self {
            device,
            state: PlaybackState::default(),
            settings: settings.normalized(),
            in_combat: false,
            event_triggers_blocked: false,
            event_sender: None,
        }
    }

    pub fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<EngineEvent>) {
        self.event_sender = Some(sender);
    }

    pub fn settings(&self) -> &TransitionSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: TransitionSettings) {
        self.settings = settings.normalized();
        if !self.settings.block_event_triggers {
            self.event_triggers_blocked = false;
        }
        self.reassert_volume();
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn status(&self) -> PlaybackStatus {
        self.state.status
    }

    pub fn current(&self) -> Option<&Arc<Track>> {
        self.state.current.as_ref()
    }

    pub fn pending(&self) -> Option<&Arc<Track>> {
        self.state.pending.as_ref()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn in_combat(&self) -> bool {
        self.in_combat
    }

    pub fn set_in_combat(&mut self, in_combat: bool) {
        if self.in_combat != in_combat {
            info!("Combat {}", if in_combat { "started" } else { "ended" });
        }
        self.in_combat = in_combat;
    }

    pub fn event_triggers_blocked(&self) -> bool {
        self.event_triggers_blocked
    }

    pub fn unblock_event_triggers(&mut self) {
        self.event_triggers_blocked = false;
    }

    /// host volume × player volume
    pub fn target_volume(&self) -> f32 {
        (self.device.host_volume() * self.settings.player_volume).clamp(0.0, 1.0)
    }

    /// Whether something can be heard right now. Falls back to our own
    /// status when the device is not there to ask.
    pub fn is_audible(&self) -> bool {
        if self.device.is_available() {
            self.device.is_playing()
        } else {
            matches!(
                self.state.status,
                PlaybackStatus::Playing | PlaybackStatus::FadingIn | PlaybackStatus::FadingOut
            )
        }
    }

    /// The volume this engine claims for the channel this tick, if any
    pub fn owned_volume(&self) -> Option<f32> {
        match self.state.status {
            PlaybackStatus::FadingOut | PlaybackStatus::FadingIn => Some(self.state.fade_volume),
            PlaybackStatus::Playing | PlaybackStatus::Paused => Some(self.target_volume()),
            PlaybackStatus::Idle | PlaybackStatus::WaitingBetweenSongs => None,
        }
    }

    /// Writes our volume back over whatever the host put there
    pub fn reassert_volume(&mut self) {
        if let Some(volume) = self.owned_volume() {
            self.device_set_volume(volume);
        }
    }

    pub fn request_transition(&mut self, next: Arc<Track>, is_manual_skip: bool, start_progress: f32) {
        let audible = self.is_audible();
        let start_volume = self.owned_volume().unwrap_or_else(|| self.target_volume());
        let fade_duration = if is_manual_skip {
            self.settings.manual_fade
        } else {
            self.settings.natural_fade
        };

        // whatever was in flight is discarded, not drained
        self.state.clear_transition();
        self.state.paused_by_host = false;

        if !audible && !is_manual_skip && self.settings.silence_enabled() && !self.in_combat {
            self.device_stop();
            self.state.pending = Some(next);
            self.state.fade_duration = self.settings.natural_fade;
            self.enter_silence();
        } else if fade_duration > 0.0 && audible {
            let progress = start_progress.clamp(0.0, 1.0);
            debug!(
                "Fading out over {:.2}s from {:.2} (manual={}) -> {}",
                fade_duration, progress, is_manual_skip, next.display_name
            );
            self.state.status = PlaybackStatus::FadingOut;
            self.state.fade_duration = fade_duration;
            self.state.fade_progress = progress;
            self.state.volume_before_fade = start_volume;
            self.state.fade_volume = fade_out_volume(start_volume, progress);
            self.state.is_manual_skip = is_manual_skip;
            self.state.pending = Some(next);
            self.reassert_volume();
            self.emit(EngineEvent::FadeOutStarted {
                manual: is_manual_skip,
                duration: fade_duration,
            });
        } else {
            self.state.fade_duration = fade_duration;
            self.start_track(next);
            self.state.status = PlaybackStatus::Playing;
            self.reassert_volume();
        }
    }

    /// Per-frame update. Only fades and silence move; every other state just
    /// gets its volume reasserted.
    pub fn advance(&mut self, dt: Duration) {
        let dt = dt.as_secs_f32();

        match self.state.status {
            PlaybackStatus::FadingOut => {
                self.state.fade_progress =
                    step_progress(self.state.fade_progress, dt, self.state.fade_duration);
                self.state.fade_volume =
                    fade_out_volume(self.state.volume_before_fade, self.state.fade_progress);

                if self.state.fade_progress >= 1.0 {
                    self.state.fade_volume = 0.0;
                    if !self.in_combat && !self.state.is_manual_skip && self.settings.silence_enabled() {
                        self.device_set_volume(0.0);
                        self.device_stop();
                        self.enter_silence();
                    } else {
                        self.complete_fade_out();
                    }
                }
            }
            PlaybackStatus::WaitingBetweenSongs => {
                self.state.silence_elapsed += dt;
                if self.in_combat {
                    debug!("Combat cut the silence short");
                    self.complete_fade_out();
                } else if self.state.silence_elapsed >= self.state.silence_duration {
                    self.complete_fade_out();
                }
            }
            PlaybackStatus::FadingIn => {
                self.state.fade_progress =
                    step_progress(self.state.fade_progress, dt, self.state.fade_duration);
                let target = self.target_volume();
                self.state.fade_volume = fade_in_volume(target, self.state.fade_progress);

                if self.state.fade_progress >= 1.0 {
                    self.finish_fade_in();
                }
            }
            PlaybackStatus::Idle | PlaybackStatus::Playing | PlaybackStatus::Paused => {}
        }

        self.reassert_volume();
    }

    /// Near-end detection for the current track. `Some(start_progress)` means
    /// a natural transition should be requested now.
    pub fn natural_end_check(&self) -> Option<f32> {
        if self.state.status != PlaybackStatus::Playing || !self.device.is_available() {
            return None;
        }
        // finished, or never started
        if !self.device.is_playing() {
            return Some(0.0);
        }

        let (elapsed, total) = self.device.elapsed_and_total()?;
        let remaining = (total - elapsed).max(0.0);
        let fade = self.settings.natural_fade;
        if fade > 0.0 && remaining <= fade {
            Some(((fade - remaining) / fade).clamp(0.0, 1.0))
        } else {
            None
        }
    }

    /// Plays `track` right away at full volume, cancelling any transition.
    pub fn play(&mut self, track: Arc<Track>) {
        self.event_triggers_blocked = false;
        self.state.clear_transition();
        self.state.paused_by_host = false;
        self.start_track(track);
        self.state.status = PlaybackStatus::Playing;
        self.reassert_volume();
    }

    /// Playing <-> Paused. Returns false (and does nothing) from any other state.
    pub fn toggle_pause(&mut self) -> bool {
        match self.state.status {
            PlaybackStatus::Playing => {
                self.pause_now(false);
                true
            }
            PlaybackStatus::Paused => {
                self.resume_now();
                true
            }
            _ => false,
        }
    }

    /// Game paused: pause only if we are plainly playing
    pub fn host_pause(&mut self) {
        if self.state.status == PlaybackStatus::Playing {
            self.pause_now(true);
        }
    }

    /// Game resumed: only undo a pause the game caused
    pub fn host_resume(&mut self) {
        if self.state.status == PlaybackStatus::Paused && self.state.paused_by_host {
            self.resume_now();
        }
    }

    /// Silences immediately and goes idle. Calling it again changes nothing.
    pub fn stop(&mut self) {
        if self.settings.block_event_triggers {
            self.event_triggers_blocked = true;
        }

        let was_idle = self.state.status == PlaybackStatus::Idle && self.state.current.is_none();
        self.state.clear_transition();
        self.state.paused_by_host = false;
        self.state.fade_duration = 0.0;
        self.state.volume_before_fade = 0.0;

        if !was_idle {
            // hand the channel back at the plain volume
            let target = self.target_volume();
            self.device_set_volume(target);
            self.device_stop();
            info!("Playback stopped");
            self.emit(EngineEvent::Stopped);
        }

        self.state.status = PlaybackStatus::Idle;
        self.state.current = None;
    }

    /// The current track ran out and nothing replaces it
    pub fn finish(&mut self) {
        if self.state.status != PlaybackStatus::Playing {
            return;
        }
        debug!("Nothing to follow the current track, going idle");
        self.state.clear_transition();
        self.state.status = PlaybackStatus::Idle;
        self.state.current = None;
        self.emit(EngineEvent::Stopped);
    }

    pub fn seek(&mut self, position: f32) {
        if self.state.current.is_none() {
            return;
        }
        match self.state.status {
            PlaybackStatus::Playing
            | PlaybackStatus::Paused
            | PlaybackStatus::FadingIn
            | PlaybackStatus::FadingOut => self.device_seek(position.clamp(0.0, 1.0)),
            _ => {}
        }
    }

    pub fn restart_current(&mut self) {
        if let Some(current) = self.state.current.clone() {
            self.play(current);
        }
    }

    /// Swaps the queued track without touching the running fade or silence
    pub fn retarget_pending(&mut self, track: Arc<Track>) -> bool {
        if !self.state.status.holds_pending() {
            return false;
        }
        debug!("Pending track replaced by {}", track.display_name);
        self.state.pending = Some(track);
        true
    }

    /// Short label for UIs
    pub fn status_text(&self) -> &'static str {
        match self.state.status {
            PlaybackStatus::FadingOut => "Fading...",
            PlaybackStatus::FadingIn => "Fading in...",
            PlaybackStatus::WaitingBetweenSongs => "...",
            PlaybackStatus::Paused => "Paused",
            _ if self.in_combat => "⚔",
            _ => "",
        }
    }

    pub fn fade_progress(&self) -> f32 {
        self.state.fade_progress
    }

    pub fn silence_progress(&self) -> f32 {
        if self.state.status != PlaybackStatus::WaitingBetweenSongs || self.state.silence_duration <= 0.0 {
            return 0.0;
        }
        (self.state.silence_elapsed / self.state.silence_duration).clamp(0.0, 1.0)
    }

    /// Normalized position in the current track
    pub fn playback_progress(&self) -> f32 {
        match self.elapsed_and_total() {
            Some((elapsed, total)) if total > 0.0 => (elapsed / total).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// "m:ss / m:ss", or None when no track is loaded
    pub fn time_label(&self) -> Option<String> {
        let (elapsed, total) = self.elapsed_and_total()?;
        Some(format!("{} / {}", format_time(elapsed), format_time(total)))
    }

    fn elapsed_and_total(&self) -> Option<(f32, f32)> {
        if self.state.current.is_none() || !self.device.is_available() {
            return None;
        }
        self.device.elapsed_and_total()
    }

    fn enter_silence(&mut self) {
        let mut rng = rand::thread_rng();
        let duration = roll_silence(&mut rng, self.settings.min_silence, self.settings.max_silence);
        debug!("Silence for {:.1}s", duration);

        self.state.status = PlaybackStatus::WaitingBetweenSongs;
        self.state.fade_progress = 0.0;
        self.state.fade_volume = 0.0;
        self.state.silence_elapsed = 0.0;
        self.state.silence_duration = duration;
        self.emit(EngineEvent::SilenceStarted(duration));
    }

    // Play whatever is queued and fade it in. With nothing queued, go idle.
    fn complete_fade_out(&mut self) {
        let Some(next) = self.state.pending.take() else {
            warn!("Fade finished with no track queued");
            self.state.clear_transition();
            self.state.status = PlaybackStatus::Idle;
            self.state.current = None;
            return;
        };

        self.state.silence_elapsed = 0.0;
        self.state.silence_duration = 0.0;
        self.start_track(next);

        if self.state.fade_duration <= 0.0 {
            self.state.status = PlaybackStatus::Playing;
            self.state.is_manual_skip = false;
            self.state.fade_progress = 0.0;
        } else {
            self.state.status = PlaybackStatus::FadingIn;
            self.state.fade_progress = 0.0;
            self.state.fade_volume = 0.0;
        }
        self.reassert_volume();
    }

    fn finish_fade_in(&mut self) {
        self.state.fade_volume = self.target_volume();
        self.state.status = PlaybackStatus::Playing;
        self.state.is_manual_skip = false;
        self.state.fade_progress = 0.0;
        self.emit(EngineEvent::FadeInCompleted);
    }

    // A track that fails to start is kept as current so the next natural
    // check moves past it.
    fn start_track(&mut self, track: Arc<Track>) {
        if self.device.is_available() {
            match self.device.play(&track) {
                Ok(()) => info!("Now playing: {}", track.display_name),
                Err(e) => error!("Failed to play {}: {}", track.id, e),
            }
        } else {
            debug!("Device unavailable, {} queued as current", track.id);
        }
        self.state.current = Some(Arc::clone(&track));
        self.emit(EngineEvent::TrackStarted(track));
    }

    fn pause_now(&mut self, by_host: bool) {
        self.device_pause();
        self.state.status = PlaybackStatus::Paused;
        self.state.paused_by_host = by_host;
        self.emit(EngineEvent::Paused);
    }

    fn resume_now(&mut self) {
        self.device_resume();
        self.state.status = PlaybackStatus::Playing;
        self.state.paused_by_host = false;
        self.reassert_volume();
        self.emit(EngineEvent::Resumed);
    }

    fn emit(&self, event: EngineEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }

    fn device_stop(&mut self) {
        if self.device.is_available() {
            self.device.stop();
        }
    }

    fn device_pause(&mut self) {
        if self.device.is_available() {
            self.device.pause();
        }
    }

    fn device_resume(&mut self) {
        if self.device.is_available() {
            self.device.resume();
        }
    }

    fn device_set_volume(&mut self, volume: f32) {
        if self.device.is_available() {
            self.device.set_volume(volume);
        }
    }

    fn device_seek(&mut self, position: f32) {
        if self.device.is_available() {
            self.device.seek(position);
        }
    }
}

/// Seconds as `m:ss`
pub fn format_time(seconds: f32) -> String {
    let total = seconds.max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::device::DeviceCommand;
    use crate::audio::{Category, SimulatedDevice, TrackId};
    use std::path::PathBuf;

    fn track(name: &str, seconds: u64) -> Arc<Track> {
        Arc::new(
            Track::new(
                TrackId::new(format!("Music/{}", name)),
                PathBuf::from(format!("{}.ogg", name)),
                name.to_string(),
                "Unknown".to_string(),
                name.to_string(),
                Category::Multi,
            )
            .with_duration(Duration::from_secs(seconds)),
        )
    }

    fn engine() -> PlaybackEngine<SimulatedDevice> {
        PlaybackEngine::new(SimulatedDevice::new().with_command_log(), TransitionSettings::default())
    }

    fn secs(s: f32) -> Duration {
        Duration::from_secs_f32(s)
    }

    #[test]
    fn test_manual_skip_uses_quick_fade_and_no_silence() {
        let mut engine = engine();
        engine.play(track("A", 180));
        engine.device_mut().advance(secs(30.0));

        engine.request_transition(track("B", 180), true, 0.0);
        assert_eq!(engine.status(), PlaybackStatus::FadingOut);
        assert_eq!(engine.state().fade_duration, 0.4);
        assert!(engine.state().is_manual_skip);

        engine.advance(secs(0.5));
        assert_eq!(engine.status(), PlaybackStatus::FadingIn);
        assert_eq!(engine.current().map(|t| t.title.as_str()), Some("B"));
        assert!(engine.pending().is_none());

        engine.advance(secs(0.5));
        assert_eq!(engine.status(), PlaybackStatus::Playing);
        assert!(!engine.state().is_manual_skip);
        assert!((engine.device().volume() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_natural_fade_goes_through_silence() {
        let mut engine = engine();
        engine.play(track("A", 180));

        engine.request_transition(track("B", 180), false, 0.0);
        assert_eq!(engine.state().fade_duration, 2.0);

        engine.advance(secs(2.1));
        assert_eq!(engine.status(), PlaybackStatus::WaitingBetweenSongs);
        assert!(!engine.device().is_playing());
        let silence = engine.state().silence_duration;
        assert!((2.0..=25.0).contains(&silence));
        assert_eq!(engine.status_text(), "...");

        engine.advance(secs(26.0));
        assert_eq!(engine.status(), PlaybackStatus::FadingIn);
        assert_eq!(engine.device().loaded_track(), Some(&TrackId::new("Music/B")));
    }

    #[test]
    fn test_combat_cuts_silence_short() {
        let mut engine = engine();
        engine.request_transition(track("A", 180), false, 0.0);
        assert_eq!(engine.status(), PlaybackStatus::WaitingBetweenSongs);

        engine.state.silence_duration = 9.0;
        engine.advance(secs(1.0));
        assert_eq!(engine.status(), PlaybackStatus::WaitingBetweenSongs);

        engine.set_in_combat(true);
        engine.advance(secs(0.01));
        assert_eq!(engine.status(), PlaybackStatus::FadingIn);
        assert_eq!(engine.current().map(|t| t.title.as_str()), Some("A"));
    }

    #[test]
    fn test_nothing_audible_in_combat_plays_directly() {
        let mut engine = engine();
        engine.set_in_combat(true);
        engine.request_transition(track("War", 180), false, 0.0);
        assert_eq!(engine.status(), PlaybackStatus::Playing);
        assert_eq!(engine.device().commands(), &[
            DeviceCommand::Play(TrackId::new("Music/War")),
            DeviceCommand::SetVolume(1.0),
        ]);
    }

    #[test]
    fn test_fades_disabled_plays_immediately() {
        let mut engine = PlaybackEngine::new(
            SimulatedDevice::new().with_command_log(),
            TransitionSettings {
                manual_fade: 0.0,
                ..Default::default()
            },
        );
        engine.play(track("A", 180));
        engine.request_transition(track("B", 180), true, 0.0);
        assert_eq!(engine.status(), PlaybackStatus::Playing);
        assert_eq!(engine.current().map(|t| t.title.as_str()), Some("B"));
    }

    #[test]
    fn test_near_end_starts_fade_part_way() {
        let mut engine = PlaybackEngine::new(
            SimulatedDevice::new().with_command_log().with_host_volume(0.8),
            TransitionSettings::default(),
        );
        engine.play(track("A", 10));
        engine.device_mut().advance(secs(5.0));
        assert_eq!(engine.natural_end_check(), None);

        engine.device_mut().advance(secs(4.0));
        let start = engine.natural_end_check().unwrap();
        assert!((start - 0.5).abs() < 1e-3);

        engine.request_transition(track("B", 10), false, start);
        assert_eq!(engine.status(), PlaybackStatus::FadingOut);
        assert!((engine.state().fade_progress - start).abs() < 1e-6);
        // ease-out at the halfway mark leaves a quarter of the starting volume
        assert!((engine.state().fade_volume - 0.2).abs() < 1e-3);
    }

    #[test]
    fn test_track_that_ended_is_reported() {
        let mut engine = engine();
        engine.play(track("A", 3));
        engine.device_mut().advance(secs(5.0));
        assert_eq!(engine.natural_end_check(), Some(0.0));
    }

    #[test]
    fn test_pending_invariant_holds_across_operations() {
        let mut engine = PlaybackEngine::new(
            SimulatedDevice::new().with_command_log(),
            TransitionSettings {
                min_silence: 0.5,
                max_silence: 1.0,
                ..Default::default()
            },
        );
        let tracks = [track("A", 4), track("B", 6), track("C", 3)];

        for step in 0..2_000usize {
            let t = Arc::clone(&tracks[step % tracks.len()]);
            match step % 11 {
                0 => engine.play(t),
                1 | 6 => engine.request_transition(t, false, 0.3),
                2 => engine.request_transition(t, true, 0.0),
                3 => {
                    engine.toggle_pause();
                }
                4 => engine.set_in_combat(step % 4 == 0),
                5 if step % 7 == 0 => engine.stop(),
                8 => engine.seek(0.5),
                _ => {}
            }
            let dt = secs(0.05 * (step % 9) as f32);
            engine.device_mut().advance(dt);
            engine.advance(dt);
            if let Some(start) = engine.natural_end_check() {
                engine.request_transition(t_next(&tracks, step), false, start);
            }
            assert!(engine.state().is_consistent(), "inconsistent at step {}: {:?}", step, engine.state());
        }

        fn t_next(tracks: &[Arc<Track>], step: usize) -> Arc<Track> {
            Arc::clone(&tracks[(step + 1) % tracks.len()])
        }
    }

    #[test]
    fn test_huge_dt_never_overshoots() {
        let mut engine = engine();
        engine.play(track("A", 180));
        engine.request_transition(track("B", 180), true, 0.0);
        engine.advance(Duration::from_secs(100_000));
        assert!(engine.state().is_consistent());
        assert_eq!(engine.status(), PlaybackStatus::FadingIn);

        engine.advance(Duration::from_secs(100_000));
        assert_eq!(engine.status(), PlaybackStatus::Playing);
        assert!(engine.fade_progress() <= 1.0);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut engine = PlaybackEngine::new(
            SimulatedDevice::new().with_command_log(),
            TransitionSettings {
                block_event_triggers: true,
                ..Default::default()
            },
        );
        engine.play(track("A", 180));
        engine.request_transition(track("B", 180), false, 0.0);

        engine.stop();
        let once = engine.state().clone();
        let commands_after_first = engine.device().commands().len();
        engine.stop();

        assert_eq!(engine.status(), PlaybackStatus::Idle);
        assert!(engine.pending().is_none());
        assert!(engine.current().is_none());
        assert_eq!(once.status, engine.state().status);
        assert_eq!(commands_after_first, engine.device().commands().len());
        assert!(engine.event_triggers_blocked());

        engine.play(track("C", 180));
        assert!(!engine.event_triggers_blocked());
    }

    #[test]
    fn test_toggle_pause_only_between_playing_and_paused() {
        let mut engine = engine();
        assert!(!engine.toggle_pause());

        engine.play(track("A", 180));
        assert!(engine.toggle_pause());
        assert_eq!(engine.status(), PlaybackStatus::Paused);
        assert!(engine.toggle_pause());
        assert_eq!(engine.status(), PlaybackStatus::Playing);

        engine.request_transition(track("B", 180), true, 0.0);
        assert!(!engine.toggle_pause());
        assert_eq!(engine.status(), PlaybackStatus::FadingOut);
    }

    #[test]
    fn test_host_pause_only_resumes_its_own_pause() {
        let mut engine = engine();
        engine.play(track("A", 180));
        engine.toggle_pause();
        engine.host_resume();
        assert_eq!(engine.status(), PlaybackStatus::Paused);

        engine.toggle_pause();
        engine.host_pause();
        assert!(engine.state().paused_by_host);
        engine.host_resume();
        assert_eq!(engine.status(), PlaybackStatus::Playing);
    }

    #[test]
    fn test_volume_is_reasserted_over_host_writes() {
        let mut engine = PlaybackEngine::new(
            SimulatedDevice::new().with_command_log(),
            TransitionSettings {
                player_volume: 0.5,
                ..Default::default()
            },
        );
        engine.play(track("A", 180));
        engine.request_transition(track("B", 180), false, 0.0);
        engine.advance(secs(1.0));

        engine.device_mut().host_update();
        assert_eq!(engine.device().volume(), 1.0);

        engine.advance(secs(0.0));
        let expected = engine.state().fade_volume;
        assert!((engine.device().volume() - expected).abs() < 1e-6);
        assert!(expected < 0.5);

        // outside a fade the plain multiplier wins
        engine.stop();
        engine.play(track("C", 180));
        engine.device_mut().host_update();
        engine.advance(secs(0.016));
        assert!((engine.device().volume() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_unavailable_device_keeps_fade_math_running() {
        let mut engine = engine();
        engine.device_mut().set_available(false);

        engine.play(track("A", 180));
        assert_eq!(engine.status(), PlaybackStatus::Playing);
        assert!(engine.device().commands().is_empty());

        engine.request_transition(track("B", 180), true, 0.0);
        assert_eq!(engine.status(), PlaybackStatus::FadingOut);
        engine.advance(secs(0.2));
        assert!(engine.device().commands().is_empty());

        engine.device_mut().set_available(true);
        engine.advance(secs(0.0));
        let expected = engine.state().fade_volume;
        assert!((engine.device().volume() - expected).abs() < 1e-6);
        assert!((expected - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_failed_play_moves_on_at_next_check() {
        let mut engine = engine();
        engine.device_mut().set_fail_plays(true);
        engine.play(track("Broken", 180));
        assert_eq!(engine.status(), PlaybackStatus::Playing);
        assert_eq!(engine.natural_end_check(), Some(0.0));
    }

    #[test]
    fn test_events_are_emitted() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut engine = engine();
        engine.set_event_sender(tx);

        engine.play(track("A", 180));
        engine.toggle_pause();
        engine.stop();

        assert!(matches!(rx.try_recv(), Ok(EngineEvent::TrackStarted(t)) if t.title == "A"));
        assert!(matches!(rx.try_recv(), Ok(EngineEvent::Paused)));
        assert!(matches!(rx.try_recv(), Ok(EngineEvent::Stopped)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_time_formatting() {
        assert_eq!(format_time(0.0), "0:00");
        assert_eq!(format_time(65.9), "1:05");
        assert_eq!(format_time(-3.0), "0:00");

        let mut engine = engine();
        assert_eq!(engine.time_label(), None);
        engine.play(track("A", 200));
        engine.device_mut().advance(secs(61.0));
        assert_eq!(engine.time_label().as_deref(), Some("1:01 / 3:20"));
        assert!((engine.playback_progress() - 61.0 / 200.0).abs() < 1e-4);
    }
}
