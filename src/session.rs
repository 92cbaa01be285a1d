// One listening session: the engine plus everything that feeds it.
// Callers (driver loop, key handler) hold the session and go through it;
// there is no global instance.

use crate::audio::{AudioDevice, Catalog, CatalogProvider, Track, TrackFlags, TrackId};
use crate::config::{Config, PlaybackConfig};
use crate::context::{CombatShift, ContextOracle, ContextProvider, ContextSnapshot};
use crate::playback::{PlaybackEngine, PlaybackStatus};
use crate::selection::{is_eligible, Direction, PreferenceStore, SelectionPolicy, TrackPreferences};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Read-only view for UIs
#[derive(Debug, Clone)]
pub struct SessionStatus {
    pub track: Option<String>,
    pub status: PlaybackStatus,
    pub status_text: &'static str,
    pub time: Option<String>,
    pub progress: f32,
    pub fade_progress: f32,
    pub silence_progress: f32,
    pub in_combat: bool,
    pub catalog_version: u64,
    pub catalog_len: usize,
}

pub struct Session<D: AudioDevice, C: ContextProvider> {
    id: Uuid,
    config: Config,
    engine: PlaybackEngine<D>,
    context: C,
    oracle: ContextOracle,
    catalog: Catalog,
    provider: Box<dyn CatalogProvider>,
    prefs: TrackPreferences,
    store: Box<dyn PreferenceStore>,
    policy: SelectionPolicy,
    frames_waited: u32,
    has_auto_started: bool,
}

impl<D: AudioDevice, C: ContextProvider> Session<D, C> {
    pub fn new(
        config: Config,
        device: D,
        context: C,
        mut provider: Box<dyn CatalogProvider>,
        store: Box<dyn PreferenceStore>,
    ) -> Result<Self> {
        let prefs = match store.load_flags() {
            Ok(flags) => TrackPreferences::from_map(flags),
            Err(e) => {
                warn!("Could not load track flags, using category defaults: {}", e);
                TrackPreferences::new()
            }
        };
        provider.set_include_host_tracks(config.playback.include_host_tracks);

        let engine = PlaybackEngine::new(device, config.playback.transition_settings());
        let oracle = ContextOracle::new(config.context.poll_interval());

        let mut session = Self {
            id: Uuid::new_v4(),
            config,
            engine,
            context,
            oracle,
            catalog: Catalog::default(),
            provider,
            prefs,
            store,
            policy: SelectionPolicy::new(),
            frames_waited: 0,
            has_auto_started: false,
        };
        session.rebuild_catalog()?;
        info!("Session {} ready with {} tracks", session.id, session.catalog.len());
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn engine(&self) -> &PlaybackEngine<D> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut PlaybackEngine<D> {
        &mut self.engine
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn prefs(&self) -> &TrackPreferences {
        &self.prefs
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        self.oracle.current()
    }

    /// Per-frame entry point: fades, silence, natural track ends, auto-start
    pub fn frame_tick(&mut self, dt: Duration) {
        self.engine.advance(dt);

        if let Some(start_progress) = self.engine.natural_end_check() {
            match self.select(Direction::Next) {
                Some(next) => self.engine.request_transition(next, false, start_progress),
                None if !self.engine.is_audible() => self.engine.finish(),
                None => {}
            }
        }

        self.auto_start();
    }

    /// Low-frequency entry point: resample the environment and react to it
    pub fn context_tick(&mut self, dt: Duration) {
        if let Some(snapshot) = self.oracle.poll(&mut self.context, dt) {
            self.engine.set_in_combat(snapshot.in_combat);
            self.follow_game_pause(snapshot.game_paused);
        }
        self.handle_combat_shift();
    }

    pub fn skip(&mut self, direction: Direction) {
        self.has_auto_started = true;
        self.engine.unblock_event_triggers();

        // selection and UI should agree on the context right now
        let snapshot = self.oracle.refresh_now(&mut self.context);
        self.engine.set_in_combat(snapshot.in_combat);

        match self.select(direction) {
            Some(next) => {
                debug!("Skip {:?} -> {}", direction, next.display_name);
                self.engine.request_transition(next, true, 0.0);
            }
            None => info!("Nothing to skip to"),
        }
    }

    /// Plays a catalog track by identity. False if it is not in the catalog.
    pub fn play_track(&mut self, id: &TrackId) -> bool {
        let Some(track) = self.catalog.find(id).cloned() else {
            warn!("Track {} is not in the catalog", id);
            return false;
        };
        self.has_auto_started = true;
        self.engine.play(track);
        true
    }

    pub fn stop(&mut self) {
        self.has_auto_started = true;
        self.engine.stop();
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.engine.toggle_pause()
    }

    pub fn seek(&mut self, position: f32) {
        self.engine.seek(position);
    }

    pub fn restart_current(&mut self) {
        self.engine.restart_current();
    }

    pub fn search(&self, query: &str) -> Vec<Arc<Track>> {
        self.catalog.search(query)
    }

    pub fn flags(&self, track: &Track) -> TrackFlags {
        self.prefs.flags(track)
    }

    /// Edits a track's flags and persists them. A failed write is logged;
    /// the edit still applies for this session.
    pub fn set_flags(&mut self, id: &TrackId, flags: TrackFlags) {
        self.prefs.set(id.clone(), flags);
        if let Err(e) = self.store.save_flags(id, &flags) {
            warn!("Could not save flags for {}: {}", id, e);
        }
    }

    /// Player volume multiplier, 0..=1
    pub fn set_player_volume(&mut self, volume: f32) {
        let mut playback = self.config.playback.clone();
        playback.player_volume = volume;
        self.apply_playback_config(playback);
    }

    pub fn apply_playback_config(&mut self, mut playback: PlaybackConfig) {
        playback.normalize();

        if self.config.playback.pause_with_game && !playback.pause_with_game {
            self.engine.host_resume();
        }
        let host_tracks_changed = self.config.playback.include_host_tracks != playback.include_host_tracks;

        self.engine.set_settings(playback.transition_settings());
        self.config.playback = playback;

        if host_tracks_changed {
            self.set_include_host_tracks(self.config.playback.include_host_tracks);
        }
    }

    /// Rebuilds the catalog. If the current track was a host track that is
    /// now excluded, moves on to the next track.
    pub fn set_include_host_tracks(&mut self, include: bool) {
        self.config.playback.include_host_tracks = include;
        self.provider.set_include_host_tracks(include);
        if let Err(e) = self.rebuild_catalog() {
            warn!("Catalog rebuild failed, keeping the old one: {}", e);
            return;
        }

        let current_excluded = self
            .engine
            .current()
            .map(|track| track.is_host() && !include)
            .unwrap_or(false);
        if current_excluded {
            info!("Current track is no longer in the catalog, skipping");
            self.skip(Direction::Next);
        }
    }

    pub fn rebuild_catalog(&mut self) -> Result<()> {
        let tracks = self.provider.build_catalog()?;
        let version = self.catalog.version() + 1;
        self.catalog = Catalog::from_tracks(tracks, version);

        for id in self.prefs.ensure_defaults(&self.catalog) {
            if let Some(flags) = self.prefs.get(&id).copied() {
                if let Err(e) = self.store.save_flags(&id, &flags) {
                    warn!("Could not save default flags for {}: {}", id, e);
                }
            }
        }
        self.policy.invalidate_shuffle();

        info!("Catalog v{}: {} tracks", version, self.catalog.len());
        Ok(())
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            track: self.engine.current().map(|track| track.display_name.clone()),
            status: self.engine.status(),
            status_text: self.engine.status_text(),
            time: self.engine.time_label(),
            progress: self.engine.playback_progress(),
            fade_progress: self.engine.fade_progress(),
            silence_progress: self.engine.silence_progress(),
            in_combat: self.engine.in_combat(),
            catalog_version: self.catalog.version(),
            catalog_len: self.catalog.len(),
        }
    }

    fn select(&mut self, direction: Direction) -> Option<Arc<Track>> {
        let current = self.engine.current().cloned();
        let snapshot = self.oracle.current();
        self.policy.select_next(
            current.as_deref(),
            &self.catalog,
            &self.prefs,
            &snapshot,
            self.config.playback.play_mode(),
            direction,
            self.config.playback.context_aware,
        )
    }

    fn auto_start(&mut self) {
        if self.has_auto_started
            || self.engine.status() != PlaybackStatus::Idle
            || self.engine.current().is_some()
        {
            return;
        }

        self.frames_waited += 1;
        if self.frames_waited < self.config.playback.auto_start_frames {
            return;
        }

        if self.catalog.is_empty() {
            // try again after another wait
            self.frames_waited = 0;
            return;
        }

        info!("Auto-starting playback");
        self.skip(Direction::Next);
    }

    fn follow_game_pause(&mut self, game_paused: bool) {
        if !self.config.playback.pause_with_game {
            return;
        }
        if game_paused {
            self.engine.host_pause();
        } else {
            self.engine.host_resume();
        }
    }

    // Combat edges wait while a fade is running; everything else consumes them.
    // A user pause is left alone.
    fn handle_combat_shift(&mut self) {
        let Some(shift) = self.oracle.pending_shift() else {
            return;
        };

        if !self.config.playback.context_aware || self.engine.event_triggers_blocked() {
            self.oracle.acknowledge();
            return;
        }

        let status = self.engine.status();
        if status.is_fading() {
            return;
        }

        match status {
            PlaybackStatus::WaitingBetweenSongs => {
                if shift == CombatShift::Entered {
                    if let Some(track) = self.policy.select_for_combat_entry(&self.catalog, &self.prefs) {
                        self.engine.retarget_pending(track);
                    }
                }
                self.oracle.acknowledge();
            }
            // nothing audible when idle, so the transition starts the music directly
            PlaybackStatus::Playing | PlaybackStatus::Idle => {
                self.oracle.acknowledge();
                self.transition_for_shift(shift);
            }
            PlaybackStatus::Paused | PlaybackStatus::FadingOut | PlaybackStatus::FadingIn => {
                self.oracle.acknowledge()
            }
        }
    }

    fn transition_for_shift(&mut self, shift: CombatShift) {
        let snapshot = self.oracle.current();
        let current_fits = self.engine.current().map(|track| {
            let flags = self.prefs.flags(track);
            match shift {
                CombatShift::Entered => flags.allow_combat,
                CombatShift::Exited => is_eligible(&flags, &snapshot),
            }
        });
        if current_fits == Some(true) {
            debug!("Current track already fits after {:?}", shift);
            return;
        }

        let next = match shift {
            CombatShift::Entered => self.policy.select_for_combat_entry(&self.catalog, &self.prefs),
            CombatShift::Exited => {
                self.policy
                    .select_for_combat_exit(&self.catalog, &self.prefs, &snapshot, self.config.playback.context_aware)
            }
        };

        if let Some(next) = next {
            info!("{:?} combat, switching to {}", shift, next.display_name);
            self.engine.request_transition(next, false, 0.0);
        }
    }
}
