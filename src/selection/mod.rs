// Track selection: which track plays next under the current context.

pub mod eligibility;
pub mod shuffle;
pub mod store;

pub use eligibility::{eligible_tracks, is_eligible};
pub use shuffle::ShuffleSequencer;
#[cfg(feature = "prefs")]
pub use store::SqlitePreferenceStore;
pub use store::{MemoryPreferenceStore, PreferenceStore};

use crate::audio::{Catalog, Track, TrackFlags, TrackId};
use crate::context::ContextSnapshot;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayMode {
    Shuffle,
    Sequential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// User-editable flags by track identity.
///
/// Reading never inserts; a track without an entry reads as its category
/// defaults. `flags_mut` and `ensure_defaults` are the only places an entry
/// gets created implicitly, and existing entries are never overwritten.
#[derive(Debug, Default, Clone)]
pub struct TrackPreferences {
    flags: HashMap<TrackId, TrackFlags>,
}

impl TrackPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(flags: HashMap<TrackId, TrackFlags>) -> Self {
        Self { flags }
    }

    pub fn flags(&self, track: &Track) -> TrackFlags {
        self.flags
            .get(&track.id)
            .copied()
            .unwrap_or_else(|| track.default_flags())
    }

    pub fn get(&self, id: &TrackId) -> Option<&TrackFlags> {
        self.flags.get(id)
    }

    pub fn flags_mut(&mut self, track: &Track) -> &mut TrackFlags {
        self.flags
            .entry(track.id.clone())
            .or_insert_with(|| track.default_flags())
    }

    pub fn set(&mut self, id: TrackId, flags: TrackFlags) {
        self.flags.insert(id, flags);
    }

    /// Creates default entries for tracks seen for the first time.
    /// Returns their ids so the caller can persist them.
    pub fn ensure_defaults(&mut self, catalog: &Catalog) -> Vec<TrackId> {
        let mut created = Vec::new();
        for track in catalog.tracks() {
            if !self.flags.contains_key(&track.id) {
                self.flags.insert(track.id.clone(), track.default_flags());
                created.push(track.id.clone());
            }
        }
        created
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Picks tracks for natural transitions, skips and combat edges
#[derive(Debug, Default)]
pub struct SelectionPolicy {
    shuffle: ShuffleSequencer,
    last_eligible: Vec<TrackId>,
}

impl SelectionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the shuffle order, e.g. after a catalog rebuild
    pub fn invalidate_shuffle(&mut self) {
        self.shuffle.invalidate();
        self.last_eligible.clear();
    }

    /// Tracks that may play now. With context awareness off that is everything.
    pub fn eligible(
        &self,
        catalog: &Catalog,
        prefs: &TrackPreferences,
        context: &ContextSnapshot,
        context_aware: bool,
    ) -> Vec<Arc<Track>> {
        if !context_aware {
            return catalog.tracks().to_vec();
        }
        eligible_tracks(catalog.tracks(), context, |track| prefs.flags(track))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn select_next(
        &mut self,
        current: Option<&Track>,
        catalog: &Catalog,
        prefs: &TrackPreferences,
        context: &ContextSnapshot,
        mode: PlayMode,
        direction: Direction,
        context_aware: bool,
    ) -> Option<Arc<Track>> {
        if catalog.is_empty() {
            debug!("Catalog is empty, nothing to select");
            return None;
        }

        let eligible = self.eligible(catalog, prefs, context, context_aware);

        match mode {
            PlayMode::Shuffle => {
                self.sync_shuffle(&eligible);
                self.shuffle.next(&eligible)
            }
            PlayMode::Sequential => {
                self.select_sequential(current, catalog, &eligible, context.in_combat && context_aware, direction)
            }
        }
    }

    /// Uniform pick among combat-tagged tracks. None (with a warning) if there are none.
    pub fn select_for_combat_entry(&self, catalog: &Catalog, prefs: &TrackPreferences) -> Option<Arc<Track>> {
        let candidates: Vec<&Arc<Track>> = catalog
            .tracks()
            .iter()
            .filter(|track| prefs.flags(track).allow_combat)
            .collect();

        let mut rng = rand::thread_rng();
        match candidates.choose(&mut rng) {
            Some(track) => Some(Arc::clone(track)),
            None => {
                warn!("Combat started but no tracks are tagged for combat");
                None
            }
        }
    }

    /// Uniform pick among peacetime-eligible tracks after combat ends
    pub fn select_for_combat_exit(
        &self,
        catalog: &Catalog,
        prefs: &TrackPreferences,
        context: &ContextSnapshot,
        context_aware: bool,
    ) -> Option<Arc<Track>> {
        let candidates: Vec<Arc<Track>> = self
            .eligible(catalog, prefs, context, context_aware)
            .into_iter()
            .filter(|track| {
                let flags = prefs.flags(track);
                !flags.allow_combat || flags.has_peacetime_flag()
            })
            .collect();

        let mut rng = rand::thread_rng();
        let picked = candidates.choose(&mut rng).cloned();
        if picked.is_none() {
            debug!("No peacetime track to return to after combat");
        }
        picked
    }

    // Reshuffle when the eligible set changed under the current order
    fn sync_shuffle(&mut self, eligible: &[Arc<Track>]) {
        let ids: Vec<TrackId> = eligible.iter().map(|track| track.id.clone()).collect();
        if ids != self.last_eligible {
            if !self.last_eligible.is_empty() {
                debug!("Eligible set changed ({} -> {} tracks)", self.last_eligible.len(), ids.len());
            }
            self.shuffle.invalidate();
            self.last_eligible = ids;
        }
    }

    fn select_sequential(
        &self,
        current: Option<&Track>,
        catalog: &Catalog,
        eligible: &[Arc<Track>],
        strict: bool,
        direction: Direction,
    ) -> Option<Arc<Track>> {
        let len = catalog.len();
        let step = |from: usize| match direction {
            Direction::Next => (from + 1) % len,
            Direction::Previous => (from + len - 1) % len,
        };

        let current_index = current.and_then(|track| catalog.index_of(&track.id));
        // with no current track, start just outside the list so the first step lands on an end
        let mut index = match (current_index, direction) {
            (Some(index), _) => index,
            (None, Direction::Next) => len - 1,
            (None, Direction::Previous) => 0,
        };

        let first_step = step(index);
        for _ in 0..len {
            index = step(index);
            if let Some(track) = catalog.get(index) {
                if eligible.iter().any(|candidate| candidate.id == track.id) {
                    return Some(Arc::clone(track));
                }
            }
        }

        if strict {
            debug!("No eligible track in a full lap during combat");
            return None;
        }
        catalog.get(first_step).cloned()
    }
}
