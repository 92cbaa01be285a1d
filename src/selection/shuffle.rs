use crate::audio::{Track, TrackId};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Randomized, non-repeating walk over the eligible tracks.
///
/// Entries that stopped being eligible are skipped, not removed. Once nothing
/// left in the order is eligible the whole order is reshuffled from the
/// current eligible set. A track may repeat right across that boundary.
#[derive(Debug, Default, Clone)]
pub struct ShuffleSequencer {
    order: Vec<TrackId>,
    cursor: usize,
}

impl ShuffleSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self, eligible: &[Arc<Track>]) -> Option<Arc<Track>> {
        if eligible.is_empty() {
            return None;
        }

        let ids: HashSet<&TrackId> = eligible.iter().map(|track| &track.id).collect();
        let has_unconsumed = self.order[self.cursor..]
            .iter()
            .any(|id| ids.contains(id));

        if self.order.is_empty() || !has_unconsumed {
            self.regenerate(eligible);
        }

        while self.cursor < self.order.len() {
            let id = &self.order[self.cursor];
            self.cursor += 1;
            if let Some(track) = eligible.iter().find(|track| &track.id == id) {
                return Some(Arc::clone(track));
            }
        }

        None
    }

    /// Forget the current order; the next call reshuffles
    pub fn invalidate(&mut self) {
        self.order.clear();
        self.cursor = 0;
    }

    pub fn remaining(&self) -> usize {
        self.order.len() - self.cursor
    }

    fn regenerate(&mut self, eligible: &[Arc<Track>]) {
        let mut rng = rand::thread_rng();
        self.order = eligible.iter().map(|track| track.id.clone()).collect();
        self.order.shuffle(&mut rng);
        self.cursor = 0;
        debug!("Reshuffled {} tracks", self.order.len());
    }
}
