use super::track::{Track, TrackId};
use fuzzy_matcher::{clangd::ClangdMatcher, FuzzyMatcher};
use std::sync::Arc;

/// Ordered track list, immutable once built. A rebuild replaces the whole
/// catalog and bumps the version; tracks are shared so the engine can keep
/// holding the current one across rebuilds.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tracks: Vec<Arc<Track>>,
    version: u64,
}

impl Catalog {
    /// Sorts by category order, then display name
    pub fn from_tracks(mut tracks: Vec<Track>, version: u64) -> Self {
        tracks.sort_by(|a, b| {
            a.category
                .sort_order()
                .cmp(&b.category.sort_order())
                .then_with(|| a.display_name.cmp(&b.display_name))
        });

        Self {
            tracks: tracks.into_iter().map(Arc::new).collect(),
            version,
        }
    }

    pub fn tracks(&self) -> &[Arc<Track>] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, index: usize) -> Option<&Arc<Track>> {
        self.tracks.get(index)
    }

    pub fn index_of(&self, id: &TrackId) -> Option<usize> {
        self.tracks.iter().position(|track| &track.id == id)
    }

    pub fn find(&self, id: &TrackId) -> Option<&Arc<Track>> {
        self.tracks.iter().find(|track| &track.id == id)
    }

    /// Fuzzy search over the precomputed search keys, best match first
    pub fn search(&self, query: &str) -> Vec<Arc<Track>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.tracks.clone();
        }

        let matcher = ClangdMatcher::default();
        let mut scored: Vec<(i64, &Arc<Track>)> = self
            .tracks
            .iter()
            .filter_map(|track| {
                matcher
                    .fuzzy_match(track.search_key(), &query)
                    .map(|score| (score, track))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, track)| Arc::clone(track)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::track::Category;
    use std::path::PathBuf;

    fn track(id: &str, name: &str, category: Category) -> Track {
        Track::new(
            TrackId::new(id),
            PathBuf::from(id),
            name.to_string(),
            "Unknown".to_string(),
            name.to_string(),
            category,
        )
    }

    #[test]
    fn test_ordering_by_category_then_name() {
        let catalog = Catalog::from_tracks(
            vec![
                track("m", "Anything", Category::Multi),
                track("d2", "Zebra", Category::Day),
                track("c", "March", Category::Combat),
                track("d1", "Apple", Category::Day),
            ],
            1,
        );

        let names: Vec<_> = catalog.tracks().iter().map(|t| t.display_name.as_str()).collect();
        assert_eq!(names, vec!["March", "Apple", "Zebra", "Anything"]);
        assert_eq!(catalog.index_of(&TrackId::new("d2")), Some(2));
    }

    #[test]
    fn test_search_ranks_matches() {
        let catalog = Catalog::from_tracks(
            vec![
                track("a", "Bury The Light", Category::Combat),
                track("b", "Quiet River", Category::Night),
            ],
            1,
        );

        let hits = catalog.search("river");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, TrackId::new("b"));
        assert_eq!(catalog.search("  ").len(), 2);
    }
}
