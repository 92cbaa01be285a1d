use crate::audio::{Track, TrackFlags};
use crate::context::ContextSnapshot;
use std::sync::Arc;
use tracing::warn;

/// Whether a track with `flags` may play under `context`.
/// Outside combat, combat-tagged tracks are held back; in combat, only they play.
pub fn is_eligible(flags: &TrackFlags, context: &ContextSnapshot) -> bool {
    if flags.allow_anytime {
        return true;
    }
    if context.in_combat {
        return flags.allow_combat;
    }
    if flags.allow_combat {
        return false;
    }

    (context.is_winter && flags.allow_winter)
        || (context.is_daytime && flags.allow_day)
        || (!context.is_daytime && flags.allow_night)
}

/// Eligible subset of `tracks`, in catalog order.
///
/// An empty result outside combat falls back to every track. In combat the
/// set stays empty so nothing untagged sneaks in.
pub fn eligible_tracks<F>(tracks: &[Arc<Track>], context: &ContextSnapshot, flags_of: F) -> Vec<Arc<Track>>
where
    F: Fn(&Track) -> TrackFlags,
{
    let eligible: Vec<Arc<Track>> = tracks
        .iter()
        .filter(|track| is_eligible(&flags_of(track), context))
        .cloned()
        .collect();

    if eligible.is_empty() && !tracks.is_empty() && !context.in_combat {
        warn!(
            "No tracks eligible for {:?}, falling back to all {} tracks",
            context,
            tracks.len()
        );
        return tracks.to_vec();
    }

    eligible
}
