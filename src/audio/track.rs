use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Stable identity of a track: the clip path relative to its music root,
/// forward slashes, no extension. Survives catalog rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mutually exclusive classification, resolved by priority when a clip
/// could match several (combat beats day beats night beats winter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Combat,
    Day,
    Night,
    Winter,
    Multi,
}

impl Category {
    pub fn sort_order(&self) -> u8 {
        match self {
            Category::Combat => 0,
            Category::Day => 1,
            Category::Night => 2,
            Category::Winter => 3,
            Category::Multi => 5,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Combat => "Combat",
            Category::Day => "Day",
            Category::Night => "Night",
            Category::Winter => "Winter",
            Category::Multi => "Multi",
        }
    }

    /// Folder name → category, case-insensitive
    pub fn from_folder(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "combat" => Some(Category::Combat),
            "day" => Some(Category::Day),
            "night" => Some(Category::Night),
            "winter" => Some(Category::Winter),
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a track came from. Host tracks ship with the host and are opt-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackOrigin {
    User,
    Host,
}

/// Per-track eligibility tags. User-editable, persisted by track identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFlags {
    pub allow_day: bool,
    pub allow_night: bool,
    pub allow_winter: bool,
    pub allow_combat: bool,
    pub allow_anytime: bool,
}

impl Default for TrackFlags {
    fn default() -> Self {
        Self {
            allow_day: true,
            allow_night: true,
            allow_winter: false,
            allow_combat: false,
            allow_anytime: false,
        }
    }
}

impl TrackFlags {
    /// Defaults derived once from the category at catalog build time
    pub fn for_category(category: Category) -> Self {
        match category {
            Category::Multi => Self {
                allow_day: true,
                allow_night: true,
                allow_winter: true,
                allow_combat: false,
                allow_anytime: true,
            },
            Category::Combat => Self {
                allow_day: false,
                allow_night: false,
                allow_winter: false,
                allow_combat: true,
                allow_anytime: false,
            },
            Category::Day => Self {
                allow_day: true,
                allow_night: false,
                allow_winter: false,
                allow_combat: false,
                allow_anytime: false,
            },
            Category::Night => Self {
                allow_day: false,
                allow_night: true,
                allow_winter: false,
                allow_combat: false,
                allow_anytime: false,
            },
            Category::Winter => Self {
                allow_day: true,
                allow_night: true,
                allow_winter: true,
                allow_combat: false,
                allow_anytime: false,
            },
        }
    }

    /// Any flag that lets the track play outside combat
    pub fn has_peacetime_flag(&self) -> bool {
        self.allow_day || self.allow_night || self.allow_winter || self.allow_anytime
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub file_path: PathBuf,
    pub title: String,
    pub artist: String,
    pub display_name: String,
    pub category: Category,
    pub origin: TrackOrigin,
    pub duration: Option<Duration>,
    // lowercase "display title artist category", built once for filtering
    search_key: String,
}

impl Track {
    pub fn new(
        id: TrackId,
        file_path: PathBuf,
        title: String,
        artist: String,
        display_name: String,
        category: Category,
    ) -> Self {
        let search_key =
            format!("{} {} {} {}", display_name, title, artist, category.label()).to_lowercase();

        Self {
            id,
            file_path,
            title,
            artist,
            display_name,
            category,
            origin: TrackOrigin::User,
            duration: None,
            search_key,
        }
    }

    pub fn with_origin(mut self, origin: TrackOrigin) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn search_key(&self) -> &str {
        &self.search_key
    }

    pub fn default_flags(&self) -> TrackFlags {
        TrackFlags::for_category(self.category)
    }

    pub fn is_host(&self) -> bool {
        self.origin == TrackOrigin::Host
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_defaults() {
        let combat = TrackFlags::for_category(Category::Combat);
        assert!(combat.allow_combat);
        assert!(!combat.has_peacetime_flag());

        let multi = TrackFlags::for_category(Category::Multi);
        assert!(multi.allow_anytime);
        assert!(!multi.allow_combat);

        let winter = TrackFlags::for_category(Category::Winter);
        assert!(winter.allow_winter && winter.allow_day && winter.allow_night);
    }

    #[test]
    fn test_search_key_is_lowercase() {
        let track = Track::new(
            TrackId::new("Day/FamilyJules.BuryTheLight"),
            PathBuf::from("Day/FamilyJules.BuryTheLight.ogg"),
            "Bury The Light".to_string(),
            "FamilyJules".to_string(),
            "Bury The Light - FamilyJules".to_string(),
            Category::Day,
        );
        assert_eq!(
            track.search_key(),
            "bury the light - familyjules bury the light familyjules day"
        );
    }

    #[test]
    fn test_category_from_folder() {
        assert_eq!(Category::from_folder("COMBAT"), Some(Category::Combat));
        assert_eq!(Category::from_folder("ambient"), None);
        assert!(Category::Combat.sort_order() < Category::Multi.sort_order());
    }
}
