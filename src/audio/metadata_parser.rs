use super::track::Category;
use super::SUPPORTED_EXTENSIONS;
use regex::Regex;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMetadata {
    pub title: String,
    pub artist: String,
    pub display_name: String,
    pub category: Category,
    pub is_entry_song: bool,
}

/// Turns a clip path such as `Music/Combat/FamilyJules.BuryTheLight.ogg`
/// into artist, title and category. Pure: same path, same answer.
pub struct MetadataParser {
    // ordered by category priority, first hit wins
    category_patterns: Vec<(Category, Regex)>,
    artist_overrides: HashMap<String, String>, // lowercase key -> canonical spelling
}

impl MetadataParser {
    pub fn new() -> Self {
        let mut category_patterns = Vec::new();
        for category in [Category::Combat, Category::Day, Category::Night, Category::Winter] {
            let pattern = format!(r"[/\\]{}", category.label().to_lowercase());
            if let Ok(regex) = Regex::new(&pattern) {
                category_patterns.push((category, regex));
            }
        }

        let mut artist_overrides = HashMap::new();
        // names that must not be split on case changes
        for name in ["FamilyJules", "GuitarSVD"] {
            artist_overrides.insert(name.to_lowercase(), name.to_string());
        }

        Self {
            category_patterns,
            artist_overrides,
        }
    }

    pub fn parse_clip_path(&self, clip_path: &str) -> ParsedMetadata {
        let normalized = clip_path.replace('\\', "/");
        let filename = normalized.rsplit('/').next().unwrap_or(&normalized);
        let stem = strip_audio_extension(filename);
        let category = self.detect_category(&normalized);

        if stem.is_empty() {
            return ParsedMetadata {
                title: "Unknown".to_string(),
                artist: "Unknown".to_string(),
                display_name: "Unknown Track".to_string(),
                category,
                is_entry_song: false,
            };
        }

        let is_entry_song = stem == "EntrySong";

        // "Artist.Title": the first dot splits, both sides non-empty
        if let Some((raw_artist, raw_title)) = stem
            .split_once('.')
            .filter(|(artist, title)| !artist.is_empty() && !title.is_empty())
        {
            let artist = match self.artist_overrides.get(&raw_artist.to_lowercase()) {
                Some(canonical) => canonical.clone(),
                None => split_pascal_case(&squash(raw_artist)),
            };
            let title = split_pascal_case(&squash(raw_title));
            let display_name = format!("{} - {}", title, artist);

            return ParsedMetadata {
                title,
                artist,
                display_name,
                category,
                is_entry_song,
            };
        }

        // No dot: the whole stem is the title
        let mut title = stem.replace('_', " ");
        if !title.contains(' ') {
            title = split_pascal_case(&title);
        }

        ParsedMetadata {
            display_name: title.clone(),
            title,
            artist: "Unknown".to_string(),
            category,
            is_entry_song,
        }
    }

    /// Folder-path category; anything without a category folder is Multi
    pub fn detect_category(&self, clip_path: &str) -> Category {
        let lowered = clip_path.to_lowercase();
        self.category_patterns
            .iter()
            .find(|(_, regex)| regex.is_match(&lowered))
            .map(|(category, _)| *category)
            .unwrap_or(Category::Multi)
    }
}

impl Default for MetadataParser {
    fn default() -> Self {
        Self::new()
    }
}

fn strip_audio_extension(filename: &str) -> &str {
    if let Some(dot_pos) = filename.rfind('.') {
        let ext = &filename[dot_pos + 1..];
        if SUPPORTED_EXTENSIONS
            .iter()
            .any(|supported| ext.eq_ignore_ascii_case(supported))
        {
            return &filename[..dot_pos];
        }
    }
    filename
}

// "Bury_The Light" -> "BuryTheLight", ready for case splitting
fn squash(raw: &str) -> String {
    raw.replace('_', " ").replace(' ', "")
}

/// "BuryTheLight" -> "Bury The Light", "XMLParser" -> "XML Parser",
/// "FF7BattleTheme" -> "FF7 Battle Theme"
pub fn split_pascal_case(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut result = String::with_capacity(input.len() + 8);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_uppercase() {
            let prev_is_lower = chars[i - 1].is_lowercase();
            let next_is_lower = chars.get(i + 1).map_or(false, |n| n.is_lowercase());

            if prev_is_lower || next_is_lower {
                result.push(' ');
            }
        }

        if i > 0
            && chars[i - 1].is_ascii_digit()
            && c.is_uppercase()
            && !result.ends_with(' ')
        {
            result.push(' ');
        }

        result.push(c);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artist_title_parsing() {
        let parser = MetadataParser::new();

        let result = parser.parse_clip_path("Music/Combat/FamilyJules.BuryTheLight.ogg");
        assert_eq!(result.title, "Bury The Light");
        assert_eq!(result.artist, "FamilyJules");
        assert_eq!(result.display_name, "Bury The Light - FamilyJules");
        assert_eq!(result.category, Category::Combat);

        let result = parser.parse_clip_path("Music\\Day\\BeyondTheGuitar.Snow_Halation.mp3");
        assert_eq!(result.artist, "Beyond The Guitar");
        assert_eq!(result.title, "Snow Halation");
        assert_eq!(result.category, Category::Day);
    }

    #[test]
    fn test_no_dot_falls_back_to_title() {
        let parser = MetadataParser::new();

        let result = parser.parse_clip_path("Music/Night/QuietRiverbank.wav");
        assert_eq!(result.title, "Quiet Riverbank");
        assert_eq!(result.artist, "Unknown");
        assert_eq!(result.display_name, "Quiet Riverbank");

        let result = parser.parse_clip_path("Music/some_old tune.ogg");
        assert_eq!(result.title, "some old tune");
        assert_eq!(result.category, Category::Multi);
    }

    #[test]
    fn test_pascal_case_splitting() {
        assert_eq!(split_pascal_case("BuryTheLight"), "Bury The Light");
        assert_eq!(split_pascal_case("XMLParser"), "XML Parser");
        assert_eq!(split_pascal_case("FF7BattleTheme"), "FF7 Battle Theme");
        assert_eq!(split_pascal_case(""), "");
    }

    #[test]
    fn test_category_priority() {
        let parser = MetadataParser::new();
        // combat wins even when a later segment says night
        assert_eq!(
            parser.detect_category("Music/Combat/Night/Artist.Song.ogg"),
            Category::Combat
        );
        assert_eq!(parser.detect_category("Music/Winter/A.B.ogg"), Category::Winter);
    }

    #[test]
    fn test_entry_song_flagged() {
        let parser = MetadataParser::new();
        assert!(parser.parse_clip_path("Songs/EntrySong.ogg").is_entry_song);
        assert!(!parser.parse_clip_path("Songs/Other.ogg").is_entry_song);
    }
}
