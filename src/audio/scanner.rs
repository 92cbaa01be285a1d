use super::metadata_parser::MetadataParser;
use super::track::{Track, TrackId, TrackOrigin};
use super::SUPPORTED_EXTENSIONS;
use crate::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Builds the ordered track list on load and on demand.
/// Identities must be stable across rebuilds so per-track flags survive.
pub trait CatalogProvider {
    fn build_catalog(&self) -> Result<Vec<Track>>;

    /// Host-shipped tracks are left out unless asked for
    fn set_include_host_tracks(&mut self, _include: bool) {}
}

pub struct MusicScanner {
    music_directories: Vec<PathBuf>,
    host_directories: Vec<PathBuf>,
    include_host_tracks: bool,
    parser: MetadataParser,
}

impl MusicScanner {
    pub fn new(music_directories: Vec<PathBuf>) -> Self {
        Self {
            music_directories,
            host_directories: Vec::new(),
            include_host_tracks: false,
            parser: MetadataParser::new(),
        }
    }

    pub fn with_host_directories(mut self, host_directories: Vec<PathBuf>) -> Self {
        self.host_directories = host_directories;
        self
    }

    pub fn scan_directory(&self, root: &Path, origin: TrackOrigin) -> Vec<Track> {
        let mut tracks = Vec::new();

        for entry in WalkDir::new(root).follow_links(true).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();

            if !entry.file_type().is_file() {
                continue;
            }

            // Skip hidden files (dotfiles)
            if path
                .file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with('.'))
            {
                continue;
            }

            // Skip empty files or files > 1GB
            if let Ok(metadata) = fs::metadata(path) {
                if metadata.len() == 0 || metadata.len() > 1_000_000_000 {
                    continue;
                }
            }

            if !is_supported_file(path) {
                continue;
            }

            match self.create_track(root, path, origin) {
                Some(track) => tracks.push(track),
                None => debug!("Skipping {}", path.display()),
            }
        }

        tracks
    }

    fn create_track(&self, root: &Path, path: &Path, origin: TrackOrigin) -> Option<Track> {
        let clip_path = clip_path_for(root, path)?;
        let parsed = self.parser.parse_clip_path(&format!("/{}", clip_path));

        if parsed.is_entry_song {
            return None;
        }

        let track = Track::new(
            TrackId::new(strip_extension(&clip_path)),
            path.to_path_buf(),
            parsed.title,
            parsed.artist,
            parsed.display_name,
            parsed.category,
        )
        .with_origin(origin);

        Some(track)
    }
}

impl CatalogProvider for MusicScanner {
    fn build_catalog(&self) -> Result<Vec<Track>> {
        let mut all_tracks = Vec::new();

        let mut roots: Vec<(&PathBuf, TrackOrigin)> = self
            .music_directories
            .iter()
            .map(|dir| (dir, TrackOrigin::User))
            .collect();
        if self.include_host_tracks {
            roots.extend(self.host_directories.iter().map(|dir| (dir, TrackOrigin::Host)));
        }

        for (root, origin) in roots {
            if !root.exists() {
                warn!("Music directory does not exist: {}", root.display());
                continue;
            }
            let mut tracks = self.scan_directory(root, origin);
            debug!("{}: {} tracks", root.display(), tracks.len());
            all_tracks.append(&mut tracks);
        }

        info!(
            "Scanned {} tracks (include_host_tracks={})",
            all_tracks.len(),
            self.include_host_tracks
        );
        Ok(all_tracks)
    }

    fn set_include_host_tracks(&mut self, include: bool) {
        self.include_host_tracks = include;
    }
}

fn is_supported_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

// "<root name>/<relative path>" with forward slashes
fn clip_path_for(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let root_name = root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("music");

    let mut clip_path = root_name.to_string();
    for component in relative.components() {
        clip_path.push('/');
        clip_path.push_str(component.as_os_str().to_str()?);
    }
    Some(clip_path)
}

fn strip_extension(clip_path: &str) -> &str {
    match clip_path.rfind('.') {
        Some(dot) if !clip_path[dot..].contains('/') => &clip_path[..dot],
        _ => clip_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::track::Category;
    use tempfile::TempDir;

    fn touch(dir: &Path, relative: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"not really audio").unwrap();
    }

    #[test]
    fn test_scan_builds_stable_ids_and_categories() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("Music");
        touch(&root, "Combat/FamilyJules.BuryTheLight.ogg");
        touch(&root, "Day/Artist.MorningSun.mp3");
        touch(&root, "notes.txt");
        touch(&root, ".hidden.ogg");

        let scanner = MusicScanner::new(vec![root.clone()]);
        let mut tracks = scanner.build_catalog().unwrap();
        tracks.sort_by(|a, b| a.id.cmp(&b.id));

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].id, TrackId::new("Music/Combat/FamilyJules.BuryTheLight"));
        assert_eq!(tracks[0].category, Category::Combat);
        assert_eq!(tracks[1].category, Category::Day);

        // a second scan yields the same identities
        let mut again = scanner.build_catalog().unwrap();
        again.sort_by(|a, b| a.id.cmp(&b.id));
        assert_eq!(again[0].id, tracks[0].id);
    }

    #[test]
    fn test_host_tracks_are_opt_in() {
        let tmp = TempDir::new().unwrap();
        let user = tmp.path().join("Music");
        let host = tmp.path().join("Songs");
        touch(&user, "A.One.ogg");
        touch(&host, "Host.Two.ogg");
        touch(&host, "EntrySong.ogg");

        let mut scanner = MusicScanner::new(vec![user]).with_host_directories(vec![host]);
        assert_eq!(scanner.build_catalog().unwrap().len(), 1);

        scanner.set_include_host_tracks(true);
        let tracks = scanner.build_catalog().unwrap();
        assert_eq!(tracks.len(), 2);
        assert!(tracks.iter().any(|t| t.is_host()));
    }
}
