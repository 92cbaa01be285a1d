// "Now playing" announcements

use crate::audio::Track;
use tracing::info;

pub struct Announcer {
    enabled: bool,
    desktop: bool,
    #[cfg_attr(not(feature = "notify"), allow(dead_code))]
    duration_ms: u64,
}

impl Announcer {
    pub fn new(enabled: bool, desktop: bool, duration_ms: u64) -> Self {
        Self {
            enabled,
            desktop,
            duration_ms,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Logs the track and, when built with `notify`, pops a desktop notification
    pub fn now_playing(&self, track: &Track) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let text = now_playing_text(track);
        info!("♪ {}", text);
        if self.desktop {
            self.show_desktop(&text);
        }
        Some(text)
    }

    #[cfg(feature = "notify")]
    fn show_desktop(&self, text: &str) {
        let result = notify_rust::Notification::new()
            .summary("Now playing")
            .body(text)
            .timeout(notify_rust::Timeout::Milliseconds(self.duration_ms as u32))
            .show();
        if let Err(e) = result {
            tracing::warn!("Desktop notification failed: {}", e);
        }
    }

    #[cfg(not(feature = "notify"))]
    fn show_desktop(&self, _text: &str) {}
}

pub fn now_playing_text(track: &Track) -> String {
    format!("{} ({})", track.display_name, track.category)
}
