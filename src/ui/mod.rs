// Terminal glue for the driver binary: raw key input and a one-line status display

pub mod events;

pub use events::{key_to_control_event, poll_event, ControlEvent};

use crate::session::SessionStatus;
use anyhow::Result;
use crossterm::{
    cursor, execute,
    style::Print,
    terminal::{self, disable_raw_mode, enable_raw_mode, ClearType},
};
use std::io::{self, Write};

/// Raw mode for as long as this lives
pub struct TerminalGuard {
    _cleanup_guard: CleanupGuard,
}

struct CleanupGuard;

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, Print("\r\n"), cursor::Show);
    }
}

impl TerminalGuard {
    pub fn new() -> Result<Self> {
        // start from a clean state
        let _ = disable_raw_mode();

        enable_raw_mode()?;
        execute!(io::stdout(), cursor::Hide)?;

        Ok(Self {
            _cleanup_guard: CleanupGuard,
        })
    }

    /// Overwrites the current line with `line`
    pub fn draw_line(&mut self, line: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print(line)
        )?;
        stdout.flush()?;
        Ok(())
    }
}

pub fn status_line(status: &SessionStatus, volume: f32) -> String {
    let track = status.track.as_deref().unwrap_or("(nothing playing)");
    let time = status.time.as_deref().unwrap_or("-:-- / -:--");
    let mut line = format!("{} [{}] {} vol {:.0}%", track, status.status, time, volume * 100.0);

    if !status.status_text.is_empty() {
        line.push(' ');
        line.push_str(status.status_text);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::PlaybackStatus;

    #[test]
    fn test_status_line() {
        let status = SessionStatus {
            track: Some("Bury The Light - FamilyJules".to_string()),
            status: PlaybackStatus::FadingOut,
            status_text: "Fading...",
            time: Some("1:05 / 3:20".to_string()),
            progress: 0.3,
            fade_progress: 0.5,
            silence_progress: 0.0,
            in_combat: false,
            catalog_version: 1,
            catalog_len: 3,
        };
        assert_eq!(
            status_line(&status, 0.8),
            "Bury The Light - FamilyJules [Fading out] 1:05 / 3:20 vol 80% Fading..."
        );
    }
}
