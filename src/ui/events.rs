use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Quit,

    // Playback
    Play,
    Stop,
    NextTrack,
    PreviousTrack,
    TogglePlayPause,
    Restart,
    SeekForward,
    SeekBackward,

    // Volume
    VolumeUp,
    VolumeDown,

    // Settings
    ToggleShuffle,
    ToggleContextAware,
    ToggleHostTracks,

    // Simulated environment
    ToggleCombat,
    ToggleGamePause,
    ToggleWinter,

    RefreshLibrary,
}

/// Non-blocking read of one key press
pub fn poll_event(timeout: Duration) -> Result<Option<ControlEvent>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(key_to_control_event(key)),
        _ => Ok(None),
    }
}

pub fn key_to_control_event(key: KeyEvent) -> Option<ControlEvent> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(ControlEvent::Quit);
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => Some(ControlEvent::Quit),

        KeyCode::Char(' ') => Some(ControlEvent::TogglePlayPause),
        KeyCode::Char('p') => Some(ControlEvent::Play),
        KeyCode::Char('s') => Some(ControlEvent::Stop),
        KeyCode::Char('n') | KeyCode::Right => Some(ControlEvent::NextTrack),
        KeyCode::Char('b') | KeyCode::Left => Some(ControlEvent::PreviousTrack),
        KeyCode::Char('r') => Some(ControlEvent::Restart),
        KeyCode::Char('.') => Some(ControlEvent::SeekForward),
        KeyCode::Char(',') => Some(ControlEvent::SeekBackward),

        KeyCode::Char('+') | KeyCode::Char('=') => Some(ControlEvent::VolumeUp),
        KeyCode::Char('-') => Some(ControlEvent::VolumeDown),

        KeyCode::Char('z') => Some(ControlEvent::ToggleShuffle),
        KeyCode::Char('a') => Some(ControlEvent::ToggleContextAware),
        KeyCode::Char('h') => Some(ControlEvent::ToggleHostTracks),

        KeyCode::Char('c') => Some(ControlEvent::ToggleCombat),
        KeyCode::Char('g') => Some(ControlEvent::ToggleGamePause),
        KeyCode::Char('w') => Some(ControlEvent::ToggleWinter),

        KeyCode::F(5) => Some(ControlEvent::RefreshLibrary),

        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_mapping() {
        assert_eq!(key_to_control_event(press(KeyCode::Char(' '))), Some(ControlEvent::TogglePlayPause));
        assert_eq!(key_to_control_event(press(KeyCode::Right)), Some(ControlEvent::NextTrack));
        assert_eq!(key_to_control_event(press(KeyCode::Char('c'))), Some(ControlEvent::ToggleCombat));
        assert_eq!(key_to_control_event(press(KeyCode::Char('x'))), None);
    }

    #[test]
    fn test_ctrl_c_quits() {
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_control_event(key), Some(ControlEvent::Quit));
    }
}
