use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use gridseq::shared::InputEvent;

use super::mode::{TuiState, VolumeTarget};

const BPM_STEP: f64 = 1.0;
const VOLUME_STEP: f32 = 0.05;

// poll for a keypress and resolve it into input events for the middle layer.
// keys that only change tui-local state resolve to nothing
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code, ts));
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode, ts: &mut TuiState) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc => vec![InputEvent::Quit],

        KeyCode::Left => vec![InputEvent::MoveCursor { dx: -1, dy: 0 }],
        KeyCode::Right => vec![InputEvent::MoveCursor { dx: 1, dy: 0 }],
        KeyCode::Up => vec![InputEvent::MoveCursor { dx: 0, dy: -1 }],
        KeyCode::Down => vec![InputEvent::MoveCursor { dx: 0, dy: 1 }],

        KeyCode::Enter => vec![InputEvent::ToggleCell],
        KeyCode::Char('c') => vec![InputEvent::ToggleCombinedCell],

        KeyCode::Char(' ') => vec![InputEvent::PlayStop],
        KeyCode::Char('p') => vec![InputEvent::Pause],
        KeyCode::Char('l') => vec![InputEvent::ToggleLoop],

        // lowercase = down, shifted = up
        KeyCode::Char('b') => vec![InputEvent::AdjustBpm(-BPM_STEP)],
        KeyCode::Char('B') => vec![InputEvent::AdjustBpm(BPM_STEP)],
        KeyCode::Char('[') => vec![InputEvent::AdjustNumerator(-1)],
        KeyCode::Char(']') => vec![InputEvent::AdjustNumerator(1)],
        KeyCode::Char('s') => vec![InputEvent::CycleSubdivision],

        KeyCode::Char('m') => vec![InputEvent::ToggleMute],
        KeyCode::Char('v') => {
            ts.toggle_volume_target();
            vec![]
        }
        KeyCode::Char('-') => resolve_volume(-VOLUME_STEP, ts),
        KeyCode::Char('=') => resolve_volume(VOLUME_STEP, ts),

        KeyCode::Char('?') => {
            ts.show_help = !ts.show_help;
            vec![]
        }

        _ => vec![],
    }
}

fn resolve_volume(delta: f32, ts: &TuiState) -> Vec<InputEvent> {
    match ts.volume_target {
        VolumeTarget::Track => vec![InputEvent::AdjustTrackVolume(delta)],
        VolumeTarget::Master => vec![InputEvent::AdjustMasterVolume(delta)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_keys_follow_the_target_toggle() {
        let mut ts = TuiState::default();
        assert_eq!(handle_key(KeyCode::Char('='), &mut ts), vec![InputEvent::AdjustTrackVolume(VOLUME_STEP)]);
        assert!(handle_key(KeyCode::Char('v'), &mut ts).is_empty());
        assert_eq!(handle_key(KeyCode::Char('-'), &mut ts), vec![InputEvent::AdjustMasterVolume(-VOLUME_STEP)]);
    }

    #[test]
    fn transport_keys() {
        let mut ts = TuiState::default();
        assert_eq!(handle_key(KeyCode::Char(' '), &mut ts), vec![InputEvent::PlayStop]);
        assert_eq!(handle_key(KeyCode::Char('p'), &mut ts), vec![InputEvent::Pause]);
        assert_eq!(handle_key(KeyCode::Esc, &mut ts), vec![InputEvent::Quit]);
    }
}
