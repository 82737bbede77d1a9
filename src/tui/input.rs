use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};

use crate::shared::InputEvent;

use super::mode::TuiState;

// Canonical bindings:
//   1-9           jump to marker        Ctrl+1-9      set marker
//   0             jump to start/loop-in
//   Space         toggle play
//   i / o         set loop in / out     l             toggle loop
//   Ctrl+Shift+L  reset loop
// App affordances:
//   Up/Down       select track          [ / ]         track volume
//   Left/Right    nudge seek
//   n / p         select song           Enter         load selected song
//   d             cycle output device   r             refresh hardware state
//   Esc           quit

/// Poll for key input, resolving combos against tui-local selection state.
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code, key.modifiers, ts));
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode, mods: KeyModifiers, ts: &mut TuiState) -> Vec<InputEvent> {
    let ctrl = mods.contains(KeyModifiers::CONTROL);
    match code {
        KeyCode::Esc => vec![InputEvent::Quit],
        KeyCode::Char(' ') => vec![InputEvent::TogglePlay],

        KeyCode::Char(c @ '1'..='9') => {
            let slot = c as u8 - b'0';
            if ctrl {
                vec![InputEvent::SetMarker(slot)]
            } else {
                vec![InputEvent::JumpToMarker(slot)]
            }
        }
        KeyCode::Char('0') => vec![InputEvent::JumpToStart],

        KeyCode::Char('i' | 'I') => vec![InputEvent::SetLoopIn],
        KeyCode::Char('o' | 'O') => vec![InputEvent::SetLoopOut],
        KeyCode::Char('L') if ctrl => vec![InputEvent::ResetLoop],
        KeyCode::Char('l' | 'L') => vec![InputEvent::ToggleLoop],

        KeyCode::Left => vec![InputEvent::SeekBy(-0.01)],
        KeyCode::Right => vec![InputEvent::SeekBy(0.01)],

        KeyCode::Up => {
            ts.track_up();
            vec![]
        }
        KeyCode::Down => {
            ts.track_down();
            vec![]
        }
        KeyCode::Char('[') => vec![InputEvent::AdjustVolume(ts.selected_track, -0.05)],
        KeyCode::Char(']') => vec![InputEvent::AdjustVolume(ts.selected_track, 0.05)],

        KeyCode::Char('p') => {
            ts.song_prev();
            vec![]
        }
        KeyCode::Char('n') => {
            ts.song_next();
            vec![]
        }
        KeyCode::Enter => {
            if ts.num_songs > 0 {
                vec![InputEvent::LoadSong(ts.selected_song)]
            } else {
                vec![]
            }
        }

        KeyCode::Char('d') => vec![InputEvent::CycleDevice],
        KeyCode::Char('r') => vec![InputEvent::RefreshHardware],

        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> TuiState {
        let mut ts = TuiState::default();
        ts.sync(4, 3);
        ts
    }

    #[test]
    fn digits_jump_and_ctrl_digits_set() {
        let mut s = ts();
        assert_eq!(
            handle_key(KeyCode::Char('7'), KeyModifiers::NONE, &mut s),
            vec![InputEvent::JumpToMarker(7)]
        );
        assert_eq!(
            handle_key(KeyCode::Char('7'), KeyModifiers::CONTROL, &mut s),
            vec![InputEvent::SetMarker(7)]
        );
        assert_eq!(
            handle_key(KeyCode::Char('0'), KeyModifiers::NONE, &mut s),
            vec![InputEvent::JumpToStart]
        );
    }

    #[test]
    fn loop_keys_resolve_by_modifier() {
        let mut s = ts();
        assert_eq!(
            handle_key(KeyCode::Char('l'), KeyModifiers::NONE, &mut s),
            vec![InputEvent::ToggleLoop]
        );
        assert_eq!(
            handle_key(
                KeyCode::Char('L'),
                KeyModifiers::CONTROL | KeyModifiers::SHIFT,
                &mut s
            ),
            vec![InputEvent::ResetLoop]
        );
        assert_eq!(
            handle_key(KeyCode::Char('i'), KeyModifiers::NONE, &mut s),
            vec![InputEvent::SetLoopIn]
        );
        assert_eq!(
            handle_key(KeyCode::Char('o'), KeyModifiers::NONE, &mut s),
            vec![InputEvent::SetLoopOut]
        );
    }

    #[test]
    fn volume_keys_target_the_selected_track() {
        let mut s = ts();
        handle_key(KeyCode::Down, KeyModifiers::NONE, &mut s);
        handle_key(KeyCode::Down, KeyModifiers::NONE, &mut s);
        assert_eq!(
            handle_key(KeyCode::Char(']'), KeyModifiers::NONE, &mut s),
            vec![InputEvent::AdjustVolume(2, 0.05)]
        );
    }

    #[test]
    fn selection_stays_in_bounds() {
        let mut s = ts();
        for _ in 0..10 {
            handle_key(KeyCode::Down, KeyModifiers::NONE, &mut s);
            handle_key(KeyCode::Char('n'), KeyModifiers::NONE, &mut s);
        }
        assert_eq!(s.selected_track, 3);
        assert_eq!(s.selected_song, 2);
        s.sync(1, 1); // song with fewer tracks loaded
        assert_eq!(s.selected_track, 0);
        assert_eq!(s.selected_song, 0);
    }
}
