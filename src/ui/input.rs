/// Keyboard state tracker.
///
/// Keeps held keys for continuous walking and fresh presses for one-shot
/// actions (jump, pause, confirm). Release events are honored only when
/// the terminal's keyboard enhancement is confirmed; otherwise a key is
/// considered released after `HOLD_TIMEOUT` without a Press/Repeat.
/// Repeat events keep a key held but are never fresh presses. Terminals
/// without the enhancement report auto-repeat as Press.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::FrameInput;

const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub const LEFT_KEYS: [KeyCode; 3] = [KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
pub const RIGHT_KEYS: [KeyCode; 3] = [KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
pub const JUMP_KEYS: [KeyCode; 4] = [KeyCode::Char(' '), KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
pub const PAUSE_KEYS: [KeyCode; 2] = [KeyCode::Esc, KeyCode::Char('p')];
pub const CONFIRM_KEYS: [KeyCode; 1] = [KeyCode::Enter];
pub const RESTART_KEYS: [KeyCode; 2] = [KeyCode::Char('r'), KeyCode::Char('R')];
pub const MENU_KEYS: [KeyCode; 2] = [KeyCode::Char('m'), KeyCode::Char('M')];
pub const QUIT_KEYS: [KeyCode; 2] = [KeyCode::Char('q'), KeyCode::Char('Q')];

pub struct InputState {
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from "not held" to "held" in the last drain.
    fresh_presses: Vec<KeyCode>,
    pub raw_events: Vec<KeyEvent>,
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain pending terminal events. Call once per frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.record(key, Instant::now());
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn record(&mut self, key: KeyEvent, now: Instant) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            KeyEventKind::Repeat => {
                self.last_active.insert(key.code, now);
            }
            KeyEventKind::Press => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active.get(&code).map_or(false, |t| t.elapsed() < HOLD_TIMEOUT)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    pub fn any_fresh_press(&self) -> bool {
        !self.fresh_presses.is_empty()
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL) && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }

    /// Gameplay view of this frame's keys.
    pub fn frame_input(&self) -> FrameInput {
        FrameInput {
            left: self.any_held(&LEFT_KEYS),
            right: self.any_held(&RIGHT_KEYS),
            jump: self.any_pressed(&JUMP_KEYS),
            pause: self.any_pressed(&PAUSE_KEYS),
            confirm: self.any_pressed(&CONFIRM_KEYS),
            any_key: self.any_fresh_press(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn first_press_is_fresh_repeat_is_not() {
        let mut input = InputState::new();
        let now = Instant::now();
        input.record(press(KeyCode::Char(' ')), now);
        input.record(press(KeyCode::Right), now);
        let f = input.frame_input();
        assert!(f.jump && f.right && f.any_key);
        assert!(!f.left && !f.pause);

        input.fresh_presses.clear();
        input.record(press(KeyCode::Char(' ')), now);
        let f = input.frame_input();
        assert!(!f.jump);
        assert!(!f.any_key);
    }

    #[test]
    fn repeat_after_hold_lapses_is_not_fresh() {
        let mut input = InputState::new();
        let mut repeat = press(KeyCode::Right);
        repeat.kind = KeyEventKind::Repeat;

        let long_ago = Instant::now() - HOLD_TIMEOUT * 3;
        input.record(press(KeyCode::Right), long_ago);
        input.fresh_presses.clear();
        assert!(!input.is_held(KeyCode::Right));

        input.record(repeat, Instant::now());
        let f = input.frame_input();
        assert!(f.right);
        assert!(!f.any_key);
    }

    #[test]
    fn release_only_counts_when_honored() {
        let mut input = InputState::new();
        let now = Instant::now();
        input.record(press(KeyCode::Left), now);
        let mut release = press(KeyCode::Left);
        release.kind = KeyEventKind::Release;

        input.record(release, now);
        assert!(input.is_held(KeyCode::Left));

        input.honor_release = true;
        input.record(release, now);
        assert!(!input.is_held(KeyCode::Left));
    }
}
