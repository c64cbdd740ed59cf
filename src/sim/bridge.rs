/// Presentation bridge: the outbound seam between the level controller and
/// everything it does not own (FX, audio, panels, scene loading).
///
/// Every call is best-effort. Calls that can hit an unconfigured asset
/// return `ControlResult`; the controller logs the error and carries on.

use crate::domain::entity::Vec2;
use crate::error::ControlResult;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PanelId {
    /// Level intro riddle.
    Intro,
    /// Transient hint line (door shut, etc).
    Message,
    Death,
    Pause,
    GameComplete,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EffectKind {
    Death,
    Collect,
    Poison,
    Collapse,
    Exit,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum SoundClip {
    Death,
    Collect,
    Poison,
    Collapse,
    DoorOpen,
}

pub trait Presentation {
    fn play_effect(&mut self, kind: EffectKind, pos: Vec2) -> ControlResult<()>;
    fn play_sound(&mut self, clip: SoundClip, pos: Vec2) -> ControlResult<()>;
    /// `duration` is informational; the controller schedules the hide itself.
    fn show_panel(&mut self, id: PanelId, text: Option<&str>, duration: Option<f32>) -> ControlResult<()>;
    fn hide_panel(&mut self, id: PanelId);
    /// Request that level `index` be loaded. The host answers with
    /// `LevelController::level_loaded` once the scene exists.
    fn load_level(&mut self, index: usize);
    fn show_game_complete(&mut self);
    fn quit(&mut self);
}

/// Swallow a failed presentation call: missing assets are never fatal.
pub fn best_effort(result: ControlResult<()>) {
    if let Err(e) = result {
        tracing::warn!("{e}; skipped");
    }
}

// ══════════════════════════════════════════════════════════════
// Test double
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
pub use recording::{Call, RecordingBridge};

#[cfg(test)]
mod recording {
    use std::collections::HashSet;

    use super::*;
    use crate::error::ControlError;

    #[derive(Clone, Debug, PartialEq)]
    pub enum Call {
        Effect(EffectKind, Vec2),
        Sound(SoundClip, Vec2),
        Show(PanelId, Option<String>, Option<f32>),
        Hide(PanelId),
        Load(usize),
        GameComplete,
        Quit,
    }

    /// Records every outbound call. Assets listed in `missing_*` fail
    /// with `MissingOptionalAsset` (and are still recorded as attempts).
    #[derive(Default)]
    pub struct RecordingBridge {
        pub calls: Vec<Call>,
        pub missing_effects: HashSet<EffectKind>,
        pub missing_sounds: HashSet<SoundClip>,
        pub missing_panels: HashSet<PanelId>,
    }

    impl RecordingBridge {
        pub fn new() -> Self {
            RecordingBridge::default()
        }

        pub fn effects(&self, kind: EffectKind) -> usize {
            self.calls.iter().filter(|c| matches!(c, Call::Effect(k, _) if *k == kind)).count()
        }

        pub fn sounds(&self, clip: SoundClip) -> usize {
            self.calls.iter().filter(|c| matches!(c, Call::Sound(s, _) if *s == clip)).count()
        }

        pub fn shows(&self, id: PanelId) -> usize {
            self.calls.iter().filter(|c| matches!(c, Call::Show(p, _, _) if *p == id)).count()
        }

        pub fn last_text(&self, id: PanelId) -> Option<String> {
            self.calls.iter().rev().find_map(|c| match c {
                Call::Show(p, text, _) if *p == id => text.clone(),
                _ => None,
            })
        }

        /// Is the panel currently shown (last show not followed by a hide)?
        pub fn is_visible(&self, id: PanelId) -> bool {
            self.calls
                .iter()
                .rev()
                .find_map(|c| match c {
                    Call::Show(p, _, _) if *p == id => Some(true),
                    Call::Hide(p) if *p == id => Some(false),
                    _ => None,
                })
                .unwrap_or(false)
        }

        pub fn loads(&self) -> Vec<usize> {
            self.calls
                .iter()
                .filter_map(|c| match c {
                    Call::Load(i) => Some(*i),
                    _ => None,
                })
                .collect()
        }

        pub fn count(&self, call: &Call) -> usize {
            self.calls.iter().filter(|c| *c == call).count()
        }
    }

    impl Presentation for RecordingBridge {
        fn play_effect(&mut self, kind: EffectKind, pos: Vec2) -> ControlResult<()> {
            self.calls.push(Call::Effect(kind, pos));
            if self.missing_effects.contains(&kind) {
                return Err(ControlError::missing_asset(format!("{:?} effect", kind)));
            }
            Ok(())
        }

        fn play_sound(&mut self, clip: SoundClip, pos: Vec2) -> ControlResult<()> {
            self.calls.push(Call::Sound(clip, pos));
            if self.missing_sounds.contains(&clip) {
                return Err(ControlError::missing_asset(format!("{:?} sound", clip)));
            }
            Ok(())
        }

        fn show_panel(&mut self, id: PanelId, text: Option<&str>, duration: Option<f32>) -> ControlResult<()> {
            if self.missing_panels.contains(&id) {
                return Err(ControlError::missing_asset(format!("{:?} panel", id)));
            }
            self.calls.push(Call::Show(id, text.map(str::to_string), duration));
            Ok(())
        }

        fn hide_panel(&mut self, id: PanelId) {
            if !self.missing_panels.contains(&id) {
                self.calls.push(Call::Hide(id));
            }
        }

        fn load_level(&mut self, index: usize) {
            self.calls.push(Call::Load(index));
        }

        fn show_game_complete(&mut self) {
            self.calls.push(Call::GameComplete);
        }

        fn quit(&mut self) {
            self.calls.push(Call::Quit);
        }
    }
}
