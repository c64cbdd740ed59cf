/// Terminal implementation of the presentation bridge.
///
/// Panels are just "visible + optional text" records the renderer draws.
/// Effects become short-lived flashes at a world position. Level loads and
/// quit are queued here and serviced by the game loop after the frame's
/// controller work is done, so the controller never re-enters itself.

use std::collections::HashMap;

use crate::domain::entity::Vec2;
use crate::error::ControlResult;
use crate::sim::bridge::{EffectKind, PanelId, Presentation, SoundClip};
use crate::ui::sound::{play_on, SoundEngine};

/// How long an effect flash stays on screen (real seconds).
pub const FLASH_SECONDS: f32 = 0.45;

#[derive(Clone, Debug)]
pub struct Flash {
    pub kind: EffectKind,
    pub pos: Vec2,
    pub remaining: f32,
}

pub struct TerminalPresenter {
    panels: HashMap<PanelId, Option<String>>,
    flashes: Vec<Flash>,
    sound: Option<SoundEngine>,
    pending_load: Option<usize>,
    quit: bool,
    game_complete: bool,
}

impl TerminalPresenter {
    pub fn new(sound: Option<SoundEngine>) -> Self {
        if sound.is_none() {
            tracing::warn!("no audio output; sounds disabled");
        }
        TerminalPresenter {
            panels: HashMap::new(),
            flashes: Vec::new(),
            sound,
            pending_load: None,
            quit: false,
            game_complete: false,
        }
    }

    /// Age effect flashes by `real_dt` seconds.
    pub fn advance(&mut self, real_dt: f32) {
        self.flashes.retain_mut(|f| {
            f.remaining -= real_dt;
            f.remaining > 0.0
        });
    }

    pub fn take_load_request(&mut self) -> Option<usize> {
        self.pending_load.take()
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub fn is_game_complete(&self) -> bool {
        self.game_complete
    }

    pub fn is_shown(&self, id: PanelId) -> bool {
        self.panels.contains_key(&id)
    }

    pub fn panel_text(&self, id: PanelId) -> Option<&str> {
        self.panels.get(&id).and_then(|t| t.as_deref())
    }

    pub fn flashes(&self) -> &[Flash] {
        &self.flashes
    }
}

impl Presentation for TerminalPresenter {
    fn play_effect(&mut self, kind: EffectKind, pos: Vec2) -> ControlResult<()> {
        self.flashes.push(Flash { kind, pos, remaining: FLASH_SECONDS });
        Ok(())
    }

    fn play_sound(&mut self, clip: SoundClip, _pos: Vec2) -> ControlResult<()> {
        play_on(self.sound.as_ref(), clip)
    }

    fn show_panel(&mut self, id: PanelId, text: Option<&str>, _duration: Option<f32>) -> ControlResult<()> {
        self.panels.insert(id, text.map(str::to_string));
        Ok(())
    }

    fn hide_panel(&mut self, id: PanelId) {
        self.panels.remove(&id);
    }

    fn load_level(&mut self, index: usize) {
        if let Some(prev) = self.pending_load.replace(index) {
            tracing::debug!("load of level {} superseded by {}", prev, index);
        }
        self.game_complete = false;
        self.flashes.clear();
    }

    fn show_game_complete(&mut self) {
        self.game_complete = true;
        self.panels.insert(PanelId::GameComplete, None);
    }

    fn quit(&mut self) {
        self.quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ControlError;

    #[test]
    fn panels_show_and_hide() {
        let mut ui = TerminalPresenter::new(None);
        ui.show_panel(PanelId::Death, Some("Oops! You fell."), None).unwrap();
        assert!(ui.is_shown(PanelId::Death));
        assert_eq!(ui.panel_text(PanelId::Death), Some("Oops! You fell."));
        ui.hide_panel(PanelId::Death);
        assert!(!ui.is_shown(PanelId::Death));
        // Hiding twice is harmless
        ui.hide_panel(PanelId::Death);
    }

    #[test]
    fn flashes_expire() {
        let mut ui = TerminalPresenter::new(None);
        ui.play_effect(EffectKind::Collect, Vec2::new(1.0, 1.0)).unwrap();
        ui.advance(FLASH_SECONDS / 2.0);
        assert_eq!(ui.flashes().len(), 1);
        ui.advance(FLASH_SECONDS);
        assert!(ui.flashes().is_empty());
    }

    #[test]
    fn load_requests_are_queued_once() {
        let mut ui = TerminalPresenter::new(None);
        ui.load_level(2);
        ui.load_level(3);
        assert_eq!(ui.take_load_request(), Some(3));
        assert_eq!(ui.take_load_request(), None);
    }

    #[test]
    fn no_audio_reports_missing_asset() {
        let mut ui = TerminalPresenter::new(None);
        let err = ui.play_sound(SoundClip::Death, Vec2::ZERO).unwrap_err();
        assert!(matches!(err, ControlError::MissingOptionalAsset { .. }));
    }
}
