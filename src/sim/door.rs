/// Exit door. Asks the controller for permission on contact; once granted
/// it plays its exit feedback, hides itself and hands the transition to
/// the controller's exit delay.

use crate::sim::bridge::{best_effort, EffectKind, Presentation, SoundClip};
use crate::sim::controller::{LevelController, Phase};
use crate::sim::world::Scene;

pub fn on_player_contact(ctrl: &mut LevelController, scene: &mut Scene, ui: &mut dyn Presentation) {
    let Some(door) = scene.door.as_ref() else { return };
    if door.open || ctrl.phase() != Phase::Playing || ctrl.is_dead() || ctrl.is_exiting() {
        return;
    }
    let pos = door.pos;

    // A denial already told the player why
    if !ctrl.exit_requested(ui) {
        return;
    }

    best_effort(ui.play_effect(EffectKind::Exit, pos));
    best_effort(ui.play_sound(SoundClip::DoorOpen, pos));
    if let Some(door) = scene.door.as_mut() {
        door.visible = false;
        door.open = true;
    }
    ctrl.begin_exit();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::config::Timing;
    use crate::domain::entity::{CollectibleKind, FrameInput};
    use crate::domain::rules::{LevelRules, RuleTable};
    use crate::sim::bridge::RecordingBridge;
    use crate::sim::level::parse_scene;

    fn playing(min_exit: u32) -> (LevelController, Scene, RecordingBridge) {
        let mut table = RuleTable::builtin();
        table.upsert(LevelRules { min_collectibles_to_exit: min_exit, ..LevelRules::permissive(2) });
        let timing = Timing::default();
        let mut scene = parse_scene(2, "door", &["P $ D", "#####"], &timing);
        let mut ctrl = LevelController::new(table, timing, StdRng::seed_from_u64(3));
        let mut ui = RecordingBridge::new();
        ctrl.level_loaded(2, &mut scene, &mut ui);
        ctrl.tick(0.03, &FrameInput::default(), &mut scene, &mut ui);
        (ctrl, scene, ui)
    }

    #[test]
    fn open_door_ignores_further_contact() {
        let (mut ctrl, mut scene, mut ui) = playing(0);
        on_player_contact(&mut ctrl, &mut scene, &mut ui);
        on_player_contact(&mut ctrl, &mut scene, &mut ui);
        assert_eq!(ui.effects(EffectKind::Exit), 1);
        assert!(ctrl.is_exiting());
    }

    #[test]
    fn no_door_no_exit() {
        let (mut ctrl, mut scene, mut ui) = playing(0);
        scene.door = None;
        on_player_contact(&mut ctrl, &mut scene, &mut ui);
        assert!(!ctrl.is_exiting());
        assert!(ui.calls.iter().all(|c| !matches!(c, crate::sim::bridge::Call::Effect(..))));
    }

    #[test]
    fn dead_player_cannot_leave() {
        let (mut ctrl, mut scene, mut ui) = playing(1);
        ctrl.collectible_picked(CollectibleKind::Normal, &mut scene, &mut ui);
        ctrl.trigger_death("x", &mut scene, &mut ui);
        on_player_contact(&mut ctrl, &mut scene, &mut ui);
        assert!(!ctrl.is_exiting());
        assert!(scene.door.as_ref().map_or(false, |d| d.visible));
    }
}
