/// Level controller: the per-session state machine.
///
/// ## Phases
///
/// ```text
///   MainMenu ──start──▶ Loading ──1 tick──▶ Ready (intro open) ──dismiss──▶ Playing
///                          ▲                                      │  ▲        │  │
///                          │ restart / menu                 pause ▼  │ resume │  │ death
///                          └──────────────────────────────── Paused ─┘        │  ▼
///                                                                      Dying ─┘ (any input → respawn)
///   Playing ──door, exit delay──▶ Loading (next)  |  GameComplete (final level)
/// ```
///
/// ## Time
///
/// Gameplay time is frozen in every phase except `Playing`. Timers on the
/// real clock (hint hide, interaction grace) keep running regardless; the
/// level exit delay runs on gameplay time.
///
/// ## Ownership
///
/// The controller owns `RunState` exclusively. The scene and the
/// presentation bridge are passed in per call; entities are reached only
/// through registry handles, never held.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::config::Timing;
use crate::domain::entity::{Collectible, CollectibleKind, FrameInput, Platform, Vec2};
use crate::domain::rules::{
    LevelRules, RuleTable, EXCEEDED_LIMIT_HINT, POISON_HINT, TOO_MANY_TILES_HINT, DOOR_SHUT_HINT,
};
use crate::error::ControlError;
use crate::sim::bridge::{best_effort, EffectKind, PanelId, Presentation, SoundClip};
use crate::sim::door;
use crate::sim::event::GameEvent;
use crate::sim::registry::Registries;
use crate::sim::schedule::{Clock, Scheduler, Task};
use crate::sim::world::Scene;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Loading,
    MainMenu,
    /// Level set up, intro riddle still on screen.
    Ready,
    Playing,
    Paused,
    Dying,
    GameComplete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunState {
    pub collected: u32,
    pub collapsed_tiles: u32,
    pub is_player_dead: bool,
    pub is_paused: bool,
    pub can_interact: bool,
    pub is_ready: bool,
}

impl Default for RunState {
    fn default() -> Self {
        RunState {
            collected: 0,
            collapsed_tiles: 0,
            is_player_dead: false,
            is_paused: false,
            can_interact: true,
            is_ready: false,
        }
    }
}

pub struct LevelController {
    table: RuleTable,
    timing: Timing,
    rng: StdRng,

    rules: LevelRules,
    state: RunState,
    phase: Phase,
    registries: Registries,
    scheduler: Scheduler,

    intro_open: bool,
    /// Set by `level_loaded`, consumed on the next tick.
    ready_pending: bool,
    /// Door granted; waiting out the exit delay.
    exiting: bool,
    death_cause: Option<String>,
}

// ══════════════════════════════════════════════════════════════
// Construction / level lifecycle
// ══════════════════════════════════════════════════════════════

impl LevelController {
    pub fn new(table: RuleTable, timing: Timing, rng: StdRng) -> Self {
        let rules = table.rules_for(0);
        LevelController {
            table,
            timing,
            rng,
            rules,
            state: RunState::default(),
            phase: Phase::Loading,
            registries: Registries::new(),
            scheduler: Scheduler::new(),
            intro_open: false,
            ready_pending: false,
            exiting: false,
            death_cause: None,
        }
    }

    /// The host finished building `scene` for level `index`.
    pub fn level_loaded(&mut self, index: usize, scene: &mut Scene, ui: &mut dyn Presentation) {
        // Anything in flight belongs to the previous level instance
        self.scheduler.cancel_all();
        for panel in [PanelId::Death, PanelId::Pause, PanelId::Message, PanelId::Intro] {
            ui.hide_panel(panel);
        }

        self.rules = self.table.rules_for(index);
        self.state = RunState::default();
        self.registries.rebuild_all(scene);
        self.exiting = false;
        self.death_cause = None;
        self.intro_open = false;
        self.ready_pending = false;

        if index == 0 {
            self.phase = Phase::MainMenu;
            self.state.is_ready = true;
            tracing::info!("main menu");
            return;
        }

        self.phase = Phase::Loading;
        self.ready_pending = true;
        if let Some(riddle) = self.rules.intro_riddle.clone() {
            match ui.show_panel(PanelId::Intro, Some(&riddle), None) {
                Ok(()) => self.intro_open = true,
                Err(e) => tracing::warn!("{e}; starting without intro"),
            }
        }
        tracing::info!(
            "level {} loaded: {} ({} collectibles, {} poison)",
            index,
            self.rules.name,
            self.registries.collectibles.len(),
            self.registries.poison.len(),
        );
    }
}

// ══════════════════════════════════════════════════════════════
// Per-frame tick
// ══════════════════════════════════════════════════════════════

impl LevelController {
    /// Advance timers and poll the frame's input. Call once per frame,
    /// before the world step.
    pub fn tick(&mut self, real_dt: f32, input: &FrameInput, scene: &mut Scene, ui: &mut dyn Presentation) {
        let game_dt = self.game_dt(real_dt);
        for task in self.scheduler.advance(real_dt, game_dt) {
            self.run_task(task, ui);
        }

        match self.phase {
            Phase::Loading => {
                if self.ready_pending {
                    self.ready_pending = false;
                    self.state.is_ready = true;
                    self.phase = if self.intro_open { Phase::Ready } else { Phase::Playing };
                }
            }
            Phase::MainMenu => {
                if input.confirm {
                    self.start_first_level(ui);
                }
            }
            Phase::Ready => {
                if input.confirm {
                    self.dismiss_intro(ui);
                }
            }
            Phase::Dying => {
                if input.any_key {
                    self.respawn(scene, ui);
                }
            }
            Phase::Paused => {
                if input.pause {
                    self.resume_requested(ui);
                }
            }
            Phase::Playing => {
                self.check_pitfall(scene, ui);
                if input.pause && self.phase == Phase::Playing {
                    self.pause_toggle_requested(ui);
                }
            }
            Phase::GameComplete => {}
        }
    }

    fn run_task(&mut self, task: Task, ui: &mut dyn Presentation) {
        match task {
            Task::HideHint => ui.hide_panel(PanelId::Message),
            Task::RestoreInteraction => {
                self.state.can_interact = true;
                tracing::trace!("interaction restored");
            }
            Task::FinishExit => self.finish_exit(ui),
        }
    }

    fn check_pitfall(&mut self, scene: &mut Scene, ui: &mut dyn Presentation) {
        if self.exiting {
            return;
        }
        let Some(player) = scene.player.as_ref() else { return };
        if self.rules.below_pitfall(player.pos.y) {
            let hint = self.rules.pitfall_hint.clone();
            self.trigger_death(&hint, scene, ui);
        }
    }

    /// Gameplay seconds that elapse for `real_dt` real seconds.
    pub fn game_dt(&self, real_dt: f32) -> f32 {
        if self.gameplay_frozen() { 0.0 } else { real_dt }
    }

    pub fn gameplay_frozen(&self) -> bool {
        self.phase != Phase::Playing || self.state.is_paused || self.state.is_player_dead
    }
}

// ══════════════════════════════════════════════════════════════
// Entity events
// ══════════════════════════════════════════════════════════════

impl LevelController {
    /// Dispatch one event from the world step: entity feedback first,
    /// then the rule consequences.
    pub fn handle(&mut self, event: GameEvent, scene: &mut Scene, ui: &mut dyn Presentation) {
        if let Some((effect, clip, pos)) = event.feedback() {
            best_effort(ui.play_effect(effect, pos));
            best_effort(ui.play_sound(clip, pos));
        }
        match event {
            GameEvent::CollectiblePicked { kind, .. } => self.collectible_picked(kind, scene, ui),
            GameEvent::TileCollapsed { kind, pos } => {
                tracing::debug!("{} tile collapsed at ({:.1}, {:.1})", kind.name(), pos.x, pos.y);
                self.tile_collapsed(scene, ui);
            }
            GameEvent::DoorTouched { .. } => door::on_player_contact(self, scene, ui),
        }
    }

    /// Gameplay events only count while a level is live and not being left.
    fn in_play(&self) -> bool {
        matches!(self.phase, Phase::Ready | Phase::Playing) && !self.exiting
    }

    pub fn collectible_picked(&mut self, kind: CollectibleKind, scene: &mut Scene, ui: &mut dyn Presentation) {
        if !self.in_play() || self.state.is_player_dead {
            tracing::trace!("{:?} pickup ignored in {:?}", kind, self.phase);
            return;
        }
        match kind {
            CollectibleKind::Poison => self.trigger_death(POISON_HINT, scene, ui),
            CollectibleKind::Normal => {
                if !self.state.can_interact {
                    tracing::debug!("pickup ignored during grace window");
                    return;
                }
                self.state.collected += 1;
                tracing::debug!("collected {}", self.state.collected);
                if self.rules.exceeds_collectibles(self.state.collected) {
                    self.trigger_death(EXCEEDED_LIMIT_HINT, scene, ui);
                }
            }
        }
    }

    pub fn tile_collapsed(&mut self, scene: &mut Scene, ui: &mut dyn Presentation) {
        if !self.in_play() || self.state.is_player_dead {
            tracing::trace!("tile collapse ignored in {:?}", self.phase);
            return;
        }
        if !self.state.can_interact {
            tracing::trace!("tile collapse ignored during grace window");
            return;
        }
        if self.rules.counts_tiles() {
            self.state.collapsed_tiles += 1;
            tracing::debug!("collapsed tiles {}", self.state.collapsed_tiles);
            if self.rules.tiles_exhausted(self.state.collapsed_tiles) {
                self.trigger_death(TOO_MANY_TILES_HINT, scene, ui);
            }
        } else if self.rules.pitfall_y.is_some() {
            self.check_pitfall(scene, ui);
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Death / respawn
// ══════════════════════════════════════════════════════════════

impl LevelController {
    /// Start the death sequence. No-op while one is already in flight.
    pub fn trigger_death(&mut self, hint: &str, scene: &mut Scene, ui: &mut dyn Presentation) {
        if self.state.is_player_dead {
            tracing::trace!("already dying, '{}' dropped", hint);
            return;
        }
        if matches!(self.phase, Phase::MainMenu | Phase::Loading | Phase::GameComplete) {
            tracing::trace!("no live level in {:?}, '{}' dropped", self.phase, hint);
            return;
        }
        if self.exiting {
            tracing::trace!("level already left, '{}' dropped", hint);
            return;
        }

        self.state.is_player_dead = true;
        if self.state.is_paused {
            self.state.is_paused = false;
            ui.hide_panel(PanelId::Pause);
        }
        self.phase = Phase::Dying;

        let pos = scene
            .player
            .as_ref()
            .map(|p| p.pos)
            .or(scene.spawn_point)
            .unwrap_or(Vec2::ZERO);
        best_effort(ui.play_effect(EffectKind::Death, pos));
        best_effort(ui.play_sound(SoundClip::Death, pos));

        match scene.player.as_mut() {
            Some(player) => {
                player.set_capabilities(false);
                player.vel = Vec2::ZERO;
            }
            None => tracing::debug!("no player to disable"),
        }

        let text = self.rules.death_panel_text(hint).to_string();
        best_effort(ui.show_panel(PanelId::Death, Some(&text), None));

        self.death_cause = Some(hint.to_string());
        tracing::info!("player died on level {}: {}", self.rules.level_index, hint);
    }

    /// Restore the level to its start configuration. Called on the first
    /// input after death.
    pub fn respawn(&mut self, scene: &mut Scene, ui: &mut dyn Presentation) {
        if !self.state.is_player_dead {
            return;
        }
        ui.hide_panel(PanelId::Death);

        if self.rules.shuffle_collectibles {
            self.shuffle_collectibles(scene);
        }
        self.registries.collectibles.for_each(&mut scene.collectibles, Collectible::respawn);
        self.registries.poison.for_each(&mut scene.collectibles, Collectible::respawn);
        if let Some(kind) = self.rules.tile_variant {
            let reset = self.registries.tiles(kind).for_each(&mut scene.platforms, Platform::reset);
            tracing::debug!("reset {} {} tiles", reset, kind.name());
        }

        match (scene.player.as_mut(), scene.spawn_point) {
            (Some(player), Some(spawn)) => {
                player.pos = spawn;
                player.vel = Vec2::ZERO;
                player.grounded = false;
            }
            (Some(_), None) => {
                tracing::error!("{}", ControlError::MissingRequiredReference { what: "spawn point" });
            }
            (None, _) => {
                tracing::error!("{}", ControlError::MissingRequiredReference { what: "player" });
            }
        }
        if let Some(player) = scene.player.as_mut() {
            player.set_capabilities(true);
        }
        scene.touching_door = false;

        self.state.collected = 0;
        self.state.collapsed_tiles = 0;
        self.state.is_player_dead = false;
        self.state.can_interact = false;
        self.scheduler
            .after(Clock::Real, self.timing.interaction_grace_seconds, Task::RestoreInteraction);
        self.phase = Phase::Playing;
        self.death_cause = None;
        tracing::info!("respawned on level {}", self.rules.level_index);
    }

    /// Permute placements of the normal collectibles still in the scene.
    fn shuffle_collectibles(&mut self, scene: &mut Scene) {
        let keys = self.registries.collectibles.live_keys(&scene.collectibles);
        let mut positions: Vec<Vec2> = keys.iter().map(|&k| scene.collectibles[k].pos).collect();
        positions.shuffle(&mut self.rng);
        for (&key, pos) in keys.iter().zip(positions) {
            scene.collectibles[key].pos = pos;
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Exit gate
// ══════════════════════════════════════════════════════════════

impl LevelController {
    /// Allow or deny leaving the level. Never mutates the run state; a
    /// denial shows the door hint for `hint_seconds`.
    pub fn exit_requested(&mut self, ui: &mut dyn Presentation) -> bool {
        if self.can_exit() {
            return true;
        }
        let secs = self.timing.hint_seconds;
        best_effort(ui.show_panel(PanelId::Message, Some(DOOR_SHUT_HINT), Some(secs)));
        self.scheduler.after(Clock::Real, secs, Task::HideHint);
        tracing::debug!("exit denied with {} collected", self.state.collected);
        false
    }

    /// Exit granted by the door: leave after the exit delay.
    pub fn begin_exit(&mut self) {
        if self.exiting {
            return;
        }
        self.exiting = true;
        self.scheduler.after(Clock::Game, self.timing.exit_delay_seconds, Task::FinishExit);
        tracing::info!("leaving level {}", self.rules.level_index);
    }

    fn finish_exit(&mut self, ui: &mut dyn Presentation) {
        match self.table.next_level(self.rules.level_index) {
            Some(next) => {
                self.phase = Phase::Loading;
                ui.load_level(next);
            }
            None => {
                self.phase = Phase::GameComplete;
                ui.show_game_complete();
                tracing::info!("game complete");
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// UI requests
// ══════════════════════════════════════════════════════════════

impl LevelController {
    pub fn pause_toggle_requested(&mut self, ui: &mut dyn Presentation) {
        match self.phase {
            Phase::Paused => self.resume_requested(ui),
            Phase::Playing if self.state.is_ready && !self.state.is_player_dead => {
                match ui.show_panel(PanelId::Pause, None, None) {
                    Ok(()) => {
                        self.state.is_paused = true;
                        self.phase = Phase::Paused;
                        tracing::debug!("paused");
                    }
                    Err(e) => tracing::warn!("{e}; pause refused"),
                }
            }
            phase => tracing::trace!("pause ignored in {:?}", phase),
        }
    }

    pub fn resume_requested(&mut self, ui: &mut dyn Presentation) {
        if self.phase != Phase::Paused {
            return;
        }
        ui.hide_panel(PanelId::Pause);
        self.state.is_paused = false;
        self.phase = Phase::Playing;
        tracing::debug!("resumed");
    }

    pub fn restart_requested(&mut self, ui: &mut dyn Presentation) {
        let index = self.rules.level_index;
        self.reload(index, ui);
    }

    pub fn return_to_menu_requested(&mut self, ui: &mut dyn Presentation) {
        self.reload(0, ui);
    }

    pub fn quit_requested(&mut self, ui: &mut dyn Presentation) {
        tracing::info!("quit requested");
        ui.quit();
    }

    /// Close the intro riddle and let gameplay time run.
    pub fn dismiss_intro(&mut self, ui: &mut dyn Presentation) {
        if !self.intro_open {
            return;
        }
        ui.hide_panel(PanelId::Intro);
        self.intro_open = false;
        if self.phase == Phase::Ready {
            self.phase = Phase::Playing;
        }
    }

    pub fn start_first_level(&mut self, ui: &mut dyn Presentation) {
        if self.phase != Phase::MainMenu {
            return;
        }
        let first = self.table.next_level(0).unwrap_or(1);
        self.phase = Phase::Loading;
        ui.load_level(first);
    }

    fn reload(&mut self, index: usize, ui: &mut dyn Presentation) {
        if self.phase == Phase::GameComplete {
            tracing::debug!("load of {} refused after game complete", index);
            return;
        }
        self.scheduler.cancel_all();
        if self.state.is_paused {
            self.state.is_paused = false;
            ui.hide_panel(PanelId::Pause);
        }
        self.phase = Phase::Loading;
        self.ready_pending = false;
        ui.load_level(index);
    }
}

// ══════════════════════════════════════════════════════════════
// Queries
// ══════════════════════════════════════════════════════════════

impl LevelController {
    pub fn can_exit(&self) -> bool {
        self.rules.allows_exit(self.state.collected)
    }

    pub fn is_dead(&self) -> bool {
        self.state.is_player_dead
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting
    }

    /// Gameplay is live: entities may report contact.
    pub fn accepts_contact(&self) -> bool {
        self.in_play() && !self.state.is_player_dead && self.state.can_interact
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn collected(&self) -> u32 {
        self.state.collected
    }

    pub fn collapsed_tiles(&self) -> u32 {
        self.state.collapsed_tiles
    }

    pub fn can_interact(&self) -> bool {
        self.state.can_interact
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready
    }

    pub fn death_cause(&self) -> Option<&str> {
        self.death_cause.as_deref()
    }

    pub fn rules(&self) -> &LevelRules {
        &self.rules
    }

    pub fn table(&self) -> &RuleTable {
        &self.table
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }
}
