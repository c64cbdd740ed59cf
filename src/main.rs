/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::entity::FrameInput;
use sim::controller::{LevelController, Phase};
use sim::level::build_scene;
use sim::step::step;
use sim::world::Scene;
use ui::gamepad::GamepadState;
use ui::input::{InputState, MENU_KEYS, QUIT_KEYS, RESTART_KEYS};
use ui::presenter::TerminalPresenter;
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const LOG_FILE: &str = "riddlerunner.log";
/// Longest step fed to the simulation after a stall.
const MAX_DT: f32 = 0.1;

fn main() {
    init_tracing();
    let config = GameConfig::load();

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let mut ui = TerminalPresenter::new(SoundEngine::new());
    let result = game_loop(&mut renderer, &mut ui, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        tracing::error!("game loop failed: {e}");
        eprintln!("Game error: {e}");
    }

    println!();
    if ui.is_game_complete() {
        println!("Every riddle solved. Thanks for playing Riddle Runner!");
    } else {
        println!("Thanks for playing Riddle Runner!");
    }
}

/// The terminal belongs to the renderer, so logs go to a file. Without a
/// writable file the game runs silently.
fn init_tracing() {
    let Ok(file) = File::create(LOG_FILE) else { return };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .compact()
        .init();
}

fn game_loop(
    renderer: &mut Renderer,
    ui: &mut TerminalPresenter,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);

    let mut ctrl = LevelController::new(config.rules.clone(), config.timing.clone(), StdRng::from_entropy());
    let mut scene = load_scene(0, &ctrl, config);
    ctrl.level_loaded(0, &mut scene, ui);

    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms);
    let mut last_tick = Instant::now();
    let mut pending = FrameInput::default();

    loop {
        kb.drain_events();
        gp.update();
        if kb.ctrl_c_pressed() {
            break;
        }

        // Edges between ticks must not be lost
        let frame = read_input(&kb, &gp);
        pending.jump |= frame.jump;
        pending.pause |= frame.pause;
        pending.confirm |= frame.confirm;
        pending.any_key |= frame.any_key;
        pending.left = frame.left;
        pending.right = frame.right;

        handle_meta(&mut ctrl, ui, &kb, &gp);

        if last_tick.elapsed() >= tick_rate {
            let dt = last_tick.elapsed().as_secs_f32().min(MAX_DT);
            last_tick = Instant::now();
            let input = std::mem::take(&mut pending);

            ctrl.tick(dt, &input, &mut scene, ui);
            let events = step(&mut scene, &input, ctrl.game_dt(dt), ctrl.accepts_contact());
            for event in events {
                ctrl.handle(event, &mut scene, ui);
            }
            ui.advance(dt);
        }

        while let Some(index) = ui.take_load_request() {
            scene = load_scene(index, &ctrl, config);
            ctrl.level_loaded(index, &mut scene, ui);
        }

        if ui.quit_requested() {
            break;
        }

        renderer.render(&scene, &ctrl, ui)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

fn load_scene(index: usize, ctrl: &LevelController, config: &GameConfig) -> Scene {
    let name = ctrl.table().rules_for(index).name;
    build_scene(index, &name, ctrl.timing(), &config.levels_dir)
}

fn read_input(kb: &InputState, gp: &GamepadState) -> FrameInput {
    let mut input = kb.frame_input();
    input.left |= gp.left_held();
    input.right |= gp.right_held();
    input.jump |= gp.jump_pressed();
    input.pause |= gp.pause_pressed();
    input.confirm |= gp.confirm_pressed();
    input.any_key |= gp.any_pressed();
    input
}

/// Keys outside the gameplay input: restart / menu while paused, and quit
/// from any screen that offers it.
fn handle_meta(ctrl: &mut LevelController, ui: &mut TerminalPresenter, kb: &InputState, gp: &GamepadState) {
    match ctrl.phase() {
        Phase::Paused => {
            if kb.any_pressed(&RESTART_KEYS) || gp.restart_pressed() {
                ctrl.restart_requested(ui);
            } else if kb.any_pressed(&MENU_KEYS) || gp.menu_pressed() {
                ctrl.return_to_menu_requested(ui);
            } else if kb.any_pressed(&QUIT_KEYS) {
                ctrl.quit_requested(ui);
            }
        }
        Phase::MainMenu | Phase::GameComplete => {
            if kb.any_pressed(&QUIT_KEYS) || gp.menu_pressed() {
                ctrl.quit_requested(ui);
            }
        }
        _ => {}
    }
}
