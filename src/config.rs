/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.
///
/// `[[level]]` tables patch the built-in rule table: every field except
/// `index` is optional and unspecified fields keep the built-in value.
/// An index the table does not know adds a new level.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::domain::entity::PlatformKind;
use crate::domain::rules::{LevelRules, RuleTable};
use crate::error::{ControlError, ControlResult};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: Timing,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
    pub rules: RuleTable,
}

/// Durations are seconds, speeds are cells per second.
#[derive(Clone, Debug, PartialEq)]
pub struct Timing {
    pub tick_rate_ms: u64,
    pub hint_seconds: f32,
    pub exit_delay_seconds: f32,
    pub interaction_grace_seconds: f32,
    pub crumble_delay_seconds: f32,
    pub vanish_delay_seconds: f32,
    pub slide_speed: f32,
}

impl Timing {
    pub fn tick_seconds(&self) -> f32 {
        self.tick_rate_ms as f32 / 1000.0
    }

    /// Contact time before a tile of this kind collapses.
    pub fn collapse_delay(&self, kind: PlatformKind) -> f32 {
        match kind {
            PlatformKind::Crumbling => self.crumble_delay_seconds,
            PlatformKind::Vanishing => self.vanish_delay_seconds,
            PlatformKind::Sliding => 0.0,
        }
    }
}

impl Default for Timing {
    fn default() -> Self {
        let t = TomlTiming::default();
        Timing {
            tick_rate_ms: t.tick_rate_ms,
            hint_seconds: t.hint_seconds,
            exit_delay_seconds: t.exit_delay_seconds,
            interaction_grace_seconds: t.interaction_grace_seconds,
            crumble_delay_seconds: t.crumble_delay_seconds,
            vanish_delay_seconds: t.vanish_delay_seconds,
            slide_speed: t.slide_speed,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub jump: Vec<String>,
    pub pause: Vec<String>,
    pub confirm: Vec<String>,
    pub restart: Vec<String>,
    pub menu: Vec<String>,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    level: Vec<TomlLevel>,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_hint")]
    hint_seconds: f32,
    #[serde(default = "default_exit_delay")]
    exit_delay_seconds: f32,
    #[serde(default = "default_grace")]
    interaction_grace_seconds: f32,
    #[serde(default = "default_crumble")]
    crumble_delay_seconds: f32,
    #[serde(default = "default_vanish")]
    vanish_delay_seconds: f32,
    #[serde(default = "default_slide_speed")]
    slide_speed: f32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_jump")]
    jump: Vec<String>,
    #[serde(default = "default_pause")]
    pause: Vec<String>,
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
    #[serde(default = "default_menu")]
    menu: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
}

#[derive(Deserialize, Debug, Default)]
struct TomlLevel {
    index: usize,
    name: Option<String>,
    max_collectibles: Option<u32>,
    max_collapsed_tiles: Option<u32>,
    pitfall_y: Option<f32>,
    min_collectibles_to_exit: Option<u32>,
    tile_variant: Option<String>,
    shuffle_collectibles: Option<bool>,
    intro_riddle: Option<String>,
    death_text: Option<String>,
    pitfall_hint: Option<String>,
    /// Optional rules to drop from the built-in row, e.g. `["pitfall_y"]`.
    #[serde(default)]
    clear: Vec<String>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 33 }
fn default_hint() -> f32 { 3.0 }
fn default_exit_delay() -> f32 { 0.5 }
fn default_grace() -> f32 { 0.1 }
fn default_crumble() -> f32 { 3.0 }
fn default_vanish() -> f32 { 0.3 }
fn default_slide_speed() -> f32 { 3.0 }

fn default_jump() -> Vec<String> { vec!["A".into(), "B".into()] }
fn default_pause() -> Vec<String> { vec!["Start".into()] }
fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_restart() -> Vec<String> { vec!["Y".into()] }
fn default_menu() -> Vec<String> { vec!["Select".into()] }
fn default_levels_dir() -> String { "levels".into() }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            hint_seconds: default_hint(),
            exit_delay_seconds: default_exit_delay(),
            interaction_grace_seconds: default_grace(),
            crumble_delay_seconds: default_crumble(),
            vanish_delay_seconds: default_vanish(),
            slide_speed: default_slide_speed(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            jump: default_jump(),
            pause: default_pause(),
            confirm: default_confirm(),
            restart: default_restart(),
            menu: default_menu(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);

        let levels_dir_str = toml_cfg.general.levels_dir.clone();
        let levels_dir = if Path::new(&levels_dir_str).is_absolute() {
            PathBuf::from(&levels_dir_str)
        } else {
            search_dirs
                .iter()
                .map(|d| d.join(&levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(&levels_dir_str))
        };

        GameConfig::from_toml(toml_cfg, levels_dir)
    }

    fn from_toml(toml_cfg: TomlConfig, levels_dir: PathBuf) -> Self {
        let t = toml_cfg.timing;
        let mut rules = RuleTable::builtin();
        for patch in toml_cfg.level {
            apply_level_patch(&mut rules, patch);
        }

        GameConfig {
            timing: Timing {
                tick_rate_ms: t.tick_rate_ms.max(1),
                hint_seconds: t.hint_seconds,
                exit_delay_seconds: t.exit_delay_seconds,
                interaction_grace_seconds: t.interaction_grace_seconds,
                crumble_delay_seconds: t.crumble_delay_seconds,
                vanish_delay_seconds: t.vanish_delay_seconds,
                slide_speed: t.slide_speed,
            },
            gamepad: GamepadConfig {
                jump: toml_cfg.gamepad.jump,
                pause: toml_cfg.gamepad.pause,
                confirm: toml_cfg.gamepad.confirm,
                restart: toml_cfg.gamepad.restart,
                menu: toml_cfg.gamepad.menu,
            },
            levels_dir,
            rules,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), PathBuf::from(default_levels_dir()))
    }
}

fn apply_level_patch(table: &mut RuleTable, patch: TomlLevel) {
    let mut rules: LevelRules = table.rules_for(patch.index);
    for field in &patch.clear {
        match field.as_str() {
            "max_collectibles" => rules.max_collectibles = None,
            "max_collapsed_tiles" => rules.max_collapsed_tiles = None,
            "pitfall_y" => rules.pitfall_y = None,
            "tile_variant" => rules.tile_variant = None,
            "intro_riddle" => rules.intro_riddle = None,
            "death_text" => rules.death_text = None,
            other => tracing::warn!("level {}: '{}' cannot be cleared, ignored", patch.index, other),
        }
    }
    if let Some(name) = patch.name {
        rules.name = name;
    }
    if patch.max_collectibles.is_some() {
        rules.max_collectibles = patch.max_collectibles;
    }
    if patch.max_collapsed_tiles.is_some() {
        rules.max_collapsed_tiles = patch.max_collapsed_tiles;
    }
    if patch.pitfall_y.is_some() {
        rules.pitfall_y = patch.pitfall_y;
    }
    if let Some(min) = patch.min_collectibles_to_exit {
        rules.min_collectibles_to_exit = min;
    }
    if let Some(name) = patch.tile_variant {
        match PlatformKind::from_name(&name) {
            Some(kind) => rules.tile_variant = Some(kind),
            None => tracing::warn!("level {}: unknown tile_variant '{}', ignored", patch.index, name),
        }
    }
    if let Some(shuffle) = patch.shuffle_collectibles {
        rules.shuffle_collectibles = shuffle;
    }
    if patch.intro_riddle.is_some() {
        rules.intro_riddle = patch.intro_riddle;
    }
    if patch.death_text.is_some() {
        rules.death_text = patch.death_text;
    }
    if let Some(hint) = patch.pitfall_hint {
        rules.pitfall_hint = hint;
    }
    tracing::debug!("level {} rules overridden from config", rules.level_index);
    table.upsert(rules);
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

fn parse_toml(text: &str, path: &Path) -> ControlResult<TomlConfig> {
    toml::from_str::<TomlConfig>(text).map_err(|e| ControlError::Config {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        let parsed = std::fs::read_to_string(&path)
            .map_err(|e| ControlError::Config {
                path: path.display().to_string(),
                message: e.to_string(),
            })
            .and_then(|text| parse_toml(&text, &path));
        match parsed {
            Ok(cfg) => {
                tracing::info!("loaded {}", path.display());
                return cfg;
            }
            Err(e) => {
                tracing::warn!("{e}; using default settings");
                return TomlConfig::default();
            }
        }
    }
    TomlConfig::default()
}
