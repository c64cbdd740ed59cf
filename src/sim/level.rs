/// Level loader.
///
/// ## Sources (priority order):
///   1. `levels/levelN.txt` in the configured levels directory
///   2. Built-in embedded levels
///
/// Index 0 is the main menu and has no map.
///
/// ## Single-level format (`.txt`):
///   Optional line 1: `# Level Name`
///   Lines: map rows (top row first)
///
/// ## Tile legend:
///   '#' = Ground                 'P' = Player spawn
///   '$' = Collectible            '!' = Poison item
///   'C' = Crumbling tile         'V' = Vanishing tile
///   'S' = Sliding tile           'D' = Exit door
///   ' ' = Empty

use std::path::Path;

use crate::config::Timing;
use crate::domain::entity::{Collectible, CollectibleKind, Door, Platform, PlatformKind, Player};
use crate::domain::tile::Tile;
use crate::sim::world::Scene;

/// Runtime level data (owned strings, loaded from file or embedded).
pub struct LevelDef {
    pub name: String,
    pub rows: Vec<String>,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Build the scene for level `index`. `fallback_name` comes from the rule
/// table and is used when the map does not name itself.
pub fn build_scene(index: usize, fallback_name: &str, timing: &Timing, levels_dir: &Path) -> Scene {
    if index == 0 {
        return Scene::empty(0, fallback_name);
    }

    let def = load_from_directory(levels_dir, index).or_else(|| embedded_level(index));
    match def {
        Some(def) => {
            let name = if def.name.is_empty() { fallback_name } else { def.name.as_str() };
            let rows: Vec<&str> = def.rows.iter().map(String::as_str).collect();
            parse_scene(index, name, &rows, timing)
        }
        None => {
            tracing::warn!("no map for level {}; loading an empty scene", index);
            Scene::empty(index, fallback_name)
        }
    }
}

/// Build a scene from map rows (top row first).
pub fn parse_scene(index: usize, name: &str, rows: &[&str], timing: &Timing) -> Scene {
    let height = rows.len();
    let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    let mut scene = Scene::new(index, name, width, height);

    for (row, line) in rows.iter().enumerate() {
        for (x, ch) in line.chars().enumerate() {
            let pos = scene.cell_center(x, row);
            match ch {
                'P' => {
                    scene.player = Some(Player::new(pos));
                    scene.spawn_point = Some(pos);
                }
                '$' => {
                    scene.collectibles.insert(Collectible::new(CollectibleKind::Normal, pos));
                }
                '!' => {
                    scene.collectibles.insert(Collectible::new(CollectibleKind::Poison, pos));
                }
                'C' | 'V' | 'S' => {
                    let kind = match ch {
                        'C' => PlatformKind::Crumbling,
                        'V' => PlatformKind::Vanishing,
                        _ => PlatformKind::Sliding,
                    };
                    let speed = if kind == PlatformKind::Sliding { timing.slide_speed } else { 0.0 };
                    scene.platforms.insert(Platform::new(kind, pos, timing.collapse_delay(kind), speed));
                }
                'D' => scene.door = Some(Door::new(pos)),
                _ => scene.tiles[row][x] = Tile::from_char(ch),
            }
        }
    }

    if scene.player.is_none() {
        tracing::warn!("level {} has no spawn point", index);
    }
    scene
}

// ══════════════════════════════════════════════════════════════
// File parsing
// ══════════════════════════════════════════════════════════════

fn parse_level_file(content: &str) -> Option<LevelDef> {
    let mut name = String::new();
    let mut rows: Vec<String> = vec![];

    for line in content.lines() {
        if rows.is_empty() && name.is_empty() && line.starts_with('#') && is_name_line(line) {
            name = line[1..].trim().to_string();
        } else {
            rows.push(line.trim_end_matches('\r').to_string());
        }
    }

    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }

    if rows.is_empty() {
        return None;
    }

    Some(LevelDef { name, rows })
}

/// Distinguish `# Level Name` from `##########` (map data).
/// A name line contains at least one letter other than the legend's.
fn is_name_line(line: &str) -> bool {
    line[1..]
        .chars()
        .any(|c| c.is_alphabetic() && !matches!(c, 'P' | 'C' | 'V' | 'S' | 'D'))
}

fn load_from_directory(dir: &Path, index: usize) -> Option<LevelDef> {
    let path = dir.join(format!("level{}.txt", index));
    let content = std::fs::read_to_string(&path).ok()?;
    let def = parse_level_file(&content);
    match &def {
        Some(_) => tracing::info!("level {} map from {}", index, path.display()),
        None => tracing::warn!("{} has no map rows; using built-in", path.display()),
    }
    def
}

// ══════════════════════════════════════════════════════════════
// Embedded levels
// ══════════════════════════════════════════════════════════════

fn embedded_level(index: usize) -> Option<LevelDef> {
    let map: &[&str] = match index {
        1 => &[
            "                                        ",
            "                                 $      ",
            "                               ####    D",
            "                        $  $         ## ",
            "                       ######           ",
            "             $   $                      ",
            "            #######  CCC                ",
            "      $ $                               ",
            " P   #####                              ",
            "######     #####  ###                   ",
        ],
        2 => &[
            "                                        ",
            "                                        ",
            "                                 $     D",
            "                               CCCC  ###",
            "                                        ",
            "                    $   CCCC            ",
            "                 CCCCC                  ",
            "          CCCC                          ",
            " P  $                                   ",
            "########                                ",
        ],
        3 => &[
            "                                        ",
            "                                        ",
            "                                        ",
            "                                       D",
            "                  $                #####",
            "                VVVVV   VVVV            ",
            "          VVVV                VVVV      ",
            "     $                                  ",
            " P  ####                                ",
            "#####                                   ",
        ],
        4 => &[
            "                                        ",
            "                                        ",
            "                                        ",
            "                                       D",
            "               $  !                #####",
            "              ######SSSS                ",
            "     $   !  $                           ",
            "    #########                           ",
            " P####                                  ",
            "######                                  ",
        ],
        _ => return None,
    };
    Some(LevelDef {
        name: String::new(),
        rows: map.iter().map(|s| s.to_string()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Vec2;
    use crate::domain::rules::RuleTable;

    #[test]
    fn legend_maps_to_entities() {
        let timing = Timing::default();
        let s = parse_scene(1, "t", &["$!D ", "PCVS", "####"], &timing);
        assert_eq!((s.width, s.height), (4, 3));
        assert_eq!(s.spawn_point, Some(Vec2::new(0.0, 1.0)));
        assert_eq!(s.door.as_ref().map(|d| d.pos), Some(Vec2::new(2.0, 2.0)));
        assert_eq!(s.collectibles.len(), 2);
        assert_eq!(s.platforms.len(), 3);
        assert!(s.is_solid(3.0, 0.0));

        let slide = s.platforms.values().find(|p| p.kind == PlatformKind::Sliding).expect("sliding");
        assert_eq!(slide.speed, timing.slide_speed);
        let vanish = s.platforms.values().find(|p| p.kind == PlatformKind::Vanishing).expect("vanishing");
        assert_eq!(vanish.delay, timing.vanish_delay_seconds);
    }

    #[test]
    fn file_name_line_is_optional() {
        let def = parse_level_file("# Bonus Round\nP $ D\n#####\n\n").expect("level");
        assert_eq!(def.name, "Bonus Round");
        assert_eq!(def.rows.len(), 2);

        let def = parse_level_file("#####\nP  D\n").expect("level");
        assert!(def.name.is_empty());
        assert_eq!(def.rows[0], "#####");

        assert!(parse_level_file("# Only a name\n").is_none());
    }

    #[test]
    fn embedded_levels_fit_their_rules() {
        let table = RuleTable::builtin();
        let timing = Timing::default();
        for index in 1..=4 {
            let rules = table.rules_for(index);
            let s = build_scene(index, &rules.name, &timing, Path::new("/nonexistent"));
            assert!(s.player.is_some(), "level {} has a player", index);
            assert!(s.door.is_some(), "level {} has a door", index);
            let normal = s.collectibles.values().filter(|c| c.kind == CollectibleKind::Normal).count() as u32;
            assert!(normal >= rules.min_collectibles_to_exit);
            if let Some(max) = rules.max_collectibles {
                assert!(normal > max, "level {} must offer more than it allows", index);
            }
            if let Some(kind) = rules.tile_variant {
                assert!(s.platforms.values().any(|p| p.kind == kind));
            }
            assert_eq!(s.name, rules.name);
        }
    }

    #[test]
    fn menu_and_unknown_indices_are_empty() {
        let timing = Timing::default();
        let menu = build_scene(0, "Main Menu", &timing, Path::new("/nonexistent"));
        assert!(menu.player.is_none());
        let unknown = build_scene(9, "Level 9", &timing, Path::new("/nonexistent"));
        assert_eq!(unknown.width, 0);
        assert_eq!(unknown.name, "Level 9");
    }
}
