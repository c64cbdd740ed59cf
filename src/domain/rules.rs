/// Level rule table — one `LevelRules` row per level index.
///
/// Pure data and pure queries: no side effects, no level-specific
/// branches anywhere else in the code. Thresholds are configuration
/// (see `config.rs` `[[level]]` overrides).
///
/// ## Built-in Table
///
/// ┌─────┬──────────┬──────────┬─────────┬──────┬───────────┬─────────┐
/// │ idx │ max pick │ max tile │ pitfall │ exit │ tiles     │ shuffle │
/// ├─────┼──────────┼──────────┼─────────┼──────┼───────────┼─────────┤
/// │  0  │    –     │    –     │    –    │  1   │     –     │   no    │  main menu
/// │  1  │    3     │    –     │  -3.0   │  1   │ crumbling │   no    │
/// │  2  │    –     │    2     │  -3.0   │  1   │ crumbling │   no    │
/// │  3  │    –     │    –     │  -3.0   │  1   │ vanishing │   no    │
/// │  4  │    –     │    –     │  -3.0   │  1   │ sliding   │   yes   │  final
/// └─────┴──────────┴──────────┴─────────┴──────┴───────────┴─────────┘
///
/// ### Tile collapse handling
/// ┌──────────────────────────────┬──────────────────────────────┐
/// │ Rule row                      │ On TileCollapsed             │
/// ├──────────────────────────────┼──────────────────────────────┤
/// │ max_collapsed_tiles = Some(n) │ count; death when count ≥ n  │
/// │ else pitfall_y = Some(y)      │ run the pitfall check now    │
/// │ otherwise                     │ ignored                      │
/// └──────────────────────────────┴──────────────────────────────┘

use crate::domain::entity::PlatformKind;
use crate::error::{ControlError, ControlResult};

pub const EXCEEDED_LIMIT_HINT: &str = "You exceeded the limit! Focus on quality, not quantity.";
pub const TOO_MANY_TILES_HINT: &str = "Too many tiles broke beneath you! Be lighter on your feet.";
pub const POISON_HINT: &str = "Poisonous Apple!";
pub const DOOR_SHUT_HINT: &str = "The door remains shut for those who carry nothing.";
pub const DEFAULT_PITFALL_HINT: &str = "Oops! You fell.";

#[derive(Clone, Debug, PartialEq)]
pub struct LevelRules {
    pub level_index: usize,
    pub name: String,
    /// Death once `collected` goes above this.
    pub max_collectibles: Option<u32>,
    /// Death once `collapsed_tiles` reaches this.
    pub max_collapsed_tiles: Option<u32>,
    /// Death once the player is below this height.
    pub pitfall_y: Option<f32>,
    pub min_collectibles_to_exit: u32,
    /// Which tile registry is reset on respawn.
    pub tile_variant: Option<PlatformKind>,
    /// Permute collectible placements on every respawn.
    pub shuffle_collectibles: bool,
    pub intro_riddle: Option<String>,
    /// Level-specific death panel text; overrides the cause hint when set.
    pub death_text: Option<String>,
    pub pitfall_hint: String,
}

impl LevelRules {
    /// No caps, no pitfall, one collectible to leave.
    /// Used for any index the table does not know.
    pub fn permissive(level_index: usize) -> Self {
        LevelRules {
            level_index,
            name: format!("Level {}", level_index),
            max_collectibles: None,
            max_collapsed_tiles: None,
            pitfall_y: None,
            min_collectibles_to_exit: 1,
            tile_variant: None,
            shuffle_collectibles: false,
            intro_riddle: None,
            death_text: None,
            pitfall_hint: DEFAULT_PITFALL_HINT.to_string(),
        }
    }

    pub fn exceeds_collectibles(&self, collected: u32) -> bool {
        self.max_collectibles.map_or(false, |max| collected > max)
    }

    pub fn counts_tiles(&self) -> bool {
        self.max_collapsed_tiles.is_some()
    }

    pub fn tiles_exhausted(&self, collapsed: u32) -> bool {
        self.max_collapsed_tiles.map_or(false, |max| collapsed >= max)
    }

    pub fn below_pitfall(&self, y: f32) -> bool {
        self.pitfall_y.map_or(false, |limit| y < limit)
    }

    pub fn allows_exit(&self, collected: u32) -> bool {
        collected >= self.min_collectibles_to_exit
    }

    /// Text for the death panel: level text if configured, else the cause hint.
    pub fn death_panel_text<'a>(&'a self, hint: &'a str) -> &'a str {
        match self.death_text.as_deref() {
            Some(text) if !text.is_empty() => text,
            _ => hint,
        }
    }
}

/// All known levels, sorted by index.
#[derive(Clone, Debug)]
pub struct RuleTable {
    levels: Vec<LevelRules>,
}

impl RuleTable {
    pub fn new(levels: Vec<LevelRules>) -> Self {
        let mut table = RuleTable { levels: Vec::with_capacity(levels.len()) };
        for rules in levels {
            table.upsert(rules);
        }
        table
    }

    pub fn builtin() -> Self {
        RuleTable::new(vec![
            LevelRules {
                name: "Main Menu".to_string(),
                ..LevelRules::permissive(0)
            },
            LevelRules {
                name: "Level 1 - The Orchard".to_string(),
                max_collectibles: Some(3),
                pitfall_y: Some(-3.0),
                tile_variant: Some(PlatformKind::Crumbling),
                intro_riddle: Some(
                    "Not all that glitters should be gathered. Take what you need, and no more."
                        .to_string(),
                ),
                pitfall_hint: "Level 1 Pitfall: The world is deeper than it looks.".to_string(),
                ..LevelRules::permissive(1)
            },
            LevelRules {
                name: "Level 2 - Brittle Ground".to_string(),
                max_collapsed_tiles: Some(2),
                pitfall_y: Some(-3.0),
                tile_variant: Some(PlatformKind::Crumbling),
                intro_riddle: Some(
                    "The ground remembers every step. Tread where you must, but do not linger."
                        .to_string(),
                ),
                pitfall_hint: "Level 2 Pitfall: Gravity doesn't care about collapsing tiles."
                    .to_string(),
                ..LevelRules::permissive(2)
            },
            LevelRules {
                name: "Level 3 - Fading Steps".to_string(),
                pitfall_y: Some(-3.0),
                tile_variant: Some(PlatformKind::Vanishing),
                intro_riddle: Some("What holds you now will not hold you long.".to_string()),
                pitfall_hint:
                    "Level 3 Pitfall: You missed your chance on the disappearing platforms."
                        .to_string(),
                ..LevelRules::permissive(3)
            },
            LevelRules {
                name: "Level 4 - Bitter Harvest".to_string(),
                pitfall_y: Some(-3.0),
                tile_variant: Some(PlatformKind::Sliding),
                shuffle_collectibles: true,
                intro_riddle: Some(
                    "The sweetest fruit may hide the bitterest end, and nothing stays where you left it."
                        .to_string(),
                ),
                pitfall_hint: "You died".to_string(),
                ..LevelRules::permissive(4)
            },
        ])
    }

    /// Insert or replace the row for `rules.level_index`.
    pub fn upsert(&mut self, rules: LevelRules) {
        match self.levels.binary_search_by_key(&rules.level_index, |r| r.level_index) {
            Ok(i) => self.levels[i] = rules,
            Err(i) => self.levels.insert(i, rules),
        }
    }

    pub fn lookup(&self, index: usize) -> ControlResult<&LevelRules> {
        self.levels
            .binary_search_by_key(&index, |r| r.level_index)
            .map(|i| &self.levels[i])
            .map_err(|_| ControlError::UnknownLevelIndex { index })
    }

    /// Rules for `index`; unknown levels never hard-fail.
    pub fn rules_for(&self, index: usize) -> LevelRules {
        match self.lookup(index) {
            Ok(rules) => rules.clone(),
            Err(e) => {
                tracing::debug!("{e}; using permissive rules");
                LevelRules::permissive(index)
            }
        }
    }

    /// Highest known index. Exiting it completes the game.
    pub fn final_level(&self) -> usize {
        self.levels.last().map_or(0, |r| r.level_index)
    }

    /// Next known level after `index`, or `None` past the final one.
    pub fn next_level(&self, index: usize) -> Option<usize> {
        self.levels.iter().map(|r| r.level_index).find(|&i| i > index)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.levels.len()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        RuleTable::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_index_is_permissive() {
        let table = RuleTable::builtin();
        assert!(matches!(
            table.lookup(99),
            Err(ControlError::UnknownLevelIndex { index: 99 })
        ));
        let r = table.rules_for(99);
        assert_eq!(r.level_index, 99);
        assert_eq!(r.max_collectibles, None);
        assert_eq!(r.max_collapsed_tiles, None);
        assert_eq!(r.pitfall_y, None);
        assert_eq!(r.min_collectibles_to_exit, 1);
    }

    #[test]
    fn builtin_caps() {
        let table = RuleTable::builtin();
        let l1 = table.rules_for(1);
        assert!(!l1.exceeds_collectibles(3));
        assert!(l1.exceeds_collectibles(4));

        let l2 = table.rules_for(2);
        assert!(l2.counts_tiles());
        assert!(!l2.tiles_exhausted(1));
        assert!(l2.tiles_exhausted(2));

        let l3 = table.rules_for(3);
        assert!(!l3.counts_tiles());
        assert!(l3.below_pitfall(-3.5));
        assert!(!l3.below_pitfall(-3.0));

        assert!(table.rules_for(4).shuffle_collectibles);
        assert_eq!(table.final_level(), 4);
    }

    #[test]
    fn exit_gate_threshold() {
        let r = LevelRules { min_collectibles_to_exit: 2, ..LevelRules::permissive(1) };
        assert!(!r.allows_exit(0));
        assert!(!r.allows_exit(1));
        assert!(r.allows_exit(2));
        assert!(r.allows_exit(7));
    }

    #[test]
    fn death_text_overrides_hint_when_set() {
        let mut r = LevelRules::permissive(1);
        assert_eq!(r.death_panel_text("fell"), "fell");
        r.death_text = Some(String::new());
        assert_eq!(r.death_panel_text("fell"), "fell");
        r.death_text = Some("Think again.".to_string());
        assert_eq!(r.death_panel_text("fell"), "Think again.");
    }

    #[test]
    fn upsert_keeps_order_and_replaces() {
        let mut table = RuleTable::builtin();
        table.upsert(LevelRules { max_collectibles: Some(9), ..LevelRules::permissive(1) });
        table.upsert(LevelRules::permissive(7));
        assert_eq!(table.rules_for(1).max_collectibles, Some(9));
        assert_eq!(table.final_level(), 7);
        assert_eq!(table.len(), 6);
        assert_eq!(table.next_level(4), Some(7));
        assert_eq!(table.next_level(7), None);
    }
}
