/// Scene: the loaded level the controller works against.
///
/// ## Ownership
///
/// The scene owns every entity. Entities live in `SlotMap`s, so a handle
/// (`EntityKey`) outlives its entity safely: once an entity is removed,
/// lookups through the stale key return `None`. Registries and the
/// controller only ever hold keys.
///
/// ## Coordinates
///
/// Map rows are stored top-down (`tiles[row][x]`), world space is y-up:
///   - cell `(x, row)` ↔ world `(x, height - 1 - row)`
///   - bottom row is y = 0, anything below the map is negative
///   - cells are centred on integer coordinates and span ±0.5

use slotmap::{new_key_type, SlotMap};

use crate::domain::entity::{Collectible, Door, Platform, Player, Vec2};
use crate::domain::tile::Tile;

new_key_type! {
    /// Stable handle for a scene entity; stale once the entity is removed.
    pub struct EntityKey;
}

pub struct Scene {
    pub level_index: usize,
    pub name: String,

    // ── Terrain ──
    pub tiles: Vec<Vec<Tile>>,
    pub width: usize,
    pub height: usize,

    // ── Entities ──
    pub player: Option<Player>,
    pub spawn_point: Option<Vec2>,
    pub door: Option<Door>,
    pub collectibles: SlotMap<EntityKey, Collectible>,
    pub platforms: SlotMap<EntityKey, Platform>,

    /// Player overlapped the door last step (door contact is edge-triggered).
    pub touching_door: bool,
}

// ── Construction ──

impl Scene {
    pub fn new(level_index: usize, name: &str, width: usize, height: usize) -> Self {
        Scene {
            level_index,
            name: name.to_string(),
            tiles: vec![vec![Tile::Empty; width]; height],
            width,
            height,
            player: None,
            spawn_point: None,
            door: None,
            collectibles: SlotMap::with_key(),
            platforms: SlotMap::with_key(),
            touching_door: false,
        }
    }

    /// A scene with no map (main menu).
    pub fn empty(level_index: usize, name: &str) -> Self {
        Scene::new(level_index, name, 0, 0)
    }

    /// World position of the centre of map cell `(x, row)`.
    pub fn cell_center(&self, x: usize, row: usize) -> Vec2 {
        Vec2::new(x as f32, (self.height - 1 - row) as f32)
    }
}

// ── Terrain / solidity queries ──

impl Scene {
    /// Terrain at world position. Left/right edges are walls, above and
    /// below the map is open air.
    pub fn terrain_at(&self, x: f32, y: f32) -> Tile {
        let cx = x.round();
        let cy = y.round();
        if cx < 0.0 || cx >= self.width as f32 {
            return Tile::Ground;
        }
        if cy < 0.0 || cy >= self.height as f32 {
            return Tile::Empty;
        }
        let row = self.height - 1 - cy as usize;
        self.tiles[row][cx as usize]
    }

    /// Visible platform occupying the cell around (x, y), if any.
    pub fn platform_at(&self, x: f32, y: f32) -> Option<EntityKey> {
        self.platforms
            .iter()
            .find(|(_, p)| {
                p.is_solid() && (p.pos.x - x).abs() < 0.5 && (p.pos.y - y.round()).abs() < 0.01
            })
            .map(|(key, _)| key)
    }

    pub fn is_solid(&self, x: f32, y: f32) -> bool {
        self.terrain_at(x, y).is_solid() || self.platform_at(x, y).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::PlatformKind;

    fn small() -> Scene {
        let mut s = Scene::new(1, "t", 4, 3);
        // bottom row solid except a gap at x = 2
        s.tiles[2] = vec![Tile::Ground, Tile::Ground, Tile::Empty, Tile::Ground];
        s
    }

    #[test]
    fn y_up_coordinates() {
        let s = small();
        assert_eq!(s.cell_center(0, 2), Vec2::new(0.0, 0.0));
        assert_eq!(s.cell_center(3, 0), Vec2::new(3.0, 2.0));
        assert!(s.is_solid(0.0, 0.0));
        assert!(s.is_solid(1.2, 0.3));
        assert!(!s.is_solid(2.0, 0.0));
        assert!(!s.is_solid(1.0, 1.0));
    }

    #[test]
    fn edges_are_walls_and_pit_is_open() {
        let s = small();
        assert!(s.is_solid(-1.0, 1.0));
        assert!(s.is_solid(4.0, 1.0));
        assert!(!s.is_solid(1.0, -1.0));
        assert!(!s.is_solid(1.0, 5.0));
    }

    #[test]
    fn platforms_are_solid_only_while_visible() {
        let mut s = small();
        let key = s.platforms.insert(Platform::new(PlatformKind::Crumbling, Vec2::new(2.0, 0.0), 1.0, 0.0));
        assert!(s.is_solid(2.0, 0.0));
        assert_eq!(s.platform_at(2.2, 0.1), Some(key));
        s.platforms[key].visible = false;
        assert!(!s.is_solid(2.0, 0.0));
    }
}
