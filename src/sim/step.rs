/// The step function: advances the world by `dt` gameplay seconds.
///
/// Processing order:
///   1. Hazard tiles (slide, accumulate standing contact, collapse)
///   2. Player horizontal movement
///   3. Gravity / jump, landing and head bumps
///   4. Contact events (pickups, door)
///
/// The player is a 0.8 × 1.0 box centred on its position; terrain cells
/// and tiles are unit boxes centred on integer coordinates. Physics is
/// deliberately small: it only has to produce the events the controller
/// consumes.

use crate::domain::entity::{FrameInput, Player, Vec2};
use crate::sim::event::GameEvent;
use crate::sim::world::{EntityKey, Scene};

pub const MOVE_SPEED: f32 = 6.0;
pub const JUMP_SPEED: f32 = 12.0;
pub const GRAVITY: f32 = 30.0;
pub const MAX_FALL: f32 = 20.0;

const HALF_WIDTH: f32 = 0.4;
/// Probe offset so a player resting exactly on a cell edge still sees it.
const EPS: f32 = 0.01;
const PICKUP_RADIUS: f32 = 0.6;
const DOOR_RADIUS: f32 = 0.7;

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

/// `dt` is gameplay time (zero while frozen). `contact` is false while the
/// controller is not accepting pickups (grace window, exit in progress).
pub fn step(scene: &mut Scene, input: &FrameInput, dt: f32, contact: bool) -> Vec<GameEvent> {
    let mut events = Vec::new();
    if dt <= 0.0 {
        return events;
    }

    resolve_tiles(scene, dt, &mut events);

    let Some(mut player) = scene.player.take() else {
        return events;
    };
    resolve_horizontal(scene, &mut player, input, dt);
    resolve_vertical(scene, &mut player, input, dt);
    scene.player = Some(player);

    resolve_pickups(scene, contact, &mut events);
    resolve_door(scene, &mut events);
    events
}

// ══════════════════════════════════════════════════════════════
// Tiles
// ══════════════════════════════════════════════════════════════

/// Tiles the player is currently standing on.
fn supporting_tiles(scene: &Scene) -> Vec<EntityKey> {
    let Some(player) = scene.player.as_ref() else { return vec![] };
    if !player.grounded || !player.has_collision() {
        return vec![];
    }
    let below = (player.pos.y - 1.0).round();
    scene
        .platforms
        .iter()
        .filter(|(_, p)| {
            p.is_solid()
                && (p.pos.y - below).abs() < EPS
                && (p.pos.x - player.pos.x).abs() < 0.5 + HALF_WIDTH
        })
        .map(|(k, _)| k)
        .collect()
}

fn resolve_tiles(scene: &mut Scene, dt: f32, events: &mut Vec<GameEvent>) {
    let standing = supporting_tiles(scene);
    for (key, platform) in scene.platforms.iter_mut() {
        if platform.update(dt, standing.contains(&key)) && platform.kind.collapses() {
            events.push(GameEvent::TileCollapsed { kind: platform.kind, pos: platform.pos });
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Player movement
// ══════════════════════════════════════════════════════════════

fn blocked_at(scene: &Scene, x: f32, y: f32) -> bool {
    scene.is_solid(x, y - 0.4) || scene.is_solid(x, y + 0.4)
}

fn resolve_horizontal(scene: &Scene, player: &mut Player, input: &FrameInput, dt: f32) {
    let dir = if !player.can_move() {
        0.0
    } else {
        match (input.left, input.right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    };
    player.vel.x = dir * MOVE_SPEED;
    if dir == 0.0 {
        return;
    }

    let new_x = player.pos.x + player.vel.x * dt;
    let edge = new_x + dir * HALF_WIDTH;
    if player.has_collision() && blocked_at(scene, edge, player.pos.y) {
        player.vel.x = 0.0;
        return;
    }
    player.pos.x = new_x;
}

fn foot_probe(scene: &Scene, x: f32, y: f32) -> bool {
    scene.is_solid(x - HALF_WIDTH + EPS, y) || scene.is_solid(x + HALF_WIDTH - EPS, y)
}

fn resolve_vertical(scene: &Scene, player: &mut Player, input: &FrameInput, dt: f32) {
    if input.jump && player.grounded && player.can_move() {
        player.vel.y = JUMP_SPEED;
        player.grounded = false;
    }

    player.vel.y = (player.vel.y - GRAVITY * dt).max(-MAX_FALL);
    let new_y = player.pos.y + player.vel.y * dt;

    if !player.has_collision() {
        player.pos.y = new_y;
        player.grounded = false;
        return;
    }

    if player.vel.y <= 0.0 {
        let feet = new_y - 0.5 - EPS;
        if foot_probe(scene, player.pos.x, feet) {
            player.pos.y = feet.round() + 1.0;
            player.vel.y = 0.0;
            player.grounded = true;
            return;
        }
    } else {
        let head = new_y + 0.5;
        if foot_probe(scene, player.pos.x, head) {
            player.pos.y = head.round() - 1.0;
            player.vel.y = 0.0;
            player.grounded = false;
            return;
        }
    }
    player.pos.y = new_y;
    player.grounded = false;
}

// ══════════════════════════════════════════════════════════════
// Contact
// ══════════════════════════════════════════════════════════════

fn player_contact_pos(scene: &Scene) -> Option<Vec2> {
    scene.player.as_ref().filter(|p| p.has_collision()).map(|p| p.pos)
}

fn resolve_pickups(scene: &mut Scene, contact: bool, events: &mut Vec<GameEvent>) {
    if !contact {
        return;
    }
    let Some(at) = player_contact_pos(scene) else { return };
    for collectible in scene.collectibles.values_mut() {
        if collectible.pos.distance(at) < PICKUP_RADIUS && collectible.contact() {
            events.push(GameEvent::CollectiblePicked { kind: collectible.kind, pos: collectible.pos });
        }
    }
}

/// Edge-triggered: one event per entry into the door's area.
fn resolve_door(scene: &mut Scene, events: &mut Vec<GameEvent>) {
    let at = player_contact_pos(scene);
    let inside = match (scene.door.as_ref(), at) {
        (Some(door), Some(at)) => door.visible && door.pos.distance(at) < DOOR_RADIUS,
        _ => false,
    };
    if inside && !scene.touching_door {
        if let Some(door) = scene.door.as_ref() {
            events.push(GameEvent::DoorTouched { pos: door.pos });
        }
    }
    scene.touching_door = inside;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timing;
    use crate::domain::entity::{CollectibleKind, PlatformKind};
    use crate::sim::level::parse_scene;

    const DT: f32 = 1.0 / 30.0;

    fn run(scene: &mut Scene, input: FrameInput, frames: usize) -> Vec<GameEvent> {
        let mut all = Vec::new();
        for _ in 0..frames {
            all.extend(step(scene, &input, DT, true));
        }
        all
    }

    fn right() -> FrameInput {
        FrameInput { right: true, ..FrameInput::default() }
    }

    #[test]
    fn player_lands_and_rests_on_ground() {
        let mut s = parse_scene(1, "t", &["    ", "P   ", "####"], &Timing::default());
        run(&mut s, FrameInput::default(), 30);
        let p = s.player.as_ref().expect("player");
        assert!(p.grounded);
        assert!((p.pos.y - 1.0).abs() < 1e-4);
    }

    #[test]
    fn walls_block_and_pits_drop() {
        let mut s = parse_scene(1, "t", &["P #  ", "## ##"], &Timing::default());
        run(&mut s, right(), 30);
        assert!(s.player.as_ref().map_or(false, |p| p.pos.x < 1.6));

        let mut s = parse_scene(1, "t", &["P    ", "##   "], &Timing::default());
        run(&mut s, right(), 60);
        assert!(s.player.as_ref().map_or(false, |p| p.pos.y < -3.0));
    }

    #[test]
    fn jump_clears_two_cells() {
        let mut s = parse_scene(1, "t", &["     ", "  ###", "P ###", "#####"], &Timing::default());
        run(&mut s, FrameInput::default(), 5);
        let jump = FrameInput { jump: true, right: true, ..FrameInput::default() };
        run(&mut s, jump, 1);
        run(&mut s, right(), 30);
        let p = s.player.as_ref().expect("player");
        assert!(p.grounded);
        assert!((p.pos.y - 3.0).abs() < 1e-4, "landed at {}", p.pos.y);
    }

    #[test]
    fn pickups_report_once_and_respect_contact_flag() {
        let mut s = parse_scene(1, "t", &["P$!  ", "#####"], &Timing::default());
        run(&mut s, FrameInput::default(), 5);

        let mut gated = Vec::new();
        for _ in 0..30 {
            gated.extend(step(&mut s, &right(), DT, false));
        }
        assert!(gated.iter().all(|e| !matches!(e, GameEvent::CollectiblePicked { .. })));
        assert!(s.collectibles.values().all(|c| c.visible));

        if let Some(p) = s.player.as_mut() {
            p.pos.x = 0.0;
        }
        let events = run(&mut s, right(), 30);
        let kinds: Vec<CollectibleKind> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::CollectiblePicked { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec![CollectibleKind::Normal, CollectibleKind::Poison]);
    }

    #[test]
    fn standing_on_crumbling_tile_collapses_it() {
        let timing = Timing { crumble_delay_seconds: 0.5, ..Timing::default() };
        let mut s = parse_scene(1, "t", &["P  ", "CCC"], &timing);
        let events = run(&mut s, FrameInput::default(), 60);
        let collapses = events
            .iter()
            .filter(|e| matches!(e, GameEvent::TileCollapsed { kind: PlatformKind::Crumbling, .. }))
            .count();
        // Player straddles at most two tiles
        assert!(collapses >= 1 && collapses <= 2);
        assert!(s.player.as_ref().map_or(false, |p| p.pos.y < 0.0));
    }

    #[test]
    fn sliding_tiles_move_without_collapsing() {
        let mut s = parse_scene(4, "t", &["   ", "S  "], &Timing::default());
        let events = run(&mut s, FrameInput::default(), 30);
        assert!(events.is_empty());
        let tile = s.platforms.values().next().expect("tile");
        assert!((tile.pos.x - 3.0).abs() < 0.01);
    }

    #[test]
    fn door_contact_is_edge_triggered() {
        let mut s = parse_scene(1, "t", &["P D", "###"], &Timing::default());
        let events = run(&mut s, right(), 40);
        let touches = events.iter().filter(|e| matches!(e, GameEvent::DoorTouched { .. })).count();
        assert_eq!(touches, 1);
        assert!(s.touching_door);
    }

    #[test]
    fn frozen_time_is_a_no_op() {
        let mut s = parse_scene(1, "t", &["P  ", "   "], &Timing::default());
        let before = s.player.as_ref().map(|p| p.pos);
        assert!(step(&mut s, &right(), 0.0, true).is_empty());
        assert_eq!(s.player.as_ref().map(|p| p.pos), before);
    }
}
