/// Events emitted by entities during a world step.
/// The controller consumes them; each one also carries the
/// effect/sound the presentation layer should play for it.

use crate::domain::entity::{CollectibleKind, PlatformKind, Vec2};
use crate::sim::bridge::{EffectKind, SoundClip};

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    CollectiblePicked { kind: CollectibleKind, pos: Vec2 },
    TileCollapsed { kind: PlatformKind, pos: Vec2 },
    /// Player entered the door's trigger area (edge-triggered).
    DoorTouched { pos: Vec2 },
}

impl GameEvent {
    /// Entity-side feedback: what to show and play where the event happened.
    /// The door decides its own feedback once the exit is granted.
    pub fn feedback(&self) -> Option<(EffectKind, SoundClip, Vec2)> {
        match *self {
            GameEvent::CollectiblePicked { kind: CollectibleKind::Normal, pos } => {
                Some((EffectKind::Collect, SoundClip::Collect, pos))
            }
            GameEvent::CollectiblePicked { kind: CollectibleKind::Poison, pos } => {
                Some((EffectKind::Poison, SoundClip::Poison, pos))
            }
            GameEvent::TileCollapsed { pos, .. } => {
                Some((EffectKind::Collapse, SoundClip::Collapse, pos))
            }
            GameEvent::DoorTouched { .. } => None,
        }
    }
}
