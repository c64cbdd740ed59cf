/// Entities: Player, Collectible (normal + poison), Platform (three hazard
/// tile variants) and the exit Door.
///
/// Entities are dumb. On player contact they switch their own visibility
/// off and report once; `respawn()` / `reset()` puts them back to their
/// level-start configuration. Rules live in the controller, not here.

/// World-space position / velocity. y grows upward; the bottom map row is y = 0.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One optional player capability (renderer, movement, collider).
/// A missing component is `None` on the player and is simply skipped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Component {
    pub enabled: bool,
}

impl Component {
    pub const ON: Component = Component { enabled: true };
}

#[derive(Clone, Debug)]
pub struct Player {
    pub pos: Vec2,
    pub vel: Vec2,
    pub grounded: bool,
    pub renderer: Option<Component>,
    pub movement: Option<Component>,
    pub collider: Option<Component>,
}

impl Player {
    pub fn new(pos: Vec2) -> Self {
        Player {
            pos,
            vel: Vec2::ZERO,
            grounded: false,
            renderer: Some(Component::ON),
            movement: Some(Component::ON),
            collider: Some(Component::ON),
        }
    }

    /// Enable or disable every capability that exists.
    /// Returns how many components were present.
    pub fn set_capabilities(&mut self, enabled: bool) -> usize {
        let mut touched = 0;
        for c in [&mut self.renderer, &mut self.movement, &mut self.collider] {
            if let Some(comp) = c.as_mut() {
                comp.enabled = enabled;
                touched += 1;
            }
        }
        touched
    }

    pub fn is_visible(&self) -> bool {
        self.renderer.map_or(false, |c| c.enabled)
    }

    pub fn can_move(&self) -> bool {
        self.movement.map_or(false, |c| c.enabled)
    }

    pub fn has_collision(&self) -> bool {
        self.collider.map_or(false, |c| c.enabled)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum CollectibleKind {
    Normal,
    Poison,
}

#[derive(Clone, Debug)]
pub struct Collectible {
    pub kind: CollectibleKind,
    pub pos: Vec2,
    pub visible: bool,
}

impl Collectible {
    pub fn new(kind: CollectibleKind, pos: Vec2) -> Self {
        Collectible { kind, pos, visible: true }
    }

    /// Player touched this pickup. True exactly once until the next respawn.
    pub fn contact(&mut self) -> bool {
        if !self.visible {
            return false;
        }
        self.visible = false;
        true
    }

    pub fn respawn(&mut self) {
        self.visible = true;
    }
}

/// The three hazard tile variants.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PlatformKind {
    /// Collapses after sustained standing contact (long delay).
    Crumbling,
    /// Collapses almost immediately after being stepped on.
    Vanishing,
    /// Never collapses; slides sideways out from under the player.
    Sliding,
}

impl PlatformKind {
    pub fn collapses(self) -> bool {
        matches!(self, PlatformKind::Crumbling | PlatformKind::Vanishing)
    }

    pub fn name(self) -> &'static str {
        match self {
            PlatformKind::Crumbling => "crumbling",
            PlatformKind::Vanishing => "vanishing",
            PlatformKind::Sliding => "sliding",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "crumbling" => Some(PlatformKind::Crumbling),
            "vanishing" => Some(PlatformKind::Vanishing),
            "sliding" => Some(PlatformKind::Sliding),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Platform {
    pub kind: PlatformKind,
    pub pos: Vec2,
    start: Vec2,
    pub visible: bool,
    /// Accumulated standing-contact time in gameplay seconds.
    pub contact_time: f32,
    /// Contact time needed before a collapse.
    pub delay: f32,
    /// Horizontal speed (sliding only), cells per gameplay second.
    pub speed: f32,
}

impl Platform {
    pub fn new(kind: PlatformKind, pos: Vec2, delay: f32, speed: f32) -> Self {
        Platform {
            kind,
            pos,
            start: pos,
            visible: true,
            contact_time: 0.0,
            delay,
            speed,
        }
    }

    /// Advance by `dt` gameplay seconds.
    /// Returns true on the tick this platform collapses.
    pub fn update(&mut self, dt: f32, player_on: bool) -> bool {
        if self.kind == PlatformKind::Sliding {
            self.pos.x += self.speed * dt;
            return false;
        }
        if !self.visible {
            return false;
        }
        if !player_on {
            // Stepping off abandons the countdown
            self.contact_time = 0.0;
            return false;
        }
        self.contact_time += dt;
        if self.contact_time >= self.delay {
            self.visible = false;
            return true;
        }
        false
    }

    pub fn reset(&mut self) {
        self.pos = self.start;
        self.visible = true;
        self.contact_time = 0.0;
    }

    pub fn is_solid(&self) -> bool {
        self.visible
    }
}

#[derive(Clone, Debug)]
pub struct Door {
    pub pos: Vec2,
    pub visible: bool,
    /// Set once the exit has been granted; further contact is ignored.
    pub open: bool,
}

impl Door {
    pub fn new(pos: Vec2) -> Self {
        Door { pos, visible: true, open: false }
    }
}

/// Input sampled by the host once per frame.
/// Movement is continuous (held); the rest are edge-triggered presses.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub pause: bool,
    pub confirm: bool,
    /// Any key / button / click pressed this frame.
    pub any_key: bool,
}
