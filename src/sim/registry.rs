/// Entity registries: per-level sets of weak handles, rebuilt on level load.
///
/// A registry never owns anything. It records `(EntityKey, kind)` pairs found
/// by scanning the scene; `for_each` resolves each key against the scene's
/// slot map and silently skips keys whose entity has been removed since.

use slotmap::SlotMap;

use crate::domain::entity::{Collectible, CollectibleKind, Platform, PlatformKind};
use crate::sim::world::{EntityKey, Scene};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EntityKind {
    Collectible,
    Poison,
    Crumbling,
    Vanishing,
    Sliding,
}

impl EntityKind {
    pub fn for_platform(kind: PlatformKind) -> Self {
        match kind {
            PlatformKind::Crumbling => EntityKind::Crumbling,
            PlatformKind::Vanishing => EntityKind::Vanishing,
            PlatformKind::Sliding => EntityKind::Sliding,
        }
    }

    fn matches_collectible(self, c: &Collectible) -> bool {
        matches!(
            (self, c.kind),
            (EntityKind::Collectible, CollectibleKind::Normal) | (EntityKind::Poison, CollectibleKind::Poison)
        )
    }

    fn matches_platform(self, p: &Platform) -> bool {
        EntityKind::for_platform(p.kind) == self
    }
}

/// Weak reference into the scene: id + kind tag.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct EntityHandle {
    pub key: EntityKey,
    pub kind: EntityKind,
}

#[derive(Debug)]
pub struct Registry {
    kind: EntityKind,
    handles: Vec<EntityHandle>,
}

impl Registry {
    pub fn new(kind: EntityKind) -> Self {
        Registry { kind, handles: Vec::new() }
    }

    #[cfg(test)]
    pub fn handles(&self) -> &[EntityHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Clear, then rescan the scene for entities of this registry's kind.
    pub fn rebuild(&mut self, scene: &Scene) {
        self.handles.clear();
        let kind = self.kind;
        let keys: Vec<EntityKey> = match kind {
            EntityKind::Collectible | EntityKind::Poison => scene
                .collectibles
                .iter()
                .filter(|(_, c)| kind.matches_collectible(c))
                .map(|(k, _)| k)
                .collect(),
            EntityKind::Crumbling | EntityKind::Vanishing | EntityKind::Sliding => scene
                .platforms
                .iter()
                .filter(|(_, p)| kind.matches_platform(p))
                .map(|(k, _)| k)
                .collect(),
        };
        self.handles.extend(keys.into_iter().map(|key| EntityHandle { key, kind }));
    }

    /// Apply `f` to every handle that still resolves. Returns how many did.
    pub fn for_each<T>(&self, arena: &mut SlotMap<EntityKey, T>, mut f: impl FnMut(&mut T)) -> usize {
        let mut visited = 0;
        for handle in &self.handles {
            match arena.get_mut(handle.key) {
                Some(entity) => {
                    f(entity);
                    visited += 1;
                }
                None => tracing::trace!("stale {:?} handle skipped", handle.kind),
            }
        }
        visited
    }

    /// Keys that still resolve in `arena`.
    pub fn live_keys<T>(&self, arena: &SlotMap<EntityKey, T>) -> Vec<EntityKey> {
        self.handles
            .iter()
            .map(|h| h.key)
            .filter(|k| arena.contains_key(*k))
            .collect()
    }
}

/// Every registry a level can use.
#[derive(Debug)]
pub struct Registries {
    pub collectibles: Registry,
    pub poison: Registry,
    pub crumbling: Registry,
    pub vanishing: Registry,
    pub sliding: Registry,
}

impl Registries {
    pub fn new() -> Self {
        Registries {
            collectibles: Registry::new(EntityKind::Collectible),
            poison: Registry::new(EntityKind::Poison),
            crumbling: Registry::new(EntityKind::Crumbling),
            vanishing: Registry::new(EntityKind::Vanishing),
            sliding: Registry::new(EntityKind::Sliding),
        }
    }

    pub fn rebuild_all(&mut self, scene: &Scene) {
        self.collectibles.rebuild(scene);
        self.poison.rebuild(scene);
        self.crumbling.rebuild(scene);
        self.vanishing.rebuild(scene);
        self.sliding.rebuild(scene);
    }

    pub fn tiles(&self, kind: PlatformKind) -> &Registry {
        match kind {
            PlatformKind::Crumbling => &self.crumbling,
            PlatformKind::Vanishing => &self.vanishing,
            PlatformKind::Sliding => &self.sliding,
        }
    }
}

impl Default for Registries {
    fn default() -> Self {
        Registries::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Vec2;

    fn scene() -> Scene {
        let mut s = Scene::new(1, "t", 6, 2);
        s.collectibles.insert(Collectible::new(CollectibleKind::Normal, Vec2::new(0.0, 1.0)));
        s.collectibles.insert(Collectible::new(CollectibleKind::Normal, Vec2::new(1.0, 1.0)));
        s.collectibles.insert(Collectible::new(CollectibleKind::Poison, Vec2::new(2.0, 1.0)));
        s.platforms.insert(Platform::new(PlatformKind::Crumbling, Vec2::new(3.0, 0.0), 3.0, 0.0));
        s.platforms.insert(Platform::new(PlatformKind::Sliding, Vec2::new(4.0, 0.0), 0.0, 3.0));
        s
    }

    #[test]
    fn rebuild_scans_by_kind() {
        let s = scene();
        let mut regs = Registries::new();
        regs.rebuild_all(&s);
        assert_eq!(regs.collectibles.len(), 2);
        assert_eq!(regs.poison.len(), 1);
        assert_eq!(regs.crumbling.len(), 1);
        assert_eq!(regs.vanishing.len(), 0);
        assert_eq!(regs.tiles(PlatformKind::Sliding).len(), 1);
    }

    #[test]
    fn rebuild_clears_previous_level() {
        let mut regs = Registries::new();
        regs.rebuild_all(&scene());
        regs.rebuild_all(&Scene::empty(0, "menu"));
        assert_eq!(regs.collectibles.len(), 0);
        assert_eq!(regs.crumbling.len(), 0);
    }

    #[test]
    fn for_each_skips_destroyed_entities() {
        let mut s = scene();
        let mut regs = Registries::new();
        regs.rebuild_all(&s);

        let doomed = regs.collectibles.handles()[0].key;
        s.collectibles.remove(doomed);

        let visited = regs.collectibles.for_each(&mut s.collectibles, |c| c.visible = false);
        assert_eq!(visited, 1);
        assert_eq!(regs.collectibles.live_keys(&s.collectibles).len(), 1);
    }
}
