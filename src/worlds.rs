//! Named world registry handed to every lifecycle call.
//!
//! A pipeline owns one default world and any number of named worlds. Systems
//! resolve a world by name once, keep the returned [`WorldHandle`], and look
//! the world up through the handle every tick.
//!
//! The registry also carries the empty-entity diagnostic: after a lifecycle
//! call, [`Worlds::check_invariants`] reports the first world holding an
//! entity with no components. The scan only exists when the `sanitize` cargo
//! feature is enabled, and only runs while the runtime flag is on.

use bevy_ecs::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::{PipelineError, PipelineResult};

/// Display name of the unnamed world.
pub const DEFAULT_WORLD_NAME: &str = "[default]";

/// Stable index of a world inside a [`Worlds`] registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldHandle(usize);

impl WorldHandle {
    /// Handle of the default world.
    pub const DEFAULT: WorldHandle = WorldHandle(0);
}

/// Registry of the default world plus named worlds.
pub struct Worlds {
    worlds: Vec<World>,
    names: Vec<String>,
    index: FxHashMap<String, WorldHandle>,
    sanitize: bool,
    locked: bool,
}

impl Worlds {
    /// Create a registry around the default world. Sanitize checks start
    /// enabled.
    pub fn new(default_world: World) -> Self {
        Worlds {
            worlds: vec![default_world],
            names: vec![DEFAULT_WORLD_NAME.to_string()],
            index: FxHashMap::default(),
            sanitize: true,
            locked: false,
        }
    }

    /// Register `world` under `name`, replacing any world with the same name.
    ///
    /// An empty name replaces the default world. Once the registry is locked
    /// (see [`lock`](Self::lock)) new names are still accepted, but replacing
    /// a registered world fails with [`PipelineError::WorldLocked`]: systems
    /// hold queries cached on the world behind each handle.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        world: World,
    ) -> PipelineResult<WorldHandle> {
        let name = name.into();
        if self.locked {
            if name.is_empty() {
                return Err(PipelineError::WorldLocked(DEFAULT_WORLD_NAME.to_string()));
            }
            if self.index.contains_key(&name) {
                return Err(PipelineError::WorldLocked(name));
            }
        }
        Ok(self.replace_or_push(name, world))
    }

    pub(crate) fn replace_or_push(&mut self, name: String, world: World) -> WorldHandle {
        if name.is_empty() {
            self.worlds[WorldHandle::DEFAULT.0] = world;
            return WorldHandle::DEFAULT;
        }
        if let Some(handle) = self.index.get(&name) {
            self.worlds[handle.0] = world;
            return *handle;
        }
        let handle = WorldHandle(self.worlds.len());
        self.worlds.push(world);
        self.names.push(name.clone());
        self.index.insert(name, handle);
        handle
    }

    /// Forbid replacing registered worlds from now on.
    pub fn lock(&mut self) {
        self.locked = true;
    }

    /// Returns `true` once [`lock`](Self::lock) was called.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Resolve a world name. `None` and `Some("")` mean the default world.
    pub fn resolve(&self, name: Option<&str>) -> PipelineResult<WorldHandle> {
        match name {
            None | Some("") => Ok(WorldHandle::DEFAULT),
            Some(name) => self
                .index
                .get(name)
                .copied()
                .ok_or_else(|| PipelineError::WorldNotFound(name.to_string())),
        }
    }

    /// Returns `true` if `name` resolves.
    pub fn contains(&self, name: Option<&str>) -> bool {
        self.resolve(name).is_ok()
    }

    /// World behind `handle`.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was issued by another registry.
    pub fn get(&self, handle: WorldHandle) -> &World {
        &self.worlds[handle.0]
    }

    /// Mutable world behind `handle`.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was issued by another registry.
    pub fn get_mut(&mut self, handle: WorldHandle) -> &mut World {
        &mut self.worlds[handle.0]
    }

    /// Resolve and borrow a world by name.
    pub fn world(&self, name: Option<&str>) -> PipelineResult<&World> {
        let handle = self.resolve(name)?;
        Ok(self.get(handle))
    }

    /// Resolve and mutably borrow a world by name.
    pub fn world_mut(&mut self, name: Option<&str>) -> PipelineResult<&mut World> {
        let handle = self.resolve(name)?;
        Ok(self.get_mut(handle))
    }

    pub fn default_world(&self) -> &World {
        self.get(WorldHandle::DEFAULT)
    }

    pub fn default_world_mut(&mut self) -> &mut World {
        self.get_mut(WorldHandle::DEFAULT)
    }

    /// Registered name of `handle` (`"[default]"` for the default world).
    pub fn name_of(&self, handle: WorldHandle) -> &str {
        &self.names[handle.0]
    }

    /// Number of worlds, default included.
    pub fn len(&self) -> usize {
        self.worlds.len()
    }

    /// Always `false`: the default world can be replaced but never removed.
    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }

    /// Iterate `(name, world)` pairs in registration order, default first.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &World)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.worlds.iter())
    }

    /// Turn the empty-entity scan on or off at runtime.
    pub fn set_sanitize(&mut self, enabled: bool) {
        self.sanitize = enabled;
    }

    /// Returns `true` if [`check_invariants`](Self::check_invariants) scans.
    pub fn sanitize_enabled(&self) -> bool {
        cfg!(feature = "sanitize") && self.sanitize
    }

    /// Name of the first world holding an entity with zero components.
    ///
    /// Always `None` when sanitize checks are disabled.
    #[cfg(feature = "sanitize")]
    pub fn check_invariants(&self) -> Option<String> {
        if !self.sanitize {
            return None;
        }
        self.iter()
            .find(|(_, world)| has_empty_entity(world))
            .map(|(name, _)| name.to_string())
    }

    /// Name of the first world holding an entity with zero components.
    ///
    /// Always `None`: this build has the `sanitize` feature compiled out.
    #[cfg(not(feature = "sanitize"))]
    pub fn check_invariants(&self) -> Option<String> {
        None
    }
}

impl Default for Worlds {
    fn default() -> Self {
        Self::new(World::new())
    }
}

/// Returns `true` if some entity in `world` has no components.
pub fn has_empty_entity(world: &World) -> bool {
    world
        .archetypes()
        .iter()
        .any(|archetype| archetype.component_count() == 0 && !archetype.is_empty())
}

/// Delete component `T` from `entity`.
///
/// An entity left without components is despawned, so deleting the last
/// component never leaves an empty entity behind. Returns `true` if a
/// component was removed.
pub fn delete_component<T: Component>(world: &mut World, entity: Entity) -> bool {
    let Ok(mut entity_mut) = world.get_entity_mut(entity) else {
        return false;
    };
    if !entity_mut.contains::<T>() {
        return false;
    }
    entity_mut.remove::<T>();
    if entity_mut.archetype().component_count() == 0 {
        entity_mut.despawn();
    }
    true
}

/// Wraps a leaked-entity report into an error naming the system and phase.
pub(crate) fn ensure_no_leaks(
    worlds: &Worlds,
    system: &str,
    phase: crate::system::Phase,
) -> PipelineResult<()> {
    match worlds.check_invariants() {
        Some(world) => {
            log::error!(
                "Empty entity detected in world \"{}\" after {}.{}()",
                world,
                system,
                phase
            );
            Err(PipelineError::LeakedEntity {
                world,
                system: system.to_string(),
                phase,
            })
        }
        None => Ok(()),
    }
}
