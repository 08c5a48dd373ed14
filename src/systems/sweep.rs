//! Sweep system: clears one component type from one world every tick.
//!
//! Intended for per-frame signal or tag components (hits, clicks, "dirty"
//! markers) that producers add during a tick and that must not survive into
//! the next one. Register it after the consumers of the component.
//!
//! Deleting the last component of an entity despawns it, see
//! [`delete_component`].

use bevy_ecs::prelude::*;
use bevy_ecs::query::QueryState;
use log::trace;

use crate::error::PipelineResult;
use crate::system::{RunSystem, System};
use crate::worlds::{WorldHandle, Worlds, delete_component};

/// Deletes every `T` in its bound world on each run.
pub struct SweepSystem<T: Component> {
    world: WorldHandle,
    query: QueryState<Entity, With<T>>,
}

impl<T: Component> SweepSystem<T> {
    /// Resolve `world` (`None` for the default world) and cache the query.
    ///
    /// # Errors
    ///
    /// [`PipelineError::WorldNotFound`](crate::error::PipelineError::WorldNotFound)
    /// if the world isn't registered.
    pub fn new(worlds: &mut Worlds, world: Option<&str>) -> PipelineResult<Self> {
        let handle = worlds.resolve(world)?;
        let query = worlds.get_mut(handle).query_filtered::<Entity, With<T>>();
        Ok(SweepSystem {
            world: handle,
            query,
        })
    }

    /// Handle of the bound world.
    pub fn world(&self) -> WorldHandle {
        self.world
    }
}

impl<T: Component> RunSystem for SweepSystem<T> {
    fn run(&mut self, worlds: &mut Worlds) -> PipelineResult<()> {
        let world = worlds.get_mut(self.world);
        let entities: Vec<Entity> = self.query.iter(world).collect();
        for entity in &entities {
            delete_component::<T>(world, *entity);
        }
        if !entities.is_empty() {
            trace!(
                "Swept {} x {}",
                entities.len(),
                std::any::type_name::<T>()
            );
        }
        Ok(())
    }
}

impl<T: Component> System for SweepSystem<T> {
    fn as_run(&mut self) -> Option<&mut dyn RunSystem> {
        Some(self)
    }
}
