//! Pipeline driver and registration helpers.
//!
//! A [`Pipeline`] owns the [`Worlds`] registry and an ordered list of
//! top-level systems, and drives their lifecycle:
//!
//! 1. [`init`](Pipeline::init) – `PreInit` on every system, then `Init` on every system
//! 2. [`run`](Pipeline::run) – `Run` on every system, once per tick
//! 3. [`destroy`](Pipeline::destroy) – `Destroy` on every system in reverse,
//!    then `PostDestroy` on every system in reverse
//!
//! After each call the empty-entity check runs (see
//! [`Worlds::check_invariants`]).
//!
//! # Registration
//!
//! ```ignore
//! let mut pipeline = Pipeline::new(World::new());
//! pipeline.add_world("events", World::new())?;
//! pipeline
//!     .add(Input)
//!     .add_named_group("render", false, Some("events"), vec![Box::new(Draw), Box::new(Present)])?
//!     .sweep::<Hit>(None)?;
//! pipeline.init()?;
//! loop {
//!     pipeline.run()?;
//! }
//! ```

use bevy_ecs::prelude::*;
use log::{debug, info};

use crate::error::{PipelineError, PipelineResult};
use crate::events::grouptoggle::GroupKey;
use crate::resources::pipelineconfig::PipelineConfig;
use crate::system::{Phase, System, call_phase};
use crate::systems::group::GroupSystem;
use crate::systems::sweep::SweepSystem;
use crate::worlds::{Worlds, ensure_no_leaks};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Built,
    Initialized,
    Destroyed,
}

/// Ordered set of systems plus the worlds they operate on.
pub struct Pipeline {
    worlds: Worlds,
    systems: Vec<Box<dyn System>>,
    stage: Stage,
}

impl Pipeline {
    /// Create a pipeline around the default world.
    pub fn new(default_world: World) -> Self {
        Pipeline {
            worlds: Worlds::new(default_world),
            systems: Vec::new(),
            stage: Stage::Built,
        }
    }

    /// Create a pipeline with the named worlds and sanitize flag from `config`.
    pub fn with_config(default_world: World, config: &PipelineConfig) -> Self {
        let mut pipeline = Self::new(default_world);
        for name in &config.worlds {
            pipeline.worlds.replace_or_push(name.clone(), World::new());
        }
        pipeline.worlds.set_sanitize(config.sanitize);
        pipeline
    }

    /// Register a named world, replacing any world with the same name.
    ///
    /// After [`init`](Self::init) only new names are accepted; replacing a
    /// world fails with [`PipelineError::WorldLocked`].
    pub fn add_world(
        &mut self,
        name: impl Into<String>,
        world: World,
    ) -> PipelineResult<&mut Self> {
        self.worlds.insert(name, world)?;
        Ok(self)
    }

    /// Register a system after the ones already added.
    pub fn add(&mut self, system: impl System) -> &mut Self {
        self.add_boxed(Box::new(system))
    }

    /// Register an already boxed system.
    pub fn add_boxed(&mut self, system: Box<dyn System>) -> &mut Self {
        debug!("Registered system {}", system.name());
        self.systems.push(system);
        self
    }

    /// Build a [`GroupSystem`] and register it.
    ///
    /// Nothing is registered if construction fails.
    pub fn add_group<K: GroupKey>(
        &mut self,
        name: K,
        default_state: bool,
        events_world: Option<&str>,
        systems: Vec<Box<dyn System>>,
    ) -> PipelineResult<&mut Self> {
        let group = GroupSystem::new(name, default_state, events_world, systems)?;
        Ok(self.add(group))
    }

    /// [`add_group`](Self::add_group) for text keys.
    pub fn add_named_group(
        &mut self,
        name: &str,
        default_state: bool,
        events_world: Option<&str>,
        systems: Vec<Box<dyn System>>,
    ) -> PipelineResult<&mut Self> {
        self.add_group(name.to_string(), default_state, events_world, systems)
    }

    /// Register a [`SweepSystem`] deleting every `T` from `world` each tick.
    ///
    /// The world is resolved immediately.
    pub fn sweep<T: Component>(&mut self, world: Option<&str>) -> PipelineResult<&mut Self> {
        let sweep = SweepSystem::<T>::new(&mut self.worlds, world)?;
        Ok(self.add(sweep))
    }

    pub fn worlds(&self) -> &Worlds {
        &self.worlds
    }

    pub fn worlds_mut(&mut self) -> &mut Worlds {
        &mut self.worlds
    }

    /// Borrow a world by name (`None` for the default world).
    pub fn world(&self, name: Option<&str>) -> PipelineResult<&World> {
        self.worlds.world(name)
    }

    /// Mutably borrow a world by name (`None` for the default world).
    pub fn world_mut(&mut self, name: Option<&str>) -> PipelineResult<&mut World> {
        self.worlds.world_mut(name)
    }

    /// Number of top-level systems.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Run `PreInit` then `Init` on every system, in registration order.
    pub fn init(&mut self) -> PipelineResult<()> {
        match self.stage {
            Stage::Built => {}
            Stage::Initialized => return Err(PipelineError::AlreadyInitialized),
            Stage::Destroyed => return Err(PipelineError::AlreadyDestroyed),
        }
        info!(
            "Initializing pipeline: {} systems, {} worlds, sanitize={}",
            self.systems.len(),
            self.worlds.len(),
            self.worlds.sanitize_enabled()
        );
        self.stage = Stage::Initialized;
        self.worlds.lock();
        self.call_all(Phase::PreInit)?;
        self.call_all(Phase::Init)
    }

    /// Run one tick.
    pub fn run(&mut self) -> PipelineResult<()> {
        match self.stage {
            Stage::Initialized => self.call_all(Phase::Run),
            Stage::Built => Err(PipelineError::NotInitialized {
                system: "Pipeline".to_string(),
            }),
            Stage::Destroyed => Err(PipelineError::AlreadyDestroyed),
        }
    }

    /// Run `Destroy` then `PostDestroy` on every system, in reverse order.
    pub fn destroy(&mut self) -> PipelineResult<()> {
        match self.stage {
            Stage::Initialized => {}
            Stage::Built => {
                return Err(PipelineError::NotInitialized {
                    system: "Pipeline".to_string(),
                });
            }
            Stage::Destroyed => return Err(PipelineError::AlreadyDestroyed),
        }
        info!("Destroying pipeline");
        self.stage = Stage::Destroyed;
        self.call_all(Phase::Destroy)?;
        self.call_all(Phase::PostDestroy)
    }

    fn call_all(&mut self, phase: Phase) -> PipelineResult<()> {
        let Pipeline {
            worlds, systems, ..
        } = self;
        let mut call = |system: &mut Box<dyn System>| -> PipelineResult<()> {
            let system = system.as_mut();
            if call_phase(system, phase, worlds)? {
                ensure_no_leaks(worlds, system.name(), phase)?;
            }
            Ok(())
        };
        if phase.is_teardown() {
            systems.iter_mut().rev().try_for_each(&mut call)
        } else {
            systems.iter_mut().try_for_each(&mut call)
        }
    }
}
