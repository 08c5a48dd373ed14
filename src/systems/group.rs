//! Group system: nested systems behind one runtime on/off switch.
//!
//! A [`GroupSystem`] owns a fixed, ordered list of nested systems and forwards
//! every lifecycle phase to the ones implementing it:
//!
//! - `PreInit`, `Init`, `Run` in registration order,
//! - `Destroy`, `PostDestroy` in reverse registration order.
//!
//! # Toggling
//!
//! The group is either active or inactive; the initial state is supplied at
//! construction. Each run phase starts by draining the
//! [`ToggleRecord`]s addressed to this group from the event world: every
//! matching record overwrites the state and is deleted. Only then, if the
//! group is active, does `Run` cascade into the nested systems. A disabled
//! group therefore suppresses all per-tick work of its nested systems, and a
//! toggle never takes effect mid-cascade.
//!
//! Several matching records in the same tick are applied in creation order
//! (see [`ToggleRecord::sequence`]), so the record created last wins.
//!
//! # Sanitize checks
//!
//! After every nested call the group asks [`Worlds::check_invariants`] for a
//! world holding an entity with zero components, and fails with
//! [`PipelineError::LeakedEntity`] naming that world and the nested system.
//!
//! # Related
//!
//! - [`crate::events::grouptoggle`] – toggle records and [`GroupKey`]
//! - [`crate::pipeline::Pipeline::add_group`] – registration helper

use bevy_ecs::prelude::*;
use bevy_ecs::query::QueryState;
use log::{debug, info};
use smallvec::SmallVec;

use crate::error::{PipelineError, PipelineResult};
use crate::events::grouptoggle::{GroupKey, ToggleRecord};
use crate::system::{
    DestroySystem, InitSystem, Phase, PostDestroySystem, PreInitSystem, RunSystem, System,
    call_phase,
};
use crate::worlds::{WorldHandle, Worlds, delete_component, ensure_no_leaks};

type PhaseList = SmallVec<[usize; 8]>;

/// Event world handle and live query over its toggle records, acquired in
/// `PreInit`.
struct ToggleChannel<K: GroupKey> {
    world: WorldHandle,
    query: QueryState<(Entity, &'static ToggleRecord<K>)>,
}

/// Nested systems gated by a toggle keyed by `K`.
pub struct GroupSystem<K: GroupKey> {
    name: K,
    label: String,
    active: bool,
    torn_down: bool,
    events_world: Option<String>,
    systems: Vec<Box<dyn System>>,
    pre_init_list: PhaseList,
    init_list: PhaseList,
    run_list: PhaseList,
    destroy_list: PhaseList,
    post_destroy_list: PhaseList,
    channel: Option<ToggleChannel<K>>,
}

impl<K: GroupKey> GroupSystem<K> {
    /// Build a group.
    ///
    /// `events_world` names the world toggle records are read from (`None` or
    /// `""` for the default world); it is resolved during `PreInit`.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::EmptyGroupName`] if `name` is blank
    /// - [`PipelineError::EmptyGroup`] if `systems` is empty
    pub fn new(
        name: K,
        default_state: bool,
        events_world: Option<&str>,
        systems: Vec<Box<dyn System>>,
    ) -> PipelineResult<Self> {
        if name.is_blank() {
            return Err(PipelineError::EmptyGroupName);
        }
        let label = format!("{:?}", name);
        if systems.is_empty() {
            return Err(PipelineError::EmptyGroup { group: label });
        }

        let mut systems = systems;
        let mut lists: [PhaseList; 5] = Default::default();
        for (index, system) in systems.iter_mut().enumerate() {
            for (slot, phase) in Phase::ALL.iter().enumerate() {
                if system.implements(*phase) {
                    lists[slot].push(index);
                }
            }
        }
        let [pre_init_list, init_list, run_list, destroy_list, post_destroy_list] = lists;

        debug!(
            "Group {} built with {} systems ({} run), default state {}",
            label,
            systems.len(),
            run_list.len(),
            default_state
        );

        Ok(GroupSystem {
            name,
            label,
            active: default_state,
            torn_down: false,
            events_world: events_world.filter(|w| !w.is_empty()).map(str::to_string),
            systems,
            pre_init_list,
            init_list,
            run_list,
            destroy_list,
            post_destroy_list,
            channel: None,
        })
    }

    /// Identity key.
    pub fn key(&self) -> &K {
        &self.name
    }

    /// Whether `Run` currently cascades into the nested systems.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// `true` once `Destroy` or `PostDestroy` started; the state is frozen.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Number of nested systems.
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Always `false`: construction rejects an empty system list.
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Name of the event world, `None` for the default world.
    pub fn events_world(&self) -> Option<&str> {
        self.events_world.as_deref()
    }

    /// Applies and deletes every pending record addressed to this group.
    fn drain_toggles(&mut self, worlds: &mut Worlds) -> PipelineResult<()> {
        let Some(channel) = self.channel.as_mut() else {
            return Err(PipelineError::NotInitialized {
                system: self.label.clone(),
            });
        };
        let world = worlds.get_mut(channel.world);

        let mut matched: SmallVec<[(u64, Entity, bool); 4]> = channel
            .query
            .iter(world)
            .filter(|(_, record)| record.name == self.name)
            .map(|(entity, record)| (record.sequence(), entity, record.state))
            .collect();
        if matched.is_empty() {
            return Ok(());
        }
        matched.sort_unstable_by_key(|(sequence, entity, _)| (*sequence, *entity));

        for (_, entity, state) in matched {
            if self.active != state {
                info!("Group {} switched {}", self.label, on_off(state));
            }
            debug!(
                "Group {} consumed toggle record {:?} (state {})",
                self.label, entity, state
            );
            self.active = state;
            delete_component::<ToggleRecord<K>>(world, entity);
        }
        Ok(())
    }

    /// Runs `phase` on the nested systems at `indices`, checking for leaked
    /// entities after each call.
    fn cascade(
        systems: &mut [Box<dyn System>],
        indices: &[usize],
        phase: Phase,
        reverse: bool,
        worlds: &mut Worlds,
    ) -> PipelineResult<()> {
        let mut call = |index: usize| -> PipelineResult<()> {
            let system = systems[index].as_mut();
            if call_phase(system, phase, worlds)? {
                ensure_no_leaks(worlds, system.name(), phase)?;
            }
            Ok(())
        };
        if reverse {
            indices.iter().rev().try_for_each(|&i| call(i))
        } else {
            indices.iter().try_for_each(|&i| call(i))
        }
    }
}

fn on_off(state: bool) -> &'static str {
    if state { "on" } else { "off" }
}

impl<K: GroupKey> PreInitSystem for GroupSystem<K> {
    fn pre_init(&mut self, worlds: &mut Worlds) -> PipelineResult<()> {
        let handle = worlds.resolve(self.events_world.as_deref())?;
        let query = worlds
            .get_mut(handle)
            .query::<(Entity, &'static ToggleRecord<K>)>();
        self.channel = Some(ToggleChannel {
            world: handle,
            query,
        });
        Self::cascade(
            &mut self.systems,
            &self.pre_init_list,
            Phase::PreInit,
            false,
            worlds,
        )
    }
}

impl<K: GroupKey> InitSystem for GroupSystem<K> {
    fn init(&mut self, worlds: &mut Worlds) -> PipelineResult<()> {
        Self::cascade(
            &mut self.systems,
            &self.init_list,
            Phase::Init,
            false,
            worlds,
        )
    }
}

impl<K: GroupKey> RunSystem for GroupSystem<K> {
    fn run(&mut self, worlds: &mut Worlds) -> PipelineResult<()> {
        if self.torn_down {
            return Ok(());
        }
        self.drain_toggles(worlds)?;
        if !self.active {
            return Ok(());
        }
        Self::cascade(&mut self.systems, &self.run_list, Phase::Run, false, worlds)
    }
}

impl<K: GroupKey> DestroySystem for GroupSystem<K> {
    fn destroy(&mut self, worlds: &mut Worlds) -> PipelineResult<()> {
        self.torn_down = true;
        Self::cascade(
            &mut self.systems,
            &self.destroy_list,
            Phase::Destroy,
            true,
            worlds,
        )
    }
}

impl<K: GroupKey> PostDestroySystem for GroupSystem<K> {
    fn post_destroy(&mut self, worlds: &mut Worlds) -> PipelineResult<()> {
        self.torn_down = true;
        Self::cascade(
            &mut self.systems,
            &self.post_destroy_list,
            Phase::PostDestroy,
            true,
            worlds,
        )
    }
}

impl<K: GroupKey> System for GroupSystem<K> {
    fn name(&self) -> &str {
        &self.label
    }

    fn as_pre_init(&mut self) -> Option<&mut dyn PreInitSystem> {
        Some(self)
    }

    fn as_init(&mut self) -> Option<&mut dyn InitSystem> {
        Some(self)
    }

    fn as_run(&mut self) -> Option<&mut dyn RunSystem> {
        Some(self)
    }

    fn as_destroy(&mut self) -> Option<&mut dyn DestroySystem> {
        Some(self)
    }

    fn as_post_destroy(&mut self) -> Option<&mut dyn PostDestroySystem> {
        Some(self)
    }
}
