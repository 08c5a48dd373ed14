//! Group toggle records.
//!
//! A [`ToggleRecord`] asks the group whose identity key equals
//! [`ToggleRecord::name`] to switch its active state. Records are plain
//! components stored on throwaway entities in the group's event world, so the
//! sender never needs a reference to the group:
//!
//! ```ignore
//! let events = pipeline.world_mut(Some("events"))?;
//! send_toggle(events, "render".to_string(), true);
//! ```
//!
//! The matching [`GroupSystem`](crate::systems::group::GroupSystem) consumes
//! the record during its next run phase. Records addressed to other groups are
//! left in place for them; a record no group claims stays in the world.
//!
//! Every record takes a process-wide sequence number when it is created.
//! Several records for one group in the same tick are applied in that order,
//! so the record created last wins. Entity ids say nothing about spawn order.
//!
//! # Related
//!
//! - [`crate::systems::group`] – the consumer
//! - [`crate::pipeline::Pipeline::add_group`] – registers a group

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Identity key of a group.
///
/// Any totally ordered, cloneable type works. Text keys are the common case
/// and report [`is_blank`](GroupKey::is_blank) when empty; groups refuse blank
/// keys at construction.
pub trait GroupKey: Ord + Clone + Debug + Send + Sync + 'static {
    /// Returns `true` if the key can't identify a group.
    fn is_blank(&self) -> bool {
        false
    }
}

impl GroupKey for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl GroupKey for &'static str {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl GroupKey for Box<str> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

macro_rules! impl_group_key {
    ($($t:ty),*) => {
        $(impl GroupKey for $t {})*
    };
}

impl_group_key!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, char, bool);

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn next_sequence() -> u64 {
    NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed)
}

/// Request to set the active state of the group named `name`.
#[derive(Component, Debug, Clone, Serialize, Deserialize)]
pub struct ToggleRecord<K: GroupKey> {
    /// Identity key of the target group.
    pub name: K,
    /// Desired active state.
    pub state: bool,
    /// Creation order; a deserialized record counts as created on arrival.
    #[serde(skip, default = "next_sequence")]
    sequence: u64,
}

impl<K: GroupKey> PartialEq for ToggleRecord<K> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.state == other.state
    }
}

impl<K: GroupKey> Eq for ToggleRecord<K> {}

impl<K: GroupKey> ToggleRecord<K> {
    pub fn new(name: K, state: bool) -> Self {
        ToggleRecord {
            name,
            state,
            sequence: next_sequence(),
        }
    }

    /// Creation order among all records; later records compare greater.
    /// Clones share the sequence of their source.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Record that enables the group.
    pub fn enable(name: K) -> Self {
        Self::new(name, true)
    }

    /// Record that disables the group.
    pub fn disable(name: K) -> Self {
        Self::new(name, false)
    }
}

/// Spawn a toggle record entity in `world` and return it.
pub fn send_toggle<K: GroupKey>(world: &mut World, name: K, state: bool) -> Entity {
    world.spawn(ToggleRecord::new(name, state)).id()
}
