//! Gated system groups and sweep systems for `bevy_ecs` worlds.
//!
//! This crate adds two scheduling primitives on top of `bevy_ecs`:
//!
//! - [`GroupSystem`](systems::group::GroupSystem) bundles an ordered list of
//!   nested systems behind a runtime on/off switch. The switch is flipped by
//!   writing a [`ToggleRecord`](events::grouptoggle::ToggleRecord) component
//!   into the group's event world.
//! - [`SweepSystem`](systems::sweep::SweepSystem) deletes every instance of a
//!   component type from a world each tick.
//!
//! Both run inside a [`Pipeline`](pipeline::Pipeline), which owns a set of
//! named worlds and drives the five lifecycle phases of its systems
//! (pre-init, init, run, destroy, post-destroy).
//!
//! # Project Structure
//!
//! - [`error`] – error kinds shared by every lifecycle call
//! - [`events`] – toggle records sent to groups
//! - [`pipeline`] – the driver and its registration helpers
//! - [`resources`] – INI-backed pipeline configuration
//! - [`system`] – lifecycle capability traits
//! - [`systems`] – group and sweep systems
//! - [`worlds`] – named world registry and the empty-entity check

pub mod error;
pub mod events;
pub mod pipeline;
pub mod resources;
pub mod system;
pub mod systems;
pub mod worlds;
