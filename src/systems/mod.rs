//! Reusable systems.
//!
//! Submodules overview
//! - [`group`] – run nested systems behind a toggle driven by event records
//! - [`sweep`] – delete every instance of a component type each tick

pub mod group;
pub mod sweep;
