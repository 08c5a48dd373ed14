//! Event types exchanged through world storage.
//!
//! Events here are components spawned on throwaway entities, so senders and
//! receivers only share a world, never a reference to each other.
//!
//! Submodules:
//! - [`grouptoggle`] – requests to switch a group system on or off
pub mod grouptoggle;
