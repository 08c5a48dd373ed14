//! Lifecycle capability traits.
//!
//! A **system** is a unit of behavior registered into a
//! [`Pipeline`](crate::pipeline::Pipeline). It may take part in any subset of
//! five lifecycle phases:
//!
//! | Phase | Trait | Order inside a group |
//! |-------|-------|----------------------|
//! | pre-init | [`PreInitSystem`] | registration order |
//! | init | [`InitSystem`] | registration order |
//! | run (every tick) | [`RunSystem`] | registration order |
//! | destroy | [`DestroySystem`] | reverse registration order |
//! | post-destroy | [`PostDestroySystem`] | reverse registration order |
//!
//! Every system implements the [`System`] base trait. A system opts into a
//! phase by implementing the phase trait and overriding the matching probe on
//! [`System`] so that it returns `Some(self)`:
//!
//! ```ignore
//! struct Draw;
//!
//! impl RunSystem for Draw {
//!     fn run(&mut self, worlds: &mut Worlds) -> PipelineResult<()> {
//!         Ok(())
//!     }
//! }
//!
//! impl System for Draw {
//!     fn as_run(&mut self) -> Option<&mut dyn RunSystem> {
//!         Some(self)
//!     }
//! }
//! ```
//!
//! Containers such as [`GroupSystem`](crate::systems::group::GroupSystem) probe
//! each nested system once, at construction, and keep per-phase index lists.

use std::fmt;

use crate::error::PipelineResult;
use crate::worlds::Worlds;

/// One of the five lifecycle phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    PreInit,
    Init,
    Run,
    Destroy,
    PostDestroy,
}

impl Phase {
    /// All phases in the order a pipeline goes through them.
    pub const ALL: [Phase; 5] = [
        Phase::PreInit,
        Phase::Init,
        Phase::Run,
        Phase::Destroy,
        Phase::PostDestroy,
    ];

    /// `true` for the two teardown phases, which cascade in reverse order.
    pub fn is_teardown(self) -> bool {
        matches!(self, Phase::Destroy | Phase::PostDestroy)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::PreInit => "PreInit",
            Phase::Init => "Init",
            Phase::Run => "Run",
            Phase::Destroy => "Destroy",
            Phase::PostDestroy => "PostDestroy",
        };
        f.write_str(name)
    }
}

/// Called once before [`InitSystem::init`], in registration order.
pub trait PreInitSystem {
    fn pre_init(&mut self, worlds: &mut Worlds) -> PipelineResult<()>;
}

/// Called once after every system went through pre-init.
pub trait InitSystem {
    fn init(&mut self, worlds: &mut Worlds) -> PipelineResult<()>;
}

/// Called every tick.
pub trait RunSystem {
    fn run(&mut self, worlds: &mut Worlds) -> PipelineResult<()>;
}

/// Called once on teardown, in reverse registration order.
pub trait DestroySystem {
    fn destroy(&mut self, worlds: &mut Worlds) -> PipelineResult<()>;
}

/// Called once after every system went through destroy, in reverse order.
pub trait PostDestroySystem {
    fn post_destroy(&mut self, worlds: &mut Worlds) -> PipelineResult<()>;
}

/// Base trait of every registered system.
///
/// The probes default to `None`; override the ones matching the phase traits
/// the type implements.
pub trait System: 'static {
    /// Name used in log lines and error messages.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    fn as_pre_init(&mut self) -> Option<&mut dyn PreInitSystem> {
        None
    }

    fn as_init(&mut self) -> Option<&mut dyn InitSystem> {
        None
    }

    fn as_run(&mut self) -> Option<&mut dyn RunSystem> {
        None
    }

    fn as_destroy(&mut self) -> Option<&mut dyn DestroySystem> {
        None
    }

    fn as_post_destroy(&mut self) -> Option<&mut dyn PostDestroySystem> {
        None
    }

    /// Returns `true` if this system takes part in `phase`.
    fn implements(&mut self, phase: Phase) -> bool {
        match phase {
            Phase::PreInit => self.as_pre_init().is_some(),
            Phase::Init => self.as_init().is_some(),
            Phase::Run => self.as_run().is_some(),
            Phase::Destroy => self.as_destroy().is_some(),
            Phase::PostDestroy => self.as_post_destroy().is_some(),
        }
    }
}

/// Invokes `phase` on `system` if it implements it.
///
/// Returns `Ok(false)` when the system does not take part in the phase.
pub(crate) fn call_phase(
    system: &mut dyn System,
    phase: Phase,
    worlds: &mut Worlds,
) -> PipelineResult<bool> {
    match phase {
        Phase::PreInit => match system.as_pre_init() {
            Some(s) => s.pre_init(worlds).map(|_| true),
            None => Ok(false),
        },
        Phase::Init => match system.as_init() {
            Some(s) => s.init(worlds).map(|_| true),
            None => Ok(false),
        },
        Phase::Run => match system.as_run() {
            Some(s) => s.run(worlds).map(|_| true),
            None => Ok(false),
        },
        Phase::Destroy => match system.as_destroy() {
            Some(s) => s.destroy(worlds).map(|_| true),
            None => Ok(false),
        },
        Phase::PostDestroy => match system.as_post_destroy() {
            Some(s) => s.post_destroy(worlds).map(|_| true),
            None => Ok(false),
        },
    }
}

// "my_crate::systems::Draw<alloc::string::String>" -> "Draw<alloc::string::String>"
fn short_type_name(full: &'static str) -> &'static str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}
