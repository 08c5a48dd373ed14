//! Error types for pipeline construction and lifecycle calls.
//!
//! Every error here is a programming-error signal meant to halt the pipeline,
//! never a transient condition: nothing in this crate retries. Errors fall into
//! two kinds, see [`ErrorKind`].

use thiserror::Error;

use crate::system::Phase;

/// Broad classification of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Raised synchronously while building or driving the pipeline with
    /// invalid arguments (empty group name, empty system list, unknown world).
    Configuration,
    /// Raised after a lifecycle call left an entity with zero components.
    InvariantViolation,
}

/// Errors raised by groups, sweeps and the pipeline driver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Group identity key is blank.
    #[error("group name can't be null or empty")]
    EmptyGroupName,

    /// Group was built without nested systems.
    #[error("systems list of group {group} can't be null or empty")]
    EmptyGroup { group: String },

    /// A world name could not be resolved.
    #[error("requested world \"{0}\" not found")]
    WorldNotFound(String),

    /// A registered world was replaced after `Pipeline::init`.
    #[error("world \"{0}\" can't be replaced after init")]
    WorldLocked(String),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),

    /// `Pipeline::init` was called twice.
    #[error("pipeline already initialized")]
    AlreadyInitialized,

    /// A phase that needs a prior `PreInit`/`init` ran without it.
    #[error("{system} used before PreInit()")]
    NotInitialized { system: String },

    /// Lifecycle call on a pipeline that was already torn down.
    #[error("pipeline already destroyed")]
    AlreadyDestroyed,

    /// An entity with zero components was found after a lifecycle call.
    #[error("empty entity detected in world \"{world}\" after {system}.{phase}()")]
    LeakedEntity {
        world: String,
        system: String,
        phase: Phase,
    },
}

impl PipelineError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::LeakedEntity { .. } => ErrorKind::InvariantViolation,
            _ => ErrorKind::Configuration,
        }
    }
}

/// Result alias used by every lifecycle call.
pub type PipelineResult<T> = Result<T, PipelineError>;
