//! Long-lived settings injected into a pipeline.
//!
//! Overview
//! - `pipelineconfig` – sanitize toggle and named worlds, loaded from INI
pub mod pipelineconfig;
