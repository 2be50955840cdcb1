//! CycleSleuth Core: restore cycle-time extraction, statistics and
//! log reclassification.
//!
//! This crate holds all of the pipeline logic and has no CLI
//! dependencies.
//!
//! # Modules
//!
//! - [`model`]: workstation and iteration identifiers, samples, roles.
//! - [`scanner`]: log discovery, timestamp indexing, the extractor.
//! - [`analysis`]: percentiles and per-workstation statistics.
//! - [`index_store`]: the shared `(workstation, role, index)` tag store.
//! - [`classifier`]: the sorter that regroups raw logs by iteration.
//! - [`comparison`]: min/max/abnormal comparison tables.
//! - [`series`] and [`metadata`]: documents passed between runs.
//! - [`config`]: pipeline settings and the workstation document.
//! - [`pipeline`]: per-stage entry points and the full run.
pub mod analysis;
pub mod classifier;
pub mod comparison;
pub mod config;
pub mod error;
pub mod index_store;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod scanner;
pub mod series;

pub use error::{CoreError, InvalidWorkstationId, PipelineError};
