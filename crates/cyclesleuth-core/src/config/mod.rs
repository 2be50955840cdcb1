//! Configuration: pipeline settings and the workstation document.
pub mod settings;
pub mod workstations;

pub use settings::PipelineSettings;
pub use workstations::{WorkstationConfig, WorkstationEntry};
