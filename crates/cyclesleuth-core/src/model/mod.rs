//! Data model for CycleSleuth.
//!
//! Re-exports the iteration/sample types, role tags and the number
//! formatting helpers used when values leave the engine.
pub mod format;
pub mod iteration;
pub mod role;
pub mod series;

pub use iteration::{IterationIndex, WorkstationId};
pub use role::{IndexTag, Role};
pub use series::{Sample, TimeSeries};
