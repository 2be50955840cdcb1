//! Scanner module: raw log discovery and per-iteration extraction.
//!
//! - [`walk`]: recursive, pattern-filtered file discovery (`jwalk`).
//! - [`patterns`]: `globset` file-name patterns.
//! - [`chronology`]: timestamp tokens, the chronological indexer and the
//!   series-derived numbering.
//! - [`record`]: cycle-time record parsing.
//! - [`extractor`]: one restore-duration sample per iteration.
pub mod chronology;
pub mod extractor;
pub mod patterns;
pub mod record;
pub mod walk;

pub use chronology::{
    group_by_stamp, index_by_time, timestamp_of, IterationGroup, IterationNumbering, Stamp,
};
pub use extractor::{Extraction, Extractor};
pub use patterns::{LogPattern, PatternSet};
pub use record::{read_stages, read_value, CellPosition, RecordError, StageTimes};
pub use walk::{find_files, WalkOutcome};
