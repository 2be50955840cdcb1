//! Chronologically ordered restore-time samples for one workstation.
use super::iteration::{IterationIndex, WorkstationId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One restore iteration's measured duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub index: IterationIndex,
    /// Parsed `YYYY-MM-DD_HH-MM-SS` token of the iteration.
    pub timestamp: NaiveDateTime,
    /// Restore duration in seconds.
    pub value: f64,
    /// Cycle-time record the value was read from.
    pub source: PathBuf,
}

/// The extractor's output: samples sorted by ascending timestamp with
/// contiguous indices `1..=N`.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    pub workstation: WorkstationId,
    pub samples: Vec<Sample>,
}

impl TimeSeries {
    pub fn new(workstation: WorkstationId) -> Self {
        Self {
            workstation,
            samples: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Raw values in iteration order, for the statistics engine.
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    /// `(index, value)` pairs in iteration order.
    pub fn indexed_values(&self) -> Vec<(IterationIndex, f64)> {
        self.samples.iter().map(|s| (s.index, s.value)).collect()
    }

    /// Check the contiguous-from-1, strictly-ascending-timestamp invariant.
    pub fn is_well_ordered(&self) -> bool {
        self.samples
            .iter()
            .enumerate()
            .all(|(pos, s)| s.index == IterationIndex::from_position(pos))
            && self
                .samples
                .windows(2)
                .all(|w| w[0].timestamp < w[1].timestamp)
    }
}
