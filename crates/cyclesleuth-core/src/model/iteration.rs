//! Identity types: workstations and chronological iteration indices.
use crate::error::InvalidWorkstationId;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

/// A logical test rig, identified by its configuration key (e.g. `WS-1`).
///
/// Workstation keys are short and copied into every tag, sample and map
/// key, so they are stored inline as a `CompactString`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkstationId(CompactString);

impl WorkstationId {
    pub fn new(id: &str) -> Self {
        Self(CompactString::new(id.trim()))
    }

    /// Like [`WorkstationId::new`], but rejects keys that cannot name an
    /// output folder of their own.
    pub fn parse(id: &str) -> Result<Self, InvalidWorkstationId> {
        let ws = Self::new(id);
        if ws.0.is_empty() {
            return Err(InvalidWorkstationId {
                id: id.to_string(),
                reason: "empty after trimming",
            });
        }
        Ok(ws)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// File-name-safe rendering: anything outside `[A-Za-z0-9_-]` becomes `_`.
    pub fn file_stem(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl fmt::Display for WorkstationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkstationId {
    type Err = InvalidWorkstationId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<&str> for WorkstationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl Borrow<str> for WorkstationId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

/// 1-based position of an iteration in a workstation's chronological run.
///
/// Index 1 is the earliest timestamp with a usable sample. The extractor
/// assigns these; the sorter looks them up through
/// [`IterationNumbering`](crate::scanner::IterationNumbering), so an index
/// written by the statistics pass names the same iteration folder the
/// sorter later creates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IterationIndex(pub u32);

impl IterationIndex {
    /// Build an index from a 0-based position (`position + 1`).
    #[inline]
    pub fn from_position(position: usize) -> Self {
        debug_assert!(position < u32::MAX as usize, "IterationIndex overflow");
        Self(position as u32 + 1)
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    /// 0-based position for slice indexing.
    #[inline]
    pub fn position(self) -> usize {
        self.0.saturating_sub(1) as usize
    }

    /// Zero-padded three-digit form used in sorted file and folder names.
    pub fn padded(self) -> String {
        format!("{:03}", self.0)
    }
}

impl fmt::Display for IterationIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
