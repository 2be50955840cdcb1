//! Role tags attached to iteration indices in the index store.
use super::iteration::{IterationIndex, WorkstationId};
use std::fmt;

/// Why an iteration was flagged.
///
/// Variants are declared in lexicographic order of their names so the
/// derived `Ord` matches the order roles are joined in folder names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Abnormal,
    Max,
    Median,
    Min,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Abnormal, Role::Max, Role::Median, Role::Min];

    /// Lowercase wire name, as stored in the index file.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Abnormal => "abnormal",
            Self::Max => "max",
            Self::Median => "median",
            Self::Min => "min",
        }
    }

    /// Parse a wire name. Case and surrounding whitespace are ignored;
    /// unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "abnormal" => Some(Self::Abnormal),
            "max" => Some(Self::Max),
            "median" => Some(Self::Median),
            "min" => Some(Self::Min),
            _ => None,
        }
    }

    /// Roles the comparator builds columns for.
    pub fn is_compared(self) -> bool {
        !matches!(self, Self::Median)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(workstation, role, iteration)` record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IndexTag {
    pub workstation: WorkstationId,
    pub role: Role,
    pub index: IterationIndex,
}

impl IndexTag {
    pub fn new(workstation: WorkstationId, role: Role, index: IterationIndex) -> Self {
        Self {
            workstation,
            role,
            index,
        }
    }
}
