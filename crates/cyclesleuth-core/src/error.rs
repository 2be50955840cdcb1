//! Error types for the CycleSleuth engine.
//!
//! Only failures that stop a stage are errors. Unparseable records,
//! missing per-iteration files and per-item copy/delete failures are
//! logged and counted in the stage reports instead.
use crate::model::{IterationIndex, WorkstationId};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// I/O and document failures, always carrying the path involved.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("CSV error on {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid file pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("invalid document {}: {reason}", path.display())]
    Document { path: PathBuf, reason: String },

    #[error(transparent)]
    Workstation(#[from] InvalidWorkstationId),
}

/// A workstation key that cannot be used as an output folder name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid workstation id `{id}`: {reason}")]
pub struct InvalidWorkstationId {
    pub id: String,
    pub reason: &'static str,
}

impl CoreError {
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn csv(path: impl AsRef<Path>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// A failed pipeline stage. These halt a full run because every later
/// stage depends on at least one extracted sample.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no workstations configured")]
    NoWorkstations,

    #[error("workstation {workstation}: raw folder {} does not exist", path.display())]
    MissingRawFolder {
        workstation: WorkstationId,
        path: PathBuf,
    },

    #[error("workstation {workstation}: no restore iterations found in {}", folder.display())]
    NoIterations {
        workstation: WorkstationId,
        folder: PathBuf,
    },

    #[error("workstation {workstation}: no extracted series found, run extraction first")]
    MissingSeries { workstation: WorkstationId },

    #[error("workstations {first} and {second} both write to output folder `{stem}`")]
    DuplicateWorkstation {
        first: WorkstationId,
        second: WorkstationId,
        stem: String,
    },

    #[error(
        "workstation {workstation}: extracted iterations [{}] have no log files to sort",
        join_indices(missing)
    )]
    IndexMismatch {
        workstation: WorkstationId,
        missing: Vec<IterationIndex>,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}

fn join_indices(indices: &[IterationIndex]) -> String {
    indices
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl PipelineError {
    /// Configuration errors are the class that halts a multi-stage run.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::Core(_))
    }
}
