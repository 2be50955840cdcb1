//! Extracted series documents under `extracted_dir`.
//!
//! - `<ws>_restore_times.json`: `{ "<ws>": [seconds, ...] }`
//! - `<ws>_restore_times.txt`: human-readable summary
//! - `<ws>_iterations.json`: every sample with its index and timestamp,
//!   the numbering the sorter follows
//! - `all_restore_times.json`: every workstation, merged by key
//!
//! These let the statistics and sorting stages run in a separate
//! invocation from the extractor.
use crate::classifier::reset_dir;
use crate::error::{CoreError, Result};
use crate::model::format::format_seconds;
use crate::model::{Sample, TimeSeries, WorkstationId};
use serde_json::{Map, Value};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const MERGED_FILE: &str = "all_restore_times.json";

/// Reads and writes series documents in one directory.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    dir: PathBuf,
}

impl SeriesStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn json_path(&self, workstation: &WorkstationId) -> PathBuf {
        self.dir
            .join(format!("{}_restore_times.json", workstation.file_stem()))
    }

    pub fn summary_path(&self, workstation: &WorkstationId) -> PathBuf {
        self.dir
            .join(format!("{}_restore_times.txt", workstation.file_stem()))
    }

    pub fn iterations_path(&self, workstation: &WorkstationId) -> PathBuf {
        self.dir
            .join(format!("{}_iterations.json", workstation.file_stem()))
    }

    pub fn merged_path(&self) -> PathBuf {
        self.dir.join(MERGED_FILE)
    }

    /// Write the per-workstation documents and merge into the combined one.
    pub fn save(&self, series: &TimeSeries, folder: &Path) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| CoreError::io(&self.dir, e))?;
        let values = series.values();
        let ws = &series.workstation;

        let mut doc = Map::new();
        doc.insert(ws.to_string(), Value::from(values.clone()));
        write_json(&self.json_path(ws), &Value::Object(doc))?;

        let iterations_path = self.iterations_path(ws);
        let samples = serde_json::to_value(&series.samples)
            .map_err(|e| CoreError::json(&iterations_path, e))?;
        write_json(&iterations_path, &samples)?;

        let summary_path = self.summary_path(ws);
        fs::write(&summary_path, summary(series, folder))
            .map_err(|e| CoreError::io(&summary_path, e))?;

        let merged_path = self.merged_path();
        let mut merged = match read_json(&merged_path)? {
            Some(Value::Object(map)) => map,
            Some(_) => {
                warn!("{} is not a JSON object, rewriting it", merged_path.display());
                Map::new()
            }
            None => Map::new(),
        };
        merged.insert(ws.to_string(), Value::from(values));
        write_json(&merged_path, &Value::Object(merged))?;

        info!(
            "Saved {} restore times for {ws} to {}",
            series.len(),
            self.dir.display()
        );
        Ok(())
    }

    /// Values of one workstation: its own document first, then the
    /// merged one. `None` when neither has it.
    pub fn load(&self, workstation: &WorkstationId) -> Result<Option<Vec<f64>>> {
        for path in [self.json_path(workstation), self.merged_path()] {
            let Some(doc) = read_json(&path)? else {
                continue;
            };
            if let Some(values) = doc.get(workstation.as_str()) {
                debug!("Loaded series for {workstation} from {}", path.display());
                return values_of(&path, values).map(Some);
            }
        }
        Ok(None)
    }

    /// The full series of one workstation, indices and timestamps
    /// included. `None` when it was never extracted.
    pub fn load_series(&self, workstation: &WorkstationId) -> Result<Option<TimeSeries>> {
        let path = self.iterations_path(workstation);
        let Some(doc) = read_json(&path)? else {
            return Ok(None);
        };
        let samples: Vec<Sample> =
            serde_json::from_value(doc).map_err(|e| CoreError::json(&path, e))?;
        let series = TimeSeries {
            workstation: workstation.clone(),
            samples,
        };
        if !series.is_well_ordered() {
            return Err(CoreError::Document {
                path,
                reason: "samples are not numbered 1..N in timestamp order".into(),
            });
        }
        debug!("Loaded {} samples for {workstation} from {}", series.len(), path.display());
        Ok(Some(series))
    }

    /// Every workstation of the merged document, in document order.
    pub fn load_all(&self) -> Result<Vec<(WorkstationId, Vec<f64>)>> {
        let path = self.merged_path();
        let Some(doc) = read_json(&path)? else {
            return Ok(Vec::new());
        };
        let Value::Object(map) = doc else {
            return Err(CoreError::Document {
                path,
                reason: "expected an object of workstation series".into(),
            });
        };
        map.iter()
            .map(|(ws, values)| Ok((WorkstationId::new(ws), values_of(&path, values)?)))
            .collect()
    }

    /// Empty the directory. Returns the number of entries removed.
    pub fn clear(&self) -> Result<usize> {
        let outcome = reset_dir(&self.dir)?;
        if outcome.errors > 0 {
            warn!(
                "{} entries of {} could not be removed",
                outcome.errors,
                self.dir.display()
            );
        }
        Ok(outcome.removed)
    }
}

fn values_of(path: &Path, value: &Value) -> Result<Vec<f64>> {
    serde_json::from_value(value.clone()).map_err(|e| CoreError::json(path, e))
}

fn read_json(path: &Path) -> Result<Option<Value>> {
    match fs::read_to_string(path) {
        Ok(text) => serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| CoreError::json(path, e)),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(CoreError::io(path, err)),
    }
}

pub(crate) fn write_json(path: &Path, value: &Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CoreError::json(path, e))?;
    fs::write(path, text).map_err(|e| CoreError::io(path, e))
}

fn summary(series: &TimeSeries, folder: &Path) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Workstation: {}", series.workstation);
    let _ = writeln!(out, "Folder: {}", folder.display());
    let _ = writeln!(out, "Restore times: {}", series.len());
    for sample in &series.samples {
        let _ = writeln!(
            out,
            "  #{} {}  {}",
            sample.index.padded(),
            sample.timestamp.format("%Y-%m-%d %H:%M:%S"),
            format_seconds(sample.value)
        );
    }
    out
}
