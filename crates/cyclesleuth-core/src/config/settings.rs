//! Pipeline settings.
//!
//! Loaded from an optional JSON file; every field missing from the file
//! takes its default. Relative paths are resolved against a base
//! directory with [`PipelineSettings::with_base_dir`].
use crate::error::{CoreError, Result};
use crate::scanner::{CellPosition, LogPattern, PatternSet};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Series documents written by the extractor.
    pub extracted_dir: PathBuf,
    /// Sorter output base; one folder per workstation.
    pub sorted_dir: PathBuf,
    /// Comparison tables and `metadata.json`.
    pub form_dir: PathBuf,
    /// The file-backed index store.
    pub index_path: PathBuf,
    /// Files the sorter redistributes.
    pub log_patterns: Vec<String>,
    /// Cycle-time records.
    pub cycle_pattern: String,
    pub value_row: usize,
    pub value_col: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            extracted_dir: PathBuf::from("extracted_data"),
            sorted_dir: PathBuf::from("data/output/sort_logs"),
            form_dir: PathBuf::from("data/output/form"),
            index_path: PathBuf::from("data/output/important_index.txt"),
            log_patterns: vec![
                "*cycleTime.csv".into(),
                "*host.log".into(),
                "*device.log".into(),
                "*serial.log".into(),
            ],
            cycle_pattern: "*cycleTime.csv".into(),
            value_row: 7,
            value_col: 1,
        }
    }
}

impl PipelineSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        let settings: Self = serde_json::from_str(&text).map_err(|e| CoreError::json(path, e))?;
        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Settings from `path` when given, defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    /// Resolve every relative path against `base`.
    pub fn with_base_dir(mut self, base: &Path) -> Self {
        for dir in [
            &mut self.extracted_dir,
            &mut self.sorted_dir,
            &mut self.form_dir,
            &mut self.index_path,
        ] {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }
        self
    }

    pub fn cell(&self) -> CellPosition {
        CellPosition {
            row: self.value_row,
            col: self.value_col,
        }
    }

    pub fn log_pattern_set(&self) -> Result<PatternSet> {
        PatternSet::new(self.log_patterns.as_slice())
    }

    pub fn cycle_log_pattern(&self) -> Result<LogPattern> {
        LogPattern::new(&self.cycle_pattern)
    }

    /// `<form_dir>/metadata.json`.
    pub fn metadata_path(&self) -> PathBuf {
        self.form_dir.join(crate::metadata::METADATA_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Fields absent from the file keep their defaults.
    #[test]
    fn partial_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, r#"{ "value_row": 3, "sorted_dir": "/abs/sorted" }"#).unwrap();

        let s = PipelineSettings::load(&path).unwrap();
        assert_eq!(s.cell(), CellPosition { row: 3, col: 1 });
        assert_eq!(s.sorted_dir, PathBuf::from("/abs/sorted"));
        assert_eq!(s.cycle_pattern, "*cycleTime.csv");
        assert_eq!(s.log_patterns.len(), 4);
    }

    #[test]
    fn base_dir_resolves_relative_paths_only() {
        let s = PipelineSettings {
            sorted_dir: PathBuf::from("/abs/sorted"),
            ..PipelineSettings::default()
        }
        .with_base_dir(Path::new("/work"));
        assert_eq!(s.extracted_dir, PathBuf::from("/work/extracted_data"));
        assert_eq!(s.sorted_dir, PathBuf::from("/abs/sorted"));
        assert_eq!(s.index_path, PathBuf::from("/work/data/output/important_index.txt"));
        assert_eq!(s.metadata_path(), PathBuf::from("/work/data/output/form/metadata.json"));
    }

    #[test]
    fn invalid_json_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(PipelineSettings::load(&path), Err(CoreError::Json { .. })));
    }
}
