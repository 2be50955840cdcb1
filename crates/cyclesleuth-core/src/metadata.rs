//! The metadata document (`metadata.json`) that downstream reporting
//! reads: test-level fields, one entry per workstation with its headline
//! statistics, and the paths of produced tables.
use crate::analysis::StatisticsSummary;
use crate::config::WorkstationConfig;
use crate::error::{CoreError, Result};
use crate::model::format::format_stat;
use crate::model::WorkstationId;
use crate::series::write_json;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const METADATA_FILE: &str = "metadata.json";

pub const BOXPLOT_NOTE: &str = "Outliers are determined based on the boxplot method, \
where a data point is considered an outlier if it is greater than Q3 + 1.5×IQR \
or less than Q1 - 1.5×IQR.";

pub const MEDIAN_FIELD: &str = "Median Times(s)";
pub const AVG_FIELD: &str = "Avg Time(s)";
pub const MIN_FIELD: &str = "Min Time(s)";
pub const MAX_FIELD: &str = "Max Time(s)";
pub const RANGE_FIELD: &str = "Range(s)";
pub const STD_FIELD: &str = "Std(s)";
pub const OUTLIER_FIELD: &str = "Outlier Count";
pub const REMARK_FIELD: &str = "Remark";

const STAT_FIELDS: [&str; 8] = [
    MEDIAN_FIELD,
    AVG_FIELD,
    MIN_FIELD,
    MAX_FIELD,
    RANGE_FIELD,
    STD_FIELD,
    OUTLIER_FIELD,
    REMARK_FIELD,
];

/// A `Test Date` of bare `YYYY-MM-DD` gets a midnight time appended.
fn normalise_test_date(metadata: &mut Map<String, Value>) {
    if let Some(Value::String(date)) = metadata.get_mut("Test Date") {
        if date.chars().count() == 10 {
            date.push_str(" 00:00:00");
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetadataDocument {
    path: PathBuf,
}

impl MetadataDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a fresh document for `config`, replacing any previous one.
    pub fn create(&self, config: &WorkstationConfig) -> Result<()> {
        let mut doc = Map::new();
        if let Some(meta) = &config.metadata {
            let mut meta = meta.clone();
            normalise_test_date(&mut meta);
            doc.insert("metadata_dict".into(), Value::Object(meta));
        }

        for ws in &config.workstations {
            let mut entry = ws.fields.clone();
            for field in STAT_FIELDS {
                entry.insert(field.into(), Value::String(String::new()));
            }
            entry.insert("path".into(), Value::Object(Map::new()));
            doc.insert(ws.id.to_string(), Value::Object(entry));
        }

        doc.insert("note".into(), Value::String(BOXPLOT_NOTE.into()));
        let mut paths = Map::new();
        paths.insert("json".into(), Value::String(self.path.display().to_string()));
        if let Some(form) = self.path.parent() {
            paths.insert("form".into(), Value::String(form.display().to_string()));
        }
        doc.insert("path".into(), Value::Object(paths));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }
        write_json(&self.path, &Value::Object(doc))?;
        info!(
            "Created metadata for {} workstations at {}",
            config.workstations.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Fill the statistics fields of one workstation.
    ///
    /// Returns `false`, with a warning, when the document or the
    /// workstation's entry does not exist.
    pub fn record_statistics(
        &self,
        workstation: &WorkstationId,
        summary: &StatisticsSummary,
    ) -> Result<bool> {
        let values = [
            (MEDIAN_FIELD, format_stat(summary.median)),
            (AVG_FIELD, format_stat(summary.mean)),
            (MIN_FIELD, format_stat(summary.min)),
            (MAX_FIELD, format_stat(summary.max)),
            (RANGE_FIELD, format_stat(summary.range)),
            (STD_FIELD, format_stat(summary.std_dev)),
            (OUTLIER_FIELD, summary.outliers.len().to_string()),
            (REMARK_FIELD, summary.remark()),
        ];
        self.update_entry(workstation, |entry| {
            for (field, value) in values {
                entry.insert(field.into(), Value::String(value));
            }
        })
    }

    /// Record a produced file under the workstation's `path` object.
    pub fn record_path(&self, workstation: &WorkstationId, key: &str, path: &Path) -> Result<bool> {
        let path = path.display().to_string();
        self.update_entry(workstation, |entry| {
            let paths = entry
                .entry("path")
                .or_insert_with(|| Value::Object(Map::new()));
            if !paths.is_object() {
                *paths = Value::Object(Map::new());
            }
            if let Value::Object(paths) = paths {
                paths.insert(key.into(), Value::String(path));
            }
        })
    }

    fn update_entry<F>(&self, workstation: &WorkstationId, update: F) -> Result<bool>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!("No metadata document at {}, skipping update", self.path.display());
                return Ok(false);
            }
            Err(err) => return Err(CoreError::io(&self.path, err)),
        };
        let mut doc: Value =
            serde_json::from_str(&text).map_err(|e| CoreError::json(&self.path, e))?;

        let Some(Value::Object(entry)) = doc.get_mut(workstation.as_str()) else {
            warn!(
                "Workstation {workstation} not present in {}, skipping update",
                self.path.display()
            );
            return Ok(false);
        };
        update(entry);
        write_json(&self.path, &doc)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn config() -> WorkstationConfig {
        WorkstationConfig::from_document(
            Path::new("info.json"),
            json!({
                "metadata_dict": { "Test Date": "2024-03-01", "Tester": "QA" },
                "WS-1": { "Folder Name": "/raw/1", "Model": "X1" },
            }),
        )
        .unwrap()
    }

    fn read(doc: &MetadataDocument) -> Value {
        serde_json::from_str(&fs::read_to_string(doc.path()).unwrap()).unwrap()
    }

    /// Fresh entries carry empty statistics and keep the source fields.
    #[test]
    fn create_builds_empty_entries() {
        let tmp = TempDir::new().unwrap();
        let doc = MetadataDocument::new(tmp.path().join("form").join(METADATA_FILE));
        doc.create(&config()).unwrap();

        let v = read(&doc);
        assert_eq!(v["metadata_dict"]["Test Date"], "2024-03-01 00:00:00");
        assert_eq!(v["WS-1"]["Model"], "X1");
        assert_eq!(v["WS-1"][MEDIAN_FIELD], "");
        assert_eq!(v["WS-1"]["path"], json!({}));
        assert_eq!(v["note"], BOXPLOT_NOTE);
    }

    #[test]
    fn statistics_are_two_decimal_strings() {
        let tmp = TempDir::new().unwrap();
        let doc = MetadataDocument::new(tmp.path().join(METADATA_FILE));
        doc.create(&config()).unwrap();

        let summary = StatisticsSummary::compute(&[10.0, 11.0, 12.5]);
        let ws = WorkstationId::new("WS-1");
        assert!(doc.record_statistics(&ws, &summary).unwrap());

        let v = read(&doc);
        assert_eq!(v["WS-1"][MEDIAN_FIELD], "11.00");
        assert_eq!(v["WS-1"][MAX_FIELD], "12.50");
        assert_eq!(v["WS-1"][RANGE_FIELD], "2.50");
        assert_eq!(v["WS-1"][OUTLIER_FIELD], "0");
        assert_eq!(v["WS-1"][REMARK_FIELD], "Min at loops: 1; Max at loops: 3");
    }

    #[test]
    fn record_path_adds_to_path_object() {
        let tmp = TempDir::new().unwrap();
        let doc = MetadataDocument::new(tmp.path().join(METADATA_FILE));
        doc.create(&config()).unwrap();

        let ws = WorkstationId::new("WS-1");
        assert!(doc.record_path(&ws, "comparison", Path::new("/form/WS-1.csv")).unwrap());
        assert_eq!(read(&doc)["WS-1"]["path"]["comparison"], "/form/WS-1.csv");

        assert!(!doc.record_path(&WorkstationId::new("WS-9"), "x", Path::new("/y")).unwrap());
    }

    /// A missing document is skipped, not an error.
    #[test]
    fn missing_document_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let doc = MetadataDocument::new(tmp.path().join(METADATA_FILE));
        let summary = StatisticsSummary::compute(&[1.0]);
        assert!(!doc.record_statistics(&WorkstationId::new("WS-1"), &summary).unwrap());
    }
}
