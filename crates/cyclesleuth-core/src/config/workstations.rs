//! The workstation document (`info.json`).
//!
//! ```json
//! {
//!   "metadata_dict": { "Test Date": "2024-03-01", "Tester": "..." },
//!   "WS-1": { "Folder Name": "/raw/ws1", "Model": "..." },
//!   "WS-2": { "Folder Name": "/raw/ws2" }
//! }
//! ```
//!
//! Every top-level key starting with `WS-` is a workstation, in document
//! order. Extra fields are kept and copied into the metadata document.
use crate::error::{CoreError, Result};
use crate::model::WorkstationId;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const WORKSTATION_PREFIX: &str = "WS-";
pub const FOLDER_KEY: &str = "Folder Name";
pub const METADATA_KEY: &str = "metadata_dict";

#[derive(Debug, Clone, PartialEq)]
pub struct WorkstationEntry {
    pub id: WorkstationId,
    /// Raw log folder.
    pub folder: PathBuf,
    /// Every field of the entry, `Folder Name` included.
    pub fields: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkstationConfig {
    pub workstations: Vec<WorkstationEntry>,
    /// Test-level fields, copied verbatim into the metadata document.
    pub metadata: Option<Map<String, Value>>,
}

impl WorkstationConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
        let doc: Value = serde_json::from_str(&text).map_err(|e| CoreError::json(path, e))?;
        Self::from_document(path, doc)
    }

    /// Interpret an already-parsed document. `path` is only used in errors.
    pub fn from_document(path: &Path, doc: Value) -> Result<Self> {
        let Value::Object(root) = doc else {
            return Err(CoreError::Document {
                path: path.to_path_buf(),
                reason: "expected a JSON object at the top level".into(),
            });
        };

        let mut config = Self::default();
        for (key, value) in root {
            if key == METADATA_KEY {
                match value {
                    Value::Object(map) => config.metadata = Some(map),
                    _ => warn!("{}: `{METADATA_KEY}` is not an object, ignored", path.display()),
                }
                continue;
            }
            if !key.starts_with(WORKSTATION_PREFIX) {
                continue;
            }
            let Value::Object(fields) = value else {
                warn!("{}: workstation {key} is not an object, skipped", path.display());
                continue;
            };
            let Some(folder) = fields.get(FOLDER_KEY).and_then(Value::as_str) else {
                warn!("{}: workstation {key} has no `{FOLDER_KEY}`, skipped", path.display());
                continue;
            };
            config.workstations.push(WorkstationEntry {
                id: WorkstationId::new(&key),
                folder: PathBuf::from(folder),
                fields,
            });
        }
        Ok(config)
    }

    pub fn is_empty(&self) -> bool {
        self.workstations.is_empty()
    }

    pub fn get(&self, id: &WorkstationId) -> Option<&WorkstationEntry> {
        self.workstations.iter().find(|w| &w.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(doc: Value) -> WorkstationConfig {
        WorkstationConfig::from_document(Path::new("info.json"), doc).unwrap()
    }

    /// Workstations come out in document order, other keys are ignored.
    #[test]
    fn workstations_in_document_order() {
        let config = parse(json!({
            "WS-B": { "Folder Name": "/raw/b" },
            "project": "restore",
            "WS-A": { "Folder Name": "/raw/a", "Model": "X1" },
        }));
        let ids: Vec<&str> = config.workstations.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids, vec!["WS-B", "WS-A"]);
        let a = config.get(&WorkstationId::new("WS-A")).unwrap();
        assert_eq!(a.folder, PathBuf::from("/raw/a"));
        assert_eq!(a.fields["Model"], "X1");
        assert!(config.metadata.is_none());
    }

    #[test]
    fn entry_without_folder_is_skipped() {
        let config = parse(json!({
            "WS-1": { "Model": "X1" },
            "WS-2": { "Folder Name": "/raw/2" },
        }));
        assert_eq!(config.workstations.len(), 1);
    }

    #[test]
    fn metadata_dict_is_kept() {
        let config = parse(json!({ "metadata_dict": { "Test Date": "2024-03-01" } }));
        assert!(config.is_empty());
        assert_eq!(config.metadata.unwrap()["Test Date"], "2024-03-01");
    }

    #[test]
    fn non_object_document_is_an_error() {
        let err =
            WorkstationConfig::from_document(Path::new("info.json"), json!([1, 2])).unwrap_err();
        assert!(matches!(err, CoreError::Document { .. }));
    }
}
