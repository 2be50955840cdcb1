//! Cycle-time record files.
//!
//! A record is headerless and semicolon-separated. Each row is a
//! `stage label; seconds` pair; the total restore duration sits at a fixed
//! cell (row 7, column 1 by default). Blank lines do not count as rows.
use compact_str::CompactString;
use csv::{ByteRecord, ReaderBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Zero-based `(row, column)` of the restore duration in a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellPosition {
    pub row: usize,
    pub col: usize,
}

impl Default for CellPosition {
    fn default() -> Self {
        Self { row: 7, col: 1 }
    }
}

/// Why a record yielded no value. Always recoverable: the record is dropped.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("cannot read record: {0}")]
    Read(#[from] csv::Error),

    #[error("record has {rows} rows, value row {row} is missing")]
    TooFewRows { rows: usize, row: usize },

    #[error("row {row} has {cols} columns, value column {col} is missing")]
    TooFewColumns { row: usize, cols: usize, col: usize },

    #[error("value `{0}` is not a finite number")]
    NotNumeric(String),
}

fn reader(path: &Path) -> Result<csv::Reader<std::fs::File>, csv::Error> {
    ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
}

fn field_text(record: &ByteRecord, col: usize) -> Option<String> {
    record.get(col).map(|bytes| {
        String::from_utf8_lossy(bytes)
            .trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
            .to_string()
    })
}

/// Parse a cell as finite seconds. `NaN`/`inf` are rejected.
pub fn parse_seconds(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Read the duration cell at `pos`.
pub fn read_value(path: &Path, pos: CellPosition) -> Result<f64, RecordError> {
    let mut rdr = reader(path)?;
    let mut record = ByteRecord::new();
    let mut rows = 0usize;

    while rdr.read_byte_record(&mut record)? {
        if rows == pos.row {
            let text = field_text(&record, pos.col).ok_or(RecordError::TooFewColumns {
                row: pos.row,
                cols: record.len(),
                col: pos.col,
            })?;
            return parse_seconds(&text).ok_or(RecordError::NotNumeric(text));
        }
        rows += 1;
    }

    Err(RecordError::TooFewRows { rows, row: pos.row })
}

/// Per-stage durations of one record, in first-appearance order.
///
/// Rows whose value is empty or not numeric are dropped. A label that
/// appears more than once keeps its last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageTimes {
    entries: Vec<(CompactString, f64)>,
}

impl StageTimes {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l.as_str() == label)
            .map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), *v))
    }

    /// Lookup table for joining several records.
    pub fn to_map(&self) -> HashMap<&str, f64> {
        self.iter().collect()
    }
}

/// Read every `(stage; value)` row of a record.
pub fn read_stages(path: &Path) -> Result<StageTimes, RecordError> {
    let mut rdr = reader(path)?;
    let mut record = ByteRecord::new();
    let mut stages = StageTimes::default();
    let mut slot: HashMap<CompactString, usize> = HashMap::new();

    while rdr.read_byte_record(&mut record)? {
        let (Some(label), Some(value)) = (field_text(&record, 0), field_text(&record, 1)) else {
            continue;
        };
        let Some(value) = parse_seconds(&value) else {
            continue;
        };
        let label = CompactString::new(&label);
        match slot.get(&label) {
            Some(&i) => stages.entries[i].1 = value,
            None => {
                slot.insert(label.clone(), stages.entries.len());
                stages.entries.push((label, value));
            }
        }
    }

    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    fn record_with_total(total: &str) -> String {
        let mut body = String::from("Log Folder Path;C:\\logs\\run\n");
        for i in 1..7 {
            body.push_str(&format!("Stage {i};{i}.5\n"));
        }
        body.push_str(&format!("Total Restore Time;{total}\n"));
        body
    }

    #[test]
    fn reads_value_at_row_seven() {
        let tmp = TempDir::new().unwrap();
        let p = write(&tmp, "cycleTime.csv", &record_with_total("123.456"));
        let v = read_value(&p, CellPosition::default()).unwrap();
        assert_eq!(v, 123.456);
    }

    /// Blank lines are not rows.
    #[test]
    fn blank_lines_do_not_shift_rows() {
        let tmp = TempDir::new().unwrap();
        let body = record_with_total("9.5").replace("Stage 3;3.5\n", "Stage 3;3.5\n\n");
        let p = write(&tmp, "cycleTime.csv", &body);
        assert_eq!(read_value(&p, CellPosition::default()).unwrap(), 9.5);
    }

    #[test]
    fn short_record_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let p = write(&tmp, "cycleTime.csv", "a;1\nb;2\n");
        assert!(matches!(
            read_value(&p, CellPosition::default()),
            Err(RecordError::TooFewRows { rows: 2, row: 7 })
        ));
    }

    #[test]
    fn non_numeric_value_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let p = write(&tmp, "cycleTime.csv", &record_with_total("n/a"));
        assert!(matches!(
            read_value(&p, CellPosition::default()),
            Err(RecordError::NotNumeric(_))
        ));
    }

    #[test]
    fn missing_column_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let body = record_with_total("1.0").replace("Total Restore Time;1.0", "Total Restore Time");
        let p = write(&tmp, "cycleTime.csv", &body);
        assert!(matches!(
            read_value(&p, CellPosition::default()),
            Err(RecordError::TooFewColumns { .. })
        ));
    }

    #[test]
    fn nan_is_not_a_duration() {
        assert_eq!(parse_seconds("NaN"), None);
        assert_eq!(parse_seconds("inf"), None);
        assert_eq!(parse_seconds(" 2.5 "), Some(2.5));
    }

    /// Non-numeric rows are dropped and a repeated label keeps its last value.
    #[test]
    fn stages_drop_text_and_keep_last() {
        let tmp = TempDir::new().unwrap();
        let p = write(
            &tmp,
            "cycleTime.csv",
            "Log Folder Path;C:\\x\nBoot;1.0\nCopy;\nBoot;1.5\nVerify;2.25\n",
        );
        let stages = read_stages(&p).unwrap();
        let labels: Vec<&str> = stages.labels().collect();
        assert_eq!(labels, vec!["Boot", "Verify"]);
        assert_eq!(stages.get("Boot"), Some(1.5));
        assert_eq!(stages.get("Verify"), Some(2.25));
        assert_eq!(stages.get("Copy"), None);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope.csv");
        assert!(matches!(read_stages(&missing), Err(RecordError::Read(_))));
    }
}
