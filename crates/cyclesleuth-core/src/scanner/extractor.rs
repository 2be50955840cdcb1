//! The extractor: one restore-duration sample per iteration.
//!
//! Finds every cycle-time record below a workstation's raw folder, reads
//! the duration cell of each, and orders the survivors chronologically.
//! Records without a timestamp token or a numeric duration are dropped
//! with a warning; an empty series is a valid result.
use super::chronology::{index_by_time, timestamp_of};
use super::patterns::{LogPattern, PatternSet};
use super::record::{read_value, CellPosition, RecordError};
use super::walk::find_files;
use crate::model::{Sample, TimeSeries, WorkstationId};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extractor output plus the bookkeeping callers log or report.
#[derive(Debug)]
pub struct Extraction {
    pub series: TimeSeries,
    /// Cycle-time records found by the walk.
    pub files_found: usize,
    /// Records dropped for a missing token or an unreadable value.
    pub dropped: usize,
    /// Extra records that shared an already-used timestamp.
    pub duplicates: usize,
}

#[derive(Debug, Clone)]
pub struct Extractor {
    patterns: PatternSet,
    cell: CellPosition,
}

impl Extractor {
    pub fn new(cycle_pattern: LogPattern, cell: CellPosition) -> crate::error::Result<Self> {
        Ok(Self {
            patterns: PatternSet::single(cycle_pattern)?,
            cell,
        })
    }

    pub fn extract(&self, workstation: &WorkstationId, folder: &Path) -> Extraction {
        info!(
            "Extracting restore times for {workstation} from {}",
            folder.display()
        );
        let files = find_files(folder, &self.patterns).files;
        let files_found = files.len();

        // Reading records is the expensive part; order is restored by
        // `collect`, so the sequential pass below sees path order.
        let parsed: Vec<(PathBuf, Result<f64, RecordError>)> = files
            .into_par_iter()
            .map(|path| {
                let value = read_value(&path, self.cell);
                (path, value)
            })
            .collect();

        let mut dropped = 0usize;
        let mut stamped = Vec::with_capacity(parsed.len());
        for (path, value) in parsed {
            let Some(stamp) = timestamp_of(&path) else {
                dropped += 1;
                warn!("Dropping {}: no timestamp token in path", path.display());
                continue;
            };
            match value {
                Ok(v) => stamped.push((stamp, (path, v))),
                Err(err) => {
                    dropped += 1;
                    warn!("Dropping {}: {err}", path.display());
                }
            }
        }

        let mut duplicates = 0usize;
        let mut series = TimeSeries::new(workstation.clone());
        for group in index_by_time(stamped) {
            let mut members = group.members.into_iter();
            let Some((source, value)) = members.next() else {
                continue;
            };
            for (extra, _) in members {
                duplicates += 1;
                warn!(
                    "Ignoring {}: timestamp {} already taken by {}",
                    extra.display(),
                    group.stamp,
                    source.display()
                );
            }
            debug!("#{} {} -> {value} s", group.index, group.stamp);
            series.samples.push(Sample {
                index: group.index,
                timestamp: group.stamp.at(),
                value,
                source,
            });
        }

        if series.is_empty() {
            warn!(
                "No restore times extracted for {workstation} \
                 ({files_found} cycle-time records found)"
            );
        } else {
            info!(
                "Extracted {} restore times for {workstation} \
                 ({files_found} records found, {dropped} dropped)",
                series.len()
            );
        }

        Extraction {
            series,
            files_found,
            dropped,
            duplicates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IterationIndex;
    use std::fs;
    use tempfile::TempDir;

    fn record(total: f64) -> String {
        let mut body = String::new();
        for i in 0..7 {
            body.push_str(&format!("Stage {i};{i}\n"));
        }
        body.push_str(&format!("Total;{total}\n"));
        body
    }

    fn write_iteration(root: &Path, stamp: &str, total: f64) {
        let dir = root.join(format!("Restore_{stamp}"));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{stamp}-cycleTime.csv")), record(total)).unwrap();
    }

    fn extractor() -> Extractor {
        Extractor::new(
            LogPattern::new("*cycleTime.csv").unwrap(),
            CellPosition::default(),
        )
        .unwrap()
    }

    /// Samples come out in timestamp order, not directory order.
    #[test]
    fn orders_by_timestamp() {
        let tmp = TempDir::new().unwrap();
        write_iteration(tmp.path(), "2024-01-01_12-00-00", 30.0);
        write_iteration(tmp.path(), "2024-01-01_09-00-00", 10.0);
        write_iteration(tmp.path(), "2024-01-01_10-30-00", 20.0);

        let out = extractor().extract(&WorkstationId::new("WS-1"), tmp.path());
        assert_eq!(out.series.values(), vec![10.0, 20.0, 30.0]);
        assert!(out.series.is_well_ordered());
        assert_eq!(out.series.samples[2].index, IterationIndex(3));
    }

    #[test]
    fn unparseable_records_are_dropped() {
        let tmp = TempDir::new().unwrap();
        write_iteration(tmp.path(), "2024-01-01_09-00-00", 10.0);
        let bad = tmp.path().join("Restore_2024-01-01_10-00-00");
        fs::create_dir_all(&bad).unwrap();
        fs::write(bad.join("2024-01-01_10-00-00-cycleTime.csv"), "x;y\n").unwrap();
        fs::write(tmp.path().join("cycleTime.csv"), record(5.0)).unwrap();

        let out = extractor().extract(&WorkstationId::new("WS-1"), tmp.path());
        assert_eq!(out.files_found, 3);
        assert_eq!(out.dropped, 2);
        assert_eq!(out.series.values(), vec![10.0]);
    }

    #[test]
    fn duplicate_timestamps_do_not_collide() {
        let tmp = TempDir::new().unwrap();
        write_iteration(tmp.path(), "2024-01-01_09-00-00", 10.0);
        let copy = tmp.path().join("copy").join("Restore_2024-01-01_09-00-00");
        fs::create_dir_all(&copy).unwrap();
        fs::write(copy.join("2024-01-01_09-00-00-cycleTime.csv"), record(99.0)).unwrap();

        let out = extractor().extract(&WorkstationId::new("WS-1"), tmp.path());
        assert_eq!(out.series.len(), 1);
        assert_eq!(out.duplicates, 1);
    }

    #[test]
    fn missing_folder_is_empty_not_error() {
        let tmp = TempDir::new().unwrap();
        let out = extractor().extract(&WorkstationId::new("WS-1"), &tmp.path().join("absent"));
        assert!(out.series.is_empty());
        assert_eq!(out.files_found, 0);
    }
}
