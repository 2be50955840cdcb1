//! The sorter: redistributes a workstation's raw logs into an output tree
//! keyed by chronological iteration index.
//!
//! Output layout under `<output_base>/<workstation>/`:
//!
//! ```text
//! 003_abnormal_max_2024-01-01_10-00-00/    tagged iteration, every log file
//! 003_2024-01-01_10-00-00-cycleTime.csv    flat copy of its cycle-time record
//! 004_2024-01-01_11-00-00_run-cycleTime.csv  untagged iteration, CSV files only
//! ```
//!
//! The output folder is reset on every run. Copy and delete failures are
//! logged per item and counted; they never abort the run.
use crate::error::{CoreError, InvalidWorkstationId, Result};
use crate::model::{IterationIndex, Role, WorkstationId};
use crate::scanner::{
    find_files, group_by_stamp, timestamp_of, IterationNumbering, LogPattern, PatternSet, Stamp,
};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Counters from one sorter run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SortReport {
    pub workstation: Option<WorkstationId>,
    pub output_dir: PathBuf,
    /// Log files matched by the walk.
    pub files_found: usize,
    /// Files without a timestamp token; not sorted.
    pub unstamped: usize,
    /// Numbered iterations that had log files to sort.
    pub iterations: usize,
    /// Timestamp groups with no extracted sample; not sorted.
    pub unindexed: usize,
    pub tagged_folders: usize,
    pub copied: usize,
    pub copy_errors: usize,
    /// Items of the previous output that could not be removed.
    pub delete_errors: usize,
    /// Tagged indices the extracted series does not contain.
    pub unmatched_marks: Vec<IterationIndex>,
    /// Extracted iterations with no log files in the raw tree. Non-empty
    /// means the raw tree changed since extraction.
    pub missing_iterations: Vec<IterationIndex>,
}

/// Result of clearing an output folder.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResetOutcome {
    pub removed: usize,
    pub errors: usize,
}

/// Empty `dir`, creating it if needed.
///
/// Idempotent. Items that cannot be removed are logged and counted;
/// only failing to create or list `dir` itself is an error.
pub fn reset_dir(dir: &Path) -> Result<ResetOutcome> {
    let mut outcome = ResetOutcome::default();
    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|e| CoreError::io(dir, e))?;
        return Ok(outcome);
    }

    let entries = fs::read_dir(dir).map_err(|e| CoreError::io(dir, e))?;
    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                outcome.errors += 1;
                warn!("Cannot list an entry of {}: {err}", dir.display());
                continue;
            }
        };
        let path = entry.path();
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        let removed = if is_dir {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match removed {
            Ok(()) => outcome.removed += 1,
            Err(err) => {
                outcome.errors += 1;
                warn!("Failed to delete {}: {err}", path.display());
            }
        }
    }

    debug!(
        "Reset {}: {} removed, {} errors",
        dir.display(),
        outcome.removed,
        outcome.errors
    );
    Ok(outcome)
}

/// `{index:03}_{roles joined by "_"}_{timestamp}`. Roles are already in
/// lexicographic order in a `BTreeSet<Role>`.
pub fn folder_name(index: IterationIndex, roles: &BTreeSet<Role>, stamp: &Stamp) -> String {
    format!("{}_{}_{stamp}", index.padded(), folder_roles(roles))
}

/// Root-level copy name of a tagged iteration's cycle-time record.
pub fn flat_cycle_name(index: IterationIndex, stamp: &Stamp) -> String {
    format!("{}_{stamp}-cycleTime.csv", index.padded())
}

/// Root-level name of an untagged iteration's CSV file.
pub fn flat_csv_name(index: IterationIndex, stamp: &Stamp, file_name: &str) -> String {
    format!("{}_{stamp}_{file_name}", index.padded())
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct Sorter {
    patterns: PatternSet,
    cycle_pattern: LogPattern,
    output_base: PathBuf,
}

impl Sorter {
    pub fn new(patterns: PatternSet, cycle_pattern: LogPattern, output_base: PathBuf) -> Self {
        Self {
            patterns,
            cycle_pattern,
            output_base,
        }
    }

    /// `<output_base>/<workstation>`.
    pub fn output_dir(&self, workstation: &WorkstationId) -> PathBuf {
        self.output_base.join(workstation.file_stem())
    }

    /// Sort one workstation's raw tree using its iteration marks.
    ///
    /// Indices come from `numbering`, the extracted series of the same
    /// tree. A timestamp group without a sample is left out of the
    /// output; a numbered iteration without log files is reported in
    /// [`SortReport::missing_iterations`].
    pub fn sort(
        &self,
        workstation: &WorkstationId,
        source_dir: &Path,
        numbering: &IterationNumbering,
        marks: &BTreeMap<IterationIndex, BTreeSet<Role>>,
    ) -> Result<SortReport> {
        let output_dir = self.output_dir(workstation);
        if workstation.file_stem().is_empty() || output_dir == self.output_base {
            return Err(InvalidWorkstationId {
                id: workstation.to_string(),
                reason: "output folder would be the sorted base folder",
            }
            .into());
        }
        let mut report = SortReport {
            workstation: Some(workstation.clone()),
            output_dir: output_dir.clone(),
            ..SortReport::default()
        };

        report.delete_errors = reset_dir(&output_dir)?.errors;

        let marked: Vec<String> = marks
            .iter()
            .map(|(idx, roles)| format!("{}={}", idx, folder_roles(roles)))
            .collect();
        info!("Sorting {workstation}, marks: [{}]", marked.join(", "));

        let files = find_files(source_dir, &self.patterns).files;
        report.files_found = files.len();
        if files.is_empty() {
            warn!(
                "No log files found for {workstation} in {}",
                source_dir.display()
            );
        }

        let mut stamped = Vec::with_capacity(files.len());
        for path in files {
            match timestamp_of(&path) {
                Some(stamp) => stamped.push((stamp, path)),
                None => {
                    report.unstamped += 1;
                    warn!("Skipping {}: no timestamp token in path", path.display());
                }
            }
        }

        let mut sorted = BTreeSet::new();
        for (stamp, members) in group_by_stamp(stamped) {
            let Some(index) = numbering.index_of(&stamp) else {
                report.unindexed += 1;
                warn!(
                    "Skipping {} files of {stamp}: no restore time was extracted for it",
                    members.len()
                );
                continue;
            };
            sorted.insert(index);
            let iteration = Iteration {
                index,
                stamp: &stamp,
                members: &members,
            };
            match marks.get(&index).filter(|r| !r.is_empty()) {
                Some(roles) => {
                    report.tagged_folders += 1;
                    self.copy_tagged(&output_dir, &iteration, roles, &mut report);
                }
                None => self.copy_untagged(&output_dir, &iteration, &mut report),
            }
        }
        report.iterations = sorted.len();

        report.missing_iterations = numbering
            .iter()
            .map(|(_, index)| index)
            .filter(|index| !sorted.contains(index))
            .collect();
        if !report.missing_iterations.is_empty() {
            warn!(
                "{workstation}: extracted iterations {:?} have no log files in {}",
                report.missing_iterations,
                source_dir.display()
            );
        }

        report.unmatched_marks = marks
            .keys()
            .copied()
            .filter(|idx| !numbering.contains(*idx))
            .collect();
        if !report.unmatched_marks.is_empty() {
            debug!(
                "{workstation}: marks {:?} lie beyond the {} extracted iterations",
                report.unmatched_marks,
                numbering.len()
            );
        }

        info!(
            "Sorted {workstation}: {} files, {} iterations, {} tagged folders, \
             {} copy errors -> {}",
            report.files_found,
            report.iterations,
            report.tagged_folders,
            report.copy_errors,
            output_dir.display()
        );
        Ok(report)
    }

    fn copy_tagged(
        &self,
        output_dir: &Path,
        it: &Iteration<'_>,
        roles: &BTreeSet<Role>,
        report: &mut SortReport,
    ) {
        let folder = output_dir.join(folder_name(it.index, roles, it.stamp));
        if let Err(err) = fs::create_dir_all(&folder) {
            report.copy_errors += it.members.len();
            warn!("Failed to create {}: {err}", folder.display());
            return;
        }

        let mut names = HashSet::new();
        for src in it.members {
            let name = file_name_of(src);
            if !names.insert(name.clone()) {
                warn!(
                    "{} overwrites an earlier file of the same name in {}",
                    src.display(),
                    folder.display()
                );
            }
            copy_logged(src, &folder.join(&name), report);
        }

        if let Some(cycle) = it.members.iter().find(|p| self.cycle_pattern.matches(p)) {
            let dest = output_dir.join(flat_cycle_name(it.index, it.stamp));
            copy_logged(cycle, &dest, report);
        }
    }

    fn copy_untagged(&self, output_dir: &Path, it: &Iteration<'_>, report: &mut SortReport) {
        for src in it.members.iter().filter(|p| is_csv(p)) {
            let dest = output_dir.join(flat_csv_name(it.index, it.stamp, &file_name_of(src)));
            copy_logged(src, &dest, report);
        }
    }
}

/// One numbered timestamp group of the raw tree.
struct Iteration<'a> {
    index: IterationIndex,
    stamp: &'a Stamp,
    /// Log files in path order.
    members: &'a [PathBuf],
}

fn folder_roles(roles: &BTreeSet<Role>) -> String {
    roles
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join("_")
}

fn copy_logged(src: &Path, dest: &Path, report: &mut SortReport) {
    match fs::copy(src, dest) {
        Ok(_) => {
            report.copied += 1;
            debug!("Copied {} -> {}", src.display(), dest.display());
        }
        Err(err) => {
            report.copy_errors += 1;
            warn!("Failed to copy {} -> {}: {err}", src.display(), dest.display());
        }
    }
}
