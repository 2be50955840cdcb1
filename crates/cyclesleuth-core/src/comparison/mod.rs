//! The comparator: side-by-side stage timings of a workstation's min, max
//! and abnormal iterations.
//!
//! Input is the index store's role view plus the sorter's root-level
//! copies (`NNN_<stamp>-cycleTime.csv` and friends); output is one
//! `;`-separated table per workstation with a `Time_Difference(Max-Min)`
//! column.
use crate::error::{CoreError, Result};
use crate::index_store::RoleIndex;
use crate::model::format::{format_cell, ordinal, round_to};
use crate::model::{IterationIndex, Role, WorkstationId};
use crate::scanner::{read_stages, LogPattern, StageTimes};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Header of the first column.
pub const STAGE_HEADER: &str = "Stage";

/// Header of the delta column.
pub const DELTA_HEADER: &str = "Time_Difference(Max-Min)";

/// Stage label that some record writers emit as a first row.
pub const SENTINEL_STAGE: &str = "Log Folder Path";

/// Decimal places of the delta column.
pub const DELTA_PLACES: i32 = 4;

/// One stage row of a comparison table.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub stage: String,
    /// One cell per column of [`ComparisonTable::columns`].
    pub values: Vec<Option<f64>>,
    pub delta: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    pub workstation: WorkstationId,
    /// Role column labels in insertion order.
    pub columns: Vec<String>,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    pub fn row(&self, stage: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.stage == stage)
    }

    pub fn column_position(&self, label: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == label)
    }

    /// Write the table as `;`-separated text with a header row.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
        }
        let mut wtr = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_path(path)
            .map_err(|e| CoreError::csv(path, e))?;

        let mut header = Vec::with_capacity(self.columns.len() + 2);
        header.push(STAGE_HEADER.to_string());
        header.extend(self.columns.iter().cloned());
        header.push(DELTA_HEADER.to_string());
        wtr.write_record(&header).map_err(|e| CoreError::csv(path, e))?;

        for row in &self.rows {
            let mut cells = Vec::with_capacity(header.len());
            cells.push(row.stage.clone());
            cells.extend(row.values.iter().map(|v| format_cell(*v)));
            cells.push(format_cell(row.delta));
            wtr.write_record(&cells).map_err(|e| CoreError::csv(path, e))?;
        }

        wtr.flush().map_err(|e| CoreError::io(path, e))?;
        Ok(())
    }
}

/// A column before its record has been located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedColumn {
    pub label: String,
    pub index: IterationIndex,
}

fn role_title(role: Role) -> &'static str {
    match role {
        Role::Abnormal => "Abnormal",
        Role::Max => "Max",
        Role::Median => "Median",
        Role::Min => "Min",
    }
}

fn column_label(title: &str, index: IterationIndex) -> String {
    format!("{title}({} loop)", ordinal(index.get()))
}

/// Lay out the columns of one workstation.
///
/// Max columns first, then min, then abnormal iterations not already
/// shown. A max or min iteration that is also abnormal gets an
/// `_abnormal` suffix instead of a column of its own.
pub fn plan_columns(roles: &BTreeMap<Role, Vec<IterationIndex>>) -> Vec<PlannedColumn> {
    let abnormal: &[IterationIndex] = roles.get(&Role::Abnormal).map_or(&[][..], Vec::as_slice);
    let abnormal_set: BTreeSet<IterationIndex> = abnormal.iter().copied().collect();
    let mut shown = BTreeSet::new();
    let mut columns = Vec::new();

    for role in [Role::Max, Role::Min] {
        let mut seen = BTreeSet::new();
        for &index in roles.get(&role).map_or(&[][..], Vec::as_slice) {
            if !seen.insert(index) {
                continue;
            }
            let label = if abnormal_set.contains(&index) {
                column_label(&format!("{}_abnormal", role_title(role)), index)
            } else {
                column_label(role_title(role), index)
            };
            shown.insert(index);
            columns.push(PlannedColumn { label, index });
        }
    }

    for &index in abnormal {
        if shown.insert(index) {
            columns.push(PlannedColumn {
                label: column_label(role_title(Role::Abnormal), index),
                index,
            });
        }
    }

    columns
}

/// Pick the `Max…`/`Min…` column pair used for the delta: the
/// lexicographically first label of each kind.
fn delta_pair(columns: &[String]) -> Option<(usize, usize)> {
    let first = |prefix: &str| {
        columns
            .iter()
            .enumerate()
            .filter(|(_, label)| label.starts_with(prefix))
            .min_by(|a, b| a.1.cmp(b.1))
            .map(|(i, _)| i)
    };
    Some((first("Max")?, first("Min")?))
}

/// Outer-join per-column stage timings into rows.
///
/// `records[i]` belongs to `columns[i]`; `None` is a column whose record
/// could not be parsed and stays empty.
pub fn assemble(
    workstation: &WorkstationId,
    columns: Vec<String>,
    records: &[Option<StageTimes>],
) -> ComparisonTable {
    let width = columns.len();
    let mut rows: Vec<ComparisonRow> = Vec::new();
    let mut slot: HashMap<String, usize> = HashMap::new();

    for (col, record) in records.iter().enumerate() {
        let Some(record) = record else { continue };
        for (stage, value) in record.iter() {
            let at = *slot.entry(stage.to_string()).or_insert_with(|| {
                rows.push(ComparisonRow {
                    stage: stage.to_string(),
                    values: vec![None; width],
                    delta: None,
                });
                rows.len() - 1
            });
            rows[at].values[col] = Some(value);
        }
    }

    if rows.first().is_some_and(|r| r.stage == SENTINEL_STAGE) {
        rows.remove(0);
    }

    if let Some((max_col, min_col)) = delta_pair(&columns) {
        for row in &mut rows {
            if let (Some(max), Some(min)) = (row.values[max_col], row.values[min_col]) {
                row.delta = Some(round_to(max - min, DELTA_PLACES));
            }
        }
    }

    ComparisonTable {
        workstation: workstation.clone(),
        columns,
        rows,
    }
}

/// Outcome of a comparator run over every workstation in the store.
#[derive(Debug, Default, Clone)]
pub struct CompareReport {
    /// Tables written, keyed by workstation.
    pub written: Vec<(WorkstationId, PathBuf)>,
    /// Workstations with no resolvable record for any role.
    pub skipped: Vec<WorkstationId>,
}

#[derive(Debug, Clone)]
pub struct Comparator {
    sorted_base: PathBuf,
    form_dir: PathBuf,
}

impl Comparator {
    /// `sorted_base` is the sorter's output base; tables go under `form_dir`.
    pub fn new(sorted_base: PathBuf, form_dir: PathBuf) -> Self {
        Self {
            sorted_base,
            form_dir,
        }
    }

    /// `<form_dir>/<ws>/<ws>_comparison.csv`.
    pub fn table_path(&self, workstation: &WorkstationId) -> PathBuf {
        let stem = workstation.file_stem();
        self.form_dir
            .join(&stem)
            .join(format!("{stem}_comparison.csv"))
    }

    /// Find the root-level cycle-time copy of `index` in `dir`.
    ///
    /// `NNN_*_*cycleTime.csv` first, then `NNN_*cycleTime.csv`; the first
    /// name in sorted order wins.
    pub fn locate_cycle_file(dir: &Path, index: IterationIndex) -> Result<Option<PathBuf>> {
        let names = match fs::read_dir(dir) {
            Ok(entries) => {
                let mut files: Vec<PathBuf> = entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
                    .map(|e| e.path())
                    .collect();
                files.sort();
                files
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(CoreError::io(dir, err)),
        };

        let padded = index.padded();
        for pattern in [
            format!("{padded}_*_*cycleTime.csv"),
            format!("{padded}_*cycleTime.csv"),
        ] {
            let pattern = LogPattern::new(&pattern)?;
            if let Some(found) = names.iter().find(|p| pattern.matches(p)) {
                return Ok(Some(found.clone()));
            }
        }
        Ok(None)
    }

    /// Build the table of one workstation, or `None` when none of its
    /// tagged iterations has a record in the sorted output.
    pub fn build_table(
        &self,
        workstation: &WorkstationId,
        roles: &BTreeMap<Role, Vec<IterationIndex>>,
    ) -> Result<Option<ComparisonTable>> {
        let dir = self.sorted_base.join(workstation.file_stem());
        let mut columns = Vec::new();
        let mut records = Vec::new();

        for planned in plan_columns(roles) {
            let Some(path) = Self::locate_cycle_file(&dir, planned.index)? else {
                warn!(
                    "{workstation}: no cycle-time record for iteration {} in {}",
                    planned.index,
                    dir.display()
                );
                continue;
            };
            let record = match read_stages(&path) {
                Ok(stages) => {
                    debug!("{}: {} stages from {}", planned.label, stages.len(), path.display());
                    Some(stages)
                }
                Err(err) => {
                    warn!(
                        "Cannot parse {}: {err}; column {} left empty",
                        path.display(),
                        planned.label
                    );
                    None
                }
            };
            columns.push(planned.label);
            records.push(record);
        }

        if columns.is_empty() {
            return Ok(None);
        }
        Ok(Some(assemble(workstation, columns, &records)))
    }

    /// Build and write one table per workstation in `index`.
    pub fn compare_all(&self, index: &RoleIndex) -> Result<CompareReport> {
        let mut report = CompareReport::default();
        for (workstation, roles) in index {
            match self.build_table(workstation, roles)? {
                Some(table) => {
                    let path = self.table_path(workstation);
                    table.write_csv(&path)?;
                    info!(
                        "Comparison for {workstation}: {} columns, {} stages -> {}",
                        table.columns.len(),
                        table.rows.len(),
                        path.display()
                    );
                    report.written.push((workstation.clone(), path));
                }
                None => {
                    warn!(
                        "Skipping comparison for {workstation}: \
                         no tagged iteration records found"
                    );
                    report.skipped.push(workstation.clone());
                }
            }
        }
        Ok(report)
    }
}
