//! Stage entry points and the full run.
//!
//! Each stage can run on its own, in a separate process, sharing only the
//! filesystem: series documents connect extraction to statistics, the
//! index store connects statistics to sorting and comparison.
use crate::analysis::StatisticsSummary;
use crate::classifier::{SortReport, Sorter};
use crate::comparison::{CompareReport, Comparator};
use crate::config::{PipelineSettings, WorkstationConfig};
use crate::error::{CoreError, InvalidWorkstationId, PipelineError};
use crate::index_store::{FileIndexStore, IndexStore};
use crate::metadata::MetadataDocument;
use crate::model::{TimeSeries, WorkstationId};
use crate::scanner::{Extraction, Extractor, IterationNumbering};
use crate::series::SeriesStore;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{info, warn};

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Metadata `path` key of a workstation's comparison table.
pub const COMPARISON_PATH_KEY: &str = "comparison";

/// Identity and raw folder of the workstation a stage works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineContext {
    pub workstation: WorkstationId,
    pub raw_folder: PathBuf,
}

impl PipelineContext {
    pub fn new(workstation: WorkstationId, raw_folder: impl Into<PathBuf>) -> Self {
        Self {
            workstation,
            raw_folder: raw_folder.into(),
        }
    }

    fn require_folder(&self) -> Result<()> {
        if self.raw_folder.is_dir() {
            Ok(())
        } else {
            Err(PipelineError::MissingRawFolder {
                workstation: self.workstation.clone(),
                path: self.raw_folder.clone(),
            })
        }
    }
}

/// Statistics of one workstation and how many new tags they produced.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub workstation: WorkstationId,
    pub summary: StatisticsSummary,
    pub tags_written: usize,
}

impl Analysis {
    pub fn remark(&self) -> String {
        self.summary.remark()
    }
}

/// Per-workstation results of a full run.
#[derive(Debug)]
pub struct WorkstationRun {
    pub extraction: Extraction,
    pub analysis: Analysis,
    pub sort: SortReport,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub workstations: Vec<WorkstationRun>,
    pub compare: CompareReport,
}

pub struct Pipeline<S> {
    settings: PipelineSettings,
    store: S,
    series: SeriesStore,
    metadata: MetadataDocument,
    extractor: Extractor,
    sorter: Sorter,
    comparator: Comparator,
}

impl Pipeline<FileIndexStore> {
    /// A pipeline backed by the index file named in `settings`.
    pub fn open(settings: PipelineSettings) -> std::result::Result<Self, CoreError> {
        let store = FileIndexStore::open(settings.index_path.clone())?;
        Self::with_store(settings, store)
    }
}

impl<S: IndexStore> Pipeline<S> {
    pub fn with_store(
        settings: PipelineSettings,
        store: S,
    ) -> std::result::Result<Self, CoreError> {
        let cycle = settings.cycle_log_pattern()?;
        let extractor = Extractor::new(cycle.clone(), settings.cell())?;
        let sorter = Sorter::new(settings.log_pattern_set()?, cycle, settings.sorted_dir.clone());
        let comparator = Comparator::new(settings.sorted_dir.clone(), settings.form_dir.clone());
        Ok(Self {
            series: SeriesStore::new(settings.extracted_dir.clone()),
            metadata: MetadataDocument::new(settings.metadata_path()),
            settings,
            store,
            extractor,
            sorter,
            comparator,
        })
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn series_store(&self) -> &SeriesStore {
        &self.series
    }

    pub fn metadata(&self) -> &MetadataDocument {
        &self.metadata
    }

    /// Extract and persist one workstation's series.
    ///
    /// A missing folder or a folder without a single usable iteration is
    /// a configuration error.
    pub fn extract(&self, ctx: &PipelineContext) -> Result<Extraction> {
        ctx.require_folder()?;
        let extraction = self.extractor.extract(&ctx.workstation, &ctx.raw_folder);
        if extraction.series.is_empty() {
            return Err(PipelineError::NoIterations {
                workstation: ctx.workstation.clone(),
                folder: ctx.raw_folder.clone(),
            });
        }
        self.series.save(&extraction.series, &ctx.raw_folder)?;
        Ok(extraction)
    }

    /// Compute statistics, record flagged iterations and fill metadata.
    pub fn analyse(&self, series: &TimeSeries) -> Result<Analysis> {
        self.analyse_values(&series.workstation, &series.values())
    }

    /// [`Pipeline::analyse`] on a series saved by an earlier extraction.
    pub fn analyse_saved(&self, workstation: &WorkstationId) -> Result<Analysis> {
        let values = self
            .series
            .load(workstation)?
            .ok_or_else(|| PipelineError::MissingSeries {
                workstation: workstation.clone(),
            })?;
        self.analyse_values(workstation, &values)
    }

    fn analyse_values(&self, workstation: &WorkstationId, values: &[f64]) -> Result<Analysis> {
        let summary = StatisticsSummary::compute(values);
        if summary.is_empty() {
            warn!("{workstation}: empty series, nothing to flag");
        }

        let tags = summary.tags(workstation);
        let tags_written = self.store.append_all(&tags)?;
        info!(
            "{workstation}: {} samples, median {:.3} s, {} outliers, {} new index tags",
            summary.count,
            summary.median,
            summary.outliers.len(),
            tags_written
        );

        if !summary.is_empty() {
            self.metadata.record_statistics(workstation, &summary)?;
        }

        Ok(Analysis {
            workstation: workstation.clone(),
            summary,
            tags_written,
        })
    }

    /// Sort one workstation's raw logs using the index store's marks and
    /// the numbering of the series saved by an earlier extraction.
    pub fn sort(&self, ctx: &PipelineContext) -> Result<SortReport> {
        let series = self
            .series
            .load_series(&ctx.workstation)?
            .ok_or_else(|| PipelineError::MissingSeries {
                workstation: ctx.workstation.clone(),
            })?;
        self.sort_series(ctx, &series)
    }

    /// Sort against `series`. An extracted iteration with no log files
    /// left to sort fails the stage.
    pub fn sort_series(&self, ctx: &PipelineContext, series: &TimeSeries) -> Result<SortReport> {
        ctx.require_folder()?;
        let marks = self
            .store
            .read_marks()?
            .remove(&ctx.workstation)
            .unwrap_or_default();
        if marks.is_empty() {
            warn!(
                "{}: no index tags recorded, nothing will be grouped",
                ctx.workstation
            );
        }

        let numbering = IterationNumbering::from_series(series);
        let report = self
            .sorter
            .sort(&ctx.workstation, &ctx.raw_folder, &numbering, &marks)?;
        if !report.missing_iterations.is_empty() {
            return Err(PipelineError::IndexMismatch {
                workstation: ctx.workstation.clone(),
                missing: report.missing_iterations,
            });
        }
        Ok(report)
    }

    /// Build comparison tables for every workstation in the index store.
    pub fn compare(&self) -> Result<CompareReport> {
        let index = self.store.read_all()?;
        let report = self.comparator.compare_all(&index)?;
        for (workstation, path) in &report.written {
            self.metadata
                .record_path(workstation, COMPARISON_PATH_KEY, path)?;
        }
        info!(
            "Comparison: {} tables written, {} workstations skipped",
            report.written.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Every stage for every configured workstation, starting from a clean
    /// index store and series directory.
    pub fn run(&self, config: &WorkstationConfig) -> Result<RunReport> {
        if config.is_empty() {
            return Err(PipelineError::NoWorkstations);
        }
        check_output_folders(config)?;

        self.store.truncate()?;
        let cleared = self.series.clear()?;
        info!(
            "Starting run for {} workstations ({cleared} stale series files removed)",
            config.workstations.len()
        );
        self.metadata.create(config)?;

        let mut report = RunReport::default();
        for entry in &config.workstations {
            let ctx = PipelineContext::new(entry.id.clone(), entry.folder.clone());
            let extraction = self.extract(&ctx)?;
            let analysis = self.analyse(&extraction.series)?;
            let sort = self.sort_series(&ctx, &extraction.series)?;

            report.workstations.push(WorkstationRun {
                extraction,
                analysis,
                sort,
            });
        }

        report.compare = self.compare()?;
        Ok(report)
    }
}

/// Every workstation must own a distinct sorted folder and series files.
fn check_output_folders(config: &WorkstationConfig) -> Result<()> {
    let mut stems: HashMap<String, &WorkstationId> = HashMap::new();
    for entry in &config.workstations {
        let stem = entry.id.file_stem();
        if stem.is_empty() {
            return Err(CoreError::from(InvalidWorkstationId {
                id: entry.id.to_string(),
                reason: "empty after trimming",
            })
            .into());
        }
        if let Some(first) = stems.insert(stem.clone(), &entry.id) {
            return Err(PipelineError::DuplicateWorkstation {
                first: first.clone(),
                second: entry.id.clone(),
                stem,
            });
        }
    }
    Ok(())
}
