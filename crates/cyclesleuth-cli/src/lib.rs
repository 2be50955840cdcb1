//! CycleSleuth command-line frontend.
//!
//! Parses arguments, loads settings and dispatches to the pipeline stages
//! in `cyclesleuth-core`. Every command prints a JSON summary to stdout;
//! logs go to stderr through `tracing`.
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cyclesleuth_core::comparison::CompareReport;
use cyclesleuth_core::config::{PipelineSettings, WorkstationConfig};
use cyclesleuth_core::index_store::{FileIndexStore, IndexStore};
use cyclesleuth_core::metadata::MetadataDocument;
use cyclesleuth_core::model::format::round_to;
use cyclesleuth_core::model::WorkstationId;
use cyclesleuth_core::pipeline::{Analysis, Pipeline, PipelineContext};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::Level;

#[derive(Debug, Parser)]
#[command(name = "cyclesleuth")]
#[command(about = "Restore cycle-time analyser", version)]
pub struct Cli {
    /// JSON settings file; defaults apply to every field it omits.
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    /// Directory that relative output paths are resolved against.
    #[arg(long, global = true)]
    pub base_dir: Option<PathBuf>,

    /// Index store file, overriding the settings.
    #[arg(long, global = true)]
    pub index: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Log warnings and errors only.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Every stage for every workstation in a workstation document.
    Run { workstations: PathBuf },
    /// Extract one workstation's restore times.
    Extract(StageArgs),
    /// Statistics and index tags from a previously extracted series.
    Stats {
        #[arg(long)]
        workstation: WorkstationId,
    },
    /// Regroup one workstation's raw logs by tagged iteration.
    Sort(StageArgs),
    /// Comparison tables for every workstation in the index store.
    Compare,
    /// Empty the index store.
    ResetIndex,
    /// Write a fresh metadata document.
    InitMetadata { workstations: PathBuf },
}

#[derive(Debug, Args)]
pub struct StageArgs {
    /// Workstation key; blank keys are rejected.
    #[arg(long)]
    pub workstation: WorkstationId,
    /// Raw log folder of the workstation.
    #[arg(long)]
    pub folder: PathBuf,
}

impl StageArgs {
    fn context(&self) -> PipelineContext {
        PipelineContext::new(self.workstation.clone(), &self.folder)
    }
}

impl Cli {
    /// Maximum log level selected by `-v`/`-q`.
    pub fn log_level(&self) -> Level {
        if self.verbose {
            Level::DEBUG
        } else if self.quiet {
            Level::WARN
        } else {
            Level::INFO
        }
    }

    /// Settings file, base directory and index override, in that order.
    pub fn load_settings(&self) -> Result<PipelineSettings> {
        let mut settings = PipelineSettings::load_or_default(self.settings.as_deref())
            .context("failed to load settings")?;
        if let Some(base) = &self.base_dir {
            settings = settings.with_base_dir(base);
        }
        if let Some(index) = &self.index {
            settings.index_path = index.clone();
        }
        Ok(settings)
    }
}

fn load_workstations(path: &Path) -> Result<WorkstationConfig> {
    WorkstationConfig::load(path)
        .with_context(|| format!("failed to load workstations from {}", path.display()))
}

fn analysis_json(analysis: &Analysis) -> Value {
    let s = &analysis.summary;
    json!({
        "workstation": analysis.workstation.as_str(),
        "count": s.count,
        "mean": round_to(s.mean, 4),
        "median": round_to(s.median, 4),
        "std_dev": round_to(s.std_dev, 4),
        "min": s.min,
        "max": s.max,
        "median_index": s.median_index.map(|i| i.get()),
        "outliers": s.outlier_indices().iter().map(|i| i.get()).collect::<Vec<_>>(),
        "tags_written": analysis.tags_written,
        "remark": analysis.remark(),
    })
}

fn open_pipeline(settings: &PipelineSettings) -> Result<Pipeline<FileIndexStore>> {
    Pipeline::open(settings.clone()).context("failed to open the index store")
}

fn table_paths(report: &CompareReport) -> Value {
    json!({
        "tables": report.written.iter().map(|(_, p)| p.display().to_string()).collect::<Vec<_>>(),
        "skipped": report.skipped.iter().map(|w| w.as_str()).collect::<Vec<_>>(),
    })
}

/// Run one parsed command and return its JSON summary.
pub fn execute(cli: &Cli) -> Result<Value> {
    let settings = cli.load_settings()?;

    match &cli.command {
        Command::Run { workstations } => {
            let config = load_workstations(workstations)?;
            let report = open_pipeline(&settings)?
                .run(&config)
                .context("pipeline run failed")?;
            let runs: Vec<Value> = report
                .workstations
                .iter()
                .map(|r| {
                    json!({
                        "statistics": analysis_json(&r.analysis),
                        "files_found": r.sort.files_found,
                        "iterations": r.sort.iterations,
                        "tagged_folders": r.sort.tagged_folders,
                        "copy_errors": r.sort.copy_errors,
                    })
                })
                .collect();
            let mut summary = table_paths(&report.compare);
            summary["workstations"] = Value::from(runs);
            Ok(summary)
        }
        Command::Extract(args) => {
            let extraction = open_pipeline(&settings)?
                .extract(&args.context())
                .with_context(|| format!("extraction failed for {}", args.workstation))?;
            Ok(json!({
                "workstation": args.workstation,
                "files_found": extraction.files_found,
                "dropped": extraction.dropped,
                "duplicates": extraction.duplicates,
                "values": extraction.series.values(),
            }))
        }
        Command::Stats { workstation } => {
            let analysis = open_pipeline(&settings)?
                .analyse_saved(workstation)
                .with_context(|| format!("statistics failed for {workstation}"))?;
            Ok(analysis_json(&analysis))
        }
        Command::Sort(args) => {
            let report = open_pipeline(&settings)?
                .sort(&args.context())
                .with_context(|| format!("sorting failed for {}", args.workstation))?;
            Ok(json!({
                "workstation": args.workstation,
                "output_dir": report.output_dir.display().to_string(),
                "files_found": report.files_found,
                "unstamped": report.unstamped,
                "unindexed": report.unindexed,
                "iterations": report.iterations,
                "tagged_folders": report.tagged_folders,
                "copied": report.copied,
                "copy_errors": report.copy_errors,
                "delete_errors": report.delete_errors,
            }))
        }
        Command::Compare => {
            let report = open_pipeline(&settings)?
                .compare()
                .context("comparison failed")?;
            Ok(table_paths(&report))
        }
        Command::ResetIndex => {
            let store = FileIndexStore::open(settings.index_path.clone())?;
            store.truncate()?;
            Ok(json!({ "index": store.path().display().to_string(), "truncated": true }))
        }
        Command::InitMetadata { workstations } => {
            let config = load_workstations(workstations)?;
            let doc = MetadataDocument::new(settings.metadata_path());
            doc.create(&config)?;
            Ok(json!({
                "metadata": doc.path().display().to_string(),
                "workstations": config.workstations.len(),
            }))
        }
    }
}

/// Execute and print the summary.
pub fn run_cli(cli: Cli) -> Result<()> {
    let summary = execute(&cli)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
