//! Recursive raw-log discovery using `jwalk`.
//!
//! Raw log trees are arbitrarily deep (one folder per iteration, often
//! nested per day or per batch). `jwalk` walks them in parallel; results
//! are sorted by path afterwards so every consumer sees a deterministic
//! order regardless of thread scheduling.
use super::patterns::PatternSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// Files matched under one root.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Matching regular files, sorted by path, without duplicates.
    pub files: Vec<PathBuf>,
    /// Directory entries that could not be read. Logged, never fatal.
    pub error_count: u64,
}

/// Find every regular file below `root` whose name matches `patterns`.
///
/// A file matching more than one pattern is reported once. A missing
/// root yields an empty outcome; callers decide whether that matters.
pub fn find_files(root: &Path, patterns: &PatternSet) -> WalkOutcome {
    let start = Instant::now();
    let mut outcome = WalkOutcome::default();

    if !root.is_dir() {
        warn!("Raw folder {} does not exist or is not a directory", root.display());
        return outcome;
    }

    let walker = jwalk::WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()));

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                outcome.error_count += 1;
                let err_path = err
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                warn!("Skipping unreadable entry {err_path}: {err}");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if patterns.matches(&path) {
            outcome.files.push(path);
        }
    }

    outcome.files.sort();
    outcome.files.dedup();

    debug!(
        "Walked {} in {:?}: {} matching files, {} errors",
        root.display(),
        start.elapsed(),
        outcome.files.len(),
        outcome.error_count
    );
    outcome
}
