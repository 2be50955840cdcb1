//! File-backed index store: one UTF-8 line per tag, append-only.
//!
//! Each append opens the file in append mode and issues a single write
//! of the whole line, so concurrent writers interleave whole lines.
//! The seen-set is seeded from the file on open, which makes the
//! dedup global across separate invocations.
use super::{format_line, parse_lines, IndexStore};
use crate::error::{CoreError, Result};
use crate::model::IndexTag;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct FileIndexStore {
    path: PathBuf,
    /// Lines already present in the file.
    seen: Mutex<HashSet<String>>,
}

impl FileIndexStore {
    /// Open (without creating) the store at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let seen: HashSet<String> = read_body(&path)?
            .map(|body| parse_lines(&body).iter().map(format_line).collect())
            .unwrap_or_default();
        Ok(Self {
            path,
            seen: Mutex::new(seen),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn ensure_parent(&self) -> Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))
            }
            _ => Ok(()),
        }
    }
}

/// `Ok(None)` when the file does not exist yet.
fn read_body(path: &Path) -> Result<Option<String>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CoreError::io(path, e)),
    }
}

impl IndexStore for FileIndexStore {
    fn append(&self, tag: &IndexTag) -> Result<bool> {
        let line = format_line(tag);
        let mut seen = self.seen.lock();
        if seen.contains(&line) {
            debug!("Index tag {line} already recorded");
            return Ok(false);
        }

        self.ensure_parent()?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CoreError::io(&self.path, e))?;
        file.write_all(format!("{line}\n").as_bytes())
            .map_err(|e| CoreError::io(&self.path, e))?;

        seen.insert(line);
        Ok(true)
    }

    fn truncate(&self) -> Result<()> {
        let mut seen = self.seen.lock();
        self.ensure_parent()?;
        File::create(&self.path).map_err(|e| CoreError::io(&self.path, e))?;
        seen.clear();
        info!("Index store {} truncated", self.path.display());
        Ok(())
    }

    fn read_tags(&self) -> Result<Vec<IndexTag>> {
        Ok(read_body(&self.path)?
            .map(|body| parse_lines(&body))
            .unwrap_or_default())
    }
}
