//! The index store: `(workstation, role, iteration)` tags shared between
//! the statistics pass and the later sorting and comparison passes.
//!
//! The line format `workstation:role:index` is the contract for
//! process-boundary use ([`FileIndexStore`]); in-process pipelines can use
//! [`InMemoryIndexStore`] and skip the text round trip entirely.
//!
//! Every role is deduplicated by its exact `(workstation, role, index)`
//! key before it is appended.
pub mod file;
pub mod memory;

pub use file::FileIndexStore;
pub use memory::InMemoryIndexStore;

use crate::error::Result;
use crate::model::{IndexTag, IterationIndex, Role, WorkstationId};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;
use tracing::{debug, warn};

/// `workstation → role → indices` for the compared roles (min, max,
/// abnormal), indices in the order they were written.
pub type RoleIndex = BTreeMap<WorkstationId, BTreeMap<Role, Vec<IterationIndex>>>;

/// `workstation → iteration → roles`, every known role including median.
pub type MarkIndex = BTreeMap<WorkstationId, BTreeMap<IterationIndex, BTreeSet<Role>>>;

/// Storage for index tags.
///
/// Implementations take `&self` so one store can be shared by every
/// stage of a run.
pub trait IndexStore {
    /// Append one tag. Returns `false` when an identical tag was already
    /// recorded and nothing was written.
    fn append(&self, tag: &IndexTag) -> Result<bool>;

    /// Remove every tag. Called once before a fresh full run.
    fn truncate(&self) -> Result<()>;

    /// Every well-formed tag in write order. A store nobody has written
    /// to yet reads as empty.
    fn read_tags(&self) -> Result<Vec<IndexTag>>;

    /// Comparator view, see [`RoleIndex`].
    fn read_all(&self) -> Result<RoleIndex> {
        Ok(group_by_role(self.read_tags()?))
    }

    /// Sorter view, see [`MarkIndex`].
    fn read_marks(&self) -> Result<MarkIndex> {
        Ok(group_by_iteration(self.read_tags()?))
    }

    /// Append several tags, returning how many were new.
    fn append_all(&self, tags: &[IndexTag]) -> Result<usize> {
        let mut written = 0;
        for tag in tags {
            if self.append(tag)? {
                written += 1;
            }
        }
        Ok(written)
    }
}

/// Why a stored line is not a usable tag.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LineError {
    #[error("blank line")]
    Blank,
    #[error("expected `workstation:role:index`, got `{0}`")]
    TooFewFields(String),
    #[error("index `{0}` is not a positive integer")]
    BadIndex(String),
    #[error("unknown role `{0}`")]
    UnknownRole(String),
}

/// Render a tag as one store line (without the newline).
pub fn format_line(tag: &IndexTag) -> String {
    format!("{}:{}:{}", tag.workstation, tag.role, tag.index)
}

/// Parse one store line. Fields are trimmed and the role is
/// case-insensitive; the workstation is everything before the first `:`.
pub fn parse_line(line: &str) -> std::result::Result<IndexTag, LineError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(LineError::Blank);
    }

    let mut fields = line.splitn(3, ':');
    let (Some(ws), Some(role), Some(index)) = (fields.next(), fields.next(), fields.next()) else {
        return Err(LineError::TooFewFields(line.to_string()));
    };

    let index = index.trim();
    let index = match index.parse::<u32>() {
        Ok(i) if i > 0 => IterationIndex(i),
        _ => return Err(LineError::BadIndex(index.to_string())),
    };
    let role = Role::parse(role).ok_or_else(|| LineError::UnknownRole(role.trim().to_string()))?;

    Ok(IndexTag::new(WorkstationId::new(ws), role, index))
}

/// Parse a whole store body, skipping (and logging) malformed lines.
pub fn parse_lines(body: &str) -> Vec<IndexTag> {
    body.lines()
        .enumerate()
        .filter_map(|(n, line)| match parse_line(line) {
            Ok(tag) => Some(tag),
            Err(LineError::Blank) => None,
            Err(err @ LineError::UnknownRole(_)) => {
                debug!("Index line {}: {err}, ignored", n + 1);
                None
            }
            Err(err) => {
                warn!("Index line {}: {err}, skipped", n + 1);
                None
            }
        })
        .collect()
}

/// Build the comparator view. Median tags are left out.
pub fn group_by_role(tags: impl IntoIterator<Item = IndexTag>) -> RoleIndex {
    let mut map = RoleIndex::new();
    for tag in tags.into_iter().filter(|t| t.role.is_compared()) {
        map.entry(tag.workstation)
            .or_default()
            .entry(tag.role)
            .or_default()
            .push(tag.index);
    }
    map
}

/// Build the sorter view.
pub fn group_by_iteration(tags: impl IntoIterator<Item = IndexTag>) -> MarkIndex {
    let mut map = MarkIndex::new();
    for tag in tags {
        map.entry(tag.workstation)
            .or_default()
            .entry(tag.index)
            .or_default()
            .insert(tag.role);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_and_parse() {
        let tag = IndexTag::new(WorkstationId::new("WS-1"), Role::Abnormal, IterationIndex(7));
        assert_eq!(format_line(&tag), "WS-1:abnormal:7");
        assert_eq!(parse_line("WS-1:abnormal:7"), Ok(tag));
    }

    #[test]
    fn parse_trims_and_lowercases() {
        let tag = parse_line("  WS-2 : MAX : 12 ").unwrap();
        assert_eq!(tag.workstation.as_str(), "WS-2");
        assert_eq!(tag.role, Role::Max);
        assert_eq!(tag.index, IterationIndex(12));
    }

    #[test]
    fn malformed_lines() {
        assert_eq!(parse_line(""), Err(LineError::Blank));
        assert_eq!(
            parse_line("bad_line"),
            Err(LineError::TooFewFields("bad_line".into()))
        );
        assert_eq!(parse_line("WS-1:min"), Err(LineError::TooFewFields("WS-1:min".into())));
        assert_eq!(parse_line("WS-1:min:x"), Err(LineError::BadIndex("x".into())));
        assert_eq!(parse_line("WS-1:min:0"), Err(LineError::BadIndex("0".into())));
        assert_eq!(parse_line("WS-1:min:-3"), Err(LineError::BadIndex("-3".into())));
        assert_eq!(
            parse_line("WS-1:fastest:3"),
            Err(LineError::UnknownRole("fastest".into()))
        );
    }

    /// Malformed lines are skipped, good lines around them survive.
    #[test]
    fn parse_lines_skips_bad_lines() {
        let tags = parse_lines("WS-1:abnormal:7\nbad_line\n\nWS-1:min:3\nWS-1:min:three\n");
        let rendered: Vec<String> = tags.iter().map(format_line).collect();
        assert_eq!(rendered, vec!["WS-1:abnormal:7", "WS-1:min:3"]);
    }

    #[test]
    fn role_view_excludes_median() {
        let tags = parse_lines("WS-1:median:4\nWS-1:abnormal:7\nWS-1:min:3\n");
        let view = group_by_role(tags);
        let ws = &view["WS-1"];
        assert_eq!(ws.len(), 2);
        assert_eq!(ws[&Role::Abnormal], vec![IterationIndex(7)]);
        assert_eq!(ws[&Role::Min], vec![IterationIndex(3)]);
    }

    /// A workstation with only median tags has no comparator entry.
    #[test]
    fn role_view_median_only() {
        let view = group_by_role(parse_lines("WS-9:median:2\n"));
        assert!(view.is_empty());
    }

    #[test]
    fn mark_view_collects_roles_per_iteration() {
        let tags = parse_lines("WS-1:min:3\nWS-1:abnormal:3\nWS-1:median:5\nWS-1:min:3\n");
        let marks = group_by_iteration(tags);
        let ws = &marks["WS-1"];
        let roles: Vec<Role> = ws[&IterationIndex(3)].iter().copied().collect();
        assert_eq!(roles, vec![Role::Abnormal, Role::Min]);
        assert!(ws[&IterationIndex(5)].contains(&Role::Median));
    }
}
