//! Timestamp tokens and the shared chronological indexer.
//!
//! Iteration identity comes solely from a `YYYY-MM-DD_HH-MM-SS` token in a
//! file's path. The extractor numbers the parseable records with
//! [`index_by_time`]; every later stage looks indices up in the
//! [`IterationNumbering`] of that series instead of renumbering, so the
//! index written to the index store and the index used to name sorted
//! folders cannot drift apart.
use crate::model::{IterationIndex, TimeSeries};
use chrono::NaiveDateTime;
use compact_str::CompactString;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

/// `chrono` format of the timestamp token.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}").expect("timestamp token regex is valid")
});

/// A parsed timestamp token. Ordered by time.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Stamp {
    at: NaiveDateTime,
    token: CompactString,
}

impl Stamp {
    /// Parse a bare token such as `2024-03-01_08-15-00`.
    pub fn parse(token: &str) -> Option<Self> {
        let at = NaiveDateTime::parse_from_str(token, TIMESTAMP_FORMAT).ok()?;
        Some(Self {
            at,
            token: CompactString::new(token),
        })
    }

    pub fn at(&self) -> NaiveDateTime {
        self.at
    }

    /// The token exactly as it appeared in the path.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// Find the iteration timestamp of `path`.
///
/// The file name is searched first, then parent components from the
/// nearest outward. Within a component the first token that is a real
/// date-time wins; tokens like `2024-13-45_99-00-00` are ignored.
pub fn timestamp_of(path: &Path) -> Option<Stamp> {
    path.components().rev().find_map(|component| {
        let text = component.as_os_str().to_string_lossy();
        TOKEN_RE
            .find_iter(&text)
            .find_map(|m| Stamp::parse(m.as_str()))
    })
}

/// One iteration: every item that carried the same timestamp.
#[derive(Debug, Clone)]
pub struct IterationGroup<T> {
    pub index: IterationIndex,
    pub stamp: Stamp,
    /// Items in the order they were supplied.
    pub members: Vec<T>,
}

/// Assign chronological indices.
///
/// Items sharing a stamp are merged into one group rather than
/// overwriting each other; groups are sorted by ascending time and
/// numbered `1..=N` without gaps.
pub fn index_by_time<T, I>(entries: I) -> Vec<IterationGroup<T>>
where
    I: IntoIterator<Item = (Stamp, T)>,
{
    group_by_stamp(entries)
        .into_iter()
        .enumerate()
        .map(|(position, (stamp, members))| IterationGroup {
            index: IterationIndex::from_position(position),
            stamp,
            members,
        })
        .collect()
}

/// Collect items per stamp, ascending by time. Members keep supply order.
pub fn group_by_stamp<T, I>(entries: I) -> BTreeMap<Stamp, Vec<T>>
where
    I: IntoIterator<Item = (Stamp, T)>,
{
    let mut by_stamp: BTreeMap<Stamp, Vec<T>> = BTreeMap::new();
    for (stamp, item) in entries {
        by_stamp.entry(stamp).or_default().push(item);
    }
    by_stamp
}

/// The timestamp-to-index mapping of an extracted series.
///
/// Only iterations that produced a sample are numbered. A stamp that is
/// not in the mapping has no index, however many log files carry it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IterationNumbering {
    by_time: BTreeMap<NaiveDateTime, IterationIndex>,
}

impl IterationNumbering {
    pub fn from_series(series: &TimeSeries) -> Self {
        Self {
            by_time: series
                .samples
                .iter()
                .map(|s| (s.timestamp, s.index))
                .collect(),
        }
    }

    pub fn index_of(&self, stamp: &Stamp) -> Option<IterationIndex> {
        self.by_time.get(&stamp.at()).copied()
    }

    pub fn contains(&self, index: IterationIndex) -> bool {
        self.by_time.values().any(|&i| i == index)
    }

    pub fn len(&self) -> usize {
        self.by_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_time.is_empty()
    }

    /// `(timestamp, index)` pairs, earliest first.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, IterationIndex)> + '_ {
        self.by_time.iter().map(|(&at, &index)| (at, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn token_in_file_name() {
        let stamp = timestamp_of(Path::new("/logs/2024-03-01_08-15-00-cycleTime.csv")).unwrap();
        assert_eq!(stamp.token(), "2024-03-01_08-15-00");
    }

    /// The file name wins over a token in a parent folder.
    #[test]
    fn file_name_before_parents() {
        let p = Path::new("/logs/2024-01-01_00-00-00/run_2024-02-02_11-22-33_host.log");
        assert_eq!(timestamp_of(p).unwrap().token(), "2024-02-02_11-22-33");
    }

    #[test]
    fn token_in_parent_folder() {
        let p = Path::new("/logs/day1/Restore_2024-05-06_07-08-09/nested/cycleTime.csv");
        assert_eq!(timestamp_of(p).unwrap().token(), "2024-05-06_07-08-09");
    }

    #[test]
    fn no_token_is_none() {
        assert!(timestamp_of(Path::new("/logs/run/cycleTime.csv")).is_none());
    }

    /// A token-shaped string that is not a real date-time is skipped.
    #[test]
    fn impossible_dates_are_rejected() {
        assert!(timestamp_of(Path::new("/l/2024-13-45_10-00-00-cycleTime.csv")).is_none());
        let p = Path::new("/l/2024-01-02_03-04-05/2024-13-45_10-00-00-cycleTime.csv");
        assert_eq!(timestamp_of(p).unwrap().token(), "2024-01-02_03-04-05");
    }

    #[test]
    fn stamps_order_by_time() {
        let a = Stamp::parse("2023-12-31_23-59-59").unwrap();
        let b = Stamp::parse("2024-01-01_00-00-00").unwrap();
        assert!(a < b);
    }

    #[test]
    fn index_by_time_ranks_ascending() {
        let entries = vec![
            (Stamp::parse("2024-01-03_00-00-00").unwrap(), "c"),
            (Stamp::parse("2024-01-01_00-00-00").unwrap(), "a"),
            (Stamp::parse("2024-01-02_00-00-00").unwrap(), "b"),
        ];
        let groups = index_by_time(entries);
        let got: Vec<(u32, &str)> = groups.iter().map(|g| (g.index.get(), g.members[0])).collect();
        assert_eq!(got, vec![(1, "a"), (2, "b"), (3, "c")]);
    }

    /// Equal stamps collapse into one group instead of colliding.
    #[test]
    fn index_by_time_groups_equal_stamps() {
        let s = Stamp::parse("2024-01-01_00-00-00").unwrap();
        let later = Stamp::parse("2024-01-01_00-00-01").unwrap();
        let entries = vec![
            (s.clone(), PathBuf::from("a/cycleTime.csv")),
            (later, PathBuf::from("c/cycleTime.csv")),
            (s, PathBuf::from("b/host.log")),
        ];
        let groups = index_by_time(entries);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].members.len(), 2);
        assert_eq!(groups[1].index, IterationIndex(2));
    }

    /// Numbering follows the series, so a gap in the samples stays a gap.
    #[test]
    fn numbering_comes_from_the_series() {
        use crate::model::{Sample, WorkstationId};

        let mut series = TimeSeries::new(WorkstationId::new("WS-1"));
        for (pos, token) in ["2024-01-01_10-00-00", "2024-01-01_12-00-00"].iter().enumerate() {
            series.samples.push(Sample {
                index: IterationIndex::from_position(pos),
                timestamp: Stamp::parse(token).unwrap().at(),
                value: 1.0,
                source: PathBuf::from("x.csv"),
            });
        }

        let numbering = IterationNumbering::from_series(&series);
        assert_eq!(numbering.len(), 2);
        let noon = Stamp::parse("2024-01-01_12-00-00").unwrap();
        assert_eq!(numbering.index_of(&noon), Some(IterationIndex(2)));
        let eleven = Stamp::parse("2024-01-01_11-00-00").unwrap();
        assert_eq!(numbering.index_of(&eleven), None);
        assert!(numbering.contains(IterationIndex(2)));
        assert!(!numbering.contains(IterationIndex(3)));
    }

    #[test]
    fn index_by_time_empty() {
        let groups: Vec<IterationGroup<()>> = index_by_time(Vec::new());
        assert!(groups.is_empty());
    }
}
