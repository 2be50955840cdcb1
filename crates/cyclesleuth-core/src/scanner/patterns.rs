//! Shell-style file name patterns (`*cycleTime.csv`, `005_*cycleTime.csv`).
//!
//! Patterns are `globset` globs matched against the file name, never the
//! full path. Matching is case-sensitive.
use crate::error::{CoreError, Result};
use globset::{Glob, GlobMatcher, GlobSet, GlobSetBuilder};
use std::path::Path;

/// A compiled file-name pattern.
#[derive(Debug, Clone)]
pub struct LogPattern {
    glob: Glob,
    matcher: GlobMatcher,
}

impl LogPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let glob = Glob::new(pattern).map_err(|source| CoreError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            matcher: glob.compile_matcher(),
            glob,
        })
    }

    pub fn as_str(&self) -> &str {
        self.glob.glob()
    }

    pub fn matches_name(&self, name: &str) -> bool {
        self.matcher.is_match(name)
    }

    /// Match the final component of `path`.
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|n| self.matcher.is_match(n))
    }
}

/// The set of patterns a workstation's raw tree is searched with.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<LogPattern>,
    set: GlobSet,
}

impl PatternSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| LogPattern::new(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_patterns(patterns)
    }

    pub fn single(pattern: LogPattern) -> Result<Self> {
        Self::from_patterns(vec![pattern])
    }

    fn from_patterns(patterns: Vec<LogPattern>) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for p in &patterns {
            builder.add(p.glob.clone());
        }
        let set = builder.build().map_err(|source| CoreError::Pattern {
            pattern: patterns
                .iter()
                .map(LogPattern::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            source,
        })?;
        Ok(Self { patterns, set })
    }

    /// `true` if any pattern matches the file name of `path`.
    pub fn matches(&self, path: &Path) -> bool {
        path.file_name().is_some_and(|n| self.set.is_match(n))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogPattern> {
        self.patterns.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_pattern() {
        let p = LogPattern::new("*cycleTime.csv").unwrap();
        assert!(p.matches_name("2024-01-01_10-00-00-cycleTime.csv"));
        assert!(p.matches_name("cycleTime.csv"));
        assert!(!p.matches_name("cycleTime.csv.bak"));
        assert!(!p.matches_name("cycletime.csv"), "matching is case-sensitive");
    }

    /// A dot is a literal dot, not a wildcard.
    #[test]
    fn dots_are_literal() {
        let p = LogPattern::new("*host.log").unwrap();
        assert!(p.matches_name("a_host.log"));
        assert!(!p.matches_name("a_hostXlog"));
    }

    #[test]
    fn prefix_and_inner_wildcards() {
        let p = LogPattern::new("005_*_*cycleTime.csv").unwrap();
        assert!(p.matches_name("005_2024-01-01_10-00-00-cycleTime.csv"));
        assert!(p.matches_name("005_2024-01-01_10-00-00_run-cycleTime.csv"));
        assert!(!p.matches_name("015_2024-01-01_10-00-00-cycleTime.csv"));
    }

    #[test]
    fn set_matches_any() {
        let set = PatternSet::new(&["*cycleTime.csv", "*serial.log"]).unwrap();
        assert!(set.matches(Path::new("/x/y/run_serial.log")));
        assert!(set.matches(Path::new("/x/y/cycleTime.csv")));
        assert!(!set.matches(Path::new("/x/y/notes.txt")));
        assert_eq!(set.iter().count(), 2);
    }

    /// The wildcard never reaches into parent folders.
    #[test]
    fn only_the_file_name_is_matched() {
        let p = LogPattern::new("005_*cycleTime.csv").unwrap();
        assert!(!p.matches(Path::new("/sorted/005_x/cycleTime.csv")));
        assert!(p.matches(Path::new("/sorted/005_x-cycleTime.csv")));
        assert_eq!(p.as_str(), "005_*cycleTime.csv");
    }

    #[test]
    fn malformed_glob_is_an_error() {
        assert!(matches!(LogPattern::new("[abc"), Err(CoreError::Pattern { .. })));
    }
}
