//! Include/exclude filtering of candidate file names.

use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::error::{Result, WatcherError};

/// Compiled include and exclude globs, matched against bare file names.
///
/// Include wins: a name matching any include glob is a candidate even if it
/// also matches an exclude glob. Otherwise it is a candidate when there are no
/// include globs, or when there are exclude globs and none of them match.
///
/// Paths registered with [`FileFilter::ignoring`] are never candidates,
/// whatever their name.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    ignored: Vec<PathBuf>,
}

impl FileFilter {
    /// Compile the given patterns.
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self> {
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
            ignored: Vec::new(),
        })
    }

    /// Never offer the file at `path` (absolute, normalised) for dispatch.
    pub fn ignoring(mut self, path: impl Into<PathBuf>) -> Self {
        self.ignored.push(path.into());
        self
    }

    /// Check whether a path was excluded with [`FileFilter::ignoring`].
    pub fn is_ignored(&self, path: &Path) -> bool {
        self.ignored.iter().any(|ignored| ignored == path)
    }

    /// A filter that accepts every file.
    pub fn accept_all() -> Self {
        Self::default()
    }

    /// Whether no patterns are configured.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Check whether a file name is eligible for dispatch.
    pub fn is_candidate(&self, name: &str) -> bool {
        if self.is_empty() {
            return true;
        }

        if self.include.iter().any(|p| p.matches(name)) {
            return true;
        }

        if !self.include.is_empty() && self.exclude.is_empty() {
            return false;
        }

        !self.exclude.is_empty() && !self.exclude.iter().any(|p| p.matches(name))
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| {
            let pattern = pattern.as_ref();
            Pattern::new(pattern).map_err(|e| WatcherError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.msg.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NONE: &[&str] = &[];

    fn candidates<'a>(filter: &FileFilter, names: &[&'a str]) -> Vec<&'a str> {
        names
            .iter()
            .copied()
            .filter(|name| filter.is_candidate(name))
            .collect()
    }

    #[test]
    fn test_no_patterns_accepts_everything() {
        let filter = FileFilter::accept_all();
        assert_eq!(
            candidates(&filter, &["a.txt", "b.log", ".hidden"]),
            vec!["a.txt", "b.log", ".hidden"]
        );
    }

    #[test]
    fn test_include_only() {
        let filter = FileFilter::new(&["*.txt"], NONE).unwrap();
        assert_eq!(candidates(&filter, &["a.txt", "b.log"]), vec!["a.txt"]);
    }

    #[test]
    fn test_exclude_only() {
        let filter = FileFilter::new(NONE, &["*.log", "~*"]).unwrap();
        assert_eq!(
            candidates(&filter, &["a.txt", "b.log", "~lock"]),
            vec!["a.txt"]
        );
    }

    #[test]
    fn test_include_wins_over_exclude() {
        let filter = FileFilter::new(&["*.txt"], &["secret*"]).unwrap();
        assert_eq!(
            candidates(&filter, &["a.txt", "secret.txt", "b.log"]),
            vec!["a.txt", "secret.txt"]
        );
    }

    #[test]
    fn test_include_and_exclude_admit_unexcluded_others() {
        let filter = FileFilter::new(&["*.txt"], &["*.log"]).unwrap();
        assert_eq!(
            candidates(&filter, &["a.txt", "b.log", "c.csv"]),
            vec!["a.txt", "c.csv"]
        );
    }

    #[test]
    fn test_multiple_includes() {
        let filter = FileFilter::new(&["*.csv", "report-?.pdf"], NONE).unwrap();
        assert_eq!(
            candidates(&filter, &["a.csv", "report-1.pdf", "report-12.pdf"]),
            vec!["a.csv", "report-1.pdf"]
        );
    }

    #[test]
    fn test_ignored_path_is_matched_exactly() {
        let filter = FileFilter::accept_all().ignoring("/srv/inbox/monitor.tmp");
        assert!(filter.is_ignored(Path::new("/srv/inbox/monitor.tmp")));
        assert!(!filter.is_ignored(Path::new("/srv/other/monitor.tmp")));
        assert!(filter.is_candidate("monitor.tmp"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let err = FileFilter::new(&["[unterminated"], NONE).unwrap_err();
        assert!(matches!(err, WatcherError::InvalidPattern { pattern, .. } if pattern == "[unterminated"));
    }
}
