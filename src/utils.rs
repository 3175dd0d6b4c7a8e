//! Utility functions for reading job inputs.
//!

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use glob::glob;

use crate::error::{Error, Result};
use crate::format::Location;

/// Read an entire file into a [`String`].
///
/// A file that cannot be opened or read is [`Error::SourceNotFound`]. A
/// file that is not UTF-8 is [`Error::Parse`] at the line of the first bad
/// byte.
pub fn read_to_string(path: &Path) -> Result<String> {
    let bytes = read_bytes(path)?;
    String::from_utf8(bytes).map_err(|err| {
        let valid = &err.as_bytes()[..err.utf8_error().valid_up_to()];
        let line = valid.iter().filter(|&&b| b == b'\n').count() as u64 + 1;
        Error::parse(
            Location::new(path.display().to_string(), line),
            "input is not valid UTF-8",
        )
    })
}

/// Read an entire file into a byte vector.
pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|err| Error::source_not_found(path.display(), err))
}

/// Expands glob patterns into input paths, pattern by pattern.
///
/// Matches of one pattern come back sorted. A pattern that matches nothing
/// is kept as a literal path, so that a missing input fails the job when it
/// is read instead of silently vanishing.
pub fn expand_inputs(patterns: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for pattern in patterns {
        let before = paths.len();
        for entry in glob(pattern).with_context(|| format!("invalid input pattern `{pattern}`"))? {
            paths.push(entry?);
        }
        if paths.len() == before {
            paths.push(PathBuf::from(pattern));
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;

    #[test]
    fn globs_expand_sorted_and_misses_stay_literal() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt", "c.csv"] {
            File::create(dir.path().join(name)).unwrap();
        }
        let pattern = format!("{}/*.txt", dir.path().display());
        let missing = format!("{}/missing.txt", dir.path().display());

        let paths = expand_inputs(&[pattern, missing.clone()]).unwrap();
        assert_eq!(
            paths,
            vec![
                dir.path().join("a.txt"),
                dir.path().join("b.txt"),
                PathBuf::from(missing),
            ]
        );
    }

    #[test]
    fn unreadable_paths_are_source_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_to_string(&dir.path().join("gone")).unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { .. }));
    }

    #[test]
    fn non_utf8_files_are_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.txt");
        fs::write(&path, b"fine\ncaf\xe9 au lait\n").unwrap();
        match read_to_string(&path) {
            Err(Error::Parse { location, .. }) => assert_eq!(location.line, 2),
            other => panic!("expected a parse error, got {other:?}"),
        }
    }
}
