//! Filesystem discovery of KMZ archives.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, instrument};
use walkdir::WalkDir;

/// File name suffix identifying candidate archives.
pub const ARCHIVE_SUFFIX: &str = ".kmz";

/// Errors that abort discovery.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The walk could not continue (missing root, unreadable directory, ...).
    #[error("cannot traverse {path}: {source}")]
    Filesystem {
        /// Path at which the walk failed.
        path: PathBuf,
        /// The underlying walk error.
        #[source]
        source: walkdir::Error,
    },
}

/// Recursively collects every file under `root` whose path ends in `.kmz`.
///
/// `root` may itself be a file. Matching is an exact, case-sensitive suffix
/// match on the path. Entries of each directory are visited in file name
/// order; callers must not rely on any particular order beyond that.
///
/// # Errors
///
/// Returns [`DiscoveryError::Filesystem`] on the first entry the walk cannot
/// read. No partial result is returned.
#[instrument(skip(root), fields(root = %root.display()))]
pub fn discover(root: &Path) -> Result<Vec<PathBuf>, DiscoveryError> {
    let mut archives = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|source| DiscoveryError::Filesystem {
            path: source
                .path()
                .map_or_else(|| root.to_path_buf(), Path::to_path_buf),
            source,
        })?;

        if entry.file_type().is_dir() {
            continue;
        }

        if is_archive(entry.path()) {
            debug!(path = %entry.path().display(), "found archive");
            archives.push(entry.into_path());
        }
    }

    debug!(count = archives.len(), "discovery complete");
    Ok(archives)
}

fn is_archive(path: &Path) -> bool {
    path.to_string_lossy().ends_with(ARCHIVE_SUFFIX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn test_discover_finds_nested_archives() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join("top.kmz"), b"").unwrap();
        fs::write(nested.join("deep.kmz"), b"").unwrap();
        fs::write(nested.join("notes.txt"), b"").unwrap();

        let found = discover(temp_dir.path()).unwrap();

        assert_eq!(found.len(), 2);
        assert!(found.contains(&temp_dir.path().join("top.kmz")));
        assert!(found.contains(&nested.join("deep.kmz")));
    }

    #[test]
    fn test_discover_suffix_is_case_sensitive() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("upper.KMZ"), b"").unwrap();
        fs::write(temp_dir.path().join("plain.kml"), b"").unwrap();
        fs::write(temp_dir.path().join("archive.kmz.bak"), b"").unwrap();

        let found = discover(temp_dir.path()).unwrap();

        assert!(found.is_empty());
    }

    #[test]
    fn test_discover_file_root_is_candidate() {
        let temp_dir = tempfile::tempdir().unwrap();
        let archive = temp_dir.path().join("single.kmz");
        fs::write(&archive, b"").unwrap();

        let found = discover(&archive).unwrap();

        assert_eq!(found, vec![archive]);
    }

    #[test]
    fn test_discover_skips_directories_with_archive_suffix() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("folder.kmz");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("inner.kmz"), b"").unwrap();

        let found = discover(temp_dir.path()).unwrap();

        assert_eq!(found, vec![dir.join("inner.kmz")]);
    }

    #[test]
    fn test_discover_order_is_stable() {
        let temp_dir = tempfile::tempdir().unwrap();
        for name in ["c.kmz", "a.kmz", "b.kmz"] {
            fs::write(temp_dir.path().join(name), b"").unwrap();
        }

        let found = discover(temp_dir.path()).unwrap();

        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, ["a.kmz", "b.kmz", "c.kmz"]);
    }

    #[test]
    fn test_discover_missing_root_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("does-not-exist");

        let err = discover(&missing).unwrap_err();

        let DiscoveryError::Filesystem { path, .. } = err;
        assert_eq!(path, missing);
    }

    #[test]
    fn test_discover_empty_tree_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(discover(temp_dir.path()).unwrap().is_empty());
    }
}
