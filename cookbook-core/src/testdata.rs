//! Locating fixture files.

use crate::error::{LedgerError, Result};
use std::path::{Path, PathBuf};

/// Name of the fixture directory searched for by [`find_test_data_file`].
pub const TEST_DATA_DIR: &str = "testdata";

/// Resolves `test_data_name` inside the nearest `testdata` directory above the
/// current working directory.
pub fn find_test_data_file(test_data_name: &str) -> Result<PathBuf> {
    let cwd = std::env::current_dir()?;
    find_test_data_file_from(&cwd, test_data_name)
}

/// Same as [`find_test_data_file`], starting the upward search at `start`.
pub fn find_test_data_file_from(start: &Path, test_data_name: &str) -> Result<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(TEST_DATA_DIR))
        .find(|candidate| candidate.is_dir())
        .map(|test_data_dir| test_data_dir.join(test_data_name))
        .ok_or_else(|| {
            LedgerError::InvalidConfiguration(
                "Could not locate testdata directory.  Tests must be run inside of the cookbook repo"
                    .to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_finds_testdata_from_any_depth() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("testdata")).unwrap();
        let nested = root.path().join("a").join("b").join("c");
        fs::create_dir_all(&nested).unwrap();

        for start in [
            root.path().to_path_buf(),
            root.path().join("a"),
            root.path().join("a").join("b"),
            nested.clone(),
        ] {
            let found = find_test_data_file_from(&start, "foo.bin").unwrap();
            assert!(found.ends_with("testdata/foo.bin"));
            assert_eq!(found, root.path().join("testdata").join("foo.bin"));
        }
    }

    #[test]
    fn test_nearest_testdata_wins() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("testdata")).unwrap();
        let inner = root.path().join("inner");
        fs::create_dir_all(inner.join("testdata")).unwrap();

        let found = find_test_data_file_from(&inner, "foo.bin").unwrap();
        assert_eq!(found, inner.join("testdata").join("foo.bin"));
    }

    #[test]
    fn test_plain_file_named_testdata_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("testdata")).unwrap();
        let inner = root.path().join("inner");
        fs::create_dir(&inner).unwrap();
        fs::write(inner.join("testdata"), b"not a directory").unwrap();

        let found = find_test_data_file_from(&inner, "foo.bin").unwrap();
        assert_eq!(found, root.path().join("testdata").join("foo.bin"));
    }

    #[test]
    fn test_missing_testdata_is_invalid_configuration() {
        let root = tempfile::tempdir().unwrap();
        let err = find_test_data_file_from(root.path(), "foo.bin").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("inside of the cookbook repo"));
    }

    #[test]
    fn test_repository_fixture_is_found() {
        let path = find_test_data_file("airquality.csv").unwrap();
        assert!(path.is_file());
    }
}
