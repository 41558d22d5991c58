//! Recursive enumeration of the files to pack from a directory.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::error::{Error, Result};

/// A regular file found below the walked root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedFile {
    /// Path relative to the root, `/` separated
    pub relative: String,
    pub absolute: PathBuf,
}

/// Lists every regular file below `root`, sorted by name within each directory
#[instrument(err)]
pub fn list_directory_recursive(root: &Path) -> Result<Vec<WalkedFile>> {
    if !root.is_dir() {
        return Err(Error::CannotOpen(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|_| Error::InvalidFilename(entry.path().display().to_string()))?;

        let relative = relative
            .components()
            .map(|component| {
                component
                    .as_os_str()
                    .to_str()
                    .ok_or_else(|| Error::InvalidFilename(relative.display().to_string()))
            })
            .collect::<Result<Vec<_>>>()?
            .join("/");

        debug!(%relative, "found file");
        files.push(WalkedFile {
            relative,
            absolute: entry.path().to_path_buf(),
        });
    }

    Ok(files)
}

#[cfg(test)]
mod test {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::list_directory_recursive;
    use crate::error::{Error, Result};

    #[traced_test]
    #[test]
    fn lists_nested_files_sorted() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir_all(dir.path().join("model/woman"))?;
        fs::create_dir_all(dir.path().join("empty"))?;
        fs::write(dir.path().join("zeta.txt"), b"z")?;
        fs::write(dir.path().join("alpha.txt"), b"a")?;
        fs::write(dir.path().join("model/woman/hair.elu"), b"h")?;

        let files = list_directory_recursive(dir.path())?;
        let names = files.iter().map(|f| f.relative.as_str()).collect::<Vec<_>>();

        assert_eq!(names, vec!["alpha.txt", "model/woman/hair.elu", "zeta.txt"]);
        assert_eq!(files[1].absolute, dir.path().join("model/woman/hair.elu"));

        Ok(())
    }

    #[test]
    fn missing_root_cannot_be_opened() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("missing");

        assert!(matches!(
            list_directory_recursive(&missing),
            Err(Error::CannotOpen(path)) if path == missing
        ));

        Ok(())
    }
}
