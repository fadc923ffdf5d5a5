//! Depth-first directory traversal for `-R`.
//!
//! Entries whose names start with `.` are skipped, which also covers `.`
//! and `..`. Siblings are visited in byte order of their names so runs are
//! reproducible. Symbolic links to files are followed; links to
//! directories are not, which rules out cycles.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::CliError;

/// Iterator over the regular files below a directory.
#[derive(Debug)]
pub struct DirectoryWalker {
    stack: Vec<std::vec::IntoIter<PathBuf>>,
}

impl DirectoryWalker {
    /// Starts a walk below `root`.
    pub fn new(root: &Path) -> Result<Self, CliError> {
        let mut walker = Self { stack: Vec::new() };
        walker.push_directory(root)?;
        Ok(walker)
    }

    fn push_directory(&mut self, directory: &Path) -> Result<(), CliError> {
        let walk_error = |source| CliError::Walk {
            path: directory.to_path_buf(),
            source,
        };
        let mut children = Vec::new();
        for entry in fs::read_dir(directory).map_err(walk_error)? {
            let entry = entry.map_err(walk_error)?;
            if is_hidden(&entry.file_name()) {
                continue;
            }
            children.push(entry.path());
        }
        children.sort();
        debug!(directory = %directory.display(), entries = children.len(), "entering directory");
        self.stack.push(children.into_iter());
        Ok(())
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&b'.')
}

impl Iterator for DirectoryWalker {
    type Item = Result<PathBuf, CliError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let path = match self.stack.last_mut()?.next() {
                Some(path) => path,
                None => {
                    self.stack.pop();
                    continue;
                }
            };

            let metadata = match fs::symlink_metadata(&path) {
                Ok(metadata) => metadata,
                Err(source) => return Some(Err(CliError::Operand { path, source })),
            };
            let file_type = metadata.file_type();

            if file_type.is_dir() {
                if let Err(error) = self.push_directory(&path) {
                    return Some(Err(error));
                }
            } else if file_type.is_file() {
                return Some(Ok(path));
            } else if file_type.is_symlink() {
                match fs::metadata(&path) {
                    Ok(target) if target.is_file() => return Some(Ok(path)),
                    Ok(_) => debug!(path = %path.display(), "skipping link to non-file"),
                    Err(source) => return Some(Err(CliError::Operand { path, source })),
                }
            } else {
                debug!(path = %path.display(), "skipping special file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(root: &Path) -> Vec<PathBuf> {
        DirectoryWalker::new(root)
            .unwrap()
            .map(|entry| entry.unwrap().strip_prefix(root).unwrap().to_path_buf())
            .collect()
    }

    #[test]
    fn walks_depth_first_in_name_order() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("b/inner")).unwrap();
        fs::write(root.join("c.txt"), b"c").unwrap();
        fs::write(root.join("a.txt"), b"a").unwrap();
        fs::write(root.join("b/inner/d.txt"), b"d").unwrap();
        fs::write(root.join("b/e.txt"), b"e").unwrap();

        assert_eq!(
            collect(root),
            [
                PathBuf::from("a.txt"),
                PathBuf::from("b/e.txt"),
                PathBuf::from("b/inner/d.txt"),
                PathBuf::from("c.txt"),
            ]
        );
    }

    #[test]
    fn hidden_entries_are_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git/config"), b"x").unwrap();
        fs::write(root.join(".env"), b"x").unwrap();
        fs::write(root.join("kept"), b"x").unwrap();

        assert_eq!(collect(root), [PathBuf::from("kept")]);
    }

    #[cfg(unix)]
    #[test]
    fn directory_links_are_not_followed() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("real")).unwrap();
        fs::write(root.join("real/file"), b"x").unwrap();
        std::os::unix::fs::symlink(root.join("real"), root.join("loop")).unwrap();
        std::os::unix::fs::symlink(root.join("real/file"), root.join("alias")).unwrap();

        assert_eq!(
            collect(root),
            [PathBuf::from("alias"), PathBuf::from("real/file")]
        );
    }

    #[test]
    fn missing_root_is_an_open_failure() {
        let temp = tempfile::tempdir().unwrap();
        let error = DirectoryWalker::new(&temp.path().join("absent")).unwrap_err();
        assert_eq!(error.exit_code(), transfer::ExitCode::Open);
    }
}
