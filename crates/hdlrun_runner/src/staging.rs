//! The working directory of one run.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use hdlrun_common::ContentHash;
use tempfile::TempDir;

/// Errors raised while staging files.
#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    /// The destination name is already taken, by this run or by an existing file.
    #[error("name collision for file: {name}")]
    Collision {
        /// The file name.
        name: String,
    },

    /// A file name that is not a plain name inside the directory.
    #[error("invalid staged file name '{name}'")]
    InvalidName {
        /// The offending name.
        name: String,
    },

    /// The directory or a file in it could not be written.
    #[error("failed to write {path}: {source}")]
    Io {
        /// The path being created or written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

/// A file written into the staging directory by this run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedFile {
    /// Its absolute path.
    pub path: PathBuf,
    /// The hash of the content written.
    pub hash: ContentHash,
}

#[derive(Debug)]
enum Root {
    Ephemeral(TempDir),
    Persistent(PathBuf),
}

/// Owns every file created for one run.
///
/// An ephemeral directory is removed when this value is dropped, whatever the
/// outcome of the run. A persistent directory belongs to the caller and is
/// left in place.
#[derive(Debug)]
pub struct StagingDirectory {
    root: Root,
    staged: BTreeMap<String, StagedFile>,
}

impl StagingDirectory {
    /// Creates a fresh temporary directory.
    pub fn ephemeral() -> Result<Self, StagingError> {
        let dir = tempfile::Builder::new()
            .prefix("hdlrun-")
            .tempdir()
            .map_err(|source| StagingError::Io {
                path: std::env::temp_dir(),
                source,
            })?;
        log::debug!("staging in {}", dir.path().display());
        Ok(Self {
            root: Root::Ephemeral(dir),
            staged: BTreeMap::new(),
        })
    }

    /// Uses `dir`, creating it if it does not exist.
    pub fn persistent(dir: impl Into<PathBuf>) -> Result<Self, StagingError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StagingError::Io {
            path: dir.clone(),
            source,
        })?;
        log::debug!("staging in {}", dir.display());
        Ok(Self {
            root: Root::Persistent(dir),
            staged: BTreeMap::new(),
        })
    }

    /// The directory path.
    pub fn path(&self) -> &Path {
        match &self.root {
            Root::Ephemeral(dir) => dir.path(),
            Root::Persistent(dir) => dir,
        }
    }

    /// Returns true if the directory is removed at the end of the run.
    pub fn is_ephemeral(&self) -> bool {
        matches!(self.root, Root::Ephemeral(_))
    }

    /// Returns true if this run already staged a file called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.staged.contains_key(name)
    }

    /// Writes `data` to `name` inside the directory.
    ///
    /// Fails without writing if this run already staged a file of that name
    /// or the directory already holds one.
    pub fn stage_bytes(&mut self, name: &str, data: &[u8]) -> Result<PathBuf, StagingError> {
        self.write(name, data, false)
    }

    /// Writes generated `data` to `name`, replacing output left by earlier runs.
    ///
    /// Fails without writing if this run already staged a file of that name.
    pub fn stage_generated(&mut self, name: &str, data: &[u8]) -> Result<PathBuf, StagingError> {
        self.write(name, data, true)
    }

    fn write(&mut self, name: &str, data: &[u8], replace: bool) -> Result<PathBuf, StagingError> {
        if Path::new(name).file_name().and_then(|n| n.to_str()) != Some(name) {
            return Err(StagingError::InvalidName {
                name: name.to_string(),
            });
        }
        if self.contains(name) {
            return Err(StagingError::Collision {
                name: name.to_string(),
            });
        }
        let path = self.path().join(name);
        if !replace && path.exists() {
            return Err(StagingError::Collision {
                name: name.to_string(),
            });
        }
        fs::write(&path, data).map_err(|source| StagingError::Io {
            path: path.clone(),
            source,
        })?;
        let hash = ContentHash::from_bytes(data);
        log::debug!("staged {} ({hash})", path.display());
        self.staged.insert(
            name.to_string(),
            StagedFile {
                path: path.clone(),
                hash,
            },
        );
        Ok(path)
    }

    /// The files staged so far, by name.
    pub fn staged(&self) -> &BTreeMap<String, StagedFile> {
        &self.staged
    }
}
