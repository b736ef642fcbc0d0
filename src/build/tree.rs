//! Build directory lifecycle
//!
//! The build tree lives at `<project_root>/build`. Its `_deps` subdirectory
//! holds third-party sources fetched during configuration and survives an
//! ordinary [`BuildTree::clean`]; only [`BuildTree::clean_all`] discards it.
//!
//! A clean moves `_deps` to a stash directory outside the tree, removes the
//! tree, recreates it and moves every stashed entry back. Nothing is deleted
//! unless the stash move succeeded first.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::error::BuildError;
use crate::utils::terminal::Reporter;

/// Build tree directory name under the project root
pub const BUILD_DIR_NAME: &str = "build";

/// Dependency cache directory name inside the build tree
pub const DEPS_DIR_NAME: &str = "_deps";

/// Stash directory name prefix, followed by the process id
pub const STASH_PREFIX: &str = "cmbuild_deps_cache";

/// File whose presence marks a configured tree
const CMAKE_CACHE_FILE: &str = "CMakeCache.txt";

/// Observable state of the build tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeState {
    Absent,
    PresentClean,
    PresentConfigured,
}

/// On-disk build tree of one project
#[derive(Debug, Clone)]
pub struct BuildTree {
    root: PathBuf,
    stash_root: PathBuf,
}

impl BuildTree {
    /// Build tree for a project, stashing into the system temp directory
    pub fn new(project_root: &Path) -> Self {
        Self {
            root: project_root.join(BUILD_DIR_NAME),
            stash_root: std::env::temp_dir(),
        }
    }

    /// Stash the dependency cache under `dir` instead of the temp directory
    pub fn with_stash_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.stash_root = dir.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn deps_dir(&self) -> PathBuf {
        self.root.join(DEPS_DIR_NAME)
    }

    pub fn state(&self) -> TreeState {
        if !self.root.is_dir() {
            TreeState::Absent
        } else if self.root.join(CMAKE_CACHE_FILE).is_file() {
            TreeState::PresentConfigured
        } else {
            TreeState::PresentClean
        }
    }

    /// Create the build tree if it does not exist yet
    pub fn ensure_exists(&self, reporter: &dyn Reporter) -> Result<(), BuildError> {
        if self.root.is_dir() {
            return Ok(());
        }

        fs::create_dir_all(&self.root)
            .map_err(|e| BuildError::filesystem("create", &self.root, e))?;
        reporter.success(&format!(
            "Build directory {} created successfully.",
            self.root.display()
        ));
        Ok(())
    }

    /// Empty the build tree while keeping the dependency cache
    ///
    /// An absent tree is simply created. A failed stash aborts before anything
    /// is removed. If the tree cannot be removed or recreated, the stash is moved
    /// back into it, or named in [`BuildError::CacheStranded`] when that fails
    /// too. Restoring is attempted for every stashed entry even if some
    /// fail; failures leave those entries in the stash and are returned as
    /// [`BuildError::CacheRestore`].
    pub fn clean(&self, reporter: &dyn Reporter) -> Result<(), BuildError> {
        if !self.root.exists() {
            debug!("{} absent, nothing to preserve", self.root.display());
            return self.ensure_exists(reporter);
        }

        reporter.info(&format!("Cleaning directory {}", self.root.display()));

        let stash = self.stash_deps()?;

        if let Err(err) = self.reset_root() {
            return Err(match stash {
                Some(stash) => self.recover_stash(&stash, err, reporter),
                None => err,
            });
        }

        if let Some(stash) = stash {
            self.restore_deps(&stash, reporter)?;
        }

        reporter.success(&format!("{} cleaned successfully.", self.root.display()));
        Ok(())
    }

    /// Remove the build tree including the dependency cache
    pub fn clean_all(&self, reporter: &dyn Reporter) -> Result<(), BuildError> {
        if !self.root.exists() {
            reporter.info(&format!(
                "Build directory {} does not exist",
                self.root.display()
            ));
            return Ok(());
        }

        fs::remove_dir_all(&self.root)
            .map_err(|e| BuildError::filesystem("remove", &self.root, e))?;
        reporter.success(&format!(
            "Build directory {} cleaned successfully.",
            self.root.display()
        ));
        Ok(())
    }

    /// Move `_deps` out of the tree, returning the stash location
    fn stash_deps(&self) -> Result<Option<PathBuf>, BuildError> {
        let deps = self.deps_dir();
        if !deps.is_dir() {
            return Ok(None);
        }

        fs::create_dir_all(&self.stash_root)
            .map_err(|e| BuildError::filesystem("create", &self.stash_root, e))?;
        let stash = self.free_stash_path();
        debug!("stashing {} to {}", deps.display(), stash.display());

        move_path(&deps, &stash).map_err(|e| BuildError::filesystem("preserve", &deps, e))?;
        Ok(Some(stash))
    }

    fn reset_root(&self) -> Result<(), BuildError> {
        fs::remove_dir_all(&self.root)
            .map_err(|e| BuildError::filesystem("remove", &self.root, e))?;
        fs::create_dir_all(&self.root)
            .map_err(|e| BuildError::filesystem("create", &self.root, e))
    }

    /// Put a stashed cache back after the tree could not be reset
    ///
    /// Returns `cause` when the cache is back in the tree, otherwise
    /// [`BuildError::CacheStranded`] naming the stash.
    fn recover_stash(&self, stash: &Path, cause: BuildError, reporter: &dyn Reporter) -> BuildError {
        let deps = self.deps_dir();
        match move_path(stash, &deps) {
            Ok(()) => {
                reporter.warning(&format!(
                    "Clean interrupted; dependency cache moved back to {}",
                    deps.display()
                ));
                cause
            }
            Err(e) => {
                reporter.error(&format!(
                    "Could not move {} back to {}: {}",
                    stash.display(),
                    deps.display(),
                    e
                ));
                BuildError::CacheStranded {
                    stash: stash.to_path_buf(),
                    source: Box::new(cause),
                }
            }
        }
    }

    /// First unused stash path for this process
    fn free_stash_path(&self) -> PathBuf {
        let base = format!("{}{}", STASH_PREFIX, std::process::id());
        let mut candidate = self.stash_root.join(&base);
        let mut suffix = 1;
        while candidate.exists() {
            candidate = self.stash_root.join(format!("{}-{}", base, suffix));
            suffix += 1;
        }
        candidate
    }

    fn restore_deps(&self, stash: &Path, reporter: &dyn Reporter) -> Result<(), BuildError> {
        let deps = self.deps_dir();
        fs::create_dir_all(&deps).map_err(|e| BuildError::filesystem("create", &deps, e))?;

        let entries = fs::read_dir(stash)
            .and_then(|it| it.collect::<io::Result<Vec<_>>>())
            .map_err(|e| BuildError::filesystem("read", stash, e))?;

        let mut failed = 0;
        for entry in entries {
            let target = deps.join(entry.file_name());
            if let Err(e) = move_path(&entry.path(), &target) {
                reporter.error(&format!(
                    "Failed to restore {}: {}",
                    entry.path().display(),
                    e
                ));
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(BuildError::CacheRestore {
                stash: stash.to_path_buf(),
                failed,
            });
        }

        debug!("restored dependency cache from {}", stash.display());
        if let Err(e) = fs::remove_dir(stash) {
            reporter.warning(&format!(
                "Could not remove empty cache stash {}: {}",
                stash.display(),
                e
            ));
        }
        Ok(())
    }
}

/// Move a file or directory, copying across filesystems when rename fails
///
/// The source is removed only after the copy completed. A failed copy leaves
/// the source untouched and removes the partial destination.
pub fn move_path(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Ok(()) => return Ok(()),
        Err(e) => debug!(
            "rename {} -> {} failed ({}), copying instead",
            src.display(),
            dst.display(),
            e
        ),
    }

    let is_dir = fs::symlink_metadata(src)?.is_dir();
    if let Err(e) = copy_recursive(src, dst) {
        let _ = if is_dir {
            fs::remove_dir_all(dst)
        } else {
            fs::remove_file(dst)
        };
        return Err(e);
    }

    if is_dir {
        fs::remove_dir_all(src)
    } else {
        fs::remove_file(src)
    }
}

fn copy_recursive(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let target = dst.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(src)?, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    fs::copy(src, dst).map(|_| ())
}
