//! Directory-backed [`Cache`] implementation.
//!
//! Published entries live directly in the cache root under their names.
//! [`Cache::allocate`] hands out unique paths in a private staging directory
//! inside the root, and [`Cache::commit`] renames them into place, so an entry
//! only ever appears under its final name once it is complete.

use std::collections::HashMap;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use tiletex_core::{Cache, CacheError};
use tiletex_fs::{ensure_dir, file_is_file, remove_file_if_exists, rename_file};

const STAGING_DIR: &str = ".staging";

static ALLOCATIONS: AtomicU64 = AtomicU64::new(0);

/// Cache rooted at a directory on the local filesystem.
///
/// Several processes may share one root: allocations never collide and
/// concurrent commits of the same name resolve as last writer wins.
#[derive(Debug)]
pub struct DirectoryCache {
    root: Utf8PathBuf,
    staging: Utf8PathBuf,
    pending: HashMap<Utf8PathBuf, String>,
}

impl DirectoryCache {
    /// Open `root`, creating it and its staging directory when missing.
    pub fn open(root: impl Into<Utf8PathBuf>) -> Result<Self, CacheError> {
        let root = root.into();
        let staging = root.join(STAGING_DIR);
        ensure_dir(&staging).map_err(|source| CacheError::Io {
            path: staging.clone(),
            source,
        })?;
        Ok(Self {
            root,
            staging,
            pending: HashMap::new(),
        })
    }

    /// Directory entries are published in.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn entry_path(&self, name: &str) -> Result<Utf8PathBuf, CacheError> {
        let valid = !name.is_empty()
            && !name.starts_with('.')
            && !name.contains(['/', '\\'])
            && name != STAGING_DIR;
        if valid {
            Ok(self.root.join(name))
        } else {
            Err(CacheError::InvalidName {
                name: name.to_owned(),
            })
        }
    }
}

impl Cache for DirectoryCache {
    fn has(&self, name: &str) -> bool {
        self.entry_path(name)
            .is_ok_and(|path| file_is_file(&path).unwrap_or(false))
    }

    fn get(&self, name: &str) -> Result<Utf8PathBuf, CacheError> {
        let path = self.entry_path(name)?;
        match file_is_file(&path) {
            Ok(true) => Ok(path),
            Ok(false) => Err(CacheError::Missing {
                name: name.to_owned(),
            }),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    fn allocate(&mut self, name: &str) -> Result<Utf8PathBuf, CacheError> {
        self.entry_path(name)?;
        let serial = ALLOCATIONS.fetch_add(1, Ordering::Relaxed);
        let path = self
            .staging
            .join(format!("{name}.{}.{serial}", process::id()));
        remove_file_if_exists(&path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        self.pending.insert(path.clone(), name.to_owned());
        Ok(path)
    }

    fn commit(&mut self, path: &Utf8Path, overwrite: bool) -> Result<(), CacheError> {
        let name = self
            .pending
            .remove(path)
            .ok_or_else(|| CacheError::NotAllocated {
                path: path.to_owned(),
            })?;
        let target = self.entry_path(&name)?;
        if !overwrite && file_is_file(&target).unwrap_or(false) {
            self.pending.insert(path.to_owned(), name.clone());
            return Err(CacheError::AlreadyExists { name });
        }
        if let Err(source) = rename_file(path, &target) {
            if let Err(err) = remove_file_if_exists(path) {
                debug!("failed to remove staged file {path}: {err}");
            }
            return Err(CacheError::Io {
                path: target,
                source,
            });
        }
        debug!("published cache entry {target}");
        Ok(())
    }

    fn discard(&mut self, path: &Utf8Path) -> Result<(), CacheError> {
        self.pending
            .remove(path)
            .ok_or_else(|| CacheError::NotAllocated {
                path: path.to_owned(),
            })?;
        remove_file_if_exists(path).map_err(|source| CacheError::Io {
            path: path.to_owned(),
            source,
        })
    }
}
