//! Key-addressed file store the fetcher reads through and writes behind.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use thiserror::Error;

/// Errors raised by [`Cache`] implementations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// No entry exists under the name.
    #[error("cache entry {name:?} does not exist")]
    Missing {
        /// Entry name.
        name: String,
    },
    /// The name cannot be used as a file name inside the cache.
    #[error("{name:?} is not a valid cache entry name")]
    InvalidName {
        /// Entry name.
        name: String,
    },
    /// Committing without overwrite found an existing entry.
    #[error("cache entry {name:?} already exists")]
    AlreadyExists {
        /// Entry name.
        name: String,
    },
    /// The path was not handed out by [`Cache::allocate`].
    #[error("path {path} was not allocated by this cache")]
    NotAllocated {
        /// Path as supplied.
        path: Utf8PathBuf,
    },
    /// Filesystem access failed.
    #[error("cache I/O failed at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
}

/// A store that names files by key and publishes them atomically.
///
/// Entries become visible under their name only through [`Cache::commit`],
/// so readers never observe a partially written file.
pub trait Cache {
    /// Whether an entry is published under `name`.
    fn has(&self, name: &str) -> bool;

    /// Path of the published entry.
    ///
    /// # Errors
    /// Returns [`CacheError::Missing`] if nothing is published under `name`.
    fn get(&self, name: &str) -> Result<Utf8PathBuf, CacheError>;

    /// A fresh writable path that will be published as `name` on commit.
    fn allocate(&mut self, name: &str) -> Result<Utf8PathBuf, CacheError>;

    /// Publish a previously allocated path under its name.
    ///
    /// # Errors
    /// Fails with [`CacheError::AlreadyExists`] when `overwrite` is false and
    /// an entry is already published.
    fn commit(&mut self, path: &Utf8Path, overwrite: bool) -> Result<(), CacheError>;

    /// Abandon an allocated path that will never be committed, removing any
    /// file written to it.
    ///
    /// # Errors
    /// Returns [`CacheError::NotAllocated`] for paths this cache did not hand
    /// out.
    fn discard(&mut self, path: &Utf8Path) -> Result<(), CacheError>;
}

impl<C: Cache + ?Sized> Cache for &mut C {
    fn has(&self, name: &str) -> bool {
        (**self).has(name)
    }

    fn get(&self, name: &str) -> Result<Utf8PathBuf, CacheError> {
        (**self).get(name)
    }

    fn allocate(&mut self, name: &str) -> Result<Utf8PathBuf, CacheError> {
        (**self).allocate(name)
    }

    fn commit(&mut self, path: &Utf8Path, overwrite: bool) -> Result<(), CacheError> {
        (**self).commit(path, overwrite)
    }

    fn discard(&mut self, path: &Utf8Path) -> Result<(), CacheError> {
        (**self).discard(path)
    }
}
