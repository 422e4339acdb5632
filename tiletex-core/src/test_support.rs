//! Test doubles shared by unit and behaviour tests across the workspace.

use std::cell::Cell;
use std::{fs, io};

use camino::{Utf8Path, Utf8PathBuf};

use crate::{Cache, CacheError, EntityDef, EntityDefError, Rgba, ValueMatch};

/// `Cache` whose entries never become visible: every commit fails.
///
/// Allocation hands out paths under `root` so callers can still write to
/// them.
#[derive(Debug)]
pub struct CommitFailingCache {
    root: Utf8PathBuf,
    commits: Cell<usize>,
    discards: Cell<usize>,
}

impl CommitFailingCache {
    /// Allocate beneath `root`, which must exist.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            commits: Cell::new(0),
            discards: Cell::new(0),
        }
    }

    /// Commits attempted so far.
    pub fn commit_attempts(&self) -> usize {
        self.commits.get()
    }

    /// Allocations abandoned so far.
    pub fn discards(&self) -> usize {
        self.discards.get()
    }
}

impl Cache for CommitFailingCache {
    fn has(&self, _name: &str) -> bool {
        false
    }

    fn get(&self, name: &str) -> Result<Utf8PathBuf, CacheError> {
        Err(CacheError::Missing {
            name: name.to_owned(),
        })
    }

    fn allocate(&mut self, name: &str) -> Result<Utf8PathBuf, CacheError> {
        Ok(self.root.join(format!("{name}.staged")))
    }

    fn commit(&mut self, path: &Utf8Path, _overwrite: bool) -> Result<(), CacheError> {
        self.commits.set(self.commits.get() + 1);
        Err(CacheError::Io {
            path: path.to_owned(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only cache"),
        })
    }

    fn discard(&mut self, path: &Utf8Path) -> Result<(), CacheError> {
        self.discards.set(self.discards.get() + 1);
        match fs::remove_file(path) {
            Err(source) if source.kind() != io::ErrorKind::NotFound => Err(CacheError::Io {
                path: path.to_owned(),
                source,
            }),
            _ => Ok(()),
        }
    }
}

/// Single red primary-road definition used by the end-to-end scenarios.
pub fn primary_road_def() -> Result<EntityDef, EntityDefError> {
    EntityDef::polyline(
        "highway",
        ValueMatch::Exact("primary".into()),
        Rgba::opaque(255, 0, 0),
        1.0,
    )
}

/// Forest area followed by a wide primary road, for z-order checks.
pub fn forest_then_road_defs() -> Result<Vec<EntityDef>, EntityDefError> {
    Ok(vec![
        EntityDef::polygon(
            "landuse",
            ValueMatch::Exact("forest".into()),
            Rgba::opaque(0, 128, 0),
            1.0,
        )?,
        EntityDef::polyline(
            "highway",
            ValueMatch::Exact("primary".into()),
            Rgba::opaque(255, 0, 0),
            6.0,
        )?,
    ])
}
