// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scoped scratch directory owned by an [`Engine`](crate::Engine).
//!
//! The directory is removed when the engine is dropped.

use std::cell::Cell;
use std::fs;
use std::path::{Path, PathBuf};

use smm_table::{Format, GeoJsonFormat, Table};
use tempfile::TempDir;
use tracing::debug;

use crate::GraphError;

/// Temporary directory used to stage intermediate overlay tables.
#[derive(Debug)]
pub struct WorkDir {
    dir: TempDir,
    staged: Cell<usize>,
}

impl WorkDir {
    /// Create a fresh directory under `root`, or under the system temp dir.
    pub fn new(root: Option<&Path>) -> Result<Self, GraphError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("smm-");
        let dir = match root {
            Some(root) => {
                fs::create_dir_all(root).map_err(|e| GraphError::io(root, e))?;
                builder.tempdir_in(root).map_err(|e| GraphError::io(root, e))?
            }
            None => builder
                .tempdir()
                .map_err(|e| GraphError::io(std::env::temp_dir(), e))?,
        };
        debug!(path = %dir.path().display(), "created scratch directory");
        Ok(Self {
            dir,
            staged: Cell::new(0),
        })
    }

    /// Location of the scratch directory.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Number of tables staged so far.
    pub fn staged(&self) -> usize {
        self.staged.get()
    }

    /// Write `table` as `<seq>-<label>.geojson` and return its path.
    pub fn stage(&self, label: &str, table: &Table) -> Result<PathBuf, GraphError> {
        let seq = self.staged.get();
        let path = self.dir.path().join(format!("{seq:04}-{label}.geojson"));
        GeoJsonFormat.write(&path, table)?;
        self.staged.set(seq + 1);
        debug!(path = %path.display(), rows = table.len(), "staged intermediate table");
        Ok(path)
    }
}

/// Handle passed to kernel calls: stages tables only when staging is enabled.
#[derive(Debug, Clone, Copy)]
pub struct Scratch<'a> {
    dir: &'a WorkDir,
    enabled: bool,
}

impl<'a> Scratch<'a> {
    /// Wrap `dir`; `enabled` gates [`stage`](Self::stage).
    pub fn new(dir: &'a WorkDir, enabled: bool) -> Self {
        Self { dir, enabled }
    }

    /// Scratch directory, for kernels that need their own files.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Stage `table` if enabled; returns the written path.
    pub fn stage(&self, label: &str, table: &Table) -> Result<Option<PathBuf>, GraphError> {
        if !self.enabled {
            return Ok(None);
        }
        self.dir.stage(label, table).map(Some)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn staging_is_gated_and_numbered() {
        let root = tempfile::tempdir().unwrap();
        let dir = WorkDir::new(Some(root.path())).unwrap();
        assert!(dir.path().starts_with(root.path()));

        assert!(Scratch::new(&dir, false)
            .stage("skip", &Table::empty())
            .unwrap()
            .is_none());
        let on = Scratch::new(&dir, true);
        let first = on.stage("a", &Table::empty()).unwrap().unwrap();
        let second = on.stage("b", &Table::empty()).unwrap().unwrap();
        assert!(first.ends_with("0000-a.geojson"));
        assert!(second.ends_with("0001-b.geojson"));
        assert_eq!(dir.staged(), 2);
    }

    #[test]
    fn directory_is_removed_on_drop() {
        let dir = WorkDir::new(None).unwrap();
        let path = dir.path().to_path_buf();
        assert!(path.is_dir());
        drop(dir);
        assert!(!path.exists());
    }
}
