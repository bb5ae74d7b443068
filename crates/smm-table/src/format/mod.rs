// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! File-format boundary: extension registry and lazy loader handles.

mod geo_json;

pub use geo_json::GeoJsonFormat;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::Table;

/// Errors raised at the file-format boundary.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The path has no extension to dispatch on.
    #[error("path has no file extension: {0}")]
    MissingExtension(PathBuf),
    /// No format is registered for the extension.
    #[error("unsupported file format '{extension}' for {path}")]
    UnsupportedFormat {
        /// Extension including the leading dot.
        extension: String,
        /// Offending path.
        path: PathBuf,
    },
    /// A format was registered twice for the same extension.
    #[error("duplicate format registration for extension: {0}")]
    DuplicateExtension(String),
    /// Filesystem failure while reading or writing.
    #[error("io error at {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The file content could not be decoded.
    #[error("cannot decode {path}: {message}")]
    Decode {
        /// File being decoded.
        path: PathBuf,
        /// Decoder message.
        message: String,
    },
}

/// A single file format: reads and writes whole tables.
pub trait Format: Send + Sync + fmt::Debug {
    /// Extension handled by this format, including the leading dot (`.geojson`).
    fn extension(&self) -> &'static str;

    /// Read the table stored at `path`.
    fn read(&self, path: &Path) -> Result<Table, FormatError>;

    /// Write `table` to `path`, replacing any existing file.
    fn write(&self, path: &Path, table: &Table) -> Result<(), FormatError>;
}

/// Extension-keyed registry of formats.
///
/// [`FormatRegistry::default`] registers every built-in format; use
/// [`FormatRegistry::new`] for an empty registry.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    formats: BTreeMap<String, Arc<dyn Format>>,
}

impl FormatRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            formats: BTreeMap::new(),
        }
    }

    /// Registers `format` under its extension.
    ///
    /// # Errors
    /// Returns [`FormatError::DuplicateExtension`] if the extension is taken.
    pub fn register(&mut self, format: impl Format + 'static) -> Result<(), FormatError> {
        let ext = format.extension().to_ascii_lowercase();
        if self.formats.contains_key(&ext) {
            return Err(FormatError::DuplicateExtension(ext));
        }
        self.formats.insert(ext, Arc::new(format));
        Ok(())
    }

    /// Returns the format registered for `extension` (with leading dot).
    pub fn get(&self, extension: &str) -> Option<&Arc<dyn Format>> {
        self.formats.get(&extension.to_ascii_lowercase())
    }

    /// Registered extensions in sorted order.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }

    /// Resolve the format for `path` by its extension.
    pub fn format_for(&self, path: &Path) -> Result<Arc<dyn Format>, FormatError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| FormatError::MissingExtension(path.to_path_buf()))?;
        let ext = format!(".{ext}");
        self.get(&ext)
            .cloned()
            .ok_or_else(|| FormatError::UnsupportedFormat {
                extension: ext,
                path: path.to_path_buf(),
            })
    }

    /// Open a lazy loader handle on `path`. No I/O happens here.
    pub fn open(&self, path: impl Into<PathBuf>) -> Result<LoaderHandle, FormatError> {
        let path = path.into();
        let format = self.format_for(&path)?;
        Ok(LoaderHandle {
            path,
            format,
            content: None,
        })
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        let mut formats: BTreeMap<String, Arc<dyn Format>> = BTreeMap::new();
        formats.insert(
            GeoJsonFormat.extension().to_string(),
            Arc::new(GeoJsonFormat),
        );
        Self { formats }
    }
}

/// A file-backed table slot: loads on first access, writes on `save`.
#[derive(Debug, Clone)]
pub struct LoaderHandle {
    path: PathBuf,
    format: Arc<dyn Format>,
    content: Option<Arc<Table>>,
}

impl LoaderHandle {
    /// File this handle reads from and writes to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` once content has been loaded or set.
    pub fn has_content(&self) -> bool {
        self.content.is_some()
    }

    /// Content held in memory, without touching the file.
    pub fn cached(&self) -> Option<&Arc<Table>> {
        self.content.as_ref()
    }

    /// Load (once) and return the content. A missing file yields an empty table.
    pub fn content(&mut self) -> Result<Arc<Table>, FormatError> {
        if let Some(table) = &self.content {
            return Ok(Arc::clone(table));
        }
        let table = if self.path.is_file() {
            debug!(path = %self.path.display(), "loading table");
            self.format.read(&self.path)?
        } else {
            debug!(path = %self.path.display(), "file missing, using empty table");
            Table::empty()
        };
        let table = Arc::new(table);
        self.content = Some(Arc::clone(&table));
        Ok(table)
    }

    /// Replace the in-memory content; nothing is written until [`save`](Self::save).
    pub fn set(&mut self, table: Arc<Table>) -> &mut Self {
        self.content = Some(table);
        self
    }

    /// Take the in-memory content out of the handle.
    pub fn take(&mut self) -> Option<Arc<Table>> {
        self.content.take()
    }

    /// Write the current content (loading it first if needed) to the file.
    pub fn save(&mut self) -> Result<(), FormatError> {
        let table = self.content()?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| FormatError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        debug!(path = %self.path.display(), rows = table.len(), "writing table");
        self.format.write(&self.path, &table)
    }
}
