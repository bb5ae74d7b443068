// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Layers: named, lazily evaluated nodes of a layer graph.
//!
//! A layer is either a *base* layer, whose content comes from a file or an
//! in-memory table, or a *derived* layer, whose content is computed by an
//! [`Operator`] applied to its origin. Layers are shared through [`LayerRef`]
//! handles; references are fixed at construction, so a layer can only point
//! at layers that already exist.
//!
//! # Caching
//!
//! Content is computed or loaded on first access and then served from the
//! layer's own cache: repeated [`Layer::content`] calls return the same
//! `Arc<Table>`. File-backed layers keep their cache inside the loader handle;
//! everything else keeps it in memory.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::mem;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smm_table::{LoaderHandle, Table};
use tracing::debug;

use crate::{Engine, GraphError, Operator};

/// Shared handle to a layer.
pub type LayerRef = Rc<Layer>;

/// Domain tag of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Linear infrastructure (roads, rails, grids).
    Network,
    /// Areas and points of interest.
    Places,
}

/// Origin and operator of a derived layer.
pub struct Derivation {
    origin: LayerRef,
    operator: Operator,
    evaluations: Cell<u64>,
}

impl Derivation {
    /// Layer the operator is applied to.
    pub fn origin(&self) -> &LayerRef {
        &self.origin
    }

    /// The operator.
    pub fn operator(&self) -> &Operator {
        &self.operator
    }
}

impl fmt::Debug for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derivation")
            .field("origin", &self.origin.name())
            .field("operator", &self.operator)
            .field("evaluations", &self.evaluations.get())
            .finish()
    }
}

/// Base or derived.
#[derive(Debug)]
pub enum LayerKind {
    /// Content comes from a file or an in-memory table.
    Base,
    /// Content is computed from other layers.
    Derived(Derivation),
}

#[derive(Debug)]
enum Storage {
    Memory(Option<Arc<Table>>),
    File(LoaderHandle),
}

#[derive(Debug)]
struct LayerState {
    path: Option<PathBuf>,
    base_path: Option<PathBuf>,
    path_is_relative: bool,
    storage: Storage,
}

impl LayerState {
    fn resolved_path(&self) -> Option<PathBuf> {
        let path = self.path.as_ref()?;
        Some(match &self.base_path {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.clone(),
        })
    }

    fn cached(&self) -> Option<Arc<Table>> {
        match &self.storage {
            Storage::Memory(content) => content.clone(),
            Storage::File(handle) => handle.cached().cloned(),
        }
    }

    fn store(&mut self, table: Arc<Table>) {
        match &mut self.storage {
            Storage::Memory(content) => *content = Some(table),
            Storage::File(handle) => {
                handle.set(table);
            }
        }
    }

    /// Drop any open handle, keeping its content in memory.
    fn close(&mut self) {
        if let Storage::File(handle) = &mut self.storage {
            self.storage = Storage::Memory(handle.take());
        }
    }
}

/// A named node of a layer graph.
#[derive(Debug)]
pub struct Layer {
    name: String,
    category: Option<Category>,
    kind: LayerKind,
    state: RefCell<LayerState>,
}

impl Layer {
    fn with_kind(name: impl Into<String>, category: Option<Category>, kind: LayerKind) -> Self {
        Self {
            name: name.into(),
            category,
            kind,
            state: RefCell::new(LayerState {
                path: None,
                base_path: None,
                path_is_relative: false,
                storage: Storage::Memory(None),
            }),
        }
    }

    /// Base layer with no content yet; attach a file with [`with_path`](Self::with_path).
    pub fn base(name: impl Into<String>) -> Self {
        Self::with_kind(name, None, LayerKind::Base)
    }

    /// Base layer backed by `path`.
    pub fn from_file(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::base(name).with_path(path)
    }

    /// Base layer holding `table` in memory.
    pub fn from_table(name: impl Into<String>, table: Table) -> Self {
        let layer = Self::base(name);
        layer.state.borrow_mut().storage = Storage::Memory(Some(Arc::new(table)));
        layer
    }

    /// Derived layer applying `operator` to `origin`; inherits the origin's category.
    pub fn derived(name: impl Into<String>, origin: &LayerRef, operator: Operator) -> Self {
        Self::with_kind(
            name,
            origin.category,
            LayerKind::Derived(Derivation {
                origin: Rc::clone(origin),
                operator,
                evaluations: Cell::new(0),
            }),
        )
    }

    /// Set the category.
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Declare the file backing this layer. Nothing is opened until first access.
    pub fn with_path(self, path: impl Into<PathBuf>) -> Self {
        self.state.borrow_mut().path = Some(path.into());
        self
    }

    /// Resolve relative paths against `base`.
    pub fn with_base_path(self, base: impl Into<PathBuf>) -> Self {
        self.set_base_path(Some(base.into()));
        self
    }

    /// Wrap into a shared handle.
    pub fn into_ref(self) -> LayerRef {
        Rc::new(self)
    }

    /// Layer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Domain tag.
    pub fn category(&self) -> Option<Category> {
        self.category
    }

    /// Base or derived, with the derivation.
    pub fn kind(&self) -> &LayerKind {
        &self.kind
    }

    /// Returns `true` for base layers.
    pub fn is_base(&self) -> bool {
        matches!(self.kind, LayerKind::Base)
    }

    /// Origin of a derived layer.
    pub fn origin(&self) -> Option<&LayerRef> {
        match &self.kind {
            LayerKind::Derived(d) => Some(&d.origin),
            LayerKind::Base => None,
        }
    }

    /// Operator of a derived layer.
    pub fn operator(&self) -> Option<&Operator> {
        match &self.kind {
            LayerKind::Derived(d) => Some(&d.operator),
            LayerKind::Base => None,
        }
    }

    /// Every layer this one reads from: origin first, then mask or join layer.
    pub fn dependencies(&self) -> Vec<&LayerRef> {
        match &self.kind {
            LayerKind::Base => Vec::new(),
            LayerKind::Derived(d) => std::iter::once(&d.origin)
                .chain(d.operator.dependency())
                .collect(),
        }
    }

    /// How many times the operator has run. Always 0 for base layers.
    pub fn evaluations(&self) -> u64 {
        match &self.kind {
            LayerKind::Derived(d) => d.evaluations.get(),
            LayerKind::Base => 0,
        }
    }

    /// Returns `true` when a file path is declared.
    pub fn is_persistent(&self) -> bool {
        self.state.borrow().path.is_some()
    }

    /// Declared path, as given.
    pub fn path(&self) -> Option<PathBuf> {
        self.state.borrow().path.clone()
    }

    /// Declared path resolved against the base path.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        self.state.borrow().resolved_path()
    }

    /// Directory relative paths are resolved against.
    pub fn base_path(&self) -> Option<PathBuf> {
        self.state.borrow().base_path.clone()
    }

    /// Whether the document records the path relative to the base path.
    pub fn path_is_relative(&self) -> bool {
        self.state.borrow().path_is_relative
    }

    /// Returns `true` when content is held in memory or in an open handle.
    pub fn has_content(&self) -> bool {
        self.state.borrow().cached().is_some()
    }

    /// Set or clear the base path. Setting it marks the path as relative;
    /// clearing it clears that flag. An open handle whose resolved path
    /// changes is closed and reopened on next access, keeping its content.
    pub fn set_base_path(&self, base: Option<PathBuf>) {
        let mut state = self.state.borrow_mut();
        state.path_is_relative = base.is_some();
        state.base_path = base;
        let resolved = state.resolved_path();
        let stale = match &state.storage {
            Storage::File(handle) => resolved.as_deref() != Some(handle.path()),
            Storage::Memory(_) => false,
        };
        if stale {
            state.close();
        }
    }

    /// Path as written to a graph document: relative to the base path when
    /// flagged relative and possible, absolute otherwise.
    pub fn document_path(&self) -> Result<Option<PathBuf>, GraphError> {
        let state = self.state.borrow();
        let Some(resolved) = state.resolved_path() else {
            return Ok(None);
        };
        if state.path_is_relative {
            if let Some(relative) = state
                .base_path
                .as_deref()
                .and_then(|base| resolved.strip_prefix(base).ok())
            {
                return Ok(Some(relative.to_path_buf()));
            }
        }
        std::path::absolute(&resolved)
            .map(Some)
            .map_err(|e| GraphError::io(resolved, e))
    }

    /// Open the loader handle if a path is declared and none is open yet.
    /// Content already in memory moves into the handle.
    fn open(&self, engine: &Engine) -> Result<(), GraphError> {
        let mut state = self.state.borrow_mut();
        if matches!(state.storage, Storage::File(_)) {
            return Ok(());
        }
        let Some(path) = state.resolved_path() else {
            return Ok(());
        };
        let mut handle = engine.formats().open(path)?;
        if let Storage::Memory(Some(table)) = mem::replace(&mut state.storage, Storage::Memory(None)) {
            handle.set(table);
        }
        state.storage = Storage::File(handle);
        Ok(())
    }

    /// The layer's content, loading or computing it on first access.
    ///
    /// Base layers read their file (a missing file is an empty table).
    /// Derived layers read their file when it exists, and otherwise run their
    /// operator once and cache the result.
    pub fn content(&self, engine: &Engine) -> Result<Arc<Table>, GraphError> {
        self.get_or_compute(engine)
    }

    /// Serve the cache, filling it first when empty.
    ///
    /// An existing file wins over the operator for persistent derived layers;
    /// call [`apply_operator`](Self::apply_operator) to refresh it.
    pub fn get_or_compute(&self, engine: &Engine) -> Result<Arc<Table>, GraphError> {
        self.open(engine)?;
        if let Some(table) = self.state.borrow().cached() {
            return Ok(table);
        }
        match &self.kind {
            LayerKind::Derived(_) => {
                if let Storage::File(handle) = &mut self.state.borrow_mut().storage {
                    if handle.path().is_file() {
                        debug!(layer = %self.name, path = %handle.path().display(), "reading derived layer from file");
                        return Ok(handle.content()?);
                    }
                }
                self.apply_operator(engine)
            }
            LayerKind::Base => {
                let mut state = self.state.borrow_mut();
                match &mut state.storage {
                    Storage::File(handle) => Ok(handle.content()?),
                    Storage::Memory(content) => {
                        let table = Arc::new(Table::empty());
                        *content = Some(Arc::clone(&table));
                        Ok(table)
                    }
                }
            }
        }
    }

    /// Run the operator on the origin's content and cache the result.
    ///
    /// Always recomputes; use [`content`](Self::content) for cached access.
    pub fn apply_operator(&self, engine: &Engine) -> Result<Arc<Table>, GraphError> {
        let LayerKind::Derived(derivation) = &self.kind else {
            return Err(GraphError::usage(format!(
                "layer '{}' is a base layer and has no operator",
                self.name
            )));
        };
        let origin = derivation.origin.content(engine)?;
        debug!(layer = %self.name, operator = derivation.operator.kind(), "evaluating layer");
        let table = Arc::new(derivation.operator.apply(&origin, engine)?);
        derivation.evaluations.set(derivation.evaluations.get() + 1);
        self.state.borrow_mut().store(Arc::clone(&table));
        Ok(table)
    }

    /// Replace the cached content. Nothing is written until [`save`](Self::save).
    pub fn set_content(&self, table: impl Into<Arc<Table>>) {
        self.state.borrow_mut().store(table.into());
    }

    /// Write the content to the layer's file.
    ///
    /// Base layers whose content was never loaded are skipped, since the file
    /// is already authoritative. Derived layers are loaded or evaluated first
    /// as in [`content`](Self::content).
    pub fn save(&self, engine: &Engine) -> Result<(), GraphError> {
        if !self.is_persistent() {
            return Err(GraphError::usage(format!(
                "no path defined for saving layer '{}'",
                self.name
            )));
        }
        self.open(engine)?;
        match &self.kind {
            LayerKind::Base if !self.has_content() => {
                debug!(layer = %self.name, "content not loaded, skipping save");
                return Ok(());
            }
            LayerKind::Base => {}
            LayerKind::Derived(_) => {
                self.content(engine)?;
            }
        }
        let mut state = self.state.borrow_mut();
        if let Storage::File(handle) = &mut state.storage {
            handle.save()?;
        }
        Ok(())
    }

    /// Attach `path` as the layer's file. Content already held moves into the
    /// new handle; nothing is written until [`save`](Self::save).
    pub fn make_persistent(&self, path: impl Into<PathBuf>, engine: &Engine) -> Result<(), GraphError> {
        {
            let mut state = self.state.borrow_mut();
            state.close();
            state.path = Some(path.into());
        }
        self.open(engine)
    }

    /// Detach the file. The layer keeps its last content in memory and forgets
    /// the declared path, so it is no longer saved or reloaded. Content never
    /// loaded from the file is not read.
    pub fn unpersist(&self) {
        let mut state = self.state.borrow_mut();
        state.close();
        state.path = None;
        state.path_is_relative = false;
    }

    /// Write the content to `path` without changing the layer's own storage.
    pub fn export(&self, path: impl AsRef<Path>, engine: &Engine) -> Result<(), GraphError> {
        let table = self.content(engine)?;
        let mut handle = engine.formats().open(path.as_ref())?;
        handle.set(table).save()?;
        Ok(())
    }
}
