// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph manager: registry of named layers plus document load/save.
//!
//! Loading is two-phase. Phase one indexes every record and validates names
//! and operator parameters; phase two builds layers in post-order so every
//! reference is already a live handle when its dependant is constructed.
//! Cycles are detected during phase two (DFS colouring).

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use smm_table::Table;
use tracing::{info, warn};

use crate::document::{GraphDocument, LayerRecord, OperatorRecord};
use crate::grid::GridSpec;
use crate::layer::{Layer, LayerRef};
use crate::{Engine, GraphError, Operator};

/// Named layers with document metadata.
#[derive(Debug)]
pub struct LayerGraph {
    root: PathBuf,
    path: Option<PathBuf>,
    author: String,
    references: String,
    version: u64,
    last_update: Option<DateTime<Utc>>,
    layers: BTreeMap<String, LayerRef>,
}

impl Default for LayerGraph {
    fn default() -> Self {
        Self::with_root(std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

impl LayerGraph {
    /// Empty graph rooted at the current directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty graph whose relative layer paths resolve against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            path: None,
            author: String::new(),
            references: String::new(),
            version: 0,
            last_update: None,
            layers: BTreeMap::new(),
        }
    }

    /// Load the document at `path` into a new graph. See [`load`](Self::load).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let mut graph = Self::new();
        graph.load(path)?;
        Ok(graph)
    }

    /// Replace this graph with the document at `path`.
    ///
    /// The graph root becomes the document's directory. A missing document is
    /// not an error: the graph starts empty and is created on first save.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), GraphError> {
        let path = std::path::absolute(path.as_ref()).map_err(|e| GraphError::io(path.as_ref(), e))?;
        let root = path.parent().map_or_else(|| PathBuf::from("/"), Path::to_path_buf);

        if !path.is_file() {
            warn!(path = %path.display(), "graph document does not exist yet, creating new one");
            *self = Self::with_root(root);
            self.path = Some(path);
            return Ok(());
        }

        let doc = GraphDocument::read(&path)?;
        let layers = build_layers(&doc, &root)?;
        info!(path = %path.display(), layers = layers.len(), version = doc.version, "loaded layer graph");
        *self = Self {
            root,
            path: Some(path),
            author: doc.author,
            references: doc.references,
            version: doc.version,
            last_update: doc.last_update,
            layers,
        };
        Ok(())
    }

    /// Register `layer` under its own name, with paths relative to the graph
    /// root. Use [`add_as`](Self::add_as) to record absolute paths instead.
    pub fn add(&mut self, layer: &LayerRef) -> Result<(), GraphError> {
        self.add_as(layer, None, true)
    }

    /// Register `layer` under `name` (default: its own name), along with every
    /// layer it references that is not registered yet.
    ///
    /// With `use_relative_path` the layer's paths resolve against, and are
    /// recorded relative to, the graph root. Re-adding the same handle is a
    /// no-op; a different layer under a taken name is
    /// [`GraphError::DuplicateLayer`].
    pub fn add_as(
        &mut self,
        layer: &LayerRef,
        name: Option<&str>,
        use_relative_path: bool,
    ) -> Result<(), GraphError> {
        let key = name.unwrap_or_else(|| layer.name()).to_string();
        match self.layers.get(&key) {
            Some(existing) if Rc::ptr_eq(existing, layer) => return Ok(()),
            Some(_) => return Err(GraphError::DuplicateLayer(key)),
            None => {}
        }
        for dependency in layer.dependencies() {
            if self.key_of(dependency).is_none() {
                self.add_as(dependency, None, use_relative_path)?;
            }
        }
        if use_relative_path {
            layer.set_base_path(Some(self.root.clone()));
        }
        self.layers.insert(key, Rc::clone(layer));
        Ok(())
    }

    /// The layer registered under `name`.
    pub fn get(&self, name: &str) -> Result<&LayerRef, GraphError> {
        self.layers
            .get(name)
            .ok_or_else(|| GraphError::LayerNotFound(name.to_string()))
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    /// Content of the layer registered under `name`.
    pub fn content(&self, name: &str, engine: &Engine) -> Result<Arc<Table>, GraphError> {
        self.get(name)?.content(engine)
    }

    /// Save to the path the graph was loaded from or last saved to.
    pub fn save(&mut self, engine: &Engine) -> Result<(), GraphError> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| GraphError::usage("no path defined for saving the graph"))?;
        self.write(&path, engine)
    }

    /// Save to `path` and remember it for later [`save`](Self::save) calls.
    ///
    /// The graph root is unchanged: relative layer paths keep resolving
    /// against the directory the graph was created or loaded in.
    pub fn save_as(&mut self, path: impl AsRef<Path>, engine: &Engine) -> Result<(), GraphError> {
        let path = std::path::absolute(path.as_ref()).map_err(|e| GraphError::io(path.as_ref(), e))?;
        self.write(&path, engine)?;
        self.path = Some(path);
        Ok(())
    }

    fn write(&mut self, path: &Path, engine: &Engine) -> Result<(), GraphError> {
        for layer in self.layers.values().filter(|l| l.is_persistent()) {
            layer.save(engine)?;
        }
        let now = Utc::now();
        let stamp = self.last_update.map_or(now, |previous| previous.max(now));
        let version = self.version + 1;

        let mut doc = self.to_document()?;
        doc.version = version;
        doc.last_update = Some(stamp);
        doc.write(path)?;

        self.version = version;
        self.last_update = Some(stamp);
        info!(path = %path.display(), layers = self.layers.len(), version, "saved layer graph");
        Ok(())
    }

    /// Snapshot of the graph as a document (current version and timestamp).
    pub fn to_document(&self) -> Result<GraphDocument, GraphError> {
        let mut layers = BTreeMap::new();
        for (key, layer) in &self.layers {
            layers.insert(key.clone(), self.record_for(key, layer)?);
        }
        Ok(GraphDocument {
            author: self.author.clone(),
            last_update: self.last_update,
            references: self.references.clone(),
            version: self.version,
            layers,
        })
    }

    fn record_for(&self, key: &str, layer: &LayerRef) -> Result<LayerRecord, GraphError> {
        let reference = |target: &LayerRef| {
            self.key_of(target)
                .map(str::to_string)
                .ok_or_else(|| GraphError::ReferenceNotFound {
                    layer: key.to_string(),
                    reference: target.name().to_string(),
                })
        };
        let name = layer.name().to_string();
        let category = layer.category();
        let path_is_relative = layer.path_is_relative();
        let path = layer.document_path()?;
        let (Some(origin), Some(operator)) = (layer.origin(), layer.operator()) else {
            return Ok(LayerRecord::BaseDataLayer {
                name,
                category,
                path_is_relative,
                path,
            });
        };
        let operator = match operator {
            Operator::Discretize { mask, hull_clip } => OperatorRecord::Discretize {
                mask: reference(mask)?,
                hull_clip: *hull_clip,
            },
            Operator::Tesselate(grid) => OperatorRecord::Tesselate {
                mask: grid.system().name().to_string(),
                resolution: u32::from(grid.resolution()),
            },
            Operator::Join { join } => OperatorRecord::Join {
                join: reference(join)?,
            },
        };
        Ok(LayerRecord::DataLayer {
            name,
            category,
            path_is_relative,
            path,
            origin: reference(origin)?,
            operator,
        })
    }

    /// Graph key under which `layer` is registered (first in name order).
    fn key_of(&self, layer: &LayerRef) -> Option<&str> {
        self.layers
            .iter()
            .find(|(_, l)| Rc::ptr_eq(l, layer))
            .map(|(k, _)| k.as_str())
    }

    /// Directory relative layer paths resolve against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Document path, once loaded or saved.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Author metadata.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Set the author metadata.
    pub fn set_author(&mut self, author: impl Into<String>) {
        self.author = author.into();
    }

    /// References metadata.
    pub fn references(&self) -> &str {
        &self.references
    }

    /// Set the references metadata.
    pub fn set_references(&mut self, references: impl Into<String>) {
        self.references = references.into();
    }

    /// Number of successful saves recorded in the document.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Time of the last successful save.
    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Registered names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    /// `(name, layer)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &LayerRef)> {
        self.layers.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of registered layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Returns `true` if no layer is registered.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

struct Resolver<'a> {
    doc: &'a GraphDocument,
    root: &'a Path,
    marks: HashMap<&'a str, Mark>,
    stack: Vec<&'a str>,
    built: BTreeMap<String, LayerRef>,
}

fn build_layers(doc: &GraphDocument, root: &Path) -> Result<BTreeMap<String, LayerRef>, GraphError> {
    // phase 1: names and parameters
    for (key, record) in &doc.layers {
        for reference in record.references() {
            if !doc.layers.contains_key(reference) {
                return Err(GraphError::ReferenceNotFound {
                    layer: key.clone(),
                    reference: reference.to_string(),
                });
            }
        }
        if let LayerRecord::DataLayer {
            operator: OperatorRecord::Tesselate { mask, resolution },
            ..
        } = record
        {
            GridSpec::parse(mask, *resolution)?;
        }
    }

    // phase 2: post-order construction
    let mut resolver = Resolver {
        doc,
        root,
        marks: HashMap::new(),
        stack: Vec::new(),
        built: BTreeMap::new(),
    };
    for key in doc.layers.keys() {
        resolver.visit(key)?;
    }
    Ok(resolver.built)
}

impl<'a> Resolver<'a> {
    fn visit(&mut self, key: &'a str) -> Result<LayerRef, GraphError> {
        match self.marks.get(key) {
            Some(Mark::Done) => {
                if let Some(layer) = self.built.get(key) {
                    return Ok(Rc::clone(layer));
                }
            }
            Some(Mark::Visiting) => {
                self.stack.push(key);
                return Err(GraphError::Cycle(self.stack.join(" -> ")));
            }
            None => {}
        }
        let doc = self.doc;
        let record = doc
            .layers
            .get(key)
            .ok_or_else(|| GraphError::LayerNotFound(key.to_string()))?;
        self.marks.insert(key, Mark::Visiting);
        self.stack.push(key);

        let (layer, category, path_is_relative, path) = match record {
            LayerRecord::BaseDataLayer {
                name,
                category,
                path_is_relative,
                path,
            } => (Layer::base(name.as_str()), category, path_is_relative, path),
            LayerRecord::DataLayer {
                name,
                category,
                path_is_relative,
                path,
                origin,
                operator,
            } => {
                let origin = self.visit(origin)?;
                let operator = match operator {
                    OperatorRecord::Discretize { mask, hull_clip } => Operator::Discretize {
                        mask: self.visit(mask)?,
                        hull_clip: *hull_clip,
                    },
                    OperatorRecord::Tesselate { mask, resolution } => Operator::tesselate(mask, *resolution)?,
                    OperatorRecord::Join { join } => Operator::Join {
                        join: self.visit(join)?,
                    },
                };
                (Layer::derived(name.as_str(), &origin, operator), category, path_is_relative, path)
            }
        };

        let mut layer = match category {
            Some(category) => layer.with_category(*category),
            None => layer,
        };
        if let Some(path) = path {
            layer = layer.with_path(path);
        }
        if *path_is_relative {
            layer = layer.with_base_path(self.root);
        }
        let layer = layer.into_ref();

        self.stack.pop();
        self.marks.insert(key, Mark::Done);
        self.built.insert(key.to_string(), Rc::clone(&layer));
        Ok(layer)
    }
}
