// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Serialized form of a layer graph (YAML, `.ymlsmm` by convention).
//!
//! Layers refer to each other by graph key; [`LayerGraph`](crate::LayerGraph)
//! turns those names into live handles when loading and back when saving.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::layer::Category;
use crate::GraphError;

/// Conventional extension for graph documents.
pub const DOCUMENT_EXTENSION: &str = "ymlsmm";

/// Top-level graph document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Free-form author string.
    #[serde(default)]
    pub author: String,
    /// Time of the last save.
    #[serde(default)]
    pub last_update: Option<DateTime<Utc>>,
    /// Free-form references / provenance notes.
    #[serde(default)]
    pub references: String,
    /// Incremented on every save.
    #[serde(default)]
    pub version: u64,
    /// Layer records by graph key.
    #[serde(default)]
    pub layers: BTreeMap<String, LayerRecord>,
}

/// One layer, discriminated by `mode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode")]
pub enum LayerRecord {
    /// File- or table-backed layer.
    BaseDataLayer {
        /// Layer name.
        name: String,
        /// Domain tag.
        #[serde(rename = "type", default)]
        category: Option<Category>,
        /// Whether `path` is relative to the graph root.
        #[serde(default)]
        path_is_relative: bool,
        /// Backing file, if persistent.
        #[serde(default)]
        path: Option<PathBuf>,
    },
    /// Layer computed by an operator.
    DataLayer {
        /// Layer name.
        name: String,
        /// Domain tag.
        #[serde(rename = "type", default)]
        category: Option<Category>,
        /// Whether `path` is relative to the graph root.
        #[serde(default)]
        path_is_relative: bool,
        /// File the computed content is written to, if persistent.
        #[serde(default)]
        path: Option<PathBuf>,
        /// Graph key of the origin layer.
        origin: String,
        /// Operator applied to the origin.
        operator: OperatorRecord,
    },
}

impl LayerRecord {
    /// Layer name.
    pub fn name(&self) -> &str {
        match self {
            Self::BaseDataLayer { name, .. } | Self::DataLayer { name, .. } => name,
        }
    }

    /// Graph keys this record refers to: origin first, then mask or join layer.
    pub fn references(&self) -> Vec<&str> {
        match self {
            Self::BaseDataLayer { .. } => Vec::new(),
            Self::DataLayer {
                origin, operator, ..
            } => std::iter::once(origin.as_str())
                .chain(operator.reference())
                .collect(),
        }
    }
}

fn default_hull_clip() -> bool {
    true
}

/// Operator parameters, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OperatorRecord {
    /// Area-weighted discretization.
    Discretize {
        /// Graph key of the mask layer.
        mask: String,
        /// Hull clipping; defaults to `true`.
        #[serde(default = "default_hull_clip")]
        hull_clip: bool,
    },
    /// Grid tesselation.
    Tesselate {
        /// Grid system name (`h3` or `s2`).
        mask: String,
        /// Grid resolution.
        resolution: u32,
    },
    /// Spatial join.
    Join {
        /// Graph key of the join layer.
        join: String,
    },
}

impl OperatorRecord {
    /// Graph key of the second layer the operator reads, if any.
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::Discretize { mask, .. } => Some(mask.as_str()),
            Self::Join { join } => Some(join.as_str()),
            Self::Tesselate { .. } => None,
        }
    }
}

impl GraphDocument {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, GraphError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Render as YAML.
    pub fn to_yaml(&self) -> Result<String, GraphError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Read and parse `path`.
    pub fn read(path: &Path) -> Result<Self, GraphError> {
        let text = fs::read_to_string(path).map_err(|e| GraphError::io(path, e))?;
        Self::from_yaml(&text)
    }

    /// Write to `path`, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<(), GraphError> {
        let text = self.to_yaml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| GraphError::io(parent, e))?;
        }
        fs::write(path, text).map_err(|e| GraphError::io(path, e))
    }
}
