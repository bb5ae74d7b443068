// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Error type shared by layers, operators and the graph manager.

use std::path::PathBuf;

use smm_table::{CrsError, FormatError};
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while building, evaluating or persisting a layer graph.
#[derive(Debug, Error)]
pub enum GraphError {
    /// No layer is registered under the requested name.
    #[error("layer not found: {0}")]
    LayerNotFound(String),
    /// A layer record names a reference that is not part of the document.
    #[error("layer '{layer}' references unknown layer '{reference}'")]
    ReferenceNotFound {
        /// Layer holding the dangling reference.
        layer: String,
        /// Name that could not be resolved.
        reference: String,
    },
    /// The document's references form a cycle; the payload is the path.
    #[error("reference cycle: {0}")]
    Cycle(String),
    /// A different layer is already registered under the name.
    #[error("a different layer is already registered as '{0}'")]
    DuplicateLayer(String),
    /// The call is not valid for the layer or graph in its current state.
    #[error("{0}")]
    Usage(String),
    /// An operator parameter is outside the supported set.
    #[error("unsupported value '{value}' for {parameter}")]
    UnsupportedValue {
        /// Parameter name.
        parameter: String,
        /// Rejected value.
        value: String,
    },
    /// A tesselation would generate more cells than allowed.
    #[error("grid of {cells} cells exceeds the limit of {limit}")]
    GridTooDense {
        /// Estimated number of cells.
        cells: u64,
        /// Configured limit.
        limit: u64,
    },
    /// Reading or writing a layer file failed.
    #[error(transparent)]
    Format(#[from] FormatError),
    /// Reprojection failed.
    #[error(transparent)]
    Crs(#[from] CrsError),
    /// Filesystem failure outside of a format loader.
    #[error("io error at {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The graph document could not be parsed or serialized.
    #[error("graph document error: {0}")]
    Document(#[from] serde_yaml::Error),
    /// Engine settings could not be loaded or stored.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

impl GraphError {
    pub(crate) fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub(crate) fn unsupported(parameter: &str, value: impl ToString) -> Self {
        Self::UnsupportedValue {
            parameter: parameter.to_string(),
            value: value.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
