// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! smm-core: layer dependency graphs with lazy, cached evaluation.
//!
//! A [`LayerGraph`] holds named [`Layer`]s. Base layers read geometric
//! tables from files; derived layers compute theirs by applying an
//! [`Operator`] (discretize, tesselate, join) to other layers. Content is
//! produced on first access through an [`Engine`] and cached per layer, so a
//! layer shared by several dependants is computed once.
//!
//! Graphs serialize to a YAML [`GraphDocument`]; loading resolves layer names
//! back into shared handles and rejects dangling references and cycles.
//!
//! # Threading
//!
//! Layers are `Rc` handles with `RefCell` state: graphs are single-threaded
//! and neither `Send` nor `Sync`.
#![forbid(unsafe_code)]

pub mod config;
pub mod document;
mod engine;
mod error;
pub mod graph;
pub mod grid;
mod kernel;
pub mod layer;
pub mod operator;
pub mod settings;
mod workdir;

pub use config::{ConfigError, ConfigService, ConfigStore};
pub use document::{GraphDocument, LayerRecord, OperatorRecord, DOCUMENT_EXTENSION};
pub use engine::Engine;
pub use error::GraphError;
pub use graph::LayerGraph;
pub use grid::{GridSpec, GridSystem, MAX_GRID_CELLS};
pub use kernel::{GeoKernel, SpatialKernel};
pub use layer::{Category, Derivation, Layer, LayerKind, LayerRef};
pub use operator::Operator;
pub use settings::EngineSettings;
pub use workdir::{Scratch, WorkDir};
