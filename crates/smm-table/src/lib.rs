// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Geometric tables for smm layer graphs.
//!
//! `smm-table` owns the value that flows between layers: a [`Table`] of
//! features (optional geometry plus attributes) tagged with an optional
//! [`Crs`]. It also owns the file-format boundary: a [`FormatRegistry`] that
//! dispatches on file extension and hands out [`LoaderHandle`]s which load
//! lazily and write back on request.
//!
//! # Absence Semantics
//!
//! A loader pointed at a file that does not exist yields an empty table. This
//! is not an error: graphs routinely declare layers before their files exist.
#![forbid(unsafe_code)]

pub mod crs;
pub mod format;
mod table;

pub use crs::{Crs, CrsError, Reprojection};
pub use format::{Format, FormatError, FormatRegistry, GeoJsonFormat, LoaderHandle};
pub use table::{Attributes, Feature, Table};

/// Attribute value type used in feature attribute maps.
pub use serde_json::Value;
