// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Spatial kernel port.
//!
//! Operators never touch geometry directly; they call the kernel held by the
//! [`Engine`](crate::Engine). Inputs arrive already aligned to a common CRS.

use std::fmt;

use smm_table::Table;

use crate::grid::GridSpec;
use crate::operator::{discretize, join, tesselate};
use crate::{GraphError, Scratch};

/// Geometry backend for the operators.
pub trait SpatialKernel: fmt::Debug {
    /// Area-weighted redistribution of `source` onto `mask`.
    fn discretize(
        &self,
        source: &Table,
        mask: &Table,
        hull_clip: bool,
        scratch: &Scratch<'_>,
    ) -> Result<Table, GraphError>;

    /// Cut `source` along the cells of `grid`.
    fn tesselate(
        &self,
        source: &Table,
        grid: GridSpec,
        scratch: &Scratch<'_>,
    ) -> Result<Table, GraphError>;

    /// Spatial join of `base` against `other`.
    fn join(&self, base: &Table, other: &Table, scratch: &Scratch<'_>) -> Result<Table, GraphError>;
}

/// Default kernel built on the `geo` algorithms and an `rstar` index.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoKernel;

impl SpatialKernel for GeoKernel {
    fn discretize(
        &self,
        source: &Table,
        mask: &Table,
        hull_clip: bool,
        scratch: &Scratch<'_>,
    ) -> Result<Table, GraphError> {
        scratch.stage("discretize-source", source)?;
        scratch.stage("discretize-mask", mask)?;
        let out = discretize::discretize(source, mask, hull_clip);
        scratch.stage("discretize", &out)?;
        Ok(out)
    }

    fn tesselate(
        &self,
        source: &Table,
        grid: GridSpec,
        scratch: &Scratch<'_>,
    ) -> Result<Table, GraphError> {
        let out = tesselate::tesselate(source, grid)?;
        scratch.stage("tesselate", &out)?;
        Ok(out)
    }

    fn join(&self, base: &Table, other: &Table, scratch: &Scratch<'_>) -> Result<Table, GraphError> {
        scratch.stage("join-base", base)?;
        scratch.stage("join-other", other)?;
        let out = join::join(base, other);
        scratch.stage("join", &out)?;
        Ok(out)
    }
}
