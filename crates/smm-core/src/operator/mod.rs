// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Operators attached to derived layers.
//!
//! An [`Operator`] is a value: it carries its configuration and the handles of
//! any extra layers it reads, never cached results. Evaluation pulls the
//! content of those layers through the [`Engine`], aligns CRSs and hands the
//! geometry work to the engine's [`SpatialKernel`](crate::SpatialKernel).

pub(crate) mod discretize;
pub(crate) mod join;
pub(crate) mod overlay;
pub(crate) mod tesselate;

use std::fmt;
use std::rc::Rc;

use smm_table::Table;
use tracing::debug;

use crate::grid::GridSpec;
use crate::{Engine, GraphError, LayerRef};

/// Column names written by the operators.
pub mod columns {
    pub use super::discretize::{INTERSECT_AREA, MASK_FID, SCALE, SOURCE_FID};
    pub use super::tesselate::{FEATURE_ID, REGION_ID};
}

/// Transformation applied by a derived layer to its origin.
#[derive(Clone)]
pub enum Operator {
    /// Redistribute the origin's numeric attributes onto the mask's features,
    /// weighted by intersection area.
    Discretize {
        /// Layer whose features receive the redistributed values.
        mask: LayerRef,
        /// Discount source features by their coverage of the mask's convex hull.
        hull_clip: bool,
    },
    /// Cut the origin along a regular grid.
    Tesselate(GridSpec),
    /// Spatially join the origin against a second layer.
    Join {
        /// Layer joined against the origin.
        join: LayerRef,
    },
}

impl Operator {
    /// Discretize onto `mask`, with hull clipping.
    ///
    /// Numeric attributes, integer ids included, are scaled and become floats.
    pub fn discretize(mask: &LayerRef) -> Self {
        Self::Discretize {
            mask: Rc::clone(mask),
            hull_clip: true,
        }
    }

    /// Tesselate along `grid` (`h3` or `s2`) at `resolution`.
    ///
    /// Fails with [`GraphError::UnsupportedValue`] before anything is computed.
    pub fn tesselate(grid: &str, resolution: u32) -> Result<Self, GraphError> {
        Ok(Self::Tesselate(GridSpec::parse(grid, resolution)?))
    }

    /// Join against `layer`.
    pub fn join(layer: &LayerRef) -> Self {
        Self::Join {
            join: Rc::clone(layer),
        }
    }

    /// Builder-style toggle for discretize hull clipping; other operators are unchanged.
    pub fn with_hull_clip(mut self, enabled: bool) -> Self {
        if let Self::Discretize { hull_clip, .. } = &mut self {
            *hull_clip = enabled;
        }
        self
    }

    /// Lower-case operator name as written in graph documents.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Discretize { .. } => "discretize",
            Self::Tesselate(_) => "tesselate",
            Self::Join { .. } => "join",
        }
    }

    /// The second layer the operator reads, if any.
    pub fn dependency(&self) -> Option<&LayerRef> {
        match self {
            Self::Discretize { mask, .. } => Some(mask),
            Self::Join { join } => Some(join),
            Self::Tesselate(_) => None,
        }
    }

    pub(crate) fn apply(&self, origin: &Table, engine: &Engine) -> Result<Table, GraphError> {
        let scratch = engine.scratch();
        match self {
            Self::Discretize { mask, hull_clip } => {
                let mask = mask.content(engine)?;
                let (source, mask) = engine.align(origin, &mask)?;
                debug!(rows = source.len(), mask_rows = mask.len(), hull_clip, "discretize");
                engine
                    .kernel()
                    .discretize(&source, &mask, *hull_clip, &scratch)
            }
            Self::Tesselate(grid) => {
                debug!(rows = origin.len(), grid = %grid.system(), resolution = grid.resolution(), "tesselate");
                engine.kernel().tesselate(origin, *grid, &scratch)
            }
            Self::Join { join } => {
                let other = join.content(engine)?;
                let (base, other) = engine.align(origin, &other)?;
                debug!(rows = base.len(), join_rows = other.len(), "join");
                engine.kernel().join(&base, &other, &scratch)
            }
        }
    }
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Self::Discretize { mask, hull_clip },
                Self::Discretize {
                    mask: other_mask,
                    hull_clip: other_clip,
                },
            ) => Rc::ptr_eq(mask, other_mask) && hull_clip == other_clip,
            (Self::Tesselate(a), Self::Tesselate(b)) => a == b,
            (Self::Join { join }, Self::Join { join: other_join }) => Rc::ptr_eq(join, other_join),
            _ => false,
        }
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discretize { mask, hull_clip } => f
                .debug_struct("Discretize")
                .field("mask", &mask.name())
                .field("hull_clip", hull_clip)
                .finish(),
            Self::Tesselate(grid) => f.debug_tuple("Tesselate").field(grid).finish(),
            Self::Join { join } => f.debug_struct("Join").field("join", &join.name()).finish(),
        }
    }
}
