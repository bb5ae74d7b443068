// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Regionalization grids used by the tesselate operator.
//!
//! `h3` cells come from `h3o`, `s2` cells from the `s2` crate; cell ids are
//! the systems' own string forms (H3 hex index, S2 token). Grids work in
//! WGS84 lon/lat degrees. Cell outlines join their vertices with straight
//! lon/lat segments, so neighbouring cells still tile without gaps.
//! Cells crossing the antimeridian are not split.

mod hex;
mod sphere;

pub(crate) use hex::H3Grid;
pub(crate) use sphere::S2Grid;

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

use geo::{Intersects, Polygon, Rect};

use crate::GraphError;

/// Largest number of cells a single tesselation may generate.
pub const MAX_GRID_CELLS: u64 = 2_000_000;

/// Supported grid systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridSystem {
    /// H3 hexagons (`h3`), resolutions 0..=15.
    Hex,
    /// S2 cells (`s2`), levels 0..=30.
    SphericalCell,
}

impl GridSystem {
    /// Name used in graph documents.
    pub fn name(self) -> &'static str {
        match self {
            Self::Hex => "h3",
            Self::SphericalCell => "s2",
        }
    }

    /// Highest resolution the system accepts.
    pub fn max_resolution(self) -> u8 {
        match self {
            Self::Hex => 15,
            Self::SphericalCell => 30,
        }
    }
}

impl fmt::Display for GridSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GridSystem {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "h3" => Ok(Self::Hex),
            "s2" => Ok(Self::SphericalCell),
            other => Err(GraphError::unsupported("grid", other)),
        }
    }
}

/// A validated grid system and resolution pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GridSpec {
    system: GridSystem,
    resolution: u8,
}

impl GridSpec {
    /// Validate `resolution` against `system`.
    pub fn new(system: GridSystem, resolution: u32) -> Result<Self, GraphError> {
        match u8::try_from(resolution) {
            Ok(r) if r <= system.max_resolution() => Ok(Self {
                system,
                resolution: r,
            }),
            _ => Err(GraphError::unsupported("resolution", resolution)),
        }
    }

    /// Parse the grid name, then validate the resolution.
    pub fn parse(grid: &str, resolution: u32) -> Result<Self, GraphError> {
        Self::new(grid.parse()?, resolution)
    }

    /// Grid system.
    pub fn system(self) -> GridSystem {
        self.system
    }

    /// Resolution (hex) or level (spherical).
    pub fn resolution(self) -> u8 {
        self.resolution
    }
}

/// One grid cell.
#[derive(Debug, Clone)]
pub(crate) struct Cell {
    pub(crate) id: String,
    pub(crate) polygon: Polygon<f64>,
}

/// Produces the cells covering an extent.
pub(crate) trait Regionalizer {
    fn cells(&self, extent: Rect<f64>) -> Result<Vec<Cell>, GraphError>;
}

/// Reject estimates above [`MAX_GRID_CELLS`]. `estimate` may be non-finite.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn check_density(estimate: f64) -> Result<(), GraphError> {
    if estimate.is_finite() && estimate <= MAX_GRID_CELLS as f64 {
        return Ok(());
    }
    Err(GraphError::GridTooDense {
        cells: if estimate.is_finite() { estimate as u64 } else { u64::MAX },
        limit: MAX_GRID_CELLS,
    })
}

/// Rough area of a lon/lat extent, erring high.
pub(crate) fn extent_km2(extent: Rect<f64>) -> f64 {
    const KM_PER_DEGREE: f64 = 111.32;
    let (lo, hi) = (extent.min().y, extent.max().y);
    let widest = if lo <= 0.0 && hi >= 0.0 {
        1.0
    } else {
        lo.abs().min(hi.abs()).to_radians().cos()
    };
    extent.width() * extent.height() * KM_PER_DEGREE * KM_PER_DEGREE * widest
}

/// Breadth-first walk from `seed` collecting every cell whose outline
/// intersects `extent`. The seed is always expanded, so an extent that falls
/// into a neighbour's outline is still found.
pub(crate) fn flood<K: Copy + Eq + Hash>(
    seed: K,
    extent: Rect<f64>,
    polygon: impl Fn(K) -> Polygon<f64>,
    neighbours: impl Fn(K) -> Vec<K>,
    id: impl Fn(K) -> String,
) -> Result<Vec<Cell>, GraphError> {
    let limit = usize::try_from(MAX_GRID_CELLS).unwrap_or(usize::MAX);
    let mut seen = HashSet::from([seed]);
    let mut queue = VecDeque::from([seed]);
    let mut cells = Vec::new();
    while let Some(key) = queue.pop_front() {
        let outline = polygon(key);
        let hit = outline.intersects(&extent);
        if hit {
            cells.push(Cell {
                id: id(key),
                polygon: outline,
            });
        }
        if !hit && key != seed {
            continue;
        }
        for next in neighbours(key) {
            if seen.insert(next) {
                queue.push_back(next);
            }
        }
        if cells.len() > limit {
            return Err(GraphError::GridTooDense {
                cells: u64::try_from(cells.len()).unwrap_or(u64::MAX),
                limit: MAX_GRID_CELLS,
            });
        }
    }
    Ok(cells)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn grid_names_round_trip() {
        for system in [GridSystem::Hex, GridSystem::SphericalCell] {
            assert_eq!(system.name().parse::<GridSystem>().unwrap(), system);
        }
        assert!(matches!(
            "h4".parse::<GridSystem>(),
            Err(GraphError::UnsupportedValue { ref parameter, ref value }) if parameter == "grid" && value == "h4"
        ));
    }

    #[test]
    fn resolution_bounds_follow_the_system() {
        assert!(GridSpec::new(GridSystem::Hex, 15).is_ok());
        assert!(GridSpec::new(GridSystem::Hex, 16).is_err());
        assert!(GridSpec::new(GridSystem::SphericalCell, 30).is_ok());
        assert!(GridSpec::new(GridSystem::SphericalCell, 31).is_err());
        assert!(GridSpec::new(GridSystem::SphericalCell, 1_000).is_err());
    }

    #[test]
    fn extent_area_uses_the_widest_latitude() {
        let equator = Rect::new((0.0, -1.0), (1.0, 1.0));
        assert!((extent_km2(equator) - 2.0 * 111.32 * 111.32).abs() < 1e-6);
        let north = Rect::new((0.0, 60.0), (1.0, 61.0));
        assert!((extent_km2(north) - 111.32 * 111.32 * 0.5).abs() < 1e-6);
    }

    #[test]
    fn density_guard() {
        assert!(check_density(10.0).is_ok());
        assert!(matches!(
            check_density(f64::INFINITY),
            Err(GraphError::GridTooDense { cells: u64::MAX, .. })
        ));
        assert!(matches!(
            check_density(2_000_001.0),
            Err(GraphError::GridTooDense { cells: 2_000_001, .. })
        ));
    }
}
