// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! S2 cells at a fixed level.

use geo::{Coord, LineString, Polygon, Rect};
use s2::cell::Cell as S2Cell;
use s2::cellid::CellID;
use s2::latlng::LatLng;

use super::{check_density, extent_km2, flood, Cell, Regionalizer};
use crate::GraphError;

/// Surface of the earth in square kilometres.
const EARTH_KM2: f64 = 510_065_621.7;

#[derive(Debug, Clone, Copy)]
pub(crate) struct S2Grid {
    level: u64,
}

impl S2Grid {
    pub(crate) fn new(level: u8) -> Self {
        Self {
            level: u64::from(level),
        }
    }

    /// Mean cell area at this level: six faces, each split in four per level.
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    fn cell_km2(self) -> f64 {
        EARTH_KM2 / 6.0 / 4f64.powi(self.level as i32)
    }
}

fn polygon(id: CellID) -> Polygon<f64> {
    let cell = S2Cell::from(id);
    let ring: Vec<Coord<f64>> = (0..4)
        .map(|k| {
            let ll = LatLng::from(cell.vertex(k));
            Coord {
                x: ll.lng.deg(),
                y: ll.lat.deg(),
            }
        })
        .collect();
    Polygon::new(LineString::from(ring), vec![])
}

impl Regionalizer for S2Grid {
    fn cells(&self, extent: Rect<f64>) -> Result<Vec<Cell>, GraphError> {
        check_density(extent_km2(extent) / self.cell_km2())?;
        let center = extent.center();
        let seed = CellID::from(LatLng::from_degrees(center.y, center.x)).parent(self.level);
        flood(
            seed,
            extent,
            polygon,
            |id| id.edge_neighbors().to_vec(),
            |id| id.to_token(),
        )
    }
}
