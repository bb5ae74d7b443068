// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! H3 hexagonal cells.

use geo::{Coord, LineString, Polygon, Rect};
use h3o::{CellIndex, LatLng, Resolution};

use super::{check_density, extent_km2, flood, Cell, Regionalizer};
use crate::GraphError;

#[derive(Debug, Clone, Copy)]
pub(crate) struct H3Grid {
    resolution: Resolution,
}

impl H3Grid {
    pub(crate) fn new(resolution: u8) -> Result<Self, GraphError> {
        Resolution::try_from(resolution)
            .map(|resolution| Self { resolution })
            .map_err(|_| GraphError::unsupported("resolution", resolution))
    }
}

fn polygon(cell: CellIndex) -> Polygon<f64> {
    let ring: Vec<Coord<f64>> = cell
        .boundary()
        .iter()
        .map(|ll| Coord {
            x: ll.lng(),
            y: ll.lat(),
        })
        .collect();
    Polygon::new(LineString::from(ring), vec![])
}

impl Regionalizer for H3Grid {
    fn cells(&self, extent: Rect<f64>) -> Result<Vec<Cell>, GraphError> {
        check_density(extent_km2(extent) / self.resolution.area_km2())?;
        let center = extent.center();
        let seed = LatLng::new(center.y, center.x)
            .map_err(|e| GraphError::usage(format!("extent is not in lon/lat degrees: {e}")))?
            .to_cell(self.resolution);
        flood(
            seed,
            extent,
            polygon,
            |cell| cell.grid_disk::<Vec<_>>(1),
            |cell| cell.to_string(),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use geo::{coord, Area, BooleanOps, MultiPolygon};

    #[test]
    fn ids_are_h3_indexes_at_the_requested_resolution() {
        let extent = Rect::new(coord! { x: 11.50, y: 48.10 }, coord! { x: 11.62, y: 48.18 });
        let cells = H3Grid::new(7).unwrap().cells(extent).unwrap();
        assert!(cells.len() > 1);
        for cell in &cells {
            let index: CellIndex = cell.id.parse().unwrap();
            assert_eq!(index.resolution(), Resolution::Seven);
        }
    }

    #[test]
    fn cells_cover_the_extent() {
        let extent = Rect::new(coord! { x: 11.50, y: 48.10 }, coord! { x: 11.62, y: 48.18 });
        let cells = H3Grid::new(7).unwrap().cells(extent).unwrap();
        let target = MultiPolygon::new(vec![extent.to_polygon()]);
        let covered: f64 = cells
            .iter()
            .map(|c| MultiPolygon::new(vec![c.polygon.clone()]).intersection(&target).unsigned_area())
            .sum();
        let expected = extent.unsigned_area();
        assert!((covered - expected).abs() / expected < 1e-6);
    }

    #[test]
    fn a_point_maps_to_its_h3_cell() {
        let (lat, lng) = (48.1374, 11.5761);
        let expected = LatLng::new(lat, lng).unwrap().to_cell(Resolution::Nine).to_string();
        let p = coord! { x: lng, y: lat };
        let cells = H3Grid::new(9).unwrap().cells(Rect::new(p, p)).unwrap();
        assert!(cells.iter().any(|c| c.id == expected));
    }

    #[test]
    fn fine_grids_over_large_extents_are_rejected() {
        let extent = Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 20.0, y: 20.0 });
        assert!(matches!(
            H3Grid::new(15).unwrap().cells(extent),
            Err(GraphError::GridTooDense { .. })
        ));
    }
}
