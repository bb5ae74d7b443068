// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Cut a table along the cells of a regular grid.

use geo::Geometry;
use smm_table::{Crs, Feature, Table, Value};

use super::overlay::{clip, FeatureIndex};
use crate::grid::{GridSpec, GridSystem, H3Grid, Regionalizer, S2Grid};
use crate::GraphError;

/// Output column: id of the grid cell.
pub const REGION_ID: &str = "region_id";
/// Output column: row index of the source feature.
pub const FEATURE_ID: &str = "feature_id";

/// One row per (cell, feature) intersection, ordered by region then feature.
///
/// Cells live in WGS84 lon/lat, so projected tables are taken to WGS84 and
/// the result brought back. Untagged tables are read as lon/lat.
pub(crate) fn tesselate(source: &Table, grid: GridSpec) -> Result<Table, GraphError> {
    let regionalizer: Box<dyn Regionalizer> = match grid.system() {
        GridSystem::Hex => Box::new(H3Grid::new(grid.resolution())?),
        GridSystem::SphericalCell => Box::new(S2Grid::new(grid.resolution())),
    };
    match source.crs() {
        Some(crs) if crs != Crs::WGS84 => {
            let lonlat = source.to_crs(Crs::WGS84)?;
            Ok(overlay(&lonlat, regionalizer.as_ref())?.to_crs(crs)?)
        }
        _ => overlay(source, regionalizer.as_ref()),
    }
}

fn overlay(source: &Table, grid: &dyn Regionalizer) -> Result<Table, GraphError> {
    let Some(extent) = source.bounding_rect() else {
        return Ok(Table::new(source.crs()));
    };
    let index = FeatureIndex::build(source);
    let mut pieces: Vec<(String, usize, Geometry<f64>)> = Vec::new();
    for cell in grid.cells(extent)? {
        let probe = Geometry::Polygon(cell.polygon.clone());
        for fid in index.candidates(&probe) {
            let Some(geometry) = source.features()[fid].geometry.as_ref() else {
                continue;
            };
            if let Some(piece) = clip(geometry, &cell.polygon) {
                pieces.push((cell.id.clone(), fid, piece));
            }
        }
    }
    pieces.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    let rows = pieces
        .into_iter()
        .map(|(region, fid, geometry)| Feature {
            geometry: Some(geometry),
            attributes: [
                (REGION_ID.to_string(), Value::from(region)),
                (FEATURE_ID.to_string(), Value::from(fid)),
            ]
            .into_iter()
            .collect(),
        })
        .collect();
    Ok(Table::from_features(source.crs(), rows))
}
