// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Small geometric tables and GeoJSON helpers.

use std::path::Path;

use geo::{point, Polygon, Rect};
use smm_table::{Crs, Feature, Format, FormatError, GeoJsonFormat, Table};

/// Axis-aligned rectangle polygon.
pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Polygon<f64> {
    Rect::new((x, y), (x + width, y + height)).to_polygon()
}

/// Three labelled points: two inside [`two_squares`], one outside both.
pub fn numbered_points() -> Table {
    Table::from_features(
        Some(Crs::WGS84),
        vec![
            Feature::new(point!(x: 0.5, y: 0.5)).with_attribute("name", "p0"),
            Feature::new(point!(x: 2.5, y: 0.5)).with_attribute("name", "p1"),
            Feature::new(point!(x: 9.0, y: 9.0)).with_attribute("name", "p2"),
        ],
    )
}

/// Two unit-ish squares, `[0,1]²` and `[2,3]×[0,1]`, with a `zone` attribute.
pub fn two_squares() -> Table {
    Table::from_features(
        Some(Crs::WGS84),
        vec![
            Feature::new(rect(0.0, 0.0, 1.0, 1.0)).with_attribute("zone", "west"),
            Feature::new(rect(2.0, 0.0, 1.0, 1.0)).with_attribute("zone", "east"),
        ],
    )
}

/// `cols × rows` mask cells exactly partitioning `extent`.
#[allow(clippy::cast_precision_loss)]
pub fn grid_mask(extent: Rect<f64>, cols: usize, rows: usize) -> Table {
    let (w, h) = (extent.width() / cols as f64, extent.height() / rows as f64);
    let mut table = Table::new(Some(Crs::WGS84));
    for row in 0..rows {
        for col in 0..cols {
            let x = extent.min().x + col as f64 * w;
            let y = extent.min().y + row as f64 * h;
            table.push(Feature::new(rect(x, y, w, h)));
        }
    }
    table
}

/// Write `table` to `path` as GeoJSON.
pub fn write_table(path: &Path, table: &Table) -> Result<(), FormatError> {
    GeoJsonFormat.write(path, table)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use geo::Area;

    #[test]
    fn grid_mask_partitions_the_extent() {
        let extent = Rect::new((0.0, 0.0), (6.0, 3.0));
        let mask = grid_mask(extent, 3, 2);
        assert_eq!(mask.len(), 6);
        let area: f64 = mask
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .map(|g| g.unsigned_area())
            .sum();
        assert!((area - 18.0).abs() < 1e-12);
    }

    #[test]
    fn write_table_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("squares.geojson");
        write_table(&path, &two_squares()).unwrap();
        assert_eq!(GeoJsonFormat.read(&path).unwrap(), two_squares());
    }
}
