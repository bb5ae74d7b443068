// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Spatial join of a base table against a join table.

use geo::{Area, Geometry, Intersects};
use smm_table::{Attributes, Feature, Table};

use super::discretize::INTERSECT_AREA;
use super::overlay::{intersection_area, FeatureIndex};

/// One row per intersecting (base, join) pair, touching included. The row
/// keeps the base geometry; join-table columns are prefixed `l1_`, base-table
/// columns `l2_`. Rows are ordered by base row, then join row.
pub(crate) fn join(base: &Table, other: &Table) -> Table {
    let index = FeatureIndex::build(other);
    let mut rows = Vec::new();
    for (l2_fid, feature) in base.iter().enumerate() {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        for l1_fid in index.candidates(geometry) {
            let partner = &other.features()[l1_fid];
            let Some(partner_geometry) = partner.geometry.as_ref() else {
                continue;
            };
            if !partner_geometry.intersects(geometry) {
                continue;
            }
            let mut attributes = Attributes::new();
            prefixed(&mut attributes, "l1", l1_fid, partner, partner_geometry);
            prefixed(&mut attributes, "l2", l2_fid, feature, geometry);
            attributes.insert(
                INTERSECT_AREA.into(),
                intersection_area(partner_geometry, geometry).into(),
            );
            rows.push(Feature {
                geometry: Some(geometry.clone()),
                attributes,
            });
        }
    }
    Table::from_features(base.crs(), rows)
}

fn prefixed(
    into: &mut Attributes,
    prefix: &str,
    fid: usize,
    feature: &Feature,
    geometry: &Geometry<f64>,
) {
    into.insert(format!("{prefix}_fid"), fid.into());
    for (key, value) in &feature.attributes {
        into.insert(format!("{prefix}_{key}"), value.clone());
    }
    into.insert(format!("{prefix}_geom_area"), geometry.unsigned_area().into());
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use geo::{point, Rect};
    use smm_table::Value;

    #[test]
    fn touching_polygons_join_with_zero_area() {
        let base: Table = vec![Feature::new(Rect::new((0.0, 0.0), (1.0, 1.0)).to_polygon())
            .with_attribute("name", "left")]
        .into_iter()
        .collect();
        let other: Table = vec![
            Feature::new(Rect::new((1.0, 0.0), (2.0, 1.0)).to_polygon()).with_attribute("name", "right"),
            Feature::new(Rect::new((5.0, 5.0), (6.0, 6.0)).to_polygon()),
        ]
        .into_iter()
        .collect();

        let out = join(&base, &other);
        assert_eq!(out.len(), 1);
        let row = &out.features()[0];
        assert_eq!(row.attribute("l1_name"), Some(&Value::from("right")));
        assert_eq!(row.attribute("l2_name"), Some(&Value::from("left")));
        assert_eq!(row.attribute("l1_fid"), Some(&Value::from(0)));
        assert_eq!(row.attribute(INTERSECT_AREA), Some(&Value::from(0.0)));
        assert_eq!(row.attribute("l2_geom_area"), Some(&Value::from(1.0)));
    }

    #[test]
    fn base_rows_without_geometry_are_skipped() {
        let base: Table = vec![Feature::default(), Feature::new(point!(x: 0.5, y: 0.5))]
            .into_iter()
            .collect();
        let other: Table = vec![Feature::new(Rect::new((0.0, 0.0), (1.0, 1.0)).to_polygon())]
            .into_iter()
            .collect();
        let out = join(&base, &other);
        assert_eq!(out.len(), 1);
        assert_eq!(out.features()[0].attribute("l2_fid"), Some(&Value::from(1)));
        assert_eq!(out.features()[0].attribute("l2_geom_area"), Some(&Value::from(0.0)));
    }
}
