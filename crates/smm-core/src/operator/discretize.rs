// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Area-weighted redistribution of source attributes onto mask features.

use geo::{Area, BooleanOps, MultiPolygon};
use smm_table::{Attributes, Feature, Table, Value};

use super::overlay::{convex_hull, polygonal, FeatureIndex};

/// Output column: row index of the mask feature.
pub const MASK_FID: &str = "mask_fid";
/// Output column: row index of the source feature.
pub const SOURCE_FID: &str = "source_fid";
/// Output column: area shared by the source and mask feature.
pub const INTERSECT_AREA: &str = "intersect_area";
/// Output column: weight applied to the numeric source attributes.
pub const SCALE: &str = "scale";

/// One output row per overlapping (source, mask) pair, ordered by source then
/// mask row. Both tables must already share a CRS.
///
/// `scale` is the pair's share of the source feature's covered area; with
/// `hull_clip` it is further multiplied by the fraction of the source feature
/// inside the convex hull of the whole mask layer. Non-areal source rows and
/// pairs that only touch produce nothing.
///
/// Every numeric source attribute is multiplied by `scale` and comes back as
/// a float, integer id columns included. Other values are copied unchanged.
pub(crate) fn discretize(source: &Table, mask: &Table, hull_clip: bool) -> Table {
    let index = FeatureIndex::build(mask);
    let hull = if hull_clip {
        convex_hull(mask).map(|h| MultiPolygon::new(vec![h]))
    } else {
        None
    };

    let mut rows = Vec::new();
    for (source_fid, feature) in source.iter().enumerate() {
        let Some(geometry) = feature.geometry.as_ref() else {
            continue;
        };
        let Some(shape) = polygonal(geometry) else {
            continue;
        };
        let pairs: Vec<(usize, f64)> = index
            .candidates(geometry)
            .into_iter()
            .filter_map(|mask_fid| {
                let other = polygonal(mask.features()[mask_fid].geometry.as_ref()?)?;
                let area = shape.intersection(&other).unsigned_area();
                (area > 0.0).then_some((mask_fid, area))
            })
            .collect();
        let covered: f64 = pairs.iter().map(|(_, area)| area).sum();
        if covered <= 0.0 {
            continue;
        }
        let coverage = match &hull {
            Some(hull) => {
                let total = shape.unsigned_area();
                if total > 0.0 {
                    shape.intersection(hull).unsigned_area() / total
                } else {
                    1.0
                }
            }
            None => 1.0,
        };

        for (mask_fid, area) in pairs {
            let scale = (area / covered * coverage).min(1.0);
            let mut attributes: Attributes = feature
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), scaled(v, scale)))
                .collect();
            attributes.insert(MASK_FID.into(), mask_fid.into());
            attributes.insert(SOURCE_FID.into(), source_fid.into());
            attributes.insert(INTERSECT_AREA.into(), area.into());
            attributes.insert(SCALE.into(), scale.into());
            rows.push(Feature {
                geometry: mask.features()[mask_fid].geometry.clone(),
                attributes,
            });
        }
    }
    Table::from_features(source.crs(), rows)
}

fn scaled(value: &Value, scale: f64) -> Value {
    value
        .as_f64()
        .map_or_else(|| value.clone(), |n| Value::from(n * scale))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use geo::{point, Geometry, Rect};

    fn cell(x: f64, y: f64, w: f64, h: f64) -> Feature {
        Feature::new(Rect::new((x, y), (x + w, y + h)).to_polygon())
    }

    fn f(row: &Feature, key: &str) -> f64 {
        row.attribute(key).and_then(Value::as_f64).unwrap()
    }

    #[test]
    fn splits_a_source_across_two_masks() {
        let source: Table = vec![cell(0.0, 0.0, 4.0, 2.0)
            .with_attribute("pop", 100)
            .with_attribute("label", "district")]
        .into_iter()
        .collect();
        let mask: Table = vec![cell(0.0, 0.0, 1.0, 2.0), cell(1.0, 0.0, 3.0, 2.0)]
            .into_iter()
            .collect();

        let out = discretize(&source, &mask, false);
        assert_eq!(out.len(), 2);
        assert!((f(&out.features()[0], SCALE) - 0.25).abs() < 1e-12);
        assert!((f(&out.features()[1], SCALE) - 0.75).abs() < 1e-12);
        assert!((f(&out.features()[0], "pop") - 25.0).abs() < 1e-9);
        assert!((f(&out.features()[1], "pop") - 75.0).abs() < 1e-9);
        assert!((f(&out.features()[1], INTERSECT_AREA) - 6.0).abs() < 1e-9);
        assert_eq!(out.features()[1].attribute("label"), Some(&Value::from("district")));
        assert_eq!(out.features()[1].geometry, mask.features()[1].geometry);
    }

    #[test]
    fn hull_clip_discounts_uncovered_area() {
        // mask covers only the left half of the source
        let source: Table = vec![cell(0.0, 0.0, 2.0, 2.0).with_attribute("pop", 10.0)]
            .into_iter()
            .collect();
        let mask: Table = vec![cell(0.0, 0.0, 1.0, 2.0)].into_iter().collect();

        let plain = discretize(&source, &mask, false);
        assert!((f(&plain.features()[0], SCALE) - 1.0).abs() < 1e-12);

        let clipped = discretize(&source, &mask, true);
        assert!((f(&clipped.features()[0], SCALE) - 0.5).abs() < 1e-12);
        assert!((f(&clipped.features()[0], "pop") - 5.0).abs() < 1e-9);
    }

    #[test]
    fn touching_and_non_areal_rows_are_skipped() {
        let source: Table = vec![
            cell(0.0, 0.0, 1.0, 1.0),
            Feature::new(point!(x: 0.5, y: 0.5)),
            Feature::default(),
        ]
        .into_iter()
        .collect();
        let mask: Table = vec![cell(1.0, 0.0, 1.0, 1.0)].into_iter().collect();
        assert!(discretize(&source, &mask, true).is_empty());
    }

    #[test]
    fn integer_attributes_come_back_as_scaled_floats() {
        let source: Table = vec![cell(0.0, 0.0, 2.0, 1.0)
            .with_attribute("zone_id", 7)
            .with_attribute("open", true)]
        .into_iter()
        .collect();
        let mask: Table = vec![cell(0.0, 0.0, 1.0, 1.0), cell(1.0, 0.0, 1.0, 1.0)]
            .into_iter()
            .collect();

        let out = discretize(&source, &mask, false);
        let id = out.features()[0].attribute("zone_id").unwrap();
        assert!(id.is_f64());
        assert!((id.as_f64().unwrap() - 3.5).abs() < 1e-12);
        assert_eq!(out.features()[0].attribute("open"), Some(&Value::from(true)));
    }

    #[test]
    fn mask_geometry_is_carried_through() {
        let source: Table = vec![cell(0.0, 0.0, 1.0, 1.0)].into_iter().collect();
        let mask: Table = vec![cell(-1.0, -1.0, 3.0, 3.0)].into_iter().collect();
        let out = discretize(&source, &mask, true);
        assert_eq!(out.len(), 1);
        assert!(matches!(out.features()[0].geometry, Some(Geometry::Polygon(_))));
        assert_eq!(out.features()[0].attribute(MASK_FID), Some(&Value::from(0)));
        assert_eq!(out.features()[0].attribute(SOURCE_FID), Some(&Value::from(0)));
    }
}
