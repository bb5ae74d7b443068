// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Overlay helpers shared by the operators: an R-tree over feature bounding
//! boxes for candidate lookup, and the polygon/line clipping primitives.

use geo::{
    Area, BooleanOps, BoundingRect, ConvexHull, CoordsIter, Geometry, Intersects, LineString,
    MultiLineString, MultiPoint, MultiPolygon, Point, Polygon,
};
use rstar::{RTree, RTreeObject, AABB};
use smm_table::Table;

/// Bounding box of one table row.
#[derive(Debug, Clone, Copy)]
struct RowBounds {
    fid: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for RowBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

fn envelope_of(geometry: &Geometry<f64>) -> Option<AABB<[f64; 2]>> {
    geometry
        .bounding_rect()
        .map(|r| AABB::from_corners([r.min().x, r.min().y], [r.max().x, r.max().y]))
}

/// Spatial index over the rows of a table.
pub(crate) struct FeatureIndex {
    tree: RTree<RowBounds>,
}

impl FeatureIndex {
    pub(crate) fn build(table: &Table) -> Self {
        let rows = table
            .iter()
            .enumerate()
            .filter_map(|(fid, f)| {
                let envelope = envelope_of(f.geometry.as_ref()?)?;
                Some(RowBounds { fid, envelope })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(rows),
        }
    }

    /// Row indices whose bounding box touches that of `geometry`, ascending.
    pub(crate) fn candidates(&self, geometry: &Geometry<f64>) -> Vec<usize> {
        let Some(envelope) = envelope_of(geometry) else {
            return Vec::new();
        };
        let mut fids: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|row| row.fid)
            .collect();
        fids.sort_unstable();
        fids
    }
}

/// Areal part of `geometry`, if it has one.
pub(crate) fn polygonal(geometry: &Geometry<f64>) -> Option<MultiPolygon<f64>> {
    match geometry {
        Geometry::Polygon(p) => Some(MultiPolygon::new(vec![p.clone()])),
        Geometry::MultiPolygon(mp) => Some(mp.clone()),
        Geometry::Rect(r) => Some(MultiPolygon::new(vec![r.to_polygon()])),
        Geometry::Triangle(t) => Some(MultiPolygon::new(vec![t.to_polygon()])),
        Geometry::GeometryCollection(gc) => {
            let parts: Vec<Polygon<f64>> = gc.iter().filter_map(polygonal).flat_map(|mp| mp.0).collect();
            (!parts.is_empty()).then(|| MultiPolygon::new(parts))
        }
        _ => None,
    }
}

/// Area shared by two geometries; zero unless both are areal.
pub(crate) fn intersection_area(a: &Geometry<f64>, b: &Geometry<f64>) -> f64 {
    match (polygonal(a), polygonal(b)) {
        (Some(a), Some(b)) => a.intersection(&b).unsigned_area(),
        _ => 0.0,
    }
}

/// Convex hull of every coordinate in `table`.
pub(crate) fn convex_hull(table: &Table) -> Option<Polygon<f64>> {
    let points: Vec<Point<f64>> = table
        .iter()
        .filter_map(|f| f.geometry.as_ref())
        .flat_map(|g| g.coords_iter())
        .map(Point::from)
        .collect();
    (!points.is_empty()).then(|| MultiPoint::new(points).convex_hull())
}

/// Part of `geometry` inside `cell`: polygon clip, line clip or the points
/// themselves. `None` when nothing is left.
pub(crate) fn clip(geometry: &Geometry<f64>, cell: &Polygon<f64>) -> Option<Geometry<f64>> {
    let area = MultiPolygon::new(vec![cell.clone()]);
    if let Some(shape) = polygonal(geometry) {
        let piece = area.intersection(&shape);
        return (!piece.0.is_empty() && piece.unsigned_area() > 0.0).then(|| piece.into());
    }
    let lines = match geometry {
        Geometry::Line(l) => Some(MultiLineString::new(vec![LineString::from(*l)])),
        Geometry::LineString(ls) => Some(MultiLineString::new(vec![ls.clone()])),
        Geometry::MultiLineString(mls) => Some(mls.clone()),
        _ => None,
    };
    if let Some(lines) = lines {
        let piece = area.clip(&lines, false);
        return (!piece.0.is_empty()).then(|| piece.into());
    }
    match geometry {
        Geometry::Point(p) => cell.intersects(p).then(|| Geometry::Point(*p)),
        Geometry::MultiPoint(mp) => {
            let inside: Vec<Point<f64>> = mp.iter().filter(|p| cell.intersects(*p)).copied().collect();
            (!inside.is_empty()).then(|| MultiPoint::new(inside).into())
        }
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use geo::{line_string, point, polygon, Rect};
    use smm_table::Feature;

    fn square(x: f64, y: f64, size: f64) -> Polygon<f64> {
        Rect::new((x, y), (x + size, y + size)).to_polygon()
    }

    #[test]
    fn candidates_come_back_sorted() {
        let table: Table = (0..5)
            .rev()
            .map(|i| Feature::new(square(f64::from(i), 0.0, 1.0)))
            .collect();
        let index = FeatureIndex::build(&table);
        let probe: Geometry<f64> = square(1.5, 0.25, 1.0).into();
        // rows are reversed: x=1 is fid 3, x=2 is fid 2
        assert_eq!(index.candidates(&probe), vec![2, 3]);
    }

    #[test]
    fn intersection_area_ignores_non_areal_inputs() {
        let a: Geometry<f64> = square(0.0, 0.0, 2.0).into();
        let b: Geometry<f64> = square(1.0, 1.0, 2.0).into();
        assert!((intersection_area(&a, &b) - 1.0).abs() < 1e-12);
        let p: Geometry<f64> = point!(x: 1.0, y: 1.0).into();
        assert!(intersection_area(&a, &p).abs() < f64::EPSILON);
    }

    #[test]
    fn hull_spans_all_rows() {
        let table: Table = vec![
            Feature::new(point!(x: 0.0, y: 0.0)),
            Feature::new(point!(x: 4.0, y: 0.0)),
            Feature::new(polygon![(x: 0.0, y: 4.0), (x: 1.0, y: 4.0), (x: 1.0, y: 3.0)]),
        ]
        .into_iter()
        .collect();
        let hull = convex_hull(&table).unwrap();
        assert!(hull.unsigned_area() > 7.0);
        assert!(convex_hull(&Table::empty()).is_none());
    }

    #[test]
    fn clip_handles_each_dimension() {
        let cell = square(0.0, 0.0, 1.0);
        let poly: Geometry<f64> = square(0.5, 0.5, 1.0).into();
        let piece = clip(&poly, &cell).unwrap();
        assert!((piece.unsigned_area() - 0.25).abs() < 1e-12);

        let line: Geometry<f64> = line_string![(x: -1.0, y: 0.5), (x: 2.0, y: 0.5)].into();
        assert!(matches!(clip(&line, &cell), Some(Geometry::MultiLineString(_))));

        let outside: Geometry<f64> = point!(x: 3.0, y: 3.0).into();
        assert!(clip(&outside, &cell).is_none());
    }
}
