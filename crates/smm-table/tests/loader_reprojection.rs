// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use geo::{point, Area, Rect};
use smm_table::{Crs, Feature, FormatRegistry, Table};

fn district() -> Table {
    Table::from_features(
        Some(Crs::WGS84),
        vec![
            Feature::new(Rect::new((10.0, 45.0), (11.0, 46.0)).to_polygon())
                .with_attribute("name", "north"),
            Feature::new(point!(x: 10.5, y: 45.5)).with_attribute("name", "centre"),
        ],
    )
}

#[test]
fn projected_tables_survive_a_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("districts.geojson");
    let registry = FormatRegistry::default();

    let projected = district().to_crs(Crs::WEB_MERCATOR).unwrap();
    let mut handle = registry.open(&path).unwrap();
    handle.set(Arc::new(projected.clone())).save().unwrap();

    let mut reader = registry.open(&path).unwrap();
    let loaded = reader.content().unwrap();
    assert_eq!(loaded.crs(), Some(Crs::WEB_MERCATOR));
    assert_eq!(loaded.len(), 2);
    let area = loaded.features()[0].geometry.as_ref().unwrap().unsigned_area();
    let expected = projected.features()[0].geometry.as_ref().unwrap().unsigned_area();
    assert!((area - expected).abs() / expected < 1e-9);

    let back = loaded.to_crs(Crs::WGS84).unwrap();
    let bounds = back.bounding_rect().unwrap();
    assert!((bounds.min().x - 10.0).abs() < 1e-9);
    assert!((bounds.max().y - 46.0).abs() < 1e-9);
}

#[test]
fn content_is_loaded_once_per_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("districts.geojson");
    let registry = FormatRegistry::default();
    let mut writer = registry.open(&path).unwrap();
    writer.set(Arc::new(district())).save().unwrap();

    let mut reader = registry.open(&path).unwrap();
    let first = reader.content().unwrap();
    std::fs::remove_file(&path).unwrap();
    let second = reader.content().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.len(), 2);
}

#[test]
fn utm_tables_reproject_to_wgs84() {
    let utm = Table::from_features(
        Some(Crs::epsg(25832)),
        vec![Feature::new(Rect::new((499_500.0, 5_300_000.0), (500_500.0, 5_301_000.0)).to_polygon())],
    );
    let lonlat = utm.to_crs(Crs::WGS84).unwrap();
    assert_eq!(lonlat.crs(), Some(Crs::WGS84));
    let bounds = lonlat.bounding_rect().unwrap();
    assert!(bounds.min().x < 9.0 && bounds.max().x > 9.0);
    assert!(bounds.min().y > 47.8 && bounds.max().y < 47.9);
}

#[test]
fn unknown_codes_are_reported() {
    let table = Table::from_features(Some(Crs::epsg(1)), district().features().to_vec());
    assert!(table.to_crs(Crs::WGS84).is_err());
    let untagged: Table = district().features().iter().cloned().collect();
    assert_eq!(untagged.to_crs(Crs::epsg(25832)).unwrap().crs(), Some(Crs::epsg(25832)));
}
