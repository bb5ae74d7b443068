// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! GeoJSON (RFC 7946) format.
//!
//! Tables are written as a single `FeatureCollection`. Non-WGS84 tables carry
//! the legacy `crs` member so projected layers read back with the right CRS.

use std::fs;
use std::path::Path;

use geo::Geometry;
use geojson::{FeatureCollection, GeoJson, JsonObject, JsonValue};

use super::{Format, FormatError};
use crate::{Crs, Feature, Table};

/// GeoJSON reader/writer registered under `.geojson`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoJsonFormat;

impl Format for GeoJsonFormat {
    fn extension(&self) -> &'static str {
        ".geojson"
    }

    fn read(&self, path: &Path) -> Result<Table, FormatError> {
        let text = fs::read_to_string(path).map_err(|source| FormatError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: GeoJson = text.parse().map_err(|e| decode_error(path, &e))?;
        let (features, crs) = match document {
            GeoJson::FeatureCollection(fc) => {
                let crs = fc.foreign_members.as_ref().and_then(legacy_crs);
                (fc.features, crs)
            }
            GeoJson::Feature(feature) => (vec![feature], None),
            GeoJson::Geometry(geometry) => (
                vec![geojson::Feature {
                    bbox: None,
                    geometry: Some(geometry),
                    id: None,
                    properties: None,
                    foreign_members: None,
                }],
                None,
            ),
        };

        let mut rows = Vec::with_capacity(features.len());
        for feature in features {
            let geometry = match feature.geometry {
                Some(g) => Some(Geometry::<f64>::try_from(g).map_err(|e| decode_error(path, &e))?),
                None => None,
            };
            rows.push(Feature {
                geometry,
                attributes: feature.properties.unwrap_or_default().into_iter().collect(),
            });
        }
        Ok(Table::from_features(Some(crs.unwrap_or(Crs::WGS84)), rows))
    }

    fn write(&self, path: &Path, table: &Table) -> Result<(), FormatError> {
        let features = table
            .iter()
            .map(|f| geojson::Feature {
                bbox: None,
                geometry: f
                    .geometry
                    .as_ref()
                    .map(|g| geojson::Geometry::new(geojson::Value::from(g))),
                id: None,
                properties: Some(
                    f.attributes
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect::<JsonObject>(),
                ),
                foreign_members: None,
            })
            .collect();
        let foreign_members = table
            .crs()
            .filter(|crs| *crs != Crs::WGS84)
            .map(|crs| {
                let mut members = JsonObject::new();
                members.insert(
                    "crs".to_string(),
                    serde_json::json!({
                        "type": "name",
                        "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", crs.code()) }
                    }),
                );
                members
            });
        let collection = FeatureCollection {
            bbox: None,
            features,
            foreign_members,
        };
        fs::write(path, GeoJson::from(collection).to_string()).map_err(|source| FormatError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn legacy_crs(members: &JsonObject) -> Option<Crs> {
    members
        .get("crs")
        .and_then(|crs| crs.pointer("/properties/name"))
        .and_then(JsonValue::as_str)
        .and_then(|name| name.parse().ok())
}

fn decode_error(path: &Path, err: &geojson::Error) -> FormatError {
    FormatError::Decode {
        path: path.to_path_buf(),
        message: err.to_string(),
    }
}
