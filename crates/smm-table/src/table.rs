// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Feature and table value types.

use std::collections::{BTreeMap, BTreeSet};

use geo::{coord, BoundingRect, Geometry, Rect};
use serde_json::Value;

use crate::crs::{Crs, CrsError, Reprojection};

/// Attribute columns of a single feature, keyed by column name.
pub type Attributes = BTreeMap<String, Value>;

/// One row of a [`Table`]: an optional geometry plus its attributes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Feature {
    /// Feature geometry; `None` for attribute-only rows.
    pub geometry: Option<Geometry<f64>>,
    /// Attribute values keyed by column name.
    pub attributes: Attributes,
}

impl Feature {
    /// Create a feature with `geometry` and no attributes.
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: Some(geometry.into()),
            attributes: Attributes::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute by column name.
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }
}

/// In-memory geometric table.
///
/// Row order is significant: operators refer to rows by their index (`fid`).
/// A table without a CRS is assumed to already be in whatever CRS the caller
/// works in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    crs: Option<Crs>,
    features: Vec<Feature>,
}

impl Table {
    /// Create an empty table tagged with `crs`.
    pub fn new(crs: Option<Crs>) -> Self {
        Self {
            crs,
            features: Vec::new(),
        }
    }

    /// Create an empty table without CRS.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a table from existing features.
    pub fn from_features(crs: Option<Crs>, features: Vec<Feature>) -> Self {
        Self { crs, features }
    }

    /// Coordinate reference system of the geometries, if known.
    pub fn crs(&self) -> Option<Crs> {
        self.crs
    }

    /// Re-tag the table without transforming coordinates.
    pub fn set_crs(&mut self, crs: Option<Crs>) {
        self.crs = crs;
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns `true` if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// All rows in order.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Iterate over rows in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    /// Append a row.
    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Union of all attribute column names, sorted.
    pub fn columns(&self) -> BTreeSet<&str> {
        self.features
            .iter()
            .flat_map(|f| f.attributes.keys().map(String::as_str))
            .collect()
    }

    /// Values of one column, row by row (`None` where a row lacks the column).
    pub fn column<'a>(&'a self, name: &'a str) -> impl Iterator<Item = Option<&'a Value>> + 'a {
        self.features.iter().map(move |f| f.attributes.get(name))
    }

    /// Bounding rectangle over every geometry in the table.
    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.as_ref().and_then(|g| g.bounding_rect()))
            .reduce(|a, b| {
                Rect::new(
                    coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                    coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
                )
            })
    }

    /// Return a copy of the table expressed in `target`.
    ///
    /// Tables without a CRS are tagged with `target` as-is.
    pub fn to_crs(&self, target: Crs) -> Result<Table, CrsError> {
        let Some(source) = self.crs else {
            return Ok(Self {
                crs: Some(target),
                features: self.features.clone(),
            });
        };
        if source == target {
            return Ok(self.clone());
        }
        let reprojection = Reprojection::new(source, target)?;
        let mut features = Vec::with_capacity(self.features.len());
        for feature in &self.features {
            let geometry = match &feature.geometry {
                Some(g) => Some(reprojection.apply(g)?),
                None => None,
            };
            features.push(Feature {
                geometry,
                attributes: feature.attributes.clone(),
            });
        }
        Ok(Self {
            crs: Some(target),
            features,
        })
    }
}

impl FromIterator<Feature> for Table {
    fn from_iter<I: IntoIterator<Item = Feature>>(iter: I) -> Self {
        Self {
            crs: None,
            features: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
