// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;

use geo::Rect;
use proptest::prelude::*;
use smm_core::operator::columns::{SCALE, SOURCE_FID};
use smm_core::{Layer, Operator};
use smm_dry_tests::{grid_mask, rect, EngineTestBuilder};
use smm_table::{Crs, Feature, Table};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn scales_sum_to_one_when_the_mask_partitions_the_source(
        cols in 1usize..5,
        rows in 1usize..5,
        x0 in -100.0f64..100.0,
        y0 in -40.0f64..40.0,
        width in 1.0f64..40.0,
        height in 1.0f64..40.0,
        split in 0.1f64..0.9,
        pop_west in 0.0f64..1.0e6,
        pop_east in 0.0f64..1.0e6,
    ) {
        let engine = EngineTestBuilder::new().build().unwrap();
        let west = width * split;
        let source = Table::from_features(
            Some(Crs::WGS84),
            vec![
                Feature::new(rect(x0, y0, west, height)).with_attribute("pop", pop_west),
                Feature::new(rect(x0 + west, y0, width - west, height)).with_attribute("pop", pop_east),
            ],
        );
        let extent = Rect::new((x0, y0), (x0 + width, y0 + height));
        let source = Layer::from_table("source", source).into_ref();
        let mask = Layer::from_table("mask", grid_mask(extent, cols, rows)).into_ref();
        let weighted = Layer::derived(
            "weighted",
            &source,
            Operator::discretize(&mask).with_hull_clip(false),
        )
        .into_ref();

        let out = weighted.content(&engine).unwrap();
        let mut per_source: BTreeMap<u64, f64> = BTreeMap::new();
        let mut pop = 0.0;
        for row in out.iter() {
            let fid = row.attribute(SOURCE_FID).and_then(|v| v.as_u64()).unwrap();
            let scale = row.attribute(SCALE).and_then(|v| v.as_f64()).unwrap();
            prop_assert!(scale > 0.0 && scale <= 1.0);
            *per_source.entry(fid).or_default() += scale;
            pop += row.attribute("pop").and_then(|v| v.as_f64()).unwrap();
        }
        prop_assert_eq!(per_source.len(), 2);
        for total in per_source.values() {
            prop_assert!((total - 1.0).abs() < 1e-9);
        }
        let expected = pop_west + pop_east;
        prop_assert!((pop - expected).abs() <= 1e-9 * expected.max(1.0));
    }
}

#[test]
fn hull_clip_is_on_by_default() {
    let mask = Layer::from_table("mask", Table::empty()).into_ref();
    let Operator::Discretize { hull_clip, .. } = Operator::discretize(&mask) else {
        unreachable!("discretize constructor");
    };
    assert!(hull_clip);
}
