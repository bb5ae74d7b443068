// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::PathBuf;
use std::rc::Rc;

use smm_core::{Category, GraphDocument, GraphError, Layer, LayerGraph, Operator};
use smm_dry_tests::{two_squares, write_table, EngineTestBuilder};

#[test]
fn references_resolve_to_shared_handles_after_reload() {
    let dir = tempfile::tempdir().unwrap();
    let engine = EngineTestBuilder::new().build().unwrap();
    write_table(&dir.path().join("squares.geojson"), &two_squares()).unwrap();
    let doc_path = dir.path().join("graph.ymlsmm");

    let mut graph = LayerGraph::open(&doc_path).unwrap();
    assert!(graph.is_empty());
    let a = Layer::from_file("A", "squares.geojson")
        .with_category(Category::Places)
        .into_ref();
    let b = Layer::derived("B", &a, Operator::tesselate("h3", 2).unwrap()).into_ref();
    graph.add_as(&b, None, true).unwrap();
    graph.set_author("survey team");
    graph.save(&engine).unwrap();

    let reloaded = LayerGraph::open(&doc_path).unwrap();
    let a2 = reloaded.get("A").unwrap();
    let b2 = reloaded.get("B").unwrap();
    assert!(Rc::ptr_eq(b2.origin().unwrap(), a2));
    assert_eq!(b2.category(), Some(Category::Places));
    assert_eq!(b2.operator(), Some(&Operator::tesselate("h3", 2).unwrap()));
    assert!(a2.path_is_relative());
    assert_eq!(a2.path(), Some(PathBuf::from("squares.geojson")));
    assert_eq!(reloaded.content("A", &engine).unwrap().len(), 2);
    assert_eq!(reloaded.author(), "survey team");
    assert_eq!(reloaded.version(), 1);

    // the live graph serializes back to exactly what is on disk
    assert_eq!(
        reloaded.to_document().unwrap(),
        GraphDocument::read(&doc_path).unwrap()
    );
}

#[test]
fn every_save_bumps_the_version_once() {
    let dir = tempfile::tempdir().unwrap();
    let engine = EngineTestBuilder::new().build().unwrap();
    let mut graph = LayerGraph::with_root(dir.path());
    graph
        .add(&Layer::from_table("squares", two_squares()).into_ref())
        .unwrap();
    graph.save_as(dir.path().join("g.ymlsmm"), &engine).unwrap();

    let mut stamps = vec![graph.last_update().unwrap()];
    for expected in 2..=4 {
        graph.save(&engine).unwrap();
        assert_eq!(graph.version(), expected);
        stamps.push(graph.last_update().unwrap());
    }
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    let on_disk = GraphDocument::read(graph.path().unwrap()).unwrap();
    assert_eq!(on_disk.version, 4);
    assert_eq!(on_disk.last_update, graph.last_update());
}

#[test]
fn failed_writes_leave_the_version_alone() {
    let dir = tempfile::tempdir().unwrap();
    let engine = EngineTestBuilder::new().build().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, b"x").unwrap();

    let mut graph = LayerGraph::with_root(dir.path());
    let err = graph
        .save_as(blocker.join("g.ymlsmm"), &engine)
        .unwrap_err();
    assert!(matches!(err, GraphError::Io { .. }));
    assert_eq!(graph.version(), 0);
    assert!(graph.last_update().is_none());
    assert!(graph.path().is_none());
}

#[test]
fn missing_documents_start_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.ymlsmm");
    let graph = LayerGraph::open(&path).unwrap();
    assert!(graph.is_empty());
    assert_eq!(graph.version(), 0);
    assert_eq!(graph.root(), dir.path());
    assert!(!path.exists());
}

#[test]
fn missing_layer_files_read_as_empty_tables() {
    let dir = tempfile::tempdir().unwrap();
    let engine = EngineTestBuilder::new().build().unwrap();
    let layer = Layer::from_file("later", dir.path().join("later.geojson")).into_ref();
    assert!(layer.content(&engine).unwrap().is_empty());
}

#[test]
fn unknown_references_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ymlsmm");
    fs::write(
        &path,
        "layers:\n  b:\n    mode: DataLayer\n    name: b\n    origin: ghost\n    operator:\n      type: tesselate\n      mask: h3\n      resolution: 4\n",
    )
    .unwrap();
    let err = LayerGraph::open(&path).unwrap_err();
    assert!(matches!(
        err,
        GraphError::ReferenceNotFound { ref layer, ref reference } if layer == "b" && reference == "ghost"
    ));
}

#[test]
fn cyclic_documents_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cycle.ymlsmm");
    fs::write(
        &path,
        r"
layers:
  a:
    mode: DataLayer
    name: a
    origin: b
    operator: { type: tesselate, mask: s2, resolution: 2 }
  b:
    mode: DataLayer
    name: b
    origin: a
    operator: { type: tesselate, mask: s2, resolution: 2 }
",
    )
    .unwrap();
    let err = LayerGraph::open(&path).unwrap_err();
    assert!(matches!(err, GraphError::Cycle(ref p) if p == "a -> b -> a"));
}

#[test]
fn discretize_round_trips_mask_and_hull_clip() {
    let dir = tempfile::tempdir().unwrap();
    let engine = EngineTestBuilder::new().build().unwrap();
    let source = Layer::from_table("source", two_squares()).into_ref();
    let mask = Layer::from_table("mask", two_squares()).into_ref();
    let weighted = Layer::derived(
        "weighted",
        &source,
        Operator::discretize(&mask).with_hull_clip(false),
    )
    .into_ref();

    let mut graph = LayerGraph::with_root(dir.path());
    graph.add(&weighted).unwrap();
    graph.save_as(dir.path().join("g.ymlsmm"), &engine).unwrap();

    let reloaded = LayerGraph::open(dir.path().join("g.ymlsmm")).unwrap();
    let op = reloaded.get("weighted").unwrap().operator().unwrap().clone();
    let Operator::Discretize { mask, hull_clip } = op else {
        unreachable!("operator kind survives the round trip");
    };
    assert!(!hull_clip);
    assert!(Rc::ptr_eq(&mask, reloaded.get("mask").unwrap()));
}
