// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Spatial kernel that delegates to [`GeoKernel`] and counts calls.

use std::sync::{Arc, Mutex, MutexGuard};

use smm_core::{GeoKernel, GraphError, GridSpec, Scratch, SpatialKernel};
use smm_table::Table;

/// Counting wrapper around [`GeoKernel`].
///
/// Clones share their counters, so a test can keep one clone and hand the
/// other to an engine.
#[derive(Debug, Clone, Default)]
pub struct CountingKernel {
    calls: Arc<Mutex<Calls>>,
}

#[derive(Debug, Default)]
struct Calls {
    discretize: usize,
    tesselate: usize,
    join: usize,
}

impl CountingKernel {
    /// Fresh counters.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Calls> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Discretize calls so far.
    pub fn discretize_calls(&self) -> usize {
        self.lock().discretize
    }

    /// Tesselate calls so far.
    pub fn tesselate_calls(&self) -> usize {
        self.lock().tesselate
    }

    /// Join calls so far.
    pub fn join_calls(&self) -> usize {
        self.lock().join
    }

    /// All calls so far.
    pub fn total_calls(&self) -> usize {
        let calls = self.lock();
        calls.discretize + calls.tesselate + calls.join
    }
}

impl SpatialKernel for CountingKernel {
    fn discretize(
        &self,
        source: &Table,
        mask: &Table,
        hull_clip: bool,
        scratch: &Scratch<'_>,
    ) -> Result<Table, GraphError> {
        self.lock().discretize += 1;
        GeoKernel.discretize(source, mask, hull_clip, scratch)
    }

    fn tesselate(
        &self,
        source: &Table,
        grid: GridSpec,
        scratch: &Scratch<'_>,
    ) -> Result<Table, GraphError> {
        self.lock().tesselate += 1;
        GeoKernel.tesselate(source, grid, scratch)
    }

    fn join(&self, base: &Table, other: &Table, scratch: &Scratch<'_>) -> Result<Table, GraphError> {
        self.lock().join += 1;
        GeoKernel.join(base, other, scratch)
    }
}
