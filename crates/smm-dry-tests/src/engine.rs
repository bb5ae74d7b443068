// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine builder for tests.

use std::path::PathBuf;

use smm_core::{Engine, EngineSettings, GraphError};
use smm_table::Crs;

use crate::CountingKernel;

/// Builder for engines with test-friendly settings.
///
/// # Example
///
/// ```
/// use smm_dry_tests::{CountingKernel, EngineTestBuilder};
///
/// let kernel = CountingKernel::new();
/// let engine = EngineTestBuilder::new()
///     .with_kernel(kernel.clone())
///     .build()
///     .unwrap();
/// assert_eq!(kernel.total_calls(), 0);
/// # drop(engine);
/// ```
#[derive(Debug, Default)]
pub struct EngineTestBuilder {
    settings: EngineSettings,
    kernel: Option<CountingKernel>,
}

impl EngineTestBuilder {
    /// Default settings, default kernel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Project overlay inputs to `crs`.
    pub fn with_working_crs(mut self, crs: Crs) -> Self {
        self.settings.working_crs = Some(crs);
        self
    }

    /// Create the scratch directory under `root`.
    pub fn with_scratch_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.settings.scratch_root = Some(root.into());
        self
    }

    /// Stage every operator result in the scratch directory.
    pub fn staging(mut self, enabled: bool) -> Self {
        self.settings.stage_intermediates = enabled;
        self
    }

    /// Use `kernel` instead of the default one.
    pub fn with_kernel(mut self, kernel: CountingKernel) -> Self {
        self.kernel = Some(kernel);
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<Engine, GraphError> {
        let engine = Engine::new(self.settings)?;
        Ok(match self.kernel {
            Some(kernel) => engine.with_kernel(kernel),
            None => engine,
        })
    }
}
