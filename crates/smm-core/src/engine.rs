// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Evaluation context handed to every layer access.

use smm_table::{FormatRegistry, Table};

use crate::kernel::{GeoKernel, SpatialKernel};
use crate::settings::EngineSettings;
use crate::workdir::{Scratch, WorkDir};
use crate::GraphError;

/// Formats, kernel, settings and scratch space used while evaluating layers.
///
/// The scratch directory lives as long as the engine.
#[derive(Debug)]
pub struct Engine {
    formats: FormatRegistry,
    kernel: Box<dyn SpatialKernel>,
    settings: EngineSettings,
    work_dir: WorkDir,
}

impl Engine {
    /// Engine with the built-in formats, [`GeoKernel`] and `settings`.
    pub fn new(settings: EngineSettings) -> Result<Self, GraphError> {
        let work_dir = WorkDir::new(settings.scratch_root.as_deref())?;
        Ok(Self {
            formats: FormatRegistry::default(),
            kernel: Box::new(GeoKernel),
            settings,
            work_dir,
        })
    }

    /// Engine with default settings.
    pub fn with_defaults() -> Result<Self, GraphError> {
        Self::new(EngineSettings::default())
    }

    /// Replace the spatial kernel.
    pub fn with_kernel(mut self, kernel: impl SpatialKernel + 'static) -> Self {
        self.kernel = Box::new(kernel);
        self
    }

    /// Replace the format registry.
    pub fn with_formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = formats;
        self
    }

    /// Registered file formats.
    pub fn formats(&self) -> &FormatRegistry {
        &self.formats
    }

    /// Mutable access, e.g. to register another format.
    pub fn formats_mut(&mut self) -> &mut FormatRegistry {
        &mut self.formats
    }

    /// The spatial kernel.
    pub fn kernel(&self) -> &dyn SpatialKernel {
        self.kernel.as_ref()
    }

    /// Active settings.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// The scratch directory.
    pub fn work_dir(&self) -> &WorkDir {
        &self.work_dir
    }

    /// Scratch handle for kernel calls.
    pub fn scratch(&self) -> Scratch<'_> {
        Scratch::new(&self.work_dir, self.settings.stage_intermediates)
    }

    /// Project `primary` and `secondary` to the working CRS: the configured
    /// one, else `primary`'s. Untagged tables are assumed to be in it already.
    pub fn align(&self, primary: &Table, secondary: &Table) -> Result<(Table, Table), GraphError> {
        match self.settings.working_crs.or_else(|| primary.crs()) {
            Some(target) => Ok((primary.to_crs(target)?, secondary.to_crs(target)?)),
            None => Ok((primary.clone(), secondary.clone())),
        }
    }
}
