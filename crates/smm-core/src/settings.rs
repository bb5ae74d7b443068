// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Engine settings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use smm_table::Crs;

use crate::config::{ConfigError, ConfigService, ConfigStore};

/// Key under which [`EngineSettings`] are stored.
pub const SETTINGS_KEY: &str = "engine";

/// Tunables for an [`Engine`](crate::Engine).
///
/// Missing fields fall back to their defaults, so older settings blobs keep
/// loading after new fields are added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// CRS both inputs of an overlay are projected to. `None` uses the CRS of
    /// the operator's origin table.
    pub working_crs: Option<Crs>,
    /// Directory under which the engine's scratch directory is created.
    /// `None` uses the system temp directory.
    pub scratch_root: Option<PathBuf>,
    /// Write every operator result to the scratch directory as GeoJSON.
    pub stage_intermediates: bool,
}

impl EngineSettings {
    /// Load settings from `service`, or defaults if nothing is stored yet.
    pub fn load_or_default<S: ConfigStore>(service: &ConfigService<S>) -> Result<Self, ConfigError> {
        service.load_or_default(SETTINGS_KEY)
    }

    /// Store these settings through `service`.
    pub fn save<S: ConfigStore>(&self, service: &ConfigService<S>) -> Result<(), ConfigError> {
        service.save(SETTINGS_KEY, self)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn partial_blobs_fill_in_defaults() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{ "working_crs": "EPSG:3857" }"#).unwrap();
        assert_eq!(settings.working_crs, Some(Crs::WEB_MERCATOR));
        assert!(settings.scratch_root.is_none());
        assert!(!settings.stage_intermediates);
    }
}
