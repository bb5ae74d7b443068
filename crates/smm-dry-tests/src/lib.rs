// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for smm crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake
//! - [`engine`] - Engine builder for tests
//! - [`fixtures`] - Small geometric tables and GeoJSON helpers
//! - [`kernel`] - Spatial kernel that counts calls

pub mod config;
pub mod engine;
pub mod fixtures;
pub mod kernel;

pub use config::InMemoryConfigStore;
pub use engine::EngineTestBuilder;
pub use fixtures::{grid_mask, numbered_points, rect, two_squares, write_table};
pub use kernel::CountingKernel;
