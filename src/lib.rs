//! A multi-source tiled elevation engine.
//!
//! Given a WGS84 `(lat, lng)`, returns the terrain elevation in metres
//! from a library of pre-ingested raster tiles, preferring the
//! highest-priority source that actually has data at the point and
//! falling through to lower-priority tiles on no-data.
//!
//! This crate has no HTTP façade, no configuration loader and no
//! logger of its own — it is a library meant to be embedded. See
//! [`Engine`] for the entry point and [`EngineConfig`] for how it is
//! constructed.

pub mod catalog;
pub mod config;
pub mod coordinate;
pub mod engine;
pub mod error;
pub mod index;
pub mod lru_cache;
pub mod metadata;
pub mod nodata;
pub mod raster;
pub mod resolver;

pub use config::EngineConfig;
pub use coordinate::Coordinate;
pub use engine::{Engine, NO_DATA};
pub use error::{Error, Result};
pub use raster::RasterBackend;

#[cfg(feature = "gdal")]
pub use raster::GdalRasterBackend;

#[cfg(feature = "test-util")]
pub use raster::FakeRasterBackend;
