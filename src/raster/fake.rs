use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use super::{Corners, RasterBackend};

/// A raster backend test double keyed by path, returning a caller
/// supplied elevation grid instead of touching GDAL. Used by the unit
/// and integration test suites; not part of the crate's public API in
/// non-test builds (only compiled under the `test-util` feature).
#[derive(Default)]
pub struct FakeRasterBackend {
    tiles: HashMap<PathBuf, FakeTile>,
}

pub struct FakeTile {
    pub corners: Corners,
    /// `(lat, lng) -> raw raster value`, looked up by rounding to the
    /// nearest hundredth of a degree so tests can place a handful of
    /// sample points rather than a full grid.
    pub cells: HashMap<(i64, i64), i64>,
}

impl FakeTile {
    pub fn new(corners: Corners) -> Self {
        Self {
            corners,
            cells: HashMap::new(),
        }
    }

    pub fn with_cell(mut self, lat: f64, lng: f64, raw_value: i64) -> Self {
        self.cells.insert(FakeRasterBackend::key(lat, lng), raw_value);
        self
    }
}

impl FakeRasterBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tile(&mut self, path: impl Into<PathBuf>, tile: FakeTile) {
        self.tiles.insert(path.into(), tile);
    }

    fn key(lat: f64, lng: f64) -> (i64, i64) {
        ((lat * 100.0).round() as i64, (lng * 100.0).round() as i64)
    }
}

impl RasterBackend for FakeRasterBackend {
    type Handle = PathBuf;

    fn open(&self, path: &Path) -> Result<Self::Handle> {
        if self.tiles.contains_key(path) {
            Ok(path.to_path_buf())
        } else {
            Err(Error::InvalidArgument(format!("no fake tile registered for {}", path.display())))
        }
    }

    fn corners(&self, handle: &Self::Handle) -> Corners {
        self.tiles[handle].corners
    }

    fn sample(&self, handle: &Self::Handle, lat: f64, lng: f64) -> i32 {
        let tile = &self.tiles[handle];
        match tile.cells.get(&Self::key(lat, lng)) {
            Some(raw) => crate::nodata::sanitize(*raw),
            None => crate::nodata::NO_DATA,
        }
    }
}
