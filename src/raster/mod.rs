//! The raster backend boundary.
//!
//! The engine never hard-codes a specific raster decoding library: any
//! type that can open a file, report its corner coordinates and sample
//! a nearest-cell elevation suffices. [`GdalRasterBackend`] is the
//! shipped implementation; tests substitute [`FakeRasterBackend`]
//! (feature `test-util`) so the suite does not need real GeoTIFFs.

#[cfg(feature = "gdal")]
mod gdal_backend;
#[cfg(feature = "gdal")]
pub use gdal_backend::GdalRasterBackend;

#[cfg(feature = "test-util")]
mod fake;
#[cfg(feature = "test-util")]
pub use fake::{FakeRasterBackend, FakeTile};

use std::path::Path;

use crate::error::Result;

/// The four corners of a raster, in the raster's native CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corners {
    pub top_left: (f64, f64),
    pub top_right: (f64, f64),
    pub bottom_left: (f64, f64),
    pub bottom_right: (f64, f64),
}

/// Narrow interface the core depends on to open a raster, read its
/// corner coordinates and sample a nearest-cell elevation at a WGS84
/// point. `sample` never returns an error: any internal failure
/// (projection, out-of-bounds pixel, I/O) is mapped to `NO_DATA`, per
/// the propagation policy in the error handling design.
pub trait RasterBackend {
    type Handle;

    fn open(&self, path: &Path) -> Result<Self::Handle>;
    fn corners(&self, handle: &Self::Handle) -> Corners;
    fn sample(&self, handle: &Self::Handle, lat: f64, lng: f64) -> i32;
    fn close(&self, handle: Self::Handle) {
        drop(handle);
    }
}
