use std::path::Path;

use gdal::{Dataset, DatasetOptions, GdalOpenFlags};
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};

use crate::error::{Error, Result};
use crate::nodata;

use super::{Corners, RasterBackend};

/// An opened GeoTIFF: the dataset itself, its (inverse) geotransform
/// and a coordinate transform from WGS84 into the dataset's native CRS.
///
/// Grounded on the root crate's `rasterio.rs`/`spatialreference.rs`/
/// `coordinatetransformer.rs` trio: open read-only, build a
/// `CoordTransform` once, and invert the geotransform with the same
/// determinant formula the original interface used.
pub struct GdalHandle {
    dataset: Dataset,
    geo_transform_inv: [f64; 6],
    wgs84_to_native: CoordTransform,
}

#[derive(Default)]
pub struct GdalRasterBackend;

impl GdalRasterBackend {
    pub fn new() -> Self {
        Self
    }

    fn invert_geo_transform(gt: [f64; 6]) -> [f64; 6] {
        let dev = gt[1] * gt[5] - gt[2] * gt[4];
        [
            gt[0],
            gt[5] / dev,
            -gt[2] / dev,
            gt[3],
            -gt[4] / dev,
            gt[1] / dev,
        ]
    }
}


impl RasterBackend for GdalRasterBackend {
    type Handle = GdalHandle;

    fn open(&self, path: &Path) -> Result<Self::Handle> {
        let dataset = Dataset::open_ex(
            path,
            DatasetOptions {
                open_flags: GdalOpenFlags::GDAL_OF_READONLY | GdalOpenFlags::GDAL_OF_RASTER,
                ..Default::default()
            },
        )?;

        let mut native_srs = dataset.spatial_ref()?;
        native_srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        let mut wgs84_srs = SpatialRef::from_epsg(4326)?;
        wgs84_srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        let wgs84_to_native = CoordTransform::new(&wgs84_srs, &native_srs)?;

        let geo_transform_inv = Self::invert_geo_transform(dataset.geo_transform()?);

        Ok(GdalHandle {
            dataset,
            geo_transform_inv,
            wgs84_to_native,
        })
    }

    fn corners(&self, handle: &Self::Handle) -> Corners {
        let gt = handle.dataset.geo_transform().unwrap_or_default();
        let (raster_x, raster_y) = handle.dataset.raster_size();
        let ulx = gt[0];
        let uly = gt[3];
        let lrx = ulx + raster_x as f64 * gt[1];
        let lry = uly + raster_y as f64 * gt[5];

        Corners {
            top_left: (ulx, uly),
            top_right: (lrx, uly),
            bottom_left: (ulx, lry),
            bottom_right: (lrx, lry),
        }
    }

    fn sample(&self, handle: &Self::Handle, lat: f64, lng: f64) -> i32 {
        match self.sample_inner(handle, lat, lng) {
            Ok(v) => v,
            Err(e) => {
                log::debug!("raster sample failed: {e}");
                nodata::NO_DATA
            }
        }
    }
}

impl GdalRasterBackend {
    fn sample_inner(&self, handle: &GdalHandle, lat: f64, lng: f64) -> Result<i32> {
        let mut xs = [lng];
        let mut ys = [lat];
        handle.wgs84_to_native.transform_coords(&mut xs, &mut ys, &mut [0.0])?;
        let (xgeo, ygeo) = (xs[0], ys[0]);

        let gt = &handle.geo_transform_inv;
        let u = xgeo - gt[0];
        let v = ygeo - gt[3];
        // Truncation, not rounding: kept for bit-compatibility with the
        // deployments that depend on the current (slightly biased) pixel
        // selection.
        let xpix = (gt[1] * u + gt[2] * v) as i64;
        let ylin = (gt[4] * u + gt[5] * v) as i64;

        let (width, height) = handle.dataset.raster_size();
        if xpix < 0 || ylin < 0 || xpix >= width as i64 || ylin >= height as i64 {
            return Ok(nodata::NO_DATA);
        }

        let band = handle.dataset.rasterband(1)?;
        let mut buf = [0i64; 1];
        band.read_into_slice::<i64>((xpix as isize, ylin as isize), (1, 1), (1, 1), &mut buf, None)
            .map_err(Error::from)?;

        Ok(nodata::sanitize(buf[0]))
    }
}
