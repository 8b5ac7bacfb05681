use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::coordinate::Footprint;
use crate::error::Result;
use crate::raster::RasterBackend;

/// One raster tile, as tracked internally by the index and resolver.
/// `index_id` is assigned at index build time and is stable only
/// within one running index instance.
#[derive(Debug, Clone)]
pub struct TileRecord {
    pub path: PathBuf,
    pub source_dir: PathBuf,
    pub footprint: Footprint,
    pub index_id: u32,
}

/// The on-disk summary JSON record for one tile: footprint and path
/// only. Priority/resolution/date are deliberately not baked in here,
/// so editing `metadata.json` files takes effect without rescanning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileSummaryEntry {
    pub file: PathBuf,
    /// `(latMin, latMax, lngMin, lngMax)`.
    pub coords: (f64, f64, f64, f64),
    pub source_dir: PathBuf,
    /// Extra fields written by older or newer summary formats are
    /// accepted and ignored, per the tolerant-reader contract in the
    /// external interfaces section.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Scans the data root for `.tif` tiles and (de)serialises the
/// resulting footprints to `summary.json`.
pub struct TileCatalog;

impl TileCatalog {
    /// Recursively walks `data_root` (following symlinks), opening
    /// each `.tif` file once through `backend` to read its corners.
    /// A tile that fails to open is a fatal error for catalog
    /// construction, unlike at lookup time where a failing tile is
    /// just skipped.
    pub fn build<B: RasterBackend>(data_root: &Path, backend: &B) -> Result<Vec<TileSummaryEntry>> {
        let mut entries = Vec::new();

        for entry in WalkDir::new(data_root).follow_links(true) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("tif") {
                continue;
            }

            log::info!("scanning tile {}", path.display());
            let handle = backend.open(path)?;
            let corners = backend.corners(&handle);
            backend.close(handle);

            let lat_min = corners.bottom_right.1;
            let lat_max = corners.top_right.1;
            let lng_min = corners.top_left.0;
            let lng_max = corners.top_right.0;

            let source_dir = path.parent().unwrap_or(data_root).to_path_buf();
            entries.push(TileSummaryEntry {
                file: path.to_path_buf(),
                coords: (lat_min, lat_max, lng_min, lng_max),
                source_dir,
                extra: serde_json::Map::new(),
            });
        }

        Ok(entries)
    }

    pub fn write_summary(summary_file: &Path, entries: &[TileSummaryEntry]) -> Result<()> {
        let file = std::fs::File::create(summary_file)?;
        serde_json::to_writer(file, entries)?;
        Ok(())
    }

    pub fn read_summary(summary_file: &Path) -> Result<Vec<TileSummaryEntry>> {
        let file = std::fs::File::open(summary_file)?;
        Ok(serde_json::from_reader(file)?)
    }
}

pub fn to_tile_records(entries: Vec<TileSummaryEntry>) -> Vec<TileRecord> {
    entries
        .into_iter()
        .enumerate()
        .map(|(i, e)| TileRecord {
            path: e.file,
            source_dir: e.source_dir,
            footprint: Footprint::new(e.coords.0, e.coords.1, e.coords.2, e.coords.3),
            index_id: (i + 1) as u32,
        })
        .collect()
}
