use chrono::Local;

use crate::catalog::{TileCatalog, to_tile_records};
use crate::config::EngineConfig;
use crate::coordinate::Coordinate;
use crate::error::Result;
use crate::index::SpatialIndex;
use crate::lru_cache::TileHandleCache;
use crate::metadata::MetadataRegistry;
use crate::nodata;
use crate::raster::RasterBackend;
use crate::resolver::PriorityResolver;

/// Sentinel returned for "no measurement at this point", mirrored here
/// so callers need not import [`crate::nodata`] directly.
pub const NO_DATA: i32 = nodata::NO_DATA;

/// The assembled engine: spatial index, optional metadata registry and
/// bounded handle cache over one raster backend. One instance per
/// worker; see the crate's concurrency model.
pub struct Engine<B: RasterBackend> {
    config: EngineConfig,
    index: SpatialIndex,
    metadata: Option<MetadataRegistry>,
    cache: TileHandleCache<B>,
}

impl<B: RasterBackend> Engine<B> {
    /// Loads `summary.json` if present (unless
    /// `always_rebuild_summary`), otherwise scans the data root and
    /// persists a fresh one. Priority mode is entered automatically
    /// when any `metadata.json` exists anywhere under the data root;
    /// otherwise the engine falls back to nearest-tile lookups.
    pub fn open(config: EngineConfig, backend: B) -> Result<Self> {
        let entries = if !config.always_rebuild_summary && config.summary_file.exists() {
            log::info!("loading tile summary from {}", config.summary_file.display());
            match TileCatalog::read_summary(&config.summary_file) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!(
                        "summary {} is corrupt ({e}), rebuilding",
                        config.summary_file.display()
                    );
                    let entries = TileCatalog::build(&config.data_folder, &backend)?;
                    TileCatalog::write_summary(&config.summary_file, &entries)?;
                    entries
                }
            }
        } else {
            log::info!("building tile summary for {}", config.data_folder.display());
            let entries = TileCatalog::build(&config.data_folder, &backend)?;
            TileCatalog::write_summary(&config.summary_file, &entries)?;
            entries
        };

        let records = to_tile_records(entries);
        log::info!("indexed {} tiles", records.len());
        let index = SpatialIndex::build(records);

        let metadata = if MetadataRegistry::has_any_metadata(&config.data_folder) {
            log::info!("metadata.json found, running in priority mode");
            Some(MetadataRegistry::build(&config.data_folder))
        } else {
            log::info!("no metadata.json found, running in nearest-tile mode");
            None
        };

        let cache = TileHandleCache::new(backend, config.open_interfaces_size);

        Ok(Self {
            config,
            index,
            metadata,
            cache,
        })
    }

    pub fn has_summary(&self) -> bool {
        self.config.summary_file.exists()
    }

    /// Rescans the data root and overwrites `summary.json`, without
    /// rebuilding the in-memory index — callers that need the new
    /// tiles reflected in lookups must construct a fresh `Engine`.
    pub fn build_summary(&self) -> Result<()> {
        let entries = TileCatalog::build(&self.config.data_folder, self.backend())?;
        TileCatalog::write_summary(&self.config.summary_file, &entries)
    }

    /// Re-reads `summary.json` without touching it or the data root.
    /// Exposed mainly so callers can validate a summary file exists
    /// and parses before committing to it.
    pub fn load_summary(&self) -> Result<()> {
        TileCatalog::read_summary(&self.config.summary_file).map(|_| ())
    }

    /// `true` when a `metadata.json` was found anywhere under the data
    /// root at construction time, i.e. the engine is running in
    /// priority mode rather than nearest-tile mode.
    pub fn is_priority_mode(&self) -> bool {
        self.metadata.is_some()
    }

    /// Samples elevation at `(lat, lng)`, trying candidates best
    /// priority first and falling through on `NO_DATA`. Never returns
    /// an error: an invalid coordinate, an empty index, or every
    /// candidate coming back `NO_DATA` all collapse to [`NO_DATA`].
    pub fn lookup(&self, lat: f64, lng: f64) -> i32 {
        let coord = Coordinate::new(lat, lng);
        if !coord.is_valid() {
            log::warn!("rejected out-of-range coordinate ({lat}, {lng})");
            return NO_DATA;
        }

        match &self.metadata {
            Some(metadata) => self.lookup_priority(coord, metadata),
            None => self.lookup_nearest_mode(coord),
        }
    }

    fn lookup_priority(&self, coord: Coordinate, metadata: &MetadataRegistry) -> i32 {
        let candidates = self.index.intersection(coord);
        if candidates.is_empty() {
            log::debug!("no tile covers ({}, {})", coord.lat, coord.lng);
            return NO_DATA;
        }

        if candidates.len() == 1 {
            return self.sample_tile(&candidates[0], coord);
        }

        let today = Local::now().date_naive();
        let ranked = PriorityResolver::resolve(candidates, metadata, today);

        for (tile, priority) in &ranked {
            log::debug!(
                "trying tile {} (final_priority={}, resolution={})",
                tile.path.display(),
                priority.final_priority,
                priority.resolution
            );
            let elevation = self.sample_tile(tile, coord);
            if elevation != NO_DATA {
                return elevation;
            }
        }

        NO_DATA
    }

    /// Non-priority variant: no `metadata.json` anywhere, so there is
    /// nothing to rank. Degenerates to the single nearest tile overall,
    /// sampled directly, matching `GDALTileInterface.lookup`.
    fn lookup_nearest_mode(&self, coord: Coordinate) -> i32 {
        match self.index.nearest(coord) {
            Some(tile) => self.sample_tile(&tile, coord),
            None => NO_DATA,
        }
    }

    fn sample_tile(&self, tile: &crate::catalog::TileRecord, coord: Coordinate) -> i32 {
        let backend = self.backend();
        self.cache
            .with_handle(&tile.path, |handle| backend.sample(handle, coord.lat, coord.lng))
            .unwrap_or(NO_DATA)
    }

    fn backend(&self) -> &B {
        self.cache.backend()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Corners, FakeRasterBackend, FakeTile};

    fn corners(lat_min: f64, lat_max: f64, lng_min: f64, lng_max: f64) -> Corners {
        Corners {
            top_left: (lng_min, lat_max),
            top_right: (lng_max, lat_max),
            bottom_left: (lng_min, lat_min),
            bottom_right: (lng_max, lat_min),
        }
    }

    fn write_tif(path: &std::path::Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"fake").unwrap();
    }

    #[test]
    fn single_candidate_short_circuits_straight_to_sample() {
        let root = tempfile::tempdir().unwrap();
        let tile_path = root.path().join("a/tile.tif");
        write_tif(&tile_path);

        let mut backend = FakeRasterBackend::new();
        backend.add_tile(
            tile_path.clone(),
            FakeTile::new(corners(0.0, 1.0, 0.0, 1.0)).with_cell(0.5, 0.5, 120),
        );

        let mut config = EngineConfig::new(root.path());
        config.always_rebuild_summary = true;
        let engine = Engine::open(config, backend).unwrap();

        assert_eq!(engine.lookup(0.5, 0.5), 120);
    }

    #[test]
    fn falls_through_no_data_tile_to_lower_priority_tile() {
        let root = tempfile::tempdir().unwrap();
        let high = root.path().join("high/tile.tif");
        let low = root.path().join("low/tile.tif");
        write_tif(&high);
        write_tif(&low);
        std::fs::write(root.path().join("high/metadata.json"), r#"{"priority":1}"#).unwrap();
        std::fs::write(root.path().join("low/metadata.json"), r#"{"priority":1000}"#).unwrap();

        let mut backend = FakeRasterBackend::new();
        backend.add_tile(high.clone(), FakeTile::new(corners(0.0, 1.0, 0.0, 1.0)));
        backend.add_tile(low.clone(), FakeTile::new(corners(0.0, 1.0, 0.0, 1.0)).with_cell(0.5, 0.5, 42));

        let mut config = EngineConfig::new(root.path());
        config.always_rebuild_summary = true;
        let engine = Engine::open(config, backend).unwrap();

        assert!(engine.is_priority_mode());
        assert_eq!(engine.lookup(0.5, 0.5), 42);
    }

    #[test]
    fn out_of_range_coordinate_returns_no_data_without_touching_index() {
        let root = tempfile::tempdir().unwrap();
        let backend = FakeRasterBackend::new();
        let mut config = EngineConfig::new(root.path());
        config.always_rebuild_summary = true;
        let engine = Engine::open(config, backend).unwrap();

        assert_eq!(engine.lookup(500.0, 0.0), NO_DATA);
    }

    #[test]
    fn empty_data_root_returns_no_data() {
        let root = tempfile::tempdir().unwrap();
        let backend = FakeRasterBackend::new();
        let mut config = EngineConfig::new(root.path());
        config.always_rebuild_summary = true;
        let engine = Engine::open(config, backend).unwrap();

        assert!(!engine.is_priority_mode());
        assert_eq!(engine.lookup(0.0, 0.0), NO_DATA);
    }

    #[test]
    fn non_priority_mode_samples_nearest_tile_outside_any_footprint() {
        let root = tempfile::tempdir().unwrap();
        let tile_path = root.path().join("only/tile.tif");
        write_tif(&tile_path);

        let mut backend = FakeRasterBackend::new();
        backend.add_tile(
            tile_path.clone(),
            FakeTile::new(corners(10.0, 11.0, 10.0, 11.0)).with_cell(10.5, 10.5, 7),
        );

        let mut config = EngineConfig::new(root.path());
        config.always_rebuild_summary = true;
        let engine = Engine::open(config, backend).unwrap();

        assert!(!engine.is_priority_mode());
        assert_eq!(engine.lookup(50.0, 50.0), 7);
    }

    #[test]
    fn non_priority_mode_never_scans_intersecting_footprints_only_nearest() {
        // The spec's degenerate non-priority path is nearest-tile-only, not
        // an intersection scan with a nearest fallback: the `far` tile
        // registers a cell at the query point too, so this would pass for
        // the wrong reason if `lookup_nearest_mode` ever intersected first.
        let root = tempfile::tempdir().unwrap();
        let near = root.path().join("near/tile.tif");
        let far = root.path().join("far/tile.tif");
        write_tif(&near);
        write_tif(&far);

        let mut backend = FakeRasterBackend::new();
        backend.add_tile(
            near.clone(),
            FakeTile::new(corners(0.4, 0.6, 0.4, 0.6)).with_cell(0.5, 0.5, 11),
        );
        backend.add_tile(
            far.clone(),
            FakeTile::new(corners(5.0, 6.0, 5.0, 6.0)).with_cell(0.5, 0.5, 22),
        );

        let mut config = EngineConfig::new(root.path());
        config.always_rebuild_summary = true;
        let engine = Engine::open(config, backend).unwrap();

        assert!(!engine.is_priority_mode());
        assert_eq!(engine.lookup(0.5, 0.5), 11);
    }

    #[test]
    fn corrupt_summary_triggers_a_rebuild_instead_of_failing_to_open() {
        let root = tempfile::tempdir().unwrap();
        let tile_path = root.path().join("a/tile.tif");
        write_tif(&tile_path);
        std::fs::write(root.path().join("summary.json"), b"{ not valid json").unwrap();

        let mut backend = FakeRasterBackend::new();
        backend.add_tile(
            tile_path.clone(),
            FakeTile::new(corners(0.0, 1.0, 0.0, 1.0)).with_cell(0.5, 0.5, 55),
        );

        let config = EngineConfig::new(root.path());
        let engine = Engine::open(config, backend).expect("corrupt summary should be rebuilt, not fatal");

        assert_eq!(engine.lookup(0.5, 0.5), 55);
    }
}
