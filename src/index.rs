use std::sync::Arc;

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use crate::catalog::TileRecord;
use crate::coordinate::Coordinate;

/// Point padding applied around a query before intersecting the index,
/// to catch tiles whose footprint exactly touches the query point
/// under R-tree edge semantics. About 10 metres.
pub const QUERY_EPSILON_DEGREES: f64 = 0.0001;

/// An R-tree entry. The envelope is built in `(lat, lng)` order — *not*
/// the more conventional `(x = lng, y = lat)` — and every insertion and
/// query goes through this one type so the convention cannot drift.
#[derive(Debug, Clone)]
struct IndexedTile(Arc<TileRecord>);

impl RTreeObject for IndexedTile {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let f = &self.0.footprint;
        AABB::from_corners([f.lat_min, f.lng_min], [f.lat_max, f.lng_max])
    }
}

impl PointDistance for IndexedTile {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        self.envelope().distance_2(point)
    }
}

/// An R-tree of tile footprints, keyed by geographic bounding box in
/// `(lat, lng)` order.
pub struct SpatialIndex {
    tree: RTree<IndexedTile>,
}

impl SpatialIndex {
    pub fn build(records: Vec<TileRecord>) -> Self {
        let entries = records.into_iter().map(|r| IndexedTile(Arc::new(r))).collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    /// All tiles whose footprint intersects the ε-padded box around
    /// `coord`.
    pub fn intersection(&self, coord: Coordinate) -> Vec<Arc<TileRecord>> {
        let query = AABB::from_corners(
            [coord.lat - QUERY_EPSILON_DEGREES, coord.lng - QUERY_EPSILON_DEGREES],
            [coord.lat + QUERY_EPSILON_DEGREES, coord.lng + QUERY_EPSILON_DEGREES],
        );

        self.tree
            .locate_in_envelope_intersecting(&query)
            .map(|t| t.0.clone())
            .collect()
    }

    /// The single nearest tile to `coord`, used by the non-priority
    /// lookup variant.
    pub fn nearest(&self, coord: Coordinate) -> Option<Arc<TileRecord>> {
        self.tree.nearest_neighbor(&[coord.lat, coord.lng]).map(|t| t.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::Footprint;

    fn record(id: u32, lat_min: f64, lat_max: f64, lng_min: f64, lng_max: f64) -> TileRecord {
        TileRecord {
            path: format!("/tiles/{id}.tif").into(),
            source_dir: "/tiles".into(),
            footprint: Footprint::new(lat_min, lat_max, lng_min, lng_max),
            index_id: id,
        }
    }

    #[test]
    fn intersection_respects_lat_lng_axis_order() {
        // A footprint that only makes sense if axes are (lat, lng): it
        // would not contain (0.5, 40.0) if the axes were swapped to (x, y).
        let index = SpatialIndex::build(vec![record(1, 0.0, 1.0, 39.0, 41.0)]);
        let hits = index.intersection(Coordinate::new(0.5, 40.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].index_id, 1);
    }

    #[test]
    fn intersection_is_empty_far_from_any_tile() {
        let index = SpatialIndex::build(vec![record(1, 34.0, 35.0, -119.0, -118.0)]);
        assert!(index.intersection(Coordinate::new(0.0, 0.0)).is_empty());
    }

    #[test]
    fn epsilon_padding_catches_edge_touching_tiles() {
        let index = SpatialIndex::build(vec![record(1, 34.0, 35.0, -119.0, -118.0)]);
        // Exactly on the edge.
        let hits = index.intersection(Coordinate::new(35.0, -118.0));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn nearest_returns_closest_tile_when_no_exact_hit() {
        let index = SpatialIndex::build(vec![
            record(1, 10.0, 11.0, 10.0, 11.0),
            record(2, 40.0, 41.0, 40.0, 41.0),
        ]);
        let nearest = index.nearest(Coordinate::new(39.5, 39.5)).unwrap();
        assert_eq!(nearest.index_id, 2);
    }
}
