use std::sync::Arc;

use chrono::NaiveDate;

use crate::catalog::TileRecord;
use crate::metadata::MetadataRegistry;

/// A candidate's resolved priority, computed fresh for every query.
/// Deliberately not stored on [`TileRecord`]: the shared index payload
/// must never be mutated by a resolve pass, since two concurrent
/// lookups resolving the same tiles would otherwise race on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CandidatePriority {
    pub final_priority: i64,
    pub resolution: i64,
}

pub struct PriorityResolver;

impl PriorityResolver {
    /// Ranks `candidates` by effective priority, best first: ascending
    /// `final_priority`, ties broken by ascending `resolution` (finer
    /// pixel size wins).
    pub fn resolve(
        candidates: Vec<Arc<TileRecord>>,
        metadata: &MetadataRegistry,
        today: NaiveDate,
    ) -> Vec<(Arc<TileRecord>, CandidatePriority)> {
        let mut ranked: Vec<(Arc<TileRecord>, CandidatePriority)> = candidates
            .into_iter()
            .map(|tile| {
                let effective = metadata.metadata_for(&tile.path);
                let priority = CandidatePriority {
                    final_priority: effective.final_priority(today),
                    resolution: effective.resolution,
                };
                (tile, priority)
            })
            .collect();

        ranked.sort_by(|a, b| a.1.cmp(&b.1));
        ranked
    }
}
