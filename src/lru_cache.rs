use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use lru::LruCache;

use crate::raster::RasterBackend;

/// A bounded cache of open raster handles, keyed by tile path.
///
/// Strict LRU: the most recently requested path is always the
/// "newest" entry; once the cache holds more than its capacity, the
/// least-recently-requested handle is evicted and closed synchronously.
/// Guarded by a mutex since lookups from concurrent in-flight requests
/// may interleave within one worker (the Python original relied on the
/// GIL for this; a correct Rust port must guard explicitly).
pub struct TileHandleCache<B: RasterBackend> {
    backend: B,
    inner: Mutex<LruCache<PathBuf, B::Handle>>,
}

impl<B: RasterBackend> TileHandleCache<B> {
    pub fn new(backend: B, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self {
            backend,
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Returns `true` if opening the tile succeeded, running `f` against
    /// the handle while the cache lock is held. The lock scope matches
    /// the original's "promote on hit, open-and-maybe-evict on miss" as
    /// one atomic step.
    pub fn with_handle<R>(&self, path: &Path, f: impl FnOnce(&B::Handle) -> R) -> Option<R> {
        let mut cache = self.inner.lock().expect("tile handle cache lock poisoned");

        if let Some(handle) = cache.get(path) {
            return Some(f(handle));
        }

        let handle = match self.backend.open(path) {
            Ok(h) => h,
            Err(e) => {
                log::warn!("failed to open tile {}: {e}", path.display());
                return None;
            }
        };

        if let Some((evicted_path, evicted_handle)) = cache.push(path.to_path_buf(), handle) {
            if evicted_path != path {
                log::debug!("evicting tile handle cache entry {}", evicted_path.display());
                self.backend.close(evicted_handle);
            }
        }

        let handle = cache.get(path).expect("just inserted");
        Some(f(handle))
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("tile handle cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn close_all(&self) {
        let mut cache = self.inner.lock().expect("tile handle cache lock poisoned");
        while let Some((_, handle)) = cache.pop_lru() {
            self.backend.close(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Corners, FakeRasterBackend, FakeTile};

    fn corners() -> Corners {
        Corners {
            top_left: (0.0, 1.0),
            top_right: (1.0, 1.0),
            bottom_left: (0.0, 0.0),
            bottom_right: (1.0, 0.0),
        }
    }

    #[test]
    fn cache_never_exceeds_capacity() {
        let mut backend = FakeRasterBackend::new();
        for i in 0..5 {
            backend.add_tile(format!("/tiles/{i}.tif"), FakeTile::new(corners()));
        }
        let cache = TileHandleCache::new(backend, 2);

        for i in 0..5 {
            let path = PathBuf::from(format!("/tiles/{i}.tif"));
            cache.with_handle(&path, |_| ()).expect("tile exists");
            assert!(cache.len() <= 2);
        }
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn most_recently_used_survives_eviction() {
        let mut backend = FakeRasterBackend::new();
        backend.add_tile("/tiles/a.tif", FakeTile::new(corners()));
        backend.add_tile("/tiles/b.tif", FakeTile::new(corners()));
        backend.add_tile("/tiles/c.tif", FakeTile::new(corners()));
        let cache = TileHandleCache::new(backend, 2);

        let a = PathBuf::from("/tiles/a.tif");
        let b = PathBuf::from("/tiles/b.tif");
        let c = PathBuf::from("/tiles/c.tif");

        cache.with_handle(&a, |_| ());
        cache.with_handle(&b, |_| ());
        // touch `a` again so `b` becomes the least-recently-used entry
        cache.with_handle(&a, |_| ());
        cache.with_handle(&c, |_| ());

        assert!(cache.with_handle(&a, |_| ()).is_some());
        assert!(cache.with_handle(&c, |_| ()).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn missing_tile_returns_none_without_panicking() {
        let backend = FakeRasterBackend::new();
        let cache = TileHandleCache::new(backend, 2);
        assert!(cache.with_handle(Path::new("/tiles/missing.tif"), |_| ()).is_none());
    }
}
