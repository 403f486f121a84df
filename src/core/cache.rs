//! Bounded cache of opened donor packages.
//!
//! Donor packages are opened on demand while cloning and kept around so
//! popular donors are not re-read for every dependency. The cache holds at
//! most `capacity` packages; the least recently used one is closed as soon
//! as a new package would exceed the bound.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lru::LruCache;

use crate::model::Container;
use crate::package::PackageIo;
use crate::util::{Error, Result};

/// Counters describing cache behaviour over a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub opened: usize,
    pub evicted: usize,
}

/// LRU cache of read-only donor containers, keyed by path.
///
/// Never holds the run's own source or destination packages.
pub struct ContainerCache<'io> {
    io: &'io dyn PackageIo,
    entries: LruCache<PathBuf, Arc<Container>>,
    /// Evicted packages still borrowed by a caller.
    retired: Vec<Arc<Container>>,
    stats: CacheStats,
}

impl<'io> ContainerCache<'io> {
    /// Create a cache holding at most `capacity` open packages.
    pub fn new(io: &'io dyn PackageIo, capacity: usize) -> Result<Self> {
        let cap = NonZeroUsize::new(capacity)
            .ok_or_else(|| Error::config("container cache capacity must be at least 1"))?;
        Ok(Self { io, entries: LruCache::new(cap), retired: Vec::new(), stats: CacheStats::default() })
    }

    /// Return the cached container for `path`, opening it on a miss.
    pub fn get_or_open(&mut self, path: &Path) -> Result<Arc<Container>> {
        self.close_released();
        if let Some(container) = self.entries.get(path) {
            self.stats.hits += 1;
            return Ok(Arc::clone(container));
        }

        // Make room first so the number of open packages never exceeds the bound.
        if self.entries.len() >= self.capacity() {
            if let Some((evicted_path, evicted)) = self.entries.pop_lru() {
                self.stats.evicted += 1;
                tracing::debug!(path = %evicted_path.display(), "donor evicted");
                self.retire(evicted);
            }
        }

        let container = Arc::new(self.io.open(path)?);
        self.stats.opened += 1;
        tracing::debug!(path = %path.display(), open = self.entries.len() + 1, "donor opened");

        self.entries.put(path.to_path_buf(), Arc::clone(&container));
        Ok(container)
    }

    /// Close an evicted package, or park it until its last outside handle drops.
    fn retire(&mut self, container: Arc<Container>) {
        if Arc::strong_count(&container) == 1 {
            self.io.close(&container);
        } else {
            tracing::trace!("evicted donor still in use, close deferred");
            self.retired.push(container);
        }
    }

    /// Close parked packages nobody holds any more.
    fn close_released(&mut self) {
        let io = self.io;
        self.retired.retain(|c| {
            if Arc::strong_count(c) == 1 {
                io.close(c);
                false
            } else {
                true
            }
        });
    }

    /// Evicted packages whose close is still pending.
    pub fn retired_len(&self) -> usize {
        self.retired.len()
    }

    /// Whether `path` is currently cached.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains(path)
    }

    /// Number of packages currently open.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of packages held open.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    #[inline]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Close and drop every cached package.
    ///
    /// Packages still held by a caller are closed here too, since the cache
    /// never sees them again.
    pub fn clear(&mut self) {
        while let Some((_, container)) = self.entries.pop_lru() {
            self.io.close(&container);
        }
        for container in self.retired.drain(..) {
            self.io.close(&container);
        }
    }
}

impl Drop for ContainerCache<'_> {
    fn drop(&mut self) {
        self.clear();
    }
}
