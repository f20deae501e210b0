// # Client Cache
//
// Holds the authenticated provider client an operator reuses across
// requests.
//
// ## Concurrency
//
// Reads are a lock-free `ArcSwapOption::load_full`. When the slot is empty
// two requests may both build a client; both are functionally identical and
// the last `store` wins. Nothing ever blocks on a lock in the request path.
//
// ## Per-invocation credentials
//
// When the hosting environment supplies credentials with the call, the cache
// is bypassed: a fresh client is built and used for that call only, since
// the credentials behind it expire with the invocation.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::error::Result;

/// Lazily-built, atomically published client handle
pub struct ClientCache<C> {
    slot: ArcSwapOption<C>,
}

impl<C> Default for ClientCache<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for ClientCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCache")
            .field("initialized", &self.slot.load().is_some())
            .finish()
    }
}

impl<C> ClientCache<C> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            slot: ArcSwapOption::empty(),
        }
    }

    /// The cached client, if one has been published
    pub fn cached(&self) -> Option<Arc<C>> {
        self.slot.load_full()
    }

    /// Return the cached client or build one
    ///
    /// With `reuse == false` the cache is neither read nor written and
    /// `build` always runs.
    pub fn get_or_try_init<F>(&self, reuse: bool, build: F) -> Result<Arc<C>>
    where
        F: FnOnce() -> Result<C>,
    {
        if !reuse {
            return build().map(Arc::new);
        }

        if let Some(client) = self.slot.load_full() {
            return Ok(client);
        }

        let client = Arc::new(build()?);
        self.slot.store(Some(Arc::clone(&client)));
        tracing::debug!("Published new provider client");
        Ok(client)
    }

    /// Drop the cached client so the next call rebuilds it
    pub fn invalidate(&self) {
        self.slot.store(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn builds_once_then_reuses() {
        let cache = ClientCache::new();
        let builds = AtomicUsize::new(0);

        let build = || {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(String::from("client"))
        };

        let first = cache.get_or_try_init(true, build).unwrap();
        let second = cache.get_or_try_init(true, build).unwrap();

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn no_reuse_bypasses_cache() {
        let cache = ClientCache::new();
        let cached = cache
            .get_or_try_init(true, || Ok::<_, Error>(1_u32))
            .unwrap();

        let fresh = cache
            .get_or_try_init(false, || Ok::<_, Error>(2_u32))
            .unwrap();

        assert_eq!(*fresh, 2);
        assert!(Arc::ptr_eq(&cache.cached().unwrap(), &cached));
    }

    #[test]
    fn failed_build_publishes_nothing() {
        let cache: ClientCache<u32> = ClientCache::new();
        let result = cache.get_or_try_init(true, || Err(Error::auth("token is not set")));

        assert!(result.is_err());
        assert!(cache.cached().is_none());
    }

    #[test]
    fn invalidate_forces_rebuild() {
        let cache = ClientCache::new();
        cache.get_or_try_init(true, || Ok::<_, Error>(1_u32)).unwrap();
        cache.invalidate();

        let rebuilt = cache.get_or_try_init(true, || Ok::<_, Error>(2_u32)).unwrap();
        assert_eq!(*rebuilt, 2);
    }

    #[test]
    fn concurrent_builders_converge_on_one_handle() {
        let cache = Arc::new(ClientCache::new());
        let builds = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let builds = Arc::clone(&builds);
                std::thread::spawn(move || {
                    cache
                        .get_or_try_init(true, || {
                            builds.fetch_add(1, Ordering::SeqCst);
                            Ok::<_, Error>(42_u32)
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(*handle.join().unwrap(), 42);
        }

        assert!(builds.load(Ordering::SeqCst) >= 1);
        assert_eq!(*cache.cached().unwrap(), 42);
    }
}
