//! A memo table of compiled permalinks keyed by format string.
//!
//! Compilation is a pure function of the format, so entries never go stale
//! individually. Readers load the current map without locking; a miss
//! compiles outside the map and publishes a new map with the entry added.
//! When the site's configuration changes the whole table is replaced with
//! [`PermalinkCache::rebuild`]. Requests already holding an
//! `Arc<Permalink>` keep using it.

use crate::template::{self, Permalink, DEFAULT_FORMAT};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

type Entries = HashMap<String, Arc<Permalink>>;

#[derive(Debug)]
pub struct PermalinkCache {
    entries: ArcSwap<Entries>,
}

impl Default for PermalinkCache {
    fn default() -> Self {
        PermalinkCache::new()
    }
}

impl PermalinkCache {
    pub fn new() -> PermalinkCache {
        PermalinkCache {
            entries: ArcSwap::from_pointee(Entries::new()),
        }
    }

    /// Returns the compiled permalink for `format`, compiling and memoizing
    /// it on first use. Formats which fail to compile aren't memoized.
    pub fn get(&self, format: &str) -> template::Result<Arc<Permalink>> {
        if let Some(permalink) = self.entries.load().get(format) {
            return Ok(Arc::clone(permalink));
        }

        let compiled = Arc::new(Permalink::compile(format)?);
        let previous = self.entries.rcu(|entries| {
            let mut entries = Entries::clone(entries);
            entries
                .entry(format.to_owned())
                .or_insert_with(|| Arc::clone(&compiled));
            entries
        });

        // If another thread won the race, hand out its entry so every caller
        // shares one instance.
        Ok(match previous.get(format) {
            Some(existing) => Arc::clone(existing),
            None => compiled,
        })
    }

    /// Returns the compiled [`DEFAULT_FORMAT`].
    pub fn legacy(&self) -> template::Result<Arc<Permalink>> {
        self.get(DEFAULT_FORMAT)
    }

    /// Drops every entry. Called when the site's format changes.
    pub fn rebuild(&self) {
        self.entries.store(Arc::new(Entries::new()));
    }

    pub fn len(&self) -> usize {
        self.entries.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.load().is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::template::CompileError;
    use std::thread;

    #[test]
    fn test_get_memoizes() -> template::Result<()> {
        let cache = PermalinkCache::new();
        let first = cache.get("/%title%.html")?;
        let second = cache.get("/%title%.html")?;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(1, cache.len());
        Ok(())
    }

    #[test]
    fn test_get_does_not_memoize_errors() {
        let cache = PermalinkCache::new();
        assert!(matches!(
            cache.get("/%year%/"),
            Err(CompileError::MissingTitlePlaceholder)
        ));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_rebuild_keeps_outstanding_entries_valid() -> template::Result<()> {
        let cache = PermalinkCache::new();
        let held = cache.get(DEFAULT_FORMAT)?;
        cache.rebuild();
        assert!(cache.is_empty());

        let fresh = cache.legacy()?;
        assert!(!Arc::ptr_eq(&held, &fresh));
        assert_eq!(held.template, fresh.template);
        assert!(held.matcher.matches("2004/4/1/slug").is_some());
        Ok(())
    }

    #[test]
    fn test_concurrent_gets_share_one_entry() -> template::Result<()> {
        let cache = Arc::new(PermalinkCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || cache.get("/%year%/%title%"))
            })
            .collect();

        let wanted = cache.get("/%year%/%title%")?;
        for handle in handles {
            let permalink = handle.join().unwrap()?;
            assert!(Arc::ptr_eq(&wanted, &permalink));
        }
        assert_eq!(1, cache.len());
        Ok(())
    }
}
