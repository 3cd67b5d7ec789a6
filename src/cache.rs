// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{block::BlockNum, IndexedFile, WordEntry};
use quick_cache::{unsync::Cache as QuickCache, UnitWeighter};
use std::sync::Arc;

/// Default number of cached blocks
pub const DEFAULT_CACHE_CAPACITY: usize = 16;

#[derive(Clone)]
enum Item {
    FileList(Arc<[IndexedFile]>),
    Words(Arc<[WordEntry]>),
}

/// Cache of decoded blocks, keyed by block number
///
/// File-list and word blocks share the capacity. Each reader owns its
/// cache, it is not shared between indexes.
pub struct BlockCache {
    // NOTE: rustc_hash performed best: https://fjall-rs.github.io/post/fjall-2-1
    data: QuickCache<BlockNum, Item, UnitWeighter, rustc_hash::FxBuildHasher>,

    /// Capacity in blocks
    capacity: usize,
}

impl BlockCache {
    /// Creates a new block cache holding up to `capacity` blocks.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        use quick_cache::unsync::DefaultLifecycle;

        #[expect(clippy::default_trait_access, reason = "hasher type is spelled out above")]
        let quick_cache = QuickCache::with(
            capacity.max(1),
            capacity.max(1) as u64,
            UnitWeighter,
            Default::default(),
            DefaultLifecycle::default(),
        );

        Self {
            data: quick_cache,
            capacity,
        }
    }

    /// Returns the cache capacity in blocks.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of cached blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if there are no cached blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub(crate) fn insert_file_list(&mut self, block: BlockNum, files: Arc<[IndexedFile]>) {
        if self.capacity > 0 {
            self.data.insert(block, Item::FileList(files));
        }
    }

    pub(crate) fn insert_words(&mut self, block: BlockNum, entries: Arc<[WordEntry]>) {
        if self.capacity > 0 {
            self.data.insert(block, Item::Words(entries));
        }
    }

    pub(crate) fn get_file_list(&mut self, block: BlockNum) -> Option<Arc<[IndexedFile]>> {
        match self.data.get(&block)? {
            Item::FileList(files) => Some(files.clone()),
            Item::Words(_) => {
                log::warn!("cache item type was unexpected - this is a bug");
                None
            }
        }
    }

    pub(crate) fn get_words(&mut self, block: BlockNum) -> Option<Arc<[WordEntry]>> {
        match self.data.get(&block)? {
            Item::Words(entries) => Some(entries.clone()),
            Item::FileList(_) => {
                log::warn!("cache item type was unexpected - this is a bug");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn block_cache_typed_lookup() {
        let mut cache = BlockCache::with_capacity(4);

        cache.insert_file_list(1, Arc::from(vec![IndexedFile::new("a", 1)]));
        cache.insert_words(2, Arc::from(vec![WordEntry::with_refs("w", vec![1])]));

        assert_eq!(2, cache.len());
        assert!(cache.get_file_list(1).is_some());
        assert!(cache.get_words(2).is_some());

        // Wrong type is a miss
        assert!(cache.get_words(1).is_none());
        assert!(cache.get_file_list(3).is_none());
    }

    #[test]
    fn block_cache_bounded() {
        let mut cache = BlockCache::with_capacity(2);

        for block in 0..10 {
            cache.insert_words(block, Arc::from(vec![]));
        }

        assert!(cache.len() <= 2);
    }

    #[test]
    fn block_cache_zero_capacity() {
        let mut cache = BlockCache::with_capacity(0);
        cache.insert_words(1, Arc::from(vec![]));
        assert!(cache.is_empty());
    }
}
