// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{block::word::BlockFormat, cache::DEFAULT_CACHE_CAPACITY, Index};
use std::path::{Path, PathBuf};

/// Default memtable size that triggers a merge (8 MiB)
pub const DEFAULT_MERGE_THRESHOLD: usize = 8 * 1_024 * 1_024;

/// Index configuration builder
#[derive(Clone, Debug)]
pub struct Config {
    /// Index file path
    #[doc(hidden)]
    pub path: PathBuf,

    /// Open an existing index file instead of truncating it
    pub reuse_existing: bool,

    /// Memtable footprint in bytes that triggers a merge on the next add
    pub merge_threshold: usize,

    /// Number of decoded blocks each reader caches
    pub cache_capacity: usize,

    /// Keep one reader open between queries
    pub cache_reader: bool,

    /// Encoding of word blocks
    pub block_format: BlockFormat,
}

impl Config {
    /// Initializes a new config
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        Self {
            path: std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()),
            reuse_existing: true,
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_reader: false,
            block_format: BlockFormat::default(),
        }
    }

    /// If `true`, an existing, valid index file is opened; otherwise
    /// a fresh empty index replaces it.
    ///
    /// Default = true
    #[must_use]
    pub fn reuse_existing(mut self, flag: bool) -> Self {
        self.reuse_existing = flag;
        self
    }

    /// Sets the memtable footprint (in bytes) that triggers a merge.
    ///
    /// Default = 8 MiB
    #[must_use]
    pub fn merge_threshold(mut self, bytes: usize) -> Self {
        self.merge_threshold = bytes;
        self
    }

    /// Sets the number of decoded blocks kept in memory.
    ///
    /// 0 disables the cache.
    ///
    /// Default = 16
    #[must_use]
    pub fn cache_capacity(mut self, blocks: usize) -> Self {
        self.cache_capacity = blocks;
        self
    }

    /// If `true`, one reader is kept open (with its block cache) until the
    /// index is closed; otherwise every query opens and closes the file.
    ///
    /// Default = false
    #[must_use]
    pub fn cache_reader(mut self, flag: bool) -> Self {
        self.cache_reader = flag;
        self
    }

    /// Sets the word block encoding.
    ///
    /// The encoding is not stored in the file; an index must always be
    /// opened with the format it was written with.
    ///
    /// Default = [`BlockFormat::GammaCompressed`]
    #[must_use]
    pub fn block_format(mut self, format: BlockFormat) -> Self {
        self.block_format = format;
        self
    }

    /// Opens an index using the config.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn open(self) -> crate::Result<Index> {
        Index::open(self)
    }
}
