// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    block::{
        block_offset,
        file_list::FileListBlock,
        read_block,
        word::{push_coalesced, BlockFormat},
        BlockNum,
    },
    cache::BlockCache,
    coding::{Decode, DecodeError},
    file::Header,
    summary::IndexSummary,
    wildcard::{literal_prefix, starts_with_ignore_case, WildcardPattern},
    DocumentId, IndexedFile, WordEntry,
};
use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::{Path, PathBuf},
    sync::Arc,
};

/// Read handle of one index file
///
/// The summary is loaded eagerly; blocks are read on demand and kept in
/// a small cache of decoded blocks.
pub struct IndexReader {
    path: PathBuf,
    file: File,
    format: BlockFormat,
    summary: IndexSummary,
    cache: BlockCache,
}

impl IndexReader {
    /// Opens an index file, validating its signature and loading the summary.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, or the file is not a valid
    /// index file (see [`crate::Error::is_format_error`]).
    pub fn open<P: AsRef<Path>>(
        path: P,
        format: BlockFormat,
        cache_capacity: usize,
    ) -> crate::Result<Self> {
        let path = path.as_ref();
        log::trace!("Opening index file {}", path.display());

        let mut file = File::open(path)?;

        let header_block = read_block(&mut file, 0)?;
        let header = Header::decode_from(&mut &header_block[..])?;

        file.seek(SeekFrom::Start(block_offset(header.summary_block)))?;
        let mut summary_bytes = vec![];
        file.read_to_end(&mut summary_bytes)?;

        let summary = IndexSummary::decode_from(&mut &summary_bytes[..])?;

        log::trace!(
            "Loaded summary of {}: {} files, {} words",
            path.display(),
            summary.num_files(),
            summary.num_words(),
        );

        Ok(Self {
            path: path.to_path_buf(),
            file,
            format,
            summary,
            cache: BlockCache::with_capacity(cache_capacity),
        })
    }

    /// Returns the index file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the word block format.
    #[must_use]
    pub fn format(&self) -> BlockFormat {
        self.format
    }

    /// Returns the summary.
    #[must_use]
    pub fn summary(&self) -> &IndexSummary {
        &self.summary
    }

    /// Returns the block cache.
    #[must_use]
    pub fn cache(&self) -> &BlockCache {
        &self.cache
    }

    /// Returns the number of documents.
    #[must_use]
    pub fn num_files(&self) -> u32 {
        self.summary.num_files()
    }

    /// Returns the number of distinct words.
    #[must_use]
    pub fn num_words(&self) -> u32 {
        self.summary.num_words()
    }

    fn load_file_list(&mut self, block: BlockNum) -> crate::Result<Arc<[IndexedFile]>> {
        if let Some(files) = self.cache.get_file_list(block) {
            log::trace!("Cache hit for file block {block}");
            return Ok(files);
        }

        let raw = read_block(&mut self.file, block)?;
        let files: Arc<[IndexedFile]> = FileListBlock::decode(raw)?.into();

        self.cache.insert_file_list(block, files.clone());
        Ok(files)
    }

    fn load_words(&mut self, block: BlockNum) -> crate::Result<Arc<[WordEntry]>> {
        if let Some(entries) = self.cache.get_words(block) {
            log::trace!("Cache hit for word block {block}");
            return Ok(entries);
        }

        let raw = read_block(&mut self.file, block)?;
        let entries: Arc<[WordEntry]> = self.format.decode(&raw)?.into();

        self.cache.insert_words(block, entries.clone());
        Ok(entries)
    }

    /// Returns the document with the given id.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, or the block is malformed.
    pub fn get_indexed_file(&mut self, id: DocumentId) -> crate::Result<Option<IndexedFile>> {
        let Some(block) = self.summary.get_block_num_for_file_num(id) else {
            return Ok(None);
        };

        let files = self.load_file_list(block)?;

        Ok(files
            .binary_search_by_key(&id, IndexedFile::id)
            .ok()
            .and_then(|idx| files.get(idx))
            .cloned())
    }

    /// Returns the document with the given path.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, or the block is malformed.
    pub fn get_indexed_file_by_path(&mut self, path: &str) -> crate::Result<Option<IndexedFile>> {
        let Some(block) = self.summary.get_block_num_for_path(path) else {
            return Ok(None);
        };

        let files = self.load_file_list(block)?;

        Ok(files
            .binary_search_by(|f| f.path().cmp(path))
            .ok()
            .and_then(|idx| files.get(idx))
            .cloned())
    }

    fn resolve_refs(&mut self, refs: &[DocumentId]) -> crate::Result<Vec<IndexedFile>> {
        refs.iter()
            .map(|&id| {
                self.get_indexed_file(id)?
                    .ok_or(crate::Error::Decode(DecodeError::UnknownDocument(id)))
            })
            .collect()
    }

    /// Returns the posting list of `word`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, or a block is malformed.
    pub fn query_entry(&mut self, word: &str) -> crate::Result<Option<WordEntry>> {
        let mut result: Option<WordEntry> = None;

        for block in self.summary.get_block_nums_for_word(word) {
            let entries = self.load_words(block)?;

            let Ok(idx) = entries.binary_search_by(|e| e.word().cmp(word)) else {
                continue;
            };
            let Some(entry) = entries.get(idx) else {
                continue;
            };

            match &mut result {
                Some(result) => result.merge_refs(entry.refs()),
                None => result = Some(entry.clone()),
            }
        }

        Ok(result)
    }

    /// Returns the documents containing `word`, in path order.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, or a block is malformed.
    pub fn query(&mut self, word: &str) -> crate::Result<Vec<IndexedFile>> {
        match self.query_entry(word)? {
            Some(entry) => self.resolve_refs(entry.refs()),
            None => Ok(vec![]),
        }
    }

    /// Returns all entries whose word starts with `prefix`, in word order.
    ///
    /// A case-insensitive lookup has to scan every word block.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, or a block is malformed.
    pub fn query_entries_prefixed_by(
        &mut self,
        prefix: &str,
        case_sensitive: bool,
    ) -> crate::Result<Vec<WordEntry>> {
        let blocks = if case_sensitive {
            self.summary.get_block_nums_for_prefix(prefix)
        } else {
            self.summary.word_block_nums().collect()
        };

        let mut result = vec![];

        for block in blocks {
            let entries = self.load_words(block)?;
            let mut found = false;

            for entry in entries.iter() {
                if case_sensitive {
                    if entry.word().starts_with(prefix) {
                        found = true;
                        push_coalesced(&mut result, entry.clone());
                    } else if found {
                        // Matches are contiguous
                        break;
                    }
                } else if starts_with_ignore_case(entry.word(), prefix) {
                    push_coalesced(&mut result, entry.clone());
                }
            }
        }

        Ok(result)
    }

    /// Returns all entries whose word matches the wildcard `pattern`, in
    /// word order.
    ///
    /// A pattern without wildcards is an exact lookup.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, or a block is malformed.
    pub fn query_entries_matching(
        &mut self,
        pattern: &str,
        case_sensitive: bool,
    ) -> crate::Result<Vec<WordEntry>> {
        let matcher = WildcardPattern::new(pattern, case_sensitive);

        if case_sensitive && !matcher.has_wildcards() {
            return Ok(self.query_entry(pattern)?.into_iter().collect());
        }

        let prefix = if case_sensitive {
            literal_prefix(pattern)
        } else {
            ""
        };

        let blocks = if prefix.is_empty() {
            self.summary.word_block_nums().collect()
        } else {
            self.summary.get_block_nums_for_prefix(prefix)
        };

        let mut result = vec![];

        for block in blocks {
            let entries = self.load_words(block)?;
            let mut found = false;

            for entry in entries.iter() {
                if !entry.word().starts_with(prefix) {
                    if found {
                        break;
                    }
                    continue;
                }
                found = true;

                if matcher.is_match(entry.word()) {
                    push_coalesced(&mut result, entry.clone());
                }
            }
        }

        Ok(result)
    }

    /// Returns the documents containing any word that starts with `prefix`,
    /// in path order.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, or a block is malformed.
    pub fn query_files_referring_to_prefix(
        &mut self,
        prefix: &str,
    ) -> crate::Result<Vec<IndexedFile>> {
        let mut refs = self
            .query_entries_prefixed_by(prefix, true)?
            .into_iter()
            .flat_map(|entry| entry.into_parts().1)
            .collect::<Vec<_>>();

        refs.sort_unstable();
        refs.dedup();

        self.resolve_refs(&refs)
    }

    /// Returns the documents whose path contains `substring`, in path order.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, or a block is malformed.
    pub fn query_in_document_names(&mut self, substring: &str) -> crate::Result<Vec<IndexedFile>> {
        let mut result = vec![];

        for file in self.scan_files() {
            let file = file?;
            if file.path().contains(substring) {
                result.push(file);
            }
        }

        Ok(result)
    }

    /// Returns all documents in path order.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs, or a block is malformed.
    pub fn files(&mut self) -> crate::Result<Vec<IndexedFile>> {
        self.scan_files().collect()
    }

    /// Streams all documents in path order, bypassing the cache.
    pub fn scan_files(&mut self) -> Scanner<'_, IndexedFile> {
        let blocks = self.summary.file_block_nums().collect::<Vec<_>>();
        Scanner::new(&mut self.file, self.format, blocks, |_, raw| {
            FileListBlock::decode(raw)
        })
    }

    /// Streams all word entries in word order, bypassing the cache.
    ///
    /// A word split over several blocks is yielded once per block.
    pub fn scan_words(&mut self) -> Scanner<'_, WordEntry> {
        let blocks = self.summary.word_block_nums().collect::<Vec<_>>();
        Scanner::new(&mut self.file, self.format, blocks, |format, raw| {
            format.decode(&raw)
        })
    }
}

type DecodeBlockFn<T> = fn(BlockFormat, Box<[u8]>) -> Result<Vec<T>, DecodeError>;

/// Streams the entries of a run of blocks
pub struct Scanner<'a, T> {
    file: &'a mut File,
    format: BlockFormat,
    blocks: std::vec::IntoIter<BlockNum>,
    decode: DecodeBlockFn<T>,
    current: std::vec::IntoIter<T>,
}

impl<'a, T> Scanner<'a, T> {
    fn new(
        file: &'a mut File,
        format: BlockFormat,
        blocks: Vec<BlockNum>,
        decode: DecodeBlockFn<T>,
    ) -> Self {
        Self {
            file,
            format,
            blocks: blocks.into_iter(),
            decode,
            current: Vec::new().into_iter(),
        }
    }

    fn load(&mut self, block: BlockNum) -> crate::Result<Vec<T>> {
        let raw = read_block(&mut *self.file, block)?;
        Ok((self.decode)(self.format, raw)?)
    }
}

impl<T> Iterator for Scanner<'_, T> {
    type Item = crate::Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.current.next() {
                return Some(Ok(item));
            }

            let block = self.blocks.next()?;

            match self.load(block) {
                Ok(items) => self.current = items.into_iter(),
                Err(e) => {
                    // Fuse after an error
                    self.blocks = Vec::new().into_iter();
                    return Some(Err(e));
                }
            }
        }
    }
}
