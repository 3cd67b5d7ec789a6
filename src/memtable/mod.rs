// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    block::{
        file_list::FileListBlock,
        word::{BlockFormat, EntryBlock},
        BLOCK_SIZE,
    },
    coding::EncodeError,
    indexer::IndexerOutput,
    DocumentId, HashMap, IndexedFile, WordEntry,
};

/// The memtable is the in-memory overlay that collects added documents
/// and their postings until the next merge
///
/// Word references are appended as-is: adding the same word twice yields
/// two entries. The merge coalesces them.
#[derive(Default)]
pub struct Memtable {
    files: Vec<IndexedFile>,

    /// Live (not removed) files by path
    live: HashMap<String, DocumentId>,

    words: Vec<WordEntry>,

    files_sorted: bool,
    words_sorted: bool,

    /// Approximate memtable size
    ///
    /// If this grows too large, a merge is triggered
    footprint: usize,

    last_id: DocumentId,
}

impl Memtable {
    /// Registers a new document, assigning the next id.
    pub fn add_document<S: Into<String>>(&mut self, path: S) -> IndexedFile {
        self.last_id += 1;

        let file = IndexedFile::new(path, self.last_id);
        self.footprint += file.footprint() + std::mem::size_of::<(String, DocumentId)>();

        self.live.insert(file.path().to_owned(), file.id());
        self.files.push(file.clone());
        self.files_sorted = false;

        file
    }

    /// Appends a posting of `word` to document `id`.
    pub fn add_ref(&mut self, word: &str, id: DocumentId) {
        let entry = WordEntry::with_refs(word, vec![id]);

        self.footprint += entry.footprint();
        self.words.push(entry);
        self.words_sorted = false;
    }

    /// Applies the document collected by an indexer run.
    ///
    /// Returns the registered file, or `None` if the indexer skipped the
    /// document.
    pub fn commit(&mut self, output: MemtableOutput) -> Option<IndexedFile> {
        let file = self.add_document(output.file?.into_path());
        debug_assert_eq!(file.id(), output.next_id, "memtable changed during indexing");

        for word in &output.words {
            self.add_ref(word, file.id());
        }

        Some(file)
    }

    /// Returns the live document registered under `path`.
    #[must_use]
    pub fn get_indexed_file(&self, path: &str) -> Option<IndexedFile> {
        self.live
            .get(path)
            .map(|&id| IndexedFile::new(path, id))
    }

    /// Forgets the live document under `path`, returning its id.
    ///
    /// Its postings stay in memory; the merge drops them through the
    /// memtable tombstones.
    pub fn remove_document(&mut self, path: &str) -> Option<DocumentId> {
        self.live.remove(path)
    }

    /// Returns all files sorted by path, then id.
    pub fn sorted_files(&mut self) -> &[IndexedFile] {
        if !self.files_sorted {
            self.files.sort_unstable();
            self.files_sorted = true;
        }
        &self.files
    }

    /// Returns all word entries sorted by word.
    ///
    /// Entries of the same word are not coalesced.
    pub fn sorted_word_entries(&mut self) -> &[WordEntry] {
        if !self.words_sorted {
            self.words.sort_by(|a, b| a.word().cmp(b.word()));
            self.words_sorted = true;
        }
        &self.words
    }

    /// Returns the number of documents ever added (including removed ones).
    #[must_use]
    pub fn num_files(&self) -> usize {
        self.files.len()
    }

    /// Returns the highest assigned document id.
    #[must_use]
    pub fn last_id(&self) -> DocumentId {
        self.last_id
    }

    /// Returns the number of word entries.
    #[must_use]
    pub fn num_word_entries(&self) -> usize {
        self.words.len()
    }

    /// Get approximate size of memtable in bytes
    #[must_use]
    pub fn footprint(&self) -> usize {
        self.footprint
    }

    /// Returns `true` if nothing was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.words.is_empty()
    }
}

/// Strings up to this many UTF-8 bytes fit any empty block
///
/// Modified UTF-8 takes at most two bytes per UTF-8 byte.
const ALWAYS_FITS_LEN: usize = BLOCK_SIZE / 4;

fn path_fits(path: &str) -> crate::Result<bool> {
    if path.len() <= ALWAYS_FITS_LEN {
        return Ok(true);
    }
    Ok(FileListBlock::new().add_file(&IndexedFile::new(path, 1))?)
}

fn word_fits(format: BlockFormat, word: &str) -> crate::Result<bool> {
    if word.len() <= ALWAYS_FITS_LEN {
        return Ok(true);
    }
    format
        .new_block()
        .add_entry(&WordEntry::with_refs(word, vec![DocumentId::MAX]))
}

/// [`IndexerOutput`] that collects a single document for a [`Memtable`]
///
/// Nothing reaches the memtable until [`Memtable::commit`], so an indexer
/// that fails halfway leaves it untouched.
pub struct MemtableOutput {
    next_id: DocumentId,
    format: BlockFormat,
    file: Option<IndexedFile>,
    words: Vec<String>,
}

impl MemtableOutput {
    /// Creates an output for one indexer call.
    #[must_use]
    pub fn new(memtable: &Memtable, format: BlockFormat) -> Self {
        Self {
            next_id: memtable.last_id + 1,
            format,
            file: None,
            words: Vec::new(),
        }
    }
}

impl IndexerOutput for MemtableOutput {
    fn add_document(&mut self, path: &str) -> crate::Result<IndexedFile> {
        if self.file.is_some() {
            return Err(crate::Error::ContractViolation(
                "add_document called twice for one document",
            ));
        }

        if !path_fits(path)? {
            log::warn!("Rejecting document path of {} bytes", path.len());
            return Err(EncodeError::EntryTooLarge.into());
        }

        let file = IndexedFile::new(path, self.next_id);
        self.file = Some(file.clone());
        Ok(file)
    }

    fn add_ref(&mut self, word: &str) -> crate::Result<()> {
        if self.file.is_none() {
            return Err(crate::Error::ContractViolation(
                "add_ref called before add_document",
            ));
        }

        if word.is_empty() {
            return Err(crate::Error::ContractViolation("cannot index an empty word"));
        }

        if !word_fits(self.format, word)? {
            log::warn!("Rejecting word of {} bytes", word.len());
            return Err(EncodeError::EntryTooLarge.into());
        }

        self.words.push(word.to_owned());
        Ok(())
    }
}
