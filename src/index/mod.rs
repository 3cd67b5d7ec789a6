// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    file::replace_atomic,
    indexer::{Document, Indexer},
    memtable::{Memtable, MemtableOutput},
    merge::MergeEngine,
    reader::IndexReader,
    writer::IndexWriter,
    Config, DocumentId, HashMap, IndexedFile, WordEntry,
};
use std::path::Path;

/// Whether the memtable holds changes the index file does not
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum IndexState {
    /// Index file is up to date
    Merged,

    /// Documents were added or removed since the last merge
    CanMerge,
}

/// A persistent word index
///
/// Added documents land in an in-memory memtable, removed documents in two
/// tombstone sets (one per generation). A merge writes the index file and
/// the memtable into a new index file that atomically replaces the old one.
///
/// Queries only read the index file, so they merge pending changes first.
/// If that merge fails, they see the index file as it was.
///
/// An index is not thread-safe; calls have to be serialized by the caller.
pub struct Index {
    config: Config,

    memtable: Memtable,

    /// Path -> highest removed memtable id
    removed_in_memtable: HashMap<String, DocumentId>,

    /// Path -> removed on-disk id
    removed_on_disk: HashMap<String, DocumentId>,

    state: IndexState,

    /// Kept open if [`Config::cache_reader`] is set
    reader: Option<IndexReader>,
}

fn add_tombstone(removed: &mut HashMap<String, DocumentId>, path: &str, id: DocumentId) {
    removed
        .entry(path.to_owned())
        .and_modify(|removed_id| *removed_id = (*removed_id).max(id))
        .or_insert(id);
}

impl Index {
    /// Opens the index file of the config, creating it if needed.
    ///
    /// A corrupt index file is deleted and replaced by an empty one.
    ///
    /// # Errors
    ///
    /// Returns error, if an IO error occurred.
    pub(crate) fn open(config: Config) -> crate::Result<Self> {
        log::debug!("Opening index at {}", config.path.display());

        if let Some(folder) = config.path.parent() {
            std::fs::create_dir_all(folder)?;
        }

        let mut index = Self {
            config,
            memtable: Memtable::default(),
            removed_in_memtable: HashMap::default(),
            removed_on_disk: HashMap::default(),
            state: IndexState::Merged,
            reader: None,
        };
        index.initialize()?;

        Ok(index)
    }

    fn initialize(&mut self) -> crate::Result<()> {
        let path = &self.config.path;

        let has_content = match std::fs::metadata(path) {
            Ok(metadata) => metadata.len() > 0,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        if self.config.reuse_existing && has_content {
            match self.open_reader() {
                Ok(reader) => {
                    log::debug!(
                        "Recovered index {} with {} documents",
                        path.display(),
                        reader.num_files(),
                    );

                    if self.config.cache_reader {
                        self.reader = Some(reader);
                    }
                    return Ok(());
                }
                Err(e) if e.is_format_error() => {
                    log::warn!("Deleting corrupt index file {}: {e}", path.display());
                    std::fs::remove_file(path)?;
                }
                Err(e) => return Err(e),
            }
        }

        log::trace!("Creating empty index file {}", path.display());
        IndexWriter::create(path, self.config.block_format)?.finish()?;

        Ok(())
    }

    fn open_reader(&self) -> crate::Result<IndexReader> {
        IndexReader::open(
            &self.config.path,
            self.config.block_format,
            self.config.cache_capacity,
        )
    }

    /// Runs `f` against the cached reader, or a reader that is closed again
    /// afterwards.
    fn with_reader<T>(
        &mut self,
        f: impl FnOnce(&mut IndexReader) -> crate::Result<T>,
    ) -> crate::Result<T> {
        let mut reader = match self.reader.take() {
            Some(reader) => reader,
            None => self.open_reader()?,
        };

        let result = f(&mut reader);

        if self.config.cache_reader {
            self.reader = Some(reader);
        }

        result
    }

    /// Returns the index file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Returns whether changes are pending.
    #[must_use]
    pub fn state(&self) -> IndexState {
        self.state
    }

    /// Returns the approximate memtable size in bytes.
    #[must_use]
    pub fn memtable_footprint(&self) -> usize {
        self.memtable.footprint()
    }

    /// Returns the size of the index file in bytes.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn disk_size(&self) -> crate::Result<u64> {
        Ok(std::fs::metadata(&self.config.path)?.len())
    }

    /// Returns the number of blocks in the reader cache (0 without a cached reader).
    #[must_use]
    pub fn cached_block_count(&self) -> usize {
        self.reader.as_ref().map_or(0, |reader| reader.cache().len())
    }

    /// Indexes a document.
    ///
    /// If the memtable grew beyond the merge threshold, it is merged first.
    /// A document that was already added since the last merge is replaced.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the merge fails, or the indexer fails or breaks
    /// its contract. A word or path too large for a block is rejected with
    /// [`crate::coding::EncodeError::EntryTooLarge`]. On error, the document
    /// is not added.
    pub fn add<D: Document + ?Sized, I: Indexer<D> + ?Sized>(
        &mut self,
        document: &D,
        indexer: &mut I,
    ) -> crate::Result<()> {
        if self.memtable.footprint() >= self.config.merge_threshold {
            log::debug!(
                "Memtable reached {} bytes, merging",
                self.memtable.footprint(),
            );
            self.merge()?;
        }

        let mut output = MemtableOutput::new(&self.memtable, self.config.block_format);
        indexer.index(document, &mut output)?;

        let path = document.path();

        if let Some(id) = self.memtable.remove_document(path) {
            log::trace!("Replacing {path} in memtable");
            add_tombstone(&mut self.removed_in_memtable, path, id);
        }

        self.memtable.commit(output);
        self.state = IndexState::CanMerge;

        Ok(())
    }

    /// Removes a document.
    ///
    /// The document disappears from query results after the next merge.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::DocumentNotFound`] if the path is neither in
    /// the memtable nor in the index file.
    pub fn remove(&mut self, path: &str) -> crate::Result<()> {
        let mut found = false;

        if let Some(id) = self.memtable.remove_document(path) {
            add_tombstone(&mut self.removed_in_memtable, path, id);
            found = true;
        }

        if let Some(file) = self.with_reader(|reader| reader.get_indexed_file_by_path(path))? {
            add_tombstone(&mut self.removed_on_disk, path, file.id());
            found = true;
        }

        if !found {
            return Err(crate::Error::DocumentNotFound(path.to_owned()));
        }

        log::trace!("Removed {path}");
        self.state = IndexState::CanMerge;

        Ok(())
    }

    /// Merges pending changes, if there are any.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs. The index file and the
    /// pending changes are left as they were, so the save can be retried.
    pub fn save(&mut self) -> crate::Result<()> {
        if self.state == IndexState::CanMerge {
            self.merge()?;
        }
        Ok(())
    }

    /// Merges pending changes before a query.
    ///
    /// A failed merge leaves the previous generation in place, so the query
    /// is answered from it and the changes stay pending.
    fn refresh(&mut self) {
        if let Err(e) = self.save() {
            log::warn!(
                "Merge into {} failed, querying previous generation: {e}",
                self.config.path.display(),
            );
        }
    }

    /// Merges the memtable into a new index file, even if nothing changed.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs. The index file and the
    /// pending changes are left as they were.
    pub fn merge(&mut self) -> crate::Result<()> {
        let path = self.config.path.clone();
        let folder = path.parent().unwrap_or_else(|| Path::new("."));

        log::debug!(
            "Merging {} memtable documents into {}",
            self.memtable.num_files(),
            path.display(),
        );

        let temp_file = tempfile::NamedTempFile::new_in(folder)?;
        let writer = IndexWriter::from_file(
            temp_file.as_file().try_clone()?,
            temp_file.path(),
            self.config.block_format,
        )?;

        let mut reader = match self.reader.take() {
            Some(reader) => reader,
            None => self.open_reader()?,
        };

        let result = MergeEngine::new(
            &mut reader,
            &mut self.memtable,
            &self.removed_on_disk,
            &self.removed_in_memtable,
        )
        .run(writer);

        // The old generation must be closed before it is replaced
        drop(reader);

        // NOTE: On error, the temp file is deleted when dropped
        result?;
        replace_atomic(temp_file, &path)?;

        self.memtable = Memtable::default();
        self.removed_in_memtable.clear();
        self.removed_on_disk.clear();
        self.state = IndexState::Merged;

        if self.config.cache_reader {
            self.reader = Some(self.open_reader()?);
        }

        Ok(())
    }

    /// Returns the paths of all documents containing `word`, in path order.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn query(&mut self, word: &str) -> crate::Result<Vec<String>> {
        self.refresh();

        let files = self.with_reader(|reader| reader.query(word))?;
        Ok(files.into_iter().map(IndexedFile::into_path).collect())
    }

    /// Returns all entries whose word starts with `prefix`, in word order.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn query_entries_prefixed_by(
        &mut self,
        prefix: &str,
        case_sensitive: bool,
    ) -> crate::Result<Vec<WordEntry>> {
        self.refresh();
        self.with_reader(|reader| reader.query_entries_prefixed_by(prefix, case_sensitive))
    }

    /// Returns all entries whose word matches the wildcard `pattern` (`*` and
    /// `?`), in word order.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn query_entries_matching(
        &mut self,
        pattern: &str,
        case_sensitive: bool,
    ) -> crate::Result<Vec<WordEntry>> {
        self.refresh();
        self.with_reader(|reader| reader.query_entries_matching(pattern, case_sensitive))
    }

    /// Returns the paths of all documents containing a word that starts with
    /// `prefix`, in path order.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn query_files_referring_to_prefix(&mut self, prefix: &str) -> crate::Result<Vec<String>> {
        self.refresh();

        let files = self.with_reader(|reader| reader.query_files_referring_to_prefix(prefix))?;
        Ok(files.into_iter().map(IndexedFile::into_path).collect())
    }

    /// Returns the paths of all documents whose path contains `substring`.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn query_in_document_names(&mut self, substring: &str) -> crate::Result<Vec<String>> {
        self.refresh();

        let files = self.with_reader(|reader| reader.query_in_document_names(substring))?;
        Ok(files.into_iter().map(IndexedFile::into_path).collect())
    }

    /// Returns the document with the given id.
    ///
    /// Ids are only stable until the next merge.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn get_indexed_file(&mut self, id: DocumentId) -> crate::Result<Option<IndexedFile>> {
        self.refresh();
        self.with_reader(|reader| reader.get_indexed_file(id))
    }

    /// Returns all documents in path order.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn documents(&mut self) -> crate::Result<Vec<IndexedFile>> {
        self.refresh();
        self.with_reader(IndexReader::files)
    }

    /// Returns the number of documents.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn num_documents(&mut self) -> crate::Result<u32> {
        self.refresh();
        self.with_reader(|reader| Ok(reader.num_files()))
    }

    /// Returns the number of distinct words.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn num_words(&mut self) -> crate::Result<u32> {
        self.refresh();
        self.with_reader(|reader| Ok(reader.num_words()))
    }

    /// Saves pending changes and releases the index file.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn close(mut self) -> crate::Result<()> {
        self.save()?;
        log::debug!("Closed index {}", self.config.path.display());
        Ok(())
    }

    /// Closes the index, discarding pending changes, and deletes its file.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn dispose(mut self) -> crate::Result<()> {
        self.reader = None;
        std::fs::remove_file(&self.config.path)?;
        log::debug!("Disposed index {}", self.config.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        block::{block_offset, word::BlockFormat, BLOCK_SIZE},
        coding::EncodeError,
        TextDocument, WordSplitter,
    };
    use test_log::test;

    #[test]
    fn index_state_transitions() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut index = Config::new(dir.path().join("index")).open()?;
        assert_eq!(IndexState::Merged, index.state());

        index.add(&TextDocument::new("a", "hello"), &mut WordSplitter::new())?;
        assert_eq!(IndexState::CanMerge, index.state());

        index.save()?;
        assert_eq!(IndexState::Merged, index.state());
        assert_eq!(0, index.memtable_footprint());

        index.remove("a")?;
        assert_eq!(IndexState::CanMerge, index.state());

        Ok(())
    }

    #[test]
    fn index_remove_unknown() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut index = Config::new(dir.path().join("index")).open()?;

        assert!(matches!(
            index.remove("nope"),
            Err(crate::Error::DocumentNotFound(path)) if path == "nope"
        ));
        assert_eq!(IndexState::Merged, index.state());

        Ok(())
    }

    #[test]
    fn index_readd_in_memtable_replaces() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut index = Config::new(dir.path().join("index")).open()?;
        let mut splitter = WordSplitter::new();

        index.add(&TextDocument::new("a", "old words"), &mut splitter)?;
        index.add(&TextDocument::new("a", "new words"), &mut splitter)?;

        assert!(index.query("old")?.is_empty());
        assert_eq!(index.query("new")?, ["a"]);
        assert_eq!(1, index.num_documents()?);

        Ok(())
    }

    #[test]
    fn index_merge_threshold() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("index");
        let mut index = Config::new(&path).merge_threshold(1).open()?;
        let mut splitter = WordSplitter::new();

        let empty_size = index.disk_size()?;

        index.add(&TextDocument::new("a", "one"), &mut splitter)?;
        assert_eq!(empty_size, index.disk_size()?);

        // Memtable is over the threshold, so this add merges "a" first
        index.add(&TextDocument::new("b", "two"), &mut splitter)?;
        assert!(index.disk_size()? > empty_size);
        assert_eq!(IndexState::CanMerge, index.state());

        Ok(())
    }

    #[test]
    fn index_cached_reader() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut index = Config::new(dir.path().join("index"))
            .cache_reader(true)
            .open()?;
        let mut splitter = WordSplitter::new();

        index.add(&TextDocument::new("a", "alpha beta"), &mut splitter)?;
        assert_eq!(index.query("beta")?, ["a"]);
        assert!(index.cached_block_count() > 0);

        index.add(&TextDocument::new("b", "beta"), &mut splitter)?;
        assert_eq!(index.query("beta")?, ["a", "b"]);

        index.close()?;
        Ok(())
    }

    #[test]
    fn index_dispose_deletes_file() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("index");

        let index = Config::new(&path).open()?;
        assert!(path.try_exists()?);

        index.dispose()?;
        assert!(!path.try_exists()?);

        Ok(())
    }

    #[test]
    fn index_no_temp_files_left() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut index = Config::new(dir.path().join("index")).open()?;

        for i in 0..5 {
            index.add(&TextDocument::new(format!("doc{i}"), "x"), &mut WordSplitter::new())?;
            index.save()?;
        }

        assert_eq!(1, std::fs::read_dir(dir.path())?.count());
        Ok(())
    }

    #[test]
    fn index_rejects_oversized_word() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut index = Config::new(dir.path().join("index")).open()?;
        let mut splitter = WordSplitter::new();

        index.add(&TextDocument::new("a", "alpha"), &mut splitter)?;
        index.save()?;
        index.add(&TextDocument::new("b", "beta"), &mut splitter)?;

        let huge = "w".repeat(9_000);
        assert!(matches!(
            index.add(&TextDocument::new("c", format!("gamma {huge}")), &mut splitter),
            Err(crate::Error::Encode(EncodeError::EntryTooLarge))
        ));

        assert_eq!(index.query("alpha")?, ["a"]);
        assert_eq!(index.query("beta")?, ["b"]);
        assert!(index.query("gamma")?.is_empty());
        assert_eq!(IndexState::Merged, index.state());

        index.add(&TextDocument::new("d", "delta"), &mut splitter)?;
        assert_eq!(index.query("delta")?, ["d"]);
        assert_eq!(index.query_in_document_names("")?, ["a", "b", "d"]);

        Ok(())
    }

    #[test]
    fn index_rejects_oversized_path() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut index = Config::new(dir.path().join("index"))
            .block_format(BlockFormat::Simple)
            .open()?;
        let mut splitter = WordSplitter::new();

        index.add(&TextDocument::new("a", "alpha"), &mut splitter)?;

        let huge = "p/".repeat(4_500);
        assert!(matches!(
            index.add(&TextDocument::new(huge, "beta"), &mut splitter),
            Err(crate::Error::Encode(EncodeError::EntryTooLarge))
        ));

        assert_eq!(index.query_in_document_names("")?, ["a"]);
        assert!(index.query("beta")?.is_empty());

        index.add(&TextDocument::new("c", "beta"), &mut splitter)?;
        assert_eq!(index.query("beta")?, ["c"]);

        Ok(())
    }

    #[test]
    fn index_failed_merge_keeps_generation() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("index");
        let mut index = Config::new(&path).open()?;
        let mut splitter = WordSplitter::new();

        index.add(&TextDocument::new("a", "alpha"), &mut splitter)?;
        index.add(&TextDocument::new("b", "beta"), &mut splitter)?;
        index.save()?;

        let original = std::fs::read(&path)?;

        let first_word_block = IndexReader::open(&path, BlockFormat::default(), 0)?
            .summary()
            .first_word_block();

        let start = usize::try_from(block_offset(first_word_block)).expect("offset should fit");

        let mut corrupted = original.clone();
        corrupted
            .get_mut(start..start + BLOCK_SIZE)
            .expect("word block should exist")
            .fill(0xFF);
        std::fs::write(&path, &corrupted)?;

        index.add(&TextDocument::new("c", "gamma"), &mut splitter)?;
        index.remove("a")?;

        assert!(index.save().is_err());
        assert_eq!(IndexState::CanMerge, index.state());
        assert_eq!(corrupted, std::fs::read(&path)?);
        assert_eq!(1, std::fs::read_dir(dir.path())?.count());

        // Queries fall back to the previous generation
        assert_eq!(index.query_in_document_names("")?, ["a", "b"]);
        assert_eq!(IndexState::CanMerge, index.state());

        std::fs::write(&path, &original)?;
        index.save()?;

        assert_eq!(IndexState::Merged, index.state());
        assert_eq!(index.query("gamma")?, ["c"]);
        assert!(index.query("alpha")?.is_empty());
        assert_eq!(index.query_in_document_names("")?, ["b", "c"]);

        Ok(())
    }
}
