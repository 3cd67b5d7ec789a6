// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    block::{
        file_list::FileListBlock,
        word::{BlockFormat, EntryBlock, WordBlock},
        write_padded, BlockNum,
    },
    coding::{EncodeError, Encode},
    file::Header,
    summary::IndexSummary,
    IndexedFile, WordEntry,
};
use std::{
    fs::File,
    io::{BufWriter, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

/// Writes an index file block by block
///
/// All files have to be added (in path order, with dense ids starting at 1)
/// before the first word (in word order). The file is only valid after
/// [`IndexWriter::finish`] wrote the summary and the header.
pub struct IndexWriter {
    /// Index file path
    pub(crate) path: PathBuf,

    format: BlockFormat,

    /// File writer
    #[expect(clippy::struct_field_names)]
    file_writer: BufWriter<File>,

    summary: IndexSummary,

    file_block: FileListBlock,
    first_file_in_block: Option<IndexedFile>,

    word_block: WordBlock,
    first_word_in_block: Option<String>,

    /// Next block to be written
    next_block: BlockNum,

    prev_path: Option<String>,
    current_word: Option<String>,

    file_count: u32,
    word_count: u32,
}

impl IndexWriter {
    /// Creates (or truncates) an index file.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn create<P: AsRef<Path>>(path: P, format: BlockFormat) -> crate::Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        Self::from_file(file, path, format)
    }

    /// Starts writing an index into an already opened, empty file.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn from_file<P: Into<PathBuf>>(
        file: File,
        path: P,
        format: BlockFormat,
    ) -> crate::Result<Self> {
        let mut file_writer = BufWriter::with_capacity(u16::MAX.into(), file);

        // The header is rewritten once the summary location is known
        write_padded(&mut file_writer, &[])?;

        Ok(Self {
            path: path.into(),
            format,
            file_writer,
            summary: IndexSummary::default(),
            file_block: FileListBlock::new(),
            first_file_in_block: None,
            word_block: format.new_block(),
            first_word_in_block: None,
            next_block: 1,
            prev_path: None,
            current_word: None,
            file_count: 0,
            word_count: 0,
        })
    }

    /// Returns the number of files written so far.
    #[must_use]
    pub fn file_count(&self) -> u32 {
        self.file_count
    }

    /// Returns the number of distinct words written so far.
    #[must_use]
    pub fn word_count(&self) -> u32 {
        self.word_count
    }

    /// Writes a file entry.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ContractViolation`] if a word was already
    /// written, the path is empty or out of order, or the id is not the next
    /// one.
    pub fn add_file(&mut self, file: &IndexedFile) -> crate::Result<()> {
        if self.current_word.is_some() {
            return Err(crate::Error::ContractViolation(
                "all files must be added before any word",
            ));
        }
        if file.path().is_empty() {
            return Err(crate::Error::ContractViolation("cannot write an empty path"));
        }
        if Some(file.id()) != self.file_count.checked_add(1) {
            return Err(crate::Error::ContractViolation(
                "file ids must be dense and start at 1",
            ));
        }
        if self.prev_path.as_deref().is_some_and(|prev| prev >= file.path()) {
            return Err(crate::Error::ContractViolation(
                "files must be added in path order",
            ));
        }

        if !self.file_block.add_file(file)? {
            self.spill_file_block()?;

            if !self.file_block.add_file(file)? {
                return Err(EncodeError::EntryTooLarge.into());
            }
        }

        if self.first_file_in_block.is_none() {
            self.first_file_in_block = Some(file.clone());
        }

        self.prev_path = Some(file.path().to_owned());
        self.file_count += 1;

        Ok(())
    }

    /// Writes a word entry.
    ///
    /// Entries without refs are skipped. Entries of the same word may be
    /// written repeatedly; a posting list too large for one block is split
    /// into consecutive entries.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ContractViolation`] if the word is empty or
    /// out of order.
    pub fn add_word(&mut self, entry: &WordEntry) -> crate::Result<()> {
        if entry.word().is_empty() {
            return Err(crate::Error::ContractViolation("cannot write an empty word"));
        }
        if entry.is_empty() {
            return Ok(());
        }

        match self.current_word.as_deref() {
            None => {
                self.spill_file_block()?;
                self.summary.set_first_word_block(self.next_block);
            }
            Some(current) if current > entry.word() => {
                return Err(crate::Error::ContractViolation(
                    "words must be added in order",
                ));
            }
            Some(_) => {}
        }

        if self.current_word.as_deref() != Some(entry.word()) {
            self.current_word = Some(entry.word().to_owned());
            self.word_count += 1;
        }

        self.write_entry(entry)
    }

    fn write_entry(&mut self, entry: &WordEntry) -> crate::Result<()> {
        if self.word_block.add_entry(entry)? {
            self.mark_first_word(entry);
            return Ok(());
        }

        if !self.word_block.is_empty() {
            self.spill_word_block()?;

            if self.word_block.add_entry(entry)? {
                self.mark_first_word(entry);
                return Ok(());
            }
        }

        // Does not even fit into an empty block
        if entry.len() < 2 {
            return Err(EncodeError::EntryTooLarge.into());
        }

        log::trace!(
            "Splitting posting list of {:?} ({} refs) at {}",
            entry.word(),
            entry.len(),
            self.path.display(),
        );

        let mut head = entry.clone();
        let tail = head.split_off(head.len() / 2);

        self.write_entry(&head)?;
        self.write_entry(&tail)
    }

    fn mark_first_word(&mut self, entry: &WordEntry) {
        if self.first_word_in_block.is_none() {
            self.first_word_in_block = Some(entry.word().to_owned());
        }
    }

    /// Writes the current file-list block to disk.
    fn spill_file_block(&mut self) -> crate::Result<()> {
        let Some(first) = self.first_file_in_block.take() else {
            return Ok(());
        };

        write_padded(&mut self.file_writer, self.file_block.bytes())?;

        log::trace!(
            "Wrote file block {} with {} files",
            self.next_block,
            self.file_block.len(),
        );

        self.summary.add_first_file_in_block(first, self.next_block);
        self.next_block += 1;
        self.file_block.reset();

        Ok(())
    }

    /// Writes the current word block to disk.
    fn spill_word_block(&mut self) -> crate::Result<()> {
        let Some(first) = self.first_word_in_block.take() else {
            return Ok(());
        };

        write_padded(&mut self.file_writer, self.word_block.bytes())?;

        log::trace!(
            "Wrote {} word block {} with {} entries",
            self.format,
            self.next_block,
            self.word_block.len(),
        );

        self.summary.add_first_word_in_block(first, self.next_block);
        self.next_block += 1;
        self.word_block.reset();

        Ok(())
    }

    /// Writes the pending blocks, the summary and the header, and syncs the file.
    ///
    /// Returns the summary of the written file.
    ///
    /// # Errors
    ///
    /// Will return `Err` if an IO error occurs.
    pub fn finish(mut self) -> crate::Result<IndexSummary> {
        self.spill_file_block()?;

        if self.current_word.is_none() {
            self.summary.set_first_word_block(self.next_block);
        }
        self.spill_word_block()?;

        self.summary.set_counts(self.file_count, self.word_count);

        let summary_block = self.next_block;
        let summary_bytes = self.summary.encode_into_vec()?;
        write_padded(&mut self.file_writer, &summary_bytes)?;

        // Rewrite the header now that the summary is placed
        self.file_writer.seek(SeekFrom::Start(0))?;
        Header { summary_block }.encode_into(&mut self.file_writer)?;

        self.file_writer.flush()?;
        self.file_writer.get_ref().sync_all()?;

        log::debug!(
            "Finished index file {} with {} files, {} words, summary at block {summary_block}",
            self.path.display(),
            self.file_count,
            self.word_count,
        );

        Ok(self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BLOCK_SIZE;
    use test_log::test;

    #[test]
    fn writer_empty_index() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("empty.index");

        let summary = IndexWriter::create(&path, BlockFormat::default())?.finish()?;
        assert_eq!(0, summary.num_files());
        assert_eq!(1, summary.first_word_block());

        // Header plus summary
        assert_eq!(2 * BLOCK_SIZE as u64, std::fs::metadata(&path)?.len());

        Ok(())
    }

    #[test]
    fn writer_contract() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut writer = IndexWriter::create(dir.path().join("index"), BlockFormat::default())?;

        assert!(matches!(
            writer.add_file(&IndexedFile::new("a", 2)),
            Err(crate::Error::ContractViolation(_))
        ));

        writer.add_file(&IndexedFile::new("b", 1))?;

        assert!(matches!(
            writer.add_file(&IndexedFile::new("a", 2)),
            Err(crate::Error::ContractViolation(_))
        ));
        assert!(matches!(
            writer.add_file(&IndexedFile::new("", 2)),
            Err(crate::Error::ContractViolation(_))
        ));

        writer.add_word(&WordEntry::with_refs("m", vec![1]))?;

        assert!(matches!(
            writer.add_file(&IndexedFile::new("c", 2)),
            Err(crate::Error::ContractViolation(_))
        ));
        assert!(matches!(
            writer.add_word(&WordEntry::with_refs("a", vec![1])),
            Err(crate::Error::ContractViolation(_))
        ));

        // Skipped, but not out of order
        writer.add_word(&WordEntry::new("n"))?;
        writer.add_word(&WordEntry::with_refs("m", vec![1]))?;

        let summary = writer.finish()?;
        assert_eq!(1, summary.num_files());
        assert_eq!(1, summary.num_words());

        Ok(())
    }

    #[test]
    fn writer_splits_oversized_posting_list() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let mut writer = IndexWriter::create(dir.path().join("index"), BlockFormat::Simple)?;

        for id in 1..=5_000 {
            writer.add_file(&IndexedFile::new(format!("{id:0>5}"), id))?;
        }
        writer.add_word(&WordEntry::with_refs("all", (1..=5_000).collect()))?;
        writer.add_word(&WordEntry::with_refs("zed", vec![3]))?;

        let summary = writer.finish()?;
        assert_eq!(2, summary.num_words());

        // 20 KB of refs need at least 3 blocks
        assert!(summary.get_block_nums_for_word("all").len() >= 3);
        assert_eq!(
            Some(&"all".to_owned()),
            summary.first_words().first().map(|w| &w.word)
        );

        Ok(())
    }
}
