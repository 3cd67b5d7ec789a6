// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Sparse index over the blocks of an index file
//!
//! For every block, the summary keeps its first file (or first word), so
//! that the block holding a key is found with a binary search.
//!
//! ```text
//! [file count: u32] [word count: u32] [first word block: u32]
//! [n: u32] ([path: utf] [id: u32] [block: u32])*
//! [m: u32] ([word: utf] [block: u32])*
//! ```

use crate::{
    block::BlockNum,
    coding::{Decode, DecodeError, Encode, EncodeError},
    mutf8, DocumentId, IndexedFile,
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// First file of a file-list block
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FirstFileInBlock {
    /// First file
    pub file: IndexedFile,

    /// Block holding it
    pub block: BlockNum,
}

/// First word of a word block
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FirstWordInBlock {
    /// First word
    pub word: String,

    /// Block holding it
    pub block: BlockNum,
}

/// Sparse block index, stored at the end of an index file
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IndexSummary {
    num_files: u32,
    num_words: u32,
    first_word_block: BlockNum,
    first_files: Vec<FirstFileInBlock>,
    first_words: Vec<FirstWordInBlock>,
}

impl IndexSummary {
    /// Registers a sealed file-list block.
    pub fn add_first_file_in_block(&mut self, file: IndexedFile, block: BlockNum) {
        debug_assert!(
            self.first_files.last().is_none_or(|last| last.file < file),
            "file blocks must be added in order",
        );
        self.first_files.push(FirstFileInBlock { file, block });
    }

    /// Registers a sealed word block.
    pub fn add_first_word_in_block<S: Into<String>>(&mut self, word: S, block: BlockNum) {
        self.first_words.push(FirstWordInBlock {
            word: word.into(),
            block,
        });
    }

    /// Sets the total counts.
    pub fn set_counts(&mut self, num_files: u32, num_words: u32) {
        self.num_files = num_files;
        self.num_words = num_words;
    }

    /// Sets the block number of the first word block.
    pub fn set_first_word_block(&mut self, block: BlockNum) {
        self.first_word_block = block;
    }

    /// Returns the number of files.
    #[must_use]
    pub fn num_files(&self) -> u32 {
        self.num_files
    }

    /// Returns the number of distinct words.
    #[must_use]
    pub fn num_words(&self) -> u32 {
        self.num_words
    }

    /// Returns the block number of the first word block.
    #[must_use]
    pub fn first_word_block(&self) -> BlockNum {
        self.first_word_block
    }

    /// Returns all file-list block numbers in order.
    pub fn file_block_nums(&self) -> impl Iterator<Item = BlockNum> + '_ {
        self.first_files.iter().map(|f| f.block)
    }

    /// Returns all word block numbers in order.
    pub fn word_block_nums(&self) -> impl Iterator<Item = BlockNum> + '_ {
        self.first_words.iter().map(|w| w.block)
    }

    /// Returns the block whose first id is the greatest one `<= id`.
    #[must_use]
    pub fn get_block_num_for_file_num(&self, id: DocumentId) -> Option<BlockNum> {
        let idx = self.first_files.partition_point(|f| f.file.id() <= id);
        idx.checked_sub(1)
            .and_then(|idx| self.first_files.get(idx))
            .map(|f| f.block)
    }

    /// Returns the block whose first path is the greatest one `<= path`.
    #[must_use]
    pub fn get_block_num_for_path(&self, path: &str) -> Option<BlockNum> {
        let idx = self.first_files.partition_point(|f| f.file.path() <= path);
        idx.checked_sub(1)
            .and_then(|idx| self.first_files.get(idx))
            .map(|f| f.block)
    }

    /// Returns the block whose first word is the greatest one `<= word`.
    #[must_use]
    pub fn get_block_num_for_word(&self, word: &str) -> Option<BlockNum> {
        let idx = self.first_words.partition_point(|w| w.word.as_str() <= word);
        idx.checked_sub(1)
            .and_then(|idx| self.first_words.get(idx))
            .map(|w| w.block)
    }

    /// Returns every block that may hold `word`.
    ///
    /// An oversized posting list is split over consecutive blocks, so the
    /// run starts at the block before the first one starting with `word`.
    #[must_use]
    pub fn get_block_nums_for_word(&self, word: &str) -> Vec<BlockNum> {
        let end = self.first_words.partition_point(|w| w.word.as_str() <= word);
        if end == 0 {
            return vec![];
        }

        let start = self
            .first_words
            .partition_point(|w| w.word.as_str() < word)
            .saturating_sub(1);

        self.first_words
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .map(|w| w.block)
            .collect()
    }

    /// Returns the location (not the block number) of the first block that
    /// may hold a word starting with `prefix`.
    #[must_use]
    pub fn get_first_block_location_for_prefix(&self, prefix: &str) -> Option<usize> {
        let idx = self
            .first_words
            .partition_point(|w| w.word.as_str() < prefix);

        if idx == 0 {
            // Nothing sorts before the prefix, the run starts right here
            return self
                .first_words
                .first()
                .filter(|w| w.word.starts_with(prefix))
                .map(|_| 0);
        }

        // The previous block may end with words of the prefix
        Some(idx - 1)
    }

    /// Returns the location following `location` if its block still starts
    /// with `prefix`.
    #[must_use]
    pub fn get_next_block_location_for_prefix(
        &self,
        prefix: &str,
        location: usize,
    ) -> Option<usize> {
        let next = location + 1;

        self.first_words
            .get(next)
            .filter(|w| w.word.starts_with(prefix))
            .map(|_| next)
    }

    /// Returns the contiguous run of blocks that may hold words starting
    /// with `prefix`.
    #[must_use]
    pub fn get_block_nums_for_prefix(&self, prefix: &str) -> Vec<BlockNum> {
        let mut blocks = vec![];
        let mut location = self.get_first_block_location_for_prefix(prefix);

        while let Some(loc) = location {
            if let Some(w) = self.first_words.get(loc) {
                blocks.push(w.block);
            }
            location = self.get_next_block_location_for_prefix(prefix, loc);
        }

        blocks
    }

    /// Returns the first files of all file-list blocks.
    #[must_use]
    pub fn first_files(&self) -> &[FirstFileInBlock] {
        &self.first_files
    }

    /// Returns the first words of all word blocks.
    #[must_use]
    pub fn first_words(&self) -> &[FirstWordInBlock] {
        &self.first_words
    }
}

fn write_len<W: Write>(writer: &mut W, len: usize) -> Result<(), EncodeError> {
    let len = u32::try_from(len).map_err(|_| EncodeError::EntryTooLarge)?;
    writer.write_u32::<BigEndian>(len)?;
    Ok(())
}

impl Encode for IndexSummary {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u32::<BigEndian>(self.num_files)?;
        writer.write_u32::<BigEndian>(self.num_words)?;
        writer.write_u32::<BigEndian>(self.first_word_block)?;

        write_len(writer, self.first_files.len())?;
        for entry in &self.first_files {
            mutf8::write_utf(writer, entry.file.path())?;
            writer.write_u32::<BigEndian>(entry.file.id())?;
            writer.write_u32::<BigEndian>(entry.block)?;
        }

        write_len(writer, self.first_words.len())?;
        for entry in &self.first_words {
            mutf8::write_utf(writer, &entry.word)?;
            writer.write_u32::<BigEndian>(entry.block)?;
        }

        Ok(())
    }
}

impl Decode for IndexSummary {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let num_files = reader.read_u32::<BigEndian>()?;
        let num_words = reader.read_u32::<BigEndian>()?;
        let first_word_block = reader.read_u32::<BigEndian>()?;

        let file_count = reader.read_u32::<BigEndian>()?;
        let mut first_files = Vec::with_capacity(file_count.min(1_024) as usize);

        for _ in 0..file_count {
            let path = mutf8::read_utf(reader)?;
            let id = reader.read_u32::<BigEndian>()?;
            let block = reader.read_u32::<BigEndian>()?;

            first_files.push(FirstFileInBlock {
                file: IndexedFile::new(path, id),
                block,
            });
        }

        let word_count = reader.read_u32::<BigEndian>()?;
        let mut first_words = Vec::with_capacity(word_count.min(1_024) as usize);

        for _ in 0..word_count {
            let word = mutf8::read_utf(reader)?;
            let block = reader.read_u32::<BigEndian>()?;
            first_words.push(FirstWordInBlock { word, block });
        }

        Ok(Self {
            num_files,
            num_words,
            first_word_block,
            first_files,
            first_words,
        })
    }
}
