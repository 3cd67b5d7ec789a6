// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Word blocks
//!
//! Two encodings exist: the gamma-compressed default and a simple,
//! uncompressed one. The encoding is not stored in the file, so a file must
//! be read with the [`BlockFormat`] it was written with.

mod compressed;
mod simple;

pub use compressed::{CompressedWordBlock, CompressedWordReader};
pub use simple::{SimpleWordBlock, SimpleWordReader};

use crate::{coding::DecodeError, WordEntry};
use enum_dispatch::enum_dispatch;

/// Encoding of word blocks
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum BlockFormat {
    /// Full words, 4-byte counts and 4-byte refs
    Simple,

    /// Front-coded words, gamma-coded counts and ref deltas
    #[default]
    GammaCompressed,
}

impl BlockFormat {
    /// Creates an empty block builder.
    #[must_use]
    pub fn new_block(self) -> WordBlock {
        match self {
            Self::Simple => SimpleWordBlock::new().into(),
            Self::GammaCompressed => CompressedWordBlock::new().into(),
        }
    }

    /// Starts decoding a raw block.
    #[must_use]
    pub fn reader(self, bytes: &[u8]) -> WordBlockReader<'_> {
        match self {
            Self::Simple => WordBlockReader::Simple(SimpleWordReader::new(bytes)),
            Self::GammaCompressed => WordBlockReader::Compressed(CompressedWordReader::new(bytes)),
        }
    }

    /// Decodes all entries of a raw block, coalescing equal words.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the block is malformed.
    pub fn decode(self, bytes: &[u8]) -> Result<Vec<WordEntry>, DecodeError> {
        let mut reader = self.reader(bytes);
        let mut entries = vec![];

        while let Some(entry) = reader.next_entry()? {
            push_coalesced(&mut entries, entry);
        }

        Ok(entries)
    }
}

impl std::fmt::Display for BlockFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Simple => "simple",
                Self::GammaCompressed => "gamma",
            }
        )
    }
}

/// Appends an entry, merging it into the last one if the words are equal.
pub fn push_coalesced(entries: &mut Vec<WordEntry>, entry: WordEntry) {
    match entries.last_mut() {
        Some(last) if last.word() == entry.word() => last.merge_refs(entry.refs()),
        _ => entries.push(entry),
    }
}

/// Builder of one word block
#[enum_dispatch]
pub trait EntryBlock {
    /// Appends an entry.
    ///
    /// Returns `false` if the entry does not fit; the block is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ContractViolation`] for an empty word or an
    /// entry without refs.
    fn add_entry(&mut self, entry: &WordEntry) -> crate::Result<bool>;

    /// Returns the number of entries.
    fn len(&self) -> usize;

    /// Returns `true` if the block holds no entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the encoded block, at most a block long.
    fn bytes(&self) -> &[u8];

    /// Clears the block for reuse.
    fn reset(&mut self);
}

/// Word block builder of either format
#[enum_dispatch(EntryBlock)]
pub enum WordBlock {
    /// Uncompressed
    Simple(SimpleWordBlock),

    /// Gamma-compressed
    Compressed(CompressedWordBlock),
}

/// Decodes the entries of a word block in write order
pub enum WordBlockReader<'a> {
    /// Uncompressed
    Simple(SimpleWordReader<'a>),

    /// Gamma-compressed
    Compressed(CompressedWordReader<'a>),
}

impl WordBlockReader<'_> {
    /// Decodes the next entry, or returns `None` at the terminator.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the block is malformed.
    pub fn next_entry(&mut self) -> Result<Option<WordEntry>, DecodeError> {
        match self {
            Self::Simple(reader) => reader.next_entry(),
            Self::Compressed(reader) => reader.next_entry(),
        }
    }
}

impl Iterator for WordBlockReader<'_> {
    type Item = Result<WordEntry, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}
