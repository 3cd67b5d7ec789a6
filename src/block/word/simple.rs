// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Uncompressed word blocks
//!
//! ```text
//! ([word: utf] [count: u32] [ref: u32]*)* [0: u16]
//! ```

use super::EntryBlock;
use crate::{block::BLOCK_SIZE, coding::DecodeError, field::Field, mutf8, WordEntry};
use byteorder::{BigEndian, ReadBytesExt};

/// Length of an empty string
const TERMINATOR_LEN: usize = 2;

/// Builds one uncompressed word block
pub struct SimpleWordBlock {
    field: Field,
    offset: usize,
    count: usize,
}

impl Default for SimpleWordBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimpleWordBlock {
    /// Creates an empty block.
    #[must_use]
    pub fn new() -> Self {
        Self {
            field: Field::new(BLOCK_SIZE),
            offset: 0,
            count: 0,
        }
    }
}

impl EntryBlock for SimpleWordBlock {
    #[expect(clippy::cast_possible_truncation, reason = "entry fits in a block")]
    fn add_entry(&mut self, entry: &WordEntry) -> crate::Result<bool> {
        if entry.word().is_empty() {
            return Err(crate::Error::ContractViolation("cannot write an empty word"));
        }
        if entry.is_empty() {
            return Err(crate::Error::ContractViolation(
                "cannot write a word without refs",
            ));
        }

        let word_len = mutf8::encoded_len(entry.word());
        let entry_len = mutf8::prefix_len(word_len) + word_len + 4 + 4 * entry.len();

        if self.offset.saturating_add(entry_len) + TERMINATOR_LEN > BLOCK_SIZE {
            return Ok(false);
        }

        self.offset += self.field.put_utf(self.offset, entry.word())?;
        self.field.put_uint(self.offset, 4, entry.len() as u32)?;
        self.offset += 4;

        for &id in entry.refs() {
            self.field.put_uint(self.offset, 4, id)?;
            self.offset += 4;
        }

        self.count += 1;
        Ok(true)
    }

    fn len(&self) -> usize {
        self.count
    }

    fn bytes(&self) -> &[u8] {
        self.field.bytes().get(..self.offset).unwrap_or_default()
    }

    fn reset(&mut self) {
        self.field.clear();
        self.offset = 0;
        self.count = 0;
    }
}

/// Decodes an uncompressed word block
pub struct SimpleWordReader<'a> {
    bytes: &'a [u8],
    done: bool,
}

impl<'a> SimpleWordReader<'a> {
    /// Starts decoding a raw block.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, done: false }
    }

    /// Decodes the next entry, or returns `None` at the terminator.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the block is malformed.
    pub fn next_entry(&mut self) -> Result<Option<WordEntry>, DecodeError> {
        if self.done || self.bytes.len() < TERMINATOR_LEN {
            self.done = true;
            return Ok(None);
        }

        let word = mutf8::read_utf(&mut self.bytes)?;
        if word.is_empty() {
            self.done = true;
            return Ok(None);
        }

        let count = self.bytes.read_u32::<BigEndian>()? as usize;
        if count.saturating_mul(4) > self.bytes.len() {
            return Err(DecodeError::Truncated);
        }

        let refs = (0..count)
            .map(|_| self.bytes.read_u32::<BigEndian>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(WordEntry::with_refs(word, refs)))
    }
}
