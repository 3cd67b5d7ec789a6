// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Gamma-compressed word blocks
//!
//! The whole block is one bit stream of entries:
//!
//! ```text
//! [prefix chars: u8] [suffix: utf] [count: gamma] [delta: gamma]*
//! ```
//!
//! Deltas start from an implicit 0. An entry with an empty prefix and an
//! empty suffix terminates the block.

use super::EntryBlock;
use crate::{
    bit_stream::{BitReader, BitWriter},
    block::{expand_prefix, shared_prefix, BLOCK_SIZE},
    coding::{DecodeError, EncodeError},
    WordEntry,
};

const CAPACITY_BITS: usize = BLOCK_SIZE * 8;

/// Empty prefix byte plus the length of an empty string
const TERMINATOR_BITS: usize = 8 + 16;

/// Builds one gamma-compressed word block
pub struct CompressedWordBlock {
    stream: BitWriter,
    prev_word: String,
    count: usize,
}

impl Default for CompressedWordBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressedWordBlock {
    /// Creates an empty block.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stream: BitWriter::with_capacity(BLOCK_SIZE),
            prev_word: String::new(),
            count: 0,
        }
    }

    #[expect(clippy::cast_possible_truncation, reason = "prefix is capped at u8::MAX")]
    fn encode_entry(&mut self, entry: &WordEntry) -> Result<(), EncodeError> {
        let (prefix_chars, prefix_bytes) =
            shared_prefix(&self.prev_word, entry.word(), usize::from(u8::MAX));

        self.stream.write_byte(prefix_chars as u8);
        self.stream
            .write_utf(entry.word().get(prefix_bytes..).unwrap_or_default())?;

        let count = u32::try_from(entry.len()).map_err(|_| EncodeError::EntryTooLarge)?;
        self.stream.write_gamma(count)?;

        let mut prev = 0;
        for &id in entry.refs() {
            let delta = id.checked_sub(prev).ok_or(EncodeError::NonPositiveGamma)?;
            self.stream.write_gamma(delta)?;
            prev = id;

            if self.stream.bit_len() > CAPACITY_BITS {
                // Will be rolled back anyway
                break;
            }
        }

        Ok(())
    }
}

impl EntryBlock for CompressedWordBlock {
    fn add_entry(&mut self, entry: &WordEntry) -> crate::Result<bool> {
        if entry.word().is_empty() {
            return Err(crate::Error::ContractViolation("cannot write an empty word"));
        }
        if entry.is_empty() {
            return Err(crate::Error::ContractViolation(
                "cannot write a word without refs",
            ));
        }

        let mark = self.stream.bit_len();

        if let Err(e) = self.encode_entry(entry) {
            self.stream.truncate(mark);
            return Err(e.into());
        }

        if self.stream.bit_len() + TERMINATOR_BITS > CAPACITY_BITS {
            self.stream.truncate(mark);
            return Ok(false);
        }

        entry.word().clone_into(&mut self.prev_word);
        self.count += 1;

        Ok(true)
    }

    fn len(&self) -> usize {
        self.count
    }

    fn bytes(&self) -> &[u8] {
        self.stream.as_bytes()
    }

    fn reset(&mut self) {
        self.stream.clear();
        self.prev_word.clear();
        self.count = 0;
    }
}

/// Decodes a gamma-compressed word block
pub struct CompressedWordReader<'a> {
    stream: BitReader<'a>,
    prev_word: String,
    done: bool,
}

impl<'a> CompressedWordReader<'a> {
    /// Starts decoding a raw block.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            stream: BitReader::new(bytes),
            prev_word: String::new(),
            done: false,
        }
    }

    /// Decodes the next entry, or returns `None` at the terminator.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the block is malformed.
    pub fn next_entry(&mut self) -> Result<Option<WordEntry>, DecodeError> {
        if self.done || self.stream.remaining_bits() < TERMINATOR_BITS {
            self.done = true;
            return Ok(None);
        }

        let prefix_chars = usize::from(self.stream.read_byte()?);
        let suffix = self.stream.read_utf()?;

        if prefix_chars == 0 && suffix.is_empty() {
            self.done = true;
            return Ok(None);
        }

        let word = expand_prefix(&self.prev_word, prefix_chars, &suffix)?;

        let count = self.stream.read_gamma()? as usize;

        // Every delta takes at least one bit
        if count > self.stream.remaining_bits() {
            return Err(DecodeError::Truncated);
        }

        let mut refs = Vec::with_capacity(count);
        let mut prev = 0u32;

        for _ in 0..count {
            let delta = self.stream.read_gamma()?;
            prev = prev.checked_add(delta).ok_or(DecodeError::InvalidGamma)?;
            refs.push(prev);
        }

        word.clone_into(&mut self.prev_word);

        Ok(Some(WordEntry::with_refs(word, refs)))
    }
}
