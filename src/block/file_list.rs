// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! File-list blocks
//!
//! ```text
//! [first id: u32] ([prefix chars: u16] [suffix: utf])* [0: u16] [0: u16]
//! ```
//!
//! Ids are dense inside a block, so only the first one is stored.

use super::{expand_prefix, shared_prefix, BLOCK_SIZE};
use crate::{
    coding::{DecodeError, EncodeError},
    field::Field,
    mutf8, DocumentId, IndexedFile,
};

const HEADER_LEN: usize = 4;

/// An empty prefix plus an empty string
const TERMINATOR_LEN: usize = 4;

/// Builds one file-list block
pub struct FileListBlock {
    field: Field,
    offset: usize,
    prev_path: String,
    first_id: DocumentId,
    count: usize,
}

impl Default for FileListBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl FileListBlock {
    /// Creates an empty block.
    #[must_use]
    pub fn new() -> Self {
        Self {
            field: Field::new(BLOCK_SIZE),
            offset: HEADER_LEN,
            prev_path: String::new(),
            first_id: 0,
            count: 0,
        }
    }

    /// Appends a file, front-coded against the previous one.
    ///
    /// Returns `false` if the file does not fit; the block is left untouched.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the path cannot be encoded.
    #[expect(clippy::cast_possible_truncation, reason = "prefix is capped at u16::MAX")]
    pub fn add_file(&mut self, file: &IndexedFile) -> Result<bool, EncodeError> {
        debug_assert!(
            self.count == 0 || file.id() as usize == self.first_id as usize + self.count,
            "file ids must be dense inside a block",
        );

        let (prefix_chars, prefix_bytes) =
            shared_prefix(&self.prev_path, file.path(), usize::from(u16::MAX));
        let suffix = file.path().get(prefix_bytes..).unwrap_or_default();

        let suffix_len = mutf8::encoded_len(suffix);
        let entry_len = 2 + mutf8::prefix_len(suffix_len) + suffix_len;

        if self.offset + entry_len + TERMINATOR_LEN > BLOCK_SIZE {
            return Ok(false);
        }

        if self.count == 0 {
            self.first_id = file.id();
            self.field.put_uint(0, 4, file.id())?;
        }

        self.field.put_uint(self.offset, 2, prefix_chars as u32)?;
        self.offset += 2;
        self.offset += self.field.put_utf(self.offset, suffix)?;

        file.path().clone_into(&mut self.prev_path);
        self.count += 1;

        Ok(true)
    }

    /// Returns the number of files in the block.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the block holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the raw block.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.field.bytes()
    }

    /// Clears the block for reuse.
    pub fn reset(&mut self) {
        self.field.clear();
        self.offset = HEADER_LEN;
        self.prev_path.clear();
        self.first_id = 0;
        self.count = 0;
    }

    /// Decodes all files of a raw block.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the block is malformed.
    pub fn decode(bytes: Box<[u8]>) -> Result<Vec<IndexedFile>, DecodeError> {
        FileListReader::new(Field::from_bytes(bytes))?.collect()
    }
}

/// Decodes the files of a block in write order
pub struct FileListReader {
    field: Field,
    offset: usize,
    prev_path: String,
    next_id: DocumentId,
    done: bool,
}

impl FileListReader {
    /// Starts decoding a raw block.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the block is too short.
    pub fn new(field: Field) -> Result<Self, DecodeError> {
        let next_id = field.get_uint(0, 4)?;

        Ok(Self {
            field,
            offset: HEADER_LEN,
            prev_path: String::new(),
            next_id,
            done: false,
        })
    }

    /// Decodes the next file, or returns `None` at the terminator.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the block is malformed.
    pub fn next_entry(&mut self) -> Result<Option<IndexedFile>, DecodeError> {
        if self.done || self.offset + TERMINATOR_LEN > self.field.len() {
            self.done = true;
            return Ok(None);
        }

        let prefix_chars = self.field.get_uint(self.offset, 2)? as usize;
        let (suffix, len) = self.field.get_utf(self.offset + 2)?;

        if prefix_chars == 0 && suffix.is_empty() {
            self.done = true;
            return Ok(None);
        }

        let path = expand_prefix(&self.prev_path, prefix_chars, &suffix)?;
        self.offset += 2 + len;

        let file = IndexedFile::new(path, self.next_id);
        file.path().clone_into(&mut self.prev_path);
        self.next_id = self.next_id.checked_add(1).ok_or(DecodeError::Truncated)?;

        Ok(Some(file))
    }
}

impl Iterator for FileListReader {
    type Item = Result<IndexedFile, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}
