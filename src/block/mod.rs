// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Fixed-size on-disk blocks
//!
//! An index file is a sequence of [`BLOCK_SIZE`] blocks: the header block,
//! the file-list blocks, the word blocks and finally the summary.

pub mod file_list;
pub mod word;

use crate::coding::DecodeError;
use std::io::{Read, Seek, SeekFrom, Write};

/// Size of every block in bytes
pub const BLOCK_SIZE: usize = 8192;

/// Block number (block 0 is the header)
pub type BlockNum = u32;

/// Returns the byte offset of a block.
#[must_use]
pub fn block_offset(num: BlockNum) -> u64 {
    u64::from(num) * BLOCK_SIZE as u64
}

/// Reads block `num` into a new buffer.
///
/// # Errors
///
/// Will return `Err` if an IO error occurs. A block cut short by the end of
/// the file is reported as [`DecodeError::Truncated`].
pub fn read_block<R: Read + Seek>(reader: &mut R, num: BlockNum) -> crate::Result<Box<[u8]>> {
    reader.seek(SeekFrom::Start(block_offset(num)))?;

    let mut buf = vec![0; BLOCK_SIZE].into_boxed_slice();
    reader.read_exact(&mut buf).map_err(DecodeError::from)?;

    log::trace!("read block {num}");

    Ok(buf)
}

/// Writes `data` followed by zero padding up to the next block boundary.
///
/// Returns the number of blocks written.
///
/// # Errors
///
/// Will return `Err` if an IO error occurs.
#[expect(clippy::cast_possible_truncation, reason = "index files are far below 32 TiB")]
pub fn write_padded<W: Write>(writer: &mut W, data: &[u8]) -> std::io::Result<u32> {
    writer.write_all(data)?;

    let rest = data.len() % BLOCK_SIZE;
    if rest > 0 || data.is_empty() {
        let padding = if data.is_empty() { BLOCK_SIZE } else { BLOCK_SIZE - rest };
        writer.write_all(&vec![0; padding])?;
    }

    Ok(data.len().div_ceil(BLOCK_SIZE).max(1) as u32)
}

/// Returns the shared prefix of two strings, in chars and in bytes of `prev`.
///
/// At most `max_chars` chars are shared.
#[must_use]
pub fn shared_prefix(prev: &str, next: &str, max_chars: usize) -> (usize, usize) {
    let mut chars = 0;
    let mut bytes = 0;

    for (a, b) in prev.chars().zip(next.chars()) {
        if a != b || chars == max_chars {
            break;
        }
        chars += 1;
        bytes += a.len_utf8();
    }

    (chars, bytes)
}

/// Rebuilds a front-coded string from the previous one.
///
/// # Errors
///
/// Returns [`DecodeError::InvalidPrefix`] if `prev` has fewer than
/// `prefix_chars` chars.
pub fn expand_prefix(prev: &str, prefix_chars: usize, suffix: &str) -> Result<String, DecodeError> {
    let end = if prefix_chars == 0 {
        0
    } else {
        prev.char_indices()
            .nth(prefix_chars - 1)
            .map(|(idx, c)| idx + c.len_utf8())
            .ok_or(DecodeError::InvalidPrefix)?
    };

    let mut s = String::with_capacity(end + suffix.len());
    s.push_str(prev.get(..end).ok_or(DecodeError::InvalidPrefix)?);
    s.push_str(suffix);
    Ok(s)
}
