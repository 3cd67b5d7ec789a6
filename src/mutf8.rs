// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Modified UTF-8, the legacy variant where NUL takes two bytes and
//! supplementary characters are written as a surrogate pair of
//! three-byte sequences.
//!
//! Strings are prefixed by a big-endian `u16` byte length. Lengths of
//! `0xFFFF` and above write the [`LONG_LENGTH_ESCAPE`] followed by a
//! `u32` length.

use crate::coding::{DecodeError, EncodeError};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Length prefix value announcing a 4-byte length
pub const LONG_LENGTH_ESCAPE: u16 = u16::MAX;

/// Returns the number of bytes `s` takes in modified UTF-8 (without prefix).
#[must_use]
pub fn encoded_len(s: &str) -> usize {
    s.encode_utf16().map(unit_len).sum()
}

/// Returns the size of the length prefix for a body of `len` bytes.
#[must_use]
pub fn prefix_len(len: usize) -> usize {
    if len < usize::from(LONG_LENGTH_ESCAPE) {
        2
    } else {
        6
    }
}

fn unit_len(unit: u16) -> usize {
    match unit {
        0x0001..=0x007F => 1,
        0x0000 | 0x0080..=0x07FF => 2,
        _ => 3,
    }
}

/// Encodes `s` into modified UTF-8 bytes (without prefix).
#[must_use]
#[expect(clippy::cast_possible_truncation, reason = "masked to a byte")]
pub fn encode(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());

    for unit in s.encode_utf16() {
        match unit_len(unit) {
            1 => out.push(unit as u8),
            2 => {
                out.push(0xC0 | ((unit >> 6) & 0x1F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | ((unit >> 12) & 0x0F) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }

    out
}

/// Decodes modified UTF-8 bytes (without prefix) into a string.
///
/// # Errors
///
/// Returns [`DecodeError::InvalidUtf`] on malformed sequences or
/// unpaired surrogates.
pub fn decode(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied();

    while let Some(a) = iter.next() {
        let unit = match a >> 4 {
            0x0..=0x7 => u16::from(a),
            0xC | 0xD => {
                let b = continuation(iter.next())?;
                (u16::from(a & 0x1F) << 6) | b
            }
            0xE => {
                let b = continuation(iter.next())?;
                let c = continuation(iter.next())?;
                (u16::from(a & 0x0F) << 12) | (b << 6) | c
            }
            _ => return Err(DecodeError::InvalidUtf),
        };
        units.push(unit);
    }

    String::from_utf16(&units).map_err(|_| DecodeError::InvalidUtf)
}

fn continuation(byte: Option<u8>) -> Result<u16, DecodeError> {
    match byte {
        Some(b) if b & 0xC0 == 0x80 => Ok(u16::from(b & 0x3F)),
        _ => Err(DecodeError::InvalidUtf),
    }
}

/// Writes a length-prefixed modified UTF-8 string.
///
/// # Errors
///
/// Will return `Err` if an IO error occurs, or the string is longer than `u32::MAX` bytes.
pub fn write_utf<W: Write>(writer: &mut W, s: &str) -> Result<(), EncodeError> {
    let bytes = encode(s);
    write_len(writer, bytes.len())?;
    writer.write_all(&bytes)?;
    Ok(())
}

fn write_len<W: Write>(writer: &mut W, len: usize) -> Result<(), EncodeError> {
    if let Ok(short) = u16::try_from(len) {
        if short != LONG_LENGTH_ESCAPE {
            writer.write_u16::<BigEndian>(short)?;
            return Ok(());
        }
    }

    let long = u32::try_from(len).map_err(|_| EncodeError::StringTooLong(len))?;
    writer.write_u16::<BigEndian>(LONG_LENGTH_ESCAPE)?;
    writer.write_u32::<BigEndian>(long)?;
    Ok(())
}

/// Reads a length-prefixed modified UTF-8 string.
///
/// # Errors
///
/// Will return `Err` if an IO error occurs, or the bytes are malformed.
pub fn read_utf<R: Read>(reader: &mut R) -> Result<String, DecodeError> {
    let len = match reader.read_u16::<BigEndian>()? {
        LONG_LENGTH_ESCAPE => reader.read_u32::<BigEndian>()? as usize,
        short => usize::from(short),
    };

    // Grow while reading, a corrupt length must not allocate up front
    let mut bytes = Vec::with_capacity(len.min(4_096));
    reader.by_ref().take(len as u64).read_to_end(&mut bytes)?;

    if bytes.len() < len {
        return Err(DecodeError::Truncated);
    }

    decode(&bytes)
}
