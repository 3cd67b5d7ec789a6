// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    coding::{DecodeError, EncodeError},
    mutf8,
};

/// Fixed-size byte buffer with big-endian integer and string access at
/// arbitrary byte offsets.
///
/// A field never grows; every write past its end fails with
/// [`EncodeError::EntryTooLarge`], so callers size-check before writing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Field(Box<[u8]>);

impl Field {
    /// Creates a zeroed field of `size` bytes.
    #[must_use]
    pub fn new(size: usize) -> Self {
        Self(vec![0; size].into_boxed_slice())
    }

    /// Wraps existing bytes.
    #[must_use]
    pub fn from_bytes(bytes: Box<[u8]>) -> Self {
        Self(bytes)
    }

    /// Returns the inner data.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the fixed length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the field has no capacity at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Zeroes all bytes.
    pub fn clear(&mut self) {
        self.0.fill(0);
    }

    fn window(&self, offset: usize, n: usize) -> Result<&[u8], DecodeError> {
        self.0
            .get(offset..offset.saturating_add(n))
            .ok_or(DecodeError::Truncated)
    }

    fn window_mut(&mut self, offset: usize, n: usize) -> Result<&mut [u8], EncodeError> {
        self.0
            .get_mut(offset..offset.saturating_add(n))
            .ok_or(EncodeError::EntryTooLarge)
    }

    /// Reads an unsigned `n`-byte (1..=4) big-endian integer.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] if the integer reaches past the end.
    pub fn get_uint(&self, offset: usize, n: usize) -> Result<u32, DecodeError> {
        debug_assert!((1..=4).contains(&n), "integer width must be 1..=4");

        Ok(self
            .window(offset, n)?
            .iter()
            .fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
    }

    /// Reads a signed `n`-byte (1..=4) big-endian integer, sign-extending it.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] if the integer reaches past the end.
    #[expect(clippy::cast_possible_wrap, reason = "two's complement reinterpretation")]
    pub fn get_int(&self, offset: usize, n: usize) -> Result<i32, DecodeError> {
        let raw = self.get_uint(offset, n)?;
        let shift = 32 - 8 * n as u32;
        Ok(((raw << shift) as i32) >> shift)
    }

    /// Writes the low `n` bytes (1..=4) of `value` big-endian.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::EntryTooLarge`] if the integer reaches past the end.
    pub fn put_uint(&mut self, offset: usize, n: usize, value: u32) -> Result<(), EncodeError> {
        debug_assert!((1..=4).contains(&n), "integer width must be 1..=4");

        let window = self.window_mut(offset, n)?;
        let bytes = value.to_be_bytes();

        for (dst, src) in window.iter_mut().zip(bytes.iter().skip(4 - n)) {
            *dst = *src;
        }

        Ok(())
    }

    /// Writes the low `n` bytes (1..=4) of a signed `value` big-endian.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::EntryTooLarge`] if the integer reaches past the end.
    #[expect(clippy::cast_sign_loss, reason = "two's complement reinterpretation")]
    pub fn put_int(&mut self, offset: usize, n: usize, value: i32) -> Result<(), EncodeError> {
        self.put_uint(offset, n, value as u32)
    }

    /// Reads a length-prefixed modified UTF-8 string.
    ///
    /// Returns the string and the total number of bytes it occupied.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the string is truncated or malformed.
    pub fn get_utf(&self, offset: usize) -> Result<(String, usize), DecodeError> {
        let (len, header) = match self.get_uint(offset, 2)? {
            len if len == u32::from(mutf8::LONG_LENGTH_ESCAPE) => {
                (self.get_uint(offset + 2, 4)? as usize, 6)
            }
            len => (len as usize, 2),
        };

        let s = mutf8::decode(self.window(offset + header, len)?)?;
        Ok((s, header + len))
    }

    /// Writes a length-prefixed modified UTF-8 string.
    ///
    /// Returns the number of bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::EntryTooLarge`] if the string does not fit.
    #[expect(clippy::cast_possible_truncation, reason = "lengths are checked by prefix_len")]
    pub fn put_utf(&mut self, offset: usize, s: &str) -> Result<usize, EncodeError> {
        let bytes = mutf8::encode(s);
        let header = mutf8::prefix_len(bytes.len());

        // Check everything up front so a failed write leaves no partial bytes
        if offset.saturating_add(header + bytes.len()) > self.len() {
            return Err(EncodeError::EntryTooLarge);
        }

        if header == 2 {
            self.put_uint(offset, 2, bytes.len() as u32)?;
        } else {
            self.put_uint(offset, 2, u32::from(mutf8::LONG_LENGTH_ESCAPE))?;
            self.put_uint(offset + 2, 4, bytes.len() as u32)?;
        }

        self.window_mut(offset + header, bytes.len())?
            .copy_from_slice(&bytes);

        Ok(header + bytes.len())
    }
}
