// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! MSB-first bit streams with unary and gamma codes.
//!
//! Unary codes `n >= 1` as `n - 1` one bits followed by a zero bit.
//!
//! Gamma codes `n >= 1` as the unary code of the bit length of `n`,
//! followed by the low `bit_length(n) - 1` bits of `n` (the leading
//! one bit is implicit).
//!
//! ```text
//! n   bits(n)   gamma
//! 1   1         0
//! 2   10        10 0
//! 3   11        10 1
//! 4   100       110 00
//! 9   1001      1110 001
//! ```

use crate::{
    coding::{DecodeError, EncodeError},
    mutf8,
};

const BIT_MASK: u8 = 0b1000_0000_u8;

/// Largest unary value a gamma code can start with
const MAX_GAMMA_BITS: u32 = u32::BITS;

fn bit_length(n: u32) -> u32 {
    u32::BITS - n.leading_zeros()
}

/// Growable bit sink
#[derive(Clone, Debug, Default)]
pub struct BitWriter {
    buffer: Vec<u8>,
    bit_len: usize,
}

impl BitWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty writer with room for `bytes` bytes.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(bytes),
            bit_len: 0,
        }
    }

    /// Returns the number of bits written.
    #[must_use]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Returns the written bytes; the last byte is zero-padded.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Discards all bits.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.bit_len = 0;
    }

    /// Drops everything after the first `bit_len` bits.
    pub fn truncate(&mut self, bit_len: usize) {
        if bit_len >= self.bit_len {
            return;
        }

        self.buffer.truncate(bit_len.div_ceil(8));
        self.bit_len = bit_len;

        let used = bit_len % 8;
        if used > 0 {
            if let Some(last) = self.buffer.last_mut() {
                *last &= !(u8::MAX >> used);
            }
        }
    }

    /// Appends a single bit.
    pub fn write_bit(&mut self, bit: bool) {
        let idx = self.bit_len % 8;

        if idx == 0 {
            self.buffer.push(0);
        }

        if bit {
            if let Some(last) = self.buffer.last_mut() {
                *last |= BIT_MASK >> idx;
            }
        }

        self.bit_len += 1;
    }

    /// Appends the low `count` bits of `value`, most significant first.
    pub fn write_bits(&mut self, value: u32, count: u32) {
        debug_assert!(count <= u32::BITS);

        for shift in (0..count).rev() {
            self.write_bit((value >> shift) & 1 == 1);
        }
    }

    /// Appends 8 bits.
    pub fn write_byte(&mut self, byte: u8) {
        self.write_bits(u32::from(byte), 8);
    }

    /// Appends a big-endian `u16`.
    pub fn write_u16(&mut self, value: u16) {
        self.write_bits(u32::from(value), 16);
    }

    /// Appends a length-prefixed modified UTF-8 string.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the string is longer than `u32::MAX` bytes.
    pub fn write_utf(&mut self, s: &str) -> Result<(), EncodeError> {
        let bytes = mutf8::encode(s);

        if let Ok(short) = u16::try_from(bytes.len()) {
            if short != mutf8::LONG_LENGTH_ESCAPE {
                self.write_u16(short);
                bytes.iter().for_each(|&b| self.write_byte(b));
                return Ok(());
            }
        }

        let long = u32::try_from(bytes.len()).map_err(|_| EncodeError::StringTooLong(bytes.len()))?;
        self.write_u16(mutf8::LONG_LENGTH_ESCAPE);
        self.write_bits(long, 32);
        bytes.iter().for_each(|&b| self.write_byte(b));

        Ok(())
    }

    /// Appends the unary code of `n`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::NonPositiveGamma`] if `n` is 0.
    pub fn write_unary(&mut self, n: u32) -> Result<(), EncodeError> {
        if n == 0 {
            return Err(EncodeError::NonPositiveGamma);
        }

        for _ in 1..n {
            self.write_bit(true);
        }
        self.write_bit(false);

        Ok(())
    }

    /// Appends the gamma code of `n`.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError::NonPositiveGamma`] if `n` is 0.
    pub fn write_gamma(&mut self, n: u32) -> Result<(), EncodeError> {
        if n == 0 {
            return Err(EncodeError::NonPositiveGamma);
        }

        let len = bit_length(n);
        self.write_unary(len)?;
        self.write_bits(n, len - 1);

        Ok(())
    }
}

/// Bit source over a borrowed byte slice
#[derive(Clone, Debug)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Starts reading at the first bit of `bytes`.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, bit_pos: 0 }
    }

    /// Returns the number of bits left.
    #[must_use]
    pub fn remaining_bits(&self) -> usize {
        (self.bytes.len() * 8).saturating_sub(self.bit_pos)
    }

    /// Reads a single bit.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] at the end of the input.
    pub fn read_bit(&mut self) -> Result<bool, DecodeError> {
        let byte = self
            .bytes
            .get(self.bit_pos / 8)
            .ok_or(DecodeError::Truncated)?;

        let bit = byte & (BIT_MASK >> (self.bit_pos % 8)) > 0;
        self.bit_pos += 1;

        Ok(bit)
    }

    /// Reads `count` bits as an unsigned integer, most significant first.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] at the end of the input.
    pub fn read_bits(&mut self, count: u32) -> Result<u32, DecodeError> {
        debug_assert!(count <= u32::BITS);

        if self.remaining_bits() < count as usize {
            return Err(DecodeError::Truncated);
        }

        let mut value = 0u32;
        for _ in 0..count {
            value = (value << 1) | u32::from(self.read_bit()?);
        }
        Ok(value)
    }

    /// Reads 8 bits.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] at the end of the input.
    #[expect(clippy::cast_possible_truncation, reason = "8 bits fit into u8")]
    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        Ok(self.read_bits(8)? as u8)
    }

    /// Reads a big-endian `u16`.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] at the end of the input.
    #[expect(clippy::cast_possible_truncation, reason = "16 bits fit into u16")]
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(self.read_bits(16)? as u16)
    }

    /// Reads a length-prefixed modified UTF-8 string.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the string is truncated or malformed.
    pub fn read_utf(&mut self) -> Result<String, DecodeError> {
        let len = match self.read_u16()? {
            mutf8::LONG_LENGTH_ESCAPE => self.read_bits(32)? as usize,
            short => usize::from(short),
        };

        if self.remaining_bits() < len * 8 {
            return Err(DecodeError::Truncated);
        }

        let bytes = (0..len)
            .map(|_| self.read_byte())
            .collect::<Result<Vec<_>, _>>()?;

        mutf8::decode(&bytes)
    }

    /// Reads a unary code.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] at the end of the input.
    pub fn read_unary(&mut self) -> Result<u32, DecodeError> {
        let mut n = 1u32;

        while self.read_bit()? {
            n = n.checked_add(1).ok_or(DecodeError::InvalidGamma)?;
        }

        Ok(n)
    }

    /// Reads a gamma code.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] at the end of the input or if the code
    /// announces more than 32 bits.
    pub fn read_gamma(&mut self) -> Result<u32, DecodeError> {
        let mut len = 1u32;

        while self.read_bit()? {
            len += 1;

            if len > MAX_GAMMA_BITS {
                return Err(DecodeError::InvalidGamma);
            }
        }

        let low = self.read_bits(len - 1)?;
        Ok((1 << (len - 1)) | low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use test_log::test;

    fn render(writer: &BitWriter) -> String {
        let mut reader = BitReader::new(writer.as_bytes());

        (0..writer.bit_len())
            .map(|_| if reader.read_bit().unwrap_or(false) { '1' } else { '0' })
            .collect()
    }

    #[test]
    fn bit_stream_unary_layout() -> crate::Result<()> {
        let mut writer = BitWriter::new();
        writer.write_unary(1)?;
        writer.write_unary(4)?;
        assert_eq!("01110", render(&writer));

        let mut reader = BitReader::new(writer.as_bytes());
        assert_eq!(1, reader.read_unary()?);
        assert_eq!(4, reader.read_unary()?);

        Ok(())
    }

    #[test]
    fn bit_stream_gamma_layout() -> crate::Result<()> {
        let mut writer = BitWriter::new();
        for n in [1, 2, 3, 4, 9] {
            writer.write_gamma(n)?;
        }
        assert_eq!("0".to_owned() + "100" + "101" + "11000" + "1110001", render(&writer));

        Ok(())
    }

    #[test]
    fn bit_stream_gamma_rejects_zero() {
        let mut writer = BitWriter::new();
        assert!(matches!(writer.write_gamma(0), Err(EncodeError::NonPositiveGamma)));
        assert!(matches!(writer.write_unary(0), Err(EncodeError::NonPositiveGamma)));
        assert_eq!(0, writer.bit_len());
    }

    #[test]
    fn bit_stream_gamma_extremes() -> crate::Result<()> {
        let mut writer = BitWriter::new();
        writer.write_gamma(u32::MAX)?;
        writer.write_gamma(1)?;
        assert_eq!(32 + 31 + 1, writer.bit_len());

        let mut reader = BitReader::new(writer.as_bytes());
        assert_eq!(u32::MAX, reader.read_gamma()?);
        assert_eq!(1, reader.read_gamma()?);

        Ok(())
    }

    #[test]
    fn bit_stream_gamma_deltas_roundtrip() -> crate::Result<()> {
        let mut rng = rand::rng();

        for _ in 0..100 {
            let mut ids = Vec::new();
            let mut last = 0u32;
            for _ in 0..rng.random_range(1..500) {
                last += rng.random_range(1..1_000);
                ids.push(last);
            }

            let mut writer = BitWriter::new();
            let mut prev = 0;
            for &id in &ids {
                writer.write_gamma(id - prev)?;
                prev = id;
            }

            let mut reader = BitReader::new(writer.as_bytes());
            let mut decoded = Vec::with_capacity(ids.len());
            let mut prev = 0;
            for _ in 0..ids.len() {
                prev += reader.read_gamma()?;
                decoded.push(prev);
            }

            assert_eq!(ids, decoded);
        }

        Ok(())
    }

    #[test]
    fn bit_stream_mixed_unaligned() -> crate::Result<()> {
        let mut writer = BitWriter::new();
        writer.write_bit(true);
        writer.write_byte(0xA5);
        writer.write_utf("wörd")?;
        writer.write_gamma(77)?;

        let mut reader = BitReader::new(writer.as_bytes());
        assert!(reader.read_bit()?);
        assert_eq!(0xA5, reader.read_byte()?);
        assert_eq!("wörd", reader.read_utf()?);
        assert_eq!(77, reader.read_gamma()?);

        Ok(())
    }

    #[test]
    fn bit_stream_truncate() -> crate::Result<()> {
        let mut writer = BitWriter::new();
        writer.write_gamma(5)?;
        let mark = writer.bit_len();
        writer.write_gamma(1_000)?;

        writer.truncate(mark);
        assert_eq!(mark, writer.bit_len());
        assert_eq!(writer.as_bytes(), [0b1100_1000]);

        writer.write_gamma(2)?;
        let mut reader = BitReader::new(writer.as_bytes());
        assert_eq!(5, reader.read_gamma()?);
        assert_eq!(2, reader.read_gamma()?);

        Ok(())
    }

    #[test]
    fn bit_stream_truncated_input() {
        let mut reader = BitReader::new(&[0xFF]);
        assert!(matches!(reader.read_gamma(), Err(DecodeError::Truncated)));

        let mut reader = BitReader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(matches!(reader.read_gamma(), Err(DecodeError::InvalidGamma)));
    }
}
