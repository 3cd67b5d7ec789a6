// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    block::BlockNum,
    coding::{Decode, DecodeError, Encode, EncodeError},
    mutf8,
};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::{
    io::{Read, Write},
    path::Path,
};

/// Signature every index file starts with
pub const SIGNATURE: &str = "INDEX FILE 0.012";

/// Contents of block 0
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Header {
    /// Block the summary starts at
    pub summary_block: BlockNum,
}

impl Encode for Header {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        mutf8::write_utf(writer, SIGNATURE)?;
        writer.write_u32::<BigEndian>(self.summary_block)?;
        Ok(())
    }
}

impl Decode for Header {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let len = reader.read_u16::<BigEndian>()?;
        if usize::from(len) != SIGNATURE.len() {
            return Err(DecodeError::InvalidSignature);
        }

        let mut signature = [0; SIGNATURE.len()];
        reader.read_exact(&mut signature)?;

        if signature != SIGNATURE.as_bytes() {
            return Err(DecodeError::InvalidSignature);
        }

        let summary_block = reader.read_u32::<BigEndian>()?;
        Ok(Self { summary_block })
    }
}

/// Atomically replaces `path` with a fully written temporary file
pub fn replace_atomic(temp_file: tempfile::NamedTempFile, path: &Path) -> crate::Result<()> {
    temp_file.as_file().sync_all()?;
    temp_file.persist(path)?;

    if let Some(folder) = path.parent() {
        fsync_directory(folder)?;
    }

    Ok(())
}

#[cfg(not(target_os = "windows"))]
pub fn fsync_directory(path: &Path) -> std::io::Result<()> {
    let file = std::fs::File::open(path)?;
    debug_assert!(file.metadata()?.is_dir());
    file.sync_all()
}

#[cfg(target_os = "windows")]
pub fn fsync_directory(path: &Path) -> std::io::Result<()> {
    // Cannot fsync directory on Windows
    Ok(())
}
