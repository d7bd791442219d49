//! Tag codec: fixed 16-byte headers plus typed payloads.
//!
//! # Responsibility
//! - Encode/decode tag headers without touching payload bytes.
//! - Read and write single tags against a seekable stream.
//!
//! # Invariants
//! - Headers are four big-endian `i32` fields: kind, type, size, next.
//! - A decoded header never has a negative size.

use crate::constants::{FIFFV_NEXT_SEQ, TAG_HEADER_SIZE};
use crate::error::{FiffResult, FormatError};
use std::io::{self, Read, Seek, SeekFrom, Write};

pub mod matrix;
pub mod types;
pub mod value;

pub use matrix::{Matrix, MatrixData};
pub use types::{classify, lookup_type, TypeCode, TypeSpec, ValueKind};
pub use value::{
    decode_payload, encode_payload, join_name_list, split_name_list, DirEntry, FileId, TagValue,
};

/// Raw tag header as stored on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHeader {
    pub kind: i32,
    pub type_code: i32,
    pub size: i32,
    pub next: i32,
}

impl TagHeader {
    pub const SIZE: usize = TAG_HEADER_SIZE as usize;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..4].copy_from_slice(&self.kind.to_be_bytes());
        out[4..8].copy_from_slice(&self.type_code.to_be_bytes());
        out[8..12].copy_from_slice(&self.size.to_be_bytes());
        out[12..16].copy_from_slice(&self.next.to_be_bytes());
        out
    }

    /// Parses a header read from `offset`.
    pub fn from_bytes(offset: u64, bytes: &[u8]) -> Result<Self, FormatError> {
        if bytes.len() < Self::SIZE {
            return Err(FormatError::TruncatedHeader {
                offset,
                available: bytes.len() as u64,
            });
        }
        let field = |index: usize| {
            let start = index * 4;
            i32::from_be_bytes([
                bytes[start],
                bytes[start + 1],
                bytes[start + 2],
                bytes[start + 3],
            ])
        };
        let header = Self {
            kind: field(0),
            type_code: field(1),
            size: field(2),
            next: field(3),
        };
        if header.size < 0 {
            return Err(FormatError::InvalidHeader {
                offset,
                reason: format!("negative payload size {}", header.size),
            });
        }
        Ok(header)
    }
}

/// Immutable tag descriptor produced by directory scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    pub kind: i32,
    pub type_code: i32,
    /// Payload length in bytes, header excluded.
    pub size: u32,
    /// Offset of the tag header.
    pub pos: u64,
    /// Raw `next` field; directory-derived tags report sequential.
    pub next: i32,
}

impl Tag {
    pub fn from_header(pos: u64, header: TagHeader) -> Self {
        Self {
            kind: header.kind,
            type_code: header.type_code,
            size: header.size as u32,
            pos,
            next: header.next,
        }
    }

    /// Offset of the first payload byte.
    pub fn payload_pos(&self) -> u64 {
        self.pos + TAG_HEADER_SIZE
    }

    /// Offset just past the payload.
    pub fn end_pos(&self) -> u64 {
        self.payload_pos() + u64::from(self.size)
    }

    pub fn to_dir_entry(&self) -> DirEntry {
        DirEntry {
            kind: self.kind,
            type_code: self.type_code,
            size: self.size as i32,
            pos: self.pos as i32,
        }
    }
}

/// Returns the stream length, restoring the current position.
pub(crate) fn stream_len<S: Seek>(stream: &mut S) -> io::Result<u64> {
    let current = stream.stream_position()?;
    let len = stream.seek(SeekFrom::End(0))?;
    if current != len {
        stream.seek(SeekFrom::Start(current))?;
    }
    Ok(len)
}

/// Reads the header at `offset` of a stream of `stream_len` bytes.
pub fn read_header_at<R: Read + Seek>(
    stream: &mut R,
    offset: u64,
    stream_len: u64,
) -> FiffResult<TagHeader> {
    let available = stream_len.saturating_sub(offset);
    if available < TAG_HEADER_SIZE {
        return Err(FormatError::TruncatedHeader { offset, available }.into());
    }
    let mut buf = [0u8; TagHeader::SIZE];
    stream.seek(SeekFrom::Start(offset))?;
    stream.read_exact(&mut buf)?;
    Ok(TagHeader::from_bytes(offset, &buf)?)
}

/// Reads the raw payload bytes of `tag`.
pub fn read_payload<R: Read + Seek>(stream: &mut R, tag: &Tag) -> FiffResult<Vec<u8>> {
    let mut buf = vec![0u8; tag.size as usize];
    stream.seek(SeekFrom::Start(tag.payload_pos()))?;
    stream.read_exact(&mut buf)?;
    Ok(buf)
}

/// Reads and decodes the payload of `tag`.
pub fn read_value<R: Read + Seek>(stream: &mut R, tag: &Tag) -> FiffResult<TagValue> {
    let bytes = read_payload(stream, tag)?;
    Ok(decode_payload(tag.kind, tag.type_code, &bytes)?)
}

/// Writes one tag at the current position with `next` set to `next`.
///
/// Returns the payload size written.
pub fn write_tag<W: Write>(
    stream: &mut W,
    kind: i32,
    value: &TagValue,
    next: i32,
) -> FiffResult<u32> {
    let (type_code, payload) = encode_payload(value);
    let size = i32::try_from(payload.len()).map_err(|_| FormatError::InvalidPayload {
        kind,
        type_code,
        size: payload.len(),
        reason: "payload exceeds the 2 GiB tag limit".to_string(),
    })?;
    let header = TagHeader {
        kind,
        type_code,
        size,
        next,
    };
    stream.write_all(&header.to_bytes())?;
    stream.write_all(&payload)?;
    Ok(size as u32)
}

/// Writes one tag followed sequentially by the next.
pub fn write_sequential<W: Write>(stream: &mut W, kind: i32, value: &TagValue) -> FiffResult<u32> {
    write_tag(stream, kind, value, FIFFV_NEXT_SEQ)
}
