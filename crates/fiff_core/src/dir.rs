//! Directory scanning: one pass over tag headers, no payload decoding.
//!
//! # Responsibility
//! - Build the flat, ordered tag list that every later lookup works from.
//! - Load the on-disk directory when a file carries one.
//!
//! # Invariants
//! - Every recorded tag lies fully inside the stream.
//! - A scan visits each header offset at most once.

use crate::constants::{FIFFT_DIR_ENTRY_STRUCT, FIFFV_NEXT_NONE, FIFFV_NEXT_SEQ, FIFF_DIR};
use crate::error::{FiffResult, FormatError};
use crate::tag::{read_header_at, read_value, stream_len, Tag, TagValue};
use std::collections::HashSet;
use std::io::{Read, Seek};

/// Scans tag headers starting at `start` until the terminal tag or end of stream.
///
/// Sequential tags advance to `pos + 16 + size`; explicit `next` offsets are
/// followed as long as they stay inside the stream and were not seen before.
pub fn scan_directory<R: Read + Seek>(stream: &mut R, start: u64) -> FiffResult<Vec<Tag>> {
    let stream_len = stream_len(stream)?;
    let mut tags = Vec::new();
    let mut visited = HashSet::new();
    let mut pos = start;

    while pos != stream_len {
        if !visited.insert(pos) {
            return Err(FormatError::TagCycle { offset: pos }.into());
        }

        let header = read_header_at(stream, pos, stream_len)?;
        let tag = Tag::from_header(pos, header);
        if tag.end_pos() > stream_len {
            return Err(FormatError::PayloadOutOfRange {
                offset: pos,
                size: header.size,
                stream_len,
            }
            .into());
        }
        tags.push(tag);

        pos = match header.next {
            FIFFV_NEXT_NONE => break,
            FIFFV_NEXT_SEQ => tag.end_pos(),
            next if next > 0 && (next as u64) < stream_len => next as u64,
            next => {
                return Err(FormatError::OffsetOutOfRange {
                    offset: tag.pos,
                    next: i64::from(next),
                    stream_len,
                }
                .into())
            }
        };
    }

    Ok(tags)
}

/// Loads the `FIFF_DIR` tag at `offset` as a tag list.
pub fn read_directory_tag<R: Read + Seek>(stream: &mut R, offset: u64) -> FiffResult<Vec<Tag>> {
    let stream_len = stream_len(stream)?;
    let header = read_header_at(stream, offset, stream_len)?;
    if header.kind != FIFF_DIR {
        return Err(FormatError::InvalidHeader {
            offset,
            reason: format!(
                "directory pointer references tag kind {} instead of {FIFF_DIR}",
                header.kind
            ),
        }
        .into());
    }
    if header.type_code != FIFFT_DIR_ENTRY_STRUCT {
        return Err(FormatError::TypeMismatch {
            kind: header.kind,
            expected: "dir entry",
            type_code: header.type_code,
        }
        .into());
    }

    let dir_tag = Tag::from_header(offset, header);
    if dir_tag.end_pos() > stream_len {
        return Err(FormatError::PayloadOutOfRange {
            offset,
            size: header.size,
            stream_len,
        }
        .into());
    }

    let TagValue::DirEntries(entries) = read_value(stream, &dir_tag)? else {
        return Err(FormatError::TypeMismatch {
            kind: header.kind,
            expected: "dir entry",
            type_code: header.type_code,
        }
        .into());
    };

    let mut tags = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        if entry.pos < 0 || entry.size < 0 {
            return Err(FormatError::InvalidDirectoryEntry {
                index,
                reason: format!("negative position {} or size {}", entry.pos, entry.size),
            }
            .into());
        }
        let tag = Tag {
            kind: entry.kind,
            type_code: entry.type_code,
            size: entry.size as u32,
            pos: entry.pos as u64,
            next: FIFFV_NEXT_SEQ,
        };
        if tag.end_pos() > stream_len {
            return Err(FormatError::InvalidDirectoryEntry {
                index,
                reason: format!(
                    "tag at {} with {} bytes ends beyond stream length {stream_len}",
                    tag.pos, tag.size
                ),
            }
            .into());
        }
        tags.push(tag);
    }

    Ok(tags)
}
