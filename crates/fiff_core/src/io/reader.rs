//! Read side: open a FIFF stream once, then serve random-access tag reads.
//!
//! # Responsibility
//! - Validate the file header and build the directory and block tree.
//! - Decode individual tags on demand through typed helpers.
//!
//! # Invariants
//! - The directory and tree are built exactly once, in [`FiffReader::new`].
//! - The stream is owned by the reader and released when it is dropped,
//!   whichever path the caller exits through.

use crate::constants::{FIFFT_ID_STRUCT, FIFFT_INT, FIFF_DIR_POINTER, FIFF_FILE_ID};
use crate::dir::{read_directory_tag, scan_directory};
use crate::error::{FiffError, FiffResult, FormatError};
use crate::tag::{
    read_header_at, read_value, split_name_list, stream_len, FileId, Matrix, Tag, TagHeader,
    TagValue,
};
use crate::tree::{build_tree, BlockId, BlockTree};
use log::{error, info};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use std::time::Instant;

/// How the tag list of an opened file was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorySource {
    /// Loaded from the on-disk `FIFF_DIR` tag.
    Stored,
    /// Built by scanning every header.
    Scanned,
}

impl DirectorySource {
    fn as_str(self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::Scanned => "scanned",
        }
    }
}

/// Opened FIFF stream with its directory and block tree.
pub struct FiffReader<R> {
    stream: R,
    file_id: FileId,
    directory: Vec<Tag>,
    source: DirectorySource,
    tree: BlockTree,
}

/// Opens `path` for buffered reading.
///
/// # Side effects
/// - Emits `fiff_open` logging events with duration and status.
pub fn open_fiff(path: impl AsRef<Path>) -> FiffResult<FiffReader<BufReader<File>>> {
    let file = File::open(path.as_ref())?;
    FiffReader::new(BufReader::new(file))
}

impl<R: Read + Seek> FiffReader<R> {
    /// Validates the header, loads or scans the directory and builds the tree.
    pub fn new(stream: R) -> FiffResult<Self> {
        let started_at = Instant::now();
        info!("event=fiff_open module=io status=start");

        match Self::bootstrap(stream) {
            Ok(reader) => {
                info!(
                    "event=fiff_open module=io status=ok directory={} tags={} blocks={} duration_ms={}",
                    reader.source.as_str(),
                    reader.directory.len(),
                    reader.tree.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(reader)
            }
            Err(err) => {
                error!(
                    "event=fiff_open module=io status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn bootstrap(mut stream: R) -> FiffResult<Self> {
        let len = stream_len(&mut stream)?;

        let id_header = read_leading_header(&mut stream, 0, len)?;
        if id_header.kind != FIFF_FILE_ID
            || id_header.type_code != FIFFT_ID_STRUCT
            || id_header.size as usize != FileId::ENCODED_SIZE
        {
            return Err(not_fiff(format!(
                "first tag is kind {} type {:#x} size {}, expected a file id",
                id_header.kind, id_header.type_code, id_header.size
            )));
        }
        let id_tag = Tag::from_header(0, id_header);
        payload_fits(&id_tag, len, "file id")?;
        let TagValue::Id(file_id) = read_value(&mut stream, &id_tag)? else {
            return Err(not_fiff("file id tag does not hold an id".to_string()));
        };

        let pointer_header = read_leading_header(&mut stream, id_tag.end_pos(), len)?;
        if pointer_header.kind != FIFF_DIR_POINTER
            || pointer_header.type_code != FIFFT_INT
            || pointer_header.size != 4
        {
            return Err(not_fiff(format!(
                "second tag is kind {}, expected the directory pointer",
                pointer_header.kind
            )));
        }
        let pointer_tag = Tag::from_header(id_tag.end_pos(), pointer_header);
        payload_fits(&pointer_tag, len, "directory pointer")?;
        let dir_pos = read_value(&mut stream, &pointer_tag)?
            .as_int()
            .unwrap_or(-1);

        let (directory, source) = if dir_pos > 0 {
            (
                read_directory_tag(&mut stream, dir_pos as u64)?,
                DirectorySource::Stored,
            )
        } else {
            (scan_directory(&mut stream, 0)?, DirectorySource::Scanned)
        };
        let tree = build_tree(&mut stream, &directory)?;

        Ok(Self {
            stream,
            file_id,
            directory,
            source,
            tree,
        })
    }

    pub fn file_id(&self) -> FileId {
        self.file_id
    }

    /// All tags in file order.
    pub fn directory(&self) -> &[Tag] {
        &self.directory
    }

    pub fn directory_source(&self) -> DirectorySource {
        self.source
    }

    pub fn tree(&self) -> &BlockTree {
        &self.tree
    }

    pub fn into_inner(self) -> R {
        self.stream
    }

    /// Decodes the payload of `tag`.
    pub fn read_value(&mut self, tag: &Tag) -> FiffResult<TagValue> {
        read_value(&mut self.stream, tag)
    }

    pub fn read_int(&mut self, tag: &Tag) -> FiffResult<i32> {
        self.read_value(tag)?
            .as_int()
            .ok_or_else(|| mismatch(tag, "int"))
    }

    pub fn read_float(&mut self, tag: &Tag) -> FiffResult<f32> {
        self.read_value(tag)?
            .as_float()
            .ok_or_else(|| mismatch(tag, "float"))
    }

    pub fn read_string(&mut self, tag: &Tag) -> FiffResult<String> {
        match self.read_value(tag)? {
            TagValue::String(value) => Ok(value),
            _ => Err(mismatch(tag, "string")),
        }
    }

    pub fn read_name_list(&mut self, tag: &Tag) -> FiffResult<Vec<String>> {
        let value = self.read_string(tag)?;
        Ok(split_name_list(&value))
    }

    pub fn read_matrix(&mut self, tag: &Tag) -> FiffResult<Matrix> {
        match self.read_value(tag)? {
            TagValue::Matrix(matrix) => Ok(matrix),
            _ => Err(mismatch(tag, "matrix")),
        }
    }

    /// Decodes the first direct tag of `kind` in `block`, if present.
    pub fn find_value(&mut self, block: BlockId, kind: i32) -> FiffResult<Option<TagValue>> {
        match self.tree.find_tag(block, kind).copied() {
            Some(tag) => self.read_value(&tag).map(Some),
            None => Ok(None),
        }
    }

    pub fn find_int(&mut self, block: BlockId, kind: i32) -> FiffResult<Option<i32>> {
        match self.tree.find_tag(block, kind).copied() {
            Some(tag) => self.read_int(&tag).map(Some),
            None => Ok(None),
        }
    }

    pub fn find_string(&mut self, block: BlockId, kind: i32) -> FiffResult<Option<String>> {
        match self.tree.find_tag(block, kind).copied() {
            Some(tag) => self.read_string(&tag).map(Some),
            None => Ok(None),
        }
    }

    pub fn find_name_list(&mut self, block: BlockId, kind: i32) -> FiffResult<Option<Vec<String>>> {
        match self.tree.find_tag(block, kind).copied() {
            Some(tag) => self.read_name_list(&tag).map(Some),
            None => Ok(None),
        }
    }

    pub fn find_matrix(&mut self, block: BlockId, kind: i32) -> FiffResult<Option<Matrix>> {
        match self.tree.find_tag(block, kind).copied() {
            Some(tag) => self.read_matrix(&tag).map(Some),
            None => Ok(None),
        }
    }
}

fn read_leading_header<R: Read + Seek>(
    stream: &mut R,
    offset: u64,
    len: u64,
) -> FiffResult<TagHeader> {
    match read_header_at(stream, offset, len) {
        Err(FiffError::Format(FormatError::TruncatedHeader { .. })) => Err(not_fiff(format!(
            "stream of {len} bytes ends inside the file header"
        ))),
        Err(FiffError::Format(FormatError::InvalidHeader { reason, .. })) => Err(not_fiff(reason)),
        other => other,
    }
}

/// Header payloads must lie inside the stream before they are decoded.
fn payload_fits(tag: &Tag, len: u64, what: &str) -> FiffResult<()> {
    if tag.end_pos() > len {
        return Err(not_fiff(format!(
            "{what} payload ends at byte {} but the stream holds {len} bytes",
            tag.end_pos()
        )));
    }
    Ok(())
}

fn not_fiff(reason: String) -> FiffError {
    FormatError::NotAFiffFile { reason }.into()
}

fn mismatch(tag: &Tag, expected: &'static str) -> FiffError {
    FormatError::TypeMismatch {
        kind: tag.kind,
        expected,
        type_code: tag.type_code,
    }
    .into()
}
