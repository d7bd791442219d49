//! Write side: sequential tag emission with scoped blocks.
//!
//! # Responsibility
//! - Emit the file header, tags, block start/end pairs and the terminal tag.
//! - Optionally append an on-disk directory and patch the directory pointer.
//!
//! # Invariants
//! - Every tag is written with `next = FIFFV_NEXT_SEQ` except the terminal one.
//! - `end_block` only closes the innermost open block.
//! - `finish` refuses to complete while blocks are open.

use crate::constants::{
    FIFFT_DIR_ENTRY_STRUCT, FIFFT_VOID, FIFFV_NEXT_NONE, FIFFV_NEXT_SEQ, FIFF_BLOCK_END,
    FIFF_BLOCK_START, FIFF_DIR, FIFF_DIR_POINTER, FIFF_FILE_ID, FIFF_FREE_LIST, FIFF_NOP,
    TAG_HEADER_SIZE,
};
use crate::error::{FiffResult, FormatError};
use crate::tag::{join_name_list, write_tag, DirEntry, FileId, Matrix, Tag, TagValue};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Writer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Append a `FIFF_DIR` tag on finish so readers can skip the scan.
    pub write_directory: bool,
}

/// Sequential FIFF writer over a seekable stream.
pub struct FiffWriter<W: Write + Seek> {
    stream: W,
    pos: u64,
    written: Vec<Tag>,
    open_blocks: Vec<i32>,
    dir_pointer_pos: u64,
    options: WriterOptions,
}

/// Creates (truncating) `path` and writes a fresh file header.
pub fn create_fiff(
    path: impl AsRef<Path>,
    options: WriterOptions,
) -> FiffResult<FiffWriter<BufWriter<File>>> {
    let file = File::create(path.as_ref())?;
    FiffWriter::new(BufWriter::new(file), FileId::generate(), options)
}

impl<W: Write + Seek> FiffWriter<W> {
    /// Writes the file id, directory pointer and free-list tags.
    pub fn new(mut stream: W, file_id: FileId, options: WriterOptions) -> FiffResult<Self> {
        let pos = stream.stream_position()?;
        let mut writer = Self {
            stream,
            pos,
            written: Vec::new(),
            open_blocks: Vec::new(),
            dir_pointer_pos: 0,
            options,
        };
        writer.write_value(FIFF_FILE_ID, &TagValue::Id(file_id))?;
        writer.dir_pointer_pos = writer.pos + TAG_HEADER_SIZE;
        writer.write_int(FIFF_DIR_POINTER, -1)?;
        writer.write_int(FIFF_FREE_LIST, -1)?;
        Ok(writer)
    }

    /// Offset where the next tag header will be written.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Number of currently open blocks.
    pub fn depth(&self) -> usize {
        self.open_blocks.len()
    }

    pub fn write_value(&mut self, kind: i32, value: &TagValue) -> FiffResult<()> {
        self.emit(kind, value, FIFFV_NEXT_SEQ)
    }

    fn emit(&mut self, kind: i32, value: &TagValue, next: i32) -> FiffResult<()> {
        let pos = self.pos;
        let size = write_tag(&mut self.stream, kind, value, next)?;
        self.written.push(Tag {
            kind,
            type_code: value.type_code(),
            size,
            pos,
            next,
        });
        self.pos = pos + TAG_HEADER_SIZE + u64::from(size);
        Ok(())
    }

    pub fn write_int(&mut self, kind: i32, value: i32) -> FiffResult<()> {
        self.write_value(kind, &TagValue::Int(vec![value]))
    }

    pub fn write_ints(&mut self, kind: i32, values: &[i32]) -> FiffResult<()> {
        self.write_value(kind, &TagValue::Int(values.to_vec()))
    }

    pub fn write_float(&mut self, kind: i32, value: f32) -> FiffResult<()> {
        self.write_value(kind, &TagValue::Float(vec![value]))
    }

    pub fn write_double(&mut self, kind: i32, value: f64) -> FiffResult<()> {
        self.write_value(kind, &TagValue::Double(vec![value]))
    }

    pub fn write_string(&mut self, kind: i32, value: &str) -> FiffResult<()> {
        self.write_value(kind, &TagValue::String(value.to_string()))
    }

    /// Writes names joined with `:`.
    pub fn write_name_list<S: AsRef<str>>(&mut self, kind: i32, names: &[S]) -> FiffResult<()> {
        self.write_value(kind, &TagValue::String(join_name_list(names)))
    }

    pub fn write_id(&mut self, kind: i32, id: FileId) -> FiffResult<()> {
        self.write_value(kind, &TagValue::Id(id))
    }

    pub fn write_matrix(&mut self, kind: i32, matrix: &Matrix) -> FiffResult<()> {
        self.write_value(kind, &TagValue::Matrix(matrix.clone()))
    }

    /// Writes a row-major `nrow x ncol` float matrix.
    pub fn write_float_matrix(
        &mut self,
        kind: i32,
        nrow: usize,
        ncol: usize,
        data: &[f32],
    ) -> FiffResult<()> {
        let matrix = Matrix::from_rows_f32(nrow, ncol, data.to_vec())?;
        self.write_value(kind, &TagValue::Matrix(matrix))
    }

    pub fn start_block(&mut self, kind: i32) -> FiffResult<()> {
        self.write_int(FIFF_BLOCK_START, kind)?;
        self.open_blocks.push(kind);
        Ok(())
    }

    /// Closes the innermost open block, which must be of `kind`.
    pub fn end_block(&mut self, kind: i32) -> FiffResult<()> {
        match self.open_blocks.last() {
            None => {
                return Err(FormatError::UnexpectedBlockEnd {
                    offset: self.pos,
                    kind,
                }
                .into())
            }
            Some(open) if *open != kind => {
                return Err(FormatError::BlockMismatch {
                    offset: self.pos,
                    open: *open,
                    found: kind,
                }
                .into())
            }
            Some(_) => {}
        }
        self.write_int(FIFF_BLOCK_END, kind)?;
        self.open_blocks.pop();
        Ok(())
    }

    /// Runs `body` inside a `kind` block.
    ///
    /// The block (and anything `body` left open inside it) is closed even
    /// when `body` fails; the body's error is returned in that case.
    pub fn with_block<T>(
        &mut self,
        kind: i32,
        body: impl FnOnce(&mut Self) -> FiffResult<T>,
    ) -> FiffResult<T> {
        let depth = self.open_blocks.len();
        self.start_block(kind)?;
        let result = body(self);
        let closed = self.close_to(depth);
        match (result, closed) {
            (Ok(value), closed) => closed.map(|()| value),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(close_err)) => {
                warn!(
                    "event=block_close module=io status=error kind={} error=\"{}\"",
                    kind, close_err
                );
                Err(err)
            }
        }
    }

    fn close_to(&mut self, depth: usize) -> FiffResult<()> {
        while self.open_blocks.len() > depth {
            let Some(kind) = self.open_blocks.last().copied() else {
                break;
            };
            self.end_block(kind)?;
        }
        Ok(())
    }

    /// Completes the file and hands back the stream.
    ///
    /// # Errors
    /// - Returns `UnclosedBlock` when a block is still open.
    /// - Returns an I/O error when writing, patching or flushing fails.
    pub fn finish(mut self) -> FiffResult<W> {
        if let Some(kind) = self.open_blocks.last().copied() {
            return Err(FormatError::UnclosedBlock {
                kind,
                depth: self.open_blocks.len(),
            }
            .into());
        }

        let stored_directory = self.options.write_directory;
        if stored_directory {
            self.write_directory()?;
        }
        self.emit(FIFF_NOP, &TagValue::Void, FIFFV_NEXT_NONE)?;
        self.stream.flush()?;

        info!(
            "event=fiff_write module=io status=ok tags={} bytes={} directory={}",
            self.written.len(),
            self.pos,
            stored_directory
        );
        Ok(self.stream)
    }

    fn write_directory(&mut self) -> FiffResult<()> {
        let dir_pos = self.pos;
        let count = self.written.len() + 2;
        let dir_size = count as u64 * DirEntry::ENCODED_SIZE as u64;
        let nop_pos = dir_pos + TAG_HEADER_SIZE + dir_size;
        if nop_pos > i32::MAX as u64 {
            return Err(FormatError::InvalidHeader {
                offset: dir_pos,
                reason: "file too large for a 32-bit directory".to_string(),
            }
            .into());
        }

        let mut entries: Vec<DirEntry> = self.written.iter().map(Tag::to_dir_entry).collect();
        entries.push(DirEntry {
            kind: FIFF_DIR,
            type_code: FIFFT_DIR_ENTRY_STRUCT,
            size: dir_size as i32,
            pos: dir_pos as i32,
        });
        entries.push(DirEntry {
            kind: FIFF_NOP,
            type_code: FIFFT_VOID,
            size: 0,
            pos: nop_pos as i32,
        });
        self.write_value(FIFF_DIR, &TagValue::DirEntries(entries))?;

        self.stream.seek(SeekFrom::Start(self.dir_pointer_pos))?;
        self.stream.write_all(&(dir_pos as i32).to_be_bytes())?;
        self.stream.seek(SeekFrom::Start(self.pos))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FiffWriter, WriterOptions};
    use crate::constants::{FIFFB_PROJ, FIFFB_PROJ_ITEM, FIFF_NCHAN};
    use crate::error::{FiffError, FormatError};
    use crate::tag::FileId;
    use std::cell::Cell;
    use std::io::{self, Cursor, Seek, SeekFrom, Write};
    use std::rc::Rc;

    /// Stream whose writes start failing once `broken` is set.
    struct BreakableStream {
        inner: Cursor<Vec<u8>>,
        broken: Rc<Cell<bool>>,
    }

    impl Write for BreakableStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.broken.get() {
                return Err(io::Error::other("device gone"));
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl Seek for BreakableStream {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    fn writer() -> FiffWriter<Cursor<Vec<u8>>> {
        let id = FileId {
            version: 1,
            machid: [0, 0],
            secs: 0,
            usecs: 0,
        };
        FiffWriter::new(Cursor::new(Vec::new()), id, WriterOptions::default()).unwrap()
    }

    #[test]
    fn header_occupies_three_tags() {
        let writer = writer();
        // file id (16 + 20) + dir pointer (16 + 4) + free list (16 + 4)
        assert_eq!(writer.position(), 76);
    }

    #[test]
    fn end_block_checks_innermost_kind() {
        let mut writer = writer();
        assert!(matches!(
            writer.end_block(FIFFB_PROJ),
            Err(FiffError::Format(FormatError::UnexpectedBlockEnd { .. }))
        ));
        writer.start_block(FIFFB_PROJ).unwrap();
        writer.start_block(FIFFB_PROJ_ITEM).unwrap();
        assert!(matches!(
            writer.end_block(FIFFB_PROJ),
            Err(FiffError::Format(FormatError::BlockMismatch { .. }))
        ));
        assert_eq!(writer.depth(), 2);
    }

    #[test]
    fn with_block_closes_on_body_error() {
        let mut writer = writer();
        let result: Result<(), FiffError> = writer.with_block(FIFFB_PROJ, |w| {
            w.start_block(FIFFB_PROJ_ITEM)?;
            w.write_int(FIFF_NCHAN, 3)?;
            Err(FormatError::NotAFiffFile {
                reason: "body failed".to_string(),
            }
            .into())
        });
        assert!(matches!(
            result,
            Err(FiffError::Format(FormatError::NotAFiffFile { .. }))
        ));
        assert_eq!(writer.depth(), 0);
        assert!(writer.finish().is_ok());
    }

    #[test]
    fn body_error_wins_over_failed_close() {
        let broken = Rc::new(Cell::new(false));
        let stream = BreakableStream {
            inner: Cursor::new(Vec::new()),
            broken: Rc::clone(&broken),
        };
        let mut writer =
            FiffWriter::new(stream, FileId::generate(), WriterOptions::default()).unwrap();

        let result: Result<(), FiffError> = writer.with_block(FIFFB_PROJ, |w| {
            w.write_int(FIFF_NCHAN, 3)?;
            broken.set(true);
            Err(FormatError::NotAFiffFile {
                reason: "body failed".to_string(),
            }
            .into())
        });
        assert!(matches!(
            result,
            Err(FiffError::Format(FormatError::NotAFiffFile { .. }))
        ));
    }

    #[test]
    fn finish_rejects_open_blocks() {
        let mut writer = writer();
        writer.start_block(FIFFB_PROJ).unwrap();
        assert!(matches!(
            writer.finish(),
            Err(FiffError::Format(FormatError::UnclosedBlock {
                kind: FIFFB_PROJ,
                depth: 1
            }))
        ));
    }

    #[test]
    fn float_matrix_shape_is_validated() {
        let mut writer = writer();
        let err = writer.write_float_matrix(1, 2, 2, &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, FiffError::Integrity { item: None, .. }));
    }
}
