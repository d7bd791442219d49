//! Projection (SSP) items stored in `FIFFB_PROJ` blocks.
//!
//! # Responsibility
//! - Decode projection items found under a block-tree node.
//! - Encode a list of items as one projection block.
//!
//! # Invariants
//! - Items come back in file order.
//! - A missing required tag aborts the read unless the caller opts into
//!   skipping the item; integrity mismatches always abort.
//! - The summary is logged only after every item decoded successfully.

use crate::constants::{
    FIFFB_PROJ, FIFFB_PROJ_ITEM, FIFFV_PROJ_ITEM_FIELD, FIFF_DESCRIPTION,
    FIFF_MNE_PROJ_ITEM_ACTIVE, FIFF_NAME, FIFF_NCHAN, FIFF_PROJ_ITEM_CH_NAME_LIST,
    FIFF_PROJ_ITEM_KIND, FIFF_PROJ_ITEM_NVEC, FIFF_PROJ_ITEM_TIME, FIFF_PROJ_ITEM_VECTORS,
};
use crate::error::{FiffError, FiffResult, RequiredField};
use crate::io::{FiffReader, FiffWriter};
use crate::logging::sanitize_message;
use crate::model::{NamedMatrix, ProjKind, ProjectionItem, ValidationError};
use crate::tree::BlockId;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, Write};

const MAX_LOGGED_DESC_CHARS: usize = 120;

/// What to do with a projection item that lacks a required tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFieldPolicy {
    /// Fail the whole read.
    #[default]
    Abort,
    /// Drop the item with a warning and keep reading.
    SkipItem,
}

/// Projection read configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadOptions {
    pub missing_fields: MissingFieldPolicy,
}

/// Reads every projection item of the first projection block under `node`.
///
/// Returns an empty list when no projection block exists.
///
/// # Errors
/// - `MissingField` when an item lacks a required tag (policy `Abort`).
/// - `Integrity` when the data matrix disagrees with the channel names,
///   the vector count or the channel count.
/// - `Format`/`Io` when a tag cannot be decoded.
pub fn read_projections<R: Read + Seek>(
    reader: &mut FiffReader<R>,
    node: BlockId,
    options: &ReadOptions,
) -> FiffResult<Vec<ProjectionItem>> {
    let Some(proj) = reader
        .tree()
        .find_blocks_recursive(node, FIFFB_PROJ)
        .first()
        .copied()
    else {
        debug!("event=proj_read module=proj status=ok items=0 reason=no_block");
        return Ok(Vec::new());
    };

    // Items without their own channel count fall back to the block's.
    let default_nchan = reader.find_int(proj, FIFF_NCHAN)?;
    let blocks = reader.tree().find_blocks(proj, FIFFB_PROJ_ITEM);

    let mut items = Vec::with_capacity(blocks.len());
    for (index, block) in blocks.into_iter().enumerate() {
        match read_item(reader, block, index, default_nchan) {
            Ok(item) => items.push(item),
            Err(FiffError::MissingField { item, field })
                if options.missing_fields == MissingFieldPolicy::SkipItem =>
            {
                warn!(
                    "event=proj_item_skipped module=proj item={} field=\"{}\"",
                    item, field
                );
            }
            Err(err) => return Err(err),
        }
    }

    if !items.is_empty() {
        info!(
            "event=proj_read module=proj status=ok items={}",
            items.len()
        );
        for item in &items {
            info!(
                "event=proj_item module=proj summary=\"{}\"",
                sanitize_message(&item.summary(), MAX_LOGGED_DESC_CHARS)
            );
        }
    }
    Ok(items)
}

fn read_item<R: Read + Seek>(
    reader: &mut FiffReader<R>,
    block: BlockId,
    index: usize,
    default_nchan: Option<i32>,
) -> FiffResult<ProjectionItem> {
    let integrity = |error: ValidationError| FiffError::Integrity {
        item: Some(index),
        error,
    };
    let required = |field: RequiredField| FiffError::MissingField { item: index, field };

    let item_nchan = reader.find_int(block, FIFF_NCHAN)?;
    let desc = match reader.find_string(block, FIFF_DESCRIPTION)? {
        Some(desc) => desc,
        None => reader
            .find_string(block, FIFF_NAME)?
            .ok_or_else(|| required(RequiredField::Description))?,
    };
    let names = reader
        .find_name_list(block, FIFF_PROJ_ITEM_CH_NAME_LIST)?
        .ok_or_else(|| required(RequiredField::ChannelList))?;
    let kind = reader
        .find_int(block, FIFF_PROJ_ITEM_KIND)?
        .ok_or_else(|| required(RequiredField::Kind))?;
    let nvec = reader
        .find_int(block, FIFF_PROJ_ITEM_NVEC)?
        .ok_or_else(|| required(RequiredField::VectorCount))?;
    let vectors = reader
        .find_matrix(block, FIFF_PROJ_ITEM_VECTORS)?
        .ok_or_else(|| required(RequiredField::Data))?;
    let active = reader
        .find_int(block, FIFF_MNE_PROJ_ITEM_ACTIVE)?
        .is_some_and(|value| value != 0);

    let (Some(rows), Some(cols)) = (vectors.rows(), vectors.cols()) else {
        return Err(integrity(ValidationError::NotTwoDimensional {
            dims: vectors.dims().to_vec(),
        }));
    };
    let nvec = non_negative("vector count", nvec).map_err(integrity)?;
    let nchan = match item_nchan.or(default_nchan) {
        Some(value) => non_negative("channel count", value).map_err(integrity)?,
        None => names.len(),
    };

    if cols != names.len() {
        return Err(integrity(ValidationError::ColumnNamesMismatch {
            names: names.len(),
            columns: cols,
        }));
    }
    if rows != nvec {
        return Err(integrity(ValidationError::VectorCountMismatch { nvec, rows }));
    }
    if nchan != cols {
        return Err(integrity(ValidationError::ChannelCountMismatch {
            nchan,
            columns: cols,
        }));
    }

    let data = NamedMatrix::new(nvec, nchan, None, Some(names), vectors.to_f32_vec())
        .map_err(integrity)?;
    ProjectionItem::new(ProjKind::from_code(kind), active, desc, data).map_err(integrity)
}

fn non_negative(field: &'static str, value: i32) -> Result<usize, ValidationError> {
    usize::try_from(value).map_err(|_| ValidationError::NegativeCount { field, value })
}

/// Writes `items` as a single projection block.
///
/// Every item is validated before anything is written for it; a failure
/// still leaves the enclosing blocks closed.
pub fn write_projections<W: Write + Seek>(
    writer: &mut FiffWriter<W>,
    items: &[ProjectionItem],
) -> FiffResult<()> {
    writer.with_block(FIFFB_PROJ, |writer| {
        for (index, item) in items.iter().enumerate() {
            item.validate().map_err(|error| FiffError::Integrity {
                item: Some(index),
                error,
            })?;
            writer.with_block(FIFFB_PROJ_ITEM, |writer| write_item(writer, item))?;
        }
        Ok(())
    })?;
    debug!(
        "event=proj_write module=proj status=ok items={}",
        items.len()
    );
    Ok(())
}

fn write_item<W: Write + Seek>(writer: &mut FiffWriter<W>, item: &ProjectionItem) -> FiffResult<()> {
    let data = &item.data;
    writer.write_string(FIFF_NAME, &item.desc)?;
    writer.write_int(FIFF_PROJ_ITEM_KIND, item.kind.code())?;
    if item.kind.code() == FIFFV_PROJ_ITEM_FIELD {
        writer.write_float(FIFF_PROJ_ITEM_TIME, 0.0)?;
    }
    writer.write_int(FIFF_NCHAN, count_to_i32("channel count", data.ncol)?)?;
    writer.write_int(FIFF_PROJ_ITEM_NVEC, count_to_i32("vector count", data.nrow)?)?;
    writer.write_int(FIFF_MNE_PROJ_ITEM_ACTIVE, i32::from(item.active))?;
    writer.write_name_list(FIFF_PROJ_ITEM_CH_NAME_LIST, item.channel_names())?;
    writer.write_float_matrix(FIFF_PROJ_ITEM_VECTORS, data.nrow, data.ncol, &data.data)
}

fn count_to_i32(field: &'static str, value: usize) -> FiffResult<i32> {
    i32::try_from(value)
        .map_err(|_| FiffError::from(ValidationError::CountOverflow { field, value }))
}

/// Human-readable listing: a total line, then one indented line per item.
pub fn projection_summary(items: &[ProjectionItem]) -> Vec<String> {
    let mut lines = Vec::with_capacity(items.len() + 1);
    lines.push(format!("Read a total of {} projection items:", items.len()));
    lines.extend(items.iter().map(|item| format!("    {}", item.summary())));
    lines
}

#[cfg(test)]
mod tests {
    use super::{projection_summary, read_projections, write_projections, ReadOptions};
    use crate::io::{FiffReader, FiffWriter, WriterOptions};
    use crate::model::{ProjKind, ProjectionItem};
    use crate::tag::FileId;
    use std::io::Cursor;

    fn item(desc: &str, nvec: usize) -> ProjectionItem {
        let channels = vec!["MEG 0111".to_string(), "MEG 0112".to_string()];
        let vectors = (0..nvec * 2).map(|v| v as f32 * 0.5).collect();
        ProjectionItem::from_vectors(ProjKind::HomogField, false, desc, channels, vectors).unwrap()
    }

    #[test]
    fn block_without_items_reads_as_empty() {
        let mut writer = FiffWriter::new(
            Cursor::new(Vec::new()),
            FileId::generate(),
            WriterOptions::default(),
        )
        .unwrap();
        write_projections(&mut writer, &[]).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let mut reader = FiffReader::new(Cursor::new(bytes)).unwrap();
        let root = reader.tree().root();
        assert_eq!(reader.tree().find_blocks_recursive(root, 313).len(), 1);
        let items = read_projections(&mut reader, root, &ReadOptions::default()).unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn write_rejects_unnamed_columns_and_closes_blocks() {
        let mut broken = item("broken", 1);
        broken.data.col_names = None;

        let mut writer = FiffWriter::new(
            Cursor::new(Vec::new()),
            FileId::generate(),
            WriterOptions::default(),
        )
        .unwrap();
        let err = write_projections(&mut writer, &[item("ok", 1), broken]).unwrap_err();
        assert_eq!(err.to_string(), "projection item 1: channel names are required");
        assert_eq!(writer.depth(), 0);
        assert!(writer.finish().is_ok());
    }

    #[test]
    fn write_rejects_items_without_channels() {
        let mut empty = item("empty", 0);
        empty.data.ncol = 0;
        empty.data.col_names = Some(Vec::new());

        let mut writer = FiffWriter::new(
            Cursor::new(Vec::new()),
            FileId::generate(),
            WriterOptions::default(),
        )
        .unwrap();
        let err = write_projections(&mut writer, &[empty]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "projection item 0: projection items need at least one channel"
        );
        assert_eq!(writer.depth(), 0);
    }

    #[test]
    fn summary_lists_total_then_items() {
        let lines = projection_summary(&[item("a", 1), item("b", 2)]);
        assert_eq!(
            lines,
            vec![
                "Read a total of 2 projection items:".to_string(),
                "    a (1 x 2) idle".to_string(),
                "    b (2 x 2) idle".to_string(),
            ]
        );
    }
}
