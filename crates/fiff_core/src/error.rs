//! Error taxonomy for FIFF reading and writing.
//!
//! # Responsibility
//! - Separate structural-format violations from missing required fields and
//!   cross-field integrity mismatches.
//! - Carry enough context (offset, tag kind, item index) to locate the fault.
//!
//! # Invariants
//! - Absence of an optional tag is never represented as an error.
//! - Every variant is fatal to the operation that produced it; nothing here
//!   is retried.

use crate::model::ValidationError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

pub type FiffResult<T> = Result<T, FiffError>;

/// Violations of the binary layout rules of the format itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Fewer than 16 header bytes remain at `offset`.
    TruncatedHeader { offset: u64, available: u64 },
    /// Header fields are individually invalid (e.g. negative size).
    InvalidHeader { offset: u64, reason: String },
    /// Payload of the tag at `offset` extends beyond the stream.
    PayloadOutOfRange {
        offset: u64,
        size: i32,
        stream_len: u64,
    },
    /// Explicit `next` pointer outside the stream.
    OffsetOutOfRange {
        offset: u64,
        next: i64,
        stream_len: u64,
    },
    /// Following `next` pointers revisits an already scanned tag.
    TagCycle { offset: u64 },
    /// No codec registered for the type code.
    UnknownType { kind: i32, type_code: i32 },
    /// Matrix coding other than dense.
    UnsupportedMatrixCoding { kind: i32, type_code: i32 },
    /// Payload size does not fit the declared type.
    InvalidPayload {
        kind: i32,
        type_code: i32,
        size: usize,
        reason: String,
    },
    /// Tag decoded fine but does not hold the value shape the caller needs.
    TypeMismatch {
        kind: i32,
        expected: &'static str,
        type_code: i32,
    },
    /// Block end tag with no open block.
    UnexpectedBlockEnd { offset: u64, kind: i32 },
    /// Block end kind differs from the innermost open block.
    BlockMismatch { offset: u64, open: i32, found: i32 },
    /// Stream ended (or writer finished) with blocks still open.
    UnclosedBlock { kind: i32, depth: usize },
    /// On-disk directory entry is unusable.
    InvalidDirectoryEntry { index: usize, reason: String },
    /// Stream does not start with the FIFF file header.
    NotAFiffFile { reason: String },
}

impl Display for FormatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TruncatedHeader { offset, available } => write!(
                f,
                "truncated tag header at offset {offset}: {available} of 16 bytes available"
            ),
            Self::InvalidHeader { offset, reason } => {
                write!(f, "invalid tag header at offset {offset}: {reason}")
            }
            Self::PayloadOutOfRange {
                offset,
                size,
                stream_len,
            } => write!(
                f,
                "tag at offset {offset} declares {size} payload bytes beyond stream length {stream_len}"
            ),
            Self::OffsetOutOfRange {
                offset,
                next,
                stream_len,
            } => write!(
                f,
                "tag at offset {offset} points to next offset {next} outside stream length {stream_len}"
            ),
            Self::TagCycle { offset } => {
                write!(f, "tag chain revisits offset {offset}")
            }
            Self::UnknownType { kind, type_code } => {
                write!(f, "tag kind {kind} has unknown type code {type_code:#x}")
            }
            Self::UnsupportedMatrixCoding { kind, type_code } => write!(
                f,
                "tag kind {kind} uses unsupported matrix coding {type_code:#x}"
            ),
            Self::InvalidPayload {
                kind,
                type_code,
                size,
                reason,
            } => write!(
                f,
                "tag kind {kind} (type {type_code:#x}, {size} bytes): {reason}"
            ),
            Self::TypeMismatch {
                kind,
                expected,
                type_code,
            } => write!(
                f,
                "tag kind {kind} has type {type_code:#x}, expected {expected}"
            ),
            Self::UnexpectedBlockEnd { offset, kind } => write!(
                f,
                "block end for kind {kind} at offset {offset} without an open block"
            ),
            Self::BlockMismatch {
                offset,
                open,
                found,
            } => write!(
                f,
                "block end at offset {offset} closes kind {found}, innermost open block is {open}"
            ),
            Self::UnclosedBlock { kind, depth } => {
                write!(f, "block of kind {kind} left open at depth {depth}")
            }
            Self::InvalidDirectoryEntry { index, reason } => {
                write!(f, "invalid directory entry {index}: {reason}")
            }
            Self::NotAFiffFile { reason } => write!(f, "not a FIFF file: {reason}"),
        }
    }
}

impl Error for FormatError {}

/// Required projection-item field names used in missing-field errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredField {
    Description,
    ChannelList,
    Kind,
    VectorCount,
    Data,
}

impl Display for RequiredField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Description => "description",
            Self::ChannelList => "channel list",
            Self::Kind => "kind",
            Self::VectorCount => "vector count",
            Self::Data => "data",
        };
        f.write_str(name)
    }
}

/// Coarse classification used by callers that pick a policy per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Structural,
    MissingField,
    Integrity,
}

/// Top-level error for every read/write operation in this crate.
#[derive(Debug)]
pub enum FiffError {
    Io(io::Error),
    Format(FormatError),
    /// A required tag is absent from projection item `item` (0-based).
    MissingField { item: usize, field: RequiredField },
    /// Decoded values violate a cross-field invariant.
    Integrity {
        item: Option<usize>,
        error: ValidationError,
    },
}

impl FiffError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Io(_) => ErrorCategory::Io,
            Self::Format(_) => ErrorCategory::Structural,
            Self::MissingField { .. } => ErrorCategory::MissingField,
            Self::Integrity { .. } => ErrorCategory::Integrity,
        }
    }
}

impl Display for FiffError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "I/O error: {err}"),
            Self::Format(err) => write!(f, "{err}"),
            Self::MissingField { item, field } => {
                write!(f, "projection item {item}: {field} missing")
            }
            Self::Integrity {
                item: Some(item),
                error,
            } => write!(f, "projection item {item}: {error}"),
            Self::Integrity { item: None, error } => write!(f, "{error}"),
        }
    }
}

impl Error for FiffError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Format(err) => Some(err),
            Self::MissingField { .. } => None,
            Self::Integrity { error, .. } => Some(error),
        }
    }
}

impl From<io::Error> for FiffError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<FormatError> for FiffError {
    fn from(value: FormatError) -> Self {
        Self::Format(value)
    }
}

impl From<ValidationError> for FiffError {
    fn from(value: ValidationError) -> Self {
        Self::Integrity {
            item: None,
            error: value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCategory, FiffError, FormatError, RequiredField};
    use crate::model::ValidationError;

    #[test]
    fn missing_field_message_names_the_field() {
        let err = FiffError::MissingField {
            item: 2,
            field: RequiredField::ChannelList,
        };
        assert_eq!(err.to_string(), "projection item 2: channel list missing");
        assert_eq!(err.category(), ErrorCategory::MissingField);
    }

    #[test]
    fn integrity_message_carries_both_quantities() {
        let err = FiffError::Integrity {
            item: Some(0),
            error: ValidationError::ColumnNamesMismatch {
                names: 3,
                columns: 4,
            },
        };
        let message = err.to_string();
        assert!(message.contains("channel name count (3)"), "{message}");
        assert!(message.contains("(4)"), "{message}");
    }

    #[test]
    fn format_errors_are_structural() {
        let err: FiffError = FormatError::TagCycle { offset: 64 }.into();
        assert_eq!(err.category(), ErrorCategory::Structural);
        assert_eq!(err.to_string(), "tag chain revisits offset 64");
    }
}
