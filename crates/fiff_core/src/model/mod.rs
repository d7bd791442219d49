//! Domain objects persisted through FIFF tags.
//!
//! # Responsibility
//! - Define the in-memory shape of named matrices and projection items.
//! - Enforce their cross-field invariants at construction time.
//!
//! # Invariants
//! - A constructed value always satisfies its invariants; there is no
//!   "unchecked" constructor in the public API.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod named_matrix;
pub mod projection;

pub use named_matrix::NamedMatrix;
pub use projection::{ProjKind, ProjectionItem};

/// Data-integrity violations on model construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Flat data length differs from `nrow * ncol`.
    DataShapeMismatch { nrow: usize, ncol: usize, len: usize },
    /// N-dimensional matrix element count differs from its extents.
    MatrixShapeMismatch { dims: Vec<usize>, len: usize },
    RowNamesMismatch { names: usize, rows: usize },
    /// Channel (column) names do not match the data columns.
    ColumnNamesMismatch { names: usize, columns: usize },
    /// Projection items must name every channel.
    MissingColumnNames,
    /// Projection items span at least one channel.
    NoChannels,
    /// Declared vector count differs from the data rows.
    VectorCountMismatch { nvec: usize, rows: usize },
    /// Declared channel count differs from the data columns.
    ChannelCountMismatch { nchan: usize, columns: usize },
    /// A count tag holds a negative value.
    NegativeCount { field: &'static str, value: i32 },
    /// A count does not fit the 32-bit on-disk field.
    CountOverflow { field: &'static str, value: usize },
    /// Matrix payload is not two-dimensional.
    NotTwoDimensional { dims: Vec<usize> },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataShapeMismatch { nrow, ncol, len } => write!(
                f,
                "data holds {len} values, expected {nrow} x {ncol}"
            ),
            Self::MatrixShapeMismatch { dims, len } => {
                write!(f, "matrix extents {dims:?} do not match {len} values")
            }
            Self::RowNamesMismatch { names, rows } => write!(
                f,
                "row name count ({names}) does not match data matrix rows ({rows})"
            ),
            Self::ColumnNamesMismatch { names, columns } => write!(
                f,
                "channel name count ({names}) does not match data matrix columns ({columns})"
            ),
            Self::MissingColumnNames => write!(f, "channel names are required"),
            Self::NoChannels => write!(f, "projection items need at least one channel"),
            Self::VectorCountMismatch { nvec, rows } => write!(
                f,
                "vector count ({nvec}) does not match data matrix rows ({rows})"
            ),
            Self::ChannelCountMismatch { nchan, columns } => write!(
                f,
                "channel count ({nchan}) does not match data matrix columns ({columns})"
            ),
            Self::NegativeCount { field, value } => {
                write!(f, "{field} must not be negative, got {value}")
            }
            Self::CountOverflow { field, value } => {
                write!(f, "{field} {value} does not fit in a 32-bit tag")
            }
            Self::NotTwoDimensional { dims } => {
                write!(f, "expected a 2-D matrix, got extents {dims:?}")
            }
        }
    }
}

impl Error for ValidationError {}
