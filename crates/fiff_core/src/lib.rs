//! Reader and writer for FIFF tagged binary containers.
//!
//! Files are a chain of tags; `FIFF_BLOCK_START`/`FIFF_BLOCK_END` pairs nest
//! them into a block tree. Projection (SSP) items are the first domain object
//! built on top of the generic tag layer.

pub mod constants;
pub mod dir;
pub mod error;
pub mod io;
pub mod logging;
pub mod model;
pub mod proj;
pub mod tag;
pub mod tree;

pub use error::{ErrorCategory, FiffError, FiffResult, FormatError, RequiredField};
pub use io::{create_fiff, open_fiff, DirectorySource, FiffReader, FiffWriter, WriterOptions};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::{NamedMatrix, ProjKind, ProjectionItem, ValidationError};
pub use proj::{
    projection_summary, read_projections, write_projections, MissingFieldPolicy, ReadOptions,
};
pub use tag::{FileId, Matrix, MatrixData, Tag, TagHeader, TagValue};
pub use tree::{BlockId, BlockNode, BlockTree};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
