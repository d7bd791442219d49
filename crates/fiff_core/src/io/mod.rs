//! File-level reading and writing on top of the tag codec.

pub mod reader;
pub mod writer;

pub use reader::{open_fiff, DirectorySource, FiffReader};
pub use writer::{create_fiff, FiffWriter, WriterOptions};
