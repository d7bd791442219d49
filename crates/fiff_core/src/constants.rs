//! FIFF code tables: tag kinds, block kinds, type codes and sentinels.
//!
//! # Responsibility
//! - Keep every numeric code the codec and readers depend on in one place.
//!
//! # Invariants
//! - Values mirror the on-disk FIFF format and must never be renumbered.

/// Size of an encoded tag header in bytes.
pub const TAG_HEADER_SIZE: u64 = 16;

/// `next` value meaning "the next tag immediately follows the payload".
pub const FIFFV_NEXT_SEQ: i32 = 0;
/// `next` value marking the last tag of a file.
pub const FIFFV_NEXT_NONE: i32 = -1;

/// Major/minor version written into file identifiers.
pub const FIFFC_MAJOR_VERSION: i32 = 1;
pub const FIFFC_MINOR_VERSION: i32 = 3;
pub const FIFFC_VERSION: i32 = (FIFFC_MAJOR_VERSION << 16) | FIFFC_MINOR_VERSION;

// File structure tags.
pub const FIFF_FILE_ID: i32 = 100;
pub const FIFF_DIR_POINTER: i32 = 101;
pub const FIFF_DIR: i32 = 102;
pub const FIFF_BLOCK_ID: i32 = 103;
pub const FIFF_BLOCK_START: i32 = 104;
pub const FIFF_BLOCK_END: i32 = 105;
pub const FIFF_FREE_LIST: i32 = 106;
pub const FIFF_NOP: i32 = 108;

// General measurement tags.
pub const FIFF_NAME: i32 = 3;
pub const FIFF_NCHAN: i32 = 200;
pub const FIFF_DESCRIPTION: i32 = 206;

// Projection tags.
pub const FIFF_PROJ_ITEM_KIND: i32 = 3411;
pub const FIFF_PROJ_ITEM_TIME: i32 = 3412;
pub const FIFF_PROJ_ITEM_NVEC: i32 = 3414;
pub const FIFF_PROJ_ITEM_VECTORS: i32 = 3415;
pub const FIFF_PROJ_ITEM_CH_NAME_LIST: i32 = 3417;
pub const FIFF_MNE_PROJ_ITEM_ACTIVE: i32 = 3560;

// Block kinds.
pub const FIFFB_MEAS: i32 = 100;
pub const FIFFB_MEAS_INFO: i32 = 101;
pub const FIFFB_PROJ: i32 = 313;
pub const FIFFB_PROJ_ITEM: i32 = 314;
pub const FIFFB_ROOT: i32 = 999;

// Projection item kinds.
pub const FIFFV_PROJ_ITEM_NONE: i32 = 0;
pub const FIFFV_PROJ_ITEM_FIELD: i32 = 1;
pub const FIFFV_PROJ_ITEM_DIP_FIX: i32 = 2;
pub const FIFFV_PROJ_ITEM_DIP_ROT: i32 = 3;
pub const FIFFV_PROJ_ITEM_HOMOG_GRAD: i32 = 4;
pub const FIFFV_PROJ_ITEM_HOMOG_FIELD: i32 = 5;
pub const FIFFV_MNE_PROJ_ITEM_EEG_AVREF: i32 = 10;

// Base payload types.
pub const FIFFT_VOID: i32 = 0;
pub const FIFFT_BYTE: i32 = 1;
pub const FIFFT_SHORT: i32 = 2;
pub const FIFFT_INT: i32 = 3;
pub const FIFFT_FLOAT: i32 = 4;
pub const FIFFT_DOUBLE: i32 = 5;
pub const FIFFT_JULIAN: i32 = 6;
pub const FIFFT_USHORT: i32 = 7;
pub const FIFFT_UINT: i32 = 8;
pub const FIFFT_ULONG: i32 = 9;
pub const FIFFT_STRING: i32 = 10;
pub const FIFFT_LONG: i32 = 11;
pub const FIFFT_ID_STRUCT: i32 = 31;
pub const FIFFT_DIR_ENTRY_STRUCT: i32 = 32;

// Matrix codings, combined with a base type in the upper 16 bits.
pub const FIFFT_BASE_MASK: i32 = 0x0000_FFFF;
pub const FIFFT_MATRIX_CODING_MASK: i32 = 0xFFFF_0000_u32 as i32;
pub const FIFFT_MATRIX_CODING_DENSE: i32 = 0x4000_0000;
pub const FIFFT_MATRIX_CODING_CCS: i32 = 0x4010_0000;
pub const FIFFT_MATRIX_CODING_RCS: i32 = 0x4020_0000;

/// Delimiter between names in a name-list string payload.
pub const NAME_LIST_DELIMITER: char = ':';
