//! Typed payload values and the type-code driven codec.
//!
//! # Responsibility
//! - Decode raw payload bytes into a [`TagValue`] chosen by the header type code.
//! - Encode a [`TagValue`] back into `(type_code, bytes)`.
//!
//! # Invariants
//! - Numeric payloads round-trip bit-for-bit.
//! - Strings are written without padding; trailing NUL padding is trimmed on
//!   read, so strings ending in NUL do not round-trip.

use super::matrix::{decode_array, decode_dense, encode_array, encode_dense, Matrix};
use super::types::{classify, TypeCode, TypeSpec, ValueKind};
use crate::constants::{
    FIFFC_VERSION, FIFFT_BYTE, FIFFT_DIR_ENTRY_STRUCT, FIFFT_DOUBLE, FIFFT_FLOAT, FIFFT_ID_STRUCT,
    FIFFT_INT, FIFFT_JULIAN, FIFFT_LONG, FIFFT_SHORT, FIFFT_STRING, FIFFT_UINT, FIFFT_ULONG,
    FIFFT_USHORT, FIFFT_VOID, NAME_LIST_DELIMITER,
};
use crate::error::FormatError;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// File or block identifier (`FIFFT_ID_STRUCT`, 20 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileId {
    pub version: i32,
    pub machid: [i32; 2],
    pub secs: i32,
    pub usecs: i32,
}

/// Seconds saturate at `i32::MAX` instead of wrapping past 2038.
fn timestamp(elapsed: Duration) -> (i32, i32) {
    (
        i32::try_from(elapsed.as_secs()).unwrap_or(i32::MAX),
        elapsed.subsec_micros() as i32,
    )
}

impl FileId {
    pub const ENCODED_SIZE: usize = 20;

    /// Fresh identifier stamped with the current time and a random machine id.
    pub fn generate() -> Self {
        let random = Uuid::new_v4();
        let bytes = random.as_bytes();
        let machid = [
            i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            i32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        ];
        let (secs, usecs) = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => timestamp(elapsed),
            Err(_) => (0, 0),
        };
        Self {
            version: FIFFC_VERSION,
            machid,
            secs,
            usecs,
        }
    }

    fn to_bytes(self) -> [u8; Self::ENCODED_SIZE] {
        let mut out = [0u8; Self::ENCODED_SIZE];
        let fields = [
            self.version,
            self.machid[0],
            self.machid[1],
            self.secs,
            self.usecs,
        ];
        for (slot, field) in out.chunks_exact_mut(4).zip(fields) {
            slot.copy_from_slice(&field.to_be_bytes());
        }
        out
    }

    fn from_fields(fields: &[i32]) -> Self {
        Self {
            version: fields[0],
            machid: [fields[1], fields[2]],
            secs: fields[3],
            usecs: fields[4],
        }
    }
}

/// One on-disk directory record (`FIFFT_DIR_ENTRY_STRUCT`, 16 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub kind: i32,
    pub type_code: i32,
    pub size: i32,
    /// Offset of the tag header.
    pub pos: i32,
}

impl DirEntry {
    pub const ENCODED_SIZE: usize = 16;
}

/// Decoded payload, one variant per registered base type plus dense matrices.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Void,
    Bytes(Vec<u8>),
    Short(Vec<i16>),
    UShort(Vec<u16>),
    Int(Vec<i32>),
    UInt(Vec<u32>),
    ULong(Vec<u64>),
    Long(Vec<i64>),
    Julian(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
    String(String),
    Id(FileId),
    DirEntries(Vec<DirEntry>),
    Matrix(Matrix),
}

impl TagValue {
    /// First element of an int payload.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(values) | Self::Julian(values) => values.first().copied(),
            _ => None,
        }
    }

    /// First element of a float or double payload, narrowed to `f32`.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(values) => values.first().copied(),
            Self::Double(values) => values.first().map(|v| *v as f32),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&Matrix> {
        match self {
            Self::Matrix(matrix) => Some(matrix),
            _ => None,
        }
    }

    /// Header type code this value is written with.
    pub fn type_code(&self) -> i32 {
        match self {
            Self::Void => FIFFT_VOID,
            Self::Bytes(_) => FIFFT_BYTE,
            Self::Short(_) => FIFFT_SHORT,
            Self::UShort(_) => FIFFT_USHORT,
            Self::Int(_) => FIFFT_INT,
            Self::UInt(_) => FIFFT_UINT,
            Self::ULong(_) => FIFFT_ULONG,
            Self::Long(_) => FIFFT_LONG,
            Self::Julian(_) => FIFFT_JULIAN,
            Self::Float(_) => FIFFT_FLOAT,
            Self::Double(_) => FIFFT_DOUBLE,
            Self::String(_) => FIFFT_STRING,
            Self::Id(_) => FIFFT_ID_STRUCT,
            Self::DirEntries(_) => FIFFT_DIR_ENTRY_STRUCT,
            Self::Matrix(matrix) => matrix.type_code(),
        }
    }

    /// Short human-readable name of the payload shape, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bytes(_) => "byte",
            Self::Short(_) => "short",
            Self::UShort(_) => "ushort",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::ULong(_) => "ulong",
            Self::Long(_) => "long",
            Self::Julian(_) => "julian",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Id(_) => "id",
            Self::DirEntries(_) => "dir entry",
            Self::Matrix(_) => "matrix",
        }
    }
}

/// Decodes a payload of tag `kind` according to `type_code`.
pub fn decode_payload(kind: i32, type_code: i32, bytes: &[u8]) -> Result<TagValue, FormatError> {
    match classify(kind, type_code)? {
        TypeCode::DenseMatrix(base) => {
            decode_dense(kind, type_code, base, bytes).map(TagValue::Matrix)
        }
        TypeCode::Plain(spec) => decode_plain(kind, spec, bytes),
    }
}

fn decode_plain(kind: i32, spec: &TypeSpec, bytes: &[u8]) -> Result<TagValue, FormatError> {
    let invalid = |reason: String| FormatError::InvalidPayload {
        kind,
        type_code: spec.code,
        size: bytes.len(),
        reason,
    };

    if spec.kind == ValueKind::Void {
        if !bytes.is_empty() {
            return Err(invalid("void tag carries a payload".to_string()));
        }
        return Ok(TagValue::Void);
    }
    if bytes.len() % spec.elem_size != 0 {
        return Err(invalid(format!(
            "size is not a multiple of the {} element size {}",
            spec.name, spec.elem_size
        )));
    }

    let value = match spec.kind {
        ValueKind::Void => TagValue::Void,
        ValueKind::Byte => TagValue::Bytes(bytes.to_vec()),
        ValueKind::Short => TagValue::Short(decode_array(bytes, i16::from_be_bytes)),
        ValueKind::UShort => TagValue::UShort(decode_array(bytes, u16::from_be_bytes)),
        ValueKind::Int => TagValue::Int(decode_array(bytes, i32::from_be_bytes)),
        ValueKind::UInt => TagValue::UInt(decode_array(bytes, u32::from_be_bytes)),
        ValueKind::ULong => TagValue::ULong(decode_array(bytes, u64::from_be_bytes)),
        ValueKind::Long => TagValue::Long(decode_array(bytes, i64::from_be_bytes)),
        ValueKind::Julian => TagValue::Julian(decode_array(bytes, i32::from_be_bytes)),
        ValueKind::Float => TagValue::Float(decode_array(bytes, f32::from_be_bytes)),
        ValueKind::Double => TagValue::Double(decode_array(bytes, f64::from_be_bytes)),
        ValueKind::String => TagValue::String(decode_string(bytes)),
        ValueKind::IdStruct => {
            if bytes.len() != FileId::ENCODED_SIZE {
                return Err(invalid("id struct must be exactly 20 bytes".to_string()));
            }
            let fields = decode_array(bytes, i32::from_be_bytes);
            TagValue::Id(FileId::from_fields(&fields))
        }
        ValueKind::DirEntryStruct => {
            let fields = decode_array(bytes, i32::from_be_bytes);
            let entries = fields
                .chunks_exact(4)
                .map(|entry| DirEntry {
                    kind: entry[0],
                    type_code: entry[1],
                    size: entry[2],
                    pos: entry[3],
                })
                .collect();
            TagValue::DirEntries(entries)
        }
    };
    Ok(value)
}

/// Encodes a value into its header type code and payload bytes.
pub fn encode_payload(value: &TagValue) -> (i32, Vec<u8>) {
    match value {
        TagValue::Void => (FIFFT_VOID, Vec::new()),
        TagValue::Bytes(values) => (FIFFT_BYTE, values.clone()),
        TagValue::Short(values) => (FIFFT_SHORT, encode_array(values, |v| v.to_be_bytes())),
        TagValue::UShort(values) => (FIFFT_USHORT, encode_array(values, |v| v.to_be_bytes())),
        TagValue::Int(values) => (FIFFT_INT, encode_array(values, |v| v.to_be_bytes())),
        TagValue::UInt(values) => (FIFFT_UINT, encode_array(values, |v| v.to_be_bytes())),
        TagValue::ULong(values) => (FIFFT_ULONG, encode_array(values, |v| v.to_be_bytes())),
        TagValue::Long(values) => (FIFFT_LONG, encode_array(values, |v| v.to_be_bytes())),
        TagValue::Julian(values) => (FIFFT_JULIAN, encode_array(values, |v| v.to_be_bytes())),
        TagValue::Float(values) => (FIFFT_FLOAT, encode_array(values, |v| v.to_be_bytes())),
        TagValue::Double(values) => (FIFFT_DOUBLE, encode_array(values, |v| v.to_be_bytes())),
        TagValue::String(value) => (FIFFT_STRING, value.as_bytes().to_vec()),
        TagValue::Id(id) => (FIFFT_ID_STRUCT, id.to_bytes().to_vec()),
        TagValue::DirEntries(entries) => {
            let mut out = Vec::with_capacity(entries.len() * DirEntry::ENCODED_SIZE);
            for entry in entries {
                for field in [entry.kind, entry.type_code, entry.size, entry.pos] {
                    out.extend_from_slice(&field.to_be_bytes());
                }
            }
            (FIFFT_DIR_ENTRY_STRUCT, out)
        }
        TagValue::Matrix(matrix) => (matrix.type_code(), encode_dense(matrix)),
    }
}

fn decode_string(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|byte| *byte != 0)
        .map_or(0, |last| last + 1);
    let trimmed = &bytes[..end];
    match std::str::from_utf8(trimmed) {
        Ok(text) => text.to_string(),
        // Legacy writers store Latin-1.
        Err(_) => trimmed.iter().map(|byte| char::from(*byte)).collect(),
    }
}

/// Splits a name-list payload on `:`; empty segments are kept as empty names.
///
/// The split is literal, so an empty payload is one empty name.
pub fn split_name_list(value: &str) -> Vec<String> {
    value
        .split(NAME_LIST_DELIMITER)
        .map(str::to_string)
        .collect()
}

/// Joins names with `:`, the exact inverse of [`split_name_list`] for non-empty lists.
/// An empty list has no encoding of its own; projection items reject it.
pub fn join_name_list<S: AsRef<str>>(names: &[S]) -> String {
    let mut out = String::new();
    for (index, name) in names.iter().enumerate() {
        if index > 0 {
            out.push(NAME_LIST_DELIMITER);
        }
        out.push_str(name.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{
        decode_payload, encode_payload, join_name_list, split_name_list, timestamp, DirEntry,
        FileId, TagValue,
    };
    use std::time::Duration;
    use crate::constants::{FIFFT_FLOAT, FIFFT_ID_STRUCT, FIFFT_INT, FIFFT_STRING, FIFFT_VOID};
    use crate::error::FormatError;
    use crate::tag::matrix::Matrix;

    fn round_trip(value: TagValue) -> TagValue {
        let (type_code, bytes) = encode_payload(&value);
        decode_payload(42, type_code, &bytes).unwrap()
    }

    #[test]
    fn ints_are_big_endian() {
        let (type_code, bytes) = encode_payload(&TagValue::Int(vec![1, -2]));
        assert_eq!(type_code, FIFFT_INT);
        assert_eq!(bytes, vec![0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFE]);
    }

    #[test]
    fn floats_round_trip_bit_for_bit() {
        let values = vec![f32::MIN_POSITIVE, -0.0, 1.0e-30, f32::MAX];
        let decoded = round_trip(TagValue::Float(values.clone()));
        let TagValue::Float(decoded) = decoded else {
            panic!("expected floats");
        };
        let original_bits: Vec<u32> = values.iter().map(|v| v.to_bits()).collect();
        let decoded_bits: Vec<u32> = decoded.iter().map(|v| v.to_bits()).collect();
        assert_eq!(original_bits, decoded_bits);
    }

    #[test]
    fn structs_and_matrices_round_trip() {
        let id = FileId {
            version: 65539,
            machid: [7, -9],
            secs: 1_700_000_000,
            usecs: 12,
        };
        assert_eq!(round_trip(TagValue::Id(id)), TagValue::Id(id));

        let entries = vec![DirEntry {
            kind: 104,
            type_code: FIFFT_INT,
            size: 4,
            pos: 56,
        }];
        assert_eq!(
            round_trip(TagValue::DirEntries(entries.clone())),
            TagValue::DirEntries(entries)
        );

        let matrix = Matrix::from_rows_f32(1, 2, vec![0.25, 0.75]).unwrap();
        assert_eq!(
            round_trip(TagValue::Matrix(matrix.clone())),
            TagValue::Matrix(matrix)
        );
    }

    #[test]
    fn strings_trim_trailing_padding_only() {
        let decoded = decode_payload(1, FIFFT_STRING, b"EEG 001\0\0\0").unwrap();
        assert_eq!(decoded, TagValue::String("EEG 001".to_string()));
        let decoded = decode_payload(1, FIFFT_STRING, b" lead ").unwrap();
        assert_eq!(decoded.as_str(), Some(" lead "));
    }

    #[test]
    fn size_must_match_element_size() {
        let err = decode_payload(5, FIFFT_FLOAT, &[0, 0, 0]).unwrap_err();
        assert!(matches!(err, FormatError::InvalidPayload { kind: 5, size: 3, .. }));
        assert!(decode_payload(5, FIFFT_ID_STRUCT, &[0; 16]).is_err());
        assert!(decode_payload(5, FIFFT_VOID, &[1]).is_err());
    }

    #[test]
    fn name_lists_keep_empty_segments() {
        assert_eq!(split_name_list("Fp1::Cz"), vec!["Fp1", "", "Cz"]);
        assert_eq!(split_name_list("Fp1:"), vec!["Fp1", ""]);
        assert_eq!(split_name_list(""), vec![""]);
        assert_eq!(split_name_list(":"), vec!["", ""]);
        assert_eq!(join_name_list(&["Fp1", "", "Cz"]), "Fp1::Cz");
        assert_eq!(join_name_list::<&str>(&[]), "");
    }

    #[test]
    fn file_id_seconds_saturate_instead_of_wrapping() {
        assert_eq!(timestamp(Duration::new(1_700_000_000, 5_000)), (1_700_000_000, 5));
        let after_2038 = Duration::from_secs(u64::from(u32::MAX) + 10);
        assert_eq!(timestamp(after_2038).0, i32::MAX);
        assert!(FileId::generate().secs > 0);
    }

    #[test]
    fn scalar_accessors_report_shape_mismatch_as_none() {
        assert_eq!(TagValue::Int(vec![3]).as_int(), Some(3));
        assert_eq!(TagValue::Double(vec![0.5]).as_float(), Some(0.5));
        assert_eq!(TagValue::Float(vec![0.5]).as_int(), None);
        assert_eq!(TagValue::Int(vec![]).as_int(), None);
    }
}
