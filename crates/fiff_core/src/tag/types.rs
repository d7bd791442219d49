//! Static type-code table.
//!
//! Every payload decode/encode is dispatched through [`lookup_type`] so the
//! codec, the reader helpers and the matrix coder share one definition of
//! element sizes.

use crate::constants::{
    FIFFT_BASE_MASK, FIFFT_BYTE, FIFFT_DIR_ENTRY_STRUCT, FIFFT_DOUBLE, FIFFT_FLOAT,
    FIFFT_ID_STRUCT, FIFFT_INT, FIFFT_JULIAN, FIFFT_LONG, FIFFT_MATRIX_CODING_DENSE,
    FIFFT_MATRIX_CODING_MASK, FIFFT_SHORT, FIFFT_STRING, FIFFT_UINT, FIFFT_ULONG, FIFFT_USHORT,
    FIFFT_VOID,
};
use crate::error::FormatError;

/// Semantic shape of a base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Void,
    Byte,
    Short,
    UShort,
    Int,
    UInt,
    ULong,
    Long,
    Julian,
    Float,
    Double,
    String,
    IdStruct,
    DirEntryStruct,
}

/// One row of the type table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeSpec {
    pub code: i32,
    pub name: &'static str,
    /// Bytes per element; `1` for strings, record size for structs.
    pub elem_size: usize,
    pub kind: ValueKind,
}

const TYPE_TABLE: &[TypeSpec] = &[
    TypeSpec {
        code: FIFFT_VOID,
        name: "void",
        elem_size: 0,
        kind: ValueKind::Void,
    },
    TypeSpec {
        code: FIFFT_BYTE,
        name: "byte",
        elem_size: 1,
        kind: ValueKind::Byte,
    },
    TypeSpec {
        code: FIFFT_SHORT,
        name: "short",
        elem_size: 2,
        kind: ValueKind::Short,
    },
    TypeSpec {
        code: FIFFT_INT,
        name: "int",
        elem_size: 4,
        kind: ValueKind::Int,
    },
    TypeSpec {
        code: FIFFT_FLOAT,
        name: "float",
        elem_size: 4,
        kind: ValueKind::Float,
    },
    TypeSpec {
        code: FIFFT_DOUBLE,
        name: "double",
        elem_size: 8,
        kind: ValueKind::Double,
    },
    TypeSpec {
        code: FIFFT_JULIAN,
        name: "julian",
        elem_size: 4,
        kind: ValueKind::Julian,
    },
    TypeSpec {
        code: FIFFT_USHORT,
        name: "ushort",
        elem_size: 2,
        kind: ValueKind::UShort,
    },
    TypeSpec {
        code: FIFFT_UINT,
        name: "uint",
        elem_size: 4,
        kind: ValueKind::UInt,
    },
    TypeSpec {
        code: FIFFT_ULONG,
        name: "ulong",
        elem_size: 8,
        kind: ValueKind::ULong,
    },
    TypeSpec {
        code: FIFFT_STRING,
        name: "string",
        elem_size: 1,
        kind: ValueKind::String,
    },
    TypeSpec {
        code: FIFFT_LONG,
        name: "long",
        elem_size: 8,
        kind: ValueKind::Long,
    },
    TypeSpec {
        code: FIFFT_ID_STRUCT,
        name: "id",
        elem_size: 20,
        kind: ValueKind::IdStruct,
    },
    TypeSpec {
        code: FIFFT_DIR_ENTRY_STRUCT,
        name: "dir entry",
        elem_size: 16,
        kind: ValueKind::DirEntryStruct,
    },
];

/// Returns the registered base type for `code`, if any.
pub fn lookup_type(code: i32) -> Option<&'static TypeSpec> {
    TYPE_TABLE.iter().find(|spec| spec.code == code)
}

/// Type code split into its coding and base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    Plain(&'static TypeSpec),
    DenseMatrix(&'static TypeSpec),
}

/// Resolves a raw header type code for tag `kind`.
///
/// Dense matrices are only defined over int, float and double elements.
pub fn classify(kind: i32, type_code: i32) -> Result<TypeCode, FormatError> {
    let coding = type_code & FIFFT_MATRIX_CODING_MASK;
    let base = type_code & FIFFT_BASE_MASK;

    if coding == 0 {
        return lookup_type(type_code)
            .map(TypeCode::Plain)
            .ok_or(FormatError::UnknownType { kind, type_code });
    }

    if coding != FIFFT_MATRIX_CODING_DENSE {
        return Err(FormatError::UnsupportedMatrixCoding { kind, type_code });
    }

    match lookup_type(base) {
        Some(spec) if matches!(spec.kind, ValueKind::Int | ValueKind::Float | ValueKind::Double) => {
            Ok(TypeCode::DenseMatrix(spec))
        }
        Some(_) => Err(FormatError::UnsupportedMatrixCoding { kind, type_code }),
        None => Err(FormatError::UnknownType { kind, type_code }),
    }
}
