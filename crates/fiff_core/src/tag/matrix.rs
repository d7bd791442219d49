//! Dense matrix payloads.
//!
//! Layout: row-major elements, then the extents innermost-first, then the
//! rank, all big-endian. A 2-D `nrow x ncol` matrix therefore ends with
//! `ncol, nrow, 2`.

use super::types::{TypeSpec, ValueKind};
use crate::constants::{FIFFT_DOUBLE, FIFFT_FLOAT, FIFFT_INT, FIFFT_MATRIX_CODING_DENSE};
use crate::error::FormatError;
use crate::model::ValidationError;

const MAX_MATRIX_RANK: i32 = 8;

/// Element storage of a dense matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum MatrixData {
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl MatrixData {
    pub fn len(&self) -> usize {
        match self {
            Self::Int(values) => values.len(),
            Self::Float(values) => values.len(),
            Self::Double(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn base_type(&self) -> i32 {
        match self {
            Self::Int(_) => FIFFT_INT,
            Self::Float(_) => FIFFT_FLOAT,
            Self::Double(_) => FIFFT_DOUBLE,
        }
    }
}

/// N-dimensional dense matrix; `dims` lists extents outermost first.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    dims: Vec<usize>,
    data: MatrixData,
}

impl Matrix {
    /// Builds a matrix, checking that `data` holds exactly `product(dims)` values.
    pub fn new(dims: Vec<usize>, data: MatrixData) -> Result<Self, ValidationError> {
        let expected = dims.iter().product::<usize>();
        if dims.is_empty() || expected != data.len() {
            return Err(ValidationError::MatrixShapeMismatch {
                dims,
                len: data.len(),
            });
        }
        Ok(Self { dims, data })
    }

    /// Convenience constructor for a row-major float matrix.
    pub fn from_rows_f32(
        nrow: usize,
        ncol: usize,
        data: Vec<f32>,
    ) -> Result<Self, ValidationError> {
        Self::new(vec![nrow, ncol], MatrixData::Float(data))
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn data(&self) -> &MatrixData {
        &self.data
    }

    pub fn into_data(self) -> MatrixData {
        self.data
    }

    /// Row count of a 2-D matrix.
    pub fn rows(&self) -> Option<usize> {
        match self.dims.as_slice() {
            [rows, _] => Some(*rows),
            _ => None,
        }
    }

    /// Column count of a 2-D matrix.
    pub fn cols(&self) -> Option<usize> {
        match self.dims.as_slice() {
            [_, cols] => Some(*cols),
            _ => None,
        }
    }

    /// Header type code for this matrix.
    pub fn type_code(&self) -> i32 {
        FIFFT_MATRIX_CODING_DENSE | self.data.base_type()
    }

    /// Elements widened to `f32`, used by readers that accept any numeric matrix.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match &self.data {
            MatrixData::Int(values) => values.iter().map(|v| *v as f32).collect(),
            MatrixData::Float(values) => values.clone(),
            MatrixData::Double(values) => values.iter().map(|v| *v as f32).collect(),
        }
    }
}

pub(crate) fn decode_dense(
    kind: i32,
    type_code: i32,
    base: &TypeSpec,
    bytes: &[u8],
) -> Result<Matrix, FormatError> {
    let invalid = |reason: String| FormatError::InvalidPayload {
        kind,
        type_code,
        size: bytes.len(),
        reason,
    };

    if bytes.len() < 4 {
        return Err(invalid("matrix payload lacks a rank field".to_string()));
    }
    let ndim = read_i32(&bytes[bytes.len() - 4..]);
    if !(1..=MAX_MATRIX_RANK).contains(&ndim) {
        return Err(invalid(format!("matrix rank {ndim} out of range")));
    }
    let trailer = 4 * (ndim as usize + 1);
    if bytes.len() < trailer {
        return Err(invalid(format!(
            "matrix rank {ndim} needs {trailer} trailer bytes"
        )));
    }

    let body_len = bytes.len() - trailer;
    let mut dims = Vec::with_capacity(ndim as usize);
    for raw in bytes[body_len..bytes.len() - 4].chunks_exact(4) {
        let extent = read_i32(raw);
        if extent < 0 {
            return Err(invalid(format!("negative matrix extent {extent}")));
        }
        dims.push(extent as usize);
    }
    dims.reverse();

    let count = dims
        .iter()
        .try_fold(1usize, |acc, extent| acc.checked_mul(*extent))
        .ok_or_else(|| invalid("matrix extents overflow".to_string()))?;
    let expected = count
        .checked_mul(base.elem_size)
        .ok_or_else(|| invalid("matrix extents overflow".to_string()))?;
    if expected != body_len {
        return Err(invalid(format!(
            "matrix extents {dims:?} need {expected} data bytes, found {body_len}"
        )));
    }

    let body = &bytes[..body_len];
    let data = match base.kind {
        ValueKind::Int => MatrixData::Int(decode_array(body, i32::from_be_bytes)),
        ValueKind::Float => MatrixData::Float(decode_array(body, f32::from_be_bytes)),
        ValueKind::Double => MatrixData::Double(decode_array(body, f64::from_be_bytes)),
        _ => return Err(FormatError::UnsupportedMatrixCoding { kind, type_code }),
    };

    Ok(Matrix { dims, data })
}

pub(crate) fn encode_dense(matrix: &Matrix) -> Vec<u8> {
    let mut out = match &matrix.data {
        MatrixData::Int(values) => encode_array(values, |v| v.to_be_bytes()),
        MatrixData::Float(values) => encode_array(values, |v| v.to_be_bytes()),
        MatrixData::Double(values) => encode_array(values, |v| v.to_be_bytes()),
    };
    for extent in matrix.dims.iter().rev() {
        out.extend_from_slice(&(*extent as i32).to_be_bytes());
    }
    out.extend_from_slice(&(matrix.dims.len() as i32).to_be_bytes());
    out
}

pub(crate) fn decode_array<const N: usize, T>(bytes: &[u8], convert: fn([u8; N]) -> T) -> Vec<T> {
    bytes
        .chunks_exact(N)
        .map(|chunk| {
            let mut buf = [0u8; N];
            buf.copy_from_slice(chunk);
            convert(buf)
        })
        .collect()
}

pub(crate) fn encode_array<const N: usize, T: Copy>(
    values: &[T],
    convert: impl Fn(T) -> [u8; N],
) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * N);
    for value in values {
        out.extend_from_slice(&convert(*value));
    }
    out
}

fn read_i32(bytes: &[u8]) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    i32::from_be_bytes(buf)
}
