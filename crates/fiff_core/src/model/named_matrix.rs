//! Named matrix: a 2-D float grid with optional row/column labels.

use super::ValidationError;
use serde::{Deserialize, Serialize};

/// Row-major `nrow x ncol` float matrix with optional labels.
///
/// Deserialization goes through [`NamedMatrix::new`], so serialized input
/// that breaks the shape invariants is rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "NamedMatrixFields")]
pub struct NamedMatrix {
    pub nrow: usize,
    pub ncol: usize,
    pub row_names: Option<Vec<String>>,
    pub col_names: Option<Vec<String>>,
    pub data: Vec<f32>,
}

#[derive(Deserialize)]
struct NamedMatrixFields {
    nrow: usize,
    ncol: usize,
    row_names: Option<Vec<String>>,
    col_names: Option<Vec<String>>,
    data: Vec<f32>,
}

impl TryFrom<NamedMatrixFields> for NamedMatrix {
    type Error = ValidationError;

    fn try_from(value: NamedMatrixFields) -> Result<Self, Self::Error> {
        Self::new(
            value.nrow,
            value.ncol,
            value.row_names,
            value.col_names,
            value.data,
        )
    }
}

impl NamedMatrix {
    /// Creates a matrix after checking data length and label counts.
    pub fn new(
        nrow: usize,
        ncol: usize,
        row_names: Option<Vec<String>>,
        col_names: Option<Vec<String>>,
        data: Vec<f32>,
    ) -> Result<Self, ValidationError> {
        let matrix = Self {
            nrow,
            ncol,
            row_names,
            col_names,
            data,
        };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Re-checks invariants; useful after callers mutate public fields.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.nrow.checked_mul(self.ncol) != Some(self.data.len()) {
            return Err(ValidationError::DataShapeMismatch {
                nrow: self.nrow,
                ncol: self.ncol,
                len: self.data.len(),
            });
        }
        if let Some(names) = &self.row_names {
            if names.len() != self.nrow {
                return Err(ValidationError::RowNamesMismatch {
                    names: names.len(),
                    rows: self.nrow,
                });
            }
        }
        if let Some(names) = &self.col_names {
            if names.len() != self.ncol {
                return Err(ValidationError::ColumnNamesMismatch {
                    names: names.len(),
                    columns: self.ncol,
                });
            }
        }
        Ok(())
    }

    /// One row of the grid, or `None` past the last row.
    pub fn row(&self, index: usize) -> Option<&[f32]> {
        if index >= self.nrow {
            return None;
        }
        let start = index * self.ncol;
        self.data.get(start..start + self.ncol)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if col >= self.ncol {
            return None;
        }
        self.row(row).map(|values| values[col])
    }
}

#[cfg(test)]
mod tests {
    use super::NamedMatrix;
    use crate::model::ValidationError;

    fn names(list: &[&str]) -> Option<Vec<String>> {
        Some(list.iter().map(|name| name.to_string()).collect())
    }

    #[test]
    fn new_accepts_consistent_shapes() {
        let matrix =
            NamedMatrix::new(2, 2, None, names(&["a", "b"]), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(matrix.row(1), Some(&[3.0, 4.0][..]));
        assert_eq!(matrix.get(0, 1), Some(2.0));
        assert_eq!(matrix.get(0, 2), None);
        assert_eq!(matrix.row(2), None);
    }

    #[test]
    fn new_rejects_label_and_shape_mismatches() {
        assert_eq!(
            NamedMatrix::new(1, 3, None, None, vec![0.0; 2]).unwrap_err(),
            ValidationError::DataShapeMismatch {
                nrow: 1,
                ncol: 3,
                len: 2
            }
        );
        assert_eq!(
            NamedMatrix::new(1, 2, None, names(&["a"]), vec![0.0; 2]).unwrap_err(),
            ValidationError::ColumnNamesMismatch {
                names: 1,
                columns: 2
            }
        );
        assert_eq!(
            NamedMatrix::new(1, 2, names(&["r0", "r1"]), None, vec![0.0; 2]).unwrap_err(),
            ValidationError::RowNamesMismatch { names: 2, rows: 1 }
        );
    }
}
