//! Signal-space projection items.
//!
//! # Invariants
//! - `data.col_names` is always present and has exactly `data.ncol` entries.

use super::{NamedMatrix, ValidationError};
use crate::constants::{
    FIFFV_MNE_PROJ_ITEM_EEG_AVREF, FIFFV_PROJ_ITEM_DIP_FIX, FIFFV_PROJ_ITEM_DIP_ROT,
    FIFFV_PROJ_ITEM_FIELD, FIFFV_PROJ_ITEM_HOMOG_FIELD, FIFFV_PROJ_ITEM_HOMOG_GRAD,
    FIFFV_PROJ_ITEM_NONE,
};
use serde::{Deserialize, Serialize};

/// Category of a projector. Unknown on-disk codes are kept verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjKind {
    None,
    Field,
    DipFix,
    DipRot,
    HomogGrad,
    HomogField,
    #[serde(rename = "eeg_avref")]
    EegAverageRef,
    Other(i32),
}

impl ProjKind {
    pub fn from_code(code: i32) -> Self {
        match code {
            FIFFV_PROJ_ITEM_NONE => Self::None,
            FIFFV_PROJ_ITEM_FIELD => Self::Field,
            FIFFV_PROJ_ITEM_DIP_FIX => Self::DipFix,
            FIFFV_PROJ_ITEM_DIP_ROT => Self::DipRot,
            FIFFV_PROJ_ITEM_HOMOG_GRAD => Self::HomogGrad,
            FIFFV_PROJ_ITEM_HOMOG_FIELD => Self::HomogField,
            FIFFV_MNE_PROJ_ITEM_EEG_AVREF => Self::EegAverageRef,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::None => FIFFV_PROJ_ITEM_NONE,
            Self::Field => FIFFV_PROJ_ITEM_FIELD,
            Self::DipFix => FIFFV_PROJ_ITEM_DIP_FIX,
            Self::DipRot => FIFFV_PROJ_ITEM_DIP_ROT,
            Self::HomogGrad => FIFFV_PROJ_ITEM_HOMOG_GRAD,
            Self::HomogField => FIFFV_PROJ_ITEM_HOMOG_FIELD,
            Self::EegAverageRef => FIFFV_MNE_PROJ_ITEM_EEG_AVREF,
            Self::Other(code) => code,
        }
    }
}

/// One projector: rows of `data` are the vectors, columns the named channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProjectionItemFields")]
pub struct ProjectionItem {
    pub kind: ProjKind,
    /// Whether the projector is currently applied.
    pub active: bool,
    pub desc: String,
    pub data: NamedMatrix,
}

#[derive(Deserialize)]
struct ProjectionItemFields {
    kind: ProjKind,
    active: bool,
    desc: String,
    data: NamedMatrix,
}

impl TryFrom<ProjectionItemFields> for ProjectionItem {
    type Error = ValidationError;

    fn try_from(value: ProjectionItemFields) -> Result<Self, Self::Error> {
        Self::new(value.kind, value.active, value.desc, value.data)
    }
}

impl ProjectionItem {
    /// Creates an item; `data` must name every column.
    pub fn new(
        kind: ProjKind,
        active: bool,
        desc: impl Into<String>,
        data: NamedMatrix,
    ) -> Result<Self, ValidationError> {
        let item = Self {
            kind,
            active,
            desc: desc.into(),
            data,
        };
        item.validate()?;
        Ok(item)
    }

    /// Re-checks the matrix shape and that every column is named.
    ///
    /// A channel list with no entries cannot be stored as a name list, so zero
    /// columns are rejected.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.data.validate()?;
        if self.data.ncol == 0 {
            return Err(ValidationError::NoChannels);
        }
        match &self.data.col_names {
            None => Err(ValidationError::MissingColumnNames),
            Some(names) if names.len() != self.data.ncol => {
                Err(ValidationError::ColumnNamesMismatch {
                    names: names.len(),
                    columns: self.data.ncol,
                })
            }
            Some(_) => Ok(()),
        }
    }

    /// Builds an item from row-major vectors over `channels`.
    pub fn from_vectors(
        kind: ProjKind,
        active: bool,
        desc: impl Into<String>,
        channels: Vec<String>,
        vectors: Vec<f32>,
    ) -> Result<Self, ValidationError> {
        let ncol = channels.len();
        let nrow = if ncol == 0 { 0 } else { vectors.len() / ncol };
        let data = NamedMatrix::new(nrow, ncol, None, Some(channels), vectors)?;
        Self::new(kind, active, desc, data)
    }

    pub fn channel_names(&self) -> &[String] {
        self.data.col_names.as_deref().unwrap_or(&[])
    }

    pub fn nvec(&self) -> usize {
        self.data.nrow
    }

    pub fn nchan(&self) -> usize {
        self.data.ncol
    }

    /// One-line summary, e.g. `PCA-v1 (2 x 3) active`.
    pub fn summary(&self) -> String {
        let state = if self.active { "active" } else { "idle" };
        format!(
            "{} ({} x {}) {}",
            self.desc, self.data.nrow, self.data.ncol, state
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{ProjKind, ProjectionItem};
    use crate::model::{NamedMatrix, ValidationError};

    fn channels() -> Vec<String> {
        vec!["Fp1".to_string(), "Fp2".to_string(), "Cz".to_string()]
    }

    #[test]
    fn kind_codes_round_trip_including_unknown() {
        for code in [0, 1, 2, 3, 4, 5, 10, 77] {
            assert_eq!(ProjKind::from_code(code).code(), code);
        }
        assert_eq!(ProjKind::from_code(77), ProjKind::Other(77));
    }

    #[test]
    fn summary_reports_extents_and_state() {
        let item = ProjectionItem::from_vectors(
            ProjKind::Field,
            true,
            "PCA-v1",
            channels(),
            vec![0.0; 6],
        )
        .unwrap();
        assert_eq!(item.summary(), "PCA-v1 (2 x 3) active");
        assert_eq!(item.nvec(), 2);

        let idle = ProjectionItem {
            active: false,
            ..item
        };
        assert!(idle.summary().ends_with("idle"));
    }

    #[test]
    fn new_requires_matching_channel_names() {
        let unnamed = NamedMatrix::new(1, 3, None, None, vec![0.0; 3]).unwrap();
        assert_eq!(
            ProjectionItem::new(ProjKind::Field, false, "x", unnamed).unwrap_err(),
            ValidationError::MissingColumnNames
        );

        for extra in 1..4usize {
            let ncol = 3 + extra;
            let bad = NamedMatrix {
                nrow: 1,
                ncol,
                row_names: None,
                col_names: Some(channels()),
                data: vec![0.0; ncol],
            };
            assert_eq!(
                ProjectionItem::new(ProjKind::Field, false, "x", bad).unwrap_err(),
                ValidationError::ColumnNamesMismatch {
                    names: 3,
                    columns: ncol
                }
            );
        }
    }

    #[test]
    fn items_without_channels_are_rejected() {
        let err = ProjectionItem::from_vectors(ProjKind::Field, true, "x", Vec::new(), Vec::new())
            .unwrap_err();
        assert_eq!(err, ValidationError::NoChannels);

        let empty = NamedMatrix::new(0, 0, None, Some(Vec::new()), Vec::new()).unwrap();
        assert_eq!(
            ProjectionItem::new(ProjKind::Field, false, "x", empty).unwrap_err(),
            ValidationError::NoChannels
        );

        let one_blank = ProjectionItem::from_vectors(
            ProjKind::Field,
            true,
            "x",
            vec![String::new()],
            vec![1.0, 2.0],
        )
        .unwrap();
        assert_eq!(one_blank.nchan(), 1);
        assert_eq!(one_blank.nvec(), 2);
    }

    #[test]
    fn from_vectors_rejects_ragged_vectors() {
        let err = ProjectionItem::from_vectors(ProjKind::Field, false, "x", channels(), vec![0.0; 4])
            .unwrap_err();
        assert!(matches!(err, ValidationError::DataShapeMismatch { .. }));
    }
}
