//! Construction errors and their stable numeric codes for the C boundary.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FieldError>;

/// Everything that can go wrong while validating field-construction input.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("column '{column}' has {actual} entries, expected {expected}")]
    ColumnLength {
        column: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("column '{0}' is required for this field kind but missing")]
    MissingColumn(&'static str),

    #[error("point count must be non-negative, got {0}")]
    NegativeCount(i64),

    #[error("invalid separation range: min_sep = {min_sep}, max_sep = {max_sep}")]
    SeparationRange { min_sep: f64, max_sep: f64 },

    #[error("opening angle must be non-negative, got {0}")]
    OpeningAngle(f64),

    #[error("unknown split method code {0}")]
    UnknownSplitMethod(i32),
}

impl FieldError {
    /// Numeric code class reported through
    /// [`shearwater_last_error`](crate::c_api::shearwater_last_error):
    /// 1 for dimension errors, 2 for parameter errors.
    pub fn code(&self) -> i32 {
        match self {
            FieldError::ColumnLength { .. }
            | FieldError::MissingColumn(_)
            | FieldError::NegativeCount(_) => 1,
            FieldError::SeparationRange { .. }
            | FieldError::OpeningAngle(_)
            | FieldError::UnknownSplitMethod(_) => 2,
        }
    }
}
