//! Error handling for regviz

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Validation and I/O errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ==================== Construction Errors ====================

    #[error("Quantifier bounds out of order: min {min} is greater than max {max}")]
    QuantifierBounds { min: u32, max: u32 },

    #[error("Range bounds out of order: {start:?} comes after {end:?}")]
    RangeOrder { start: char, end: char },

    #[error("Character class cannot contain {0}")]
    InvalidClassMember(String),

    #[error("Conditional subexpression cannot use {0} as its condition")]
    InvalidCondition(String),

    #[error("Part id {0} is used more than once")]
    DuplicatePartId(u32),

    // ==================== Input Errors ====================

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl Error {
    /// Short machine-readable code, used by structured feedback
    pub fn code(&self) -> &'static str {
        match self {
            Self::QuantifierBounds { .. } => "E0001",
            Self::RangeOrder { .. } => "E0002",
            Self::InvalidClassMember(_) => "E0003",
            Self::InvalidCondition(_) => "E0004",
            Self::DuplicatePartId(_) => "E0005",
            Self::Io(_) => "E0100",
            Self::Json(_) => "E0101",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}
