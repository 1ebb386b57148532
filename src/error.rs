use thiserror::Error;

/// User-facing validation failures. `Display` renders the exact message shown
/// in the UI; `code()` is the stable identifier sent over IPC.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Row {row}: Missing required fields")]
    MissingRequiredField { row: usize, fields: Vec<String> },

    #[error("Score {value} is out of range (0 to {max_marks})")]
    OutOfRangeScore { value: f64, max_marks: f64 },

    #[error("Row {row}: {key} {value} already exists")]
    DuplicateKey {
        row: usize,
        key: String,
        value: String,
    },

    #[error("Row {row}: Column count mismatch")]
    ColumnMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Missing required columns: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    #[error("CSV file is empty or has no data rows")]
    EmptyImport,

    #[error("CSV could not be read: {0}")]
    MalformedCsv(String),

    #[error("Row {row}: Invalid date {value} for {column} (expected YYYY-MM-DD)")]
    InvalidDate {
        row: usize,
        column: String,
        value: String,
    },

    #[error("Row {row}: Invalid status {value}")]
    InvalidStatus { row: usize, value: String },
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingRequiredField { .. } => "missing_required_field",
            Self::OutOfRangeScore { .. } => "out_of_range_score",
            Self::DuplicateKey { .. } => "duplicate_key",
            Self::ColumnMismatch { .. } => "column_mismatch",
            Self::MissingColumns { .. } => "missing_columns",
            Self::EmptyImport => "empty_import",
            Self::MalformedCsv(_) => "malformed_csv",
            Self::InvalidDate { .. } => "invalid_date",
            Self::InvalidStatus { .. } => "invalid_status",
        }
    }

    /// Data row the error refers to; `None` for batch-level errors.
    pub fn row(&self) -> Option<usize> {
        match self {
            Self::MissingRequiredField { row, .. }
            | Self::DuplicateKey { row, .. }
            | Self::ColumnMismatch { row, .. }
            | Self::InvalidDate { row, .. }
            | Self::InvalidStatus { row, .. } => Some(*row),
            Self::OutOfRangeScore { .. }
            | Self::MissingColumns { .. }
            | Self::EmptyImport
            | Self::MalformedCsv(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradebookError {
    #[error("Gradebook is locked. Unlock to make changes.")]
    Locked,

    #[error("Please save changes before locking")]
    UnsavedChanges,

    #[error("Gradebook is already locked")]
    AlreadyLocked,

    #[error("Gradebook is not locked")]
    NotLocked,

    #[error("Please lock gradebook before publishing")]
    PublishRequiresLock,

    #[error("Grades are already published")]
    AlreadyPublished,

    #[error("{count} marks are still missing")]
    MissingMarks { count: usize },

    #[error("student not found: {0}")]
    UnknownStudent(String),

    #[error("assessment not found: {0}")]
    UnknownAssessment(String),

    #[error("duplicate {kind} id: {id}")]
    DuplicateId { kind: &'static str, id: String },

    #[error("invalid assessment {id}: {reason}")]
    InvalidAssessment { id: String, reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Scale(#[from] ScaleError),
}

impl GradebookError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Locked
            | Self::UnsavedChanges
            | Self::AlreadyLocked
            | Self::NotLocked
            | Self::PublishRequiresLock
            | Self::AlreadyPublished
            | Self::MissingMarks { .. } => "invalid_state",
            Self::UnknownStudent(_) | Self::UnknownAssessment(_) => "not_found",
            Self::DuplicateId { .. } | Self::InvalidAssessment { .. } => "bad_params",
            Self::Validation(_) => "validation_failed",
            Self::Scale(_) => "bad_config",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScaleError {
    #[error("grade scale has no bands")]
    Empty,

    #[error("band {grade} has invalid bounds {min}..={max}")]
    InvalidBounds { grade: String, min: f64, max: f64 },

    #[error("bands {lower} and {upper} overlap")]
    Overlap { lower: String, upper: String },

    #[error("gap between bands {lower} and {upper}")]
    Gap { lower: String, upper: String },

    #[error("grade scale does not cover {0}")]
    Uncovered(f64),

    #[error("percentage {0} is outside 0..=100")]
    PercentageOutOfRange(f64),

    #[error("no band matches {0}")]
    Unmatched(f64),

    #[error("unknown grade scale: {0}")]
    UnknownScale(String),
}
