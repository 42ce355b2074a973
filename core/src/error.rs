use thiserror::Error;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Source table '{table}' not found")]
    SourceTableMissing { table: String },

    #[error("Source table '{table}' is missing required column(s): {}", columns.join(", "))]
    MissingColumns { table: String, columns: Vec<String> },

    #[error("Column '{column}' has the wrong type: {detail}")]
    ColumnType { column: String, detail: String },

    #[error("Invalid period: year {year}, month {month}")]
    InvalidPeriod { year: i64, month: i64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl IdentityError {
    /// True for the errors that mean the input does not have the expected shape.
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::SourceTableMissing { .. } | Self::MissingColumns { .. } | Self::ColumnType { .. }
        )
    }
}

pub type IdentityResult<T> = Result<T, IdentityError>;
