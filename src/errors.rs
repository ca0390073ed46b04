//! Unified error types for TalentMatch
//!
//! Normalization misses and blocked disambiguations are logged conditions,
//! not errors: the aggregator drops the mention and the eligibility gate
//! skips the requirement. Everything that can actually fail a job lives
//! here.

use std::fmt;

/// Main error type for the application
#[derive(Debug, Clone)]
pub enum TalentMatchError {
    /// Database-related errors; never retried by the core
    Database(DatabaseError),
    /// LLM / embedding provider errors after retries were exhausted
    AiProvider(AiProviderError),
    /// Malformed input surfaced to the caller
    Validation(ValidationError),
    /// The extractor could not produce usable structured output
    Extraction(String),
    /// An accumulator broke its own invariants: programmer error, aborts
    /// the current candidate only
    Invariant(InvariantViolation),
    /// General application errors
    Application(String),
}

/// Database-specific errors
#[derive(Debug, Clone)]
pub enum DatabaseError {
    ConnectionFailed(String),
    QueryFailed(String),
    MigrationFailed(String),
    ConstraintViolation(String),
    NotFound(String),
    InvalidData(String),
}

/// AI provider errors (re-exported from ai::errors)
pub use crate::ai::errors::AiProviderError;

/// Validation errors for job submissions and JD profiles
#[derive(Debug, Clone)]
pub enum ValidationError {
    /// Uploaded file is not a supported type
    UnsupportedFileType(String),
    /// Job description below the minimum length
    JobDescriptionTooShort(usize),
    /// Required field is missing
    MissingField(String),
    /// Field has invalid format
    InvalidFormat(String),
    /// Field value violates a schema rule
    BusinessRule(String),
}

/// A per-skill accumulator reached an impossible state.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    pub skill_code: String,
    pub detail: String,
}

impl fmt::Display for TalentMatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TalentMatchError::Database(e) => write!(f, "Database error: {}", e),
            TalentMatchError::AiProvider(e) => write!(f, "AI error: {}", e),
            TalentMatchError::Validation(e) => write!(f, "Validation error: {}", e),
            TalentMatchError::Extraction(msg) => write!(f, "Extraction error: {}", msg),
            TalentMatchError::Invariant(e) => write!(f, "Invariant violation: {}", e),
            TalentMatchError::Application(msg) => write!(f, "Application error: {}", msg),
        }
    }
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::ConnectionFailed(msg) => write!(f, "Database connection failed: {}", msg),
            DatabaseError::QueryFailed(msg) => write!(f, "Query failed: {}", msg),
            DatabaseError::MigrationFailed(msg) => write!(f, "Migration failed: {}", msg),
            DatabaseError::ConstraintViolation(msg) => write!(f, "Constraint violation: {}", msg),
            DatabaseError::NotFound(msg) => write!(f, "Record not found: {}", msg),
            DatabaseError::InvalidData(msg) => write!(f, "Invalid data: {}", msg),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnsupportedFileType(ext) => {
                write!(f, "Unsupported file type: {} (only PDF is accepted)", ext)
            }
            ValidationError::JobDescriptionTooShort(len) => {
                write!(f, "Job description is too short ({} chars); provide more details", len)
            }
            ValidationError::MissingField(field) => write!(f, "Missing required field: {}", field),
            ValidationError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            ValidationError::BusinessRule(msg) => write!(f, "Schema rule violation: {}", msg),
        }
    }
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skill {}: {}", self.skill_code, self.detail)
    }
}

impl std::error::Error for TalentMatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TalentMatchError::AiProvider(e) => Some(e),
            TalentMatchError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for DatabaseError {}
impl std::error::Error for ValidationError {}

// Convenience conversions

impl From<DatabaseError> for TalentMatchError {
    fn from(err: DatabaseError) -> Self {
        TalentMatchError::Database(err)
    }
}

impl From<AiProviderError> for TalentMatchError {
    fn from(err: AiProviderError) -> Self {
        TalentMatchError::AiProvider(err)
    }
}

impl From<ValidationError> for TalentMatchError {
    fn from(err: ValidationError) -> Self {
        TalentMatchError::Validation(err)
    }
}

impl From<InvariantViolation> for TalentMatchError {
    fn from(err: InvariantViolation) -> Self {
        TalentMatchError::Invariant(err)
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(e, msg) => {
                let error_msg = msg.unwrap_or_else(|| format!("SQLite error code: {:?}", e.code));
                match e.code {
                    rusqlite::ErrorCode::ConstraintViolation => {
                        DatabaseError::ConstraintViolation(error_msg)
                    }
                    _ => DatabaseError::QueryFailed(error_msg),
                }
            }
            rusqlite::Error::QueryReturnedNoRows => {
                DatabaseError::NotFound("Query returned no rows".to_string())
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for TalentMatchError {
    fn from(err: rusqlite::Error) -> Self {
        TalentMatchError::Database(err.into())
    }
}

impl From<serde_json::Error> for TalentMatchError {
    fn from(err: serde_json::Error) -> Self {
        TalentMatchError::Extraction(format!("JSON deserialization failed: {}", err))
    }
}
