//! Error types for the csvons checker.
//!
//! Only fatal conditions are errors here. Data violations (a missing value, a
//! duplicate, an unparsable cell) are values collected in a
//! [`crate::report::CheckReport`], never an `Err`.
//!
//! - [`CsvError`] - Reading and decoding CSV files
//! - [`ConfigError`] - Rule document, metadata and field expression problems
//! - [`CheckError`] - Top-level error returned by the checkers and the runner
//!
//! Conversion is automatic via `From`, so `?` works across the boundaries.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// CSV Loading Errors
// =============================================================================

/// Errors while loading a CSV file into a record matrix.
#[derive(Debug, Error)]
pub enum CsvError {
    /// File missing or unreadable.
    #[error("Failed to read '{}': {source}", .path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Content could not be decoded with the detected encoding.
    #[error("Failed to decode '{}' as {encoding}", .path.display())]
    EncodingError { path: PathBuf, encoding: String },

    /// Malformed CSV content.
    #[error("Invalid CSV format in '{}': {message}", .path.display())]
    ParseError { path: PathBuf, message: String },
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors in the rule document, the metadata or a field expression.
///
/// All of these abort the run: there is no meaningful partial result.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file missing or unreadable.
    #[error("Failed to read config '{}': {source}", .path.display())]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid JSON or does not deserialize.
    #[error("Invalid config JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Document does not match the embedded rule schema.
    #[error("Config does not match schema:\n  - {}", .errors.join("\n  - "))]
    SchemaError { errors: Vec<String> },

    /// Neither `csvons_metadata` nor `metadata` is present.
    #[error("Missing metadata section (expected 'csvons_metadata' or 'metadata')")]
    MissingMetadata,

    /// Metadata violates its invariants.
    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    /// Field expression matches none of the four syntaxes.
    #[error("Unknown field expression '{0}'")]
    UnknownFieldExpr(String),

    /// Nested index does not fit in a usize.
    #[error("Nested index out of range in field expression '{0}'")]
    InvalidNestedIndex(String),

    /// A column referenced by a field expression is not in the header row.
    #[error("Column '{column}' of field '{expr}' not found in header of '{stem}'")]
    MissingColumn {
        stem: String,
        expr: String,
        column: String,
    },

    /// The file is too short to contain the header row.
    #[error("'{stem}' has {rows} rows, no header at row index {name_index}")]
    MissingHeader {
        stem: String,
        name_index: usize,
        rows: usize,
    },

    /// Declared value type is not one of `int`, `float64`, `bool`.
    #[error("Unknown type '{declared}' declared for field '{field}'")]
    UnknownType { field: String, declared: String },

    /// Declared range is empty.
    #[error("Invalid range [{min}, {max}] for field '{field}'")]
    InvalidRange { field: String, min: f64, max: f64 },

    /// A stem requested on the command line has no rule set.
    #[error("No rules configured for stem '{0}'")]
    UnknownStem(String),
}

// =============================================================================
// Check Errors (top-level)
// =============================================================================

/// Fatal error from a checker or from the runner.
#[derive(Debug, Error)]
pub enum CheckError {
    /// CSV loading error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV loading.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for configuration handling.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for checks and runs.
pub type CheckResult<T> = Result<T, CheckError>;
