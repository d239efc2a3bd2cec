//! # csvons - declarative constraint checking for folders of CSV files
//!
//! A JSON ruler declares, per CSV file stem, three kinds of rules:
//! existence (foreign-key style references between files), uniqueness,
//! and scalar types with optional ranges. Fields are addressed with a small
//! expression grammar that reaches inside compound cells.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ ruler.json  │────▶│   Config    │────▶│   Runner    │────▶│  RunReport  │
//! │  (schema)   │     │ (validated) │     │ (checkers)  │     │ (violations)│
//! └─────────────┘     └─────────────┘     └──────┬──────┘     └─────────────┘
//!                                                │
//!                     ┌─────────────┐     ┌──────┴──────┐
//!                     │  CSV files  │────▶│ FieldValues │
//!                     │  (ISO/UTF8) │     │ (lazy iter) │
//!                     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use csvons::{run, MatrixCache, RulerConfig, RunOptions};
//!
//! let config = RulerConfig::load("ruler.json")?;
//! let source = MatrixCache::from_metadata(&config.metadata);
//! let report = run(&config, &source, &RunOptions::default())?;
//! for violation in report.violations() {
//!     println!("{}", violation);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Fatal error types
//! - [`models`] - Metadata, record matrix, rule definitions
//! - [`parser`] - CSV loading with encoding detection
//! - [`fieldexpr`] - Field expression grammar and value resolution
//! - [`cache`] - Matrix sources and the per-run cache
//! - [`checks`] - Existence, uniqueness and type checkers
//! - [`report`] - Violations and reports
//! - [`validation`] - Ruler JSON schema validation
//! - [`config`] - Ruler loading
//! - [`runner`] - Whole-ruler evaluation
//! - [`logging`] - `tracing` subscriber setup

// Core modules
pub mod error;
pub mod models;

// Loading
pub mod parser;
pub mod cache;

// Field expressions
pub mod fieldexpr;

// Checking
pub mod checks;
pub mod report;
pub mod runner;

// Configuration
pub mod config;
pub mod validation;

// Observability
pub mod logging;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{CheckError, CheckResult, ConfigError, ConfigResult, CsvError, CsvResult};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Exists, ExistsField, Metadata, Range, RecordMatrix, RuleKind, RuleSet, Unique, VType,
    ValueType,
};

// =============================================================================
// Re-exports - Loading
// =============================================================================

pub use cache::{FsMatrixSource, MatrixCache, MatrixSource, MemoryMatrixSource};
pub use parser::{decode_content, detect_encoding, read_matrix, read_stem, resolve_path};

// =============================================================================
// Re-exports - Field expressions
// =============================================================================

pub use fieldexpr::{grammar_description, FieldExpr, FieldKind, FieldResolver, FieldValue, FieldValues};

// =============================================================================
// Re-exports - Checks and reports
// =============================================================================

pub use checks::{check_exists, check_type, check_unique, CheckOptions};
pub use report::{CheckReport, RunReport, Violation, ViolationDetail};
pub use runner::{run, RunOptions};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{example_config, RulerConfig};
pub use validation::{is_valid_ruler_document, validate_ruler_document};
