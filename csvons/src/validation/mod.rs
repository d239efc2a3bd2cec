//! JSON Schema validation for ruler documents.
//!
//! A ruler document is checked against the embedded Draft 7 schema before it
//! is deserialized, so every structural problem (wrong type, unknown key,
//! missing `fields`) is reported at once instead of one serde error at a time.
//!
//! # Embedded Schema
//!
//! `schemas/ruler.schema.json` is embedded at compile time.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use csvons::validation::validate_ruler_document;
//!
//! let doc = json!({
//!     "csvons_metadata": { "name_index": 0, "data_index": 1 },
//!     "users": { "unique": { "fields": ["Email"] } }
//! });
//! assert!(validate_ruler_document(&doc).is_ok());
//! ```

use serde_json::Value;

const RULER_SCHEMA: &str = include_str!("../../schemas/ruler.schema.json");

/// Validate a JSON value against a JSON schema.
///
/// Returns every validation error message, or a single message when the
/// schema itself does not compile.
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator =
        jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// The embedded ruler schema.
pub fn ruler_schema() -> Result<Value, Vec<String>> {
    serde_json::from_str(RULER_SCHEMA).map_err(|e| vec![format!("Invalid embedded schema: {}", e)])
}

/// Validate a ruler document against the embedded schema.
pub fn validate_ruler_document(data: &Value) -> Result<(), Vec<String>> {
    let schema = ruler_schema()?;
    validate(&schema, data)
}

/// Quick check against the ruler schema.
pub fn is_valid_ruler_document(data: &Value) -> bool {
    validate_ruler_document(data).is_ok()
}
