//! Domain models for the csvons checker.
//!
//! - [`Metadata`] - CSV layout and compound-field decoding settings
//! - [`RecordMatrix`] - A whole CSV file as rows of string cells
//! - [`Exists`], [`Unique`], [`VType`] - The three rule kinds
//! - [`RuleSet`] - All rules keyed under one source stem
//! - [`ValueType`], [`RuleKind`] - Small closed vocabularies

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Metadata
// =============================================================================

/// Layout of the CSV files and how compound field syntax is decoded.
///
/// Loaded once per run and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Folder holding the CSV files.
    #[serde(default)]
    pub csv_file_folder: String,
    /// Row index of the column names.
    pub name_index: usize,
    /// Row index where data starts. Must be greater than `name_index`.
    pub data_index: usize,
    /// Suffix appended to a stem to form a file name.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Separator between repeated values inside one cell.
    #[serde(default = "default_lev1_separator")]
    pub lev1_separator: String,
    /// Separator between positional elements of one repeated value.
    #[serde(default = "default_lev2_separator")]
    pub lev2_separator: String,
    /// Inserted after each part of a complex field.
    #[serde(default = "default_field_connector")]
    pub field_connector: String,
    /// CSV delimiter, `,` when absent.
    #[serde(default)]
    pub delimiter: Option<char>,
}

fn default_extension() -> String {
    ".csv".to_string()
}

fn default_lev1_separator() -> String {
    ",".to_string()
}

fn default_lev2_separator() -> String {
    ":".to_string()
}

fn default_field_connector() -> String {
    "-".to_string()
}

impl Metadata {
    /// Metadata with default separators for the given row layout.
    pub fn new(name_index: usize, data_index: usize) -> Self {
        Self {
            csv_file_folder: String::new(),
            name_index,
            data_index,
            extension: default_extension(),
            lev1_separator: default_lev1_separator(),
            lev2_separator: default_lev2_separator(),
            field_connector: default_field_connector(),
            delimiter: None,
        }
    }

    /// Check the invariants every checker relies on.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.data_index <= self.name_index {
            return Err(ConfigError::InvalidMetadata(format!(
                "data_index [{}] must be greater than name_index [{}]",
                self.data_index, self.name_index
            )));
        }
        if self.lev1_separator.is_empty() {
            return Err(ConfigError::InvalidMetadata(
                "lev1_separator must not be empty".to_string(),
            ));
        }
        if self.lev2_separator.is_empty() {
            return Err(ConfigError::InvalidMetadata(
                "lev2_separator must not be empty".to_string(),
            ));
        }
        self.delimiter_byte()?;
        Ok(())
    }

    /// Delimiter byte handed to the CSV reader, `,` when none is set.
    ///
    /// Fails for anything but a single ASCII byte other than a quote or a
    /// line break, whether or not [`Metadata::validate`] ran.
    pub fn delimiter_byte(&self) -> ConfigResult<u8> {
        match self.delimiter {
            None => Ok(b','),
            Some(d) if d.is_ascii() && !matches!(d, '"' | '\n' | '\r') => Ok(d as u8),
            Some(d) => Err(ConfigError::InvalidMetadata(format!(
                "delimiter '{}' is not a usable single-byte separator",
                d.escape_default()
            ))),
        }
    }
}

impl Default for Metadata {
    /// Header on the first row, data from the second.
    fn default() -> Self {
        Metadata::new(0, 1)
    }
}

// =============================================================================
// Record Matrix
// =============================================================================

/// A whole CSV file: rows of cells, ragged rows allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordMatrix {
    rows: Vec<Vec<String>>,
}

impl RecordMatrix {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Build a matrix from anything string-like, mostly for tests.
    pub fn from_rows<R, S>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The header row, if the matrix reaches `name_index`.
    pub fn header(&self, name_index: usize) -> Option<&[String]> {
        self.rows.get(name_index).map(Vec::as_slice)
    }
}

impl From<Vec<Vec<String>>> for RecordMatrix {
    fn from(rows: Vec<Vec<String>>) -> Self {
        Self::new(rows)
    }
}

// =============================================================================
// Rules
// =============================================================================

/// One `src` / `dst` pair of an existence rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistsField {
    /// Field expression on the source file.
    pub src: String,
    /// Field expression on the destination file.
    pub dst: String,
}

/// Every `src` value must appear among the `dst` values of `dst_file_stem`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exists {
    pub dst_file_stem: String,
    pub fields: Vec<ExistsField>,
}

/// Every listed field must hold pairwise distinct values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Unique {
    pub fields: Vec<String>,
}

/// Inclusive numeric bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

/// Every value of `field` must parse as `type`, inside `range` when given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VType {
    pub field: String,
    /// Kept as declared; resolved to a [`ValueType`] by the type checker so
    /// an unknown name is reported against its field.
    #[serde(rename = "type")]
    pub vtype: String,
    #[serde(default)]
    pub range: Option<Range>,
}

/// All rules declared for one source stem.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub exists: Vec<Exists>,
    #[serde(default)]
    pub unique: Option<Unique>,
    #[serde(default)]
    pub vtype: Vec<VType>,
}

impl RuleSet {
    pub fn is_empty(&self) -> bool {
        self.exists.is_empty()
            && self.unique.as_ref().map_or(true, |u| u.fields.is_empty())
            && self.vtype.is_empty()
    }
}

// =============================================================================
// Vocabularies
// =============================================================================

/// Scalar types a column can be declared as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    #[serde(rename = "int")]
    Int,
    #[serde(rename = "float64")]
    Float64,
    #[serde(rename = "bool")]
    Bool,
}

impl ValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Float64 => "float64",
            ValueType::Bool => "bool",
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, ValueType::Bool)
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "int" => Ok(ValueType::Int),
            "float64" => Ok(ValueType::Float64),
            "bool" => Ok(ValueType::Bool),
            other => Err(format!("unknown value type '{}'", other)),
        }
    }
}

/// The three rule kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Exists,
    Unique,
    Type,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Exists => "exists",
            RuleKind::Unique => "unique",
            RuleKind::Type => "type",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
