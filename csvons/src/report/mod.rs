//! Check results.
//!
//! A [`Violation`] is one offending value. A [`CheckReport`] collects the
//! violations of one rule kind over one stem, and a [`RunReport`] collects
//! every check of a run. All three serialize to JSON for `--report`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Range, RuleKind, ValueType};

/// What exactly went wrong with a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationDetail {
    /// Source value absent from the destination field.
    NotFound { dst_stem: String, dst_field: String },
    /// Value already seen at `first_row`.
    Duplicate { first_row: usize },
    /// Value does not parse as the declared type.
    InvalidType { expected: ValueType },
    /// Value parses but lies outside the declared range.
    OutOfRange { expected: ValueType, range: Range },
}

impl ViolationDetail {
    pub fn rule(&self) -> RuleKind {
        match self {
            ViolationDetail::NotFound { .. } => RuleKind::Exists,
            ViolationDetail::Duplicate { .. } => RuleKind::Unique,
            ViolationDetail::InvalidType { .. } | ViolationDetail::OutOfRange { .. } => {
                RuleKind::Type
            }
        }
    }
}

/// One value that breaks a rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub stem: String,
    /// Field expression as written in the rule.
    pub field: String,
    pub value: String,
    /// Zero-based row in the source file.
    pub row: usize,
    #[serde(flatten)]
    pub detail: ViolationDetail,
}

impl Violation {
    pub fn rule(&self) -> RuleKind {
        self.detail.rule()
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}.{} row {}: value '{}' ",
            self.rule(),
            self.stem,
            self.field,
            self.row,
            self.value
        )?;
        match &self.detail {
            ViolationDetail::NotFound {
                dst_stem,
                dst_field,
            } => write!(f, "not found in {}.{}", dst_stem, dst_field),
            ViolationDetail::Duplicate { first_row } => {
                write!(f, "already present at row {}", first_row)
            }
            ViolationDetail::InvalidType { expected } => write!(f, "is not a valid {}", expected),
            ViolationDetail::OutOfRange { expected, range } => write!(
                f,
                "is outside {} range [{}, {}]",
                expected, range.min, range.max
            ),
        }
    }
}

/// Outcome of one rule kind over one stem.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub stem: String,
    pub rule: RuleKind,
    /// Fields (or field pairs) evaluated.
    pub fields_checked: usize,
    /// Values read from the source stem, repeats included.
    pub values_checked: usize,
    pub violations: Vec<Violation>,
}

impl CheckReport {
    pub fn new(stem: impl Into<String>, rule: RuleKind) -> Self {
        Self {
            stem: stem.into(),
            rule,
            fields_checked: 0,
            values_checked: 0,
            violations: Vec::new(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} {}: {} fields, {} values, {} violations",
            self.rule,
            self.stem,
            self.fields_checked,
            self.values_checked,
            self.violations.len()
        )
    }
}

/// Every check of one run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub checks: Vec<CheckReport>,
    /// Set when fail-fast ended the run before every rule was evaluated.
    pub stopped_early: bool,
}

impl RunReport {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            started_at: now,
            finished_at: now,
            checks: Vec::new(),
            stopped_early: false,
        }
    }

    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.checks.iter().flat_map(|c| c.violations.iter())
    }

    pub fn violation_count(&self) -> usize {
        self.checks.iter().map(|c| c.violations.len()).sum()
    }

    pub fn is_ok(&self) -> bool {
        self.checks.iter().all(CheckReport::is_ok)
    }

    pub fn summary(&self) -> String {
        let failed = self.checks.iter().filter(|c| !c.is_ok()).count();
        format!(
            "{} checks, {} failed, {} violations{}",
            self.checks.len(),
            failed,
            self.violation_count(),
            if self.stopped_early {
                " (stopped at first violation)"
            } else {
                ""
            }
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}
