//! Constraint checkers.
//!
//! - [`exists`] - every source value appears in a destination field
//! - [`unique`] - no value repeats within a field
//! - [`vtype`] - every value parses as the declared type, inside its range
//!
//! Each checker returns `Err` only for fatal problems (unreadable file,
//! unknown field expression, missing column, unknown type). Data
//! violations land in the returned [`CheckReport`](crate::report::CheckReport).
//!
//! Caches built while checking (seen values, validated values) live for one
//! field of one rule and are dropped afterwards.

pub mod exists;
pub mod unique;
pub mod vtype;

pub use exists::check_exists;
pub use unique::check_unique;
pub use vtype::check_type;

use crate::report::{CheckReport, Violation};

/// How far a checker goes after a violation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckOptions {
    /// Stop at the first violation instead of collecting all of them.
    pub fail_fast: bool,
}

impl CheckOptions {
    pub fn fail_fast() -> Self {
        Self { fail_fast: true }
    }
}

/// Record a violation; returns true when the checker must stop.
pub(crate) fn record(report: &mut CheckReport, violation: Violation, options: CheckOptions) -> bool {
    tracing::warn!("{}", violation);
    report.violations.push(violation);
    options.fail_fast
}
