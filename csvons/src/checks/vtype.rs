//! Type rule: values must parse as the declared scalar type.

use std::borrow::Cow;
use std::collections::HashSet;

use crate::cache::MatrixSource;
use crate::error::{CheckResult, ConfigError, ConfigResult};
use crate::fieldexpr::FieldResolver;
use crate::models::{Metadata, Range, RuleKind, VType, ValueType};
use crate::report::{CheckReport, Violation, ViolationDetail};

use super::{record, CheckOptions};

/// Check every type rule declared for `stem`.
///
/// Each distinct value is validated once per rule; a failing value is
/// reported at its first occurrence only.
pub fn check_type(
    stem: &str,
    rules: &[VType],
    metadata: &Metadata,
    source: &dyn MatrixSource,
    options: CheckOptions,
) -> CheckResult<CheckReport> {
    let mut report = CheckReport::new(stem, RuleKind::Type);
    if rules.is_empty() {
        return Ok(report);
    }

    tracing::info!(stem, rules = rules.len(), "checking type rules");
    let matrix = source.load(stem)?;

    for rule in rules {
        report.fields_checked += 1;
        let (expected, range) = declared(rule)?;
        let resolver = FieldResolver::new(metadata, &rule.field)?;

        let mut accepted: HashSet<Cow<str>> = HashSet::new();
        let mut rejected: HashSet<Cow<str>> = HashSet::new();

        for item in resolver.values(stem, &matrix)? {
            report.values_checked += 1;
            let value = item.value.as_ref();
            if accepted.contains(value) || rejected.contains(value) {
                continue;
            }

            match check_value(value, expected, range) {
                Ok(()) => {
                    accepted.insert(item.value);
                }
                Err(detail) => {
                    let violation = Violation {
                        stem: stem.to_string(),
                        field: rule.field.clone(),
                        value: value.to_string(),
                        row: item.row,
                        detail,
                    };
                    if record(&mut report, violation, options) {
                        return Ok(report);
                    }
                    rejected.insert(item.value);
                }
            }
        }

        tracing::debug!(
            stem,
            field = %rule.field,
            r#type = %expected,
            accepted = accepted.len(),
            rejected = rejected.len(),
            "type rule done"
        );
    }

    Ok(report)
}

/// Resolve the declared type and the range that applies to it.
fn declared(rule: &VType) -> ConfigResult<(ValueType, Option<Range>)> {
    let expected: ValueType = rule
        .vtype
        .parse()
        .map_err(|_| ConfigError::UnknownType {
            field: rule.field.clone(),
            declared: rule.vtype.clone(),
        })?;

    let range = match rule.range {
        Some(_) if !expected.is_numeric() => {
            tracing::warn!(field = %rule.field, "range ignored for bool field");
            None
        }
        Some(range) if !(range.min <= range.max) => {
            return Err(ConfigError::InvalidRange {
                field: rule.field.clone(),
                min: range.min,
                max: range.max,
            });
        }
        other => other,
    };

    Ok((expected, range))
}

/// Validate one value against a type and optional range.
pub fn check_value(
    value: &str,
    expected: ValueType,
    range: Option<Range>,
) -> Result<(), ViolationDetail> {
    let invalid = || ViolationDetail::InvalidType { expected };
    let out_of_range = |range: Range| ViolationDetail::OutOfRange { expected, range };

    match expected {
        ValueType::Int => {
            let v: i64 = value.parse().map_err(|_| invalid())?;
            if let Some(range) = range {
                // bounds are declared as floats; compare on truncated integers
                if v < range.min as i64 || v > range.max as i64 {
                    return Err(out_of_range(range));
                }
            }
        }
        ValueType::Float64 => {
            let v: f64 = value.parse().map_err(|_| invalid())?;
            if let Some(range) = range {
                if !(range.min..=range.max).contains(&v) {
                    return Err(out_of_range(range));
                }
            }
        }
        ValueType::Bool => {
            parse_bool(value).ok_or_else(invalid)?;
        }
    }
    Ok(())
}

/// Boolean literals: `1 t T TRUE true True` and `0 f F FALSE false False`.
pub fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}
