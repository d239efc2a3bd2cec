//! Uniqueness rule: no value may repeat within a field.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::cache::MatrixSource;
use crate::error::CheckResult;
use crate::fieldexpr::FieldResolver;
use crate::models::{Metadata, RuleKind, Unique};
use crate::report::{CheckReport, Violation, ViolationDetail};

use super::{record, CheckOptions};

/// First row a value was seen at, and whether its repeat was reported.
struct Seen {
    first_row: usize,
    reported: bool,
}

/// Check every field of the unique rule declared for `stem`.
///
/// A duplicated value is reported once, at its second occurrence.
pub fn check_unique(
    stem: &str,
    rule: &Unique,
    metadata: &Metadata,
    source: &dyn MatrixSource,
    options: CheckOptions,
) -> CheckResult<CheckReport> {
    let mut report = CheckReport::new(stem, RuleKind::Unique);
    if rule.fields.is_empty() {
        return Ok(report);
    }

    tracing::info!(stem, fields = rule.fields.len(), "checking unique rule");
    let matrix = source.load(stem)?;

    for field in &rule.fields {
        report.fields_checked += 1;
        let resolver = FieldResolver::new(metadata, field)?;
        let mut seen: HashMap<Cow<str>, Seen> = HashMap::new();

        for item in resolver.values(stem, &matrix)? {
            report.values_checked += 1;
            match seen.get_mut(item.value.as_ref()) {
                None => {
                    seen.insert(
                        item.value,
                        Seen {
                            first_row: item.row,
                            reported: false,
                        },
                    );
                }
                Some(entry) if entry.reported => {}
                Some(entry) => {
                    entry.reported = true;
                    let violation = Violation {
                        stem: stem.to_string(),
                        field: field.clone(),
                        value: item.value.to_string(),
                        row: item.row,
                        detail: ViolationDetail::Duplicate {
                            first_row: entry.first_row,
                        },
                    };
                    if record(&mut report, violation, options) {
                        return Ok(report);
                    }
                }
            }
        }

        tracing::debug!(stem, field = %field, distinct = seen.len(), "unique field done");
    }

    Ok(report)
}
