//! Existence rule: source values must appear among destination values.
//!
//! The destination sequence is consumed lazily. Every destination value read
//! goes into a lookup set, so each source value only scans as far as it
//! needs to and the destination field is read at most once per field pair,
//! however many source values there are.

use std::borrow::Cow;
use std::collections::HashSet;

use crate::cache::MatrixSource;
use crate::error::CheckResult;
use crate::fieldexpr::{FieldResolver, FieldValues};
use crate::models::{Exists, ExistsField, Metadata, RecordMatrix, RuleKind};
use crate::report::{CheckReport, Violation, ViolationDetail};

use super::{record, CheckOptions};

/// Check every existence rule declared for `stem`.
pub fn check_exists(
    stem: &str,
    rules: &[Exists],
    metadata: &Metadata,
    source: &dyn MatrixSource,
    options: CheckOptions,
) -> CheckResult<CheckReport> {
    let mut report = CheckReport::new(stem, RuleKind::Exists);
    if rules.is_empty() {
        return Ok(report);
    }

    tracing::info!(stem, rules = rules.len(), "checking exists rules");
    let src_matrix = source.load(stem)?;

    for rule in rules {
        let dst_matrix = source.load(&rule.dst_file_stem)?;
        for pair in &rule.fields {
            report.fields_checked += 1;
            let stop = check_pair(
                stem,
                &src_matrix,
                &rule.dst_file_stem,
                &dst_matrix,
                pair,
                metadata,
                options,
                &mut report,
            )?;
            if stop {
                return Ok(report);
            }
        }
    }

    Ok(report)
}

/// Returns true when fail-fast stopped the check.
#[allow(clippy::too_many_arguments)]
fn check_pair(
    stem: &str,
    src_matrix: &RecordMatrix,
    dst_stem: &str,
    dst_matrix: &RecordMatrix,
    pair: &ExistsField,
    metadata: &Metadata,
    options: CheckOptions,
    report: &mut CheckReport,
) -> CheckResult<bool> {
    let src = FieldResolver::new(metadata, &pair.src)?;
    let dst = FieldResolver::new(metadata, &pair.dst)?;
    let src_values = src.values(stem, src_matrix)?;
    let mut dst_values = dst.values(dst_stem, dst_matrix)?;

    let mut dst_seen: HashSet<Cow<str>> = HashSet::new();
    let mut src_checked: HashSet<Cow<str>> = HashSet::new();

    for item in src_values {
        report.values_checked += 1;
        if src_checked.contains(item.value.as_ref()) {
            continue;
        }

        let found = dst_seen.contains(item.value.as_ref())
            || scan_until(&mut dst_values, &mut dst_seen, &item.value);

        if !found {
            let violation = Violation {
                stem: stem.to_string(),
                field: pair.src.clone(),
                value: item.value.to_string(),
                row: item.row,
                detail: ViolationDetail::NotFound {
                    dst_stem: dst_stem.to_string(),
                    dst_field: pair.dst.clone(),
                },
            };
            if record(report, violation, options) {
                return Ok(true);
            }
        }
        src_checked.insert(item.value);
    }

    tracing::debug!(
        stem,
        src = %pair.src,
        dst = %pair.dst,
        distinct = src_checked.len(),
        dst_read = dst_seen.len(),
        "exists pair done"
    );
    Ok(false)
}

/// Pull destination values into `seen` until `target` shows up.
fn scan_until<'a>(
    dst_values: &mut FieldValues<'a>,
    seen: &mut HashSet<Cow<'a, str>>,
    target: &str,
) -> bool {
    for item in dst_values {
        let hit = item.value == target;
        seen.insert(item.value);
        if hit {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::fixtures::{column, source};
    use crate::error::{CheckError, ConfigError};

    fn rule(dst_file_stem: &str, pairs: &[(&str, &str)]) -> Exists {
        Exists {
            dst_file_stem: dst_file_stem.to_string(),
            fields: pairs
                .iter()
                .map(|(src, dst)| ExistsField {
                    src: src.to_string(),
                    dst: dst.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_missing_source_value_reported() {
        let source = source(vec![
            ("logins", column("User", &["u1", "u2"])),
            ("accounts", column("User", &["u2", "u3"])),
        ]);
        let report = check_exists(
            "logins",
            &[rule("accounts", &[("User", "User")])],
            &Metadata::default(),
            &source,
            CheckOptions::default(),
        )
        .unwrap();

        assert_eq!(report.violations.len(), 1);
        let violation = &report.violations[0];
        assert_eq!(violation.value, "u1");
        assert_eq!(violation.row, 1);
        assert_eq!(
            violation.detail,
            ViolationDetail::NotFound {
                dst_stem: "accounts".into(),
                dst_field: "User".into()
            }
        );
        assert_eq!(report.values_checked, 2);
    }

    #[test]
    fn test_all_present_passes() {
        let source = source(vec![
            ("orders", column("Customer", &["c3", "c1", "c3", "c2"])),
            ("customers", column("Id", &["c1", "c2", "c3"])),
        ]);
        let report = check_exists(
            "orders",
            &[rule("customers", &[("Customer", "Id")])],
            &Metadata::default(),
            &source,
            CheckOptions::default(),
        )
        .unwrap();
        assert!(report.is_ok());
        assert_eq!(report.values_checked, 4);
    }

    #[test]
    fn test_violations_in_first_seen_order_reported_once() {
        let source = source(vec![
            ("src", column("V", &["x", "a", "y", "x", "b"])),
            ("dst", column("V", &["a", "b"])),
        ]);
        let report = check_exists(
            "src",
            &[rule("dst", &[("V", "V")])],
            &Metadata::default(),
            &source,
            CheckOptions::default(),
        )
        .unwrap();
        let values: Vec<_> = report.violations.iter().map(|v| v.value.as_str()).collect();
        assert_eq!(values, ["x", "y"]);
    }

    #[test]
    fn test_fail_fast_stops_at_first() {
        let source = source(vec![
            ("src", column("V", &["x", "y"])),
            ("dst", column("V", &["a"])),
        ]);
        let report = check_exists(
            "src",
            &[rule("dst", &[("V", "V")])],
            &Metadata::default(),
            &source,
            CheckOptions::fail_fast(),
        )
        .unwrap();
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].value, "x");
    }

    #[test]
    fn test_empty_destination_fails_first_value() {
        let source = source(vec![
            ("src", column("V", &["a"])),
            ("dst", column("V", &[])),
        ]);
        let report = check_exists(
            "src",
            &[rule("dst", &[("V", "V")])],
            &Metadata::default(),
            &source,
            CheckOptions::default(),
        )
        .unwrap();
        assert_eq!(report.violations.len(), 1);
    }

    #[test]
    fn test_destination_cache_is_per_field_pair() {
        // "b" is read into the cache while checking the first pair; the
        // second pair must not see it since its destination field is C.
        let src = RecordMatrix::from_rows([vec!["A", "B"], vec!["b", "b"]]);
        let dst = RecordMatrix::from_rows([vec!["B", "C"], vec!["b", "z"]]);
        let source = source(vec![("src", src), ("dst", dst)]);
        let report = check_exists(
            "src",
            &[rule("dst", &[("A", "B"), ("B", "C")])],
            &Metadata::default(),
            &source,
            CheckOptions::default(),
        )
        .unwrap();
        assert_eq!(report.fields_checked, 2);
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].field, "B");
    }

    #[test]
    fn test_repeat_source_against_complex_destination() {
        let src = RecordMatrix::from_rows([vec!["Keys"], vec!["1-a-,2-b-"]]);
        let dst = RecordMatrix::from_rows([
            vec!["Id", "Kind"],
            vec!["1", "a"],
            vec!["2", "b"],
        ]);
        let source = source(vec![("src", src), ("dst", dst)]);
        let report = check_exists(
            "src",
            &[rule("dst", &[("Keys[]", "{Id}{Kind}")])],
            &Metadata::default(),
            &source,
            CheckOptions::default(),
        )
        .unwrap();
        assert!(report.is_ok(), "{:?}", report.violations);
    }

    #[test]
    fn test_same_stem_as_destination() {
        let matrix = RecordMatrix::from_rows([
            vec!["Id", "Parent"],
            vec!["1", "1"],
            vec!["2", "1"],
            vec!["3", "9"],
        ]);
        let source = source(vec![("tree", matrix)]);
        let report = check_exists(
            "tree",
            &[rule("tree", &[("Parent", "Id")])],
            &Metadata::default(),
            &source,
            CheckOptions::default(),
        )
        .unwrap();
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].value, "9");
        assert_eq!(report.violations[0].row, 3);
    }

    #[test]
    fn test_missing_destination_column_is_config_error() {
        let source = source(vec![
            ("src", column("V", &["a"])),
            ("dst", column("W", &["a"])),
        ]);
        let err = check_exists(
            "src",
            &[rule("dst", &[("V", "V")])],
            &Metadata::default(),
            &source,
            CheckOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CheckError::Config(ConfigError::MissingColumn { ref stem, .. }) if stem == "dst"
        ));
    }

    #[test]
    fn test_missing_destination_file_is_csv_error() {
        let source = source(vec![("src", column("V", &["a"]))]);
        let err = check_exists(
            "src",
            &[rule("nowhere", &[("V", "V")])],
            &Metadata::default(),
            &source,
            CheckOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CheckError::Csv(_)));
    }
}
