//! Run every configured rule over a CSV folder.
//!
//! Stems run in name order. For each stem the checks run as exists, then
//! unique, then type. Rule errors found without reading data (field syntax,
//! type names, ranges) fail the run before any file is loaded. Any other
//! fatal error ends the run where it occurs; violations are collected into
//! the [`RunReport`].

use chrono::Utc;

use crate::cache::MatrixSource;
use crate::checks::{check_exists, check_type, check_unique, CheckOptions};
use crate::config::RulerConfig;
use crate::error::{CheckResult, ConfigError};
use crate::models::{RuleKind, RuleSet};
use crate::report::{CheckReport, RunReport};

/// Which rules a run evaluates, and how it reacts to a violation.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Only these stems. Empty means all of them.
    pub stems: Vec<String>,
    /// Only these rule kinds. Empty means all of them.
    pub kinds: Vec<RuleKind>,
    /// Stop the whole run at the first violation.
    pub fail_fast: bool,
}

impl RunOptions {
    fn wants_stem(&self, stem: &str) -> bool {
        self.stems.is_empty() || self.stems.iter().any(|s| s == stem)
    }

    fn wants_kind(&self, kind: RuleKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }

    fn check_options(&self) -> CheckOptions {
        CheckOptions {
            fail_fast: self.fail_fast,
        }
    }
}

/// Evaluate the ruler against `source`.
pub fn run(
    config: &RulerConfig,
    source: &dyn MatrixSource,
    options: &RunOptions,
) -> CheckResult<RunReport> {
    // rule errors that need no CSV data abort before any file is read
    config.check_rules()?;
    for stem in &options.stems {
        if !config.rules.contains_key(stem) {
            return Err(ConfigError::UnknownStem(stem.clone()).into());
        }
    }

    let mut report = RunReport::new();
    tracing::info!(
        stems = config.rules.len(),
        fail_fast = options.fail_fast,
        "starting run"
    );

    for (stem, rules) in config.rules.iter().filter(|(s, _)| options.wants_stem(s)) {
        let stopped = run_stem(stem, rules, config, source, options, &mut report)?;
        if stopped {
            report.stopped_early = true;
            break;
        }
    }

    report.finished_at = Utc::now();
    tracing::info!(summary = %report.summary(), "run finished");
    Ok(report)
}

/// Returns true when fail-fast ended the run inside this stem.
fn run_stem(
    stem: &str,
    rules: &RuleSet,
    config: &RulerConfig,
    source: &dyn MatrixSource,
    options: &RunOptions,
    report: &mut RunReport,
) -> CheckResult<bool> {
    let metadata = &config.metadata;
    let check_options = options.check_options();

    for kind in [RuleKind::Exists, RuleKind::Unique, RuleKind::Type] {
        if !options.wants_kind(kind) {
            continue;
        }
        let check: CheckReport = match kind {
            RuleKind::Exists if !rules.exists.is_empty() => {
                check_exists(stem, &rules.exists, metadata, source, check_options)?
            }
            RuleKind::Unique => match &rules.unique {
                Some(unique) if !unique.fields.is_empty() => {
                    check_unique(stem, unique, metadata, source, check_options)?
                }
                _ => continue,
            },
            RuleKind::Type if !rules.vtype.is_empty() => {
                check_type(stem, &rules.vtype, metadata, source, check_options)?
            }
            _ => continue,
        };

        tracing::info!(summary = %check.summary(), "check done");
        let failed = !check.is_ok();
        report.checks.push(check);
        if failed && options.fail_fast {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MatrixCache, MemoryMatrixSource};
    use crate::error::CheckError;
    use crate::models::{Metadata, RecordMatrix};

    const RULER: &str = r#"{
        "csvons_metadata": { "name_index": 0, "data_index": 1 },
        "accounts": {
            "unique": { "fields": ["User"] }
        },
        "logins": {
            "exists": [{ "dst_file_stem": "accounts", "fields": [{ "src": "User", "dst": "User" }] }],
            "unique": { "fields": ["Session"] },
            "vtype": [{ "field": "Attempts", "type": "int", "range": { "min": 1, "max": 5 } }]
        }
    }"#;

    fn config() -> RulerConfig {
        RULER.parse().unwrap()
    }

    fn source() -> MemoryMatrixSource {
        MemoryMatrixSource::new(&Metadata::default())
            .with(
                "accounts",
                RecordMatrix::from_rows([vec!["User"], vec!["u1"], vec!["u2"]]),
            )
            .with(
                "logins",
                RecordMatrix::from_rows([
                    vec!["User", "Session", "Attempts"],
                    vec!["u1", "s1", "1"],
                    vec!["u9", "s2", "7"],
                    vec!["u2", "s2", "3"],
                ]),
            )
    }

    #[test]
    fn test_full_run_collects_everything() {
        let report = run(&config(), &source(), &RunOptions::default()).unwrap();

        let order: Vec<_> = report
            .checks
            .iter()
            .map(|c| (c.stem.as_str(), c.rule))
            .collect();
        assert_eq!(
            order,
            [
                ("accounts", RuleKind::Unique),
                ("logins", RuleKind::Exists),
                ("logins", RuleKind::Unique),
                ("logins", RuleKind::Type),
            ]
        );
        assert_eq!(report.violation_count(), 3);
        assert!(!report.stopped_early);
        assert!(report.finished_at >= report.started_at);
    }

    #[test]
    fn test_fail_fast_stops_run() {
        let options = RunOptions {
            fail_fast: true,
            ..Default::default()
        };
        let report = run(&config(), &source(), &options).unwrap();
        assert_eq!(report.violation_count(), 1);
        assert!(report.stopped_early);
        assert_eq!(report.checks.last().map(|c| c.rule), Some(RuleKind::Exists));
    }

    #[test]
    fn test_filter_by_stem_and_kind() {
        let options = RunOptions {
            stems: vec!["logins".into()],
            kinds: vec![RuleKind::Type],
            fail_fast: false,
        };
        let report = run(&config(), &source(), &options).unwrap();
        assert_eq!(report.checks.len(), 1);
        assert_eq!(report.checks[0].rule, RuleKind::Type);
        assert_eq!(report.violations().next().map(|v| v.value.as_str()), Some("7"));
    }

    #[test]
    fn test_unknown_stem_rejected() {
        let options = RunOptions {
            stems: vec!["nope".into()],
            ..Default::default()
        };
        let err = run(&config(), &source(), &options).unwrap_err();
        assert!(matches!(
            err,
            CheckError::Config(ConfigError::UnknownStem(ref s)) if s == "nope"
        ));
    }

    #[test]
    fn test_fatal_error_aborts_run() {
        let source = MemoryMatrixSource::new(&Metadata::default()).with(
            "accounts",
            RecordMatrix::from_rows([vec!["User"], vec!["u1"]]),
        );
        let err = run(&config(), &source, &RunOptions::default()).unwrap_err();
        assert!(matches!(err, CheckError::Csv(_)));
    }

    #[test]
    fn test_rule_errors_fail_before_loading() {
        let config: RulerConfig = r#"{
            "csvons_metadata": { "name_index": 0, "data_index": 1 },
            "aaa": { "unique": { "fields": ["V"] } },
            "zzz": { "vtype": [{ "field": "V", "type": "integer" }] }
        }"#
        .parse()
        .unwrap();
        let cache = MatrixCache::new(
            MemoryMatrixSource::new(&Metadata::default())
                .with("aaa", RecordMatrix::from_rows([vec!["V"], vec!["1"], vec!["1"]]))
                .with("zzz", RecordMatrix::from_rows([vec!["V"], vec!["1"]])),
        );

        let err = run(&config, &cache, &RunOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            CheckError::Config(ConfigError::UnknownType { ref declared, .. }) if declared == "integer"
        ));
        assert!(cache.loaded_stems().is_empty());
    }

    #[test]
    fn test_cache_loads_each_stem_once() {
        let cache = MatrixCache::new(source());
        let report = run(&config(), &cache, &RunOptions::default()).unwrap();
        assert_eq!(report.checks.len(), 4);
        assert_eq!(cache.loaded_stems(), ["accounts", "logins"]);
    }

    #[test]
    fn test_clean_run() {
        let source = MemoryMatrixSource::new(&Metadata::default())
            .with(
                "accounts",
                RecordMatrix::from_rows([vec!["User"], vec!["u1"]]),
            )
            .with(
                "logins",
                RecordMatrix::from_rows([vec!["User", "Session", "Attempts"], vec!["u1", "s1", "2"]]),
            );
        let report = run(&config(), &source, &RunOptions::default()).unwrap();
        assert!(report.is_ok());
        assert_eq!(report.summary(), "4 checks, 0 failed, 0 violations");
    }
}
