//! Ruler configuration loading.
//!
//! A ruler is one JSON object: a metadata section under `csvons_metadata`
//! (or `metadata`) and one [`RuleSet`] per CSV file stem under every other
//! key. The document goes through schema validation, then metadata
//! validation, before any checker sees it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde_json::Value;

use crate::error::{ConfigError, ConfigResult};
use crate::fieldexpr::FieldExpr;
use crate::models::{Metadata, RuleSet, ValueType};
use crate::validation::validate_ruler_document;

/// Keys accepted for the metadata section, in lookup order.
pub const METADATA_KEYS: [&str; 2] = ["csvons_metadata", "metadata"];

const EXAMPLE_CONFIG: &str = include_str!("../../schemas/example.ruler.json");

/// A validated ruler: metadata plus rule sets keyed by stem.
#[derive(Debug, Clone, PartialEq)]
pub struct RulerConfig {
    pub metadata: Metadata,
    /// Ordered by stem so runs and reports are deterministic.
    pub rules: BTreeMap<String, RuleSet>,
}

impl RulerConfig {
    /// Read and validate a ruler file.
    ///
    /// A relative `csv_file_folder` is resolved against the directory of the
    /// ruler file, so a ruler works from any working directory.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config: RulerConfig = text.parse()?;
        if let Some(dir) = path.parent() {
            let folder = Path::new(&config.metadata.csv_file_folder);
            if folder.is_relative() && !dir.as_os_str().is_empty() {
                config.metadata.csv_file_folder = dir.join(folder).to_string_lossy().into_owned();
            }
        }

        tracing::info!(
            path = %path.display(),
            stems = config.rules.len(),
            csv_folder = %config.metadata.csv_file_folder,
            "ruler loaded"
        );
        Ok(config)
    }

    /// Build a ruler from an already parsed JSON document.
    pub fn from_value(mut doc: Value) -> ConfigResult<Self> {
        let has_metadata = doc
            .as_object()
            .map_or(false, |map| METADATA_KEYS.iter().any(|k| map.contains_key(*k)));
        if doc.is_object() && !has_metadata {
            return Err(ConfigError::MissingMetadata);
        }

        validate_ruler_document(&doc).map_err(|errors| ConfigError::SchemaError { errors })?;

        let map = doc.as_object_mut().ok_or(ConfigError::MissingMetadata)?;
        let raw_metadata = METADATA_KEYS
            .iter()
            .find_map(|key| map.remove(*key))
            .ok_or(ConfigError::MissingMetadata)?;

        let metadata: Metadata = serde_json::from_value(raw_metadata)?;
        metadata.validate()?;

        let mut rules = BTreeMap::new();
        for (stem, raw) in std::mem::take(map) {
            let rule_set: RuleSet = serde_json::from_value(raw)?;
            if rule_set.is_empty() {
                tracing::debug!(stem = %stem, "stem declares no rules");
            }
            rules.insert(stem, rule_set);
        }

        Ok(Self { metadata, rules })
    }

    /// Point the ruler at another CSV folder, used as given.
    pub fn with_csv_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.metadata.csv_file_folder = folder.into().to_string_lossy().into_owned();
        self
    }

    /// Stems with at least one rule, in run order.
    pub fn stems(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    /// Check what can be checked without reading any CSV: every field
    /// expression parses, every declared type is known, every range is
    /// ordered.
    pub fn check_rules(&self) -> ConfigResult<()> {
        for rules in self.rules.values() {
            let exprs = rules
                .exists
                .iter()
                .flat_map(|e| e.fields.iter().flat_map(|f| [&f.src, &f.dst]))
                .chain(rules.unique.iter().flat_map(|u| u.fields.iter()))
                .chain(rules.vtype.iter().map(|v| &v.field));
            for expr in exprs {
                FieldExpr::parse(expr)?;
            }

            for vtype in &rules.vtype {
                let expected = vtype
                    .vtype
                    .parse::<ValueType>()
                    .map_err(|_| ConfigError::UnknownType {
                        field: vtype.field.clone(),
                        declared: vtype.vtype.clone(),
                    })?;
                // bool ranges are ignored by the type check
                if let Some(range) = vtype.range.filter(|_| expected.is_numeric()) {
                    if !(range.min <= range.max) {
                        return Err(ConfigError::InvalidRange {
                            field: vtype.field.clone(),
                            min: range.min,
                            max: range.max,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// Every stem the rules touch, destinations of existence rules included.
    pub fn referenced_stems(&self) -> Vec<&str> {
        let mut stems: Vec<&str> = self
            .rules
            .iter()
            .flat_map(|(stem, rules)| {
                std::iter::once(stem.as_str())
                    .chain(rules.exists.iter().map(|e| e.dst_file_stem.as_str()))
            })
            .collect();
        stems.sort_unstable();
        stems.dedup();
        stems
    }
}

impl FromStr for RulerConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let doc: Value = serde_json::from_str(s)?;
        Self::from_value(doc)
    }
}

/// A documented sample ruler, printed by `csvons example-config`.
pub fn example_config() -> &'static str {
    EXAMPLE_CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"{
        "csvons_metadata": { "csv_file_folder": "data", "name_index": 0, "data_index": 1 },
        "users": { "unique": { "fields": ["Email"] } },
        "logins": {
            "exists": [{ "dst_file_stem": "users", "fields": [{ "src": "User", "dst": "Email" }] }],
            "vtype": [{ "field": "Attempts", "type": "int" }]
        }
    }"#;

    #[test]
    fn test_parse_minimal() {
        let config: RulerConfig = MINIMAL.parse().unwrap();
        assert_eq!(config.metadata.csv_file_folder, "data");
        assert_eq!(config.metadata.lev1_separator, ",");
        assert_eq!(config.stems().collect::<Vec<_>>(), ["logins", "users"]);
        assert_eq!(config.rules["logins"].exists[0].dst_file_stem, "users");
        assert_eq!(config.rules["logins"].vtype[0].vtype, "int");
    }

    #[test]
    fn test_metadata_alias() {
        let config: RulerConfig = r#"{ "metadata": { "name_index": 1, "data_index": 3 } }"#
            .parse()
            .unwrap();
        assert_eq!(config.metadata.name_index, 1);
        assert_eq!(config.metadata.data_index, 3);
        assert!(config.rules.is_empty());
    }

    #[test]
    fn test_missing_metadata() {
        let err = r#"{ "users": {} }"#.parse::<RulerConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::MissingMetadata));
    }

    #[test]
    fn test_data_index_must_follow_name_index() {
        let err = r#"{ "csvons_metadata": { "name_index": 2, "data_index": 2 } }"#
            .parse::<RulerConfig>()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMetadata(_)));
    }

    #[test]
    fn test_schema_errors_collected() {
        let err = r#"{
            "csvons_metadata": { "name_index": 0, "data_index": 1 },
            "users": { "unique": { "fields": "Email" }, "vtype": {} }
        }"#
        .parse::<RulerConfig>()
        .unwrap_err();
        match err {
            ConfigError::SchemaError { errors } => assert!(errors.len() >= 2, "{:?}", errors),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_not_json() {
        let err = "csvons_metadata:".parse::<RulerConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::JsonError(_)));
    }

    #[test]
    fn test_load_resolves_relative_folder() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ruler.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = RulerConfig::load(&path).unwrap();
        assert_eq!(
            Path::new(&config.metadata.csv_file_folder),
            dir.path().join("data")
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = RulerConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
    }

    #[test]
    fn test_csv_folder_override() {
        let config: RulerConfig = MINIMAL.parse().unwrap();
        let config = config.with_csv_folder("/srv/exports");
        assert_eq!(config.metadata.csv_file_folder, "/srv/exports");
    }

    #[test]
    fn test_referenced_stems() {
        let config: RulerConfig = MINIMAL.parse().unwrap();
        assert_eq!(config.referenced_stems(), ["logins", "users"]);
    }

    #[test]
    fn test_check_rules() {
        let config: RulerConfig = MINIMAL.parse().unwrap();
        assert!(config.check_rules().is_ok());

        let bad_expr: RulerConfig = r#"{
            "csvons_metadata": { "name_index": 0, "data_index": 1 },
            "users": { "unique": { "fields": ["Email", "first name"] } }
        }"#
        .parse()
        .unwrap();
        assert!(matches!(
            bad_expr.check_rules(),
            Err(ConfigError::UnknownFieldExpr(ref e)) if e == "first name"
        ));

        let bad_type: RulerConfig = r#"{
            "csvons_metadata": { "name_index": 0, "data_index": 1 },
            "users": { "vtype": [{ "field": "Age", "type": "uint8" }] }
        }"#
        .parse()
        .unwrap();
        assert!(matches!(
            bad_type.check_rules(),
            Err(ConfigError::UnknownType { .. })
        ));
    }

    #[test]
    fn test_check_rules_ranges() {
        let inverted: RulerConfig = r#"{
            "csvons_metadata": { "name_index": 0, "data_index": 1 },
            "users": { "vtype": [{ "field": "Age", "type": "int", "range": { "min": 9, "max": 1 } }] }
        }"#
        .parse()
        .unwrap();
        assert!(matches!(
            inverted.check_rules(),
            Err(ConfigError::InvalidRange { .. })
        ));

        let bool_range: RulerConfig = r#"{
            "csvons_metadata": { "name_index": 0, "data_index": 1 },
            "users": { "vtype": [{ "field": "Active", "type": "bool", "range": { "min": 9, "max": 1 } }] }
        }"#
        .parse()
        .unwrap();
        assert!(bool_range.check_rules().is_ok());
    }

    #[test]
    fn test_example_config_is_valid() {
        let config: RulerConfig = example_config().parse().unwrap();
        assert!(config.check_rules().is_ok());
        assert_eq!(config.stems().collect::<Vec<_>>(), ["accounts", "logins"]);
        assert_eq!(config.rules["logins"].vtype.len(), 2);
    }
}
