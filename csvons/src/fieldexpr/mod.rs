//! Field expressions: addressing a logical field inside a CSV record.
//!
//! | Syntax          | Variant   | Values per row                                   |
//! |-----------------|-----------|--------------------------------------------------|
//! | `Name`          | Plain     | the cell                                         |
//! | `Name[]`        | Repeat    | the cell split on `lev1_separator`               |
//! | `Name{n}`       | Nested    | element `n` of each repeated part split on `lev2_separator` |
//! | `{A}{B}...`     | Complex   | `A + connector + B + connector ...`              |
//!
//! Classification is a pure function of the string ([`FieldExpr::parse`]);
//! binding it to a [`Metadata`](crate::models::Metadata) and scanning a
//! matrix is the job of [`FieldResolver`].
//!
//! ```rust,ignore
//! use csvons::fieldexpr::{FieldExpr, FieldResolver};
//!
//! assert_eq!(
//!     FieldExpr::parse("Tags{1}").unwrap(),
//!     FieldExpr::Nested { name: "Tags".into(), index: 1 },
//! );
//!
//! let resolver = FieldResolver::new(&metadata, "{First}{Last}")?;
//! for value in resolver.values("users", &matrix)? {
//!     println!("row {}: {}", value.row, value.value);
//! }
//! ```

pub mod resolver;

pub use resolver::{FieldResolver, FieldValue, FieldValues};

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ConfigError, ConfigResult};

static NESTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9]+)\{([0-9]+)\}$").expect("nested pattern"));
static REPEAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9]+)\[\]$").expect("repeat pattern"));
static PLAIN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("plain pattern"));
static COMPLEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\{[A-Za-z0-9]+\})+$").expect("complex pattern"));
static COMPLEX_PART: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9]+)\}").expect("complex part pattern"));

/// A parsed field expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldExpr {
    /// `Name`
    Plain { name: String },
    /// `Name[]`
    Repeat { name: String },
    /// `Name{index}`
    Nested { name: String, index: usize },
    /// `{A}{B}...`, at least one name.
    Complex { names: Vec<String> },
}

/// Variant tag, mostly for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Plain,
    Repeat,
    Nested,
    Complex,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Plain => "plain",
            FieldKind::Repeat => "repeat",
            FieldKind::Nested => "nested",
            FieldKind::Complex => "complex",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FieldExpr {
    /// Classify `expr`. Patterns are tried as nested, repeat, plain, complex;
    /// they cannot overlap, the order only fixes which check runs first.
    pub fn parse(expr: &str) -> ConfigResult<Self> {
        if let Some(caps) = NESTED.captures(expr) {
            let index = caps[2]
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidNestedIndex(expr.to_string()))?;
            return Ok(FieldExpr::Nested {
                name: caps[1].to_string(),
                index,
            });
        }

        if let Some(caps) = REPEAT.captures(expr) {
            return Ok(FieldExpr::Repeat {
                name: caps[1].to_string(),
            });
        }

        if PLAIN.is_match(expr) {
            return Ok(FieldExpr::Plain {
                name: expr.to_string(),
            });
        }

        if COMPLEX.is_match(expr) {
            let names = COMPLEX_PART
                .captures_iter(expr)
                .map(|caps| caps[1].to_string())
                .collect();
            return Ok(FieldExpr::Complex { names });
        }

        Err(ConfigError::UnknownFieldExpr(expr.to_string()))
    }

    pub fn kind(&self) -> FieldKind {
        match self {
            FieldExpr::Plain { .. } => FieldKind::Plain,
            FieldExpr::Repeat { .. } => FieldKind::Repeat,
            FieldExpr::Nested { .. } => FieldKind::Nested,
            FieldExpr::Complex { .. } => FieldKind::Complex,
        }
    }

    /// Column names this expression reads, in order.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            FieldExpr::Plain { name }
            | FieldExpr::Repeat { name }
            | FieldExpr::Nested { name, .. } => vec![name.as_str()],
            FieldExpr::Complex { names } => names.iter().map(String::as_str).collect(),
        }
    }
}

impl FromStr for FieldExpr {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldExpr::Plain { name } => write!(f, "{}", name),
            FieldExpr::Repeat { name } => write!(f, "{}[]", name),
            FieldExpr::Nested { name, index } => write!(f, "{}{{{}}}", name, index),
            FieldExpr::Complex { names } => {
                for name in names {
                    write!(f, "{{{}}}", name)?;
                }
                Ok(())
            }
        }
    }
}

/// Reference text for the `grammar` command.
pub fn grammar_description() -> String {
    r#"Field expression syntax:

| Syntax        | Kind    | Values produced per data row                                  |
|---------------|---------|---------------------------------------------------------------|
| Name          | plain   | the cell of column Name                                       |
| Name[]        | repeat  | the cell split on lev1_separator                              |
| Name{n}       | nested  | cell split on lev1_separator, each part split on              |
|               |         | lev2_separator, element n (zero-based) of every part          |
| {A}{B}...     | complex | one value: A, B, ... each followed by field_connector         |

Column names are ASCII letters and digits only.

Complex values end with the connector: {First}{Last} over ("Ada", "Lovelace")
with connector "-" gives "Ada-Lovelace-". Write the other side of an exists rule
as a complex expression too so both sides carry the trailing connector.

Examples (lev1_separator ",", lev2_separator ":"):
  Tags[]   on "red,green"        -> "red", "green"
  Pairs{1} on "a:1,b:2"          -> "1", "2"
  {Id}     on "42"               -> "42-""#
        .to_string()
}
