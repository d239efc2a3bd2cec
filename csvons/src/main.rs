//! csvons CLI - check a folder of CSV files against a JSON ruler
//!
//! # Main Commands
//!
//! ```bash
//! csvons check --config ruler.json          # Run every rule
//! csvons check --only unique --fail-fast    # Subset, stop at first violation
//! csvons validate-config ruler.json         # Schema + metadata only
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! csvons resolve --config ruler.json users 'Tags[]'   # Values of one field
//! csvons example-config                                # Sample ruler
//! csvons grammar                                       # Field expression syntax
//! ```
//!
//! Exit codes: 0 clean, 1 violations found, 2 fatal error.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use csvons::logging::{init_logging, LogConfig, LogFormat};
use csvons::{
    run, FieldResolver, FsMatrixSource, MatrixCache, MatrixSource, RuleKind, RulerConfig,
    RunOptions,
};

#[derive(Parser)]
#[command(name = "csvons")]
#[command(about = "Check CSV files against declarative constraint rules", long_about = None)]
#[command(version)]
struct Cli {
    /// More log output (-v warn, -vv info, -vvv debug, -vvvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Rule kinds selectable with `--only`.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Exists,
    Unique,
    Type,
}

impl From<KindArg> for RuleKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Exists => RuleKind::Exists,
            KindArg::Unique => RuleKind::Unique,
            KindArg::Type => RuleKind::Type,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the ruler against its CSV folder
    Check {
        /// Ruler JSON file
        #[arg(short, long, env = "CSVONS_CONFIG")]
        config: PathBuf,

        /// CSV folder, overriding the ruler's csv_file_folder
        #[arg(long)]
        csv_folder: Option<PathBuf>,

        /// Only check these stems (repeatable)
        #[arg(short, long)]
        stem: Vec<String>,

        /// Only run these rule kinds (repeatable)
        #[arg(long, value_enum)]
        only: Vec<KindArg>,

        /// Stop at the first violation
        #[arg(long)]
        fail_fast: bool,

        /// Read each CSV file once per run
        #[arg(long)]
        cache: bool,

        /// Write the full JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Print the values a field expression resolves to
    Resolve {
        /// Ruler JSON file (for metadata)
        #[arg(short, long, env = "CSVONS_CONFIG")]
        config: PathBuf,

        /// CSV folder, overriding the ruler's csv_file_folder
        #[arg(long)]
        csv_folder: Option<PathBuf>,

        /// File stem
        stem: String,

        /// Field expression, e.g. `Tags[]` or `{First}{Last}`
        expr: String,

        /// Print at most this many values
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Validate a ruler file without reading any CSV
    ValidateConfig {
        /// Ruler JSON file
        config: PathBuf,
    },

    /// Show an example ruler
    ExampleConfig,

    /// Show the field expression syntax
    Grammar,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn main() -> ExitCode {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_config = LogConfig::from_verbosity(cli.verbose).with_format(cli.log_format);
    if let Err(e) = init_logging(&log_config) {
        eprintln!("warning: logging unavailable: {}", e);
    }

    let result = match cli.command {
        Commands::Check {
            config,
            csv_folder,
            stem,
            only,
            fail_fast,
            cache,
            report,
        } => {
            let options = RunOptions {
                stems: stem,
                kinds: only.into_iter().map(RuleKind::from).collect(),
                fail_fast,
            };
            cmd_check(&config, csv_folder, &options, cache, report.as_deref())
        }

        Commands::Resolve {
            config,
            csv_folder,
            stem,
            expr,
            limit,
        } => cmd_resolve(&config, csv_folder, &stem, &expr, limit).map(|()| true),

        Commands::ValidateConfig { config } => cmd_validate_config(&config).map(|()| true),

        Commands::ExampleConfig => {
            println!("{}", csvons::example_config());
            Ok(true)
        }

        Commands::Grammar => {
            println!("{}", csvons::grammar_description());
            Ok(true)
        }
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("❌ Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn load_config(path: &Path, csv_folder: Option<PathBuf>) -> CliResult<RulerConfig> {
    let config = RulerConfig::load(path)?;
    Ok(match csv_folder {
        Some(folder) => config.with_csv_folder(folder),
        None => config,
    })
}

/// Returns whether the run was clean.
fn cmd_check(
    config_path: &Path,
    csv_folder: Option<PathBuf>,
    options: &RunOptions,
    cache: bool,
    report_path: Option<&Path>,
) -> CliResult<bool> {
    let config = load_config(config_path, csv_folder)?;
    eprintln!("📄 Ruler: {}", config_path.display());
    eprintln!("   CSV folder: {}", config.metadata.csv_file_folder);
    eprintln!("   Stems: {}", config.stems().collect::<Vec<_>>().join(", "));

    let fs_source = FsMatrixSource::new(&config.metadata);
    let cached;
    let source: &dyn MatrixSource = if cache {
        cached = MatrixCache::new(fs_source);
        &cached
    } else {
        &fs_source
    };

    let report = run(&config, source, options)?;

    for violation in report.violations() {
        println!("{}", violation);
    }

    if let Some(path) = report_path {
        fs::write(path, report.to_json()?)?;
        eprintln!("💾 Report written to: {}", path.display());
    }

    if report.is_ok() {
        eprintln!("✅ {}", report.summary());
    } else {
        eprintln!("❌ {}", report.summary());
    }
    Ok(report.is_ok())
}

fn cmd_resolve(
    config_path: &Path,
    csv_folder: Option<PathBuf>,
    stem: &str,
    expr: &str,
    limit: Option<usize>,
) -> CliResult<()> {
    let config = load_config(config_path, csv_folder)?;
    let source = FsMatrixSource::new(&config.metadata);
    let matrix = source.load(stem)?;

    let resolver = FieldResolver::new(&config.metadata, expr)?;
    eprintln!("🔎 {} ({}) in {}", expr, resolver.expr().kind(), stem);

    let mut count = 0;
    for item in resolver
        .values(stem, &matrix)?
        .take(limit.unwrap_or(usize::MAX))
    {
        println!("{}\t{}", item.row, item.value);
        count += 1;
    }
    eprintln!("   {} values", count);
    Ok(())
}

fn cmd_validate_config(config_path: &Path) -> CliResult<()> {
    eprintln!("✔️  Validating: {}", config_path.display());
    let config = RulerConfig::load(config_path)?;
    config.check_rules()?;

    let rule_count: usize = config
        .rules
        .values()
        .map(|r| {
            r.exists.iter().map(|e| e.fields.len()).sum::<usize>()
                + r.unique.as_ref().map_or(0, |u| u.fields.len())
                + r.vtype.len()
        })
        .sum();
    eprintln!(
        "✅ Valid: {} stems, {} field rules, files: {}",
        config.rules.len(),
        rule_count,
        config.referenced_stems().join(", ")
    );
    Ok(())
}
