mod summary;

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use permacal_core::{
    DEFAULT_PRIMARY_FILE, LegacyMonths, ListOrder, MergeOptions, MonthPolicy, NormalizeOptions,
    normalize_document, run_merge,
};
use permacal_store::{
    DEFAULT_PATTERN, LoadOutcome, backup_file, load_dir, load_document, read_json,
    write_json_atomic,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Merge and normalize the plant data files of the gardening calendar.
#[derive(Parser, Debug)]
#[command(name = "permacal", version)]
struct Cli {
    /// Log at debug level and list every anomaly in the summary
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Merge every plant file of a directory into one canonical file
    Merge(MergeArgs),
    /// Normalize one plant file, in place (with a backup) or to --output
    Normalize(NormalizeArgs),
}

#[derive(Args, Debug)]
struct MergeArgs {
    /// Directory holding the source plant files
    #[arg(long, env = "PERMACAL_INPUT", default_value = "data")]
    input: PathBuf,

    /// Merged output file
    #[arg(long, env = "PERMACAL_OUTPUT", default_value = "plants_merged.json")]
    output: PathBuf,

    /// File-name glob selecting source files
    #[arg(long, default_value = DEFAULT_PATTERN)]
    pattern: String,

    /// File name of the canonical source, ranked first on conflicts
    #[arg(long, env = "PERMACAL_PRIMARY", default_value = DEFAULT_PRIMARY_FILE)]
    primary: String,

    #[command(flatten)]
    rules: RuleArgs,
}

#[derive(Args, Debug)]
struct NormalizeArgs {
    /// Plant file to normalize
    file: PathBuf,

    /// Write here instead of overwriting FILE
    #[arg(long)]
    output: Option<PathBuf>,

    /// Store the effective month policy under metadata.month_map
    #[arg(long)]
    record_month_map: bool,

    #[command(flatten)]
    rules: RuleArgs,
}

/// Normalization switches shared by both commands.
#[derive(Args, Debug)]
struct RuleArgs {
    /// Ordering of companion name lists [default: sorted for merge, first-seen for normalize]
    #[arg(long, value_enum)]
    list_order: Option<ListOrderArg>,

    /// JSON file mapping month tokens to months, overriding single-letter guesses
    #[arg(long, env = "PERMACAL_MONTH_MAP")]
    month_map: Option<PathBuf>,

    /// What to do with legacy single-letter month fields
    #[arg(long, value_enum, default_value_t = LegacyMonthsArg::Keep)]
    legacy_months: LegacyMonthsArg,

    /// Map sun exposure, water needs and seasons to stable tokens
    #[arg(long)]
    tokenize_enums: bool,

    /// Add referenceProfile and zoneProfiles blocks
    #[arg(long)]
    reference_profiles: bool,

    /// Timestamp used for metadata and backups (RFC 3339) [default: current time]
    #[arg(long, value_parser = parse_now)]
    now: Option<DateTime<Utc>>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ListOrderArg {
    Sorted,
    FirstSeen,
}

impl From<ListOrderArg> for ListOrder {
    fn from(arg: ListOrderArg) -> Self {
        match arg {
            ListOrderArg::Sorted => ListOrder::Sorted,
            ListOrderArg::FirstSeen => ListOrder::FirstSeen,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LegacyMonthsArg {
    Keep,
    Letters,
    Replace,
}

impl From<LegacyMonthsArg> for LegacyMonths {
    fn from(arg: LegacyMonthsArg) -> Self {
        match arg {
            LegacyMonthsArg::Keep => LegacyMonths::Keep,
            LegacyMonthsArg::Letters => LegacyMonths::Letters,
            LegacyMonthsArg::Replace => LegacyMonths::Replace,
        }
    }
}

fn parse_now(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp such as 2024-03-01T00:00:00Z: {e}"))
}

impl RuleArgs {
    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    fn normalize_options(&self, default_order: ListOrder) -> anyhow::Result<NormalizeOptions> {
        let month_policy = match &self.month_map {
            Some(path) => load_month_policy(path)?,
            None => MonthPolicy::default(),
        };
        Ok(NormalizeOptions {
            list_order: self.list_order.map(Into::into).unwrap_or(default_order),
            month_policy,
            legacy_months: self.legacy_months.into(),
            tokenize_enums: self.tokenize_enums,
            reference_profiles: self.reference_profiles,
        })
    }
}

fn load_month_policy(path: &Path) -> anyhow::Result<MonthPolicy> {
    let value = read_json(path)?;
    let policy = MonthPolicy::from_month_map(&value)
        .with_context(|| format!("invalid month map {}", path.display()))?;
    info!(
        path = %path.display(),
        overrides = policy.overrides().len(),
        "loaded month map"
    );
    Ok(policy)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Merge(args) => merge(args, cli.verbose),
        Command::Normalize(args) => normalize(args, cli.verbose),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn merge(args: MergeArgs, verbose: bool) -> anyhow::Result<()> {
    let now = args.rules.now();
    let options = MergeOptions {
        primary_file: args.primary.clone(),
        normalize: args.rules.normalize_options(ListOrder::Sorted)?,
    };

    let LoadOutcome {
        documents,
        failures,
    } = load_dir(&args.input, &args.pattern, std::slice::from_ref(&args.output))
        .with_context(|| format!("failed to scan {}", args.input.display()))?;
    if documents.is_empty() {
        bail!(
            "no plant file could be loaded from {} (pattern {})",
            args.input.display(),
            args.pattern
        );
    }

    let (output, mut report) = run_merge(documents, &options, now);
    let mut anomalies = failures;
    anomalies.append(&mut report.anomalies);
    report.anomalies = anomalies;

    backup_file(&args.output, now)?;
    write_json_atomic(&args.output, &output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    summary::print_summary("merge", &report, &args.output, verbose);
    Ok(())
}

fn normalize(args: NormalizeArgs, verbose: bool) -> anyhow::Result<()> {
    let now = args.rules.now();
    let options = args.rules.normalize_options(ListOrder::FirstSeen)?;

    let document = load_document(&args.file)
        .with_context(|| format!("failed to load {}", args.file.display()))?;
    let (document, report) = normalize_document(document, &options, args.record_month_map);

    let target = args.output.as_deref().unwrap_or(&args.file);
    backup_file(target, now)?;
    write_json_atomic(target, &document.to_value())
        .with_context(|| format!("failed to write {}", target.display()))?;

    summary::print_summary("normalize", &report, target, verbose);
    Ok(())
}
