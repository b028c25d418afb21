//! These structs provide the CLI interface for the lens CLI.

use crate::interval::Granularity;
use crate::model::OpType;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// lens: analytics for a personal finance ledger.
///
/// Reads the accounts, categories and operations kept in the data file under the home directory
/// and reports totals, balances and usage over any date range. Amounts in other currencies are
/// converted with daily exchange rates that are fetched once per month and currency and cached
/// locally.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the home directory and initialize the configuration file.
    ///
    /// The rate source is an HTTP server publishing daily USD rates as JSON arrays at
    /// `{url}/{currency}/{year}-{month}.json`.
    Init(InitArgs),
    /// Print a running total with per-interval changes, converted into the master currency.
    Totals(TotalsArgs),
    /// Print a month by year grid of amounts in the master currency.
    Matrix(MatrixArgs),
    /// Print every account's balance and the sum of all balances in the master currency.
    Balances(BalancesArgs),
    /// Print accounts, categories, currencies and tags from most to least used.
    Usage,
    /// Print the exchange rate between two currencies.
    Rate(RateArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where data and configuration are held. Defaults to ~/ledger-lens
    #[arg(long, env = "LEDGER_LENS_HOME", default_value_t = default_home())]
    home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, home: PathBuf) -> Self {
        Self {
            log_level,
            home: home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn home(&self) -> &DisplayPath {
        &self.home
    }
}

/// Args for the `lens init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The base URL of the exchange rate source, e.g. https://rates.example.com/v1
    #[arg(long)]
    rate_source_url: String,
}

impl InitArgs {
    pub fn new(rate_source_url: impl Into<String>) -> Self {
        Self {
            rate_source_url: rate_source_url.into(),
        }
    }

    pub fn rate_source_url(&self) -> &str {
        &self.rate_source_url
    }
}

/// The date range to report on, both ends included.
#[derive(Debug, Parser, Clone)]
pub struct SpanArgs {
    /// First day, YYYY-MM-DD.
    #[arg(long)]
    from: NaiveDate,

    /// Last day, YYYY-MM-DD.
    #[arg(long)]
    to: NaiveDate,
}

impl SpanArgs {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn from(&self) -> NaiveDate {
        self.from
    }

    pub fn to(&self) -> NaiveDate {
        self.to
    }
}

/// Which operations to include. Names are account and category names, not ids. Each dimension
/// can either select or exclude, not both.
#[derive(Debug, Parser, Clone, Default)]
pub struct FilterArgs {
    /// Only include operations of this type: income, expense, transfer or adjustment. Repeatable.
    #[arg(long = "type")]
    op_types: Vec<OpType>,

    /// Only include operations in this category. Repeatable. Use "" for uncategorized.
    #[arg(long, conflicts_with = "not_category")]
    category: Vec<String>,

    /// Leave out operations in this category. Repeatable.
    #[arg(long)]
    not_category: Vec<String>,

    /// Only include operations touching this account. Repeatable.
    #[arg(long, conflicts_with = "not_account")]
    account: Vec<String>,

    /// Leave out operations touching this account. Repeatable.
    #[arg(long)]
    not_account: Vec<String>,

    /// Only include operations with this tag. Repeatable.
    #[arg(long, conflicts_with = "not_tag")]
    tag: Vec<String>,

    /// Leave out operations with this tag. Repeatable.
    #[arg(long)]
    not_tag: Vec<String>,
}

impl FilterArgs {
    pub fn op_types(&self) -> &[OpType] {
        &self.op_types
    }

    pub fn category(&self) -> &[String] {
        &self.category
    }

    pub fn not_category(&self) -> &[String] {
        &self.not_category
    }

    pub fn account(&self) -> &[String] {
        &self.account
    }

    pub fn not_account(&self) -> &[String] {
        &self.not_account
    }

    pub fn tag(&self) -> &[String] {
        &self.tag
    }

    pub fn not_tag(&self) -> &[String] {
        &self.not_tag
    }

    #[cfg(test)]
    pub(crate) fn with_categories(mut self, names: &[&str], exclude: bool) -> Self {
        let names = names.iter().map(|s| s.to_string()).collect();
        if exclude {
            self.not_category = names;
        } else {
            self.category = names;
        }
        self
    }

    #[cfg(test)]
    pub(crate) fn with_types(mut self, op_types: &[OpType]) -> Self {
        self.op_types = op_types.to_vec();
        self
    }
}

/// Args for the `lens totals` command.
#[derive(Debug, Parser, Clone)]
pub struct TotalsArgs {
    #[clap(flatten)]
    span: SpanArgs,

    /// The interval each row covers: day, week-sunday, week-monday, month or year.
    #[arg(long, default_value_t = Granularity::Month)]
    granularity: Granularity,

    #[clap(flatten)]
    filter: FilterArgs,
}

impl TotalsArgs {
    pub fn new(span: SpanArgs, granularity: Granularity, filter: FilterArgs) -> Self {
        Self {
            span,
            granularity,
            filter,
        }
    }

    pub fn span(&self) -> &SpanArgs {
        &self.span
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn filter(&self) -> &FilterArgs {
        &self.filter
    }
}

/// Args for the `lens matrix` command. Without filter flags only spending is included.
#[derive(Debug, Parser, Clone)]
pub struct MatrixArgs {
    #[clap(flatten)]
    span: SpanArgs,

    #[clap(flatten)]
    filter: FilterArgs,
}

impl MatrixArgs {
    pub fn new(span: SpanArgs, filter: FilterArgs) -> Self {
        Self { span, filter }
    }

    pub fn span(&self) -> &SpanArgs {
        &self.span
    }

    pub fn filter(&self) -> &FilterArgs {
        &self.filter
    }
}

/// Args for the `lens balances` command.
#[derive(Debug, Parser, Clone)]
pub struct BalancesArgs {
    #[clap(flatten)]
    span: SpanArgs,

    /// The interval each row covers: day, week-sunday, week-monday, month or year.
    #[arg(long, default_value_t = Granularity::Month)]
    granularity: Granularity,
}

impl BalancesArgs {
    pub fn new(span: SpanArgs, granularity: Granularity) -> Self {
        Self { span, granularity }
    }

    pub fn span(&self) -> &SpanArgs {
        &self.span
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }
}

/// Args for the `lens rate` command.
#[derive(Debug, Parser, Clone)]
pub struct RateArgs {
    /// The day of the rate, YYYY-MM-DD. Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// The currency to convert from, e.g. EUR.
    #[arg(long)]
    from: String,

    /// The currency to convert into, e.g. JPY.
    #[arg(long)]
    to: String,
}

impl RateArgs {
    pub fn new(date: Option<NaiveDate>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            date,
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn from(&self) -> &str {
        &self.from
    }

    pub fn to(&self) -> &str {
        &self.to
    }
}

fn default_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("ledger-lens"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --home or LEDGER_LENS_HOME instead of relying on the default \
                home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("ledger-lens")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        <Args as CommandFactory>::command().debug_assert();
    }

    #[test]
    fn parses_totals_with_filters() {
        let args = Args::try_parse_from([
            "lens",
            "--home",
            "/tmp/lens",
            "totals",
            "--from",
            "2024-01-01",
            "--to",
            "2024-03-31",
            "--granularity",
            "week-monday",
            "--type",
            "expense",
            "--not-category",
            "Rent",
            "--not-category",
            "Taxes",
        ])
        .unwrap();
        assert_eq!(args.common().home().path(), Path::new("/tmp/lens"));
        let Command::Totals(totals) = args.command() else {
            panic!("expected totals");
        };
        assert_eq!(totals.span().from().to_string(), "2024-01-01");
        assert_eq!(totals.granularity(), Granularity::WeekMonday);
        assert_eq!(totals.filter().op_types(), &[OpType::Expense]);
        assert_eq!(totals.filter().not_category(), &["Rent", "Taxes"]);
        assert!(totals.filter().category().is_empty());
    }

    #[test]
    fn select_and_exclude_conflict() {
        let result = Args::try_parse_from([
            "lens", "matrix", "--from", "2024-01-01", "--to", "2024-01-31", "--tag", "a",
            "--not-tag", "b",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn rate_date_is_optional() {
        let args =
            Args::try_parse_from(["lens", "rate", "--from", "EUR", "--to", "JPY"]).unwrap();
        let Command::Rate(rate) = args.command() else {
            panic!("expected rate");
        };
        assert_eq!(rate.date(), None);
        assert_eq!(rate.from(), "EUR");
        assert_eq!(args.common().log_level(), LevelFilter::INFO);
    }
}
