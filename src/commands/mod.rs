//! Command handlers for the lens CLI.
//!
//! This module contains implementations for all CLI subcommands. Report commands share a
//! `Session`: the loaded store and a rate cache built from the configuration.

mod init;
mod rate;
mod report;
mod usage;

use crate::args::FilterArgs;
use crate::interval::Span;
use crate::model::{Filter, Selection};
use crate::persistence::{load_store, JsonStorage};
use crate::predicate::{CompiledPredicate, Predicate};
use crate::rates::{HttpRateSource, JsonRateStore, RateCache, SystemClock};
use crate::store::Store;
use crate::{Config, Result};
use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Debug;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info};

pub use init::init;
pub use rate::rate;
pub use report::{balances, matrix, totals};
pub use usage::usage;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

impl Out<Table> {
    /// Prints the message like `print` and writes the table as CSV to `w`.
    pub fn print_csv(&self, w: impl Write) -> Result<()> {
        self.print();
        if let Some(table) = self.structure() {
            table.write_csv(w)?;
        }
        Ok(())
    }
}

/// Tabular command output.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.headers.len(), "row width must match the headers");
        self.rows.push(row);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn write_csv(&self, w: impl Write) -> Result<()> {
        let mut writer = csv::Writer::from_writer(w);
        writer
            .write_record(&self.headers)
            .context("Unable to write CSV headers")?;
        for row in &self.rows {
            writer.write_record(row).context("Unable to write CSV row")?;
        }
        writer.flush().context("Unable to flush CSV output")?;
        Ok(())
    }
}

/// Everything report commands work with: the configuration, the loaded store and a rate cache.
pub struct Session {
    config: Config,
    store: Store,
    rates: Arc<RateCache>,
}

impl Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("root", &self.config.root())
            .field("store", &self.store)
            .field("rates", &self.rates)
            .finish()
    }
}

impl Session {
    /// Loads the data file and sets up the rate cache described by `config`.
    pub async fn open(config: Config) -> Result<Self> {
        let storage = JsonStorage::open(config.data_path())
            .await
            .context("Unable to open the data file")?;
        let store = load_store(&storage).await?;
        let source = HttpRateSource::new(config.rate_source_url())?;
        let rate_store = JsonRateStore::new(config.rates_dir()).await?;
        let rates = RateCache::new(Arc::new(source), Arc::new(rate_store), Arc::new(SystemClock))
            .with_stale_after(config.stale_after());
        Ok(Self::new(config, store, Arc::new(rates)))
    }

    pub fn new(config: Config, store: Store, rates: Arc<RateCache>) -> Self {
        Self {
            config,
            store,
            rates,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn rates(&self) -> &Arc<RateCache> {
        &self.rates
    }

    pub fn master_currency(&self) -> &str {
        self.config.master_currency()
    }

    pub fn today(&self) -> NaiveDate {
        self.rates.clock().today()
    }

    /// Resolves the names in `args` against the store and compiles the resulting filter,
    /// restricted further by `base`.
    pub fn predicate(&self, args: &FilterArgs, base: Option<Predicate>) -> Result<CompiledPredicate> {
        let filter = self.filter(args)?;
        let predicate = match base {
            Some(base) => Predicate::and([Predicate::filter(&filter), base]),
            None => Predicate::filter(&filter),
        };
        debug!("Compiling {predicate:?}");
        predicate.compile(&self.store)
    }

    fn filter(&self, args: &FilterArgs) -> Result<Filter> {
        let category_ids = |names: &[String]| -> Result<Vec<String>> {
            names
                .iter()
                .map(|name| -> Result<String> {
                    match name.as_str() {
                        "" => Ok(String::new()),
                        name => Ok(self.store.category_by_name(name)?.id.clone()),
                    }
                })
                .collect()
        };
        let account_ids = |names: &[String]| -> Result<Vec<String>> {
            names
                .iter()
                .map(|name| -> Result<String> {
                    Ok(self.store.account_by_name(name)?.id.clone())
                })
                .collect()
        };
        Ok(Filter {
            search: String::new(),
            op_type: Selection::selected(args.op_types().to_vec()),
            categories: selection(
                category_ids(args.category())?,
                category_ids(args.not_category())?,
            ),
            accounts: selection(
                account_ids(args.account())?,
                account_ids(args.not_account())?,
            ),
            tags: selection(args.tag().to_vec(), args.not_tag().to_vec()),
        })
    }
}

fn selection<T>(selected: Vec<T>, excluded: Vec<T>) -> Selection<T> {
    if excluded.is_empty() {
        Selection::selected(selected)
    } else {
        Selection::exclude(excluded)
    }
}

/// Money as printed in reports: at most two decimals, no trailing zeros.
fn money(amount: Decimal) -> String {
    amount.round_dp(2).normalize().to_string()
}

fn span(from: NaiveDate, to: NaiveDate) -> Result<Span> {
    if to < from {
        let e = anyhow::anyhow!("The range ends ({to}) before it starts ({from})");
        return Err(e.into());
    }
    Ok(Span::new(from, to))
}
