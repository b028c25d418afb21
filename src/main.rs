use clap::Parser;
use ledger_lens::args::{Args, Command};
use ledger_lens::commands::{self, Session};
use ledger_lens::{Config, Result};
use std::process::ExitCode;
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().home().path();

    if let Command::Init(init_args) = args.command() {
        commands::init(home, init_args.rate_source_url())
            .await?
            .print();
        return Ok(());
    }

    let session = Session::open(Config::load(home).await?).await?;
    debug!("Opened {session:?}");

    // Tables go to stdout as CSV; messages and logs go to stderr.
    let out = match args.command() {
        Command::Init(_) => return Ok(()),
        Command::Totals(totals_args) => commands::totals(&session, totals_args).await?,
        Command::Matrix(matrix_args) => commands::matrix(&session, matrix_args).await?,
        Command::Balances(balances_args) => commands::balances(&session, balances_args).await?,
        Command::Usage => commands::usage(&session).await?,
        Command::Rate(rate_args) => commands::rate(&session, rate_args).await?,
    };
    out.print_csv(std::io::stdout().lock())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for this crate only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
