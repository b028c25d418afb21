use crate::commands::Out;
use crate::model::Snapshot;
use crate::rates::HttpRateSource;
use crate::{utils, Config, Result};
use anyhow::Context;
use std::path::Path;
use tracing::debug;

/// Creates the home directory, its rate cache directory and:
/// - Creates an initial `config.json` file pointing at `rate_source_url` along with default
///   settings
/// - Writes an empty data file if none is present yet.
///
/// # Arguments
/// - `home` - The directory that will be the root of the home directory, e.g. `$HOME/ledger-lens`
/// - `rate_source_url` - The base URL daily exchange rates are fetched from.
///
/// # Errors
/// - Returns an error if the URL is not usable or if any file operations fail.
pub async fn init(home: &Path, rate_source_url: &str) -> Result<Out<()>> {
    HttpRateSource::new(rate_source_url).context("The rate source URL is not usable")?;
    let config = Config::create(home, rate_source_url)
        .await
        .context("Unable to create the home directory and configs")?;

    let data_path = config.data_path();
    let exists = tokio::fs::try_exists(&data_path)
        .await
        .with_context(|| format!("Unable to check for {}", data_path.display()))?;
    if !exists {
        debug!("Writing an empty data file to {}", data_path.display());
        utils::serialize(&data_path, &Snapshot::default()).await?;
    }

    Ok(format!(
        "Successfully created the ledger-lens directory at {}",
        config.root().display()
    )
    .into())
}
