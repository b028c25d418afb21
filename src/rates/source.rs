use anyhow::{bail, Context};
use reqwest::StatusCode;
use tracing::trace;
use url::Url;

/// Where published exchange rates come from.
#[async_trait::async_trait]
pub trait RateSource: Send + Sync {
    /// Fetches the daily USD -> `currency` rates for a month, first day first. Returns `Ok(None)`
    /// when the source has nothing for that month.
    async fn fetch(&self, year: i32, month: u32, currency: &str)
        -> anyhow::Result<Option<Vec<f64>>>;
}

/// A `RateSource` that reads JSON arrays of numbers over HTTP from
/// `{base}/{currency}/{year}-{month}.json`.
#[derive(Debug, Clone)]
pub struct HttpRateSource {
    base: Url,
    client: reqwest::Client,
}

impl HttpRateSource {
    pub fn new(base: &str) -> anyhow::Result<Self> {
        // `Url::join` replaces the last path segment unless the base ends with a slash.
        let base = if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{base}/")
        };
        let base = Url::parse(&base).with_context(|| format!("Invalid rate source URL '{base}'"))?;
        Ok(Self {
            base,
            client: reqwest::Client::new(),
        })
    }

    fn url(&self, year: i32, month: u32, currency: &str) -> anyhow::Result<Url> {
        self.base
            .join(&format!("{currency}/{year}-{month:02}.json"))
            .context("Unable to build rate table URL")
    }
}

#[async_trait::async_trait]
impl RateSource for HttpRateSource {
    async fn fetch(
        &self,
        year: i32,
        month: u32,
        currency: &str,
    ) -> anyhow::Result<Option<Vec<f64>>> {
        let url = self.url(year, month, currency)?;
        trace!("GET {url}");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to send rate request to {url}"))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response body".to_string());
            bail!("Rate request to {url} failed with status {status}: {body}");
        }

        let rates: Vec<f64> = response
            .json()
            .await
            .with_context(|| format!("Failed to parse rate table from {url}"))?;
        Ok(Some(rates))
    }
}
