use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::config::Config;
use crate::feed::PayloadSource;
use crate::model::{decode_payload, FetchedPayload};

/// Fetches the payload with a single GET per cycle. No retries.
pub struct HttpSource {
    client: Client,
    url: Url,
}

impl HttpSource {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("invalid data url: {}", url))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(anyhow!("unsupported scheme for data url: {}", url));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self { client, url })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(&cfg.endpoint_url(), cfg.http_timeout())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }
}

#[async_trait]
impl PayloadSource for HttpSource {
    async fn fetch(&self) -> Result<FetchedPayload> {
        let resp = self
            .client
            .get(self.url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .with_context(|| format!("GET {} failed", self.url))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("GET {} returned {}", self.url, status));
        }

        let body = resp
            .bytes()
            .await
            .with_context(|| format!("reading body from {} failed", self.url))?;
        decode_payload(&body)
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_urls() {
        assert!(HttpSource::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpSource::new("ftp://host/api/data", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn test_from_config_joins_endpoint() {
        let cfg = Config::default();
        let source = HttpSource::from_config(&cfg).unwrap();
        assert_eq!(source.url(), "http://127.0.0.1:8000/api/data");
        assert_eq!(source.describe(), "http://127.0.0.1:8000/api/data");
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        // port 9 (discard) is closed on test machines; connect fails fast
        let source = HttpSource::new("http://127.0.0.1:9/api/data", Duration::from_secs(2)).unwrap();
        assert!(source.fetch().await.is_err());
    }
}
