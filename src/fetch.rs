use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use reqwest::header::USER_AGENT;
use reqwest::StatusCode;
use url::Url;

lazy_static! {
    static ref HTTP_CLI: reqwest::Client = reqwest::ClientBuilder::new()
        .gzip(true)
        .deflate(true)
        .build()
        .unwrap();
}

/// A fetched document along with the address it was finally served from.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final address after redirects; link resolution must use this as
    /// base, not the address that was requested.
    pub url: Url,
    pub body: String,
}

/// Ways a fetch can fail. Each failure is contained to its address: the
/// crawl logs it, counts it and moves on.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport { url: Url, source: reqwest::Error },
    #[error("request to {url} timed out")]
    Timeout { url: Url },
    #[error("{url} answered {status}")]
    Status { url: Url, status: StatusCode },
    #[error("reading body of {url} failed: {source}")]
    Body { url: Url, source: reqwest::Error },
}

/// Retrieves documents. Implementations own the transport concerns:
/// redirects, compression, timeouts.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// HTTP fetcher used when no custom [`Fetcher`] is plugged in. Follows
/// redirects and reports the final address in the page it returns.
pub struct HttpFetcher {
    user_agent: String,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Self {
        Self {
            user_agent: user_agent.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let resp = HTTP_CLI
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout { url: url.clone() }
                } else {
                    FetchError::Transport {
                        url: url.clone(),
                        source: e,
                    }
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: resp.url().clone(),
                status,
            });
        }

        let final_url = resp.url().clone();
        let body = resp.text().await.map_err(|source| FetchError::Body {
            url: final_url.clone(),
            source,
        })?;

        Ok(FetchedPage {
            url: final_url,
            body,
        })
    }
}
