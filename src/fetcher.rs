use reqwest::{header, redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::FetchConfig;

/// A page that answered, whatever its status.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub final_url: Url,
    /// Every hop before `final_url`, in request order.
    pub history: Vec<Url>,
    pub body: String,
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("redirect without usable Location header from {0}")]
    BadRedirect(Url),

    #[error("more than {0} redirects")]
    TooManyRedirects(usize),
}

/// Single-attempt HTTP GET that reports failure as `None`.
pub struct SafeFetcher {
    client: Client,
    timeout: Duration,
    max_redirects: usize,
    max_body_bytes: usize,
}

impl SafeFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(true)
            .redirect(Policy::none())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            timeout: config.timeout(),
            max_redirects: config.max_redirects,
            max_body_bytes: config.max_body_bytes,
        })
    }

    pub async fn fetch(&self, url: &Url) -> Option<FetchedPage> {
        match self.try_fetch(url).await {
            Ok(page) => {
                debug!(
                    "Fetched {} -> {} (status {}, {} redirects, {} bytes)",
                    url,
                    page.final_url,
                    page.status,
                    page.history.len(),
                    page.body.len()
                );
                Some(page)
            }
            Err(e) => {
                debug!("Fetch of {} failed: {}", url, e);
                metrics::counter!("lookup_failures_total", "lookup" => "fetch").increment(1);
                None
            }
        }
    }

    pub async fn try_fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
        }

        tokio::time::timeout(self.timeout, self.follow(url.clone()))
            .await
            .map_err(|_| FetchError::Timeout(self.timeout))?
    }

    async fn follow(&self, mut current: Url) -> Result<FetchedPage, FetchError> {
        let mut history = Vec::new();

        loop {
            let mut response = self.client.get(current.clone()).send().await?;
            let status = response.status();

            if status.is_redirection() {
                if let Some(location) = response.headers().get(header::LOCATION) {
                    let next = location
                        .to_str()
                        .ok()
                        .and_then(|loc| current.join(loc).ok())
                        .ok_or_else(|| FetchError::BadRedirect(current.clone()))?;

                    if history.len() >= self.max_redirects {
                        return Err(FetchError::TooManyRedirects(self.max_redirects));
                    }
                    history.push(std::mem::replace(&mut current, next));
                    continue;
                }
            }

            let mut body = Vec::new();
            while let Some(chunk) = response.chunk().await? {
                let room = self.max_body_bytes.saturating_sub(body.len());
                body.extend_from_slice(&chunk[..chunk.len().min(room)]);
                if body.len() >= self.max_body_bytes {
                    break;
                }
            }

            return Ok(FetchedPage {
                status: status.as_u16(),
                final_url: current,
                history,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
    }
}
