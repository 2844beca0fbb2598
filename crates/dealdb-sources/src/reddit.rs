//! Reddit `top` listing client.

use std::time::Duration;

use dealdb_core::SourcePost;
use reqwest::{Client, Url};

use crate::error::SourceError;
use crate::listing::{to_post, Listing};

const DEFAULT_BASE_URL: &str = "https://www.reddit.com";

/// Client for public subreddit listings.
///
/// Use [`RedditClient::new`] for production or
/// [`RedditClient::with_base_url`] to point at a mock server in tests.
pub struct RedditClient {
    client: Client,
    base_url: Url,
}

impl RedditClient {
    /// Creates a client pointed at `www.reddit.com`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(user_agent: &str, timeout_secs: u64) -> Result<Self, SourceError> {
        Self::with_base_url(user_agent, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`SourceError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        user_agent: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, SourceError> {
        // Reddit rejects requests with generic or missing User-Agents.
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| SourceError::InvalidBaseUrl {
            base_url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self { client, base_url })
    }

    /// Fetches up to `limit` top-ranked posts of `source` for `period`.
    ///
    /// Children that lack an id or permalink are dropped; everything else is
    /// returned in listing order, including posts with empty bodies (the
    /// ingestion stage decides what to keep).
    ///
    /// # Errors
    ///
    /// - [`SourceError::Status`] on any non-2xx response.
    /// - [`SourceError::Http`] on network failure.
    /// - [`SourceError::Deserialize`] if the body is not a listing.
    pub async fn fetch_top(
        &self,
        source: &str,
        limit: u32,
        period: &str,
    ) -> Result<Vec<SourcePost>, SourceError> {
        let url = self.top_url(source, limit, period)?;

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let listing: Listing =
            serde_json::from_str(&body).map_err(|e| SourceError::Deserialize {
                context: format!("top listing for r/{source}"),
                source: e,
            })?;

        let posts: Vec<SourcePost> = listing
            .data
            .children
            .into_iter()
            .filter_map(|child| to_post(child.data))
            .collect();

        tracing::debug!(source, count = posts.len(), "fetched top posts");
        Ok(posts)
    }

    fn top_url(&self, source: &str, limit: u32, period: &str) -> Result<Url, SourceError> {
        let mut url = self
            .base_url
            .join(&format!("r/{source}/top.json"))
            .map_err(|e| SourceError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        // `raw_json=1` keeps `&` in media URLs unescaped.
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string())
            .append_pair("t", period)
            .append_pair("raw_json", "1");
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_url_encodes_source_limit_and_period() {
        let client = RedditClient::with_base_url("ua", 5, "https://example.test/").unwrap();
        let url = client.top_url("SaaS", 10, "day").unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.test/r/SaaS/top.json?limit=10&t=day&raw_json=1"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = RedditClient::with_base_url("ua", 5, "not a url");
        assert!(matches!(result, Err(SourceError::InvalidBaseUrl { .. })));
    }
}
