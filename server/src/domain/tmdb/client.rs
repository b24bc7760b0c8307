//! Upstream catalog API
//!
//! [`TmdbApi`] is the seam the cache wraps. [`TmdbClient`] is the HTTP
//! implementation: plain GETs against the v3 API with bearer or API-key auth
//! and bounded retries on transient failures.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;

use super::error::TmdbError;
use super::types::{DetailsOptions, DiscoverKind, DiscoverOptions, MediaType, TimeWindow};
use crate::core::config::TmdbConfig;
use crate::core::constants::{TMDB_RETRY_ATTEMPTS, TMDB_RETRY_BASE_DELAY_MS};
use crate::utils::retry::retry_with_backoff;

/// Catalog calls, each returning the upstream JSON document
#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn get_trending(
        &self,
        media_type: MediaType,
        time_window: TimeWindow,
    ) -> Result<Value, TmdbError>;

    async fn search_multi(&self, query: &str, page: u32) -> Result<Value, TmdbError>;

    async fn get_movie_details(&self, id: u64, options: &DetailsOptions)
    -> Result<Value, TmdbError>;

    async fn get_tv_details(&self, id: u64, options: &DetailsOptions) -> Result<Value, TmdbError>;

    async fn get_tv_season(&self, id: u64, season_number: u32) -> Result<Value, TmdbError>;

    async fn discover_movies(&self, options: &DiscoverOptions) -> Result<Value, TmdbError>;

    async fn discover_tv_shows(&self, options: &DiscoverOptions) -> Result<Value, TmdbError>;

    async fn search_keyword(&self, query: &str) -> Result<Value, TmdbError>;
}

/// HTTP client for the TMDB v3 API
#[derive(Debug)]
pub struct TmdbClient {
    client: reqwest::Client,
    base_url: String,
    /// Sent as `api_key` when no access token is configured
    api_key: Option<String>,
}

impl TmdbClient {
    /// Build a client; the v4 access token wins over the v3 API key
    pub fn new(config: &TmdbConfig) -> Result<Self, TmdbError> {
        let mut headers = HeaderMap::new();
        let api_key = match (&config.access_token, &config.api_key) {
            (Some(token), _) => {
                let value = HeaderValue::from_str(&format!("Bearer {token}"))
                    .map_err(|e| TmdbError::invalid(format!("invalid access token: {e}")))?;
                headers.insert(AUTHORIZATION, value);
                None
            }
            (None, Some(key)) => Some(key.clone()),
            (None, None) => return Err(TmdbError::NotConfigured),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()?;

        tracing::debug!(base_url = %config.base_url, "TMDB client initialized");
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key,
        })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Url, TmdbError> {
        let mut url = reqwest::Url::parse(&format!("{}{path}", self.base_url))
            .map_err(|e| TmdbError::invalid(format!("invalid request URL for {path}: {e}")))?;
        let params: Vec<(&str, &str)> = query
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .chain(self.api_key.as_deref().map(|key| ("api_key", key)))
            .collect();
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    async fn fetch_once(&self, path: &str, query: &[(&str, String)]) -> Result<Value, TmdbError> {
        let url = self.url(path, query)?;
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(TmdbError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            return Err(TmdbError::Status {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        resp.json::<Value>()
            .await
            .map_err(|e| TmdbError::Decode(e.to_string()))
    }

    async fn fetch(&self, path: &str, query: &[(&str, String)]) -> Result<Value, TmdbError> {
        tracing::debug!(path, "TMDB request");
        retry_with_backoff(
            TMDB_RETRY_ATTEMPTS,
            TMDB_RETRY_BASE_DELAY_MS,
            TmdbError::is_transient,
            || self.fetch_once(path, query),
        )
        .await
    }

    async fn details(
        &self,
        path: String,
        options: &DetailsOptions,
    ) -> Result<Value, TmdbError> {
        let query = if options.is_empty() {
            Vec::new()
        } else {
            vec![("append_to_response", options.normalized())]
        };
        self.fetch(&path, &query).await
    }

    async fn discover(
        &self,
        kind: DiscoverKind,
        options: &DiscoverOptions,
    ) -> Result<Value, TmdbError> {
        let query: Vec<(&str, String)> = options
            .iter()
            .map(|(name, value)| (name, value.to_string()))
            .collect();
        self.fetch(&format!("/discover/{}", kind.path_segment()), &query)
            .await
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn get_trending(
        &self,
        media_type: MediaType,
        time_window: TimeWindow,
    ) -> Result<Value, TmdbError> {
        self.fetch(&format!("/trending/{media_type}/{time_window}"), &[])
            .await
    }

    async fn search_multi(&self, query: &str, page: u32) -> Result<Value, TmdbError> {
        self.fetch(
            "/search/multi",
            &[("query", query.to_string()), ("page", page.to_string())],
        )
        .await
    }

    async fn get_movie_details(
        &self,
        id: u64,
        options: &DetailsOptions,
    ) -> Result<Value, TmdbError> {
        self.details(format!("/movie/{id}"), options).await
    }

    async fn get_tv_details(&self, id: u64, options: &DetailsOptions) -> Result<Value, TmdbError> {
        self.details(format!("/tv/{id}"), options).await
    }

    async fn get_tv_season(&self, id: u64, season_number: u32) -> Result<Value, TmdbError> {
        self.fetch(&format!("/tv/{id}/season/{season_number}"), &[])
            .await
    }

    async fn discover_movies(&self, options: &DiscoverOptions) -> Result<Value, TmdbError> {
        self.discover(DiscoverKind::Movies, options).await
    }

    async fn discover_tv_shows(&self, options: &DiscoverOptions) -> Result<Value, TmdbError> {
        self.discover(DiscoverKind::Tv, options).await
    }

    async fn search_keyword(&self, query: &str) -> Result<Value, TmdbError> {
        self.fetch("/search/keyword", &[("query", query.to_string())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>, access_token: Option<&str>) -> TmdbConfig {
        TmdbConfig {
            api_key: api_key.map(str::to_string),
            access_token: access_token.map(str::to_string),
            base_url: "https://api.themoviedb.org/3".to_string(),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_requires_credentials() {
        assert!(matches!(
            TmdbClient::new(&config(None, None)),
            Err(TmdbError::NotConfigured)
        ));
    }

    #[test]
    fn test_api_key_goes_in_query() {
        let client = TmdbClient::new(&config(Some("abc123"), None)).unwrap();
        let url = client
            .url("/search/multi", &[("query", "star wars".to_string())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.themoviedb.org/3/search/multi?query=star+wars&api_key=abc123"
        );
    }

    #[test]
    fn test_access_token_skips_api_key() {
        let client = TmdbClient::new(&config(Some("abc123"), Some("token"))).unwrap();
        let url = client.url("/movie/550", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.themoviedb.org/3/movie/550");
    }

    #[test]
    fn test_rejects_unprintable_token() {
        let result = TmdbClient::new(&config(None, Some("bad\ntoken")));
        assert!(matches!(result, Err(TmdbError::InvalidArgument(_))));
    }
}
