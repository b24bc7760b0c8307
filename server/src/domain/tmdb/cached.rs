//! Read-through cache in front of the upstream catalog
//!
//! Every call computes a deterministic key, serves a cached document when one
//! exists and otherwise fetches upstream and stores the result with a
//! per-kind TTL and tags. Upstream errors pass through and are never cached.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::client::TmdbApi;
use super::error::TmdbError;
use super::keys::{self, tags};
use super::types::{DetailsOptions, DiscoverKind, DiscoverOptions, MediaType, TimeWindow};
use crate::core::constants::{
    CACHE_TTL_DETAILS, CACHE_TTL_DISCOVER, CACHE_TTL_KEYWORD, CACHE_TTL_SEARCH, CACHE_TTL_SEASON,
    CACHE_TTL_TRENDING, TMDB_CACHE_PREFIX,
};
use crate::data::cache::CacheManager;

/// Groups of cached documents to drop in one call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationTargets {
    pub movie_ids: Vec<u64>,
    pub tv_ids: Vec<u64>,
    pub trending: bool,
    pub discover: bool,
    pub search: bool,
    /// Raw tags such as `trending:movie`
    pub tags: Vec<String>,
}

impl InvalidationTargets {
    /// Distinct tags covering every target
    pub fn to_tags(&self) -> Vec<String> {
        let mut all: Vec<String> = self.tags.clone();
        all.extend(self.movie_ids.iter().map(|id| tags::movie_id(*id)));
        for id in &self.tv_ids {
            all.push(tags::tv_id(*id));
            all.push(tags::tv_seasons(*id));
        }
        if self.trending {
            all.push(tags::TRENDING.to_string());
        }
        if self.discover {
            all.push(tags::DISCOVER.to_string());
        }
        if self.search {
            all.push(tags::SEARCH.to_string());
        }
        all.sort();
        all.dedup();
        all
    }

    pub fn is_empty(&self) -> bool {
        self.to_tags().is_empty()
    }
}

/// Cached view of a [`TmdbApi`] implementation
pub struct CachedTmdb {
    upstream: Arc<dyn TmdbApi>,
    cache: Arc<CacheManager>,
}

impl CachedTmdb {
    pub fn new(upstream: Arc<dyn TmdbApi>, cache: Arc<CacheManager>) -> Self {
        Self { upstream, cache }
    }

    async fn read_through<F, Fut>(
        &self,
        key: String,
        ttl_secs: u64,
        tags: Vec<String>,
        fetch: F,
    ) -> Result<Value, TmdbError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<Value, TmdbError>> + Send,
    {
        if let Some(hit) = self.cache.get::<Value>(&key, Some(TMDB_CACHE_PREFIX)).await {
            tracing::debug!(%key, "TMDB cache hit");
            return Ok(hit);
        }

        let value = fetch().await?;
        if !self
            .cache
            .set(&key, &value, Some(ttl_secs), Some(TMDB_CACHE_PREFIX), &tags)
            .await
        {
            tracing::debug!(%key, "TMDB response not cached");
        }
        Ok(value)
    }

    /// Drop the details of one movie, whatever sections were appended
    pub async fn invalidate_movie_cache(&self, id: u64) -> u64 {
        self.cache.invalidate_tags(&[tags::movie_id(id)]).await
    }

    /// Drop the details and every season of one TV show
    pub async fn invalidate_tv_cache(&self, id: u64) -> u64 {
        self.cache
            .invalidate_tags(&[tags::tv_id(id), tags::tv_seasons(id)])
            .await
    }

    pub async fn invalidate_trending_cache(&self) -> u64 {
        self.cache.invalidate_tag(tags::TRENDING).await
    }

    pub async fn invalidate_discover_cache(&self) -> u64 {
        self.cache.invalidate_tag(tags::DISCOVER).await
    }

    /// Drop multi and keyword search results
    pub async fn invalidate_search_cache(&self) -> u64 {
        self.cache.invalidate_tag(tags::SEARCH).await
    }

    /// Drop everything named by `targets`; returns the number of keys processed
    pub async fn invalidate(&self, targets: &InvalidationTargets) -> u64 {
        let tags = targets.to_tags();
        let count = self.cache.invalidate_tags(&tags).await;
        tracing::info!(?tags, count, "Invalidated TMDB cache");
        count
    }
}

#[async_trait]
impl TmdbApi for CachedTmdb {
    async fn get_trending(
        &self,
        media_type: MediaType,
        time_window: TimeWindow,
    ) -> Result<Value, TmdbError> {
        self.read_through(
            keys::trending(media_type, time_window),
            CACHE_TTL_TRENDING,
            tags::trending(media_type),
            || self.upstream.get_trending(media_type, time_window),
        )
        .await
    }

    async fn search_multi(&self, query: &str, page: u32) -> Result<Value, TmdbError> {
        self.read_through(
            keys::search(query, page),
            CACHE_TTL_SEARCH,
            tags::search(),
            || self.upstream.search_multi(query, page),
        )
        .await
    }

    async fn get_movie_details(
        &self,
        id: u64,
        options: &DetailsOptions,
    ) -> Result<Value, TmdbError> {
        self.read_through(
            keys::movie(id, options),
            CACHE_TTL_DETAILS,
            tags::movie(id),
            || self.upstream.get_movie_details(id, options),
        )
        .await
    }

    async fn get_tv_details(&self, id: u64, options: &DetailsOptions) -> Result<Value, TmdbError> {
        self.read_through(
            keys::tv(id, options),
            CACHE_TTL_DETAILS,
            tags::tv(id),
            || self.upstream.get_tv_details(id, options),
        )
        .await
    }

    async fn get_tv_season(&self, id: u64, season_number: u32) -> Result<Value, TmdbError> {
        self.read_through(
            keys::tv_season(id, season_number),
            CACHE_TTL_SEASON,
            tags::tv_season(id),
            || self.upstream.get_tv_season(id, season_number),
        )
        .await
    }

    async fn discover_movies(&self, options: &DiscoverOptions) -> Result<Value, TmdbError> {
        self.read_through(
            keys::discover(DiscoverKind::Movies, options),
            CACHE_TTL_DISCOVER,
            tags::discover(DiscoverKind::Movies),
            || self.upstream.discover_movies(options),
        )
        .await
    }

    async fn discover_tv_shows(&self, options: &DiscoverOptions) -> Result<Value, TmdbError> {
        self.read_through(
            keys::discover(DiscoverKind::Tv, options),
            CACHE_TTL_DISCOVER,
            tags::discover(DiscoverKind::Tv),
            || self.upstream.discover_tv_shows(options),
        )
        .await
    }

    async fn search_keyword(&self, query: &str) -> Result<Value, TmdbError> {
        self.read_through(
            keys::keyword(query),
            CACHE_TTL_KEYWORD,
            tags::keyword(),
            || self.upstream.search_keyword(query),
        )
        .await
    }
}
