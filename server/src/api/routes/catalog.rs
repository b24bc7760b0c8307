//! Catalog endpoints backed by the cached TMDB client
//!
//! Search and discover are split into their own routers so the server can
//! put each behind its own rate limit budget.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::api::extractors::{CatalogPath, ValidatedQuery};
use crate::api::types::ApiError;
use crate::domain::tmdb::{
    CachedTmdb, DetailsOptions, DiscoverKind, DiscoverOptions, MediaType, TimeWindow, TmdbApi,
};

/// Upper bound on discover filters per request
const MAX_DISCOVER_OPTIONS: usize = 32;

/// Shared state for catalog endpoints
#[derive(Clone)]
pub struct CatalogApiState {
    pub tmdb: Arc<CachedTmdb>,
}

/// Trending and details routes (not rate limited)
pub fn routes(tmdb: Arc<CachedTmdb>) -> Router<()> {
    Router::new()
        .route(
            "/api/v1/trending/{media_type}/{time_window}",
            get(trending),
        )
        .route("/api/v1/movie/{id}", get(movie_details))
        .route("/api/v1/tv/{id}", get(tv_details))
        .route("/api/v1/tv/{id}/season/{season_number}", get(tv_season))
        .with_state(CatalogApiState { tmdb })
}

/// Multi and keyword search routes
pub fn search_routes(tmdb: Arc<CachedTmdb>) -> Router<()> {
    Router::new()
        .route("/api/v1/search", get(search_multi))
        .route("/api/v1/search/keyword", get(search_keyword))
        .with_state(CatalogApiState { tmdb })
}

/// Discover routes
pub fn discover_routes(tmdb: Arc<CachedTmdb>) -> Router<()> {
    Router::new()
        .route("/api/v1/discover/{kind}", get(discover))
        .with_state(CatalogApiState { tmdb })
}

fn default_page() -> u32 {
    1
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchParams {
    #[validate(length(min = 1, max = 200, message = "query must be 1-200 characters"))]
    pub query: String,
    #[serde(default = "default_page")]
    #[validate(range(min = 1, max = 500, message = "page must be between 1 and 500"))]
    pub page: u32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct KeywordParams {
    #[validate(length(min = 1, max = 200, message = "query must be 1-200 characters"))]
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct DetailsParams {
    pub append_to_response: Option<String>,
}

fn require_query(query: &str) -> Result<(), ApiError> {
    if query.trim().is_empty() {
        return Err(ApiError::bad_request(
            "INVALID_QUERY",
            "query must contain a search term",
        ));
    }
    Ok(())
}

async fn trending(
    State(state): State<CatalogApiState>,
    CatalogPath((media_type, time_window)): CatalogPath<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let media_type: MediaType = media_type.parse()?;
    let time_window: TimeWindow = time_window.parse()?;
    Ok(Json(state.tmdb.get_trending(media_type, time_window).await?))
}

async fn search_multi(
    State(state): State<CatalogApiState>,
    ValidatedQuery(params): ValidatedQuery<SearchParams>,
) -> Result<Json<Value>, ApiError> {
    require_query(&params.query)?;
    Ok(Json(
        state.tmdb.search_multi(&params.query, params.page).await?,
    ))
}

async fn search_keyword(
    State(state): State<CatalogApiState>,
    ValidatedQuery(params): ValidatedQuery<KeywordParams>,
) -> Result<Json<Value>, ApiError> {
    require_query(&params.query)?;
    Ok(Json(state.tmdb.search_keyword(&params.query).await?))
}

async fn movie_details(
    State(state): State<CatalogApiState>,
    CatalogPath(id): CatalogPath<u64>,
    Query(params): Query<DetailsParams>,
) -> Result<Json<Value>, ApiError> {
    let options = DetailsOptions::from_append(params.append_to_response.as_deref());
    Ok(Json(state.tmdb.get_movie_details(id, &options).await?))
}

async fn tv_details(
    State(state): State<CatalogApiState>,
    CatalogPath(id): CatalogPath<u64>,
    Query(params): Query<DetailsParams>,
) -> Result<Json<Value>, ApiError> {
    let options = DetailsOptions::from_append(params.append_to_response.as_deref());
    Ok(Json(state.tmdb.get_tv_details(id, &options).await?))
}

async fn tv_season(
    State(state): State<CatalogApiState>,
    CatalogPath((id, season_number)): CatalogPath<(u64, u32)>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.tmdb.get_tv_season(id, season_number).await?))
}

async fn discover(
    State(state): State<CatalogApiState>,
    CatalogPath(kind): CatalogPath<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<Value>, ApiError> {
    let kind: DiscoverKind = kind.parse()?;
    if params.len() > MAX_DISCOVER_OPTIONS {
        return Err(ApiError::bad_request(
            "TOO_MANY_OPTIONS",
            format!("At most {MAX_DISCOVER_OPTIONS} discover options are allowed"),
        ));
    }
    let options: DiscoverOptions = params.into_iter().collect();
    let result = match kind {
        DiscoverKind::Movies => state.tmdb.discover_movies(&options).await?,
        DiscoverKind::Tv => state.tmdb.discover_tv_shows(&options).await?,
    };
    Ok(Json(result))
}
