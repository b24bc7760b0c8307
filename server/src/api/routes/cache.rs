//! Cache administration endpoint
//!
//! Mounted only when an admin token is configured; callers authenticate with
//! `Authorization: Bearer <token>`.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::types::ApiError;
use crate::domain::tmdb::{CachedTmdb, InvalidationTargets};

/// Upper bound on ids or tags per request
const MAX_INVALIDATION_ITEMS: u64 = 500;

#[derive(Clone)]
pub struct CacheAdminState {
    pub tmdb: Arc<CachedTmdb>,
    pub admin_token: Arc<str>,
}

pub fn routes(tmdb: Arc<CachedTmdb>, admin_token: &str) -> Router<()> {
    let state = CacheAdminState {
        tmdb,
        admin_token: Arc::from(admin_token),
    };

    Router::new()
        .route("/api/v1/cache/invalidate", post(invalidate))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct InvalidateRequest {
    #[validate(length(max = MAX_INVALIDATION_ITEMS, message = "too many movie_ids"))]
    pub movie_ids: Vec<u64>,
    #[validate(length(max = MAX_INVALIDATION_ITEMS, message = "too many tv_ids"))]
    pub tv_ids: Vec<u64>,
    pub trending: bool,
    pub discover: bool,
    pub search: bool,
    #[validate(length(max = MAX_INVALIDATION_ITEMS, message = "too many tags"))]
    pub tags: Vec<String>,
}

impl From<InvalidateRequest> for InvalidationTargets {
    fn from(req: InvalidateRequest) -> Self {
        Self {
            movie_ids: req.movie_ids,
            tv_ids: req.tv_ids,
            trending: req.trending,
            discover: req.discover,
            search: req.search,
            tags: req
                .tags
                .into_iter()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InvalidateResponse {
    pub invalidated: u64,
}

fn authorize(headers: &HeaderMap, expected: &str) -> Result<(), ApiError> {
    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();

    if bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(ApiError::unauthorized(
            "INVALID_TOKEN",
            "Missing or invalid admin token",
        ))
    }
}

/// Reject requests without the admin bearer token before the body is read
async fn require_admin(
    State(state): State<CacheAdminState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authorize(request.headers(), &state.admin_token)?;
    Ok(next.run(request).await)
}

async fn invalidate(
    State(state): State<CacheAdminState>,
    ValidatedJson(req): ValidatedJson<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    let targets = InvalidationTargets::from(req);
    if targets.is_empty() {
        return Err(ApiError::bad_request(
            "NOTHING_TO_INVALIDATE",
            "Request names no ids, groups or tags",
        ));
    }

    let invalidated = state.tmdb.invalidate(&targets).await;
    Ok(Json(InvalidateResponse { invalidated }))
}
