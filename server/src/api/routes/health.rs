//! Health check endpoint

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Serialize;

use crate::data::store::StoreHandle;

#[derive(Serialize)]
pub struct StoreStatus {
    pub backend: &'static str,
    pub available: bool,
}

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when a configured store stops answering
    pub status: &'static str,
    pub version: &'static str,
    pub store: StoreStatus,
}

/// Health check endpoint
///
/// Always 200: the catalog keeps serving without a store.
pub async fn health(State(store): State<StoreHandle>) -> impl IntoResponse {
    let (status, available) = match store.health_check().await {
        Ok(available) => ("ok", available),
        Err(e) => {
            tracing::warn!(error = %e, "Store health check failed");
            ("degraded", false)
        }
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            store: StoreStatus {
                backend: store.backend_name(),
                available,
            },
        }),
    )
}
