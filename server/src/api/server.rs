//! API server initialization

use std::net::SocketAddr;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::middleware;
use super::rate_limit::{RateLimitState, rate_limit_middleware};
use super::routes::{cache, catalog, health};
use crate::core::CoreApp;
use crate::core::constants::DEFAULT_BODY_LIMIT;
use crate::data::RateLimiter;

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Serve until shutdown is triggered; returns the app for teardown
    pub async fn start(self) -> Result<CoreApp> {
        let app = self.app;

        let shutdown = app.shutdown.clone();
        let addr = SocketAddr::new(app.config.server.host.parse()?, app.config.server.port);

        let router = build_router(&app);

        let listener = TcpListener::bind(addr).await?;
        tracing::info!(%addr, "Listening");

        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.wait())
        .await?;

        Ok(app)
    }
}

/// Assemble every route with its rate limit budget and the shared layers
pub fn build_router(app: &CoreApp) -> Router {
    let rate_limit_enabled = app.config.rate_limit.enabled;

    // Wrap a router in the given limiter when rate limiting is on
    let limited = |routes: Router, limiter: &RateLimiter| {
        if rate_limit_enabled {
            routes.layer(axum::middleware::from_fn_with_state(
                RateLimitState {
                    limiter: limiter.clone(),
                },
                rate_limit_middleware,
            ))
        } else {
            routes
        }
    };

    let search_routes = limited(
        catalog::search_routes(app.tmdb.clone()),
        &app.rate_limiters.search,
    );
    let discover_routes = limited(
        catalog::discover_routes(app.tmdb.clone()),
        &app.rate_limiters.discover,
    );

    let router = Router::new()
        .route("/api/v1/health", get(health::health))
        .with_state(app.store.clone())
        .merge(catalog::routes(app.tmdb.clone()))
        .merge(search_routes)
        .merge(discover_routes);

    let router = match app.config.admin.token.as_deref() {
        Some(token) => router.merge(cache::routes(app.tmdb.clone(), token)),
        None => {
            tracing::debug!("Admin token not set, cache invalidation endpoint disabled");
            router
        }
    };

    router
        .fallback(middleware::handle_404)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(middleware::cors(&app.config.server.allowed_origins))
        .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT))
}
