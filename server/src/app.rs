//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::core::cli::{self, CacheCommands, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME, APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::{CacheManager, RateLimiters, StoreHandle};
use crate::domain::tmdb::{CachedTmdb, InvalidationTargets, TmdbApi, TmdbClient};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub store: StoreHandle,
    pub rate_limiters: Arc<RateLimiters>,
    pub tmdb: Arc<CachedTmdb>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let app = Self::init(&cli_config).await?;

        match command {
            Some(Commands::Cache { command }) => app.handle_cache_command(command).await,
            Some(Commands::Start) | None => Self::start_server(app).await,
        }
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let store = StoreHandle::connect(&config.store).await;
        tracing::debug!(backend = store.backend_name(), "Store initialized");

        let upstream = TmdbClient::new(&config.tmdb).context("Failed to initialize TMDB client")?;

        Ok(Self::from_parts(config, store, Arc::new(upstream)))
    }

    /// Wire services from an already-resolved config, store and upstream
    pub fn from_parts(config: AppConfig, store: StoreHandle, upstream: Arc<dyn TmdbApi>) -> Self {
        let cache = Arc::new(CacheManager::new(store.clone()));
        let rate_limiters = Arc::new(RateLimiters::new(store.clone(), &config.rate_limit));
        let tmdb = Arc::new(CachedTmdb::new(upstream, cache));

        Self {
            shutdown: ShutdownService::new(),
            config,
            store,
            rate_limiters,
            tmdb,
        }
    }

    async fn handle_cache_command(&self, cmd: CacheCommands) -> Result<()> {
        match cmd {
            CacheCommands::Invalidate {
                tags,
                movies,
                tv_shows,
                trending,
                discover,
                search,
            } => {
                let targets = InvalidationTargets {
                    movie_ids: movies,
                    tv_ids: tv_shows,
                    trending,
                    discover,
                    search,
                    tags,
                };
                if targets.is_empty() {
                    anyhow::bail!(
                        "Nothing to invalidate. Pass --tag, --movie, --tv, --trending, --discover or --search"
                    );
                }
                if !self.store.is_available() {
                    anyhow::bail!(
                        "No key-value store available (backend: {})",
                        self.config.store.backend
                    );
                }

                let invalidated = self.tmdb.invalidate(&targets).await;
                println!("Invalidated {} cached entries", invalidated);
                Ok(())
            }
        }
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        tracing::info!(
            app = APP_NAME,
            version = env!("CARGO_PKG_VERSION"),
            host = %app.config.server.host,
            port = app.config.server.port,
            store = app.store.backend_name(),
            rate_limit = app.config.rate_limit.enabled,
            admin = app.config.admin.token.is_some(),
            "Starting server"
        );

        let server = ApiServer::new(app);
        server.start().await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}
