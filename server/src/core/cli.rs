use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::StoreBackendType;
use super::constants::{
    ENV_ADMIN_TOKEN, ENV_ALLOWED_ORIGINS, ENV_CONFIG, ENV_HOST, ENV_PORT,
    ENV_RATE_LIMIT_DISCOVER_MAX, ENV_RATE_LIMIT_ENABLED, ENV_RATE_LIMIT_LISTS_MAX,
    ENV_RATE_LIMIT_SEARCH_MAX, ENV_RATE_LIMIT_WINDOW_MS, ENV_STORE_BACKEND, ENV_STORE_TOKEN,
    ENV_STORE_URL, ENV_TMDB_ACCESS_TOKEN, ENV_TMDB_API_KEY, ENV_TMDB_BASE_URL,
};

#[derive(Parser)]
#[command(name = "cinestash")]
#[command(version, about = "Movie and TV catalog server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Allowed CORS origins
    #[arg(long, global = true, env = ENV_ALLOWED_ORIGINS, value_delimiter = ',')]
    pub allowed_origins: Option<Vec<String>>,

    // Store options
    /// Key-value store backend (redis, memory or disabled)
    #[arg(long, global = true, env = ENV_STORE_BACKEND, value_parser = parse_store_backend)]
    pub store_backend: Option<StoreBackendType>,

    /// Key-value store URL. Formats: redis://host:port/db, rediss://host:port/db
    #[arg(long, global = true, env = ENV_STORE_URL)]
    pub store_url: Option<String>,

    /// Key-value store token (used as the connection password)
    #[arg(long, global = true, env = ENV_STORE_TOKEN, hide_env_values = true)]
    pub store_token: Option<String>,

    // TMDB options
    /// TMDB v3 API key
    #[arg(long, global = true, env = ENV_TMDB_API_KEY, hide_env_values = true)]
    pub tmdb_api_key: Option<String>,

    /// TMDB v4 read access token
    #[arg(long, global = true, env = ENV_TMDB_ACCESS_TOKEN, hide_env_values = true)]
    pub tmdb_access_token: Option<String>,

    /// TMDB API base URL
    #[arg(long, global = true, env = ENV_TMDB_BASE_URL)]
    pub tmdb_base_url: Option<String>,

    // Rate limit options
    /// Enable or disable rate limiting
    #[arg(long, global = true, env = ENV_RATE_LIMIT_ENABLED)]
    pub rate_limit_enabled: Option<bool>,

    /// Rate limit window in milliseconds (applies to every endpoint family)
    #[arg(long, global = true, env = ENV_RATE_LIMIT_WINDOW_MS)]
    pub rate_limit_window_ms: Option<u64>,

    /// Search requests allowed per window
    #[arg(long, global = true, env = ENV_RATE_LIMIT_SEARCH_MAX)]
    pub rate_limit_search_max: Option<u32>,

    /// Discover requests allowed per window
    #[arg(long, global = true, env = ENV_RATE_LIMIT_DISCOVER_MAX)]
    pub rate_limit_discover_max: Option<u32>,

    /// List mutations allowed per window
    #[arg(long, global = true, env = ENV_RATE_LIMIT_LISTS_MAX)]
    pub rate_limit_lists_max: Option<u32>,

    /// Bearer token for the cache invalidation endpoint (endpoint disabled when unset)
    #[arg(long, global = true, env = ENV_ADMIN_TOKEN, hide_env_values = true)]
    pub admin_token: Option<String>,
}

/// Parse store backend from CLI/env string
fn parse_store_backend(s: &str) -> Result<StoreBackendType, String> {
    match s.to_lowercase().as_str() {
        "redis" | "valkey" | "upstash" => Ok(StoreBackendType::Redis),
        "memory" => Ok(StoreBackendType::Memory),
        "disabled" | "none" | "off" => Ok(StoreBackendType::Disabled),
        _ => Err(format!(
            "Invalid store backend '{}'. Valid options: redis, memory, disabled",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// Cache maintenance commands
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum CacheCommands {
    /// Invalidate cached catalog entries by tag or entity
    Invalidate {
        /// Raw tag to invalidate (repeatable), e.g. `movie:550`
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Movie id to invalidate (repeatable)
        #[arg(long = "movie")]
        movies: Vec<u64>,
        /// TV show id to invalidate, including its seasons (repeatable)
        #[arg(long = "tv")]
        tv_shows: Vec<u64>,
        /// Invalidate all trending lists
        #[arg(long)]
        trending: bool,
        /// Invalidate all discover results
        #[arg(long)]
        discover: bool,
        /// Invalidate all search results
        #[arg(long)]
        search: bool,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub allowed_origins: Option<Vec<String>>,
    pub store_backend: Option<StoreBackendType>,
    pub store_url: Option<String>,
    pub store_token: Option<String>,
    pub tmdb_api_key: Option<String>,
    pub tmdb_access_token: Option<String>,
    pub tmdb_base_url: Option<String>,
    pub rate_limit_enabled: Option<bool>,
    pub rate_limit_window_ms: Option<u64>,
    pub rate_limit_search_max: Option<u32>,
    pub rate_limit_discover_max: Option<u32>,
    pub rate_limit_lists_max: Option<u32>,
    pub admin_token: Option<String>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        config: cli.config,
        allowed_origins: cli.allowed_origins,
        store_backend: cli.store_backend,
        store_url: cli.store_url,
        store_token: cli.store_token,
        tmdb_api_key: cli.tmdb_api_key,
        tmdb_access_token: cli.tmdb_access_token,
        tmdb_base_url: cli.tmdb_base_url,
        rate_limit_enabled: cli.rate_limit_enabled,
        rate_limit_window_ms: cli.rate_limit_window_ms,
        rate_limit_search_max: cli.rate_limit_search_max,
        rate_limit_discover_max: cli.rate_limit_discover_max,
        rate_limit_lists_max: cli.rate_limit_lists_max,
        admin_token: cli.admin_token,
    };
    (config, cli.command)
}
