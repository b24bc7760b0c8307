// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "Cinestash";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "cinestash";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".cinestash";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "cinestash.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "CINESTASH_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "CINESTASH_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "CINESTASH_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "CINESTASH_LOG";

/// Environment variable for allowed CORS origins (comma separated)
pub const ENV_ALLOWED_ORIGINS: &str = "CINESTASH_ALLOWED_ORIGINS";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 4680;

/// Default allowed origin (the Next.js front end in development)
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Request body limit for the admin API (64KB)
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024;

// =============================================================================
// Environment Variables - Key-Value Store
// =============================================================================

/// Store backend (redis, memory, disabled)
pub const ENV_STORE_BACKEND: &str = "CINESTASH_STORE_BACKEND";

/// Store connection URL (redis://host:port/db, rediss://...)
pub const ENV_STORE_URL: &str = "CINESTASH_STORE_URL";

/// Store credential, injected as the connection password
pub const ENV_STORE_TOKEN: &str = "CINESTASH_STORE_TOKEN";

/// Maximum pooled connections to the store
pub const STORE_POOL_MAX_SIZE: usize = 16;

/// Pool wait/create/recycle timeout in seconds
pub const STORE_POOL_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// Cache
// =============================================================================

/// Prefix applied when a caller does not supply one
pub const CACHE_DEFAULT_PREFIX: &str = "cache";

/// Entry TTL applied when a caller does not supply one
pub const CACHE_DEFAULT_TTL_SECS: u64 = 3600;

/// Extra lifetime given to tag sets beyond the TTL of the entry being tagged
pub const CACHE_TAG_TTL_BUFFER_SECS: u64 = 3600;

/// Key prefix for tag reverse-index sets
pub const CACHE_TAG_PREFIX: &str = "tag";

/// Prefix for all upstream catalog entries
pub const TMDB_CACHE_PREFIX: &str = "tmdb";

pub const CACHE_TTL_TRENDING: u64 = 30 * 60;
pub const CACHE_TTL_DETAILS: u64 = 60 * 60;
pub const CACHE_TTL_SEARCH: u64 = 15 * 60;
pub const CACHE_TTL_DISCOVER: u64 = 30 * 60;
pub const CACHE_TTL_SEASON: u64 = 60 * 60;
pub const CACHE_TTL_KEYWORD: u64 = 15 * 60;

// =============================================================================
// Environment Variables - Rate Limiting
// =============================================================================

pub const ENV_RATE_LIMIT_ENABLED: &str = "CINESTASH_RATE_LIMIT_ENABLED";
pub const ENV_RATE_LIMIT_SEARCH_MAX: &str = "CINESTASH_RATE_LIMIT_SEARCH_MAX";
pub const ENV_RATE_LIMIT_DISCOVER_MAX: &str = "CINESTASH_RATE_LIMIT_DISCOVER_MAX";
pub const ENV_RATE_LIMIT_LISTS_MAX: &str = "CINESTASH_RATE_LIMIT_LISTS_MAX";
pub const ENV_RATE_LIMIT_WINDOW_MS: &str = "CINESTASH_RATE_LIMIT_WINDOW_MS";

/// Default window for every endpoint family
pub const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 60_000;

pub const DEFAULT_RATE_LIMIT_SEARCH_MAX: u32 = 30;
pub const DEFAULT_RATE_LIMIT_DISCOVER_MAX: u32 = 30;
pub const DEFAULT_RATE_LIMIT_LISTS_MAX: u32 = 20;

pub const RATE_LIMIT_PREFIX_SEARCH: &str = "ratelimit:search";
pub const RATE_LIMIT_PREFIX_DISCOVER: &str = "ratelimit:discover";
pub const RATE_LIMIT_PREFIX_LISTS: &str = "ratelimit:lists";

/// Seconds added to the window when setting the expiry of a limiter key
pub const RATE_LIMIT_KEY_EXPIRY_BUFFER_SECS: u64 = 60;

// =============================================================================
// Environment Variables - TMDB
// =============================================================================

/// v3 API key (sent as `api_key` query parameter)
pub const ENV_TMDB_API_KEY: &str = "CINESTASH_TMDB_API_KEY";

/// v4 read access token (sent as bearer token, preferred over the API key)
pub const ENV_TMDB_ACCESS_TOKEN: &str = "CINESTASH_TMDB_ACCESS_TOKEN";

/// Override the upstream base URL
pub const ENV_TMDB_BASE_URL: &str = "CINESTASH_TMDB_BASE_URL";

pub const TMDB_DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Per-request timeout for upstream calls
pub const TMDB_DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Attempts for transient upstream failures (5xx, 429, transport errors)
pub const TMDB_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between upstream attempts
pub const TMDB_RETRY_BASE_DELAY_MS: u64 = 250;

// =============================================================================
// Admin
// =============================================================================

/// Bearer token required by the cache invalidation endpoint
pub const ENV_ADMIN_TOKEN: &str = "CINESTASH_ADMIN_TOKEN";
