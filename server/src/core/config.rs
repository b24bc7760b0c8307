use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_ALLOWED_ORIGIN, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_RATE_LIMIT_DISCOVER_MAX, DEFAULT_RATE_LIMIT_LISTS_MAX, DEFAULT_RATE_LIMIT_SEARCH_MAX,
    DEFAULT_RATE_LIMIT_WINDOW_MS, RATE_LIMIT_PREFIX_DISCOVER, RATE_LIMIT_PREFIX_LISTS,
    RATE_LIMIT_PREFIX_SEARCH, TMDB_DEFAULT_BASE_URL, TMDB_DEFAULT_TIMEOUT_SECS,
};

// =============================================================================
// Store Backend Enum
// =============================================================================

/// Key-value store backend type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackendType {
    /// Redis-compatible server (Redis, Valkey, Dragonfly, Upstash)
    Redis,
    /// In-process store, lost on restart
    Memory,
    /// No store: caching always misses and rate limiting always allows
    Disabled,
}

impl fmt::Display for StoreBackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackendType::Redis => write!(f, "redis"),
            StoreBackendType::Memory => write!(f, "memory"),
            StoreBackendType::Disabled => write!(f, "disabled"),
        }
    }
}

// =============================================================================
// File Config (JSON)
// =============================================================================

/// Server configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub allowed_origins: Option<Vec<String>>,
}

/// Store configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StoreFileConfig {
    pub backend: Option<StoreBackendType>,
    pub url: Option<String>,
    pub token: Option<String>,
}

/// TMDB configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TmdbFileConfig {
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// A single endpoint family budget (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RateLimitBudgetFileConfig {
    pub window_ms: Option<u64>,
    pub max_requests: Option<u32>,
}

/// Rate limit configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct RateLimitFileConfig {
    pub enabled: Option<bool>,
    pub search: Option<RateLimitBudgetFileConfig>,
    pub discover: Option<RateLimitBudgetFileConfig>,
    pub lists: Option<RateLimitBudgetFileConfig>,
}

/// Admin configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AdminFileConfig {
    pub token: Option<String>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub store: Option<StoreFileConfig>,
    pub tmdb: Option<TmdbFileConfig>,
    pub rate_limit: Option<RateLimitFileConfig>,
    pub admin: Option<AdminFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                tracing::trace!(host = ?server.host, "Merging server.host");
                current.host = server.host;
            }
            if server.port.is_some() {
                tracing::trace!(port = ?server.port, "Merging server.port");
                current.port = server.port;
            }
            if server.allowed_origins.is_some() {
                current.allowed_origins = server.allowed_origins;
            }
        }

        if let Some(store) = other.store {
            let current = self.store.get_or_insert_with(StoreFileConfig::default);
            if store.backend.is_some() {
                tracing::trace!(backend = ?store.backend, "Merging store.backend");
                current.backend = store.backend;
            }
            if store.url.is_some() {
                current.url = store.url;
            }
            if store.token.is_some() {
                current.token = store.token;
            }
        }

        if let Some(tmdb) = other.tmdb {
            let current = self.tmdb.get_or_insert_with(TmdbFileConfig::default);
            if tmdb.api_key.is_some() {
                current.api_key = tmdb.api_key;
            }
            if tmdb.access_token.is_some() {
                current.access_token = tmdb.access_token;
            }
            if tmdb.base_url.is_some() {
                tracing::trace!(base_url = ?tmdb.base_url, "Merging tmdb.base_url");
                current.base_url = tmdb.base_url;
            }
            if tmdb.timeout_secs.is_some() {
                current.timeout_secs = tmdb.timeout_secs;
            }
        }

        if let Some(rate_limit) = other.rate_limit {
            let current = self
                .rate_limit
                .get_or_insert_with(RateLimitFileConfig::default);
            if rate_limit.enabled.is_some() {
                tracing::trace!(enabled = ?rate_limit.enabled, "Merging rate_limit.enabled");
                current.enabled = rate_limit.enabled;
            }
            merge_budget(&mut current.search, rate_limit.search);
            merge_budget(&mut current.discover, rate_limit.discover);
            merge_budget(&mut current.lists, rate_limit.lists);
        }

        if let Some(admin) = other.admin
            && admin.token.is_some()
        {
            self.admin.get_or_insert_with(AdminFileConfig::default).token = admin.token;
        }
    }
}

fn merge_budget(
    current: &mut Option<RateLimitBudgetFileConfig>,
    other: Option<RateLimitBudgetFileConfig>,
) {
    let Some(other) = other else {
        return;
    };
    let current = current.get_or_insert_with(RateLimitBudgetFileConfig::default);
    if other.window_ms.is_some() {
        current.window_ms = other.window_ms;
    }
    if other.max_requests.is_some() {
        current.max_requests = other.max_requests;
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

/// Key-value store connection settings
///
/// `url` and `token` are both optional; a Redis backend without both is
/// treated as unavailable rather than as a startup failure.
#[derive(Clone)]
pub struct StoreConfig {
    pub backend: StoreBackendType,
    pub url: Option<String>,
    pub token: Option<String>,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("backend", &self.backend)
            .field("url", &self.url.is_some())
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Clone)]
pub struct TmdbConfig {
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl fmt::Debug for TmdbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmdbConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Budget for one endpoint family: `max_requests` per `window_ms`, stored
/// under `key_prefix`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitBudget {
    pub window_ms: u64,
    pub max_requests: u32,
    pub key_prefix: String,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub search: RateLimitBudget,
    pub discover: RateLimitBudget,
    pub lists: RateLimitBudget,
}

#[derive(Clone, Default)]
pub struct AdminConfig {
    pub token: Option<String>,
}

impl fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminConfig")
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub tmdb: TmdbConfig,
    pub rate_limit: RateLimitConfig,
    pub admin: AdminConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.cinestash/cinestash.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_home(path);
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::resolve(cli, file_config);
        tracing::trace!(config = ?config, "Resolved configuration");
        Ok(config)
    }

    /// Layer defaults, file config and CLI/env overrides
    fn resolve(cli: &CliConfig, file_config: FileConfig) -> Self {
        let file_server = file_config.server.unwrap_or_default();
        let file_store = file_config.store.unwrap_or_default();
        let file_tmdb = file_config.tmdb.unwrap_or_default();
        let file_rate_limit = file_config.rate_limit.unwrap_or_default();
        let file_admin = file_config.admin.unwrap_or_default();

        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT);
        let allowed_origins = cli
            .allowed_origins
            .clone()
            .or(file_server.allowed_origins)
            .unwrap_or_else(|| vec![DEFAULT_ALLOWED_ORIGIN.to_string()]);

        // store: an explicit backend wins, otherwise redis iff a URL is known
        let store_url = non_empty(cli.store_url.clone().or(file_store.url));
        let store_token = non_empty(cli.store_token.clone().or(file_store.token));
        let store_backend = cli
            .store_backend
            .or(file_store.backend)
            .unwrap_or(if store_url.is_some() {
                StoreBackendType::Redis
            } else {
                StoreBackendType::Disabled
            });

        let tmdb = TmdbConfig {
            api_key: non_empty(cli.tmdb_api_key.clone().or(file_tmdb.api_key)),
            access_token: non_empty(cli.tmdb_access_token.clone().or(file_tmdb.access_token)),
            base_url: cli
                .tmdb_base_url
                .clone()
                .or(file_tmdb.base_url)
                .unwrap_or_else(|| TMDB_DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            timeout_secs: file_tmdb.timeout_secs.unwrap_or(TMDB_DEFAULT_TIMEOUT_SECS),
        };

        let window_override = cli.rate_limit_window_ms;
        let rate_limit = RateLimitConfig {
            enabled: cli
                .rate_limit_enabled
                .or(file_rate_limit.enabled)
                .unwrap_or(true),
            search: resolve_budget(
                file_rate_limit.search,
                window_override,
                cli.rate_limit_search_max,
                DEFAULT_RATE_LIMIT_SEARCH_MAX,
                RATE_LIMIT_PREFIX_SEARCH,
            ),
            discover: resolve_budget(
                file_rate_limit.discover,
                window_override,
                cli.rate_limit_discover_max,
                DEFAULT_RATE_LIMIT_DISCOVER_MAX,
                RATE_LIMIT_PREFIX_DISCOVER,
            ),
            lists: resolve_budget(
                file_rate_limit.lists,
                window_override,
                cli.rate_limit_lists_max,
                DEFAULT_RATE_LIMIT_LISTS_MAX,
                RATE_LIMIT_PREFIX_LISTS,
            ),
        };

        Self {
            server: ServerConfig {
                host,
                port,
                allowed_origins,
            },
            store: StoreConfig {
                backend: store_backend,
                url: store_url,
                token: store_token,
            },
            tmdb,
            rate_limit,
            admin: AdminConfig {
                token: non_empty(cli.admin_token.clone().or(file_admin.token)),
            },
        }
    }
}

fn resolve_budget(
    file: Option<RateLimitBudgetFileConfig>,
    window_override: Option<u64>,
    max_override: Option<u32>,
    default_max: u32,
    key_prefix: &str,
) -> RateLimitBudget {
    let file = file.unwrap_or_default();
    RateLimitBudget {
        // zero-length windows would divide by zero when aligning boundaries
        window_ms: window_override
            .or(file.window_ms)
            .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_MS)
            .max(1),
        max_requests: max_override.or(file.max_requests).unwrap_or(default_max),
        key_prefix: key_prefix.to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolve a leading `~` against the home directory
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

/// Get the profile config path (~/.cinestash/cinestash.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_store_backend_serde() {
        let backend: StoreBackendType = serde_json::from_str(r#""redis""#).unwrap();
        assert_eq!(backend, StoreBackendType::Redis);

        let backend: StoreBackendType = serde_json::from_str(r#""disabled""#).unwrap();
        assert_eq!(backend, StoreBackendType::Disabled);
    }

    #[test]
    fn test_store_backend_display() {
        assert_eq!(StoreBackendType::Redis.to_string(), "redis");
        assert_eq!(StoreBackendType::Memory.to_string(), "memory");
        assert_eq!(StoreBackendType::Disabled.to_string(), "disabled");
    }

    #[test]
    fn test_file_config_parse_full() {
        let json = r#"{
            "server": { "host": "0.0.0.0", "port": 8080 },
            "store": { "url": "redis://cache:6379", "token": "s3cret" },
            "tmdb": { "access_token": "tok" },
            "rate_limit": { "search": { "max_requests": 5, "window_ms": 1000 } }
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        let server = config.server.as_ref().unwrap();
        assert_eq!(server.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(server.port, Some(8080));

        let store = config.store.as_ref().unwrap();
        assert_eq!(store.url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(store.token.as_deref(), Some("s3cret"));

        let search = config
            .rate_limit
            .as_ref()
            .and_then(|r| r.search.as_ref())
            .unwrap();
        assert_eq!(search.max_requests, Some(5));
        assert_eq!(search.window_ms, Some(1000));
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let json = r#"{ "server": { "host": "localhost" }, "unknown_field": 123 }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.extra.get("unknown_field").unwrap(), 123);
    }

    #[test]
    fn test_file_config_merge() {
        let mut base: FileConfig = serde_json::from_str(
            r#"{
                "server": { "host": "127.0.0.1", "port": 4000 },
                "rate_limit": { "search": { "max_requests": 10 } }
            }"#,
        )
        .unwrap();
        let overlay: FileConfig = serde_json::from_str(
            r#"{
                "server": { "port": 5000 },
                "rate_limit": { "search": { "window_ms": 5000 } }
            }"#,
        )
        .unwrap();

        base.merge(overlay);

        let server = base.server.as_ref().unwrap();
        assert_eq!(server.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(server.port, Some(5000));

        let search = base
            .rate_limit
            .as_ref()
            .and_then(|r| r.search.as_ref())
            .unwrap();
        assert_eq!(search.max_requests, Some(10));
        assert_eq!(search.window_ms, Some(5000));
    }

    #[test]
    fn test_resolve_defaults() {
        let config = AppConfig::resolve(&CliConfig::default(), FileConfig::default());

        assert_eq!(config.server.host, DEFAULT_HOST);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert_eq!(config.store.backend, StoreBackendType::Disabled);
        assert!(config.store.url.is_none());
        assert!(config.rate_limit.enabled);
        assert_eq!(config.tmdb.base_url, TMDB_DEFAULT_BASE_URL);
        assert!(config.admin.token.is_none());
    }

    #[test]
    fn test_resolve_store_defaults_to_redis_when_url_present() {
        let cli = CliConfig {
            store_url: Some("redis://localhost:6379".to_string()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, FileConfig::default());
        assert_eq!(config.store.backend, StoreBackendType::Redis);
    }

    #[test]
    fn test_resolve_blank_values_are_absent() {
        let cli = CliConfig {
            store_url: Some("   ".to_string()),
            store_token: Some(String::new()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, FileConfig::default());
        assert!(config.store.url.is_none());
        assert!(config.store.token.is_none());
        assert_eq!(config.store.backend, StoreBackendType::Disabled);
    }

    #[test]
    fn test_resolve_rate_limit_budgets_are_independent() {
        let file: FileConfig = serde_json::from_str(
            r#"{ "rate_limit": { "discover": { "max_requests": 99 } } }"#,
        )
        .unwrap();
        let cli = CliConfig {
            rate_limit_search_max: Some(3),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, file);

        assert_eq!(config.rate_limit.search.max_requests, 3);
        assert_eq!(config.rate_limit.discover.max_requests, 99);
        assert_eq!(
            config.rate_limit.lists.max_requests,
            DEFAULT_RATE_LIMIT_LISTS_MAX
        );
        assert_eq!(config.rate_limit.search.key_prefix, RATE_LIMIT_PREFIX_SEARCH);
        assert_ne!(
            config.rate_limit.search.key_prefix,
            config.rate_limit.discover.key_prefix
        );
    }

    #[test]
    fn test_resolve_cli_overrides_file() {
        let file: FileConfig =
            serde_json::from_str(r#"{ "server": { "port": 7000 }, "admin": { "token": "a" } }"#)
                .unwrap();
        let cli = CliConfig {
            port: Some(7100),
            admin_token: Some("b".to_string()),
            ..Default::default()
        };
        let config = AppConfig::resolve(&cli, file);
        assert_eq!(config.server.port, 7100);
        assert_eq!(config.admin.token.as_deref(), Some("b"));
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "store": {{ "backend": "memory" }}, "tmdb": {{ "base_url": "http://localhost:9999/3/" }} }}"#
        )
        .unwrap();

        let cli = CliConfig {
            config: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let config = AppConfig::load(&cli).unwrap();

        assert_eq!(config.store.backend, StoreBackendType::Memory);
        assert_eq!(config.tmdb.base_url, "http://localhost:9999/3");
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let cli = CliConfig {
            config: Some(PathBuf::from("/definitely/not/here/cinestash.json")),
            ..Default::default()
        };
        assert!(AppConfig::load(&cli).is_err());
    }

    #[test]
    fn test_expand_home() {
        let absolute = PathBuf::from("/etc/cinestash.json");
        assert_eq!(expand_home(&absolute), absolute);

        if let Some(home) = dirs::home_dir() {
            assert_eq!(
                expand_home(Path::new("~/conf/cinestash.json")),
                home.join("conf/cinestash.json")
            );
        }
    }

    #[test]
    fn test_debug_masks_secrets() {
        let store = StoreConfig {
            backend: StoreBackendType::Redis,
            url: Some("redis://user:pw@host".to_string()),
            token: Some("secret-token".to_string()),
        };
        let debug = format!("{:?}", store);
        assert!(!debug.contains("secret-token"));
        assert!(!debug.contains("pw@host"));
    }
}
