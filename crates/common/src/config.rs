//! Application configuration.

use config::{ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Site behaviour (paging, media, cache, hosts).
    #[serde(default)]
    pub site: SiteConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database host.
    #[serde(default = "default_db_host")]
    pub host: String,
    /// Database port.
    #[serde(default = "default_db_port")]
    pub port: u16,
    /// Database user.
    #[serde(default = "default_db_user")]
    pub user: String,
    /// Database password.
    #[serde(default = "default_db_password")]
    pub password: String,
    /// Database name.
    #[serde(default = "default_db_name")]
    pub name: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Site configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Secret key.
    #[serde(default = "default_secret_key")]
    pub secret_key: String,
    /// Accepted `Host` header values. `*` accepts any host.
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,
    /// Debug mode.
    #[serde(default)]
    pub debug: bool,
    /// Posts per feed page.
    #[serde(default = "default_count_post")]
    pub count_post: u64,
    /// Sub-directory of `media_root` that post images are written to.
    #[serde(default = "default_upload_path")]
    pub upload_path: String,
    /// Directory media files are stored in.
    #[serde(default = "default_media_root")]
    pub media_root: PathBuf,
    /// URL prefix media files are served from.
    #[serde(default = "default_media_url")]
    pub media_url: String,
    /// Lifetime of a cached index page, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Where unauthenticated visitors of protected pages are sent.
    #[serde(default = "default_login_url")]
    pub login_url: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

fn default_db_host() -> String {
    "db".to_string()
}

const fn default_db_port() -> u16 {
    5432
}

fn default_db_user() -> String {
    "smart_finance_user".to_string()
}

fn default_db_password() -> String {
    "smart_finance_password".to_string()
}

fn default_db_name() -> String {
    "smart_finance".to_string()
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    1
}

fn default_secret_key() -> String {
    "SUP3R-S3CR3T-K3Y-F0R-MY-PR0J3CT".to_string()
}

fn default_allowed_hosts() -> Vec<String> {
    vec!["127.0.0.1".to_string(), "localhost".to_string()]
}

const fn default_count_post() -> u64 {
    10
}

fn default_upload_path() -> String {
    "posts/".to_string()
}

fn default_media_root() -> PathBuf {
    PathBuf::from("media")
}

fn default_media_url() -> String {
    "/media/".to_string()
}

const fn default_cache_ttl_secs() -> u64 {
    20
}

fn default_login_url() -> String {
    "/auth/login/".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            password: default_db_password(),
            name: default_db_name(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            allowed_hosts: default_allowed_hosts(),
            debug: false,
            count_post: default_count_post(),
            upload_path: default_upload_path(),
            media_root: default_media_root(),
            media_url: default_media_url(),
            cache_ttl_secs: default_cache_ttl_secs(),
            login_url: default_login_url(),
        }
    }
}

impl DatabaseConfig {
    /// `PostgreSQL` connection URL.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }
}

impl SiteConfig {
    /// Whether a request `Host` header value is acceptable.
    ///
    /// The port is ignored. In debug mode loopback names are always accepted.
    #[must_use]
    pub fn is_host_allowed(&self, host: &str) -> bool {
        let name = strip_port(host);
        if self.debug && matches!(name, "localhost" | "127.0.0.1" | "[::1]") {
            return true;
        }
        self.allowed_hosts
            .iter()
            .any(|allowed| allowed == "*" || allowed.eq_ignore_ascii_case(name))
    }
}

fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        // [::1]:8000
        return host.find(']').map_or(host, |end| &host[..=end]);
    }
    host.split(':').next().unwrap_or(host)
}

/// Flat environment names accepted alongside the `POSTBOARD__` prefixed ones.
const LEGACY_ENV_KEYS: &[(&str, &str)] = &[
    ("POSTGRES_DB", "database.name"),
    ("POSTGRES_USER", "database.user"),
    ("POSTGRES_PASSWORD", "database.password"),
    ("DB_HOST", "database.host"),
    ("DB_PORT", "database.port"),
    ("SECRET_KEY", "site.secret_key"),
    ("COUNT_POST", "site.count_post"),
];

/// Apply the flat legacy environment names on top of `builder`.
///
/// `lookup` resolves an environment variable; it is a parameter so the
/// mapping can be exercised without touching the process environment.
pub fn apply_legacy_env<F>(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: F,
) -> Result<ConfigBuilder<DefaultState>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for (env_key, config_key) in LEGACY_ENV_KEYS {
        builder = builder.set_override_option(*config_key, lookup(env_key))?;
    }

    if let Some(debug) = lookup("DEBUG") {
        builder = builder.set_override("site.debug", debug == "True")?;
    }

    if let Some(hosts) = lookup("ALLOWED_HOSTS") {
        let hosts: Vec<String> = hosts
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(ToString::to_string)
            .collect();
        builder = builder.set_override("site.allowed_hosts", hosts)?;
    }

    Ok(builder)
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `.env` (if present)
    /// 2. `config/default.toml`
    /// 3. `config/{environment}.toml` (based on `POSTBOARD_ENV`)
    /// 4. Environment variables with `POSTBOARD__` prefix
    /// 5. Flat names such as `POSTGRES_DB`, `SECRET_KEY`, `COUNT_POST`
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let env = std::env::var("POSTBOARD_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                Environment::with_prefix("POSTBOARD")
                    .separator("__")
                    .try_parsing(true),
            );

        apply_legacy_env(builder, |key| std::env::var(key).ok())?
            .build()?
            .try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("POSTBOARD")
                    .separator("__")
                    .try_parsing(true),
            );

        apply_legacy_env(builder, |key| std::env::var(key).ok())?
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load_with(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        apply_legacy_env(config::Config::builder(), |key| vars.get(key).cloned())
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = load_with(&[]);
        assert_eq!(config.site.count_post, 10);
        assert_eq!(config.site.cache_ttl_secs, 20);
        assert_eq!(config.site.upload_path, "posts/");
        assert!(!config.site.debug);
        assert_eq!(config.site.allowed_hosts, vec!["127.0.0.1", "localhost"]);
        assert_eq!(config.database.name, "smart_finance");
        assert_eq!(config.database.port, 5432);
    }

    #[test]
    fn test_legacy_env_names() {
        let config = load_with(&[
            ("POSTGRES_DB", "blog"),
            ("POSTGRES_USER", "writer"),
            ("POSTGRES_PASSWORD", "pw"),
            ("DB_HOST", "pg.internal"),
            ("DB_PORT", "6543"),
            ("SECRET_KEY", "s3cret"),
            ("COUNT_POST", "3"),
            ("DEBUG", "True"),
            ("ALLOWED_HOSTS", "example.com, www.example.com"),
        ]);

        assert_eq!(config.database.url(), "postgres://writer:pw@pg.internal:6543/blog");
        assert_eq!(config.site.secret_key, "s3cret");
        assert_eq!(config.site.count_post, 3);
        assert!(config.site.debug);
        assert_eq!(config.site.allowed_hosts, vec!["example.com", "www.example.com"]);
    }

    #[test]
    fn test_debug_requires_exact_true() {
        assert!(!load_with(&[("DEBUG", "true")]).site.debug);
        assert!(!load_with(&[("DEBUG", "1")]).site.debug);
    }

    #[test]
    fn test_host_allowed() {
        let site = SiteConfig::default();
        assert!(site.is_host_allowed("localhost:8000"));
        assert!(site.is_host_allowed("127.0.0.1"));
        assert!(!site.is_host_allowed("evil.example"));
        assert!(!site.is_host_allowed("[::1]:8000"));

        let debug = SiteConfig {
            debug: true,
            allowed_hosts: Vec::new(),
            ..SiteConfig::default()
        };
        assert!(debug.is_host_allowed("[::1]:8000"));
        assert!(!debug.is_host_allowed("example.com"));

        let wildcard = SiteConfig {
            allowed_hosts: vec!["*".to_string()],
            ..SiteConfig::default()
        };
        assert!(wildcard.is_host_allowed("anything.example"));
    }
}
