use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use snafu::{Location, ResultExt as _, Snafu};
use url::Url;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    /// could not read the configuration from the environment
    #[snafu(display("invalid environment configuration `{prefix}*`: {source}"))]
    Environment {
        prefix: &'static str,
        source: envy::Error,
        #[snafu(implicit)]
        location: Location,
    },

    #[snafu(display("SURREAL_USER and SURREAL_PASS must be set together"))]
    IncompleteCredentials {
        #[snafu(implicit)]
        location: Location,
    },
}

/// Process-wide settings, read once at start-up.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
}

impl Config {
    /// Read the configuration from environment variables. Unset variables fall back to their defaults.
    pub fn from_env() -> Result<Config, ConfigError> {
        let server = envy::from_env::<ServerConfig>().context(EnvironmentSnafu { prefix: "" })?;
        let store = envy::prefixed("SURREAL_")
            .from_env::<StoreEnv>()
            .context(EnvironmentSnafu { prefix: "SURREAL_" })?
            .try_into()?;

        Ok(Config { server, store })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,

    /// How long in-flight requests may keep running after a shutdown signal.
    #[serde(default = "default_shutdown_grace", deserialize_with = "humantime_duration")]
    pub shutdown_grace: Duration,

    /// Write a daily-rolling JSON log into this directory in addition to the console.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(flatten)]
    pub deadlines: Deadlines,
}

/// Upper bounds for the store call of each handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Deadlines {
    #[serde(default = "default_counter_timeout", deserialize_with = "humantime_duration")]
    pub counter_timeout: Duration,
    #[serde(default = "default_stats_timeout", deserialize_with = "humantime_duration")]
    pub stats_timeout: Duration,
    #[serde(default = "default_stats_all_timeout", deserialize_with = "humantime_duration")]
    pub stats_all_timeout: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            counter_timeout: default_counter_timeout(),
            stats_timeout: default_stats_timeout(),
            stats_all_timeout: default_stats_all_timeout(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub url: Url,
    pub namespace: String,
    pub database: String,
    pub table: String,
    pub credentials: Option<Credentials>,
    pub connect_timeout: Duration,
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// `SURREAL_*` variables as they appear in the environment.
#[derive(Debug, Deserialize)]
struct StoreEnv {
    #[serde(default = "default_surreal_url")]
    url: Url,
    #[serde(default = "default_namespace")]
    ns: String,
    #[serde(default = "default_database")]
    db: String,
    #[serde(default = "default_table")]
    table: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    pass: Option<String>,
    #[serde(default = "default_connect_timeout", deserialize_with = "humantime_duration")]
    connect_timeout: Duration,
}

impl TryFrom<StoreEnv> for StoreConfig {
    type Error = ConfigError;

    fn try_from(env: StoreEnv) -> Result<Self, Self::Error> {
        let credentials = match (env.user, env.pass) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            (None, None) => None,
            _ => return IncompleteCredentialsSnafu.fail(),
        };

        Ok(StoreConfig {
            url: env.url,
            namespace: env.ns,
            database: env.db,
            table: env.table,
            credentials,
            connect_timeout: env.connect_timeout,
        })
    }
}

fn humantime_duration<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    let text = String::deserialize(deserializer)?;
    humantime::parse_duration(&text).map_err(serde::de::Error::custom)
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_shutdown_grace() -> Duration {
    Duration::from_secs(5)
}

fn default_counter_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_stats_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_stats_all_timeout() -> Duration {
    Duration::from_secs(3)
}

fn default_surreal_url() -> Url {
    Url::parse("ws://localhost:8000").expect("default store url is valid")
}

fn default_namespace() -> String {
    "clicks".to_string()
}

fn default_database() -> String {
    "clicksdb".to_string()
}

fn default_table() -> String {
    "clicks".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    fn store(pairs: &[(&str, &str)]) -> Result<StoreConfig, ConfigError> {
        envy::prefixed("SURREAL_")
            .from_iter::<_, StoreEnv>(vars(pairs))
            .context(EnvironmentSnafu { prefix: "SURREAL_" })?
            .try_into()
    }

    #[test]
    fn server_defaults() {
        let config: ServerConfig = envy::from_iter(vars(&[])).unwrap();

        assert_eq!(config.http_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.shutdown_grace, Duration::from_secs(5));
        assert_eq!(config.log_dir, None);
        assert_eq!(config.deadlines, Deadlines::default());
        assert_eq!(config.deadlines.counter_timeout, Duration::from_secs(2));
        assert_eq!(config.deadlines.stats_all_timeout, Duration::from_secs(3));
    }

    #[test]
    fn server_overrides() {
        let config: ServerConfig = envy::from_iter(vars(&[
            ("HTTP_ADDR", "127.0.0.1:8080"),
            ("SHUTDOWN_GRACE", "30s"),
            ("STATS_ALL_TIMEOUT", "1500ms"),
            ("LOG_DIR", "/var/log/clickstats"),
        ]))
        .unwrap();

        assert_eq!(config.http_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.shutdown_grace, Duration::from_secs(30));
        assert_eq!(config.deadlines.stats_all_timeout, Duration::from_millis(1500));
        assert_eq!(config.deadlines.stats_timeout, Duration::from_secs(2));
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/clickstats")));
    }

    #[test]
    fn rejects_malformed_duration() {
        let result: Result<ServerConfig, _> =
            envy::from_iter(vars(&[("COUNTER_TIMEOUT", "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn store_defaults() {
        let config = store(&[]).unwrap();

        assert_eq!(config.url.as_str(), "ws://localhost:8000/");
        assert_eq!(config.namespace, "clicks");
        assert_eq!(config.database, "clicksdb");
        assert_eq!(config.table, "clicks");
        assert!(config.credentials.is_none());
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn store_credentials_come_in_pairs() {
        let config = store(&[("SURREAL_USER", "root"), ("SURREAL_PASS", "hunter2")]).unwrap();
        let credentials = config.credentials.unwrap();
        assert_eq!(credentials.username, "root");
        assert!(!format!("{credentials:?}").contains("hunter2"));

        let error = store(&[("SURREAL_USER", "root")]).unwrap_err();
        assert!(matches!(error, ConfigError::IncompleteCredentials { .. }));
    }

    #[test]
    fn store_overrides() {
        let config = store(&[
            ("SURREAL_URL", "mem://"),
            ("SURREAL_TABLE", "banner_clicks"),
            ("SURREAL_DB", "stats"),
        ])
        .unwrap();

        assert_eq!(config.url.scheme(), "mem");
        assert_eq!(config.table, "banner_clicks");
        assert_eq!(config.database, "stats");
    }
}
