//! Application configuration.
//!
//! Everything lives in a single TOML file, `./config.toml` unless another
//! path is given:
//!
//! ```toml
//! title = "Calendrier"
//! refresh_interval = 15
//! port = 3000
//!
//! [[sources]]
//! id = "work"
//! name = "Work"
//! url = "webcal://calendar.example.com/work.ics"
//! color = "#3b82f6"
//! ```

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use calmerge_core::Source;
use calmerge_providers::FetcherConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ServerError, ServerResult};

/// Source id reserved for the combined calendar (`/ics/all.ics`).
pub const RESERVED_SOURCE_ID: &str = "all";

/// Port used when neither the command line, the file nor `PORT` set one.
pub const DEFAULT_PORT: u16 = 3000;

/// Configuration for the calmerge server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Title shown by the web front end.
    pub title: String,

    /// Minutes between scheduled refreshes.
    pub refresh_interval: u64,

    /// Listen port.
    pub port: Option<u16>,

    /// Listen address.
    pub host: String,

    /// Per-source fetch timeout in seconds.
    pub fetch_timeout_secs: u64,

    /// Whether feed TLS certificates are verified.
    pub verify_tls: bool,

    /// Directory served at `/` for the web front end.
    pub static_dir: Option<PathBuf>,

    /// Display name of the combined calendar.
    pub combined_name: String,

    /// Calendar feeds, in display and refresh order.
    pub sources: Vec<Source>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Calendrier".to_string(),
            refresh_interval: 15,
            port: None,
            host: "0.0.0.0".to_string(),
            fetch_timeout_secs: 30,
            verify_tls: true,
            static_dir: None,
            combined_name: "Tous les calendriers".to_string(),
            sources: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Returns the configuration file used when no path is given.
    pub fn default_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// Loads and validates configuration from `path`.
    pub fn load_from(path: &Path) -> ServerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ServerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| ServerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        debug!(
            path = %path.display(),
            sources = config.sources.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(content: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(content).map_err(|source| ServerError::ConfigParse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration back to TOML.
    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ServerError::config(format!("failed to serialize config: {}", e)))
    }

    /// Checks the invariants the rest of the server relies on.
    ///
    /// Source ids must be non-empty, unique and not `all`; feed URLs must be
    /// http, https or webcal.
    pub fn validate(&self) -> ServerResult<()> {
        if self.refresh_interval == 0 {
            return Err(ServerError::config("refresh_interval must be at least 1 minute"));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(ServerError::config("fetch_timeout_secs must be at least 1"));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(ServerError::config(format!(
                    "source '{}' has an empty id",
                    source.name
                )));
            }
            if source.id == RESERVED_SOURCE_ID {
                return Err(ServerError::config(format!(
                    "source id '{}' is reserved for the combined calendar",
                    RESERVED_SOURCE_ID
                )));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(ServerError::config(format!(
                    "duplicate source id '{}'",
                    source.id
                )));
            }

            let url = Url::parse(&source.url).map_err(|e| {
                ServerError::config(format!("source '{}': invalid url: {}", source.id, e))
            })?;
            if !matches!(url.scheme(), "http" | "https" | "webcal") {
                return Err(ServerError::config(format!(
                    "source '{}': unsupported url scheme '{}'",
                    source.id,
                    url.scheme()
                )));
            }
        }

        Ok(())
    }

    /// Returns the sources taking part in refresh cycles.
    pub fn enabled_sources(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter().filter(|s| s.enabled)
    }

    /// Looks up a configured source by id.
    pub fn source(&self, id: &str) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Returns the time between scheduled refreshes.
    pub fn refresh_period(&self) -> Duration {
        Duration::from_secs(self.refresh_interval.saturating_mul(60))
    }

    /// Returns the per-source fetch timeout.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Returns the HTTP settings used to fetch every source.
    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig::new()
            .with_timeout(self.fetch_timeout())
            .with_verify_tls(self.verify_tls)
    }

    /// Resolves the listen port: `flag`, then the file, then `PORT`, then 3000.
    pub fn resolve_port(&self, flag: Option<u16>) -> u16 {
        pick_port(flag, self.port, std::env::var("PORT").ok().as_deref())
    }

    /// Resolves the listen address for `port`.
    pub fn listen_addr(&self, port: u16) -> ServerResult<SocketAddr> {
        format!("{}:{}", self.host, port).parse().map_err(|e| {
            ServerError::config(format!("invalid listen address '{}': {}", self.host, e))
        })
    }
}

fn pick_port(flag: Option<u16>, configured: Option<u16>, env: Option<&str>) -> u16 {
    flag.or(configured)
        .or_else(|| env.and_then(|v| v.trim().parse().ok()))
        .unwrap_or(DEFAULT_PORT)
}
