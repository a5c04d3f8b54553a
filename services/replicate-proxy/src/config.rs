//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The Replicate token is loaded from the REPLICATE_TOKEN env var or
//! token_file, never stored in the TOML directly to avoid leaking secrets.
//! A missing token is not a load error: the service still starts and
//! answers 500 on every proxied request until one is configured.

use common::Secret;
use reqwest::Url;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Env var holding the upstream credential
pub const TOKEN_ENV: &str = "REPLICATE_TOKEN";

/// Config file used when neither --config nor CONFIG_PATH is given
pub const DEFAULT_CONFIG_PATH: &str = "replicate-proxy.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub replicate: ReplicateConfig,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ProxyConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// Transport timeout for the upstream call. Unset means the client default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Upstream API settings
#[derive(Debug, Deserialize)]
pub struct ReplicateConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(skip)]
    pub token: Option<Secret>,
    /// Path to a file containing the token (alternative to REPLICATE_TOKEN)
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8888))
}

fn default_max_connections() -> usize {
    1000
}

fn default_api_url() -> String {
    "https://api.replicate.com".to_string()
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            timeout_secs: None,
            max_connections: default_max_connections(),
        }
    }
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            token_file: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then resolve the token.
    ///
    /// Token resolution order:
    /// 1. REPLICATE_TOKEN env var
    /// 2. token_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&contents)?;
        config.resolve_token(std::env::var(TOKEN_ENV).ok())?;
        Ok(config)
    }

    /// Like `load`, but a missing file at the default path means defaults.
    /// An explicitly chosen path must exist.
    pub fn load_or_default(path: &Path) -> common::Result<Self> {
        if path == Path::new(DEFAULT_CONFIG_PATH) && !path.exists() {
            let mut config = Self::default();
            config.resolve_token(std::env::var(TOKEN_ENV).ok())?;
            return Ok(config);
        }
        Self::load(path)
    }

    /// Parse and validate TOML. Does not touch the environment.
    pub fn from_toml(contents: &str) -> common::Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.api_url()?;

        if config.proxy.timeout_secs == Some(0) {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if config.proxy.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve the token: `env_token` takes precedence over token_file.
    /// Blank values count as absent.
    pub fn resolve_token(&mut self, env_token: Option<String>) -> common::Result<()> {
        if let Some(token) = env_token.and_then(Secret::new) {
            self.replicate.token = Some(token);
            return Ok(());
        }
        if let Some(ref token_file) = self.replicate.token_file {
            let token = std::fs::read_to_string(token_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read token_file {}: {e}",
                    token_file.display()
                ))
            })?;
            self.replicate.token = Secret::new(token);
        }
        Ok(())
    }

    /// Parsed upstream base URL; must be http(s).
    pub fn api_url(&self) -> common::Result<Url> {
        let url = Url::parse(&self.replicate.api_url).map_err(|e| {
            common::Error::Config(format!(
                "api_url is not a valid URL ({e}): {}",
                self.replicate.api_url
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(common::Error::Config(format!(
                "api_url must start with http:// or https://, got: {}",
                self.replicate.api_url
            )));
        }
        Ok(url)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }
}
