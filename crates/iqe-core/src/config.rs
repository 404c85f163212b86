//! Configuration types for iqe.
//!
//! [`Config::load`] layers the embedded defaults, `~/.config/iqe/config.toml`
//! (if present) and `IQE_*` environment variables, e.g.
//! `IQE_TRANSPORT__TIMEOUT_SECS=30`. [`Config::defaults`] returns the
//! embedded defaults without touching the filesystem (useful in tests).

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::Catalog;
use crate::error::Result;

// ---------------------------------------------------------------------------
// Embedded defaults
// ---------------------------------------------------------------------------

const DEFAULT_CONFIG: &str = r#"
[transport]
kind         = "command"
timeout_secs = 120
curl_bin     = "curl"
grpcurl_bin  = "grpcurl"

[grpc]
default_port = 443

[catalog]
"#;

// ---------------------------------------------------------------------------
// Public config types
// ---------------------------------------------------------------------------

/// Top-level configuration, assembled once at process start.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub grpc: GrpcConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Which transport executes rendered requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// `curl` for HTTP, `grpcurl` for gRPC.
    #[default]
    Command,
    /// Native HTTP client; gRPC still goes through `grpcurl`.
    Native,
}

/// `[transport]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_curl_bin")]
    pub curl_bin: String,
    #[serde(default = "default_grpcurl_bin")]
    pub grpcurl_bin: String,
}

fn default_timeout_secs() -> u64 { 120 }
fn default_curl_bin() -> String { "curl".to_string() }
fn default_grpcurl_bin() -> String { "grpcurl".to_string() }

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            timeout_secs: default_timeout_secs(),
            curl_bin: default_curl_bin(),
            grpcurl_bin: default_grpcurl_bin(),
        }
    }
}

/// `[grpc]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GrpcConfig {
    #[serde(default = "default_grpc_port")]
    pub default_port: u16,
}

fn default_grpc_port() -> u16 { 443 }

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            default_port: default_grpc_port(),
        }
    }
}

/// `[catalog]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// Extra catalog layered over the built-in one.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load defaults, the user config file and `IQE_*` environment overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Like [`Config::load`] with an explicit config file path. A missing file
    /// is not an error.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "loading configuration");
        Ok(config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("IQE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?)
    }

    /// Return the built-in defaults without touching the filesystem.
    pub fn defaults() -> Self {
        config::Config::builder()
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Toml))
            .build()
            .expect("built-in default config must be valid TOML")
            .try_deserialize()
            .expect("built-in default config must deserialize correctly")
    }

    /// The built-in catalog, with `catalog.path` layered on top when set.
    pub fn catalog(&self) -> Result<Catalog> {
        let builtin = (*Catalog::builtin()).clone();
        match &self.catalog.path {
            Some(path) => Ok(builtin.merge(Catalog::load(path)?)),
            None => Ok(builtin),
        }
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

fn config_path() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".to_string()))
                .join(".config")
        })
        .join("iqe")
        .join("config.toml")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
