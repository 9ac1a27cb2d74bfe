//! Configuration error types.

use thiserror::Error;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating the monitor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("no nodes configured")]
    NoNodes,

    #[error("node name must not be empty")]
    EmptyName,

    #[error("duplicate node name: {0}")]
    DuplicateNode(String),

    #[error("node {node}: dashboard URL must not be empty")]
    EmptyDashboard { node: String },

    #[error("node {node}: invalid public address {address:?} (expected host:port)")]
    InvalidAddress { node: String, address: String },

    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
}
