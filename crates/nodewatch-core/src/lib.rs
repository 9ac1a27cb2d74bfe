//! nodewatch-core: data model and configuration shared by every nodewatch crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AlertSettings, ChecksConfig, MonitorConfig, NodeConfig, parse_allow_list};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
