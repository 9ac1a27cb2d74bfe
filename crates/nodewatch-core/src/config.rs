//! nodewatch.toml configuration parser.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::{ChecksPolicy, NodeSpec, RecipientId};

const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 2500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    #[serde(default)]
    pub checks: ChecksConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,
    pub dashboard: String,
    /// `host:port` the node accepts public traffic on.
    pub public_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksConfig {
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default, alias = "enable_quic_check")]
    pub enable_udp_check: bool,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            enable_udp_check: false,
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

impl MonitorConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Scaffold a single-node config for `nodewatchd init`.
    pub fn scaffold() -> Self {
        MonitorConfig {
            nodes: vec![NodeConfig {
                name: "node1".to_string(),
                dashboard: "http://localhost:14002".to_string(),
                public_address: "mynode.example.net:28967".to_string(),
            }],
            checks: ChecksConfig {
                request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
                enable_udp_check: true,
            },
        }
    }

    /// Validate the node list, preserving configuration order.
    pub fn node_specs(&self) -> ConfigResult<Vec<NodeSpec>> {
        if self.nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }

        let mut seen = HashSet::new();
        let mut specs = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let name = node.name.trim();
            if name.is_empty() {
                return Err(ConfigError::EmptyName);
            }
            if !seen.insert(name.to_string()) {
                return Err(ConfigError::DuplicateNode(name.to_string()));
            }
            let dashboard = node.dashboard.trim();
            if dashboard.is_empty() {
                return Err(ConfigError::EmptyDashboard {
                    node: name.to_string(),
                });
            }
            let (host, port) = split_host_port(&node.public_address).ok_or_else(|| {
                ConfigError::InvalidAddress {
                    node: name.to_string(),
                    address: node.public_address.clone(),
                }
            })?;

            specs.push(NodeSpec {
                name: name.to_string(),
                dashboard_url: dashboard.to_string(),
                public_host: host,
                public_port: port,
            });
        }
        Ok(specs)
    }

    pub fn checks_policy(&self) -> ConfigResult<ChecksPolicy> {
        if self.checks.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(ChecksPolicy {
            request_timeout: Duration::from_millis(self.checks.request_timeout_ms),
            enable_udp_check: self.checks.enable_udp_check,
        })
    }
}

/// Split `host:port` on the last colon. Brackets around IPv6 hosts are removed.
fn split_host_port(address: &str) -> Option<(String, u16)> {
    let (host, port) = address.trim().rsplit_once(':')?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        return None;
    }
    let port = port.parse::<u16>().ok().filter(|p| *p != 0)?;
    Some((host.to_string(), port))
}

/// Alert-path settings taken from the environment at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSettings {
    pub poll_interval_secs: u64,
    pub cooldown: Duration,
    pub allow_list: BTreeSet<RecipientId>,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 60,
            cooldown: Duration::from_secs(300),
            allow_list: BTreeSet::new(),
        }
    }
}

impl AlertSettings {
    pub fn new(poll_interval_secs: u64, cooldown_secs: u64, allowed_recipients: &str) -> Self {
        Self {
            poll_interval_secs,
            cooldown: Duration::from_secs(cooldown_secs),
            allow_list: parse_allow_list(allowed_recipients),
        }
    }
}

/// Parse a comma-separated list of recipient ids. Entries that are not
/// integers are skipped.
pub fn parse_allow_list(raw: &str) -> BTreeSet<RecipientId> {
    raw.split(',')
        .filter_map(|item| item.trim().parse::<RecipientId>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[[nodes]]
name = "node1"
dashboard = "http://localhost:14002"
public_address = "mynode.example.net:28967"

[[nodes]]
name = "node2"
dashboard = "http://10.0.0.2:14002"
public_address = "[2001:db8::2]:28967"

[checks]
request_timeout_ms = 1500
enable_quic_check = true
"#;

    #[test]
    fn parse_sample_config() {
        let config = MonitorConfig::from_toml_str(SAMPLE).unwrap();
        let specs = config.node_specs().unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "node1");
        assert_eq!(specs[0].public_host, "mynode.example.net");
        assert_eq!(specs[0].public_port, 28967);
        assert_eq!(specs[1].public_host, "2001:db8::2");

        let policy = config.checks_policy().unwrap();
        assert_eq!(policy.request_timeout, Duration::from_millis(1500));
        assert!(policy.enable_udp_check);
    }

    #[test]
    fn checks_default_when_omitted() {
        let config = MonitorConfig::from_toml_str(
            r#"
[[nodes]]
name = "a"
dashboard = "http://127.0.0.1:14002"
public_address = "127.0.0.1:28967"
"#,
        )
        .unwrap();
        let policy = config.checks_policy().unwrap();
        assert_eq!(policy, ChecksPolicy::default());
    }

    #[test]
    fn rejects_empty_node_list() {
        let config = MonitorConfig::from_toml_str("").unwrap();
        assert!(matches!(config.node_specs(), Err(ConfigError::NoNodes)));
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut config = MonitorConfig::scaffold();
        config.nodes.push(config.nodes[0].clone());
        assert!(matches!(
            config.node_specs(),
            Err(ConfigError::DuplicateNode(name)) if name == "node1"
        ));
    }

    #[test]
    fn rejects_blank_name() {
        let mut config = MonitorConfig::scaffold();
        config.nodes[0].name = "   ".to_string();
        assert!(matches!(config.node_specs(), Err(ConfigError::EmptyName)));
    }

    #[test]
    fn rejects_bad_addresses() {
        for address in ["mynode", ":28967", "mynode:0", "mynode:70000", "mynode:port"] {
            let mut config = MonitorConfig::scaffold();
            config.nodes[0].public_address = address.to_string();
            assert!(
                matches!(config.node_specs(), Err(ConfigError::InvalidAddress { .. })),
                "{address} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut config = MonitorConfig::scaffold();
        config.checks.request_timeout_ms = 0;
        assert!(matches!(config.checks_policy(), Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn scaffold_renders_and_reparses() {
        let rendered = MonitorConfig::scaffold().to_toml_string().unwrap();
        assert!(rendered.contains("node1"));
        let reparsed = MonitorConfig::from_toml_str(&rendered).unwrap();
        assert_eq!(reparsed.node_specs().unwrap().len(), 1);
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = MonitorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.nodes.len(), 2);
    }

    #[test]
    fn from_file_missing_is_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = MonitorConfig::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Read(_))));
    }

    #[test]
    fn allow_list_skips_garbage() {
        let ids = parse_allow_list(" 42, abc,,-7 ,9x");
        assert_eq!(ids, BTreeSet::from([42, -7]));
        assert!(parse_allow_list("").is_empty());
    }

    #[test]
    fn alert_settings_from_raw_values() {
        let settings = AlertSettings::new(30, 120, "1,2");
        assert_eq!(settings.poll_interval_secs, 30);
        assert_eq!(settings.cooldown, Duration::from_secs(120));
        assert_eq!(settings.allow_list.len(), 2);
    }
}
