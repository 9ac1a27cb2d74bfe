//! Shared types used across nodewatch crates.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a notification recipient (e.g. a chat id).
pub type RecipientId = i64;

/// A monitored node, validated from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    pub dashboard_url: String,
    pub public_host: String,
    pub public_port: u16,
}

impl NodeSpec {
    /// `host:port` form of the public address, bracketing IPv6 literals.
    pub fn public_address(&self) -> String {
        if self.public_host.contains(':') {
            format!("[{}]:{}", self.public_host, self.public_port)
        } else {
            format!("{}:{}", self.public_host, self.public_port)
        }
    }
}

/// Probe settings shared read-only by every probe in a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChecksPolicy {
    pub request_timeout: Duration,
    pub enable_udp_check: bool,
}

impl Default for ChecksPolicy {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(2500),
            enable_udp_check: false,
        }
    }
}

/// Protocol a single probe speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Http,
    Tcp,
    Udp,
}

impl Protocol {
    /// Label used in alert messages.
    pub fn label(&self) -> &'static str {
        match self {
            Protocol::Http => "dashboard",
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of one probe against one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolOutcome {
    pub protocol: Protocol,
    pub ok: bool,
}

impl ProtocolOutcome {
    pub fn new(protocol: Protocol, ok: bool) -> Self {
        Self { protocol, ok }
    }
}

/// Health judgment for a node in one cycle.
///
/// `healthy` only reflects the HTTP and TCP outcomes. A UDP outcome is
/// carried for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthVerdict {
    pub node: NodeSpec,
    pub outcomes: Vec<ProtocolOutcome>,
    pub healthy: bool,
}

impl HealthVerdict {
    /// Result of the probe for `protocol`, if it ran.
    pub fn outcome(&self, protocol: Protocol) -> Option<bool> {
        self.outcomes
            .iter()
            .find(|o| o.protocol == protocol)
            .map(|o| o.ok)
    }

    /// `dashboard=OK, tcp=FAIL[, udp=OK]`.
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("dashboard={}", status_label(self.outcome(Protocol::Http))),
            format!("tcp={}", status_label(self.outcome(Protocol::Tcp))),
        ];
        if let Some(udp) = self.outcome(Protocol::Udp) {
            parts.push(format!("udp={}", status_label(Some(udp))));
        }
        parts.join(", ")
    }

    /// Alert text sent to subscribers when the node is down.
    pub fn alert_message(&self) -> String {
        format!("⚠️ {}: {}", self.node.name, self.summary())
    }
}

fn status_label(ok: Option<bool>) -> &'static str {
    if ok == Some(true) { "OK" } else { "FAIL" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> NodeSpec {
        NodeSpec {
            name: "node1".to_string(),
            dashboard_url: "http://localhost:14002".to_string(),
            public_host: "mynode.example.net".to_string(),
            public_port: 28967,
        }
    }

    #[test]
    fn summary_without_udp() {
        let verdict = HealthVerdict {
            node: node(),
            outcomes: vec![
                ProtocolOutcome::new(Protocol::Http, false),
                ProtocolOutcome::new(Protocol::Tcp, true),
            ],
            healthy: false,
        };
        assert_eq!(verdict.summary(), "dashboard=FAIL, tcp=OK");
        assert_eq!(verdict.alert_message(), "⚠️ node1: dashboard=FAIL, tcp=OK");
    }

    #[test]
    fn summary_with_udp() {
        let verdict = HealthVerdict {
            node: node(),
            outcomes: vec![
                ProtocolOutcome::new(Protocol::Http, true),
                ProtocolOutcome::new(Protocol::Tcp, false),
                ProtocolOutcome::new(Protocol::Udp, true),
            ],
            healthy: false,
        };
        assert_eq!(verdict.summary(), "dashboard=OK, tcp=FAIL, udp=OK");
    }

    #[test]
    fn public_address_brackets_ipv6() {
        let mut spec = node();
        assert_eq!(spec.public_address(), "mynode.example.net:28967");
        spec.public_host = "::1".to_string();
        assert_eq!(spec.public_address(), "[::1]:28967");
    }
}
