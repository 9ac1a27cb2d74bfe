//! Health verdicts from probe outcomes.

use nodewatch_core::{HealthVerdict, NodeSpec, Protocol, ProtocolOutcome};

/// Combine one cycle's outcomes for `node` into a verdict.
///
/// A node is healthy iff both its HTTP and TCP probes succeeded. A probe
/// that did not report counts as failed. UDP never affects the result.
pub fn evaluate(node: &NodeSpec, outcomes: Vec<ProtocolOutcome>) -> HealthVerdict {
    let passed = |protocol: Protocol| {
        outcomes
            .iter()
            .any(|o| o.protocol == protocol && o.ok)
    };
    let healthy = passed(Protocol::Http) && passed(Protocol::Tcp);

    HealthVerdict {
        node: node.clone(),
        outcomes,
        healthy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> NodeSpec {
        NodeSpec {
            name: "node1".to_string(),
            dashboard_url: "http://localhost:14002".to_string(),
            public_host: "127.0.0.1".to_string(),
            public_port: 28967,
        }
    }

    fn outcomes(http: bool, tcp: bool, udp: Option<bool>) -> Vec<ProtocolOutcome> {
        let mut out = vec![
            ProtocolOutcome::new(Protocol::Http, http),
            ProtocolOutcome::new(Protocol::Tcp, tcp),
        ];
        if let Some(ok) = udp {
            out.push(ProtocolOutcome::new(Protocol::Udp, ok));
        }
        out
    }

    #[test]
    fn healthy_iff_http_and_tcp_regardless_of_udp() {
        for http in [true, false] {
            for tcp in [true, false] {
                for udp in [None, Some(true), Some(false)] {
                    let verdict = evaluate(&node(), outcomes(http, tcp, udp));
                    assert_eq!(verdict.healthy, http && tcp, "http={http} tcp={tcp} udp={udp:?}");
                }
            }
        }
    }

    #[test]
    fn verdict_keeps_outcomes_in_order() {
        let verdict = evaluate(&node(), outcomes(true, false, Some(true)));
        assert_eq!(verdict.outcomes.len(), 3);
        assert_eq!(verdict.outcome(Protocol::Udp), Some(true));
        assert_eq!(verdict.node.name, "node1");
    }

    #[test]
    fn missing_tcp_outcome_is_unhealthy() {
        let verdict = evaluate(&node(), vec![ProtocolOutcome::new(Protocol::Http, true)]);
        assert!(!verdict.healthy);
        assert_eq!(verdict.summary(), "dashboard=OK, tcp=FAIL");
    }
}
