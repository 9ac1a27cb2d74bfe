//! Protocol probes.
//!
//! Each probe takes a target and a timeout and answers with a plain
//! `bool`. Connection errors, timeouts, DNS failures and unexpected HTTP
//! statuses all come back as `false`; nothing is retried.

use std::future::Future;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::pin::Pin;
use std::time::Duration;

use http::{StatusCode, Uri};
use tokio::net::{TcpStream, UdpSocket};
use tracing::debug;

use nodewatch_core::{ChecksPolicy, NodeSpec, Protocol, ProtocolOutcome};
use nodewatch_http::{HttpClient, HttpResult};

/// Payload of the UDP liveness datagram.
const UDP_PAYLOAD: &[u8] = b"ping";

/// Boxed future returned by [`Prober::probe`].
pub type ProbeFuture<'a> = Pin<Box<dyn Future<Output = Vec<ProtocolOutcome>> + Send + 'a>>;

/// Runs every enabled probe against one node.
///
/// Outcomes are ordered HTTP, TCP, then UDP when the policy enables it.
pub trait Prober: Send + Sync {
    fn probe<'a>(&'a self, node: &'a NodeSpec, policy: &'a ChecksPolicy) -> ProbeFuture<'a>;
}

/// [`Prober`] that talks to the real network.
#[derive(Debug, Clone)]
pub struct NetworkProber {
    client: HttpClient,
}

impl NetworkProber {
    /// Prober whose dashboard checks trust the bundled web PKI roots.
    pub fn new() -> HttpResult<Self> {
        Ok(Self::with_client(HttpClient::new()?))
    }

    pub fn with_client(client: HttpClient) -> Self {
        Self { client }
    }
}

impl Prober for NetworkProber {
    fn probe<'a>(&'a self, node: &'a NodeSpec, policy: &'a ChecksPolicy) -> ProbeFuture<'a> {
        Box::pin(async move {
            let timeout = policy.request_timeout;

            // The three probes share nothing, so run them side by side.
            let (http_ok, tcp_ok, udp_ok) = tokio::join!(
                probe_http(&self.client, &node.dashboard_url, timeout),
                probe_tcp(&node.public_host, node.public_port, timeout),
                async {
                    if policy.enable_udp_check {
                        Some(probe_udp(&node.public_host, node.public_port, timeout).await)
                    } else {
                        None
                    }
                },
            );

            let mut outcomes = vec![
                ProtocolOutcome::new(Protocol::Http, http_ok),
                ProtocolOutcome::new(Protocol::Tcp, tcp_ok),
            ];
            if let Some(ok) = udp_ok {
                outcomes.push(ProtocolOutcome::new(Protocol::Udp, ok));
            }

            debug!(node = %node.name, http_ok, tcp_ok, ?udp_ok, "node probed");
            outcomes
        })
    }
}

/// GET a dashboard URL, following redirects inside the same timeout.
///
/// Returns `true` only when the final response is status 200. Other 2xx
/// codes count as failures. Both `http://` and `https://` are probed.
pub async fn probe_http(client: &HttpClient, url: &str, timeout: Duration) -> bool {
    let uri: Uri = match url.parse() {
        Ok(uri) => uri,
        Err(e) => {
            debug!(error = %e, %url, "invalid dashboard URL");
            return false;
        }
    };

    match tokio::time::timeout(timeout, client.get(uri)).await {
        Ok(Ok(resp)) if resp.status() == StatusCode::OK => true,
        Ok(Ok(resp)) => {
            debug!(status = %resp.status(), %url, "dashboard probe non-200");
            false
        }
        Ok(Err(e)) => {
            debug!(error = %e, %url, "dashboard probe failed");
            false
        }
        Err(_) => {
            debug!(%url, "dashboard probe timed out");
            false
        }
    }
}

/// Attempt a TCP connect. The stream is closed as soon as it is established.
pub async fn probe_tcp(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(stream)) => {
            drop(stream);
            true
        }
        Ok(Err(e)) => {
            debug!(error = %e, %host, port, "tcp probe failed");
            false
        }
        Err(_) => {
            debug!(%host, port, "tcp probe timed out");
            false
        }
    }
}

/// Send one datagram to `host:port`.
///
/// UDP carries no acknowledgement, so `true` only means the datagram was
/// handed to the local network stack after the host resolved. It says
/// nothing about the node having received it.
pub async fn probe_udp(host: &str, port: u16, timeout: Duration) -> bool {
    let send = async {
        let target = tokio::net::lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "host resolved to no address"))?;
        let local: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.send_to(UDP_PAYLOAD, target).await?;
        Ok::<_, io::Error>(())
    };

    match tokio::time::timeout(timeout, send).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!(error = %e, %host, port, "udp probe failed");
            false
        }
        Err(_) => {
            debug!(%host, port, "udp probe timed out");
            false
        }
    }
}
