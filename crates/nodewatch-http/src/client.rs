//! HTTP/1.1 client.
//!
//! One connection per request: the target is dialled, optionally wrapped
//! in TLS, handshaken with hyper, and the connection task ends once the
//! response has been consumed or dropped.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use http::header::{HOST, USER_AGENT};
use http::uri::{Authority, PathAndQuery};
use http::{HeaderValue, Method, Request, Response, Uri};
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::client::conn::http1::{self, SendRequest};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::error::{HttpError, HttpResult};
use crate::redirect::{self, DEFAULT_MAX_REDIRECTS};
use crate::tls;

const CLIENT_USER_AGENT: &str = concat!("nodewatch/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client. Cloning is cheap.
#[derive(Clone)]
pub struct HttpClient {
    tls: TlsConnector,
    max_redirects: usize,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("max_redirects", &self.max_redirects)
            .finish_non_exhaustive()
    }
}

impl HttpClient {
    /// Client that verifies servers against the bundled Mozilla roots.
    pub fn new() -> HttpResult<Self> {
        Ok(Self::with_tls_config(tls::webpki_client_config()?))
    }

    pub fn with_tls_config(config: Arc<rustls::ClientConfig>) -> Self {
        Self {
            tls: TlsConnector::from(config),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    pub fn max_redirects(&self) -> usize {
        self.max_redirects
    }

    /// Send `request` to the absolute URI it carries.
    ///
    /// `Host` and `User-Agent` are filled in when absent. Redirects are
    /// returned as-is.
    pub async fn send(&self, request: Request<Bytes>) -> HttpResult<Response<Incoming>> {
        let (mut parts, body) = request.into_parts();
        let target = Target::from_uri(&parts.uri)?;
        let mut sender = self.connect(&target).await?;

        let host = HeaderValue::from_str(target.authority.as_str()).map_err(http::Error::from)?;
        parts.headers.entry(HOST).or_insert(host);
        parts
            .headers
            .entry(USER_AGENT)
            .or_insert(HeaderValue::from_static(CLIENT_USER_AGENT));
        parts.uri = Uri::from(target.path);

        let request = Request::from_parts(parts, Full::new(body));
        Ok(sender.send_request(request).await?)
    }

    /// GET `uri`, following up to [`max_redirects`](Self::max_redirects)
    /// 301/302/303/307/308 hops. The final response is returned whatever
    /// its status.
    pub async fn get(&self, uri: Uri) -> HttpResult<Response<Incoming>> {
        let mut uri = uri;
        let mut hops = 0;
        loop {
            let request = Request::builder()
                .method(Method::GET)
                .uri(uri.clone())
                .body(Bytes::new())?;
            let response = self.send(request).await?;

            if !redirect::is_followed(response.status()) {
                return Ok(response);
            }
            let Some(next) = redirect::next_location(&uri, response.headers()) else {
                return Ok(response);
            };
            if hops == self.max_redirects {
                return Err(HttpError::TooManyRedirects(self.max_redirects));
            }
            hops += 1;
            debug!(from = %uri, to = %next, status = %response.status(), "following redirect");
            uri = next;
        }
    }

    async fn connect(&self, target: &Target) -> HttpResult<SendRequest<Full<Bytes>>> {
        let stream = TcpStream::connect((target.host.as_str(), target.port))
            .await
            .map_err(HttpError::Connect)?;
        if !target.secure {
            return handshake(stream).await;
        }

        let server_name = ServerName::try_from(target.host.clone())
            .map_err(|_| HttpError::ServerName(target.host.clone()))?;
        let stream = self
            .tls
            .connect(server_name, stream)
            .await
            .map_err(HttpError::Tls)?;
        handshake(stream).await
    }
}

async fn handshake<S>(stream: S) -> HttpResult<SendRequest<Full<Bytes>>>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (sender, conn) = http1::handshake(TokioIo::new(stream)).await?;

    // Drive the connection in the background; it ends once `sender` drops.
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(error = %e, "connection closed with error");
        }
    });
    Ok(sender)
}

/// Where a request goes, split out of its absolute URI.
struct Target {
    secure: bool,
    host: String,
    port: u16,
    authority: Authority,
    path: PathAndQuery,
}

impl Target {
    fn from_uri(uri: &Uri) -> HttpResult<Self> {
        let invalid = |reason: &str| HttpError::InvalidUrl {
            url: uri.to_string(),
            reason: reason.to_string(),
        };

        let secure = match uri.scheme_str() {
            Some("http") => false,
            Some("https") => true,
            Some(other) => return Err(HttpError::UnsupportedScheme(other.to_string())),
            None => return Err(invalid("missing scheme")),
        };
        let authority = uri.authority().ok_or_else(|| invalid("missing host"))?.clone();
        let host = authority
            .host()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .to_string();
        let port = authority
            .port_u16()
            .unwrap_or(if secure { 443 } else { 80 });
        let path = uri
            .path_and_query()
            .cloned()
            .unwrap_or_else(|| PathAndQuery::from_static("/"));

        Ok(Self {
            secure,
            host,
            port,
            authority,
            path,
        })
    }
}
