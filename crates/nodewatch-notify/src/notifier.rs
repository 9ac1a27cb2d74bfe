//! Delivery sinks.
//!
//! A [`Notifier`] delivers one text to one recipient. Failures are
//! reported per call and never affect other deliveries.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Method, Request, Uri};
use tracing::{debug, info};

use nodewatch_core::RecipientId;
use nodewatch_http::HttpClient;

use crate::error::{NotifyError, NotifyResult};

/// Boxed future returned by [`Notifier::send`].
pub type NotifyFuture<'a> = Pin<Box<dyn Future<Output = NotifyResult<()>> + Send + 'a>>;

/// Outbound message sink.
pub trait Notifier: Send + Sync {
    fn send<'a>(&'a self, recipient: RecipientId, text: &'a str) -> NotifyFuture<'a>;
}

/// Writes every delivery to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send<'a>(&'a self, recipient: RecipientId, text: &'a str) -> NotifyFuture<'a> {
        Box::pin(async move {
            info!(recipient, %text, "notification");
            Ok(())
        })
    }
}

/// Posts `{"chat_id": <id>, "text": "..."}` to an HTTP endpoint.
///
/// The body matches the chat Bot-API `sendMessage` call, so the URL can
/// point straight at that API over `https://` or at a plain-http relay.
/// Any non-2xx answer is a failure. Redirects are not followed.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    uri: Uri,
    client: HttpClient,
    timeout: Duration,
}

impl WebhookNotifier {
    /// Create a notifier for an `http://` or `https://` URL.
    pub fn new(url: &str, client: HttpClient, timeout: Duration) -> NotifyResult<Self> {
        let invalid = |reason: &str| NotifyError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
        if !matches!(uri.scheme_str(), Some("http" | "https")) {
            return Err(invalid("expected an http:// or https:// URL"));
        }
        if uri.authority().is_none() {
            return Err(invalid("missing host"));
        }

        Ok(Self {
            uri,
            client,
            timeout,
        })
    }

    async fn post(&self, body: Vec<u8>) -> NotifyResult<()> {
        let req = Request::builder()
            .method(Method::POST)
            .uri(self.uri.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(Bytes::from(body))?;

        let resp = self.client.send(req).await?;
        if !resp.status().is_success() {
            return Err(NotifyError::Status(resp.status()));
        }
        Ok(())
    }
}

impl Notifier for WebhookNotifier {
    fn send<'a>(&'a self, recipient: RecipientId, text: &'a str) -> NotifyFuture<'a> {
        Box::pin(async move {
            let body = serde_json::to_vec(&serde_json::json!({
                "chat_id": recipient,
                "text": text,
            }))?;

            match tokio::time::timeout(self.timeout, self.post(body)).await {
                Ok(result) => {
                    if result.is_ok() {
                        debug!(recipient, uri = %self.uri, "webhook delivered");
                    }
                    result
                }
                Err(_) => Err(NotifyError::Timeout(self.timeout)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodewatch_http::HttpError;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::sync::oneshot;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn client() -> HttpClient {
        HttpClient::new().unwrap()
    }

    /// Read one HTTP request (headers plus content-length body).
    async fn read_request(stream: &mut TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = stream.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&data).to_string();
            if let Some(split) = text.find("\r\n\r\n") {
                let content_length = text[..split]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= split + 4 + content_length {
                    return text;
                }
            }
        }
        String::from_utf8_lossy(&data).to_string()
    }

    /// Answer one request with `status_line`; hands back the raw request.
    async fn serve_once(status_line: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();
        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let request = read_request(&mut stream).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
                let _ = tx.send(request);
            }
        });
        (format!("http://{addr}/bot/sendMessage"), rx)
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        assert!(LogNotifier.send(1, "hello").await.is_ok());
    }

    #[tokio::test]
    async fn webhook_posts_json_payload() {
        let (url, request) = serve_once("200 OK").await;
        let notifier = WebhookNotifier::new(&url, client(), TIMEOUT).unwrap();

        notifier.send(42, "⚠️ node1: dashboard=FAIL, tcp=OK").await.unwrap();

        let request = request.await.unwrap();
        assert!(request.starts_with("POST /bot/sendMessage HTTP/1.1"));
        let body = request.split("\r\n\r\n").nth(1).unwrap();
        let json: serde_json::Value = serde_json::from_str(body).unwrap();
        assert_eq!(json["chat_id"], 42);
        assert_eq!(json["text"], "⚠️ node1: dashboard=FAIL, tcp=OK");
    }

    #[tokio::test]
    async fn webhook_non_2xx_is_error() {
        let (url, _request) = serve_once("500 Internal Server Error").await;
        let notifier = WebhookNotifier::new(&url, client(), TIMEOUT).unwrap();

        let err = notifier.send(1, "x").await.unwrap_err();
        assert!(matches!(err, NotifyError::Status(s) if s.as_u16() == 500));
    }

    #[tokio::test]
    async fn webhook_connection_refused_is_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let notifier = WebhookNotifier::new(&format!("http://127.0.0.1:{port}/"), client(), TIMEOUT).unwrap();
        assert!(matches!(
            notifier.send(1, "x").await,
            Err(NotifyError::Http(HttpError::Connect(_)))
        ));
    }

    #[test]
    fn webhook_accepts_https_urls() {
        let notifier =
            WebhookNotifier::new("https://api.example.org/bot123/sendMessage", client(), TIMEOUT)
                .unwrap();
        assert_eq!(notifier.uri.scheme_str(), Some("https"));
    }

    #[test]
    fn webhook_rejects_non_http_urls() {
        for url in ["ftp://example.com/hook", "not a url", "/relative"] {
            assert!(
                matches!(
                    WebhookNotifier::new(url, client(), TIMEOUT),
                    Err(NotifyError::InvalidUrl { .. })
                ),
                "{url} should be rejected"
            );
        }
    }
}
