//! [`Transport`] over a pooled `reqwest` client.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::{CoordinationError, CoordinationResult};
use crate::transport::{Body, Request, Response, Transport};

/// Default per-request timeout if not configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP transport for the etcd v2 keys API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport whose requests time out after `request_timeout`
    /// (or [`DEFAULT_REQUEST_TIMEOUT`]).
    pub fn new(request_timeout: Option<Duration>) -> CoordinationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT))
            .build()
            .map_err(|e| CoordinationError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }

    /// Use an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[derive(Debug)]
struct HttpBody(reqwest::Response);

#[async_trait]
impl Body for HttpBody {
    async fn bytes(self: Box<Self>) -> CoordinationResult<Bytes> {
        self.0
            .bytes()
            .await
            .map_err(|e| CoordinationError::Transport(format!("failed reading response body: {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> CoordinationResult<Response> {
        debug!(method = %request.method, url = %request.url, "sending etcd request");
        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .send()
            .await
            .map_err(|e| {
                CoordinationError::Transport(format!(
                    "{} {} failed: {e}",
                    request.method, request.url
                ))
            })?;
        let status = response.status();
        debug!(%status, url = %request.url, "etcd responded");
        Ok(Response::new(status, HttpBody(response)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;

    #[test]
    fn test_build_with_default_timeout() {
        assert!(HttpTransport::new(None).is_ok());
        assert!(HttpTransport::new(Some(Duration::from_millis(250))).is_ok());
    }

    fn local_transport() -> HttpTransport {
        HttpTransport::with_client(
            reqwest::Client::builder()
                .no_proxy()
                .timeout(Duration::from_secs(5))
                .build()
                .unwrap(),
        )
    }

    /// Serve exactly one canned HTTP response and hand back the request head.
    async fn serve_once(response: &'static str) -> (Url, tokio::task::JoinHandle<String>) {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&head).into_owned()
        });
        let url = Url::parse(&format!("http://{addr}/v2/keys/constructr/demo/lock")).unwrap();
        (url, handle)
    }

    #[tokio::test]
    async fn test_send_returns_status_and_body() {
        let (url, server) = serve_once(
            "HTTP/1.1 412 Precondition Failed\r\ncontent-length: 17\r\nconnection: close\r\n\r\n{\"errorCode\":105}",
        )
        .await;
        let transport = local_transport();
        let request = Request::put(url).query("prevExist", "false").query("ttl", "6");

        let response = transport.send(request).await.unwrap();
        assert_eq!(response.status, reqwest::StatusCode::PRECONDITION_FAILED);
        let body = response.body.bytes().await.unwrap();
        assert_eq!(&body[..], br#"{"errorCode":105}"#);

        let head = server.await.unwrap();
        assert!(
            head.starts_with("PUT /v2/keys/constructr/demo/lock?prevExist=false&ttl=6 HTTP/1.1"),
            "unexpected request head: {head}"
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // bind then drop to get a port nobody listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = local_transport();
        let url = Url::parse(&format!("http://{addr}/v2/keys/constructr/demo/nodes")).unwrap();
        let err = transport.send(Request::get(url)).await.unwrap_err();
        assert!(err.is_transport());
        assert!(err.to_string().contains("GET"));
    }
}
