use std::time::Duration;

use indexden_core::ClientConfig;
use reqwest::{Client as HttpClient, Method, Url};

use crate::{ClientError, Result};

/// One HTTP exchange as described by the client
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub uri: Url,
    pub body: Option<serde_json::Value>,
    /// Parse the response body as JSON
    pub expect_json: bool,
}

/// Response body handed back by a transport
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Json(serde_json::Value),
    Text(String),
}

/// Transport carries requests to the service
///
/// Implementations report non-2xx answers as [`ClientError::Server`] and
/// network failures as [`ClientError::Request`]; timeouts and cancellation are
/// theirs to define.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// reqwest-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: HttpClient,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: HttpClient::new(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.clone())
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()?;
        Ok(Self { client })
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut builder = self.client.request(request.method, request.uri);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status, %message, "Service returned an error status");
            return Err(ClientError::Server { status, message });
        }

        let text = response.text().await?;
        if request.expect_json && !text.trim().is_empty() {
            let value = serde_json::from_str(&text).map_err(ClientError::Decode)?;
            return Ok(ApiResponse::Json(value));
        }
        Ok(ApiResponse::Text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port, return the request URL
    async fn serve_once(response: &'static str) -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let _ = socket.read(&mut buf).await;
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
        });
        Url::parse(&format!("http://{}/v1/indexes/test", addr)).unwrap()
    }

    fn get(uri: Url, expect_json: bool) -> ApiRequest {
        ApiRequest {
            method: Method::GET,
            uri,
            body: None,
            expect_json,
        }
    }

    #[tokio::test]
    async fn test_error_status_becomes_server_error() {
        let uri = serve_once(
            "HTTP/1.1 503 Service Unavailable\r\nContent-Length: 11\r\nConnection: close\r\n\r\nunavailable",
        )
        .await;
        let err = HttpTransport::new().execute(get(uri, true)).await.unwrap_err();
        match &err {
            ClientError::Server { status, message } => {
                assert_eq!(*status, 503);
                assert_eq!(message, "unavailable");
            }
            other => panic!("expected server error, got {:?}", other),
        }
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[tokio::test]
    async fn test_non_json_body_is_decode_error() {
        let uri = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 8\r\nConnection: close\r\n\r\nnot json",
        )
        .await;
        let err = HttpTransport::new().execute(get(uri, true)).await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
        assert_eq!(err.kind(), ErrorKind::Decoding);
    }

    #[tokio::test]
    async fn test_empty_body_is_empty_text() {
        let uri =
            serve_once("HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n").await;
        let response = HttpTransport::new().execute(get(uri, true)).await.unwrap();
        assert_eq!(response, ApiResponse::Text(String::new()));
    }

    #[tokio::test]
    async fn test_json_body_is_parsed() {
        let uri = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 15\r\nConnection: close\r\n\r\n{\"added\": true}",
        )
        .await;
        let response = HttpTransport::new().execute(get(uri, true)).await.unwrap();
        assert_eq!(response, ApiResponse::Json(serde_json::json!({"added": true})));
    }

    #[tokio::test]
    async fn test_body_kept_as_text_without_expect_json() {
        let uri = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 8\r\nConnection: close\r\n\r\nnot json",
        )
        .await;
        let response = HttpTransport::new().execute(get(uri, false)).await.unwrap();
        assert_eq!(response, ApiResponse::Text("not json".to_string()));
    }

    #[tokio::test]
    async fn test_refused_connection_is_request_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let uri = Url::parse(&format!("http://{}/v1/indexes", addr)).unwrap();
        let err = HttpTransport::new().execute(get(uri, true)).await.unwrap_err();
        assert!(matches!(err, ClientError::Request(_)));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_from_config_builds() {
        let mut config = ClientConfig::new("http://host:9999");
        config.timeout_ms = 500;
        config.insecure_skip_verify = true;
        assert!(HttpTransport::from_config(&config).is_ok());
    }
}
