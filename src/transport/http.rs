//! HTTP transport backed by reqwest
//!
//! Request paths are resolved against a base URL, so a base of
//! `http://host/api` and a path of `/users` call `http://host/api/users`.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::errors::ContractError;

use super::{HttpRequest, HttpResponse, HttpTransport, TransportError};

/// Real HTTP transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base: Url,
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport for a base URL
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to create HTTP client")?;

        Self::with_client(base_url, client)
    }

    /// Create with custom reqwest client (for testing or custom TLS)
    pub fn with_client(base_url: &str, client: reqwest::Client) -> Result<Self> {
        let base = parse_base_url(base_url)?;
        Ok(Self { base, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Absolute URL for a request path
    pub fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::InvalidRequest(format!("bad path '{}': {}", path, e)))
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ContractError> {
    let invalid = |message: String| ContractError::InvalidBaseUrl {
        url: raw.to_string(),
        message,
    };

    let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn classify(err: reqwest::Error, timeout: Duration) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(timeout)
    } else if err.is_connect() {
        TransportError::Connection(err.to_string())
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn call(
        &self,
        request: &HttpRequest,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let url = self.url_for(&request.path)?;
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let mut builder = self.client.request(method, url).timeout(timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            if request.header(CONTENT_TYPE.as_str()).is_none() {
                builder = builder.header(CONTENT_TYPE, "application/json");
            }
            builder = builder.body(body.clone());
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|e| classify(e, timeout))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(timeout)
            } else {
                TransportError::InvalidResponse(e.to_string())
            }
        })?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::trace!("{} {} -> {} in {}ms", request.method, request.path, status, elapsed_ms);

        Ok(HttpResponse {
            status,
            headers,
            body,
            elapsed_ms,
        })
    }

    fn transport_type(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::HttpMethod;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn joins_paths_under_base_path() {
        let transport = ReqwestTransport::new("http://localhost:8080/api").unwrap();
        assert_eq!(
            transport.url_for("/users/1").unwrap().as_str(),
            "http://localhost:8080/api/users/1"
        );
        assert_eq!(
            transport.url_for("users").unwrap().as_str(),
            "http://localhost:8080/api/users"
        );
    }

    #[test]
    fn rejects_bad_base_urls() {
        assert!(ReqwestTransport::new("not a url").is_err());
        assert!(ReqwestTransport::new("ftp://example.com").is_err());
    }

    #[test]
    fn transport_type_is_http() {
        let transport = ReqwestTransport::new("http://localhost").unwrap();
        assert_eq!(transport.transport_type(), "http");
    }

    /// Serve one canned HTTP response and return what the client sent
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });
        (base, handle)
    }

    #[tokio::test]
    async fn sends_request_and_reads_response() {
        let (base, server) = serve_once(
            "HTTP/1.1 422 Unprocessable Entity\r\ncontent-type: application/json\r\ncontent-length: 13\r\nconnection: close\r\n\r\n{\"error\":\"x\"}",
        )
        .await;

        let transport = ReqwestTransport::new(&base).unwrap();
        let request = HttpRequest::new(HttpMethod::Post, "/items")
            .with_header("X-Test", "1")
            .with_body(r#"{"id":1}"#);
        let response = transport
            .call(&request, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(response.status, 422);
        assert_eq!(response.body, r#"{"error":"x"}"#);

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /items HTTP/1.1"));
        assert!(raw.to_lowercase().contains("x-test: 1"));
        assert!(raw.to_lowercase().contains("content-type: application/json"));
    }

    #[tokio::test]
    async fn refused_connection_is_a_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let transport = ReqwestTransport::new(&format!("http://{}", addr)).unwrap();
        let request = HttpRequest::new(HttpMethod::Get, "/");
        let err = transport
            .call(&request, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Connection(_)));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let transport = ReqwestTransport::new(&base).unwrap();
        let request = HttpRequest::new(HttpMethod::Get, "/slow");
        let err = transport
            .call(&request, Duration::from_millis(200))
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Timeout(Duration::from_millis(200)));
    }
}
