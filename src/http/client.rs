//! `reqwest` backed implementation of [`HttpClient`].

use super::{HttpClient, HttpResponse, UrlSpec};
use crate::error::{Result, SensorError};
use async_trait::async_trait;
use log::debug;
use std::time::Duration;

/// Applied when `getUrl` sets no timeout, so a silent server can't stall the
/// pull timer.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for querying the sensor endpoint.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    /// Wrap an already configured `reqwest::Client`.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            default_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn request(&self, spec: &UrlSpec) -> Result<HttpResponse> {
        debug!("{} {}", spec.method, spec.url);

        let mut request = self.client.request(spec.method.clone(), spec.url.clone());
        for (name, value) in &spec.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &spec.body {
            request = request.body(body.clone());
        }
        request = request.timeout(spec.timeout.unwrap_or(self.default_timeout));

        let response = request
            .send()
            .await
            .map_err(|e| SensorError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| SensorError::Transport(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_returns_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/door"))
            .respond_with(ResponseTemplate::new(200).set_body_string("door: opened"))
            .expect(1)
            .mount(&server)
            .await;

        let spec = UrlSpec::get(&format!("{}/door", server.uri())).unwrap();
        let response = ReqwestClient::new().request(&spec).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, "door: opened");
    }

    #[tokio::test]
    async fn test_error_status_is_not_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let spec = UrlSpec::get(&server.uri()).unwrap();
        let response = ReqwestClient::new().request(&spec).await.unwrap();
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn test_sends_method_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(header("x-token", "abc"))
            .and(body_string("which=door"))
            .respond_with(ResponseTemplate::new(200).set_body_string("closed"))
            .expect(1)
            .mount(&server)
            .await;

        let mut spec = UrlSpec::get(&format!("{}/query", server.uri())).unwrap();
        spec.method = reqwest::Method::POST;
        spec.headers.insert("x-token".to_string(), "abc".to_string());
        spec.body = Some("which=door".to_string());

        let response = ReqwestClient::new().request(&spec).await.unwrap();
        assert_eq!(response.body, "closed");
    }

    #[tokio::test]
    async fn test_timeout_maps_to_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let mut spec = UrlSpec::get(&server.uri()).unwrap();
        spec.timeout = Some(Duration::from_millis(50));

        let result = ReqwestClient::new().request(&spec).await;
        assert!(matches!(result, Err(SensorError::Transport(_))));
    }

    #[tokio::test]
    async fn test_default_timeout_applies_without_url_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let spec = UrlSpec::get(&server.uri()).unwrap();
        assert!(spec.timeout.is_none());

        let client = ReqwestClient::new().with_default_timeout(Duration::from_millis(50));
        let result = client.request(&spec).await;
        assert!(matches!(result, Err(SensorError::Transport(_))));
    }

    #[tokio::test]
    async fn test_url_timeout_overrides_default() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("door: closed")
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;

        let mut spec = UrlSpec::get(&server.uri()).unwrap();
        spec.timeout = Some(Duration::from_secs(5));

        let client = ReqwestClient::new().with_default_timeout(Duration::from_millis(50));
        let response = client.request(&spec).await.unwrap();
        assert_eq!(response.body, "door: closed");
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(ReqwestClient::new().default_timeout, DEFAULT_REQUEST_TIMEOUT);
    }
}
