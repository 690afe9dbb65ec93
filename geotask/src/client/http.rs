//! HTTP client abstraction for testability.
//!
//! The submit/poll/download stages talk to the geoprocessing service through
//! the [`HttpClient`] trait so tests can inject a scripted mock instead of a
//! live server. [`ReqwestHttpClient`] is the production implementation.
//!
//! Status handling stays with the callers: a non-2xx response is returned,
//! not converted to an error here, because the submitter needs to tell 4xx
//! (fatal) from 5xx (retryable).

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use tracing::{debug, trace, warn};

use super::types::{Auth, ClientError};

/// User-Agent sent with every request to the geoprocessing service.
const USER_AGENT: &str = "geotask/0.2";

/// A buffered (non-streaming) HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Complete response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body decoded as UTF-8, lossily.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A streaming HTTP response for artifact downloads.
pub struct StreamingResponse {
    /// HTTP status code.
    pub status: u16,
    /// Declared `Content-Length`, when the server sent one.
    pub content_length: Option<u64>,
    /// Response body chunks.
    pub body: BoxStream<'static, Result<Bytes, ClientError>>,
}

/// Async HTTP operations needed by the task client.
pub trait HttpClient: Send + Sync {
    /// POSTs a URL-encoded form and buffers the response.
    fn post_form(
        &self,
        url: &str,
        auth: &Auth,
        form: &[(String, String)],
    ) -> impl Future<Output = Result<HttpResponse, ClientError>> + Send;

    /// POSTs with an empty body (job status queries) and buffers the
    /// response.
    fn post(
        &self,
        url: &str,
        auth: &Auth,
    ) -> impl Future<Output = Result<HttpResponse, ClientError>> + Send;

    /// GETs a URL and exposes the body as a chunk stream.
    fn get_stream(
        &self,
        url: &str,
        auth: &Auth,
    ) -> impl Future<Output = Result<StreamingResponse, ClientError>> + Send;
}

/// Production HTTP client backed by reqwest.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Creates a client with the given connect and overall request timeouts.
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClientError::Transient(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn apply_headers(&self, request: reqwest::RequestBuilder, auth: &Auth) -> reqwest::RequestBuilder {
        request
            .header("Authorization", auth.header_value())
            .header("Accept", "application/json")
    }
}

impl HttpClient for ReqwestHttpClient {
    async fn post_form(
        &self,
        url: &str,
        auth: &Auth,
        form: &[(String, String)],
    ) -> Result<HttpResponse, ClientError> {
        trace!(url, "HTTP POST (form) starting");
        let response = self
            .apply_headers(self.client.post(url), auth)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                warn!(url, error = %e, "HTTP POST failed");
                ClientError::Transient(format!("request failed: {}", e))
            })?;

        let status = response.status().as_u16();
        debug!(url, status, "HTTP POST response received");
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transient(format!("failed to read response: {}", e)))?
            .to_vec();
        Ok(HttpResponse { status, body })
    }

    async fn post(&self, url: &str, auth: &Auth) -> Result<HttpResponse, ClientError> {
        trace!(url, "HTTP POST starting");
        let response = self
            .apply_headers(self.client.post(url), auth)
            .send()
            .await
            .map_err(|e| {
                warn!(url, error = %e, "HTTP POST failed");
                ClientError::Transient(format!("request failed: {}", e))
            })?;

        let status = response.status().as_u16();
        debug!(url, status, "HTTP POST response received");
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transient(format!("failed to read response: {}", e)))?
            .to_vec();
        Ok(HttpResponse { status, body })
    }

    async fn get_stream(&self, url: &str, auth: &Auth) -> Result<StreamingResponse, ClientError> {
        trace!(url, "HTTP GET (stream) starting");
        let response = self
            .apply_headers(self.client.get(url), auth)
            .send()
            .await
            .map_err(|e| {
                warn!(url, error = %e, "HTTP GET failed");
                ClientError::Transient(format!("request failed: {}", e))
            })?;

        let status = response.status().as_u16();
        let content_length = response.content_length();
        debug!(url, status, content_length, "HTTP GET response received");

        let body = response
            .bytes_stream()
            .map(|chunk| {
                chunk.map_err(|e| ClientError::Transient(format!("stream read failed: {}", e)))
            })
            .boxed();

        Ok(StreamingResponse {
            status,
            content_length,
            body,
        })
    }
}
