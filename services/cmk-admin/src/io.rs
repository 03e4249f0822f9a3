//! HTTP client abstraction for testability

use async_trait::async_trait;

use crate::{CmkError, Result};

/// Raw HTTP response from a request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Abstraction over HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Send a GET request to the given URL
    async fn get(&self, url: &str) -> Result<HttpResponse>;

    /// Send a POST request with a raw body
    async fn post(&self, url: &str, body: &str) -> Result<HttpResponse>;
}

/// Translate HTTP status codes into the client error taxonomy. Runs after
/// the transport call; connection-level failures never get here.
pub(crate) fn check_status(response: &HttpResponse) -> Result<()> {
    match response.status {
        200..=299 => Ok(()),
        404 => Err(CmkError::PageNotFound),
        403 => Err(CmkError::AccessDenied),
        code => Err(CmkError::HttpError(code)),
    }
}

/// Production HTTP client using reqwest
#[derive(Default)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

// Request URLs carry the automation secret, so they never go to the log;
// callers log a masked rendering instead.
#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CmkError::UrlError(format!("GET failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| CmkError::UrlError(format!("reading response body: {}", e)))?;

        tracing::debug!("GET -> {} ({} bytes)", status, body.len());
        Ok(HttpResponse { status, body })
    }

    async fn post(&self, url: &str, body: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .post(url)
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| CmkError::UrlError(format!("POST failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| CmkError::UrlError(format!("reading response body: {}", e)))?;

        tracing::debug!("POST -> {} ({} bytes)", status, body.len());
        Ok(HttpResponse { status, body })
    }
}
