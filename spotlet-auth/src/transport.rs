//! HTTP transport for the token endpoint
//!
//! The credential manager builds a complete [`TokenRequest`] (URL, headers,
//! form body) and hands it to a [`TokenTransport`]. No retry happens at this
//! layer.

use crate::error::{AuthError, Result};
use async_trait::async_trait;
use std::time::Duration;

const USER_AGENT: &str = concat!("spotlet/", env!("CARGO_PKG_VERSION"));

/// Form-encoded POST to the token endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub form: Vec<(String, String)>,
}

impl TokenRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn form_value(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Sends token requests and returns the raw response body
#[async_trait]
pub trait TokenTransport: Send + Sync {
    async fn post_form(&self, request: &TokenRequest) -> Result<Vec<u8>>;
}

/// reqwest-backed transport
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        Ok(Self { http_client })
    }
}

#[async_trait]
impl TokenTransport for ReqwestTransport {
    async fn post_form(&self, request: &TokenRequest) -> Result<Vec<u8>> {
        let mut builder = self.http_client.post(&request.url).form(&request.form);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        tracing::debug!(url = %request.url, "POST token endpoint");

        let response = builder
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}
