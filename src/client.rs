//! Outbound HTTP to the remote API.
//!
//! [`ApiClient`] is the seam job executors talk to; [`HttpClient`] is the
//! reqwest-backed implementation that injects the bearer token and applies
//! the TLS verification policy. One client is shared by every job.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use url::Url;

use crate::config::Config;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// A request as the job executor describes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: Url,
    /// JSON body, sent with `Content-Type: application/json`.
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(url: Url) -> Self {
        Self {
            method: HttpMethod::Get,
            url,
            body: None,
        }
    }

    pub fn post(url: Url, body: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url,
            body: Some(body),
        }
    }
}

/// Status and raw body of a response. Any status is returned here; deciding
/// what counts as success is the caller's business.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

/// reqwest-backed [`ApiClient`].
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    authorization: HeaderValue,
}

impl HttpClient {
    pub fn new(config: &Config) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.skip_verify_ssl)
            .build()?;

        let mut authorization = HeaderValue::from_str(&config.bearer())
            .map_err(|e| Error::Config(format!("token is not a valid header value: {e}")))?;
        authorization.set_sensitive(true);

        Ok(Self {
            inner,
            authorization,
        })
    }
}

#[async_trait]
impl ApiClient for HttpClient {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let builder = match request.method {
            HttpMethod::Get => self.inner.get(request.url),
            HttpMethod::Post => self.inner.post(request.url),
        };
        let mut builder = builder.header(AUTHORIZATION, self.authorization.clone());
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;
        Ok(ApiResponse::new(status, body.to_vec()))
    }
}
