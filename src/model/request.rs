//! Incoming request envelope and job descriptions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// The message the platform controller sends to the worker: who is asking,
/// which message we answer, and the jobs to run. Missing fields default to
/// empty values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestMessage {
    pub account: String,
    pub sender: String,
    pub message_id: String,
    pub payload: RequestPayload,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestPayload {
    #[serde(default, deserialize_with = "null_as_default")]
    pub jobs: Vec<JobParam>,
}

/// One unit of remote API work. Missing or null fields take their zero
/// value, so a malformed job fails on its own instead of the request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JobParam {
    /// get | post | monitor, any case. Kept as text so an unknown method
    /// fails the job instead of the whole request.
    #[serde(deserialize_with = "null_as_default")]
    pub method: String,

    /// Path plus query, resolved against the configured API host.
    #[serde(deserialize_with = "null_as_default")]
    pub href_slug: String,

    #[serde(deserialize_with = "null_as_default")]
    pub fetch_all_pages: bool,

    /// Query parameter overrides for GET/monitor; the JSON body for POST.
    #[serde(deserialize_with = "null_as_default")]
    pub params: Map<String, Value>,

    /// "gzip" or empty.
    #[serde(deserialize_with = "null_as_default")]
    pub accept_encoding: String,

    pub apply_filter: Option<ApplyFilter>,

    /// Seconds between monitor polls. Zero means the default of 10.
    #[serde(deserialize_with = "null_as_default")]
    pub refresh_interval_seconds: i64,
}

impl JobParam {
    pub fn new(method: impl Into<String>, href_slug: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            href_slug: href_slug.into(),
            ..Default::default()
        }
    }

    pub fn fetch_all_pages(mut self, all: bool) -> Self {
        self.fetch_all_pages = all;
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn gzip(mut self) -> Self {
        self.accept_encoding = "gzip".to_string();
        self
    }

    pub fn filter(mut self, filter: ApplyFilter) -> Self {
        self.apply_filter = Some(filter);
        self
    }

    pub fn refresh_interval(mut self, seconds: i64) -> Self {
        self.refresh_interval_seconds = seconds;
        self
    }

    /// Whether the response body should be gzip+base64 encoded.
    pub fn wants_gzip(&self) -> bool {
        self.accept_encoding == "gzip"
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `apply_filter` arrives either as a ready JMESPath expression or as a
/// mapping of output key to source path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ApplyFilter {
    Expression(String),
    FieldMap(Map<String, Value>),
}

// ---------------------------------------------------------------------------
// Method
// ---------------------------------------------------------------------------

/// The operations a job can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Monitor,
}

impl Method {
    /// Case-insensitive parse. Anything else is `UnsupportedMethod`.
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "get" => Ok(Method::Get),
            "post" => Ok(Method::Post),
            "monitor" => Ok(Method::Monitor),
            _ => Err(Error::UnsupportedMethod(raw.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "get",
            Method::Post => "post",
            Method::Monitor => "monitor",
        }
    }
}
