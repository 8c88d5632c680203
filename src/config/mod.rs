//! Typed worker configuration.
//!
//! Built once at startup from the command line, fails fast if the API URL
//! or token is missing. The token is wrapped in secrecy::SecretString so it
//! never ends up in logs.

use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use url::Url;

#[derive(Debug)]
pub struct Config {
    /// Base URL of the remote API. Only scheme, host and port are used.
    pub url: Url,
    pub token: SecretString,
    pub debug: bool,
    /// Skip TLS certificate verification for the remote API.
    pub skip_verify_ssl: bool,
    pub otel_endpoint: Option<String>,
    /// Directory that receives the per-process log file.
    pub log_dir: PathBuf,
}

impl Config {
    /// Validate the mandatory settings and build a config with defaults
    /// for everything else.
    pub fn new(url: &str, token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if url.trim().is_empty() || token.trim().is_empty() {
            return Err(Error::Config(
                "Token and URL parameters are required".to_string(),
            ));
        }
        let url = Url::parse(url)
            .map_err(|e| Error::Config(format!("invalid API url {url}: {e}")))?;
        if !url.has_host() {
            return Err(Error::Config(format!("API url {url} has no host")));
        }

        Ok(Self {
            url,
            token: SecretString::from(token),
            debug: false,
            skip_verify_ssl: false,
            otel_endpoint: None,
            log_dir: std::env::temp_dir(),
        })
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn skip_verify_ssl(mut self, skip: bool) -> Self {
        self.skip_verify_ssl = skip;
        self
    }

    pub fn otel_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.otel_endpoint = endpoint;
        self
    }

    pub fn log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Path of this process's log file inside `log_dir`.
    pub fn log_file_path(&self) -> PathBuf {
        self.log_dir
            .join(format!("catalog_worker_{}.log", std::process::id()))
    }

    /// Value for the `Authorization` header.
    pub(crate) fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }
}
