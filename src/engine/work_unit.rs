//! Job executor: one job's lifecycle against the remote API.
//!
//! Resolves the job's URL against the configured host, runs the method
//! (paged GET, POST, or monitor polling), pushes every response through
//! filter and artifact sanctifying, encodes it, and sends result items to
//! the responder. A failing job reports exactly one code=1 item.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use opentelemetry::KeyValue;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{Span, debug, error, info, warn};
use url::Url;

use crate::artifacts;
use crate::client::{ApiClient, ApiRequest, ApiResponse};
use crate::codec;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::model::{JobParam, Method, ResponseData, ResponsePayload};
use crate::telemetry::metrics;
use crate::telemetry::work::record_state_transition;

/// Statuses the remote API answers with that count as success.
const SUCCESS_CODES: [u16; 3] = [200, 201, 202];

/// Poll interval used when a monitor job doesn't set one.
pub const DEFAULT_REFRESH_INTERVAL_SECONDS: u64 = 10;

// ---------------------------------------------------------------------------
// Work handler
// ---------------------------------------------------------------------------

/// Runs one job and sends its result items to `channel`.
///
/// Implementations must send at least one item per job, including on
/// failure. The returned error is for the caller's logs only.
#[async_trait]
pub trait WorkHandler: Send + Sync {
    async fn start_work(
        &self,
        job: JobParam,
        channel: mpsc::Sender<ResponsePayload>,
    ) -> Result<()>;
}

/// The production handler: executes jobs against the remote API.
pub struct DefaultApiWorker {
    config: Arc<Config>,
    client: Arc<dyn ApiClient>,
}

impl DefaultApiWorker {
    pub fn new(config: Arc<Config>, client: Arc<dyn ApiClient>) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl WorkHandler for DefaultApiWorker {
    async fn start_work(
        &self,
        job: JobParam,
        channel: mpsc::Sender<ResponsePayload>,
    ) -> Result<()> {
        let started = Instant::now();
        let href_slug = job.href_slug.clone();
        let method = Method::parse(&job.method).map_or("unknown", Method::as_str);
        metrics::jobs_started().add(1, &[KeyValue::new("method", method)]);

        let result = match WorkUnit::new(&self.config.url, job, Arc::clone(&self.client), channel.clone())
        {
            Ok(unit) => unit.dispatch().await,
            Err(e) => Err(e),
        };

        if let Err(ref e) = result {
            error!(href_slug = %href_slug, error = %e, "job failed");
            if !matches!(e, Error::ChannelClosed) {
                let item = ResponsePayload::error(&href_slug, e.diagnostic(), e.status());
                if channel.send(item).await.is_err() {
                    warn!(href_slug = %href_slug, "responder gone, failure not reported");
                }
            }
        }

        metrics::jobs_finished().add(
            1,
            &[
                KeyValue::new("method", method),
                KeyValue::new("result", if result.is_ok() { "ok" } else { "error" }),
            ],
        );
        metrics::job_duration_ms().record(
            started.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("method", method)],
        );
        result
    }
}

// ---------------------------------------------------------------------------
// Monitor states
// ---------------------------------------------------------------------------

/// Status values a polled remote job can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStatus {
    New,
    Pending,
    Waiting,
    Running,
    Successful,
    Failed,
    Error,
    Canceled,
}

impl RemoteStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        let status = match raw {
            "new" => RemoteStatus::New,
            "pending" => RemoteStatus::Pending,
            "waiting" => RemoteStatus::Waiting,
            "running" => RemoteStatus::Running,
            "successful" => RemoteStatus::Successful,
            "failed" => RemoteStatus::Failed,
            "error" => RemoteStatus::Error,
            "canceled" => RemoteStatus::Canceled,
            _ => return None,
        };
        Some(status)
    }

    /// Has the remote job stopped? Terminal statuses end the poll loop.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RemoteStatus::Successful
                | RemoteStatus::Failed
                | RemoteStatus::Error
                | RemoteStatus::Canceled
        )
    }
}

/// Where a monitor job is in its poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Polling,
    Completed,
    Failed,
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MonitorState::Polling => "polling",
            MonitorState::Completed => "completed",
            MonitorState::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Read the `status` field of a polled body.
pub fn remote_status(body: &Value) -> Result<RemoteStatus> {
    let status = body.get("status").ok_or(Error::MissingStatus)?;
    let text = match status {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    RemoteStatus::parse(&text).ok_or(Error::UnknownStatus(text))
}

// ---------------------------------------------------------------------------
// Work unit
// ---------------------------------------------------------------------------

/// State of one executing job. Nothing in here is shared with other jobs.
pub struct WorkUnit {
    client: Arc<dyn ApiClient>,
    job: JobParam,
    filter: Option<Filter>,
    /// Target URL without its query string.
    target: Url,
    /// Query parameters, multi-valued, kept sorted by key.
    query: BTreeMap<String, Vec<String>>,
    channel: mpsc::Sender<ResponsePayload>,
}

impl WorkUnit {
    /// Resolve the job's URL and filter. Fails on an unparseable slug or a
    /// filter that doesn't compile.
    pub fn new(
        host: &Url,
        job: JobParam,
        client: Arc<dyn ApiClient>,
        channel: mpsc::Sender<ResponsePayload>,
    ) -> Result<Self> {
        let filter = job.apply_filter.as_ref().map(Filter::parse).transpose()?;
        let (target, query) = resolve_url(host, &job.href_slug)?;
        Ok(Self {
            client,
            job,
            filter,
            target,
            query,
            channel,
        })
    }

    /// Run the job's method to completion.
    pub async fn dispatch(mut self) -> Result<()> {
        match Method::parse(&self.job.method)? {
            Method::Get => self.get().await,
            Method::Post => self.post().await,
            Method::Monitor => self.monitor().await,
        }
    }

    async fn get(&mut self) -> Result<()> {
        let resp = self.get_page().await?;
        let body = self.shape(decode(&resp)?)?;
        let mut more = self.job.fetch_all_pages && has_next_page(&body);
        self.send_response(&body, resp.status).await?;

        let mut page: u64 = 2;
        while more {
            self.job
                .params
                .insert("page".to_string(), Value::String(page.to_string()));
            let resp = self.get_page().await?;
            let body = self.shape(decode(&resp)?)?;
            more = has_next_page(&body);
            self.send_response(&body, resp.status).await?;
            page += 1;
        }
        Ok(())
    }

    async fn post(&mut self) -> Result<()> {
        let payload = Value::Object(self.job.params.clone());
        let resp = self
            .send_request(ApiRequest::post(self.current_url(), payload))
            .await?;
        let body = self.shape(decode(&resp)?)?;
        self.send_response(&body, resp.status).await
    }

    async fn monitor(&mut self) -> Result<()> {
        let interval = match u64::try_from(self.job.refresh_interval_seconds) {
            Ok(secs) if secs > 0 => secs,
            _ => DEFAULT_REFRESH_INTERVAL_SECONDS,
        };
        let span = Span::current();
        record_state_transition(&span, "started", &MonitorState::Polling.to_string());

        match self.poll_until_done(Duration::from_secs(interval)).await {
            Ok((body, status)) => {
                record_state_transition(
                    &span,
                    &MonitorState::Polling.to_string(),
                    &MonitorState::Completed.to_string(),
                );
                self.send_response(&body, status).await
            }
            Err(e) => {
                record_state_transition(
                    &span,
                    &MonitorState::Polling.to_string(),
                    &MonitorState::Failed.to_string(),
                );
                Err(e)
            }
        }
    }

    /// Poll until the remote job reports a terminal status. There is no
    /// attempt limit; only a terminal status or an error ends the loop.
    /// The status is read after filtering, so the filter must keep it.
    async fn poll_until_done(&mut self, interval: Duration) -> Result<(Value, u16)> {
        loop {
            let resp = self.get_page().await?;
            let body = self.shape(decode(&resp)?)?;
            let status = remote_status(&body)?;
            if status.is_terminal() {
                return Ok((body, resp.status));
            }
            debug!(?status, interval_secs = interval.as_secs(), "remote job still in progress");
            tokio::time::sleep(interval).await;
        }
    }

    // -- HTTP ---------------------------------------------------------------

    async fn get_page(&mut self) -> Result<ApiResponse> {
        self.override_query_params();
        self.send_request(ApiRequest::get(self.current_url())).await
    }

    async fn send_request(&self, request: ApiRequest) -> Result<ApiResponse> {
        let method = request.method.as_str();
        let url = request.url.to_string();
        let resp = self.client.execute(request).await?;
        info!("{method} {url} Status {}", resp.status);
        metrics::http_requests().add(
            1,
            &[
                KeyValue::new("method", method),
                KeyValue::new("status", i64::from(resp.status)),
            ],
        );

        if !SUCCESS_CODES.contains(&resp.status) {
            return Err(Error::Http {
                method,
                status: resp.status,
                body: resp.body_text(),
            });
        }
        Ok(resp)
    }

    /// Overlay the job's `params` on the query taken from the slug.
    fn override_query_params(&mut self) {
        for (key, value) in &self.job.params {
            match query_value(value) {
                Some(text) => {
                    self.query.insert(key.clone(), vec![text]);
                }
                None => info!(key = %key, value = %value, "unsupported parameter type, skipping"),
            }
        }
        for (key, values) in &self.query {
            debug!(key = %key, value = ?values.first(), "query parameter");
        }
    }

    fn current_url(&self) -> Url {
        let mut url = self.target.clone();
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, values) in &self.query {
                for value in values {
                    pairs.append_pair(key, value);
                }
            }
        }
        url
    }

    // -- Responses ----------------------------------------------------------

    /// Filter and sanctify a decoded body. Paging and status checks read
    /// the result, and it is what gets sent.
    fn shape(&self, body: Value) -> Result<Value> {
        let body = match &self.filter {
            Some(filter) => filter.apply(body)?,
            None => body,
        };
        artifacts::sanctify_body(body)
    }

    /// Encode and send one shaped response.
    async fn send_response(&self, body: &Value, status: u16) -> Result<()> {
        let (encoding, text) = codec::encode_body(body, self.job.wants_gzip())?;

        debug!(href_slug = %self.job.href_slug, "sending response");
        self.channel
            .send(ResponsePayload::data(ResponseData {
                href_slug: self.job.href_slug.clone(),
                encoding,
                body: text,
                status,
            }))
            .await
            .map_err(|_| Error::ChannelClosed)
    }
}

/// Point `href_slug` at the configured host and split off its query.
fn resolve_url(host: &Url, href_slug: &str) -> Result<(Url, BTreeMap<String, Vec<String>>)> {
    let invalid = |source| Error::InvalidUrl {
        url: href_slug.to_string(),
        source,
    };
    let mut target = host.join(href_slug).map_err(invalid)?;

    if target.scheme() != host.scheme() && target.set_scheme(host.scheme()).is_err() {
        return Err(Error::Other(format!(
            "cannot retarget {href_slug} to scheme {}",
            host.scheme()
        )));
    }
    target.set_host(host.host_str()).map_err(invalid)?;
    target
        .set_port(host.port())
        .map_err(|_| Error::Other(format!("cannot retarget {href_slug} to {host}")))?;

    let mut query: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in target.query_pairs() {
        query
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    target.set_query(None);
    Ok((target, query))
}

fn decode(resp: &ApiResponse) -> Result<Value> {
    Ok(serde_json::from_slice(&resp.body)?)
}

/// Another page exists while `next` is a string.
fn has_next_page(body: &Value) -> bool {
    matches!(body.get("next"), Some(Value::String(_)))
}

/// Render a parameter value for the query string. `None` for types that
/// have no query form.
fn query_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                n.as_f64().map(scientific)
            }
        }
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Shortest round-trip mantissa with a signed, two-digit exponent:
/// `1.5E+00`, `1E+02`, `-2.5E-07`.
fn scientific(f: f64) -> String {
    let raw = format!("{f:E}");
    match raw.split_once('E') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}E{sign}{:02}", exp.abs())
        }
        None => raw,
    }
}
