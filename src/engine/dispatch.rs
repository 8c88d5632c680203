//! Dispatcher: reads the request, fans jobs out, and waits for the stream
//! to be terminated.
//!
//! One responder task and one task per job share a single result channel.
//! Once every job task has finished, the dispatcher pushes the eof item and
//! waits for the responder to write it.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Instrument, debug, error, info};

use super::responder::Responder;
use super::work_unit::WorkHandler;
use crate::error::{Error, Result};
use crate::model::{RequestMessage, ResponseHeader, ResponsePayload};
use crate::telemetry::work::{start_job_span, start_request_span};

/// Capacity of the result channel: the smallest bounded capacity tokio
/// offers.
const RESULT_CHANNEL_CAPACITY: usize = 1;

pub struct Dispatcher {
    handler: Arc<dyn WorkHandler>,
    /// Logging handle attached to every task the dispatcher spawns.
    log: Dispatch,
}

impl Dispatcher {
    pub fn new(handler: Arc<dyn WorkHandler>, log: Dispatch) -> Self {
        Self { handler, log }
    }

    /// Read the request line. A last line without a newline is accepted;
    /// anything after the first newline is left unread.
    pub async fn read_request<R>(reader: &mut R) -> Result<String>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        let trimmed = line.trim_end_matches(['\n', '\r']);
        Ok(trimmed.to_string())
    }

    /// Decode the request envelope.
    pub fn parse_request(line: &str) -> Result<RequestMessage> {
        serde_json::from_str(line).map_err(|e| Error::Decode(e.to_string()))
    }

    /// Run every job of `request`, writing envelopes to `output`. Returns
    /// the writer once the eof envelope has been written.
    pub async fn process_request<W>(&self, request: RequestMessage, output: W) -> Result<W>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let log = self.log.clone();
        self.process(request, output).with_subscriber(log).await
    }

    async fn process<W>(&self, request: RequestMessage, output: W) -> Result<W>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let message_id = request.message_id.clone();
        let span = start_request_span(
            &request.message_id,
            &request.account,
            request.payload.jobs.len(),
        );
        let (tx, rx) = mpsc::channel::<ResponsePayload>(RESULT_CHANNEL_CAPACITY);

        let responder = Responder::new(output, ResponseHeader::from(&request));
        debug!("starting responder");
        let responder_task = tokio::spawn(
            responder
                .run(rx)
                .instrument(span.clone())
                .with_subscriber(self.log.clone()),
        );

        debug!(jobs = request.payload.jobs.len(), "starting workers");
        let mut workers = JoinSet::new();
        for job in request.payload.jobs {
            debug!(?job, "job input data");
            let job_span = span.in_scope(|| start_job_span(&job.method, &job.href_slug));
            let handler = Arc::clone(&self.handler);
            let channel = tx.clone();
            workers.spawn(
                async move {
                    debug!("worker starting");
                    let result = handler.start_work(job, channel).await;
                    debug!("worker finished");
                    result
                }
                .instrument(job_span)
                .with_subscriber(self.log.clone()),
            );
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "worker task panicked");
            }
        }

        if tx.send(ResponsePayload::eof()).await.is_err() {
            error!("responder stopped before eof could be sent");
        }
        drop(tx);

        let output = responder_task
            .await
            .map_err(|e| Error::Other(format!("responder task failed: {e}")))??;
        span.in_scope(|| info!(message_id = %message_id, "request processed"));
        Ok(output)
    }
}
