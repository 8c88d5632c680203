//! Responder: the single writer of the output stream.
//!
//! Drains the shared result channel, numbers every item, wraps it in a
//! response envelope and writes it as one JSON line. Stops after the eof
//! envelope.

use opentelemetry::KeyValue;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::model::{ResponseHeader, ResponseMessage, ResponsePayload};
use crate::telemetry::metrics;

pub struct Responder<W> {
    output: W,
    message_count: u64,
    header: ResponseHeader,
}

impl<W> Responder<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(output: W, header: ResponseHeader) -> Self {
        Self {
            output,
            message_count: 0,
            header,
        }
    }

    /// Consume result items until eof, then hand the writer back.
    ///
    /// If every sender goes away without an eof item, an eof envelope is
    /// written anyway so the stream is always terminated.
    pub async fn run(mut self, mut channel: mpsc::Receiver<ResponsePayload>) -> Result<W> {
        info!("responder started");
        loop {
            let payload = match channel.recv().await {
                Some(payload) => payload,
                None => {
                    warn!("result channel closed without eof, terminating stream");
                    ResponsePayload::eof()
                }
            };
            debug!(message_type = %payload.message_type, code = payload.code, "read result from channel");

            let line = self.create_response(&payload)?;
            self.write_line(&line).await?;
            metrics::envelopes_written().add(
                1,
                &[KeyValue::new("message_type", payload.message_type.to_string())],
            );

            if payload.is_eof() {
                break;
            }
        }
        info!(envelopes = self.message_count, "responder finished");
        Ok(self.output)
    }

    /// Build the next envelope for `payload` as a JSON string.
    pub fn create_response(&mut self, payload: &ResponsePayload) -> Result<String> {
        self.message_count += 1;
        let response = ResponseMessage {
            account: self.header.account.clone(),
            sender: self.header.sender.clone(),
            message_type: payload.message_type,
            message_id: Uuid::new_v4().to_string(),
            payload: payload.data.clone(),
            code: payload.code,
            in_response_to: self.header.in_response_to.clone(),
            serial: self.message_count,
        };
        Ok(serde_json::to_string(&response)?)
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        self.output.write_all(line.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        debug!(bytes = line.len() + 1, "wrote response");
        Ok(())
    }
}
