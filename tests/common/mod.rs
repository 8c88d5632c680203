//! Shared scaffolding: a scripted fake API client and helpers for reading
//! back the envelopes a run produced.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use catalog_worker::Result;
use catalog_worker::client::{ApiClient, ApiRequest, ApiResponse};
use catalog_worker::codec;
use catalog_worker::config::Config;
use catalog_worker::engine::{DefaultApiWorker, Dispatcher, Responder, WorkHandler};
use catalog_worker::model::{
    JobParam, MessageType, RequestMessage, RequestPayload, ResponseHeader, ResponseMessage,
};
use serde_json::Value;
use tokio::sync::mpsc;

pub const API_URL: &str = "https://192.1.1.1";

/// Answers requests from a script of `(status, body)` pairs, in order, and
/// records every request it sees.
pub struct FakeClient {
    responses: Mutex<VecDeque<(u16, String)>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeClient {
    pub fn new(status: u16, bodies: &[&str]) -> Arc<Self> {
        Self::scripted(bodies.iter().map(|b| (status, b.to_string())).collect())
    }

    pub fn scripted(responses: Vec<(u16, String)>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ApiClient for FakeClient {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        self.requests.lock().unwrap().push(request);
        let (status, body) = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("fake client ran out of scripted responses");
        Ok(ApiResponse::new(status, body))
    }
}

pub fn test_config() -> Arc<Config> {
    Arc::new(Config::new(API_URL, "123").unwrap().skip_verify_ssl(true))
}

pub fn header() -> ResponseHeader {
    ResponseHeader {
        account: "Buzz".to_string(),
        sender: "Star Command".to_string(),
        in_response_to: "345".to_string(),
    }
}

pub fn request(jobs: Vec<JobParam>) -> RequestMessage {
    RequestMessage {
        account: "Buzz".to_string(),
        sender: "Star Command".to_string(),
        message_id: "345".to_string(),
        payload: RequestPayload { jobs },
    }
}

pub fn dispatcher(client: Arc<FakeClient>) -> Dispatcher {
    let worker = DefaultApiWorker::new(test_config(), client);
    Dispatcher::new(Arc::new(worker), tracing::Dispatch::none())
}

/// Run one job through a real responder and return the envelopes written,
/// eof included, plus the job's own result.
pub async fn run_job(client: Arc<FakeClient>, job: JobParam) -> (Vec<ResponseMessage>, Result<()>) {
    let (tx, rx) = mpsc::channel(1);
    let responder = tokio::spawn(Responder::new(Vec::<u8>::new(), header()).run(rx));

    let worker = DefaultApiWorker::new(test_config(), client);
    let result = worker.start_work(job, tx.clone()).await;
    tx.send(catalog_worker::model::ResponsePayload::eof())
        .await
        .unwrap();

    let output = responder.await.unwrap().unwrap();
    (parse_envelopes(&output), result)
}

pub fn parse_envelopes(output: &[u8]) -> Vec<ResponseMessage> {
    std::str::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

/// Decode the body of a data envelope back into JSON.
pub fn body_of(envelope: &ResponseMessage) -> Value {
    assert_eq!(envelope.message_type, MessageType::Data);
    let payload = envelope.payload.as_ref().expect("data envelope without payload");
    codec::decode_body(&payload.encoding, &payload.body).unwrap()
}

/// Every envelope answers the test request.
pub fn assert_header(envelopes: &[ResponseMessage]) {
    for env in envelopes {
        assert_eq!(env.account, "Buzz");
        assert_eq!(env.sender, "Star Command");
        assert_eq!(env.in_response_to, "345");
    }
}

/// Exactly one eof, and it is last.
pub fn assert_terminated(envelopes: &[ResponseMessage]) {
    let eofs = envelopes
        .iter()
        .filter(|e| e.message_type == MessageType::Eof)
        .count();
    assert_eq!(eofs, 1, "expected exactly one eof envelope");
    let last = envelopes.last().unwrap();
    assert_eq!(last.message_type, MessageType::Eof);
    assert!(last.payload.is_none());
}
