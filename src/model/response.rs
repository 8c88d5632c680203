//! Result items exchanged between job executors and the responder, and the
//! envelopes the responder writes out.

use serde::{Deserialize, Serialize};

use super::request::RequestMessage;

/// Application-level result of one fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    pub href_slug: String,
    /// "gzip" when `body` is gzip+base64, empty otherwise.
    pub encoding: String,
    pub body: String,
    pub status: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Data,
    Eof,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MessageType::Data => "data",
            MessageType::Eof => "eof",
        };
        write!(f, "{s}")
    }
}

/// Code carried by a successful result item.
pub const CODE_OK: i32 = 0;
/// Code carried by a job-local failure.
pub const CODE_ERROR: i32 = 1;

/// Internal result item sent over the shared channel to the responder.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsePayload {
    pub message_type: MessageType,
    pub code: i32,
    pub data: Option<ResponseData>,
}

impl ResponsePayload {
    pub fn data(data: ResponseData) -> Self {
        Self {
            message_type: MessageType::Data,
            code: CODE_OK,
            data: Some(data),
        }
    }

    pub fn error(href_slug: impl Into<String>, message: impl Into<String>, status: u16) -> Self {
        Self {
            message_type: MessageType::Data,
            code: CODE_ERROR,
            data: Some(ResponseData {
                href_slug: href_slug.into(),
                encoding: String::new(),
                body: message.into(),
                status,
            }),
        }
    }

    /// End-of-stream marker pushed once every job has finished.
    pub fn eof() -> Self {
        Self {
            message_type: MessageType::Eof,
            code: CODE_OK,
            data: None,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.message_type == MessageType::Eof
    }
}

/// Values copied from the request into every response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseHeader {
    pub account: String,
    pub sender: String,
    pub in_response_to: String,
}

impl From<&RequestMessage> for ResponseHeader {
    fn from(req: &RequestMessage) -> Self {
        Self {
            account: req.account.clone(),
            sender: req.sender.clone(),
            in_response_to: req.message_id.clone(),
        }
    }
}

/// One line of output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub account: String,
    pub sender: String,
    pub message_type: MessageType,
    /// Fresh UUID per envelope.
    pub message_id: String,
    /// Absent on the eof envelope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<ResponseData>,
    pub code: i32,
    pub in_response_to: String,
    pub serial: u64,
}
