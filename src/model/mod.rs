//! Core data model.
//!
//! A request envelope carries a batch of jobs. Each job produces one or more
//! result items, which the responder turns into numbered response envelopes.

pub mod request;
pub mod response;

pub use request::{ApplyFilter, JobParam, Method, RequestMessage, RequestPayload};
pub use response::{
    CODE_ERROR, CODE_OK, MessageType, ResponseData, ResponseHeader, ResponseMessage,
    ResponsePayload,
};
