//! # catalog-worker
//!
//! Job-execution worker for an automation-platform job queue.
//!
//! Reads one request envelope describing a batch of REST API jobs, runs
//! every job concurrently against the remote API (paged GET, POST, or
//! monitor polling), projects and sanctifies each response, and streams
//! numbered response envelopes back, terminated by a single eof envelope.

pub mod artifacts;
pub mod client;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod model;
pub mod telemetry;

pub use error::{Error, Result};
