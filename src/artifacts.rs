//! Sanctifying job artifacts before they leave the worker.
//!
//! Only attributes the playbook author explicitly exposed (prefixed with
//! [`EXPOSED_PREFIX`]) are forwarded, and the result must stay small.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

pub const EXPOSED_PREFIX: &str = "expose_to_cloud_redhat_com_";

/// Largest serialized size of the sanctified artifacts, in bytes.
pub const MAX_ARTIFACTS_BYTES: usize = 1024;

/// Keep only exposed attributes. Fails with `SizeExceeded` if what is left
/// serializes to more than [`MAX_ARTIFACTS_BYTES`].
pub fn sanctify(data: &Map<String, Value>) -> Result<Map<String, Value>> {
    let result: Map<String, Value> = data
        .iter()
        .filter(|(key, _)| key.starts_with(EXPOSED_PREFIX))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let size = serde_json::to_vec(&result)?.len();
    if size > MAX_ARTIFACTS_BYTES {
        return Err(Error::SizeExceeded {
            size,
            limit: MAX_ARTIFACTS_BYTES,
        });
    }
    Ok(result)
}

/// Replace a top-level `artifacts` object in `body` with its sanctified
/// form. Bodies without one are returned untouched.
pub fn sanctify_body(mut body: Value) -> Result<Value> {
    if let Some(Value::Object(artifacts)) = body.get("artifacts") {
        let clean = sanctify(artifacts)?;
        body["artifacts"] = Value::Object(clean);
    }
    Ok(body)
}
