//! Transport encoding of response bodies.
//!
//! A body is JSON text, or, when the job asked for gzip, the JSON text
//! gzip-compressed and then base64-encoded (standard alphabet, padded).

use std::io::{Read, Write};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde_json::Value;

use crate::error::{Error, Result};

pub const GZIP: &str = "gzip";

/// Serialize `body` for a result item. Returns `(encoding, body)`.
pub fn encode_body(body: &Value, gzip: bool) -> Result<(String, String)> {
    if gzip {
        let json = serde_json::to_vec(body)?;
        let compressed = compress_bytes(&json)?;
        Ok((GZIP.to_string(), STANDARD.encode(compressed)))
    } else {
        Ok((String::new(), serde_json::to_string(body)?))
    }
}

/// Inverse of [`encode_body`].
pub fn decode_body(encoding: &str, body: &str) -> Result<Value> {
    match encoding {
        "" => Ok(serde_json::from_str(body)?),
        GZIP => {
            let compressed = STANDARD
                .decode(body)
                .map_err(|e| Error::Other(format!("invalid base64 body: {e}")))?;
            let mut json = Vec::new();
            GzDecoder::new(compressed.as_slice()).read_to_end(&mut json)?;
            Ok(serde_json::from_slice(&json)?)
        }
        other => Err(Error::Other(format!("unknown body encoding {other}"))),
    }
}

fn compress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
