//! `{Id, Body}` envelope carried inside Raw/Auth frames.
//!
//! The body is kept as `RawValue` so the dispatcher can decode it lazily into
//! the argument shape registered for `Id`.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{RelayError, Result};

/// Inbound (or relayed) envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    /// Message identifier, bare (`C2S_Register`) or routed (`hall.Enter`).
    #[serde(rename = "Id")]
    pub id: String,
    /// Message body as raw JSON (lazy parsing).
    #[serde(rename = "Body", default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Box<RawValue>>,
}

impl Package {
    /// Raw JSON bytes of the body; empty when absent.
    pub fn body_bytes(&self) -> &[u8] {
        self.body.as_ref().map(|b| b.get().as_bytes()).unwrap_or_default()
    }
}

#[derive(Serialize)]
struct PackageRef<'a, T: ?Sized> {
    #[serde(rename = "Id")]
    id: &'a str,
    #[serde(rename = "Body")]
    body: &'a T,
}

/// Serialize `{Id: id, Body: body}` to JSON bytes.
pub fn encode_package<T>(id: &str, body: &T) -> Result<Vec<u8>>
where
    T: Serialize + ?Sized,
{
    serde_json::to_vec(&PackageRef { id, body })
        .map_err(|e| RelayError::Internal(format!("package encode failed: {e}")))
}

/// Parse an envelope from a frame payload.
pub fn decode_package(payload: &[u8]) -> Result<Package> {
    serde_json::from_slice(payload)
        .map_err(|e| RelayError::Decode(format!("invalid envelope json: {e}")))
}
