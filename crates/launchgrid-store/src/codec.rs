use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kv::StoreError;

/// Version written into every record envelope.
pub const FORMAT_VERSION: u32 = 1;

/// Why a stored record could not be turned back into its value.
///
/// Decode failures are never fatal; the record reads as its empty default.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("record `{key}` is malformed: {reason}")]
    Malformed { key: String, reason: String },
    #[error("record `{key}` uses unsupported format version {version}")]
    UnsupportedVersion { key: String, version: u32 },
    #[error("record `{key}` could not be read: {reason}")]
    Unreadable { key: String, reason: String },
}

impl DecodeError {
    pub fn key(&self) -> &str {
        match self {
            DecodeError::Malformed { key, .. }
            | DecodeError::UnsupportedVersion { key, .. }
            | DecodeError::Unreadable { key, .. } => key,
        }
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    version: u32,
    data: &'a T,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    version: u32,
    data: serde_json::Value,
}

pub fn encode<T: Serialize>(key: &str, value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec_pretty(&EnvelopeRef {
        version: FORMAT_VERSION,
        data: value,
    })
    .map_err(|source| StoreError::Encode {
        key: key.to_owned(),
        source,
    })
}

/// Decodes an enveloped record. Bare payloads written before the envelope
/// existed are accepted as-is.
pub fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, DecodeError> {
    let malformed = |err: serde_json::Error| DecodeError::Malformed {
        key: key.to_owned(),
        reason: err.to_string(),
    };
    match serde_json::from_slice::<Envelope>(bytes) {
        Ok(envelope) if envelope.version == FORMAT_VERSION => {
            serde_json::from_value(envelope.data).map_err(malformed)
        }
        Ok(envelope) => Err(DecodeError::UnsupportedVersion {
            key: key.to_owned(),
            version: envelope.version,
        }),
        Err(_) => serde_json::from_slice(bytes).map_err(malformed),
    }
}
