//! Reversible object encodings.
//!
//! A [`Codec`] turns any serde-serializable value into bytes and back. The
//! bytes are what gets hashed and what gets written to the blob store, so an
//! encoding must be deterministic for equal values: persisted types keep
//! their data in ordered containers (`Vec`, `BTreeMap`) rather than
//! `HashMap`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Errors from encoding or decoding an object.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("{codec} encode failed: {reason}")]
    Encode { codec: Codec, reason: String },

    #[error("{codec} decode failed: {reason}")]
    Decode { codec: Codec, reason: String },

    /// The stored value was written by a different type.
    #[error("stored value is a {actual}, expected {expected}")]
    TypeMismatch { expected: String, actual: String },
}

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Wire encoding for stored objects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Compact binary encoding. Preserves every `f64` bit pattern, NaN included.
    #[default]
    Bincode,
    /// Human-readable JSON. Cannot represent non-finite floats.
    Json,
}

impl Codec {
    /// Encode a value.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> CodecResult<Vec<u8>> {
        match self {
            Self::Bincode => bincode::serialize(value).map_err(|e| CodecError::Encode {
                codec: *self,
                reason: e.to_string(),
            }),
            Self::Json => serde_json::to_vec(value).map_err(|e| CodecError::Encode {
                codec: *self,
                reason: e.to_string(),
            }),
        }
    }

    /// Decode a value previously produced by [`Codec::encode`].
    pub fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> CodecResult<T> {
        match self {
            Self::Bincode => bincode::deserialize(data).map_err(|e| CodecError::Decode {
                codec: *self,
                reason: e.to_string(),
            }),
            Self::Json => serde_json::from_slice(data).map_err(|e| CodecError::Decode {
                codec: *self,
                reason: e.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bincode => write!(f, "bincode"),
            Self::Json => write!(f, "json"),
        }
    }
}
