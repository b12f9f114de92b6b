use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

pub mod json;

pub use self::json::JsonCodec;

/// Codec trait for serializing and deserializing message bodies
///
/// Implementations must be deterministic and round-trip: decoding the output
/// of `encode` yields the original value.
pub trait Codec: Send + Sync {
    /// Media type sent as `Content-Type` with encoded bodies
    fn content_type(&self) -> &'static str;

    /// Encode a value into bytes
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// Decode bytes into a value
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}
