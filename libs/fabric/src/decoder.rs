use courier_core::outcome::UNEXPECTED_ERROR;
use courier_core::{EnvelopeHeader, Outcome, TransportStatus};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::warn;

use crate::codec::Codec;
use crate::request::Response;

#[derive(Deserialize)]
struct Payload<T> {
    payload: T,
}

/// Maps a raw response onto an [`Outcome`]
///
/// The mapping is total: every status code and every envelope, including
/// undecodable ones, produces an outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultDecoder<C> {
    codec: C,
}

impl<C: Codec> ResultDecoder<C> {
    pub fn new(codec: C) -> Self {
        Self { codec }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn decode<T: DeserializeOwned>(&self, response: &Response) -> Outcome<T> {
        self.decode_parts(response.transport_status(), &response.body)
    }

    /// Decode a body that arrived with `status`.
    ///
    /// Only [`TransportStatus::Ok`] bodies are read. The envelope tag is
    /// decoded first and the payload is decoded into `T` only when the tag
    /// reports success.
    pub fn decode_parts<T: DeserializeOwned>(&self, status: TransportStatus, body: &[u8]) -> Outcome<T> {
        if let Some(failure) = status.failure() {
            return failure;
        }

        let header: EnvelopeHeader = match self.codec.decode(body) {
            Ok(header) => header,
            Err(err) => {
                warn!(error = %err, "malformed response envelope");
                return Outcome::transport_error([UNEXPECTED_ERROR.to_string(), err.to_string()]);
            }
        };

        header.resolve(|| match self.codec.decode::<Payload<T>>(body) {
            Ok(Payload { payload }) => Outcome::Success(payload),
            Err(err) => {
                warn!(error = %err, "response payload does not match the expected type");
                Outcome::transport_error([UNEXPECTED_ERROR.to_string(), err.to_string()])
            }
        })
    }
}
