//! Wire envelope and transport status classification.
//!
//! Every response body is an envelope of the form
//!
//! ```json
//! { "resultTag": "ok", "messages": [], "payload": { ... } }
//! ```
//!
//! The tag is read first; the payload is only decoded into the caller's type
//! when the tag reports success.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::outcome::{Outcome, ACCESS_DENIED, REAUTHENTICATE, UNEXPECTED_ERROR};

pub const MISSING_PAYLOAD: &str = "Response payload is missing.";

/// Application-level result carried inside an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultTag {
    Ok,
    ValidationFailed,
    AccessDenied,
    Error,
    /// Any tag this client does not know about.
    #[serde(other)]
    Unknown,
}

/// Tag and diagnostics of an envelope, without the payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeHeader {
    pub result_tag: ResultTag,
    #[serde(default)]
    pub messages: Vec<String>,
}

impl EnvelopeHeader {
    /// Map the tag to an outcome. `payload` is only invoked for [`ResultTag::Ok`].
    pub fn resolve<T, F>(self, payload: F) -> Outcome<T>
    where
        F: FnOnce() -> Outcome<T>,
    {
        let Self {
            result_tag,
            messages,
        } = self;
        match result_tag {
            ResultTag::Ok => payload(),
            ResultTag::ValidationFailed => Outcome::ValidationError(messages),
            ResultTag::AccessDenied => {
                Outcome::AccessDenied(or_default(messages, ACCESS_DENIED))
            }
            ResultTag::Error | ResultTag::Unknown => {
                Outcome::TransportError(or_default(messages, UNEXPECTED_ERROR))
            }
        }
    }
}

fn or_default(messages: Vec<String>, fallback: &str) -> Vec<String> {
    if messages.is_empty() {
        vec![fallback.to_string()]
    } else {
        messages
    }
}

/// A fully decoded envelope
///
/// Used for messages whose payload has already been decoded, for example a
/// body put back together by a [`BodyReconstructor`](crate::BodyReconstructor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope<P> {
    pub result_tag: ResultTag,
    #[serde(default)]
    pub messages: Vec<String>,
    pub payload: Option<P>,
}

impl<P> ResponseEnvelope<P> {
    pub fn ok(payload: P) -> Self {
        Self {
            result_tag: ResultTag::Ok,
            messages: Vec::new(),
            payload: Some(payload),
        }
    }

    pub fn failed(result_tag: ResultTag, messages: Vec<String>) -> Self {
        Self {
            result_tag,
            messages,
            payload: None,
        }
    }

    pub fn into_outcome(self) -> Outcome<P> {
        let header = EnvelopeHeader {
            result_tag: self.result_tag,
            messages: self.messages,
        };
        let payload = self.payload;
        header.resolve(|| match payload {
            Some(value) => Outcome::Success(value),
            None => Outcome::transport_error([MISSING_PAYLOAD]),
        })
    }
}

/// Transport-level status of a response, reduced to the cases that matter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportStatus {
    Ok,
    Unauthorized,
    Forbidden,
    Other(u16),
}

impl TransportStatus {
    pub fn from_code(code: u16) -> Self {
        match code {
            200 => Self::Ok,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::Other(code) => code,
        }
    }

    /// Outcome for a status that carries no decodable envelope.
    ///
    /// Returns `None` for [`TransportStatus::Ok`], whose body still has to be
    /// read.
    pub fn failure<T>(self) -> Option<Outcome<T>> {
        match self {
            Self::Ok => None,
            Self::Forbidden => Some(Outcome::access_denied([REAUTHENTICATE])),
            Self::Unauthorized => Some(Outcome::access_denied([ACCESS_DENIED])),
            Self::Other(_) => Some(Outcome::transport_error([UNEXPECTED_ERROR])),
        }
    }
}

impl fmt::Display for TransportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
