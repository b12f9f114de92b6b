use thiserror::Error;

use crate::outcome::OutcomeKind;
use crate::reassembly::MessageId;

/// Errors raised by outcome access, fragment reconstruction and targets
///
/// Remote failures never show up here; they are carried by
/// [`Outcome`](crate::Outcome) variants instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("no value available: outcome is {kind}")]
    InvalidState { kind: OutcomeKind },

    #[error("reconstruction incomplete: received {received} of {}", fmt_expected(.expected))]
    IncompleteReconstruction {
        received: usize,
        expected: Option<usize>,
    },

    #[error("fragment missing at position {position}")]
    Gap { position: usize },

    #[error("fragment position {position} is outside the expected total of {total}")]
    PositionOutOfRange { position: usize, total: usize },

    #[error("fragment total already fixed at {current}, cannot change to {requested}")]
    TotalMismatch { current: usize, requested: usize },

    #[error("message {message_id} buffers {attempted} units, over the limit of {limit}")]
    MessageTooLarge {
        message_id: MessageId,
        attempted: usize,
        limit: usize,
    },

    #[error("already reassembling {limit} messages, refusing message {message_id}")]
    TooManyPartials { message_id: MessageId, limit: usize },

    #[error("invalid service target: {0}")]
    InvalidTarget(String),
}

impl Error {
    pub fn invalid_target(msg: impl Into<String>) -> Self {
        Self::InvalidTarget(msg.into())
    }
}

fn fmt_expected(expected: &Option<usize>) -> String {
    match expected {
        Some(total) => total.to_string(),
        None => "unknown".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
