//! Concurrent registry of in-flight reconstructions, one per message.
//!
//! Fragments of different messages arrive interleaved on the same transport.
//! [`Reassembly`] routes each fragment to the [`BodyReconstructor`] owned by
//! its [`MessageId`], hands back the assembled body as soon as a message
//! completes, and forgets that message. Partial messages that stay incomplete
//! longer than the configured timeout are dropped by
//! [`Reassembly::purge_expired`]; nothing runs in the background, so callers
//! decide when to sweep.
//!
//! Optional limits bound memory use: [`Reassembly::with_max_message_size`]
//! caps the buffered size of one message and [`Reassembly::with_max_partials`]
//! caps how many messages may be in flight at once.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use dashmap::{mapref::entry::Entry, DashMap};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::reconstruct::{BodyReconstructor, Chunk, Termination};

/// Identifier shared by every fragment of one logical message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for MessageId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct Partial<B> {
    reconstructor: BodyReconstructor<B>,
    started_at: Instant,
}

/// Per-message reconstruction state with timeout-based eviction
///
/// All methods take `&self`; the map locks per bucket, so fragments of
/// different messages can be appended from different tasks.
#[derive(Debug)]
pub struct Reassembly<B> {
    termination: Termination,
    timeout: Duration,
    max_message_size: Option<NonZeroUsize>,
    max_partials: Option<NonZeroUsize>,
    partials: DashMap<MessageId, Partial<B>>,
}

impl<B: Chunk> Reassembly<B> {
    /// Registry whose messages announce their end with a terminal fragment.
    pub fn new(timeout: Duration) -> Self {
        Self::with_termination(Termination::TerminalMarker, timeout)
    }

    pub fn with_termination(termination: Termination, timeout: Duration) -> Self {
        Self {
            termination,
            timeout,
            max_message_size: None,
            max_partials: None,
            partials: DashMap::new(),
        }
    }

    /// Reject messages whose buffered fragments exceed `limit`, measured in
    /// [`Chunk::size`] units.
    ///
    /// A message that goes over the limit is dropped along with its fragments.
    #[must_use]
    pub fn with_max_message_size(mut self, limit: NonZeroUsize) -> Self {
        self.max_message_size = Some(limit);
        self
    }

    /// Refuse new messages while `limit` messages are already buffered.
    ///
    /// Fragments of messages already in flight are still accepted.
    #[must_use]
    pub fn with_max_partials(mut self, limit: NonZeroUsize) -> Self {
        self.max_partials = Some(limit);
        self
    }

    /// Append a fragment to message `id`.
    ///
    /// Returns `Ok(Some(body))` when the fragment completes the message,
    /// `Ok(None)` while more fragments are needed.
    ///
    /// # Errors
    ///
    /// Propagates the [`BodyReconstructor::append`] errors; the message keeps
    /// the fragments it already had. Returns [`Error::MessageTooLarge`] or
    /// [`Error::TooManyPartials`] when a configured limit is hit.
    pub fn append(&self, id: MessageId, position: usize, chunk: B) -> Result<Option<B>> {
        self.append_at(id, position, chunk, Instant::now())
    }

    /// [`append`](Self::append) with an explicit clock reading.
    ///
    /// # Errors
    ///
    /// See [`append`](Self::append).
    pub fn append_at(
        &self,
        id: MessageId,
        position: usize,
        chunk: B,
        now: Instant,
    ) -> Result<Option<B>> {
        self.apply(id, now, |r| r.append(position, chunk))
    }

    /// Append the terminal fragment of message `id`.
    ///
    /// # Errors
    ///
    /// Propagates the [`BodyReconstructor::append_last`] errors.
    pub fn append_last(&self, id: MessageId, position: usize, chunk: B) -> Result<Option<B>> {
        self.append_last_at(id, position, chunk, Instant::now())
    }

    /// [`append_last`](Self::append_last) with an explicit clock reading.
    ///
    /// # Errors
    ///
    /// See [`append_last`](Self::append_last).
    pub fn append_last_at(
        &self,
        id: MessageId,
        position: usize,
        chunk: B,
        now: Instant,
    ) -> Result<Option<B>> {
        self.apply(id, now, |r| r.append_last(position, chunk))
    }

    /// Announce the total fragment count of message `id`.
    ///
    /// Completes the message if every fragment is already present.
    ///
    /// # Errors
    ///
    /// Propagates the [`BodyReconstructor::expect_total`] errors.
    pub fn expect_total(&self, id: MessageId, total: usize) -> Result<Option<B>> {
        self.apply(id, Instant::now(), |r| r.expect_total(total))
    }

    /// Drop the partial state of message `id`. Returns `true` if it existed.
    pub fn abandon(&self, id: MessageId) -> bool {
        self.partials.remove(&id).is_some()
    }

    /// Remove partial messages older than the configured timeout.
    ///
    /// Returns the identifiers of the evicted messages.
    pub fn purge_expired(&self) -> Vec<MessageId> {
        self.purge_expired_at(Instant::now())
    }

    /// [`purge_expired`](Self::purge_expired) with an explicit clock reading.
    pub fn purge_expired_at(&self, now: Instant) -> Vec<MessageId> {
        let mut evicted = Vec::new();
        let timeout = self.timeout;

        self.partials.retain(|id, partial| {
            let expired = now.saturating_duration_since(partial.started_at) >= timeout;
            if expired {
                debug!(message_id = %id, received = partial.reconstructor.received(), "evicting stale partial message");
                evicted.push(*id);
            }
            !expired
        });

        evicted
    }

    /// Number of messages currently being reconstructed.
    pub fn buffered_len(&self) -> usize {
        self.partials.len()
    }

    fn apply<F>(&self, id: MessageId, now: Instant, step: F) -> Result<Option<B>>
    where
        F: FnOnce(&mut BodyReconstructor<B>) -> Result<()>,
    {
        // Checked before the entry lock is taken; `len` locks every shard.
        if let Some(limit) = self.max_partials {
            if !self.partials.contains_key(&id) && self.partials.len() >= limit.get() {
                debug!(message_id = %id, limit = limit.get(), "refusing message, registry full");
                return Err(Error::TooManyPartials {
                    message_id: id,
                    limit: limit.get(),
                });
            }
        }

        match self.partials.entry(id) {
            Entry::Occupied(mut occupied) => {
                step(&mut occupied.get_mut().reconstructor)?;
                if let Err(err) = self.check_size(id, &occupied.get().reconstructor) {
                    occupied.remove();
                    return Err(err);
                }
                if occupied.get().reconstructor.completed() {
                    occupied.remove().reconstructor.into_body().map(Some)
                } else {
                    Ok(None)
                }
            }
            Entry::Vacant(vacant) => {
                let mut reconstructor = BodyReconstructor::new(self.termination);
                step(&mut reconstructor)?;
                self.check_size(id, &reconstructor)?;
                if reconstructor.completed() {
                    reconstructor.into_body().map(Some)
                } else {
                    vacant.insert(Partial {
                        reconstructor,
                        started_at: now,
                    });
                    Ok(None)
                }
            }
        }
    }

    fn check_size(&self, id: MessageId, reconstructor: &BodyReconstructor<B>) -> Result<()> {
        let Some(limit) = self.max_message_size else {
            return Ok(());
        };
        let attempted = reconstructor.buffered_size();
        if attempted > limit.get() {
            debug!(message_id = %id, attempted, limit = limit.get(), "dropping oversized message");
            return Err(Error::MessageTooLarge {
                message_id: id,
                attempted,
                limit: limit.get(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::Error;

    #[test]
    fn interleaved_messages_are_kept_apart() {
        let reassembly = Reassembly::new(Duration::from_secs(30));
        let first = MessageId::new(1);
        let second = MessageId::new(2);

        assert_eq!(reassembly.append(first, 1, "lo".to_string()), Ok(None));
        assert_eq!(reassembly.append(second, 0, "wor".to_string()), Ok(None));
        assert_eq!(reassembly.append(first, 0, "hel".to_string()), Ok(None));
        assert_eq!(reassembly.buffered_len(), 2);

        assert_eq!(
            reassembly.append_last(second, 1, "ld".to_string()),
            Ok(Some("world".to_string()))
        );
        assert_eq!(
            reassembly.append_last(first, 2, "!".to_string()),
            Ok(Some("hello!".to_string()))
        );
        assert_eq!(reassembly.buffered_len(), 0);
    }

    #[test]
    fn single_fragment_with_known_total_completes_immediately() {
        let reassembly = Reassembly::with_termination(
            Termination::ExpectedCount(1),
            Duration::from_secs(30),
        );
        assert_eq!(
            reassembly.append(MessageId::new(9), 0, vec![1_u8, 2, 3]),
            Ok(Some(vec![1, 2, 3]))
        );
        assert_eq!(reassembly.buffered_len(), 0);
    }

    #[test]
    fn late_total_completes_buffered_message() {
        let reassembly = Reassembly::new(Duration::from_secs(30));
        let id = MessageId::new(4);
        assert_eq!(reassembly.append(id, 0, "a".to_string()), Ok(None));
        assert_eq!(reassembly.append(id, 1, "b".to_string()), Ok(None));
        assert_eq!(reassembly.expect_total(id, 2), Ok(Some("ab".to_string())));
    }

    #[test]
    fn rejected_fragment_keeps_existing_state() {
        let reassembly = Reassembly::with_termination(
            Termination::ExpectedCount(2),
            Duration::from_secs(30),
        );
        let id = MessageId::new(5);
        assert_eq!(reassembly.append(id, 0, "a".to_string()), Ok(None));
        assert_eq!(
            reassembly.append(id, 2, "x".to_string()),
            Err(Error::PositionOutOfRange {
                position: 2,
                total: 2
            })
        );
        assert_eq!(reassembly.append(id, 1, "b".to_string()), Ok(Some("ab".to_string())));
    }

    #[test]
    fn rejected_first_fragment_leaves_no_state() {
        let reassembly = Reassembly::<String>::with_termination(
            Termination::ExpectedCount(1),
            Duration::from_secs(30),
        );
        assert!(reassembly.append(MessageId::new(6), 3, "x".into()).is_err());
        assert_eq!(reassembly.buffered_len(), 0);
    }

    #[test]
    fn stale_partials_are_purged() {
        let timeout = Duration::from_secs(5);
        let reassembly = Reassembly::new(timeout);
        let start = Instant::now();
        let stale = MessageId::new(7);
        let fresh = MessageId::new(8);

        assert_eq!(reassembly.append_at(stale, 0, "a".to_string(), start), Ok(None));
        assert_eq!(
            reassembly.append_at(fresh, 0, "b".to_string(), start + Duration::from_secs(3)),
            Ok(None)
        );

        let evicted = reassembly.purge_expired_at(start + timeout);
        assert_eq!(evicted, vec![stale]);
        assert_eq!(reassembly.buffered_len(), 1);
        assert!(reassembly.abandon(fresh));
        assert!(!reassembly.abandon(fresh));
    }

    fn limit(value: usize) -> NonZeroUsize {
        NonZeroUsize::new(value).expect("non-zero limit")
    }

    #[test]
    fn oversized_message_is_dropped() {
        let reassembly = Reassembly::new(Duration::from_secs(30)).with_max_message_size(limit(4));
        let id = MessageId::new(10);

        assert_eq!(reassembly.append(id, 0, "abc".to_string()), Ok(None));
        assert_eq!(
            reassembly.append(id, 1, "de".to_string()),
            Err(Error::MessageTooLarge {
                message_id: id,
                attempted: 5,
                limit: 4
            })
        );
        assert_eq!(reassembly.buffered_len(), 0);

        // A fresh start for the same id is accepted again.
        assert_eq!(
            reassembly.append_last(id, 0, "ok".to_string()),
            Ok(Some("ok".to_string()))
        );
    }

    #[test]
    fn oversized_first_fragment_leaves_no_state() {
        let reassembly = Reassembly::new(Duration::from_secs(30)).with_max_message_size(limit(2));
        assert!(matches!(
            reassembly.append(MessageId::new(11), 0, vec![0_u8; 3]),
            Err(Error::MessageTooLarge { attempted: 3, .. })
        ));
        assert_eq!(reassembly.buffered_len(), 0);
    }

    #[test]
    fn retransmission_does_not_count_twice() {
        let reassembly = Reassembly::new(Duration::from_secs(30)).with_max_message_size(limit(4));
        let id = MessageId::new(12);
        assert_eq!(reassembly.append(id, 0, "abcd".to_string()), Ok(None));
        assert_eq!(reassembly.append(id, 0, "wxyz".to_string()), Ok(None));
        assert_eq!(
            reassembly.append_last(id, 1, String::new()),
            Ok(Some("wxyz".to_string()))
        );
    }

    #[test]
    fn full_registry_refuses_new_messages_only() {
        let reassembly = Reassembly::new(Duration::from_secs(30)).with_max_partials(limit(1));
        let first = MessageId::new(20);
        let second = MessageId::new(21);

        assert_eq!(reassembly.append(first, 0, "a".to_string()), Ok(None));
        assert_eq!(
            reassembly.append(second, 0, "b".to_string()),
            Err(Error::TooManyPartials {
                message_id: second,
                limit: 1
            })
        );
        assert_eq!(reassembly.append(first, 1, "b".to_string()), Ok(None));
        assert_eq!(
            reassembly.append_last(first, 2, "c".to_string()),
            Ok(Some("abc".to_string()))
        );
        assert_eq!(reassembly.append(second, 0, "b".to_string()), Ok(None));
    }

    #[test]
    fn highest_terminal_position_is_rejected_without_state() {
        let reassembly = Reassembly::<String>::new(Duration::from_secs(30));
        assert!(matches!(
            reassembly.append_last(MessageId::new(30), usize::MAX, "x".into()),
            Err(Error::PositionOutOfRange { .. })
        ));
        assert_eq!(reassembly.buffered_len(), 0);
    }

    #[test]
    fn concurrent_appends_assemble_every_message() {
        let reassembly = Arc::new(Reassembly::with_termination(
            Termination::ExpectedCount(4),
            Duration::from_secs(30),
        ));

        let handles: Vec<_> = (0..4_usize)
            .map(|position| {
                let reassembly = Arc::clone(&reassembly);
                std::thread::spawn(move || {
                    (0..16_u64)
                        .filter_map(|id| {
                            reassembly
                                .append(MessageId::new(id), position, vec![position as u8])
                                .expect("fragment accepted")
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let completed: Vec<Vec<u8>> = handles
            .into_iter()
            .flat_map(|handle| handle.join().expect("worker thread"))
            .collect();

        assert_eq!(completed.len(), 16);
        assert!(completed.iter().all(|body| body == &vec![0, 1, 2, 3]));
        assert_eq!(reassembly.buffered_len(), 0);
    }
}
