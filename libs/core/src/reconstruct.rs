//! Reconstruction of one logical body from positioned fragments.
//!
//! Fragments may arrive in any order. [`BodyReconstructor`] keeps them in a
//! sparse map keyed by position and only stitches them together once every
//! position in `[0, total)` has been seen. The total comes either from the
//! caller ([`Termination::ExpectedCount`]) or from the fragment appended with
//! [`BodyReconstructor::append_last`] ([`Termination::TerminalMarker`]).
//!
//! A position appended twice keeps the most recent chunk. Retransmissions on
//! an unreliable transport therefore never block completion.
//!
//! There is no timeout: a reconstructor that never learns its total stays
//! incomplete until dropped. Expiry of abandoned state lives in
//! [`Reassembly`](crate::Reassembly).

use std::collections::BTreeMap;
use std::sync::OnceLock;

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::error::{Error, Result};

/// A fragment payload that can be concatenated in position order
pub trait Chunk {
    fn concat<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
        Self: 'a;

    /// Buffered length: bytes for text and [`Bytes`], elements for `Vec<T>`.
    fn size(&self) -> usize;
}

impl Chunk for String {
    fn concat<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
        Self: 'a,
    {
        parts.into_iter().map(String::as_str).collect()
    }

    fn size(&self) -> usize {
        self.len()
    }
}

impl<T: Clone> Chunk for Vec<T> {
    fn concat<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
        Self: 'a,
    {
        parts.into_iter().flatten().cloned().collect()
    }

    fn size(&self) -> usize {
        self.len()
    }
}

impl Chunk for Bytes {
    fn concat<'a, I>(parts: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
        Self: 'a,
    {
        let mut buffer = BytesMut::new();
        for part in parts {
            buffer.extend_from_slice(part);
        }
        buffer.freeze()
    }

    fn size(&self) -> usize {
        self.len()
    }
}

/// How a reconstructor learns the number of fragments it is waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Termination {
    /// The total is known up front.
    ExpectedCount(usize),
    /// The total is fixed by the fragment passed to
    /// [`BodyReconstructor::append_last`], or later via
    /// [`BodyReconstructor::expect_total`].
    #[default]
    TerminalMarker,
}

/// Accumulates positioned fragments of one logical body
#[derive(Debug)]
pub struct BodyReconstructor<B> {
    termination: Termination,
    fragments: BTreeMap<usize, B>,
    total: Option<usize>,
    size: usize,
    assembled: OnceLock<B>,
}

impl<B> Default for BodyReconstructor<B> {
    fn default() -> Self {
        Self::new(Termination::default())
    }
}

impl<B> BodyReconstructor<B> {
    pub fn new(termination: Termination) -> Self {
        let total = match termination {
            Termination::ExpectedCount(total) => Some(total),
            Termination::TerminalMarker => None,
        };
        Self {
            termination,
            fragments: BTreeMap::new(),
            total,
            size: 0,
            assembled: OnceLock::new(),
        }
    }

    pub fn expecting(total: usize) -> Self {
        Self::new(Termination::ExpectedCount(total))
    }

    pub fn until_marker() -> Self {
        Self::new(Termination::TerminalMarker)
    }

    /// Supply the total number of fragments.
    ///
    /// Supplying the same total again is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TotalMismatch`] if a different total was already
    /// fixed, or [`Error::PositionOutOfRange`] if a stored fragment lies at or
    /// beyond `total`.
    pub fn expect_total(&mut self, total: usize) -> Result<()> {
        match self.total {
            Some(current) if current == total => Ok(()),
            Some(current) => Err(Error::TotalMismatch {
                current,
                requested: total,
            }),
            None => {
                if let Some((&highest, _)) = self.fragments.last_key_value() {
                    if highest >= total {
                        return Err(Error::PositionOutOfRange {
                            position: highest,
                            total,
                        });
                    }
                }
                self.total = Some(total);
                Ok(())
            }
        }
    }

    /// `true` once the total is known and every position below it is present.
    pub fn completed(&self) -> bool {
        // Positions at or beyond the total are never stored, so a full count
        // means no gaps.
        self.total == Some(self.fragments.len())
    }

    /// Number of distinct positions received so far.
    pub fn received(&self) -> usize {
        self.fragments.len()
    }

    pub fn expected(&self) -> Option<usize> {
        self.total
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Drop every fragment and return to the initial termination setting.
    pub fn reset(&mut self) {
        *self = Self::new(self.termination);
    }
}

impl<B: Chunk> BodyReconstructor<B> {
    /// Store `chunk` at `position`, replacing any earlier chunk there.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PositionOutOfRange`] if the total is known and
    /// `position` is not below it. State is left untouched in that case.
    pub fn append(&mut self, position: usize, chunk: B) -> Result<()> {
        if let Some(total) = self.total {
            if position >= total {
                return Err(Error::PositionOutOfRange { position, total });
            }
        }
        self.size = self.size.saturating_add(chunk.size());
        if let Some(replaced) = self.fragments.insert(position, chunk) {
            debug!(position, "fragment overwritten by retransmission");
            self.size = self.size.saturating_sub(replaced.size());
        }
        self.assembled.take();
        Ok(())
    }

    /// Store the terminal fragment, fixing the total at `position + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TotalMismatch`] if a different total was already
    /// fixed, or [`Error::PositionOutOfRange`] if a fragment beyond
    /// `position` has already been stored or `position` is `usize::MAX`.
    pub fn append_last(&mut self, position: usize, chunk: B) -> Result<()> {
        let total = position.checked_add(1).ok_or(Error::PositionOutOfRange {
            position,
            total: usize::MAX,
        })?;
        self.expect_total(total)?;
        self.append(position, chunk)
    }

    /// Sum of the [`Chunk::size`] of every stored fragment.
    pub fn buffered_size(&self) -> usize {
        self.size
    }

    /// The assembled body, in position order.
    ///
    /// Assembly happens on the first successful read and is cached until the
    /// next [`append`](Self::append).
    ///
    /// # Errors
    ///
    /// Returns [`Error::IncompleteReconstruction`] before
    /// [`completed`](Self::completed) is `true`. Nothing is modified.
    pub fn body(&self) -> Result<&B> {
        if let Some(body) = self.assembled.get() {
            return Ok(body);
        }
        let total = self.require_complete()?;
        let body = Self::join(&self.fragments, 0..total)?;
        Ok(self.assembled.get_or_init(|| body))
    }

    /// Consume the reconstructor and return the assembled body.
    ///
    /// # Errors
    ///
    /// Same as [`body`](Self::body); the reconstructor is dropped either way.
    pub fn into_body(self) -> Result<B> {
        let total = self.require_complete()?;
        match self.assembled.into_inner() {
            Some(body) => Ok(body),
            None => Self::join(&self.fragments, 0..total),
        }
    }

    /// Best-effort assembly of everything received so far.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Gap`] at the first missing position below the highest
    /// received one.
    pub fn partial_body(&self) -> Result<B> {
        match self.fragments.last_key_value() {
            Some((&highest, _)) => Self::join(&self.fragments, 0..=highest),
            None => Ok(B::concat(std::iter::empty())),
        }
    }

    fn require_complete(&self) -> Result<usize> {
        match self.total {
            Some(total) if self.fragments.len() == total => Ok(total),
            expected => Err(Error::IncompleteReconstruction {
                received: self.fragments.len(),
                expected,
            }),
        }
    }

    fn join<I>(fragments: &BTreeMap<usize, B>, positions: I) -> Result<B>
    where
        I: IntoIterator<Item = usize>,
    {
        let parts = positions
            .into_iter()
            .map(|position| fragments.get(&position).ok_or(Error::Gap { position }))
            .collect::<Result<Vec<_>>>()?;
        Ok(B::concat(parts))
    }
}
