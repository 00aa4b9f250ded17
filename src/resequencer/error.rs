/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Error types returned by the resequencer engines.

use thiserror::Error;

/// Errors that can occur when feeding or operating a resequencer.
///
/// None of these are fatal: a rejected element simply never enters the
/// buffer and the engine keeps running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResequencerError {
    /// The element failed the comparator's validity check.
    #[error("element rejected: comparator reports it as invalid")]
    InvalidElement,

    /// An element comparing equal to a pending one was pushed while
    /// duplicates are rejected.
    #[error("element rejected: an equal element is already pending")]
    DuplicateKey,

    /// A buffer operation needed an element but the buffer was empty.
    #[error("sequence is empty")]
    Empty,

    /// The stream buffer is full.
    #[error("element rejected: buffer capacity of {capacity} reached")]
    CapacityExceeded {
        /// The configured capacity.
        capacity: usize,
    },

    /// The element does not come after the last delivered element.
    #[error("element rejected: not after the last delivered element")]
    ElementTooOld,

    /// `start` was called on a resequencer whose driver is already running.
    #[error("resequencer already started")]
    AlreadyStarted,
}

impl ResequencerError {
    /// Returns `true` if the error rejected a pushed element.
    #[inline]
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        !matches!(self, Self::Empty | Self::AlreadyStarted)
    }
}
