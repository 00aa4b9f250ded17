/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Element comparators.
//!
//! The engines never look inside an element. Every ordering decision goes
//! through an [`ElementComparator`], which supplies a total order, an
//! adjacency test and a validity filter.

use std::cmp::Ordering;
use std::fmt;

/// Total order and adjacency oracle for resequenced elements.
///
/// Implementations must be pure and deterministic. `compare` must be a strict
/// total order over valid elements, and `predecessor(a, b)` implies
/// `compare(a, b) == Ordering::Less`.
///
/// # Examples
///
/// ```
/// use resequencer_rs::{ElementComparator, SequenceComparator};
///
/// let cmp = SequenceComparator;
/// assert!(cmp.predecessor(&4u64, &5u64));
/// assert!(cmp.successor(&5u64, &4u64));
/// assert!(!cmp.predecessor(&4u64, &6u64));
/// ```
pub trait ElementComparator<E>: Send + Sync {
    /// Compares two elements.
    fn compare(&self, a: &E, b: &E) -> Ordering;

    /// Returns `true` if `a` immediately precedes `b`.
    fn predecessor(&self, a: &E, b: &E) -> bool;

    /// Returns `true` if `a` immediately follows `b`.
    fn successor(&self, a: &E, b: &E) -> bool {
        self.predecessor(b, a)
    }

    /// Returns `true` if the element can be sequenced at all.
    fn is_valid(&self, _element: &E) -> bool {
        true
    }
}

/// Elements carrying an integer sequence number.
///
/// `None` means the element has no usable key and will be rejected.
pub trait Sequenced {
    /// Returns the element's sequence number.
    fn sequence_number(&self) -> Option<u64>;
}

impl Sequenced for u64 {
    #[inline]
    fn sequence_number(&self) -> Option<u64> {
        Some(*self)
    }
}

impl Sequenced for u32 {
    #[inline]
    fn sequence_number(&self) -> Option<u64> {
        Some(u64::from(*self))
    }
}

impl Sequenced for usize {
    #[inline]
    fn sequence_number(&self) -> Option<u64> {
        u64::try_from(*self).ok()
    }
}

impl<T: Sequenced> Sequenced for Option<T> {
    #[inline]
    fn sequence_number(&self) -> Option<u64> {
        self.as_ref().and_then(Sequenced::sequence_number)
    }
}

/// Compares [`Sequenced`] elements by their sequence number.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceComparator;

impl<E: Sequenced> ElementComparator<E> for SequenceComparator {
    fn compare(&self, a: &E, b: &E) -> Ordering {
        a.sequence_number().cmp(&b.sequence_number())
    }

    fn predecessor(&self, a: &E, b: &E) -> bool {
        adjacent(a.sequence_number(), b.sequence_number())
    }

    fn is_valid(&self, element: &E) -> bool {
        element.sequence_number().is_some()
    }
}

/// Comparator driven by a key extraction closure.
///
/// Useful when the element type is foreign and cannot implement
/// [`Sequenced`].
///
/// # Examples
///
/// ```
/// use resequencer_rs::{ElementComparator, KeyComparator};
///
/// struct Frame { seq: Option<u64> }
///
/// let cmp = KeyComparator::new(|f: &Frame| f.seq);
/// assert!(cmp.predecessor(&Frame { seq: Some(1) }, &Frame { seq: Some(2) }));
/// assert!(!cmp.is_valid(&Frame { seq: None }));
/// ```
#[derive(Clone, Copy)]
pub struct KeyComparator<F> {
    key: F,
}

impl<F> KeyComparator<F> {
    /// Creates a comparator using `key` to extract the sequence number.
    #[must_use]
    pub fn new(key: F) -> Self {
        Self { key }
    }
}

impl<F> fmt::Debug for KeyComparator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyComparator").finish_non_exhaustive()
    }
}

impl<E, F> ElementComparator<E> for KeyComparator<F>
where
    F: Fn(&E) -> Option<u64> + Send + Sync,
{
    fn compare(&self, a: &E, b: &E) -> Ordering {
        (self.key)(a).cmp(&(self.key)(b))
    }

    fn predecessor(&self, a: &E, b: &E) -> bool {
        adjacent((self.key)(a), (self.key)(b))
    }

    fn is_valid(&self, element: &E) -> bool {
        (self.key)(element).is_some()
    }
}

#[inline]
fn adjacent(a: Option<u64>, b: Option<u64>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.checked_add(1) == Some(b),
        _ => false,
    }
}
