/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Ordered buffer of pending elements.
//!
//! A [`Sequence`] keeps its elements sorted ascending by an
//! [`ElementComparator`] at all times. It is not synchronized: the engines
//! own it behind a single mutex and are the only code that mutates it.

use super::comparator::ElementComparator;
use super::error::ResequencerError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// What to do when an element compares equal to a pending one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Refuse the new element with [`ResequencerError::DuplicateKey`].
    #[default]
    Reject,

    /// The new element overwrites the pending one.
    Replace,

    /// Keep both; the new element goes after the existing equals.
    Allow,
}

/// Outcome of [`Sequence::insert`], carrying the element's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inserted {
    /// The element was added; `New(0)` means it is the new head.
    New(usize),
    /// The element overwrote an equal one already at that index.
    Replaced(usize),
}

impl Inserted {
    /// Returns the index the element now occupies.
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::New(index) | Self::Replaced(index) => index,
        }
    }
}

/// An always-sorted buffer of elements.
///
/// Positions are found by binary search in O(log n) comparisons. Removing
/// the head is O(1); inserting elsewhere shifts up to n elements.
///
/// # Examples
///
/// ```
/// use resequencer_rs::{DuplicatePolicy, Sequence, SequenceComparator};
/// use std::sync::Arc;
///
/// let mut seq = Sequence::new(Arc::new(SequenceComparator), DuplicatePolicy::Reject);
/// for n in [5u64, 1, 4, 2, 3] {
///     seq.insert(n).unwrap();
/// }
/// assert_eq!(seq.to_ordered_list(), vec![1, 2, 3, 4, 5]);
/// assert_eq!(seq.remove_first(), Ok(1));
/// ```
pub struct Sequence<E, C> {
    elements: VecDeque<E>,
    comparator: Arc<C>,
    duplicates: DuplicatePolicy,
}

impl<E, C: ElementComparator<E>> Sequence<E, C> {
    /// Creates an empty sequence.
    #[must_use]
    pub fn new(comparator: Arc<C>, duplicates: DuplicatePolicy) -> Self {
        Self {
            elements: VecDeque::new(),
            comparator,
            duplicates,
        }
    }

    /// Inserts an element at its sorted position.
    ///
    /// Reports the index the element now occupies and whether it replaced
    /// an equal element.
    ///
    /// # Errors
    ///
    /// Returns [`ResequencerError::DuplicateKey`] when an equal element is
    /// pending and the policy is [`DuplicatePolicy::Reject`].
    pub fn insert(&mut self, element: E) -> Result<Inserted, ResequencerError> {
        let comparator = &self.comparator;
        match self
            .elements
            .binary_search_by(|pending| comparator.compare(pending, &element))
        {
            Ok(index) => match self.duplicates {
                DuplicatePolicy::Reject => Err(ResequencerError::DuplicateKey),
                DuplicatePolicy::Replace => {
                    self.elements[index] = element;
                    Ok(Inserted::Replaced(index))
                }
                DuplicatePolicy::Allow => {
                    let index = self.elements.partition_point(|pending| {
                        comparator.compare(pending, &element) != Ordering::Greater
                    });
                    self.elements.insert(index, element);
                    Ok(Inserted::New(index))
                }
            },
            Err(index) => {
                self.elements.insert(index, element);
                Ok(Inserted::New(index))
            }
        }
    }

    /// Returns the smallest element.
    ///
    /// # Errors
    ///
    /// Returns [`ResequencerError::Empty`] if the sequence is empty.
    pub fn peek_first(&self) -> Result<&E, ResequencerError> {
        self.elements.front().ok_or(ResequencerError::Empty)
    }

    /// Returns the largest element.
    ///
    /// # Errors
    ///
    /// Returns [`ResequencerError::Empty`] if the sequence is empty.
    pub fn peek_last(&self) -> Result<&E, ResequencerError> {
        self.elements.back().ok_or(ResequencerError::Empty)
    }

    /// Removes and returns the smallest element.
    ///
    /// # Errors
    ///
    /// Returns [`ResequencerError::Empty`] if the sequence is empty.
    pub fn remove_first(&mut self) -> Result<E, ResequencerError> {
        self.elements.pop_front().ok_or(ResequencerError::Empty)
    }

    /// Removes the pending element comparing equal to `element`.
    ///
    /// With [`DuplicatePolicy::Allow`] only one of several equal elements is
    /// removed.
    pub fn remove(&mut self, element: &E) -> Option<E> {
        let comparator = &self.comparator;
        let index = self
            .elements
            .binary_search_by(|pending| comparator.compare(pending, element))
            .ok()?;
        self.elements.remove(index)
    }

    /// Returns `true` if an element comparing equal to `element` is pending.
    #[must_use]
    pub fn contains(&self, element: &E) -> bool {
        let comparator = &self.comparator;
        self.elements
            .binary_search_by(|pending| comparator.compare(pending, element))
            .is_ok()
    }

    /// Iterates over the pending elements in order.
    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.elements.iter()
    }

    /// Removes every element and returns them in order.
    pub fn drain_ordered(&mut self) -> Vec<E> {
        self.elements.drain(..).collect()
    }

    /// Returns the number of pending elements.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if nothing is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        self.elements.clear();
    }

    /// Returns the comparator ordering this sequence.
    #[must_use]
    pub fn comparator(&self) -> &Arc<C> {
        &self.comparator
    }
}

impl<E: Clone, C: ElementComparator<E>> Sequence<E, C> {
    /// Returns a sorted copy of the pending elements.
    #[must_use]
    pub fn to_ordered_list(&self) -> Vec<E> {
        self.elements.iter().cloned().collect()
    }
}

impl<E: fmt::Debug, C> fmt::Debug for Sequence<E, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("elements", &self.elements)
            .field("duplicates", &self.duplicates)
            .finish()
    }
}
