/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Batch resequencer engine.
//!
//! Elements collect in a sorted window. A window closes either when it
//! reaches `capacity` or when it has been open for `batch_timeout`, and is
//! then handed downstream as a single sorted batch.
//!
//! A full window is sealed inside `push` and the driver is woken, so the
//! producer never runs the sink itself.

use super::clock::{Clock, SystemClock};
use super::comparator::ElementComparator;
use super::config::{BatchConfig, ConfigError, StopPolicy};
use super::driver::Deliver;
use super::error::ResequencerError;
use super::sequence::Sequence;
use super::sink::{BatchSink, hand_off};
use super::stats::{ResequencerStats, StatsSnapshot};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

struct BatchState<E, C> {
    window: Sequence<E, C>,
    opened_at: Option<Instant>,
    /// Full windows waiting for the next delivery cycle.
    sealed: VecDeque<Vec<E>>,
}

impl<E, C: ElementComparator<E>> BatchState<E, C> {
    fn seal(&mut self) {
        if !self.window.is_empty() {
            self.sealed.push_back(self.window.drain_ordered());
        }
        self.opened_at = None;
    }

    fn pending(&self) -> usize {
        self.window.len() + self.sealed.iter().map(Vec::len).sum::<usize>()
    }
}

/// Window-based batch resequencer.
///
/// # Examples
///
/// ```
/// use resequencer_rs::{BatchConfig, BatchResequencer, SequenceComparator};
/// use std::sync::{Arc, Mutex};
///
/// let batches = Arc::new(Mutex::new(Vec::new()));
/// let sink_batches = batches.clone();
/// let engine = BatchResequencer::new(
///     SequenceComparator,
///     BatchConfig { capacity: 5, ..BatchConfig::default() },
///     move |batch: Vec<u64>| {
///         sink_batches.lock().unwrap().push(batch);
///         Ok(())
///     },
/// )
/// .unwrap();
///
/// for n in [5u64, 1, 4, 2, 3] {
///     engine.push(n).unwrap();
/// }
/// engine.deliver();
/// assert_eq!(*batches.lock().unwrap(), vec![vec![1, 2, 3, 4, 5]]);
/// ```
pub struct BatchResequencer<E, C> {
    comparator: Arc<C>,
    state: Mutex<BatchState<E, C>>,
    delivery: Mutex<()>,
    sink: Box<dyn BatchSink<E>>,
    clock: Arc<dyn Clock>,
    config: BatchConfig,
    stats: ResequencerStats,
    wake: Arc<Notify>,
}

impl<E, C> BatchResequencer<E, C>
where
    E: Send + 'static,
    C: ElementComparator<E> + 'static,
{
    /// Creates a batch resequencer using the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `config` fails
    /// [`BatchConfig::validate`].
    pub fn new<S>(comparator: C, config: BatchConfig, sink: S) -> Result<Self, ConfigError>
    where
        S: BatchSink<E> + 'static,
    {
        Self::with_clock(comparator, config, sink, Arc::new(SystemClock))
    }

    /// Creates a batch resequencer reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `config` fails
    /// [`BatchConfig::validate`].
    pub fn with_clock<S>(
        comparator: C,
        config: BatchConfig,
        sink: S,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError>
    where
        S: BatchSink<E> + 'static,
    {
        config.validate()?;
        let comparator = Arc::new(comparator);
        let window = Sequence::new(comparator.clone(), config.duplicates);

        Ok(Self {
            comparator,
            state: Mutex::new(BatchState {
                window,
                opened_at: None,
                sealed: VecDeque::new(),
            }),
            delivery: Mutex::new(()),
            sink: Box::new(sink),
            clock,
            config,
            stats: ResequencerStats::new(),
            wake: Arc::new(Notify::new()),
        })
    }

    /// Adds an element to the current window.
    ///
    /// Reaching `capacity` closes the window and wakes the driver; the
    /// batch itself is emitted by the next delivery cycle.
    ///
    /// # Errors
    ///
    /// - [`ResequencerError::InvalidElement`] if the comparator rejects it
    ///   (unless `ignore_invalid` is set, in which case it is dropped)
    /// - [`ResequencerError::DuplicateKey`] if an equal element is pending
    ///   and duplicates are rejected
    pub fn push(&self, element: E) -> Result<(), ResequencerError> {
        if !self.comparator.is_valid(&element) {
            self.stats.record_rejected();
            if self.config.ignore_invalid {
                debug!("ignoring invalid element");
                return Ok(());
            }
            debug!("rejecting invalid element");
            return Err(ResequencerError::InvalidElement);
        }

        let full = {
            let mut state = self.lock_state();
            if let Err(e) = state.window.insert(element) {
                self.stats.record_duplicate();
                debug!("rejecting duplicate element");
                return Err(e);
            }
            self.stats.record_accepted();

            if state.opened_at.is_none() {
                state.opened_at = Some(self.clock.now());
            }

            let full = state.window.len() >= self.config.capacity;
            if full {
                state.seal();
            }
            full
        };

        if full {
            trace!(capacity = self.config.capacity, "batch window full");
            self.wake.notify_one();
        }
        Ok(())
    }

    /// Flushes every pending element now, one batch per window.
    ///
    /// Returns the number of elements delivered.
    pub fn deliver(&self) -> usize {
        self.flush(true)
    }

    /// Flushes sealed windows, and the open window once its timeout has
    /// elapsed.
    ///
    /// Returns the number of elements delivered.
    pub fn tick(&self) -> usize {
        self.flush(false)
    }

    /// Discards every pending element. Returns how many were discarded.
    pub fn clear(&self) -> usize {
        let dropped = {
            let mut state = self.lock_state();
            let dropped = state.pending();
            state.window.clear();
            state.sealed.clear();
            state.opened_at = None;
            dropped
        };
        self.stats.record_dropped(dropped as u64);
        if dropped > 0 {
            warn!(dropped, "discarded pending batch elements");
        }
        dropped
    }

    /// Returns the number of pending elements, sealed windows included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_state().pending()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of full windows waiting for delivery.
    #[must_use]
    pub fn sealed_batches(&self) -> usize {
        self.lock_state().sealed.len()
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn flush(&self, force: bool) -> usize {
        let _cycle = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);

        let batches: Vec<Vec<E>> = {
            let mut state = self.lock_state();
            let expired = state.opened_at.is_some_and(|opened| {
                self.clock.now().saturating_duration_since(opened) >= self.config.batch_timeout()
            });
            if force || expired {
                state.seal();
            }
            state.sealed.drain(..).collect()
        };

        let mut count = 0;
        for mut batch in batches {
            if self.config.reverse {
                batch.reverse();
            }
            let size = batch.len();
            count += size;
            self.stats.record_batch();
            self.stats.record_delivered(size as u64);
            trace!(size, "delivering batch");
            if let Err(e) = hand_off(|| self.sink.accept(batch)) {
                self.stats.record_sink_failure();
                warn!(error = %e, size, "batch sink failed");
            }
        }
        count
    }

    fn lock_state(&self) -> MutexGuard<'_, BatchState<E, C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: Clone, C: ElementComparator<E>> BatchResequencer<E, C> {
    /// Returns the open window's elements in order.
    #[must_use]
    pub fn pending_elements(&self) -> Vec<E> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .window
            .to_ordered_list()
    }
}

impl<E, C> Deliver for BatchResequencer<E, C>
where
    E: Send + 'static,
    C: ElementComparator<E> + 'static,
{
    fn deliver(&self) -> usize {
        BatchResequencer::deliver(self)
    }

    fn tick(&self) -> usize {
        BatchResequencer::tick(self)
    }

    fn pending(&self) -> usize {
        self.len()
    }

    fn wake_signal(&self) -> Option<Arc<Notify>> {
        Some(self.wake.clone())
    }

    fn shutdown(&self, policy: StopPolicy) -> usize {
        match policy {
            StopPolicy::Flush => self.deliver(),
            StopPolicy::Drop => self.clear(),
        }
    }
}
