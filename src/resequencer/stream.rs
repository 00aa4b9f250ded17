/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Stream resequencer engine.
//!
//! Pending elements wait in a sorted [`Sequence`]. Each delivery cycle hands
//! the sink the longest run of elements that immediately follow the last
//! delivered one. When the head of the buffer is not that successor, it has
//! to sit at the head for the out-of-sequence timeout before it is
//! force-delivered anyway, breaking the gap.
//!
//! Producers and the delivery cycle share one mutex over the buffer and the
//! last delivered marker. A second mutex serializes delivery cycles, so the
//! sink is called outside the buffer lock but never concurrently with itself.

use super::clock::{Clock, SystemClock};
use super::comparator::ElementComparator;
use super::config::{ConfigError, StopPolicy, StreamConfig};
use super::driver::Deliver;
use super::error::ResequencerError;
use super::sequence::{Inserted, Sequence};
use super::sink::{ElementSink, hand_off};
use super::stats::{ResequencerStats, StatsSnapshot};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

struct StreamState<E, C> {
    buffer: Sequence<E, C>,
    last_delivered: Option<E>,
    /// When the current buffer head became the head.
    head_since: Option<Instant>,
}

/// An element released by a delivery cycle.
struct Release<E> {
    element: E,
    forced: bool,
}

impl<E: Clone, C: ElementComparator<E>> StreamState<E, C> {
    /// Removes the deliverable run from the buffer and advances the marker.
    fn take_deliverable(&mut self, now: Instant, timeout: Duration) -> Vec<Release<E>> {
        let mut released = Vec::new();

        loop {
            let Ok(head) = self.buffer.peek_first() else {
                break;
            };

            let in_sequence = match &self.last_delivered {
                None => true,
                Some(last) => self.buffer.comparator().successor(head, last),
            };

            let forced = if in_sequence {
                false
            } else {
                let since = *self.head_since.get_or_insert(now);
                if now.saturating_duration_since(since) < timeout {
                    break;
                }
                true
            };

            let Ok(element) = self.buffer.remove_first() else {
                break;
            };
            self.last_delivered = Some(element.clone());
            self.head_since = (!self.buffer.is_empty()).then_some(now);
            released.push(Release { element, forced });
        }

        released
    }

    fn clear(&mut self) -> usize {
        let dropped = self.buffer.len();
        self.buffer.clear();
        self.last_delivered = None;
        self.head_since = None;
        dropped
    }
}

/// Gap-detecting stream resequencer.
///
/// # Examples
///
/// ```
/// use resequencer_rs::{ManualClock, SequenceComparator, StreamConfig, StreamResequencer};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// let clock = Arc::new(ManualClock::new());
/// let out = Arc::new(Mutex::new(Vec::new()));
/// let sink_out = out.clone();
/// let config = StreamConfig { out_of_sequence_timeout_ms: 500, ..StreamConfig::default() };
/// let engine = StreamResequencer::with_clock(
///     SequenceComparator,
///     config,
///     move |n: u64| {
///         sink_out.lock().unwrap().push(n);
///         Ok(())
///     },
///     clock.clone(),
/// )
/// .unwrap();
///
/// engine.push(1u64).unwrap();
/// engine.push(3u64).unwrap();
/// engine.deliver();
/// assert_eq!(*out.lock().unwrap(), vec![1]);
///
/// clock.advance(Duration::from_millis(500));
/// engine.deliver();
/// assert_eq!(*out.lock().unwrap(), vec![1, 3]);
/// ```
pub struct StreamResequencer<E, C> {
    comparator: Arc<C>,
    state: Mutex<StreamState<E, C>>,
    delivery: Mutex<()>,
    sink: Box<dyn ElementSink<E>>,
    clock: Arc<dyn Clock>,
    config: StreamConfig,
    stats: ResequencerStats,
}

impl<E, C> StreamResequencer<E, C>
where
    E: Clone + Send + 'static,
    C: ElementComparator<E> + 'static,
{
    /// Creates a stream resequencer using the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `config` fails
    /// [`StreamConfig::validate`].
    pub fn new<S>(comparator: C, config: StreamConfig, sink: S) -> Result<Self, ConfigError>
    where
        S: ElementSink<E> + 'static,
    {
        Self::with_clock(comparator, config, sink, Arc::new(SystemClock))
    }

    /// Creates a stream resequencer reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `config` fails
    /// [`StreamConfig::validate`].
    pub fn with_clock<S>(
        comparator: C,
        config: StreamConfig,
        sink: S,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError>
    where
        S: ElementSink<E> + 'static,
    {
        config.validate()?;
        let comparator = Arc::new(comparator);
        let buffer = Sequence::new(comparator.clone(), config.duplicates);

        Ok(Self {
            comparator,
            state: Mutex::new(StreamState {
                buffer,
                last_delivered: None,
                head_since: None,
            }),
            delivery: Mutex::new(()),
            sink: Box::new(sink),
            clock,
            config,
            stats: ResequencerStats::new(),
        })
    }

    /// Adds an element to the buffer.
    ///
    /// Never waits for delivery.
    ///
    /// # Errors
    ///
    /// - [`ResequencerError::InvalidElement`] if the comparator rejects it
    ///   (unless `ignore_invalid` is set, in which case it is dropped)
    /// - [`ResequencerError::ElementTooOld`] if `reject_old` is set and the
    ///   element is not after the last delivered one
    /// - [`ResequencerError::CapacityExceeded`] if the buffer is full
    /// - [`ResequencerError::DuplicateKey`] if an equal element is pending
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

        let mut state = self.lock_state();

        if self.config.reject_old {
            if let Some(last) = &state.last_delivered {
                if self.comparator.compare(&element, last) != Ordering::Greater {
                    self.stats.record_rejected();
                    debug!("rejecting element not after the last delivered one");
                    return Err(ResequencerError::ElementTooOld);
                }
            }
        }

        if let Some(capacity) = self.config.capacity {
            if state.buffer.len() >= capacity {
                self.stats.record_rejected();
                debug!(capacity, "rejecting element, stream buffer full");
                return Err(ResequencerError::CapacityExceeded { capacity });
            }
        }

        match state.buffer.insert(element) {
            Ok(Inserted::New(0)) => {
                state.head_since = Some(self.clock.now());
                self.stats.record_accepted();
                Ok(())
            }
            Ok(_) => {
                self.stats.record_accepted();
                Ok(())
            }
            Err(e) => {
                self.stats.record_duplicate();
                debug!("rejecting duplicate element");
                Err(e)
            }
        }
    }

    /// Runs one delivery cycle.
    ///
    /// Delivers the contiguous run following the last delivered element,
    /// breaking a gap at the head once it has waited for the
    /// out-of-sequence timeout. Returns the number of elements delivered.
    pub fn deliver(&self) -> usize {
        let _cycle = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);

        let now = self.clock.now();
        let released = self
            .lock_state()
            .take_deliverable(now, self.config.out_of_sequence_timeout());

        let count = released.len();
        for Release { element, forced } in released {
            if forced {
                self.stats.record_forced();
                warn!("out-of-sequence timeout elapsed, delivering past gap");
            }
            trace!(forced, "delivering element");
            self.send(element);
        }

        count
    }

    /// Clears the buffer and the last delivered marker.
    ///
    /// Used when upstream signals a discontinuity. Returns the number of
    /// pending elements discarded.
    pub fn reset_stream(&self) -> usize {
        let dropped = self.lock_state().clear();
        self.stats.record_dropped(dropped as u64);
        if dropped > 0 {
            warn!(dropped, "stream reset discarded pending elements");
        } else {
            debug!("stream reset");
        }
        dropped
    }

    /// Returns a copy of the last delivered element.
    #[must_use]
    pub fn last_delivered(&self) -> Option<E> {
        self.lock_state().last_delivered.clone()
    }

    /// Returns the pending elements in order.
    #[must_use]
    pub fn pending_elements(&self) -> Vec<E> {
        self.lock_state().buffer.to_ordered_list()
    }

    /// Returns the number of pending elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_state().buffer.len()
    }

    /// Returns `true` if nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Returns the current counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Delivers every pending element in order, ignoring gaps.
    fn flush_all(&self) -> usize {
        let _cycle = self.delivery.lock().unwrap_or_else(PoisonError::into_inner);

        let pending = {
            let mut state = self.lock_state();
            let pending = state.buffer.drain_ordered();
            if let Some(last) = pending.last() {
                state.last_delivered = Some(last.clone());
            }
            state.head_since = None;
            pending
        };

        let count = pending.len();
        for element in pending {
            self.send(element);
        }
        count
    }

    fn send(&self, element: E) {
        self.stats.record_delivered(1);
        if let Err(e) = hand_off(|| self.sink.accept(element)) {
            self.stats.record_sink_failure();
            warn!(error = %e, "element sink failed");
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, StreamState<E, C>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E, C> Deliver for StreamResequencer<E, C>
where
    E: Clone + Send + 'static,
    C: ElementComparator<E> + 'static,
{
    fn deliver(&self) -> usize {
        StreamResequencer::deliver(self)
    }

    fn pending(&self) -> usize {
        self.len()
    }

    fn shutdown(&self, policy: StopPolicy) -> usize {
        match policy {
            StopPolicy::Flush => self.flush_all(),
            StopPolicy::Drop => self.reset_stream(),
        }
    }
}
