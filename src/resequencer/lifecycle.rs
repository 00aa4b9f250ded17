/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Engine plus driver behind a `start`/`stop` lifecycle.

use super::batch::BatchResequencer;
use super::clock::Clock;
use super::comparator::ElementComparator;
use super::config::{BatchConfig, ConfigError, StopPolicy, StreamConfig};
use super::driver::{Deliver, DeliveryDriver, DriverHandle};
use super::error::ResequencerError;
use super::sink::{BatchSink, ElementSink};
use super::stream::StreamResequencer;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{error, info};

/// A resequencer engine driven by a periodic delivery task.
///
/// # Examples
///
/// ```no_run
/// use resequencer_rs::{Resequencer, SequenceComparator, StreamConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let resequencer = Resequencer::stream(SequenceComparator, StreamConfig::default(), |n: u64| {
///     println!("{n}");
///     Ok(())
/// })?;
///
/// resequencer.start()?;
/// resequencer.push(2u64)?;
/// resequencer.push(1u64)?;
/// resequencer.stop().await;
/// # Ok(())
/// # }
/// ```
pub struct Resequencer<R: Deliver> {
    engine: Arc<R>,
    interval: Duration,
    stop_policy: StopPolicy,
    driver: Mutex<Option<DriverHandle>>,
}

impl<R: Deliver> Resequencer<R> {
    /// Wraps an engine.
    #[must_use]
    pub fn new(engine: R, interval: Duration, stop_policy: StopPolicy) -> Self {
        Self {
            engine: Arc::new(engine),
            interval,
            stop_policy,
            driver: Mutex::new(None),
        }
    }

    /// Returns the wrapped engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<R> {
        &self.engine
    }

    /// Spawns the delivery driver.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ResequencerError::AlreadyStarted`] if the driver is running.
    pub fn start(&self) -> Result<(), ResequencerError> {
        let mut driver = self.lock_driver();
        if driver.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return Err(ResequencerError::AlreadyStarted);
        }
        *driver = Some(DeliveryDriver::spawn(self.engine.clone(), self.interval));
        Ok(())
    }

    /// Returns `true` while the driver is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock_driver()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Runs a delivery cycle immediately, in addition to the driver's.
    pub fn deliver(&self) -> usize {
        self.engine.deliver()
    }

    /// Returns the number of pending elements.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.engine.pending()
    }

    /// Stops the driver and empties the engine according to the stop policy.
    ///
    /// A delivery cycle in progress completes first. Returns the number of
    /// elements flushed or dropped.
    pub async fn stop(&self) -> usize {
        let handle = self.lock_driver().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.stop().await {
                error!(error = %e, "delivery driver terminated abnormally");
            }
        }

        let count = self.engine.shutdown(self.stop_policy);
        info!(policy = ?self.stop_policy, count, "resequencer stopped");
        count
    }

    fn lock_driver(&self) -> MutexGuard<'_, Option<DriverHandle>> {
        self.driver.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E, C> Resequencer<BatchResequencer<E, C>>
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
    pub fn batch<S>(comparator: C, config: BatchConfig, sink: S) -> Result<Self, ConfigError>
    where
        S: BatchSink<E> + 'static,
    {
        let interval = config.delivery_interval();
        let stop_policy = config.stop_policy;
        let engine = BatchResequencer::new(comparator, config, sink)?;
        Ok(Self::new(engine, interval, stop_policy))
    }

    /// Creates a batch resequencer reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `config` fails
    /// [`BatchConfig::validate`].
    pub fn batch_with_clock<S>(
        comparator: C,
        config: BatchConfig,
        sink: S,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError>
    where
        S: BatchSink<E> + 'static,
    {
        let interval = config.delivery_interval();
        let stop_policy = config.stop_policy;
        let engine = BatchResequencer::with_clock(comparator, config, sink, clock)?;
        Ok(Self::new(engine, interval, stop_policy))
    }

    /// Pushes an element into the batch window.
    ///
    /// # Errors
    ///
    /// See [`BatchResequencer::push`].
    pub fn push(&self, element: E) -> Result<(), ResequencerError> {
        self.engine.push(element)
    }
}

impl<E, C> Resequencer<StreamResequencer<E, C>>
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
    pub fn stream<S>(comparator: C, config: StreamConfig, sink: S) -> Result<Self, ConfigError>
    where
        S: ElementSink<E> + 'static,
    {
        let interval = config.delivery_interval();
        let stop_policy = config.stop_policy;
        let engine = StreamResequencer::new(comparator, config, sink)?;
        Ok(Self::new(engine, interval, stop_policy))
    }

    /// Creates a stream resequencer reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `config` fails
    /// [`StreamConfig::validate`].
    pub fn stream_with_clock<S>(
        comparator: C,
        config: StreamConfig,
        sink: S,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError>
    where
        S: ElementSink<E> + 'static,
    {
        let interval = config.delivery_interval();
        let stop_policy = config.stop_policy;
        let engine = StreamResequencer::with_clock(comparator, config, sink, clock)?;
        Ok(Self::new(engine, interval, stop_policy))
    }

    /// Pushes an element into the stream buffer.
    ///
    /// # Errors
    ///
    /// See [`StreamResequencer::push`].
    pub fn push(&self, element: E) -> Result<(), ResequencerError> {
        self.engine.push(element)
    }

    /// Clears the stream buffer and last delivered marker.
    pub fn reset_stream(&self) -> usize {
        self.engine.reset_stream()
    }
}
