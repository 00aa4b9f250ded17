/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Periodic delivery driver.
//!
//! The driver is a tokio task that calls [`Deliver::tick`] on an engine over
//! and over. The delay is fixed: each sleep starts when the previous cycle
//! ends, so a slow sink slows the driver down instead of piling up ticks.
//!
//! Cycles run synchronously on a runtime worker thread, and sinks are called
//! from there. A sink must not block; one that does I/O should hand the
//! element to a channel or to `spawn_blocking` and return.
//!
//! # Examples
//!
//! ```no_run
//! use resequencer_rs::{DeliveryDriver, SequenceComparator, StreamConfig, StreamResequencer};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StreamConfig::default();
//! let interval = config.delivery_interval();
//! let engine = Arc::new(StreamResequencer::new(SequenceComparator, config, |n: u64| {
//!     println!("{n}");
//!     Ok(())
//! })?);
//!
//! let driver = DeliveryDriver::spawn(engine.clone(), interval);
//! engine.push(1u64)?;
//! // ...
//! driver.stop().await?;
//! # Ok(())
//! # }
//! ```

use super::config::StopPolicy;
use super::sink::panic_message;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tokio::task::{JoinError, JoinHandle};
use tracing::{error, info, trace};

/// Operations the driver and lifecycle need from an engine.
pub trait Deliver: Send + Sync + 'static {
    /// Delivers everything the engine is allowed to deliver right now.
    ///
    /// Returns the number of elements handed to the sink.
    fn deliver(&self) -> usize;

    /// Scheduled delivery, invoked once per driver cycle.
    ///
    /// Defaults to [`deliver`](Self::deliver).
    fn tick(&self) -> usize {
        self.deliver()
    }

    /// Number of elements waiting in the engine.
    fn pending(&self) -> usize;

    /// Signal the engine fires when it wants a cycle before the next tick.
    fn wake_signal(&self) -> Option<Arc<Notify>> {
        None
    }

    /// Empties the engine according to `policy`.
    ///
    /// Returns the number of elements flushed or dropped.
    fn shutdown(&self, policy: StopPolicy) -> usize;
}

/// Spawns delivery drivers.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryDriver;

impl DeliveryDriver {
    /// Spawns a driver ticking `engine` every `interval`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn<R: Deliver>(engine: Arc<R>, interval: Duration) -> DriverHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let wake = engine.wake_signal();

        let interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        info!(interval_ms, "delivery driver started");
        let handle = tokio::spawn(run_loop(engine, interval, wake, shutdown_rx));

        DriverHandle {
            shutdown: shutdown_tx,
            handle,
        }
    }
}

/// Handle to a running driver.
///
/// Dropping the handle cancels the driver.
#[derive(Debug)]
pub struct DriverHandle {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl DriverHandle {
    /// Requests cancellation.
    ///
    /// A cycle already running completes; no further cycle starts.
    pub fn cancel(&self) {
        self.shutdown.send_replace(true);
    }

    /// Returns `true` once the driver task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancels the driver and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns the task's [`JoinError`] if it was aborted.
    pub async fn stop(self) -> Result<(), JoinError> {
        self.cancel();
        self.handle.await
    }
}

async fn run_loop<R: Deliver>(
    engine: Arc<R>,
    interval: Duration,
    wake: Option<Arc<Notify>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut cycles: u64 = 0;

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            _ = wait_for_wake(wake.as_deref()) => {}
            _ = tokio::time::sleep(interval) => {}
        }

        cycles = cycles.wrapping_add(1);
        run_cycle(engine.as_ref(), cycles);
    }

    info!(cycles, "delivery driver stopped");
}

async fn wait_for_wake(wake: Option<&Notify>) {
    match wake {
        Some(notify) => notify.notified().await,
        None => std::future::pending().await,
    }
}

fn run_cycle<R: Deliver>(engine: &R, cycle: u64) {
    match catch_unwind(AssertUnwindSafe(|| engine.tick())) {
        Ok(0) => {}
        Ok(delivered) => trace!(cycle, delivered, "delivery cycle completed"),
        Err(payload) => error!(
            cycle,
            panic = panic_message(payload.as_ref()),
            "delivery cycle panicked, driver keeps running"
        ),
    }
}
