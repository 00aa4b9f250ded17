/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! # resequencer-rs
//!
//! An in-memory resequencer: elements arrive in any order from any number of
//! producers and leave in the order defined by a pluggable
//! [`ElementComparator`].
//!
//! Two engines share that contract:
//!
//! - [`BatchResequencer`] collects elements into a window bounded by size and
//!   time, sorts the window and hands it downstream as one batch.
//! - [`StreamResequencer`] keeps a sorted buffer of pending elements and
//!   delivers the longest run of immediate successors of the last delivered
//!   element. An element blocked behind a gap for longer than the
//!   out-of-sequence timeout is force-delivered, so the stream never stalls.
//!
//! A [`DeliveryDriver`] invokes the engine periodically on a tokio task, and
//! [`Resequencer`] ties engine and driver together behind `start`/`stop`.
//!
//! ## Example
//!
//! ```
//! use resequencer_rs::{SequenceComparator, StreamConfig, StreamResequencer};
//! use std::sync::{Arc, Mutex};
//!
//! let out = Arc::new(Mutex::new(Vec::new()));
//! let sink_out = out.clone();
//! let engine = StreamResequencer::new(
//!     SequenceComparator,
//!     StreamConfig::default(),
//!     move |n: u64| {
//!         sink_out.lock().unwrap().push(n);
//!         Ok(())
//!     },
//! )
//! .unwrap();
//!
//! for n in [3u64, 1, 2] {
//!     engine.push(n).unwrap();
//! }
//! engine.deliver();
//! assert_eq!(*out.lock().unwrap(), vec![1, 2, 3]);
//! ```

pub mod resequencer;

pub use resequencer::batch::BatchResequencer;
pub use resequencer::clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use resequencer::comparator::{ElementComparator, KeyComparator, SequenceComparator, Sequenced};
pub use resequencer::config::{
    BatchConfig, ConfigError, ResequencerConfig, StopPolicy, StreamConfig,
};
pub use resequencer::driver::{Deliver, DeliveryDriver, DriverHandle};
pub use resequencer::error::ResequencerError;
pub use resequencer::lifecycle::Resequencer;
pub use resequencer::sequence::{DuplicatePolicy, Inserted, Sequence};
pub use resequencer::sink::{BatchSink, ElementSink, SinkError};
pub use resequencer::stats::{ResequencerStats, StatsSnapshot};
pub use resequencer::stream::StreamResequencer;
