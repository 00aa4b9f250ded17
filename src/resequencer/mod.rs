/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Resequencer module for restoring the order of out-of-order elements.
//!
//! # Architecture
//!
//! - An [`ElementComparator`] defines order, adjacency and validity
//! - Pending elements live in a sorted [`Sequence`] guarded by one mutex
//! - [`BatchResequencer`] emits one sorted batch per closed window
//! - [`StreamResequencer`] emits contiguous successor runs and breaks gaps
//!   after the out-of-sequence timeout
//! - A [`DeliveryDriver`] ticks the engine on a tokio task
//! - [`Resequencer`] adds `start`/`stop` on top
//!
//! # Examples
//!
//! ```no_run
//! use resequencer_rs::resequencer::{BatchConfig, Resequencer, SequenceComparator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = BatchConfig::default();
//! let resequencer = Resequencer::batch(SequenceComparator, config, |batch: Vec<u64>| {
//!     println!("{batch:?}");
//!     Ok(())
//! })?;
//!
//! resequencer.start()?;
//! for n in [5u64, 1, 4, 2, 3] {
//!     resequencer.push(n)?;
//! }
//! resequencer.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod clock;
pub mod comparator;
pub mod config;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod sequence;
pub mod sink;
pub mod stats;
pub mod stream;

#[cfg(test)]
mod tests;

// Re-export main types
pub use batch::BatchResequencer;
pub use clock::{Clock, ManualClock, SystemClock, TokioClock};
pub use comparator::{ElementComparator, KeyComparator, SequenceComparator, Sequenced};
pub use config::{BatchConfig, ConfigError, ResequencerConfig, StopPolicy, StreamConfig};
pub use driver::{Deliver, DeliveryDriver, DriverHandle};
pub use error::ResequencerError;
pub use lifecycle::Resequencer;
pub use sequence::{DuplicatePolicy, Inserted, Sequence};
pub use sink::{BatchSink, ElementSink, SinkError};
pub use stats::{ResequencerStats, StatsSnapshot};
pub use stream::StreamResequencer;
