/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/10/26
******************************************************************************/

//! Downstream sinks receiving resequenced output.
//!
//! Closures with the matching signature implement the sink traits, so a
//! sink is usually just `move |element| { ...; Ok(()) }`.
//!
//! Engines call sinks through [`hand_off`], so a sink that panics fails only
//! the element or batch it was given.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Error returned by a failing sink.
///
/// Sink failures are logged and counted but never retried: handoff to
/// downstream is at-most-once.
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Receives elements one at a time, in order (stream mode).
///
/// Called from the delivery driver's runtime thread, so it must not block.
pub trait ElementSink<E>: Send + Sync {
    /// Accepts the next element.
    ///
    /// # Errors
    ///
    /// Any error is logged by the engine; the element still counts as
    /// delivered. A panic is treated the same way.
    fn accept(&self, element: E) -> Result<(), SinkError>;
}

impl<E, F> ElementSink<E> for F
where
    F: Fn(E) -> Result<(), SinkError> + Send + Sync,
{
    #[inline]
    fn accept(&self, element: E) -> Result<(), SinkError> {
        self(element)
    }
}

/// Receives one sorted batch per flush (batch mode).
///
/// Called from the delivery driver's runtime thread, so it must not block.
pub trait BatchSink<E>: Send + Sync {
    /// Accepts a sorted batch.
    ///
    /// # Errors
    ///
    /// Any error is logged by the engine; the batch still counts as
    /// delivered. A panic is treated the same way.
    fn accept(&self, batch: Vec<E>) -> Result<(), SinkError>;
}

impl<E, F> BatchSink<E> for F
where
    F: Fn(Vec<E>) -> Result<(), SinkError> + Send + Sync,
{
    #[inline]
    fn accept(&self, batch: Vec<E>) -> Result<(), SinkError> {
        self(batch)
    }
}

/// Runs one sink call, turning a panic into a [`SinkError`].
pub(crate) fn hand_off<F>(call: F) -> Result<(), SinkError>
where
    F: FnOnce() -> Result<(), SinkError>,
{
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => Err(format!("sink panicked: {}", panic_message(payload.as_ref())).into()),
    }
}

/// Extracts the message of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
