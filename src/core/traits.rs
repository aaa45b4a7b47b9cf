//! Core traits for the stage system.
//!
//! A pipeline is built from three roles: a [`Source`] that materializes a
//! finite sequence, [`Processor`]s that run as independent stages between
//! two queues, and a [`Sink`] that drains the final queue into a single
//! value or side effect.

use crate::core::error::Result;
use async_trait::async_trait;

/// A source generates a finite sequence of items.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use channelweld::core::{Result, Source};
///
/// struct CounterSource {
///     current: u64,
///     max: u64,
/// }
///
/// #[async_trait]
/// impl Source for CounterSource {
///     type Item = u64;
///
///     async fn produce(&mut self) -> Result<Option<Self::Item>> {
///         if self.current <= self.max {
///             let item = self.current;
///             self.current += 1;
///             Ok(Some(item))
///         } else {
///             Ok(None) // Signal completion
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Source {
    /// The type of items this source generates
    type Item: Send + 'static;

    /// Produce the next item, or None once the source is exhausted.
    async fn produce(&mut self) -> Result<Option<Self::Item>>;
}

/// The behavioral contract a stage follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// One output per input, arrival order preserved
    Transform,
    /// Inputs forwarded unchanged or dropped
    Predicate,
    /// Whole input folded into exactly one output on completion
    Aggregate,
}

impl StageKind {
    /// Aggregate stages only see part of the input when fanned out.
    pub fn is_partial_when_replicated(&self) -> bool {
        matches!(self, StageKind::Aggregate)
    }
}

/// A processor is the unit of work a stage runs.
///
/// The stage task feeds every input item to [`Processor::process`] and
/// pushes whatever it returns downstream, then calls
/// [`Processor::finish`] once the input queue is closed and drained.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use channelweld::core::{Processor, Result};
///
/// struct DoubleProcessor;
///
/// #[async_trait]
/// impl Processor for DoubleProcessor {
///     type Input = i32;
///     type Output = i32;
///
///     async fn process(&mut self, item: Self::Input) -> Result<Vec<Self::Output>> {
///         Ok(vec![item * 2])
///     }
/// }
/// ```
#[async_trait]
pub trait Processor {
    /// The type of items this processor accepts
    type Input: Send + 'static;
    /// The type of items this processor produces
    type Output: Send + 'static;

    /// Process an input item and produce zero or more output items.
    ///
    /// Returning an empty Vec means the item was consumed but produced no output.
    async fn process(&mut self, item: Self::Input) -> Result<Vec<Self::Output>>;

    /// Called when upstream is exhausted, allowing final output generation.
    async fn finish(&mut self) -> Result<Vec<Self::Output>> {
        Ok(vec![])
    }

    /// Which stage contract this processor follows.
    fn kind(&self) -> StageKind {
        StageKind::Transform
    }
}

#[async_trait]
impl<P> Processor for Box<P>
where
    P: Processor + Send + ?Sized,
{
    type Input = P::Input;
    type Output = P::Output;

    async fn process(&mut self, item: Self::Input) -> Result<Vec<Self::Output>> {
        (**self).process(item).await
    }

    async fn finish(&mut self) -> Result<Vec<Self::Output>> {
        (**self).finish().await
    }

    fn kind(&self) -> StageKind {
        (**self).kind()
    }
}

/// A sink drains a queue into a single result.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use channelweld::core::{Result, Sink};
///
/// struct LengthSink(usize);
///
/// #[async_trait]
/// impl Sink for LengthSink {
///     type Item = String;
///     type Output = usize;
///
///     async fn write(&mut self, item: Self::Item) -> Result<()> {
///         self.0 += item.len();
///         Ok(())
///     }
///
///     async fn finish(self) -> Result<usize> {
///         Ok(self.0)
///     }
/// }
/// ```
#[async_trait]
pub trait Sink {
    /// The type of items this sink accepts
    type Item: Send + 'static;
    /// What the sink yields once its input is exhausted
    type Output: Send + 'static;

    /// Accept a single item.
    async fn write(&mut self, item: Self::Item) -> Result<()>;

    /// Called when the upstream queue is exhausted.
    async fn finish(self) -> Result<Self::Output>;
}
