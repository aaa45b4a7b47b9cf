//! Core traits and types for the channelweld library.
//!
//! This module contains the queue and barrier primitives, the error type,
//! and the traits that define the stage model.

pub mod barrier;
pub mod error;
pub mod queue;
pub mod traits;

// Re-export core items
pub use barrier::{BarrierToken, JoinBarrier};
pub use error::{Error, IntoError, Result};
pub use queue::{channel, Capacity, Queue, QueueSender};
pub use traits::{Processor, Sink, Source, StageKind};
