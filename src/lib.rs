//! # Channel-wired concurrent pipelines for Rust
//!
//! This crate connects independently running stages with FIFO queues. Every
//! stage runs on its own tokio task, reads its input until the upstream
//! closes it, and closes its own output when done, so closure travels from
//! the source to the final consumer on its own.
//!
//! ## Core Concepts
//!
//! - **Queue**: A point-to-point FIFO with one writer that closes it exactly once
//! - **Source**: Produces a finite sequence of values into a fresh queue
//! - **Processor**: A stage. Transform, predicate or aggregate
//! - **Fan-out**: N replicas of a stage competing for one input queue
//! - **Merge**: Fan-in of several queues, closed by a join barrier
//! - **Sink**: Drains the final queue into a result
//!
//! ## Example
//!
//! ```rust
//! use channelweld::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let total = Pipeline::new(RangeSource::inclusive(1, 10))
//!         .pipe(FilterProcessor::new(|x: &i64| x % 2 == 0))
//!         .fan_out(5, |_| ReduceProcessor::sum(0i64))
//!         .combine(ReduceProcessor::sum(0i64))
//!         .collect()
//!         .await?;
//!
//!     assert_eq!(total, vec![30]);
//!     Ok(())
//! }
//! ```

pub mod core;
pub mod pipeline;
pub mod processors;
pub mod sinks;
pub mod sources;
pub mod util;

// Re-export commonly used items
pub mod prelude {
    pub use crate::core::{
        channel, Capacity, Error, IntoError, JoinBarrier, Processor, Queue, QueueSender, Result,
        Sink, Source, StageKind,
    };
    pub use crate::pipeline::{
        compose, fan_out, merge, spawn_source, spawn_stage, FanOut, FanOutPipeline, MergeGroup,
        Pipeline, PipelineConfig, PipelineContext, Running,
    };
    pub use crate::processors::*;
    pub use crate::sinks::*;
    pub use crate::sources::*;
    pub use crate::util::{drain, from_fn, from_stream, processor_from_fn, sink_from_fn};
}

// Re-export main error type
pub use crate::core::{Error, Result};

#[cfg(feature = "metrics")]
pub mod metrics;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
