//! Pipeline orchestration and execution.
//!
//! A [`Pipeline`] is a lazy description: a source followed by stages and
//! optional fan-out/merge sections. Calling [`Pipeline::run`] materializes
//! it once, spawning one task per source, stage, fan-out replica and merge
//! drain, and hands back the final queue inside a [`Running`] handle.

pub mod fan_out;
pub mod merge;
pub mod stage;

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, Instrument};

use crate::core::{Capacity, Error, Processor, Queue, Result, Sink, Source};
use crate::processors::BoxProcessor;
use crate::sources::IterSource;

pub use fan_out::{fan_out, FanOut};
pub use merge::{merge, MergeGroup};
pub use stage::{spawn_source, spawn_stage};

/// Configuration for pipeline execution
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Prefix for stage names in logs and metrics
    pub name: String,
    /// Buffering of every queue the pipeline creates
    pub capacity: Capacity,
    /// Whether a failing stage function cancels the whole pipeline
    pub fail_fast: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "pipeline".to_string(),
            capacity: Capacity::Unbounded,
            fail_fast: true,
        }
    }
}

impl PipelineConfig {
    /// Set the name prefix
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Set the queue capacity
    pub fn with_capacity(mut self, capacity: Capacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Set whether to fail fast on stage errors
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

/// Shared state of one materialized pipeline: its configuration, the
/// cancellation token every task observes, and the handles of every task.
#[derive(Clone)]
pub struct PipelineContext {
    config: Arc<PipelineConfig>,
    token: CancellationToken,
    tasks: Arc<Mutex<JoinSet<Result<()>>>>,
    next_stage: Arc<AtomicUsize>,
}

impl PipelineContext {
    /// Create a context for one pipeline run
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config: Arc::new(config),
            token: CancellationToken::new(),
            tasks: Arc::new(Mutex::new(JoinSet::new())),
            next_stage: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The configuration this pipeline runs with
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// A clone of the cancellation token
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Stop every task. Each closes its output on the way out.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the pipeline was cancelled
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Unique name for the next stage, e.g. `pipeline.stage-2`.
    pub fn next_stage_name(&self, label: &str) -> String {
        let n = self.next_stage.fetch_add(1, Ordering::Relaxed);
        format!("{}.{}-{}", self.config.name, label, n)
    }

    /// Spawn a pipeline task on the current tokio runtime.
    pub fn spawn<F>(&self, name: &str, task: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let span = tracing::debug_span!("task", name = %name);
        self.lock_tasks().spawn(task.instrument(span));
    }

    /// Wait for every spawned task and report the first real failure.
    pub async fn join(&self) -> Result<()> {
        let mut errors = Vec::new();
        loop {
            let mut tasks = std::mem::replace(&mut *self.lock_tasks(), JoinSet::new());
            if tasks.is_empty() {
                break;
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => errors.push(e),
                    Err(e) => errors.push(Error::from(e)),
                }
            }
        }
        match Error::from_many(errors) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn lock_tasks(&self) -> MutexGuard<'_, JoinSet<Result<()>>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

type BuildFn<T> = Box<dyn FnOnce(&PipelineContext) -> Result<Queue<T>> + Send>;
type BuildFanOutFn<T> = Box<dyn FnOnce(&PipelineContext) -> Result<FanOut<T>> + Send>;

/// A pipeline description: a source followed by stages.
///
/// Nothing runs until [`Pipeline::run`], [`Pipeline::collect`] or
/// [`Pipeline::sink`] is called.
pub struct Pipeline<T> {
    config: PipelineConfig,
    build: BuildFn<T>,
}

impl<T: Send + 'static> Pipeline<T> {
    /// Start a pipeline from a source
    pub fn new<S>(source: S) -> Self
    where
        S: Source<Item = T> + Send + 'static,
    {
        Self {
            config: PipelineConfig::default(),
            build: Box::new(move |ctx| Ok(spawn_source(ctx, source))),
        }
    }

    /// Start a pipeline from any finite sequence of items
    pub fn from_items<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: Send + 'static,
    {
        Self::new(IterSource::new(items))
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the name prefix used for stage names
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the capacity of every queue
    pub fn capacity(mut self, capacity: Capacity) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Bound every queue to `size` values
    pub fn bounded(self, size: usize) -> Self {
        self.capacity(Capacity::bounded(size))
    }

    /// Set whether to fail fast on errors
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.config.fail_fast = fail_fast;
        self
    }

    /// Append a stage
    pub fn pipe<P>(self, processor: P) -> Pipeline<P::Output>
    where
        P: Processor<Input = T> + Send + 'static,
    {
        let Pipeline { config, build } = self;
        Pipeline {
            config,
            build: Box::new(move |ctx| {
                let input = build(ctx)?;
                spawn_stage(ctx, input, processor)
            }),
        }
    }

    /// Split the current queue across `replicas` instances of a stage
    pub fn fan_out<P, F>(self, replicas: usize, factory: F) -> FanOutPipeline<P::Output>
    where
        P: Processor<Input = T> + Send + 'static,
        F: FnMut(usize) -> P + Send + 'static,
    {
        let Pipeline { config, build } = self;
        FanOutPipeline {
            config,
            build: Box::new(move |ctx| {
                let input = build(ctx)?;
                fan_out(ctx, input, replicas, factory)
            }),
        }
    }

    /// Materialize the pipeline, starting every task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn run(self) -> Result<Running<T>> {
        let Pipeline { config, build } = self;
        let ctx = PipelineContext::new(config);
        debug!(pipeline = %ctx.config().name, "materializing pipeline");
        match build(&ctx) {
            Ok(queue) => Ok(Running { queue, ctx }),
            Err(e) => {
                ctx.cancel();
                Err(e)
            }
        }
    }

    /// Run the pipeline and collect its output
    pub async fn collect(self) -> Result<Vec<T>> {
        self.run()?.collect().await
    }

    /// Run the pipeline into a sink
    pub async fn sink<S>(self, sink: S) -> Result<S::Output>
    where
        S: Sink<Item = T> + Send,
    {
        self.run()?.sink(sink).await
    }
}

/// A pipeline whose tail is a fan-out; finish it with a merge.
pub struct FanOutPipeline<T> {
    config: PipelineConfig,
    build: BuildFanOutFn<T>,
}

impl<T: Send + 'static> FanOutPipeline<T> {
    /// Merge the replica outputs back into one queue
    pub fn merge(self) -> Pipeline<T> {
        let FanOutPipeline { config, build } = self;
        Pipeline {
            config,
            build: Box::new(move |ctx| build(ctx)?.merge()),
        }
    }

    /// Merge partial results and fold them with a second aggregate stage
    pub fn combine<P>(self, aggregate: P) -> Pipeline<P::Output>
    where
        P: Processor<Input = T> + Send + 'static,
    {
        let FanOutPipeline { config, build } = self;
        Pipeline {
            config,
            build: Box::new(move |ctx| build(ctx)?.combine(aggregate)),
        }
    }
}

/// A materialized pipeline: its final queue plus the tasks feeding it.
pub struct Running<T> {
    queue: Queue<T>,
    ctx: PipelineContext,
}

impl<T: Send + 'static> Running<T> {
    /// The final queue
    pub fn queue(&self) -> &Queue<T> {
        &self.queue
    }

    /// The shared pipeline context
    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Split into the final queue and the context
    pub fn into_parts(self) -> (Queue<T>, PipelineContext) {
        (self.queue, self.ctx)
    }

    /// Cancel every task
    pub fn cancel(&self) {
        self.ctx.cancel();
    }

    /// Drain the final queue, then wait for every task.
    pub async fn collect(self) -> Result<Vec<T>> {
        let items = self.queue.collect().await;
        self.ctx.join().await?;
        Ok(items)
    }

    /// Drain the final queue into a sink, then wait for every task.
    pub async fn sink<S>(self, sink: S) -> Result<S::Output>
    where
        S: Sink<Item = T> + Send,
    {
        let Running { queue, ctx } = self;
        let drained = crate::util::drain(queue, sink).await;
        if drained.is_err() {
            ctx.cancel();
        }
        let joined = ctx.join().await;
        let output = drained?;
        joined?;
        Ok(output)
    }

    /// Discard the output and wait for every task.
    pub async fn wait(self) -> Result<()> {
        let Running { queue, ctx } = self;
        drop(queue);
        ctx.join().await
    }
}

/// Chain `source` through `stages` in order and return the last queue.
///
/// With no stages the source's own queue is returned. Every stage starts
/// as soon as it is bound.
pub fn compose<S, T>(
    ctx: &PipelineContext,
    source: S,
    stages: Vec<BoxProcessor<T, T>>,
) -> Result<Queue<T>>
where
    S: Source<Item = T> + Send + 'static,
    T: Send + 'static,
{
    let mut queue = spawn_source(ctx, source);
    for stage in stages {
        queue = spawn_stage(ctx, queue, stage)?;
    }
    Ok(queue)
}
