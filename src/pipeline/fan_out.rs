//! Fan-out: N replicas of a stage competing for one input queue.
//!
//! Replicas share a single consumption point, so every value reaches
//! exactly one replica. This is load splitting, not broadcast.

use tracing::{debug, error};

use crate::core::{channel, Error, Processor, Queue, Result, StageKind};
use crate::pipeline::merge::merge;
use crate::pipeline::stage::{run_stage, spawn_stage};
use crate::pipeline::PipelineContext;

/// The output queues of a running fan-out, one per replica.
pub struct FanOut<T> {
    ctx: PipelineContext,
    outputs: Vec<Queue<T>>,
    kind: StageKind,
}

/// Start `replicas` instances of the stage built by `factory`, all reading from `input`.
///
/// `factory` receives the replica index.
pub fn fan_out<P, F>(
    ctx: &PipelineContext,
    input: Queue<P::Input>,
    replicas: usize,
    mut factory: F,
) -> Result<FanOut<P::Output>>
where
    P: Processor + Send + 'static,
    F: FnMut(usize) -> P,
{
    if replicas == 0 {
        return Err(Error::topology("fan-out needs at least one replica"));
    }
    input.ensure_bindable()?;

    let processors: Vec<P> = (0..replicas).map(&mut factory).collect();
    let kind = processors[0].kind();
    if let Some(other) = processors.iter().map(Processor::kind).find(|k| *k != kind) {
        let message = format!(
            "fan-out replicas must share one stage kind, got {:?} and {:?}",
            kind, other
        );
        error!("{}", message);
        ctx.cancel();
        return Err(Error::topology(message));
    }

    let base = ctx.next_stage_name("fan-out");
    let mut outputs = Vec::with_capacity(replicas);

    for (replica, processor) in processors.into_iter().enumerate() {
        let name = format!("{}[{}]", base, replica);
        let (tx, rx) = channel(ctx.config().capacity);
        ctx.spawn(
            &name,
            run_stage(ctx.clone(), name.clone(), processor, input.share(), tx),
        );
        outputs.push(rx);
    }
    debug!(stage = %base, replicas, kind = ?kind, "fan-out started");

    Ok(FanOut {
        ctx: ctx.clone(),
        outputs,
        kind,
    })
}

impl<T: Send + 'static> FanOut<T> {
    /// Number of replicas
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Always false: a fan-out has at least one replica
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// The stage contract the replicas follow
    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// The replica output queues, for callers that consume them separately.
    ///
    /// Aggregate replicas only hold partial results and are rejected.
    pub fn into_queues(self) -> Result<Vec<Queue<T>>> {
        self.ensure_complete("take the replica queues of")?;
        Ok(self.outputs)
    }

    /// Merge every replica output into one queue.
    ///
    /// Aggregate replicas are rejected; use [`FanOut::combine`].
    pub fn merge(self) -> Result<Queue<T>> {
        self.ensure_complete("merge")?;
        Ok(merge(&self.ctx, self.outputs))
    }

    /// Merge the partial results and fold them with a second aggregate pass.
    pub fn combine<P>(self, aggregate: P) -> Result<Queue<P::Output>>
    where
        P: Processor<Input = T> + Send + 'static,
    {
        if aggregate.kind() != StageKind::Aggregate {
            return Err(self.reject(
                "combining a fan-out needs an aggregate stage for the second pass",
            ));
        }
        let merged = merge(&self.ctx, self.outputs);
        spawn_stage(&self.ctx, merged, aggregate)
    }

    fn ensure_complete(&self, action: &str) -> Result<()> {
        if self.kind.is_partial_when_replicated() {
            return Err(self.reject(&format!(
                "cannot {} fanned-out aggregate stages without a second aggregate pass",
                action
            )));
        }
        Ok(())
    }

    fn reject(&self, message: &str) -> Error {
        error!(replicas = self.outputs.len(), "{}", message);
        self.ctx.cancel();
        Error::topology(message)
    }
}
