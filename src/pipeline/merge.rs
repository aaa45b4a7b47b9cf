//! Fan-in: merge several queues into one.
//!
//! One drain task per input forwards values into the combined output. Each
//! drain holds a [`BarrierToken`]; a closer task waits on the
//! [`JoinBarrier`] and closes the output once every input is exhausted.
//! Values from one input keep their relative order; across inputs the
//! interleaving is arbitrary.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::core::{channel, BarrierToken, Error, JoinBarrier, Queue, QueueSender, Result};
use crate::pipeline::stage::forward;
use crate::pipeline::PipelineContext;

/// A set of queues to be merged.
pub struct MergeGroup<T> {
    inputs: Vec<Queue<T>>,
}

impl<T: Send + 'static> MergeGroup<T> {
    /// Create an empty merge group
    pub fn new() -> Self {
        Self { inputs: Vec::new() }
    }

    /// Add an input queue
    pub fn push(&mut self, queue: Queue<T>) {
        self.inputs.push(queue);
    }

    /// Number of inputs
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether the group has no inputs
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Start the drain and closer tasks and return the combined queue.
    pub fn spawn(self, ctx: &PipelineContext) -> Queue<T> {
        let name = ctx.next_stage_name("merge");
        let (tx, rx) = channel(ctx.config().capacity);
        let (barrier, tokens) = JoinBarrier::new(self.inputs.len());
        let tx = Arc::new(tx);
        debug!(stage = %name, inputs = self.inputs.len(), "merge started");

        for (index, (input, token)) in self.inputs.into_iter().zip(tokens).enumerate() {
            let drain_name = format!("{}.drain-{}", name, index);
            ctx.spawn(
                &drain_name,
                drain_into(ctx.clone(), drain_name.clone(), input, Arc::clone(&tx), token),
            );
        }

        let closer_name = format!("{}.closer", name);
        ctx.spawn(&closer_name, close_when_drained(name, barrier, tx));
        rx
    }
}

impl<T: Send + 'static> Default for MergeGroup<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> FromIterator<Queue<T>> for MergeGroup<T> {
    fn from_iter<I: IntoIterator<Item = Queue<T>>>(iter: I) -> Self {
        Self {
            inputs: iter.into_iter().collect(),
        }
    }
}

/// Merge `inputs` into one queue that closes after all of them are drained.
pub fn merge<T: Send + 'static>(ctx: &PipelineContext, inputs: Vec<Queue<T>>) -> Queue<T> {
    inputs.into_iter().collect::<MergeGroup<T>>().spawn(ctx)
}

async fn drain_into<T: Send>(
    ctx: PipelineContext,
    name: String,
    input: Queue<T>,
    output: Arc<QueueSender<T>>,
    done: BarrierToken,
) -> Result<()> {
    let token = ctx.token();
    let mut forwarded = 0usize;

    let result = loop {
        let item = tokio::select! {
            biased;
            _ = token.cancelled() => break Err(Error::Shutdown),
            item = input.recv() => item,
        };
        let Some(item) = item else { break Ok(()) };
        match forward(&ctx, &name, &output, vec![item], &mut forwarded).await {
            Ok(true) => {}
            Ok(false) => break Ok(()),
            Err(e) => break Err(e),
        }
    };

    // the closer can only reclaim the sender after every drain released it
    drop(output);
    done.done();
    trace!(stage = %name, forwarded, "merge input drained");
    result
}

async fn close_when_drained<T: Send>(
    name: String,
    barrier: JoinBarrier,
    output: Arc<QueueSender<T>>,
) -> Result<()> {
    barrier.wait().await;
    match Arc::try_unwrap(output) {
        Ok(output) => {
            output.close();
            debug!(stage = %name, "merge output closed");
            Ok(())
        }
        Err(_) => Err(Error::topology(
            "merge output still shared after every input was drained",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Capacity;
    use crate::pipeline::PipelineConfig;

    fn filled(values: Vec<i32>) -> Queue<i32> {
        let (tx, rx) = channel(Capacity::Unbounded);
        tokio::spawn(async move {
            for v in values {
                tx.push(v).await.unwrap();
            }
        });
        rx
    }

    #[tokio::test]
    async fn test_merge_nothing_closes_immediately() {
        let ctx = PipelineContext::new(PipelineConfig::default());
        let merged = merge::<i32>(&ctx, vec![]);
        assert!(merged.collect().await.is_empty());
        ctx.join().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_merge_keeps_per_input_order() {
        let ctx = PipelineContext::new(PipelineConfig::default());
        let merged = merge(
            &ctx,
            vec![
                filled((0..50).collect()),
                filled((100..150).collect()),
                filled(vec![]),
            ],
        );

        let items = merged.collect().await;
        assert_eq!(items.len(), 100);
        let low: Vec<_> = items.iter().copied().filter(|v| *v < 100).collect();
        let high: Vec<_> = items.iter().copied().filter(|v| *v >= 100).collect();
        assert_eq!(low, (0..50).collect::<Vec<_>>());
        assert_eq!(high, (100..150).collect::<Vec<_>>());
        ctx.join().await.unwrap();
    }

    #[tokio::test]
    async fn test_merge_waits_for_slow_input() {
        let ctx = PipelineContext::new(PipelineConfig::default());
        let (slow_tx, slow_rx) = channel(Capacity::Unbounded);
        let mut group: MergeGroup<i32> = MergeGroup::new();
        group.push(filled(vec![1, 2]));
        group.push(slow_rx);
        assert_eq!(group.len(), 2);
        let merged = group.spawn(&ctx);

        assert!(merged.recv().await.is_some());
        assert!(merged.recv().await.is_some());
        let pending =
            tokio::time::timeout(std::time::Duration::from_millis(20), merged.recv()).await;
        assert!(pending.is_err());

        slow_tx.push(3).await.unwrap();
        slow_tx.close();
        assert_eq!(merged.recv().await, Some(3));
        assert_eq!(merged.recv().await, None);
        ctx.join().await.unwrap();
    }
}
