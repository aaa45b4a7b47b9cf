//! Task bodies for sources and stages.
//!
//! Every task owns exactly one output sender and closes it on every exit
//! path: normal completion, stage failure, cancellation, or a downstream
//! consumer that went away.

use tracing::{debug, error, warn};

use crate::core::{channel, Error, Processor, Queue, QueueSender, Result, Source};
use crate::pipeline::PipelineContext;

/// Start a source task and return the queue it fills.
pub fn spawn_source<S>(ctx: &PipelineContext, source: S) -> Queue<S::Item>
where
    S: Source + Send + 'static,
{
    let name = ctx.next_stage_name("source");
    let (tx, rx) = channel(ctx.config().capacity);
    ctx.spawn(&name, run_source(ctx.clone(), name.clone(), source, tx));
    rx
}

/// Bind `input` to a new stage running `processor` and return its output queue.
///
/// The task starts immediately.
pub fn spawn_stage<P>(
    ctx: &PipelineContext,
    input: Queue<P::Input>,
    processor: P,
) -> Result<Queue<P::Output>>
where
    P: Processor + Send + 'static,
{
    input.ensure_bindable()?;
    let name = ctx.next_stage_name("stage");
    let (tx, rx) = channel(ctx.config().capacity);
    ctx.spawn(&name, run_stage(ctx.clone(), name.clone(), processor, input, tx));
    Ok(rx)
}

async fn run_source<S>(
    ctx: PipelineContext,
    name: String,
    mut source: S,
    output: QueueSender<S::Item>,
) -> Result<()>
where
    S: Source + Send,
{
    let token = ctx.token();
    let fail_fast = ctx.config().fail_fast;
    let mut emitted = 0usize;
    debug!(stage = %name, "source started");

    loop {
        let produced = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(stage = %name, emitted, "source cancelled");
                return Err(Error::Shutdown);
            }
            produced = source.produce() => produced,
        };

        match produced {
            Ok(Some(item)) => {
                if !forward(&ctx, &name, &output, vec![item], &mut emitted).await? {
                    return Ok(());
                }
            }
            Ok(None) => break,
            Err(e) => {
                #[cfg(feature = "metrics")]
                crate::metrics::record_error(&name);
                if fail_fast {
                    error!(stage = %name, error = %e, "source failed, cancelling pipeline");
                    ctx.cancel();
                    return Err(e);
                }
                warn!(stage = %name, error = %e, "source item skipped");
            }
        }
    }

    debug!(stage = %name, emitted, "source finished");
    output.close();
    Ok(())
}

/// Drive one stage instance until its input is closed and drained.
///
/// Fan-out replicas run this same loop over a shared input handle.
pub(crate) async fn run_stage<P>(
    ctx: PipelineContext,
    name: String,
    mut processor: P,
    input: Queue<P::Input>,
    output: QueueSender<P::Output>,
) -> Result<()>
where
    P: Processor + Send,
{
    let token = ctx.token();
    let fail_fast = ctx.config().fail_fast;
    let mut received = 0usize;
    let mut emitted = 0usize;
    debug!(stage = %name, kind = ?processor.kind(), "stage started");

    loop {
        let item = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!(stage = %name, received, emitted, "stage cancelled");
                return Err(Error::Shutdown);
            }
            item = input.recv() => item,
        };
        let Some(item) = item else { break };
        received += 1;
        #[cfg(feature = "metrics")]
        crate::metrics::record_received(&name);

        match processor.process(item).await {
            Ok(outputs) => {
                if !forward(&ctx, &name, &output, outputs, &mut emitted).await? {
                    return Ok(());
                }
            }
            Err(e) => {
                #[cfg(feature = "metrics")]
                crate::metrics::record_error(&name);
                if fail_fast {
                    error!(stage = %name, error = %e, "stage failed, cancelling pipeline");
                    ctx.cancel();
                    return Err(e);
                }
                warn!(stage = %name, error = %e, "stage item dropped");
            }
        }
    }

    match processor.finish().await {
        Ok(outputs) => {
            if !forward(&ctx, &name, &output, outputs, &mut emitted).await? {
                return Ok(());
            }
        }
        Err(e) => {
            error!(stage = %name, error = %e, "stage failed to finish, cancelling pipeline");
            ctx.cancel();
            return Err(e);
        }
    }

    debug!(stage = %name, received, emitted, "stage finished");
    output.close();
    Ok(())
}

/// Push outputs downstream. `Ok(false)` means the consumer is gone.
pub(crate) async fn forward<T: Send>(
    ctx: &PipelineContext,
    name: &str,
    output: &QueueSender<T>,
    items: Vec<T>,
    emitted: &mut usize,
) -> Result<bool> {
    let token = ctx.token();
    for item in items {
        let pushed = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(Error::Shutdown),
            pushed = output.push(item) => pushed,
        };
        match pushed {
            Ok(()) => {
                *emitted += 1;
                #[cfg(feature = "metrics")]
                crate::metrics::record_emitted(name);
            }
            Err(Error::ChannelClosed) => {
                debug!(stage = %name, "downstream dropped its queue, stopping");
                return Ok(false);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}
