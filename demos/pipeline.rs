//! Linear pipeline demo: the sum of the squares of the odd numbers in
//! 1..=10, built once with the builder and once with `compose`.

use channelweld::prelude::*;
use tracing_subscriber::EnvFilter;

fn is_odd(x: &i64) -> bool {
    x % 2 != 0
}

fn square(x: i64) -> i64 {
    x * x
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== builder ===");
    Pipeline::new(RangeSource::inclusive(1, 10))
        .name("builder")
        .bounded(4)
        .pipe(FilterProcessor::new(is_odd))
        .pipe(InspectProcessor::new(|x: &i64| tracing::debug!(value = x, "odd")))
        .pipe(MapProcessor::new(square))
        .pipe(ReduceProcessor::sum(0i64))
        .sink(PrintSink::with_prefix("sum"))
        .await?;

    println!("=== compose ===");
    let ctx = PipelineContext::new(PipelineConfig::default().with_name("compose"));
    let stages: Vec<BoxProcessor<i64, i64>> = vec![
        Box::new(FilterProcessor::new(is_odd)),
        Box::new(MapProcessor::new(square)),
        Box::new(ReduceProcessor::sum(0i64)),
    ];
    let queue = compose(&ctx, RangeSource::inclusive(1, 10), stages)?;
    let printed = drain(queue, PrintSink::with_prefix("sum")).await;
    ctx.join().await?;
    printed
}
