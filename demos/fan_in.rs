//! Fan-in demo: sum the even numbers in 1..=10 with five competing
//! partial summers, then merge and fold the partial sums.
//!
//! Run with `RUST_LOG=channelweld=debug cargo run --example fan_in` to see
//! every stage start and stop.

use channelweld::prelude::*;
use tracing_subscriber::EnvFilter;

fn make_range(min: i64, max: i64) -> RangeSource {
    RangeSource::inclusive(min, max)
}

fn is_even(x: &i64) -> bool {
    x % 2 == 0
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let ctx = PipelineContext::new(PipelineConfig::default().with_name("fan-in"));
    let input = spawn_source(&ctx, make_range(1, 10));
    let evens = spawn_stage(&ctx, input, FilterProcessor::new(is_even))?;

    // five replicas compete for the even numbers, each folding its share
    let partials = fan_out(&ctx, evens, 5, |_| ReduceProcessor::sum(0i64))?;
    let total = partials.combine(ReduceProcessor::sum(0i64))?;

    for sum in total.collect().await {
        println!("{}", sum);
    }
    ctx.join().await
}
