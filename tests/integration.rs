use channelweld::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_test::{assert_err, assert_ok};

fn make_range(min: i64, max: i64) -> RangeSource {
    RangeSource::inclusive(min, max)
}

fn is_even(x: &i64) -> bool {
    x % 2 == 0
}

#[tokio::test]
async fn test_linear_pipeline_preserves_order() {
    let result = Pipeline::new(make_range(1, 100))
        .pipe(MapProcessor::new(|x: i64| x * 3))
        .pipe(FilterProcessor::new(|x: &i64| x % 2 == 1))
        .collect()
        .await
        .unwrap();

    let expected: Vec<i64> = (1..=100).map(|x| x * 3).filter(|x| x % 2 == 1).collect();
    assert_eq!(result, expected);
}

#[tokio::test]
async fn test_echo_square_sum() {
    let ctx = PipelineContext::new(PipelineConfig::default());
    let stages: Vec<BoxProcessor<i64, i64>> = vec![
        Box::new(FilterProcessor::new(|x: &i64| x % 2 != 0)),
        Box::new(MapProcessor::new(|x: i64| x * x)),
        Box::new(ReduceProcessor::sum(0i64)),
    ];
    let queue = compose(&ctx, make_range(1, 10), stages).unwrap();

    assert_eq!(queue.collect().await, vec![165]);
    ctx.join().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fan_out_delivers_each_value_once() {
    let handled = Arc::new(AtomicUsize::new(0));
    let counter = handled.clone();

    let mut values = Pipeline::new(make_range(1, 1_000))
        .fan_out(7, move |_| {
            let counter = counter.clone();
            InspectProcessor::new(move |_: &i64| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
        .merge()
        .collect()
        .await
        .unwrap();

    values.sort();
    assert_eq!(values, (1..=1_000).collect::<Vec<_>>());
    assert_eq!(handled.load(Ordering::SeqCst), 1_000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_merge_property() {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for n in 1..=50usize {
        let ctx = PipelineContext::new(PipelineConfig::default());
        let mut inputs = Vec::with_capacity(n);
        let mut expected = Vec::new();

        for i in 0..n {
            let k: i64 = rng.random_range(0..=100);
            let base = (i as i64) * 1_000;
            expected.extend(base..base + k);
            inputs.push(spawn_source(&ctx, RangeSource::new(base..base + k)));
        }

        let merged = merge(&ctx, inputs).collect().await;
        assert_eq!(merged.len(), expected.len(), "n = {}", n);

        for i in 0..n as i64 {
            let base = i * 1_000;
            let from_input: Vec<_> = merged
                .iter()
                .copied()
                .filter(|v| *v >= base && *v < base + 1_000)
                .collect();
            let wanted: Vec<_> = expected
                .iter()
                .copied()
                .filter(|v| *v >= base && *v < base + 1_000)
                .collect();
            assert_eq!(from_input, wanted, "input {} of {}", i, n);
        }
        ctx.join().await.unwrap();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_level_reduce() {
    let total = assert_ok!(
        Pipeline::new(make_range(1, 10_000))
            .fan_out(5, |_| ReduceProcessor::sum(0i64))
            .combine(ReduceProcessor::sum(0i64))
            .collect()
            .await
    );

    assert_eq!(total, vec![50_005_000]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_even_partial_sums() {
    let total = Pipeline::new(make_range(1, 10))
        .pipe(FilterProcessor::new(is_even))
        .fan_out(5, |_| ReduceProcessor::sum(0i64))
        .combine(ReduceProcessor::sum(0i64))
        .collect()
        .await
        .unwrap();

    assert_eq!(total, vec![30]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_even_partial_sums_wired_by_hand() {
    let ctx = PipelineContext::new(PipelineConfig::default().with_name("fan-in"));
    let input = spawn_source(&ctx, make_range(1, 10));
    let evens = spawn_stage(&ctx, input, FilterProcessor::new(is_even)).unwrap();
    let partials = fan_out(&ctx, evens, 5, |_| ReduceProcessor::sum(0i64)).unwrap();
    assert_eq!(partials.kind(), StageKind::Aggregate);

    let total = partials.combine(ReduceProcessor::sum(0i64)).unwrap();
    assert_eq!(total.collect().await, vec![30]);
    ctx.join().await.unwrap();
}

#[tokio::test]
async fn test_empty_input_closes_everything() {
    let ctx = PipelineContext::new(PipelineConfig::default());
    let empty = spawn_source(&ctx, VecSource::<i64>::new(vec![]));
    let mapped = spawn_stage(&ctx, empty, MapProcessor::new(|x: i64| x + 1)).unwrap();
    let filtered = spawn_stage(&ctx, mapped, FilterProcessor::new(is_even)).unwrap();
    assert!(filtered.collect().await.is_empty());

    let empty = spawn_source(&ctx, VecSource::<i64>::new(vec![]));
    let summed = spawn_stage(&ctx, empty, ReduceProcessor::sum(42i64)).unwrap();
    assert_eq!(summed.collect().await, vec![42]);

    ctx.join().await.unwrap();
}

#[tokio::test]
async fn test_empty_fan_out_emits_seeds() {
    let total = Pipeline::new(VecSource::<i64>::new(vec![]))
        .fan_out(3, |_| ReduceProcessor::sum(1i64))
        .combine(ReduceProcessor::sum(0i64))
        .collect()
        .await
        .unwrap();

    assert_eq!(total, vec![3]);
}

#[tokio::test]
async fn test_bounded_queues_complete() {
    let count = Pipeline::new(make_range(1, 5_000))
        .bounded(1)
        .pipe(MapProcessor::new(|x: i64| x.to_string()))
        .pipe(FilterProcessor::new(|s: &String| s.ends_with('7')))
        .sink(CountSink::new())
        .await
        .unwrap();

    assert_eq!(count, 500);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancellation_stops_infinite_source() {
    let running = Pipeline::new(RangeSource::new(0..i64::MAX))
        .bounded(8)
        .fan_out(3, |_| MapProcessor::new(|x: i64| x))
        .merge()
        .run()
        .unwrap();

    for _ in 0..10 {
        assert!(running.queue().recv().await.is_some());
    }
    running.cancel();

    let (queue, ctx) = running.into_parts();
    let drained = tokio::time::timeout(Duration::from_secs(5), queue.collect()).await;
    assert!(drained.is_ok());
    assert!(matches!(ctx.join().await, Err(Error::Shutdown)));
}

#[tokio::test]
async fn test_failing_stage_reports_error() {
    let result = Pipeline::from_items(vec!["1", "2", "x", "4"])
        .pipe(TryMapProcessor::new(|s: &'static str| {
            s.parse::<i64>().map_err(Error::stage)
        }))
        .pipe(ReduceProcessor::sum(0i64))
        .collect()
        .await;

    let err = assert_err!(result);
    assert!(matches!(err, Error::Stage(_)));
}

#[tokio::test]
async fn test_lenient_pipeline_skips_failures() {
    let result = Pipeline::from_items(vec!["1", "2", "x", "4"])
        .fail_fast(false)
        .pipe(TryMapProcessor::new(|s: &'static str| {
            s.parse::<i64>().map_err(Error::stage)
        }))
        .pipe(ReduceProcessor::sum(0i64))
        .collect()
        .await
        .unwrap();

    assert_eq!(result, vec![7]);
}

#[tokio::test]
async fn test_function_helpers() {
    let mut next = 0;
    let source = from_fn(move || {
        next += 1;
        let value = next;
        async move { Ok(if value <= 3 { Some(value) } else { None }) }
    });

    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink_seen = seen.clone();
    Pipeline::new(source)
        .pipe(processor_from_fn(|x: i32| async move { Ok(vec![x, x * 10]) }))
        .sink(sink_from_fn(move |x: i32| {
            let seen = sink_seen.clone();
            async move {
                seen.lock().unwrap().push(x);
                Ok(())
            }
        }))
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![1, 10, 2, 20, 3, 30]);
}

#[tokio::test]
async fn test_queue_as_stream() {
    use futures::StreamExt;

    let running = Pipeline::from_items(1..=4)
        .pipe(MapProcessor::new(|x: i32| x * x))
        .run()
        .unwrap();
    let (queue, ctx) = running.into_parts();
    let squares: Vec<i32> = queue.into_stream().collect().await;

    assert_eq!(squares, vec![1, 4, 9, 16]);
    ctx.join().await.unwrap();
}
