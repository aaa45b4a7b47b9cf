//! Processor implementations for the channelweld library.
//!
//! Each processor follows one of the three stage contracts in
//! [`StageKind`]: transform, predicate or aggregate.

use async_trait::async_trait;
use std::marker::PhantomData;

use crate::core::{Processor, Result, StageKind};

/// A type-erased processor, used where stages of one item type are listed together.
pub type BoxProcessor<T, U> = Box<dyn Processor<Input = T, Output = U> + Send>;

/// A processor that maps events using a function.
///
/// This processor applies a function to each event.
pub struct MapProcessor<F, T, U> {
    f: F,
    _phantom: PhantomData<fn(T) -> U>,
}

impl<F, T, U> MapProcessor<F, T, U> {
    /// Create a new map processor
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T, U> Processor for MapProcessor<F, T, U>
where
    F: FnMut(T) -> U + Send + 'static,
    T: Send + 'static,
    U: Send + 'static,
{
    type Input = T;
    type Output = U;

    async fn process(&mut self, item: Self::Input) -> Result<Vec<Self::Output>> {
        Ok(vec![(self.f)(item)])
    }
}

/// A map processor whose function can fail.
pub struct TryMapProcessor<F, T, U> {
    f: F,
    _phantom: PhantomData<fn(T) -> U>,
}

impl<F, T, U> TryMapProcessor<F, T, U> {
    /// Create a new fallible map processor
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T, U> Processor for TryMapProcessor<F, T, U>
where
    F: FnMut(T) -> Result<U> + Send + 'static,
    T: Send + 'static,
    U: Send + 'static,
{
    type Input = T;
    type Output = U;

    async fn process(&mut self, item: Self::Input) -> Result<Vec<Self::Output>> {
        Ok(vec![(self.f)(item)?])
    }
}

/// A processor that filters events using a predicate.
///
/// This processor only passes events that satisfy the predicate.
pub struct FilterProcessor<F, T> {
    predicate: F,
    _phantom: PhantomData<fn(T)>,
}

impl<F, T> FilterProcessor<F, T> {
    /// Create a new filter processor
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T> Processor for FilterProcessor<F, T>
where
    F: FnMut(&T) -> bool + Send + 'static,
    T: Send + 'static,
{
    type Input = T;
    type Output = T;

    async fn process(&mut self, item: Self::Input) -> Result<Vec<Self::Output>> {
        if (self.predicate)(&item) {
            Ok(vec![item])
        } else {
            Ok(vec![])
        }
    }

    fn kind(&self) -> StageKind {
        StageKind::Predicate
    }
}

/// A filter processor whose predicate can fail.
pub struct TryFilterProcessor<F, T> {
    predicate: F,
    _phantom: PhantomData<fn(T)>,
}

impl<F, T> TryFilterProcessor<F, T> {
    /// Create a new fallible filter processor
    pub fn new(predicate: F) -> Self {
        Self {
            predicate,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T> Processor for TryFilterProcessor<F, T>
where
    F: FnMut(&T) -> Result<bool> + Send + 'static,
    T: Send + 'static,
{
    type Input = T;
    type Output = T;

    async fn process(&mut self, item: Self::Input) -> Result<Vec<Self::Output>> {
        if (self.predicate)(&item)? {
            Ok(vec![item])
        } else {
            Ok(vec![])
        }
    }

    fn kind(&self) -> StageKind {
        StageKind::Predicate
    }
}

/// A processor that folds its whole input into one value.
///
/// Nothing is emitted until the input is exhausted; then exactly one value
/// goes out, which is the seed itself when the input was empty.
pub struct ReduceProcessor<F, A, T> {
    acc: Option<A>,
    f: F,
    _phantom: PhantomData<fn(T)>,
}

impl<F, A, T> ReduceProcessor<F, A, T> {
    /// Create a new reduce processor starting from `seed`
    pub fn new(seed: A, f: F) -> Self {
        Self {
            acc: Some(seed),
            f,
            _phantom: PhantomData,
        }
    }
}

impl<A, T> ReduceProcessor<fn(A, T) -> A, A, T>
where
    A: std::ops::Add<T, Output = A>,
{
    /// A reducer that adds every item to `seed`
    pub fn sum(seed: A) -> Self {
        Self::new(seed, |acc, item| acc + item)
    }
}

#[async_trait]
impl<F, A, T> Processor for ReduceProcessor<F, A, T>
where
    F: FnMut(A, T) -> A + Send + 'static,
    A: Send + 'static,
    T: Send + 'static,
{
    type Input = T;
    type Output = A;

    async fn process(&mut self, item: Self::Input) -> Result<Vec<Self::Output>> {
        if let Some(acc) = self.acc.take() {
            self.acc = Some((self.f)(acc, item));
        }
        Ok(vec![])
    }

    async fn finish(&mut self) -> Result<Vec<Self::Output>> {
        Ok(self.acc.take().into_iter().collect())
    }

    fn kind(&self) -> StageKind {
        StageKind::Aggregate
    }
}

/// A processor that observes each item and passes it through unchanged
pub struct InspectProcessor<F, T> {
    f: F,
    _phantom: PhantomData<fn(T)>,
}

impl<F, T> InspectProcessor<F, T> {
    /// Create a new inspect processor
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T> Processor for InspectProcessor<F, T>
where
    F: FnMut(&T) + Send + 'static,
    T: Send + 'static,
{
    type Input = T;
    type Output = T;

    async fn process(&mut self, item: Self::Input) -> Result<Vec<Self::Output>> {
        (self.f)(&item);
        Ok(vec![item])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;

    #[tokio::test]
    async fn test_map_processor() {
        let mut square = MapProcessor::new(|x: i32| x * x);
        assert_eq!(square.process(4).await.unwrap(), vec![16]);
        assert!(square.finish().await.unwrap().is_empty());
        assert_eq!(square.kind(), StageKind::Transform);
    }

    #[tokio::test]
    async fn test_filter_processor() {
        let mut odd = FilterProcessor::new(|x: &i32| x % 2 != 0);
        assert_eq!(odd.process(3).await.unwrap(), vec![3]);
        assert!(odd.process(4).await.unwrap().is_empty());
        assert_eq!(odd.kind(), StageKind::Predicate);
    }

    #[tokio::test]
    async fn test_try_processors_propagate_errors() {
        let mut parse = TryMapProcessor::new(|s: &'static str| {
            s.parse::<i32>().map_err(Error::stage)
        });
        assert_eq!(parse.process("7").await.unwrap(), vec![7]);
        assert!(matches!(parse.process("x").await, Err(Error::Stage(_))));

        let mut positive = TryFilterProcessor::new(|x: &i32| {
            if *x == 0 {
                Err(Error::custom("zero"))
            } else {
                Ok(*x > 0)
            }
        });
        assert_eq!(positive.process(1).await.unwrap(), vec![1]);
        assert!(positive.process(-1).await.unwrap().is_empty());
        assert!(positive.process(0).await.is_err());
    }

    #[tokio::test]
    async fn test_reduce_emits_once() {
        let mut sum = ReduceProcessor::sum(0i64);
        for i in 1i64..=4 {
            assert!(sum.process(i).await.unwrap().is_empty());
        }
        assert_eq!(sum.finish().await.unwrap(), vec![10]);
        assert!(sum.finish().await.unwrap().is_empty());
        assert_eq!(sum.kind(), StageKind::Aggregate);
    }

    #[tokio::test]
    async fn test_reduce_empty_input_yields_seed() {
        let mut concat = ReduceProcessor::<_, String, &'static str>::new(
            String::from(">"),
            |mut acc: String, s: &'static str| {
                acc.push_str(s);
                acc
            },
        );
        assert_eq!(concat.finish().await.unwrap(), vec![">".to_string()]);
    }

    #[tokio::test]
    async fn test_boxed_processor_keeps_kind() {
        let mut boxed: BoxProcessor<i32, i32> = Box::new(FilterProcessor::new(|x: &i32| *x > 1));
        assert_eq!(boxed.kind(), StageKind::Predicate);
        assert_eq!(boxed.process(2).await.unwrap(), vec![2]);
    }

    #[tokio::test]
    async fn test_inspect_processor() {
        let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen_ref = seen.clone();
        let mut inspect = InspectProcessor::new(move |x: &i32| seen_ref.lock().unwrap().push(*x));
        assert_eq!(inspect.process(9).await.unwrap(), vec![9]);
        assert_eq!(*seen.lock().unwrap(), vec![9]);
    }
}
