//! Utility functions and helper types.

use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;
use tokio_stream::{Stream, StreamExt};

use crate::core::{Processor, Queue, Result, Sink, Source};

/// Drain `queue` to completion into `sink` on the calling task.
///
/// Stops at the first sink error.
pub async fn drain<T, S>(queue: Queue<T>, mut sink: S) -> Result<S::Output>
where
    T: Send + 'static,
    S: Sink<Item = T> + Send,
{
    while let Some(item) = queue.recv().await {
        sink.write(item).await?;
    }
    sink.finish().await
}

/// Helper function to create a simple source from a function
pub fn from_fn<F, Fut, T>(f: F) -> FnSource<F, T>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<Option<T>>> + Send,
    T: Send + 'static,
{
    FnSource {
        f,
        _phantom: PhantomData,
    }
}

/// A source created from a function
pub struct FnSource<F, T> {
    f: F,
    _phantom: PhantomData<fn() -> T>,
}

#[async_trait]
impl<F, Fut, T> Source for FnSource<F, T>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<Option<T>>> + Send,
    T: Send + 'static,
{
    type Item = T;

    async fn produce(&mut self) -> Result<Option<Self::Item>> {
        (self.f)().await
    }
}

/// Use any unpinned stream as a pipeline source.
pub fn from_stream<S>(stream: S) -> StreamSource<S>
where
    S: Stream + Unpin + Send,
    S::Item: Send + 'static,
{
    StreamSource { stream }
}

/// A source that yields the items of a stream
pub struct StreamSource<S> {
    stream: S,
}

#[async_trait]
impl<S> Source for StreamSource<S>
where
    S: Stream + Unpin + Send,
    S::Item: Send + 'static,
{
    type Item = S::Item;

    async fn produce(&mut self) -> Result<Option<Self::Item>> {
        Ok(self.stream.next().await)
    }
}

/// Helper function to create a simple processor from an async function
pub fn processor_from_fn<F, Fut, T, U>(f: F) -> FnProcessor<F, T, U>
where
    F: FnMut(T) -> Fut + Send,
    Fut: Future<Output = Result<Vec<U>>> + Send,
    T: Send + 'static,
    U: Send + 'static,
{
    FnProcessor {
        f,
        _phantom: PhantomData,
    }
}

/// A processor created from a function
pub struct FnProcessor<F, T, U> {
    f: F,
    _phantom: PhantomData<fn(T) -> U>,
}

#[async_trait]
impl<F, Fut, T, U> Processor for FnProcessor<F, T, U>
where
    F: FnMut(T) -> Fut + Send,
    Fut: Future<Output = Result<Vec<U>>> + Send,
    T: Send + 'static,
    U: Send + 'static,
{
    type Input = T;
    type Output = U;

    async fn process(&mut self, item: Self::Input) -> Result<Vec<Self::Output>> {
        (self.f)(item).await
    }
}

/// Helper function to create a simple sink from an async function
pub fn sink_from_fn<F, Fut, T>(f: F) -> FnSink<F, T>
where
    F: FnMut(T) -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send,
    T: Send + 'static,
{
    FnSink {
        f,
        _phantom: PhantomData,
    }
}

/// A sink created from a function
pub struct FnSink<F, T> {
    f: F,
    _phantom: PhantomData<fn(T)>,
}

#[async_trait]
impl<F, Fut, T> Sink for FnSink<F, T>
where
    F: FnMut(T) -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send,
    T: Send + 'static,
{
    type Item = T;
    type Output = ();

    async fn write(&mut self, item: Self::Item) -> Result<()> {
        (self.f)(item).await
    }

    async fn finish(self) -> Result<()> {
        Ok(())
    }
}
