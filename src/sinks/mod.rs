//! Sink implementations for the channelweld library.
//!
//! Sinks sit at the end of a pipeline and drain its final queue into a
//! single value or side effect.

use async_trait::async_trait;
use std::fmt::Display;
use std::marker::PhantomData;

use crate::core::{Result, Sink};

/// A sink that prints items to stdout.
pub struct PrintSink<T> {
    /// The prefix to print before each item
    prefix: Option<String>,
    _phantom: PhantomData<fn(T)>,
}

impl<T> PrintSink<T> {
    /// Create a new print sink
    pub fn new() -> Self {
        Self {
            prefix: None,
            _phantom: PhantomData,
        }
    }

    /// Create a new print sink with a prefix
    pub fn with_prefix<S: Into<String>>(prefix: S) -> Self {
        Self {
            prefix: Some(prefix.into()),
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Send + 'static + Display> Sink for PrintSink<T> {
    type Item = T;
    type Output = ();

    async fn write(&mut self, item: Self::Item) -> Result<()> {
        match &self.prefix {
            Some(prefix) => println!("{}: {}", prefix, item),
            None => println!("{}", item),
        }
        Ok(())
    }

    async fn finish(self) -> Result<()> {
        Ok(())
    }
}

impl<T> Default for PrintSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A sink that collects items into a vector, in arrival order.
pub struct CollectSink<T> {
    items: Vec<T>,
}

impl<T> CollectSink<T> {
    /// Create a new collect sink
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }
}

#[async_trait]
impl<T: Send + 'static> Sink for CollectSink<T> {
    type Item = T;
    type Output = Vec<T>;

    async fn write(&mut self, item: Self::Item) -> Result<()> {
        self.items.push(item);
        Ok(())
    }

    async fn finish(self) -> Result<Vec<T>> {
        Ok(self.items)
    }
}

impl<T> Default for CollectSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A sink that counts items
pub struct CountSink<T> {
    count: usize,
    _phantom: PhantomData<fn(T)>,
}

impl<T> CountSink<T> {
    /// Create a new count sink
    pub fn new() -> Self {
        Self {
            count: 0,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Send + 'static> Sink for CountSink<T> {
    type Item = T;
    type Output = usize;

    async fn write(&mut self, _item: Self::Item) -> Result<()> {
        self.count += 1;
        Ok(())
    }

    async fn finish(self) -> Result<usize> {
        Ok(self.count)
    }
}

impl<T> Default for CountSink<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A sink that folds every item into an accumulator seeded with `seed`
pub struct ReduceSink<F, A, T> {
    acc: Option<A>,
    f: F,
    _phantom: PhantomData<fn(T)>,
}

impl<F, A, T> ReduceSink<F, A, T> {
    /// Create a new reduce sink
    pub fn new(seed: A, f: F) -> Self {
        Self {
            acc: Some(seed),
            f,
            _phantom: PhantomData,
        }
    }
}

impl<A, T> ReduceSink<fn(A, T) -> A, A, T>
where
    A: std::ops::Add<T, Output = A>,
{
    /// A sink that adds every item to `seed`
    pub fn sum(seed: A) -> Self {
        Self::new(seed, |acc, item| acc + item)
    }
}

#[async_trait]
impl<F, A, T> Sink for ReduceSink<F, A, T>
where
    F: FnMut(A, T) -> A + Send + 'static,
    A: Send + 'static,
    T: Send + 'static,
{
    type Item = T;
    type Output = A;

    async fn write(&mut self, item: Self::Item) -> Result<()> {
        if let Some(acc) = self.acc.take() {
            self.acc = Some((self.f)(acc, item));
        }
        Ok(())
    }

    async fn finish(self) -> Result<A> {
        self.acc
            .ok_or_else(|| crate::core::Error::custom("reduce sink lost its accumulator"))
    }
}

/// A sink that hands each item to a callback
pub struct ForEachSink<F, T> {
    f: F,
    _phantom: PhantomData<fn(T)>,
}

impl<F, T> ForEachSink<F, T> {
    /// Create a new for-each sink
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<F, T> Sink for ForEachSink<F, T>
where
    F: FnMut(T) + Send + 'static,
    T: Send + 'static,
{
    type Item = T;
    type Output = ();

    async fn write(&mut self, item: Self::Item) -> Result<()> {
        (self.f)(item);
        Ok(())
    }

    async fn finish(self) -> Result<()> {
        Ok(())
    }
}
