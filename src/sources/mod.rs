//! Source implementations for the channelweld library.
//!
//! A source is the head of a pipeline: its task pushes every item it
//! produces into a fresh queue and closes that queue when it runs dry.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::ops::{Range, RangeInclusive};

use crate::core::{Result, Source};

/// A source that yields the items of any iterator
pub struct IterSource<I> {
    iter: I,
}

impl<I: Iterator> IterSource<I> {
    /// Create a source from anything iterable
    pub fn new<T>(items: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            iter: items.into_iter(),
        }
    }
}

#[async_trait]
impl<I> Source for IterSource<I>
where
    I: Iterator + Send,
    I::Item: Send + 'static,
{
    type Item = I::Item;

    async fn produce(&mut self) -> Result<Option<Self::Item>> {
        Ok(self.iter.next())
    }
}

/// A source that generates numbers from a range
pub struct RangeSource {
    range: RangeInclusive<i64>,
}

impl RangeSource {
    /// Create a new half-open range source
    pub fn new(range: Range<i64>) -> Self {
        if range.is_empty() {
            return Self::inclusive(1, 0);
        }
        Self::inclusive(range.start, range.end - 1)
    }

    /// Every integer from `min` to `max`, both ends included
    pub fn inclusive(min: i64, max: i64) -> Self {
        Self { range: min..=max }
    }

    /// Number of items left, saturating at `usize::MAX`
    pub fn len(&self) -> usize {
        if self.range.is_empty() {
            return 0;
        }
        let count = i128::from(*self.range.end()) - i128::from(*self.range.start()) + 1;
        usize::try_from(count).unwrap_or(usize::MAX)
    }

    /// Whether the range is exhausted
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

#[async_trait]
impl Source for RangeSource {
    type Item = i64;

    async fn produce(&mut self) -> Result<Option<Self::Item>> {
        Ok(self.range.next())
    }
}

/// A source that yields items from a vector
pub struct VecSource<T> {
    items: VecDeque<T>,
}

impl<T> VecSource<T> {
    /// Create a new vector source
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: items.into(),
        }
    }

    /// Add more items to the source
    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Check if the source has more items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the number of remaining items
    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[async_trait]
impl<T: Send + 'static> Source for VecSource<T> {
    type Item = T;

    async fn produce(&mut self) -> Result<Option<Self::Item>> {
        Ok(self.items.pop_front())
    }
}

/// A source that repeats a single value a fixed number of times
pub struct RepeatSource<T> {
    value: T,
    remaining: usize,
}

impl<T: Clone> RepeatSource<T> {
    /// Create a source that repeats a value n times
    pub fn times(value: T, count: usize) -> Self {
        Self {
            value,
            remaining: count,
        }
    }
}

#[async_trait]
impl<T: Clone + Send + 'static> Source for RepeatSource<T> {
    type Item = T;

    async fn produce(&mut self) -> Result<Option<Self::Item>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        Ok(Some(self.value.clone()))
    }
}
