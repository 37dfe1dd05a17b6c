use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// FIFO collection that drops its oldest element once `capacity` is reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRing<T>", bound(deserialize = "T: Deserialize<'de>"))]
pub struct RingBuffer<T> {
    capacity: usize,
    items: VecDeque<T>,
}

#[derive(Deserialize)]
struct RawRing<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> From<RawRing<T>> for RingBuffer<T> {
    fn from(raw: RawRing<T>) -> Self {
        let mut ring = RingBuffer::new(raw.capacity);
        ring.extend(raw.items);
        ring
    }
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, item: T) {
        while self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) {
        for item in items {
            self.push(item);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> impl DoubleEndedIterator<Item = &mut T> + ExactSizeIterator {
        self.items.iter_mut()
    }

    pub fn first(&self) -> Option<&T> {
        self.items.front()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    /// The `n` most recent items, oldest first.
    pub fn latest(&self, n: usize) -> impl Iterator<Item = &T> {
        let skip = self.items.len().saturating_sub(n);
        self.items.iter().skip(skip)
    }

    /// The `n` oldest items still retained.
    pub fn earliest(&self, n: usize) -> impl Iterator<Item = &T> {
        self.items.iter().take(n)
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.items.iter().cloned().collect()
    }
}
