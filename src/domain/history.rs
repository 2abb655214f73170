// Bounded, newest-first history of accepted samples
use super::sample::Sample;
use serde::Serialize;
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("history capacity must be at least 1")]
    ZeroCapacity,
}

/// Outcome of offering a sample to the buffer
#[derive(Debug, Clone, PartialEq)]
pub enum Acceptance {
    /// Same timestamp as the current head; the buffer was left untouched.
    Duplicate,
    /// Prepended at index 0, possibly pushing the oldest entry out.
    Inserted { evicted: Option<Sample> },
}

impl Acceptance {
    pub fn changed(&self) -> bool {
        matches!(self, Acceptance::Inserted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferState {
    Empty,
    Filling,
    Full,
}

/// Newest-first sequence of at most `capacity` samples.
///
/// Only immediate repetition is rejected: a timestamp may reappear once
/// other samples have been inserted after it. Entries are kept in arrival
/// order and never sorted by timestamp value.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBuffer {
    capacity: usize,
    samples: VecDeque<Sample>,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Result<Self, HistoryError> {
        if capacity == 0 {
            return Err(HistoryError::ZeroCapacity);
        }

        Ok(Self {
            capacity,
            samples: VecDeque::with_capacity(capacity + 1),
        })
    }

    pub fn accept(&mut self, sample: Sample) -> Acceptance {
        if let Some(head) = self.samples.front() {
            if head.timestamp == sample.timestamp {
                return Acceptance::Duplicate;
            }
        }

        self.samples.push_front(sample);

        // One insertion can overflow by at most one entry.
        let evicted = if self.samples.len() > self.capacity {
            self.samples.pop_back()
        } else {
            None
        };

        Acceptance::Inserted { evicted }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Most recently accepted sample
    pub fn latest(&self) -> Option<&Sample> {
        self.samples.front()
    }

    /// Iterate newest to oldest
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn state(&self) -> BufferState {
        match self.samples.len() {
            0 => BufferState::Empty,
            n if n >= self.capacity => BufferState::Full,
            _ => BufferState::Filling,
        }
    }
}
