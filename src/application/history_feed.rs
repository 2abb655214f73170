// History feed - Single owner of the buffer, publishes snapshots to readers
use crate::domain::history::{Acceptance, BufferState, HistoryBuffer, HistoryError};
use crate::domain::sample::Sample;
use std::sync::Arc;
use tokio::sync::watch;

/// Published after every accepted sample
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySnapshot {
    pub capacity: usize,
    pub state: BufferState,
    /// Newest first
    pub samples: Arc<[Sample]>,
}

impl HistorySnapshot {
    fn of(buffer: &HistoryBuffer) -> Self {
        Self {
            capacity: buffer.capacity(),
            state: buffer.state(),
            samples: buffer.iter().cloned().collect(),
        }
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.first()
    }
}

/// Write side. Lives inside the poller's sink closure.
pub struct HistoryFeed {
    buffer: HistoryBuffer,
    tx: watch::Sender<HistorySnapshot>,
}

/// Read side for the render layer
#[derive(Clone)]
pub struct HistoryView {
    rx: watch::Receiver<HistorySnapshot>,
}

impl HistoryFeed {
    pub fn new(capacity: usize) -> Result<(Self, HistoryView), HistoryError> {
        let buffer = HistoryBuffer::new(capacity)?;
        let (tx, rx) = watch::channel(HistorySnapshot::of(&buffer));

        Ok((Self { buffer, tx }, HistoryView { rx }))
    }

    pub fn on_sample(&mut self, sample: Sample) -> bool {
        match self.buffer.accept(sample) {
            Acceptance::Duplicate => {
                tracing::trace!("Duplicate sample ignored");
                false
            }
            Acceptance::Inserted { evicted } => {
                tracing::debug!(
                    len = self.buffer.len(),
                    evicted = evicted.is_some(),
                    "Sample accepted"
                );
                self.tx.send_replace(HistorySnapshot::of(&self.buffer));
                true
            }
        }
    }

    pub fn into_sink(mut self) -> impl FnMut(Sample) + Send + 'static {
        move |sample: Sample| {
            self.on_sample(sample);
        }
    }
}

impl HistoryView {
    pub fn snapshot(&self) -> HistorySnapshot {
        self.rx.borrow().clone()
    }
}
