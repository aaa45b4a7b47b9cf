//! Point-to-point queues connecting pipeline stages.
//!
//! A queue is split into a single-writer [`QueueSender`] and a consuming
//! [`Queue`] handle. Closing is done by consuming the sender, so a queue can
//! only ever be closed once and never written to afterwards. Values already
//! buffered when the sender closes stay readable until the queue is drained.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::stream;
use futures_core::Stream;
use tokio::sync::{mpsc, Mutex};

use crate::core::error::{Error, Result};

/// Buffering policy for a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Capacity {
    /// Producers never wait
    #[default]
    Unbounded,
    /// Producers wait for free space once this many values are buffered.
    ///
    /// Zero is treated as one, the smallest buffer a tokio channel supports.
    /// This is not a rendezvous handoff: a push completes as soon as the
    /// value is buffered, before any consumer has received it.
    Bounded(usize),
}

impl Capacity {
    /// Bounded capacity of `n` values
    pub fn bounded(n: usize) -> Self {
        Capacity::Bounded(n)
    }

    /// Whether producers on this queue can ever wait
    pub fn is_bounded(&self) -> bool {
        matches!(self, Capacity::Bounded(_))
    }
}

/// Create a queue with the given capacity.
pub fn channel<T: Send>(capacity: Capacity) -> (QueueSender<T>, Queue<T>) {
    let (tx, rx) = match capacity {
        Capacity::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (Tx::Unbounded(tx), Rx::Unbounded(rx))
        }
        Capacity::Bounded(n) => {
            let (tx, rx) = mpsc::channel(n.max(1));
            (Tx::Bounded(tx), Rx::Bounded(rx))
        }
    };

    let sender = QueueSender { tx };
    let queue = Queue {
        shared: Arc::new(Shared {
            rx: Mutex::new(rx),
            exhausted: AtomicBool::new(false),
        }),
    };
    (sender, queue)
}

enum Tx<T> {
    Bounded(mpsc::Sender<T>),
    Unbounded(mpsc::UnboundedSender<T>),
}

enum Rx<T> {
    Bounded(mpsc::Receiver<T>),
    Unbounded(mpsc::UnboundedReceiver<T>),
}

impl<T> Rx<T> {
    async fn recv(&mut self) -> Option<T> {
        match self {
            Rx::Bounded(rx) => rx.recv().await,
            Rx::Unbounded(rx) => rx.recv().await,
        }
    }
}

/// The producing half of a queue.
///
/// Not `Clone`: every queue has exactly one writer.
pub struct QueueSender<T> {
    tx: Tx<T>,
}

impl<T: Send> QueueSender<T> {
    /// Push a value, waiting for space if the queue is bounded.
    ///
    /// Fails with [`Error::ChannelClosed`] once every consumer handle is gone.
    pub async fn push(&self, item: T) -> Result<()> {
        match &self.tx {
            Tx::Bounded(tx) => tx.send(item).await.map_err(Error::from),
            Tx::Unbounded(tx) => tx.send(item).map_err(Error::from),
        }
    }

    /// Close the queue. Buffered values remain readable.
    pub fn close(self) {
        drop(self);
    }

    /// Whether every consumer handle has been dropped
    pub fn is_closed(&self) -> bool {
        match &self.tx {
            Tx::Bounded(tx) => tx.is_closed(),
            Tx::Unbounded(tx) => tx.is_closed(),
        }
    }
}

struct Shared<T> {
    rx: Mutex<Rx<T>>,
    exhausted: AtomicBool,
}

/// The consuming half of a queue.
///
/// Values arrive in FIFO order. A handle can be shared between fan-out
/// replicas inside the crate; each value is still received exactly once.
pub struct Queue<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Send> Queue<T> {
    /// Receive the next value, or `None` once the queue is closed and drained.
    pub async fn recv(&self) -> Option<T> {
        let item = self.shared.rx.lock().await.recv().await;
        if item.is_none() {
            self.shared.exhausted.store(true, Ordering::Release);
        }
        item
    }

    /// Whether a consumer has already seen the end of this queue
    pub fn is_exhausted(&self) -> bool {
        self.shared.exhausted.load(Ordering::Acquire)
    }

    /// Iterate the queue as a stream ending when the queue is closed and drained.
    pub fn into_stream(self) -> impl Stream<Item = T> + Send
    where
        T: 'static,
    {
        stream::unfold(self, |queue| async move {
            let item = queue.recv().await?;
            Some((item, queue))
        })
    }

    /// Drain every value into a vector.
    pub async fn collect(self) -> Vec<T> {
        let mut items = Vec::new();
        while let Some(item) = self.recv().await {
            items.push(item);
        }
        items
    }

    /// Another handle onto the same consumption point.
    pub(crate) fn share(&self) -> Queue<T> {
        Queue {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Reject queues whose end was already observed.
    pub(crate) fn ensure_bindable(&self) -> Result<()> {
        if self.is_exhausted() {
            return Err(Error::topology(
                "cannot bind a queue that is already closed and drained",
            ));
        }
        Ok(())
    }
}
