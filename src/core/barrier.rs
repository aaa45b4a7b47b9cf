//! Count-down join barrier.
//!
//! Waiters block until every [`BarrierToken`] handed out at creation
//! has reported completion. Tokens are consumed on completion and report on
//! drop, so each participant decrements the counter exactly once, even if
//! its task exits early or panics.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

struct Inner {
    remaining: AtomicUsize,
    notify: Notify,
}

impl Inner {
    fn arrive(&self) {
        let previous = self.remaining.fetch_sub(1, Ordering::AcqRel);
        assert!(previous > 0, "join barrier counter went below zero");
        if previous == 1 {
            self.notify.notify_waiters();
        }
    }
}

/// The waiting side of a join barrier.
pub struct JoinBarrier {
    inner: Arc<Inner>,
}

impl JoinBarrier {
    /// Create a barrier for `participants` tasks, returning one token each.
    pub fn new(participants: usize) -> (Self, Vec<BarrierToken>) {
        let inner = Arc::new(Inner {
            remaining: AtomicUsize::new(participants),
            notify: Notify::new(),
        });
        let tokens = (0..participants)
            .map(|_| BarrierToken {
                inner: Some(Arc::clone(&inner)),
            })
            .collect();
        (Self { inner }, tokens)
    }

    /// Participants that have not reported yet
    pub fn remaining(&self) -> usize {
        self.inner.remaining.load(Ordering::Acquire)
    }

    /// Wait until every participant has reported.
    ///
    /// Any number of tasks may wait at once; all of them are released.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // register before checking the count so the last arrival cannot be missed
            notified.as_mut().enable();
            if self.remaining() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// One participant's completion signal.
pub struct BarrierToken {
    inner: Option<Arc<Inner>>,
}

impl BarrierToken {
    /// Report completion.
    pub fn done(mut self) {
        if let Some(inner) = self.inner.take() {
            inner.arrive();
        }
    }
}

impl Drop for BarrierToken {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.arrive();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_zero_participants() {
        let (barrier, tokens) = JoinBarrier::new(0);
        assert!(tokens.is_empty());
        barrier.wait().await;
    }

    #[test]
    fn test_wait_after_last_token_returns() {
        let (barrier, tokens) = JoinBarrier::new(2);
        drop(tokens);
        tokio_test::block_on(barrier.wait());
        assert_eq!(barrier.remaining(), 0);
    }

    #[tokio::test]
    async fn test_waits_for_every_token() {
        let (barrier, mut tokens) = JoinBarrier::new(3);
        tokens.pop().unwrap().done();
        tokens.pop().unwrap().done();
        assert_eq!(barrier.remaining(), 1);

        let pending = tokio::time::timeout(Duration::from_millis(20), barrier.wait()).await;
        assert!(pending.is_err());

        drop(tokens);
        barrier.wait().await;
        assert_eq!(barrier.remaining(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_arrivals() {
        let (barrier, tokens) = JoinBarrier::new(64);
        for token in tokens {
            tokio::spawn(async move {
                tokio::task::yield_now().await;
                token.done();
            });
        }
        barrier.wait().await;
        assert_eq!(barrier.remaining(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_every_waiter_is_released() {
        let (barrier, mut tokens) = JoinBarrier::new(1);
        let barrier = Arc::new(barrier);
        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let barrier = Arc::clone(&barrier);
                tokio::spawn(async move { barrier.wait().await })
            })
            .collect();
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokens.pop().unwrap().done();
        for waiter in waiters {
            let released = tokio::time::timeout(Duration::from_secs(2), waiter).await;
            assert!(matches!(released, Ok(Ok(()))));
        }
    }

    #[tokio::test]
    async fn test_panicking_task_still_reports() {
        let (barrier, mut tokens) = JoinBarrier::new(1);
        let token = tokens.pop().unwrap();
        let handle = tokio::spawn(async move {
            let _token = token;
            panic!("stage blew up");
        });
        assert!(handle.await.is_err());
        barrier.wait().await;
    }
}
