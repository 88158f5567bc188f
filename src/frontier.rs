use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::{watch, Semaphore};
use url::Url;

/// Work queue shared between the coordinator and the worker pool.
///
/// Every queued address counts as one unit of outstanding work until a
/// worker releases it with [`mark_done`](Self::mark_done), so an empty
/// queue alone never means the crawl is over; the crawl is over when
/// nothing is queued and nothing is in flight.
pub(crate) struct Frontier {
    queue: Mutex<VecDeque<Url>>,
    ready: Semaphore,
    outstanding: watch::Sender<usize>,
}

impl Frontier {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            ready: Semaphore::new(0),
            outstanding: watch::channel(0).0,
        }
    }

    /// Queues an address and accounts for it as outstanding work.
    pub fn push(&self, url: Url) {
        self.queue.lock().unwrap().push_back(url);
        self.outstanding.send_modify(|n| *n += 1);
        self.ready.add_permits(1);
    }

    /// Takes the oldest queued address, suspending while the queue is
    /// empty. Returns `None` once the frontier is closed.
    pub async fn take(&self) -> Option<Url> {
        match self.ready.acquire().await {
            Ok(permit) => {
                // One permit per queued address, so the pop cannot miss.
                permit.forget();
                self.queue.lock().unwrap().pop_front()
            }
            Err(_) => None,
        }
    }

    /// Releases one unit of outstanding work. Callers invoke this exactly
    /// once per address obtained from [`take`](Self::take).
    pub fn mark_done(&self) {
        self.outstanding.send_modify(|n| *n -= 1);
    }

    /// Resolves once no address is queued and none is in flight. Checks
    /// the current count first, so a frontier that never held work
    /// resolves immediately.
    pub async fn await_drained(&self) {
        let mut rx = self.outstanding.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Wakes every parked worker and makes all subsequent `take`s return
    /// `None`. Addresses already handed out are unaffected.
    pub fn close(&self) {
        self.ready.close();
    }

    #[cfg(test)]
    fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }
}
