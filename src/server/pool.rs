use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

/// Fixed number of slots for concurrently running connection handlers.
///
/// The pool holds no per-request state. Callers reserve a slot before
/// accepting, so a saturated pool stalls the accept loop instead of
/// queueing connections.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    slots: Arc<Semaphore>,
    size: usize,
}

/// A reserved slot; released when the task spawned on it finishes.
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of slots currently free.
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Waits until a slot frees up.
    pub async fn reserve(&self) -> anyhow::Result<Slot> {
        let permit = self.slots.clone().acquire_owned().await?;
        Ok(Slot { _permit: permit })
    }
}

impl Slot {
    /// Runs `task` on the runtime, holding this slot until it completes.
    pub fn spawn<F>(self, task: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            task.await;
            drop(self);
        })
    }
}
