//! Ticket pool bounding concurrent in-flight calls
//!
//! A counting semaphore with a fixed number of interchangeable tickets.
//! Taking a ticket yields a [`Ticket`] guard; dropping the guard returns it,
//! so every take is paired with exactly one return on every exit path,
//! including panics.

use crate::error::{LoadError, LoadResult};

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Fixed-capacity admission pool
#[derive(Debug)]
pub struct TicketPool {
    semaphore: Arc<Semaphore>,
    total: u32,
}

impl TicketPool {
    /// Create a pool holding `total` tickets
    ///
    /// # Errors
    /// Returns [`LoadError::InvalidCapacity`] when `total` is zero.
    pub fn new(total: u32) -> LoadResult<Self> {
        if total == 0 {
            return Err(LoadError::InvalidCapacity(total));
        }

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(total as usize)),
            total,
        })
    }

    /// Take a ticket, waiting until one is available
    ///
    /// There is no timeout. Acquisition order is not guaranteed to be FIFO
    /// from the caller's point of view.
    ///
    /// # Errors
    /// Returns [`LoadError::PoolClosed`] only after [`TicketPool::close`].
    pub async fn take(&self) -> LoadResult<Ticket> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| LoadError::PoolClosed)?;

        Ok(Ticket { permit })
    }

    /// Whether the pool still hands out tickets
    pub fn active(&self) -> bool {
        !self.semaphore.is_closed()
    }

    /// Total number of tickets
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Tickets currently available
    ///
    /// Point-in-time snapshot; advisory under concurrency.
    pub fn remainder(&self) -> u32 {
        self.semaphore.available_permits() as u32
    }

    /// Tickets currently taken
    pub fn in_use(&self) -> u32 {
        self.total - self.remainder()
    }

    /// Wait until every ticket has been returned
    ///
    /// All tickets are briefly held together and handed straight back, so
    /// once this resolves no ticket taken earlier is still outstanding.
    pub async fn wait_idle(&self) {
        // Closed pool: nothing can be waited on, and no new tickets can exist.
        if let Ok(all) = self.semaphore.acquire_many(self.total).await {
            drop(all);
        }
    }

    /// Stop handing out tickets
    ///
    /// Pending and future [`TicketPool::take`] calls fail. Tickets already
    /// taken are still returned normally.
    pub fn close(&self) {
        self.semaphore.close();
    }
}

/// A taken ticket
///
/// Returned to its pool when dropped.
#[derive(Debug)]
#[must_use = "dropping a ticket returns it to the pool immediately"]
pub struct Ticket {
    permit: OwnedSemaphorePermit,
}

impl Ticket {
    /// Return the ticket to its pool
    pub fn release(self) {
        drop(self.permit);
    }
}
