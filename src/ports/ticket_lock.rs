use crate::errors::CoreResult;
use async_trait::async_trait;

/// Per-ticket writer lock. The engine acquires the ticket's lock before its
/// first read and holds it until the full macro cascade for one trigger has
/// completed, so a scanner tick and an inline mutation can never interleave
/// on the same ticket. Modeled as an external lock (key/owner/TTL) rather
/// than an in-process mutex so the same contract holds across replicated
/// instances backed by a shared store.
#[async_trait]
pub trait TicketLock: Send + Sync {
    /// Try to take the lock. Returns false if another owner holds it.
    async fn acquire(&self, key: &str, owner: &str, ttl_seconds: u64) -> CoreResult<bool>;

    /// Release the lock if held by this owner.
    async fn release(&self, key: &str, owner: &str) -> CoreResult<()>;
}
