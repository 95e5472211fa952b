use crate::errors::CoreResult;
use crate::models::category::TicketCategory;
use crate::models::reply::TicketReply;
use crate::models::ticket::Ticket;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Durable record of tickets, replies, and categories. The implementation
/// must provide per-row atomicity for `save`; the engine serializes writers
/// per ticket through the `TicketLock` port on top of that.
#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn get(&self, ticket_id: &str) -> CoreResult<Ticket>;

    async fn save(&self, ticket: &Ticket) -> CoreResult<()>;

    async fn append_reply(&self, reply: &TicketReply) -> CoreResult<()>;

    async fn replies(&self, ticket_id: &str) -> CoreResult<Vec<TicketReply>>;

    /// Creation time of the earliest non-internal reply, the SLA first
    /// response marker.
    async fn first_public_reply_at(&self, ticket_id: &str) -> CoreResult<Option<DateTime<Utc>>>;

    /// Tickets in a non-terminal status, the SLA scanner's working set.
    async fn list_open_tickets(&self) -> CoreResult<Vec<Ticket>>;

    async fn get_category(&self, category_id: &str) -> CoreResult<Option<TicketCategory>>;
}
